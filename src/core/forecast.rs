//! Forecast result structure for holding predictions.

use crate::error::{Error, Result};

/// Lower and upper bounds of a central prediction interval.
#[derive(Debug, Clone, PartialEq)]
pub struct PredictionInterval {
    /// Coverage in percent, e.g. 95.0.
    pub level: f64,
    pub lower: Vec<f64>,
    pub upper: Vec<f64>,
}

/// Point forecasts plus any number of prediction intervals.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Forecast {
    point: Vec<f64>,
    intervals: Vec<PredictionInterval>,
}

impl Forecast {
    /// Create an empty forecast.
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a forecast from point predictions.
    pub fn from_values(values: Vec<f64>) -> Self {
        Self {
            point: values,
            intervals: Vec::new(),
        }
    }

    /// Attach an interval at `level` percent.
    pub fn push_interval(&mut self, level: f64, lower: Vec<f64>, upper: Vec<f64>) -> Result<()> {
        if lower.len() != self.point.len() {
            return Err(Error::DimensionMismatch {
                expected: self.point.len(),
                got: lower.len(),
            });
        }
        if upper.len() != self.point.len() {
            return Err(Error::DimensionMismatch {
                expected: self.point.len(),
                got: upper.len(),
            });
        }
        self.intervals.push(PredictionInterval {
            level,
            lower,
            upper,
        });
        Ok(())
    }

    /// Get the forecast horizon (number of steps).
    pub fn horizon(&self) -> usize {
        self.point.len()
    }

    pub fn is_empty(&self) -> bool {
        self.point.is_empty()
    }

    pub fn point(&self) -> &[f64] {
        &self.point
    }

    pub fn intervals(&self) -> &[PredictionInterval] {
        &self.intervals
    }

    /// Interval at the given level, if one was computed.
    pub fn interval(&self, level: f64) -> Option<&PredictionInterval> {
        self.intervals
            .iter()
            .find(|pi| (pi.level - level).abs() < 1e-9)
    }

    /// Apply a monotone increasing map to points and bounds.
    ///
    /// Used to carry forecasts from a transformed scale back to the data scale.
    pub fn map<F>(&self, f: F) -> Forecast
    where
        F: Fn(f64) -> f64,
    {
        Forecast {
            point: self.point.iter().map(|&v| f(v)).collect(),
            intervals: self
                .intervals
                .iter()
                .map(|pi| PredictionInterval {
                    level: pi.level,
                    lower: pi.lower.iter().map(|&v| f(v)).collect(),
                    upper: pi.upper.iter().map(|&v| f(v)).collect(),
                })
                .collect(),
        }
    }
}
