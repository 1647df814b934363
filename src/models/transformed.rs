//! Fitting a model on the Box-Cox scale.

use crate::core::{Forecast, MonthlySeries};
use crate::error::{Error, Result};
use crate::models::{FitStatistics, Forecaster};
use crate::transform::BoxCox;

/// Wraps a model so that it is fitted on `boxcox(y, lambda)`.
///
/// Forecasts, interval bounds and fitted values are returned on the original
/// scale; residuals and fit statistics stay on the transformed scale, where
/// the model's innovations live. Back-transformed point forecasts are medians
/// rather than means.
#[derive(Debug, Clone)]
pub struct BoxCoxForecaster<M> {
    inner: M,
    transform: BoxCox,
    fitted: Option<Vec<f64>>,
}

impl<M: Forecaster> BoxCoxForecaster<M> {
    pub fn new(inner: M, transform: BoxCox) -> Self {
        Self {
            inner,
            transform,
            fitted: None,
        }
    }

    pub fn lambda(&self) -> f64 {
        self.transform.lambda()
    }

    pub fn inner(&self) -> &M {
        &self.inner
    }

    fn back_transform(&self, forecast: &Forecast) -> Forecast {
        let transform = self.transform;
        forecast.map(|v| transform.inverse(v))
    }
}

impl<M: Forecaster> Forecaster for BoxCoxForecaster<M> {
    fn fit(&mut self, series: &MonthlySeries) -> Result<()> {
        let transformed = self.transform.transform(series.values())?;
        let series = MonthlySeries::new(series.name(), series.start(), transformed)?;
        self.inner.fit(&series)?;

        let fitted = self.inner.fitted_values().ok_or(Error::FitRequired)?;
        self.fitted = Some(fitted.iter().map(|&v| self.transform.inverse(v)).collect());
        Ok(())
    }

    fn predict(&self, horizon: usize) -> Result<Forecast> {
        Ok(self.back_transform(&self.inner.predict(horizon)?))
    }

    fn predict_with_intervals(&self, horizon: usize, levels: &[f64]) -> Result<Forecast> {
        Ok(self.back_transform(&self.inner.predict_with_intervals(horizon, levels)?))
    }

    fn fitted_values(&self) -> Option<&[f64]> {
        self.fitted.as_deref()
    }

    fn residuals(&self) -> Option<&[f64]> {
        self.inner.residuals()
    }

    fn fit_statistics(&self) -> Option<&FitStatistics> {
        self.inner.fit_statistics()
    }

    fn name(&self) -> String {
        self.inner.name()
    }
}
