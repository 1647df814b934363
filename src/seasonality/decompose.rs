//! Classical additive decomposition of a seasonal series.
//!
//! Trend is a centred moving average over one full period (a 2 x m average
//! for even m), seasonal indices are the centred per-position means of the
//! detrended series, and the remainder is what is left. Observations at the
//! ends where the moving average is undefined carry NaN trend and remainder.

use crate::error::{Error, Result};
use crate::utils::stats::variance;

/// Trend, seasonal and remainder components, aligned with the input.
#[derive(Debug, Clone)]
pub struct Decomposition {
    pub trend: Vec<f64>,
    pub seasonal: Vec<f64>,
    pub remainder: Vec<f64>,
    /// Centred seasonal index for each position within the period.
    pub seasonal_indices: Vec<f64>,
}

impl Decomposition {
    /// Strength of seasonality in [0, 1]: `max(0, 1 - Var(R) / Var(S + R))`.
    pub fn seasonal_strength(&self) -> f64 {
        let (rem, seas_rem): (Vec<f64>, Vec<f64>) = self
            .seasonal
            .iter()
            .zip(&self.remainder)
            .filter(|(_, r)| r.is_finite())
            .map(|(s, r)| (*r, s + r))
            .unzip();
        strength(&rem, &seas_rem)
    }

    /// Strength of trend in [0, 1]: `max(0, 1 - Var(R) / Var(T + R))`.
    pub fn trend_strength(&self) -> f64 {
        let (rem, trend_rem): (Vec<f64>, Vec<f64>) = self
            .trend
            .iter()
            .zip(&self.remainder)
            .filter(|(t, r)| t.is_finite() && r.is_finite())
            .map(|(t, r)| (*r, t + r))
            .unzip();
        strength(&rem, &trend_rem)
    }
}

fn strength(remainder: &[f64], combined: &[f64]) -> f64 {
    let var_combined = variance(combined);
    if !var_combined.is_finite() || var_combined < 1e-12 {
        return 0.0;
    }
    (1.0 - variance(remainder) / var_combined).max(0.0)
}

/// Centred moving average over `period` points.
fn centred_moving_average(series: &[f64], period: usize) -> Vec<f64> {
    let n = series.len();
    let half = period / 2;
    let mut trend = vec![f64::NAN; n];
    if n < period + 1 {
        return trend;
    }
    for t in half..n - half {
        trend[t] = if period % 2 == 0 {
            let inner: f64 = series[t + 1 - half..t + half].iter().sum();
            (0.5 * series[t - half] + inner + 0.5 * series[t + half]) / period as f64
        } else {
            series[t - half..=t + half].iter().sum::<f64>() / period as f64
        };
    }
    trend
}

/// Decompose `series` with seasonal `period`.
///
/// Requires at least two full periods.
pub fn decompose(series: &[f64], period: usize) -> Result<Decomposition> {
    if period < 2 {
        return Err(Error::InvalidParameter(format!(
            "seasonal period must be at least 2, got {}",
            period
        )));
    }
    if series.len() < 2 * period {
        return Err(Error::InsufficientData {
            needed: 2 * period,
            got: series.len(),
        });
    }

    let trend = centred_moving_average(series, period);

    let mut sums = vec![0.0; period];
    let mut counts = vec![0usize; period];
    for (t, (&y, &tr)) in series.iter().zip(&trend).enumerate() {
        if tr.is_finite() {
            sums[t % period] += y - tr;
            counts[t % period] += 1;
        }
    }
    let raw: Vec<f64> = sums
        .iter()
        .zip(&counts)
        .map(|(s, &c)| if c > 0 { s / c as f64 } else { 0.0 })
        .collect();
    let offset = raw.iter().sum::<f64>() / period as f64;
    let seasonal_indices: Vec<f64> = raw.iter().map(|s| s - offset).collect();

    let seasonal: Vec<f64> = (0..series.len())
        .map(|t| seasonal_indices[t % period])
        .collect();
    let remainder: Vec<f64> = series
        .iter()
        .zip(&trend)
        .zip(&seasonal)
        .map(|((y, tr), s)| y - tr - s)
        .collect();

    Ok(Decomposition {
        trend,
        seasonal,
        remainder,
        seasonal_indices,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;
    use std::f64::consts::PI;

    #[test]
    fn recovers_linear_trend_in_the_middle() {
        let series: Vec<f64> = (0..48)
            .map(|i| 10.0 + 0.5 * i as f64 + 3.0 * (2.0 * PI * i as f64 / 12.0).sin())
            .collect();
        let d = decompose(&series, 12).unwrap();
        assert!(d.trend[0].is_nan());
        assert_relative_eq!(d.trend[24], 10.0 + 0.5 * 24.0, epsilon = 1e-9);
        assert_relative_eq!(d.seasonal_indices.iter().sum::<f64>(), 0.0, epsilon = 1e-9);
    }

    #[test]
    fn strong_seasonality_scores_high() {
        let series: Vec<f64> = (0..60)
            .map(|i| {
                100.0 + 20.0 * (2.0 * PI * i as f64 / 12.0).sin() + 0.5 * ((i * 7 % 5) as f64)
            })
            .collect();
        let d = decompose(&series, 12).unwrap();
        assert!(d.seasonal_strength() > 0.9);
    }

    #[test]
    fn noise_without_season_scores_low() {
        // Deterministic pseudo-noise with no period-12 structure.
        let series: Vec<f64> = (0..72)
            .map(|i| 50.0 + ((i * 37 % 11) as f64 - 5.0) * if i % 2 == 0 { 1.0 } else { -0.7 })
            .collect();
        let d = decompose(&series, 12).unwrap();
        assert!(d.seasonal_strength() < 0.64);
    }

    #[test]
    fn rejects_short_series_and_bad_period() {
        assert!(decompose(&[1.0; 20], 12).is_err());
        assert!(decompose(&[1.0; 20], 1).is_err());
    }
}
