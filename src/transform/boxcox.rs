//! Box-Cox power transformation and Guerrero's choice of its parameter.

use crate::error::{Error, Result};
use crate::utils::optimization::golden_section;
use crate::utils::stats::{mean, std_dev};

/// Search interval for the Guerrero lambda.
pub const GUERRERO_LOWER: f64 = -0.9;
pub const GUERRERO_UPPER: f64 = 2.0;

/// Apply the Box-Cox transformation with a given lambda.
///
/// For lambda != 0: y = (x^lambda - 1) / lambda
/// For lambda == 0: y = ln(x)
///
/// Non-positive inputs map to NaN.
pub fn boxcox(series: &[f64], lambda: f64) -> Vec<f64> {
    series.iter().map(|&x| boxcox_value(x, lambda)).collect()
}

pub fn boxcox_value(x: f64, lambda: f64) -> f64 {
    if x <= 0.0 {
        f64::NAN
    } else if lambda.abs() < 1e-10 {
        x.ln()
    } else {
        (x.powf(lambda) - 1.0) / lambda
    }
}

/// Inverse Box-Cox transformation.
///
/// For lambda != 0: x = (lambda * y + 1)^(1/lambda)
/// For lambda == 0: x = exp(y)
pub fn inv_boxcox(transformed: &[f64], lambda: f64) -> Vec<f64> {
    transformed
        .iter()
        .map(|&y| inv_boxcox_value(y, lambda))
        .collect()
}

pub fn inv_boxcox_value(y: f64, lambda: f64) -> f64 {
    if lambda.abs() < 1e-10 {
        return y.exp();
    }
    let base = lambda * y + 1.0;
    if base <= 0.0 {
        // Below the transform's range; the limit is zero for positive lambda.
        if lambda > 0.0 {
            0.0
        } else {
            f64::NAN
        }
    } else {
        base.powf(1.0 / lambda)
    }
}

/// Coefficient of variation of `sd / mean^(1 - lambda)` across complete periods.
///
/// Uses the most recent `floor(n / period)` full periods.
fn guerrero_cv(series: &[f64], lambda: f64, period: usize) -> f64 {
    let period = period.max(2);
    let years = series.len() / period;
    let tail = &series[series.len() - years * period..];

    let ratios: Vec<f64> = tail
        .chunks_exact(period)
        .map(|chunk| std_dev(chunk) / mean(chunk).powf(1.0 - lambda))
        .collect();

    std_dev(&ratios) / mean(&ratios)
}

/// Guerrero's (1993) Box-Cox parameter: the lambda in [-0.9, 2] that makes the
/// ratio of subseries standard deviation to mean most constant.
///
/// # Example
/// ```
/// use turnover_forecast::transform::guerrero_lambda;
///
/// // Amplitude grows with the level: close to a log transform.
/// let values: Vec<f64> = (0..60)
///     .map(|i| {
///         let level = 100.0 * 1.03_f64.powi(i);
///         level * (1.0 + 0.2 * (i as f64 * std::f64::consts::PI / 6.0).sin())
///     })
///     .collect();
/// let lambda = guerrero_lambda(&values, 12).unwrap();
/// assert!(lambda.abs() < 0.3);
/// ```
pub fn guerrero_lambda(series: &[f64], period: usize) -> Result<f64> {
    let period = period.max(2);
    if series.len() < 2 * period {
        return Err(Error::InsufficientData {
            needed: 2 * period,
            got: series.len(),
        });
    }
    if !is_boxcox_suitable(series) {
        return Err(Error::InvalidParameter(
            "Box-Cox requires strictly positive data".to_string(),
        ));
    }

    Ok(golden_section(
        |lambda| guerrero_cv(series, lambda, period),
        GUERRERO_LOWER,
        GUERRERO_UPPER,
        1e-6,
    ))
}

/// Check if data is suitable for Box-Cox transformation.
///
/// Returns true if all values are positive.
pub fn is_boxcox_suitable(series: &[f64]) -> bool {
    !series.is_empty() && series.iter().all(|&x| x > 0.0)
}

/// A fixed Box-Cox transform.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct BoxCox {
    lambda: f64,
}

impl BoxCox {
    pub fn new(lambda: f64) -> Result<Self> {
        if !lambda.is_finite() {
            return Err(Error::InvalidParameter(format!(
                "Box-Cox lambda must be finite, got {}",
                lambda
            )));
        }
        Ok(Self { lambda })
    }

    /// Estimate lambda with the Guerrero method.
    pub fn guerrero(series: &[f64], period: usize) -> Result<Self> {
        Self::new(guerrero_lambda(series, period)?)
    }

    pub fn lambda(&self) -> f64 {
        self.lambda
    }

    /// Transform strictly positive data.
    pub fn transform(&self, series: &[f64]) -> Result<Vec<f64>> {
        if !is_boxcox_suitable(series) {
            return Err(Error::InvalidParameter(
                "Box-Cox requires strictly positive data".to_string(),
            ));
        }
        Ok(boxcox(series, self.lambda))
    }

    pub fn forward(&self, x: f64) -> f64 {
        boxcox_value(x, self.lambda)
    }

    pub fn inverse(&self, y: f64) -> f64 {
        inv_boxcox_value(y, self.lambda)
    }
}
