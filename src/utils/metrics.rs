//! Point-forecast accuracy measures.

use crate::error::{Error, Result};

/// Accuracy of a forecast against held-out actuals.
#[derive(Debug, Clone, PartialEq)]
pub struct AccuracyMetrics {
    /// Mean Error
    pub me: f64,
    /// Root Mean Squared Error
    pub rmse: f64,
    /// Mean Absolute Error
    pub mae: f64,
    /// Mean Percentage Error (None if zeros in actual)
    pub mpe: Option<f64>,
    /// Mean Absolute Percentage Error (None if zeros in actual)
    pub mape: Option<f64>,
    /// Mean Absolute Scaled Error (None without a usable training scale)
    pub mase: Option<f64>,
    /// Root Mean Squared Scaled Error
    pub rmsse: Option<f64>,
}

/// Calculate accuracy metrics between actual and predicted values.
///
/// `training` and `seasonal_period` provide the scale for MASE/RMSSE: the
/// in-sample error of the seasonal naive method on the training data.
pub fn calculate_metrics(
    actual: &[f64],
    predicted: &[f64],
    training: &[f64],
    seasonal_period: usize,
) -> Result<AccuracyMetrics> {
    if actual.is_empty() || predicted.is_empty() {
        return Err(Error::EmptyData);
    }
    if actual.len() != predicted.len() {
        return Err(Error::DimensionMismatch {
            expected: actual.len(),
            got: predicted.len(),
        });
    }

    let n = actual.len() as f64;
    let errors: Vec<f64> = actual.iter().zip(predicted).map(|(a, p)| a - p).collect();

    let me = errors.iter().sum::<f64>() / n;
    let mse = errors.iter().map(|e| e * e).sum::<f64>() / n;
    let mae = errors.iter().map(|e| e.abs()).sum::<f64>() / n;

    let (mpe, mape) = if actual.contains(&0.0) {
        (None, None)
    } else {
        let pct: Vec<f64> = errors
            .iter()
            .zip(actual)
            .map(|(e, a)| 100.0 * e / a)
            .collect();
        (
            Some(pct.iter().sum::<f64>() / n),
            Some(pct.iter().map(|p| p.abs()).sum::<f64>() / n),
        )
    };

    let (mase, rmsse) = match naive_scale(training, seasonal_period.max(1)) {
        Some((abs_scale, sq_scale)) => (Some(mae / abs_scale), Some((mse / sq_scale).sqrt())),
        None => (None, None),
    };

    Ok(AccuracyMetrics {
        me,
        rmse: mse.sqrt(),
        mae,
        mpe,
        mape,
        mase,
        rmsse,
    })
}

/// Mean absolute and mean squared in-sample seasonal naive errors.
fn naive_scale(training: &[f64], period: usize) -> Option<(f64, f64)> {
    if training.len() <= period {
        return None;
    }
    let diffs: Vec<f64> = training[period..]
        .iter()
        .zip(training)
        .map(|(curr, prev)| curr - prev)
        .collect();
    let m = diffs.len() as f64;
    let abs_scale = diffs.iter().map(|d| d.abs()).sum::<f64>() / m;
    let sq_scale = diffs.iter().map(|d| d * d).sum::<f64>() / m;
    if abs_scale == 0.0 {
        None
    } else {
        Some((abs_scale, sq_scale))
    }
}
