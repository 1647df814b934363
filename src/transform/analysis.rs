//! The transform stage of the pipeline: Box-Cox, differencing and the
//! stationarity checks around them.

use tracing::{debug, info};

use crate::error::{Error, Result};
use crate::seasonality::decompose;
use crate::transform::{BoxCox, DifferencingPlan};
use crate::validation::{kpss_test, ndiffs, nsdiffs, KpssResult};

const KPSS_ALPHA: f64 = 0.05;
const MAX_D: usize = 2;
const MAX_SEASONAL_D: usize = 1;

/// What the transform stage found and produced.
#[derive(Debug, Clone)]
pub struct TransformReport {
    pub boxcox: BoxCox,
    /// KPSS on the Box-Cox scale, before differencing.
    pub kpss_before: KpssResult,
    /// KPSS on the differenced series.
    pub kpss_after: KpssResult,
    /// Ordinary differences suggested after the suggested seasonal ones.
    pub ndiffs: usize,
    pub nsdiffs: usize,
    /// Strengths of a classical decomposition of the transformed series.
    pub seasonal_strength: f64,
    pub trend_strength: f64,
    pub transformed: Vec<f64>,
    /// One seasonal then one ordinary difference of `transformed`.
    pub differenced: Vec<f64>,
    pub plan: DifferencingPlan,
}

impl TransformReport {
    pub fn lambda(&self) -> f64 {
        self.boxcox.lambda()
    }
}

/// Estimate lambda by Guerrero, transform, and difference once seasonally
/// and once ordinarily.
///
/// The suggested differencing orders are recorded alongside; the applied
/// differencing is always seasonal-then-ordinary.
pub fn analyse(values: &[f64], period: usize) -> Result<TransformReport> {
    if values.len() <= period + 1 {
        return Err(Error::InsufficientData {
            needed: period + 2,
            got: values.len(),
        });
    }
    let boxcox = BoxCox::guerrero(values, period)?;
    let transformed = boxcox.transform(values)?;
    debug!(lambda = boxcox.lambda(), "estimated Box-Cox lambda");

    let kpss_before = kpss_test(&transformed, None);
    let (seasonal_strength, trend_strength) = match decompose(&transformed, period) {
        Ok(d) => (d.seasonal_strength(), d.trend_strength()),
        Err(_) => (f64::NAN, f64::NAN),
    };
    let nsdiffs = nsdiffs(&transformed, period, MAX_SEASONAL_D);
    let (seasonally_adjusted, _) = DifferencingPlan::apply(&transformed, 0, nsdiffs, period);
    let ndiffs = ndiffs(&seasonally_adjusted, KPSS_ALPHA, MAX_D);

    let (differenced, plan) = DifferencingPlan::apply(&transformed, 1, 1, period);
    let kpss_after = kpss_test(&differenced, None);

    info!(
        lambda = boxcox.lambda(),
        kpss_before = kpss_before.p_value,
        kpss_after = kpss_after.p_value,
        nsdiffs,
        ndiffs,
        "transform stage complete"
    );

    Ok(TransformReport {
        boxcox,
        kpss_before,
        kpss_after,
        ndiffs,
        nsdiffs,
        seasonal_strength,
        trend_strength,
        transformed,
        differenced,
        plan,
    })
}
