//! Forecaster trait defining the common interface for the candidate models.

use crate::core::{Forecast, MonthlySeries};
use crate::error::Result;

/// In-sample fit statistics of an estimated model.
#[derive(Debug, Clone, PartialEq)]
pub struct FitStatistics {
    pub log_likelihood: f64,
    pub aic: f64,
    pub aicc: f64,
    pub bic: f64,
    /// Innovation variance.
    pub sigma2: f64,
    /// Every estimated quantity, initial states included (the `k` of AIC).
    pub n_params: usize,
    /// Coefficients that consume residual degrees of freedom: smoothing
    /// weights for ETS, p + q + P + Q for ARIMA.
    pub n_coefficients: usize,
    /// Observations that entered the likelihood.
    pub n_obs: usize,
    /// False when the optimiser ran out of iterations.
    pub converged: bool,
}

impl FitStatistics {
    /// Information criteria from a log-likelihood.
    ///
    /// AICc is infinite when there are too few observations for its correction.
    pub fn from_log_likelihood(
        log_likelihood: f64,
        sigma2: f64,
        n_params: usize,
        n_coefficients: usize,
        n_obs: usize,
        converged: bool,
    ) -> Self {
        let k = n_params as f64;
        let n = n_obs as f64;
        let aic = -2.0 * log_likelihood + 2.0 * k;
        let aicc = if n_obs > n_params + 1 {
            aic + 2.0 * k * (k + 1.0) / (n - k - 1.0)
        } else {
            f64::INFINITY
        };
        let bic = -2.0 * log_likelihood + k * n.ln();
        Self {
            log_likelihood,
            aic,
            aicc,
            bic,
            sigma2,
            n_params,
            n_coefficients,
            n_obs,
            converged,
        }
    }
}

/// Common interface for the candidate models.
///
/// This trait is object-safe and can be used with `Box<dyn Forecaster>`.
pub trait Forecaster {
    /// Fit the model to the training series.
    fn fit(&mut self, series: &MonthlySeries) -> Result<()>;

    /// Point forecasts for the next `horizon` months.
    fn predict(&self, horizon: usize) -> Result<Forecast>;

    /// Point forecasts with central prediction intervals at each of `levels`
    /// (percent, e.g. `[80.0, 95.0]`).
    fn predict_with_intervals(&self, horizon: usize, levels: &[f64]) -> Result<Forecast>;

    /// One-step in-sample predictions, aligned with the training series.
    /// Entries without a prediction (differencing warm-up) are NaN.
    fn fitted_values(&self) -> Option<&[f64]>;

    /// Innovation residuals, aligned with the training series.
    fn residuals(&self) -> Option<&[f64]>;

    fn fit_statistics(&self) -> Option<&FitStatistics>;

    /// Display name, e.g. `ETS(M,A,M)` or `ARIMA(2,1,0)(0,1,1)[12]`.
    fn name(&self) -> String;

    fn is_fitted(&self) -> bool {
        self.fitted_values().is_some()
    }
}

/// Boxed forecaster that can be moved to a worker thread.
pub type BoxedForecaster = Box<dyn Forecaster + Send>;
