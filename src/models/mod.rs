//! Candidate forecasting models.
//!
//! Two families are compared: exponential smoothing ([`exponential`]) and
//! seasonal ARIMA ([`arima`]). Either can be wrapped in
//! [`BoxCoxForecaster`] to be fitted on the transformed scale.

mod traits;

pub mod arima;
pub mod exponential;
pub mod transformed;

pub use arima::{ARIMAOrder, AutoARIMA, AutoARIMAConfig, ARIMA};
pub use exponential::{AutoETS, ETSSpec, ETS};
pub use traits::{BoxedForecaster, FitStatistics, Forecaster};
pub use transformed::BoxCoxForecaster;
