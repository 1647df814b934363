//! Seasonal ARIMA models.
//!
//! - [`ARIMA`]: (p, d, q)(P, D, Q)\[m\] fitted by conditional sum of squares
//! - [`AutoARIMA`]: differencing by unit-root heuristics, then a stepwise
//!   search over the ARMA orders by AICc

mod auto_arima;
mod model;

pub use auto_arima::{AutoARIMA, AutoARIMAConfig};
pub use model::{is_stationary, ARIMACoefficients, ARIMAOrder, ARIMA};
