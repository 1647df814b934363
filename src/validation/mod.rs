//! Statistical tests used before and after fitting.
//!
//! # Example
//!
//! ```
//! use turnover_forecast::validation::{kpss_test, ljung_box};
//!
//! let residuals = vec![0.1, -0.2, 0.15, -0.1, 0.05, -0.08, 0.12, -0.15, 0.1, -0.05];
//! let lb = ljung_box(&residuals, 5, 0);
//! println!("Ljung-Box p-value: {:.3}", lb.p_value);
//!
//! let kpss = kpss_test(&residuals, None);
//! assert!(kpss.p_value <= 0.10);
//! ```

pub mod residual_tests;
pub mod stationarity;

pub use residual_tests::{ljung_box, LjungBoxResult};
pub use stationarity::{
    kpss_test, ndiffs, nsdiffs, CriticalValues, KpssResult, SEASONAL_STRENGTH_THRESHOLD,
};
