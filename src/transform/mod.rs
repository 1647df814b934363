//! Variance-stabilising and differencing transforms.
//!
//! # Example
//!
//! ```
//! use turnover_forecast::transform::{boxcox, inv_boxcox, DifferencingPlan};
//!
//! let series: Vec<f64> = (1..=30).map(|i| 100.0 + i as f64).collect();
//!
//! let logged = boxcox(&series, 0.0);
//! let back = inv_boxcox(&logged, 0.0);
//! assert!((back[5] - series[5]).abs() < 1e-9);
//!
//! // Seasonal then ordinary differencing loses period + 1 points.
//! let (diffed, plan) = DifferencingPlan::apply(&series, 1, 1, 12);
//! assert_eq!(diffed.len(), series.len() - 13);
//! assert_eq!(plan.integrate(&diffed).len(), series.len());
//! ```

mod analysis;
pub mod boxcox;
pub mod diff;

pub use analysis::{analyse, TransformReport};

pub use boxcox::{
    boxcox, boxcox_value, guerrero_lambda, inv_boxcox, inv_boxcox_value, is_boxcox_suitable,
    BoxCox,
};
pub use diff::{
    difference, differencing_polynomial, integrate_forecast, lag_difference,
    multiply_polynomials, seasonal_difference, undifference, DifferencingPlan,
};
