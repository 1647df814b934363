//! Numerical helpers shared by the transformer, the fitters and the evaluator.

pub mod metrics;
pub mod optimization;
pub mod stats;

pub use metrics::{calculate_metrics, AccuracyMetrics};
pub use optimization::{golden_section, nelder_mead, NelderMeadConfig, Optimum};
pub use stats::{acf, chi_squared_sf, interval_multiplier, quantile_normal};
