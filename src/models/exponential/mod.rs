//! Exponential smoothing in innovations state-space form.

mod auto_ets;
mod ets;

pub use auto_ets::{AutoETS, AutoETSConfig};
pub use ets::{ETSParams, ETSSpec, ErrorType, SeasonalType, TrendType, ETS};
