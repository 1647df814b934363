//! # turnover-forecast
//!
//! Monthly retail turnover forecasting for one series drawn from the
//! published retail trade table.
//!
//! The run is linear: the table is loaded ([`data`]), reduced to complete
//! regional series and one is selected, Box-Cox transformed and differenced
//! ([`transform`]), split into training and test months, and a shortlist of
//! ETS and seasonal ARIMA candidates ([`models`]) is fitted on the training
//! part. Candidates are compared by AICc, test-set accuracy and residual
//! whiteness ([`evaluation`]) and printed or charted ([`report`]).

// Allow some clippy warnings for cleaner code in specific cases
#![allow(clippy::upper_case_acronyms)]
#![allow(clippy::too_many_arguments)]
#![allow(clippy::needless_range_loop)]

pub mod config;
pub mod core;
pub mod data;
pub mod error;
pub mod evaluation;
pub mod models;
pub mod pipeline;
pub mod report;
pub mod seasonality;
pub mod transform;
pub mod utils;
pub mod validation;

pub use error::{Error, Result};

pub mod prelude {
    pub use crate::config::{PipelineConfig, SeriesSelection, SourceConfig};
    pub use crate::core::{Forecast, MonthlySeries, TrainTestSplit};
    pub use crate::error::{Error, Result};
    pub use crate::evaluation::{CandidateOutcome, ModelFamily, ModelReport};
    pub use crate::models::{BoxCoxForecaster, Forecaster};
    pub use crate::utils::{calculate_metrics, AccuracyMetrics};
}
