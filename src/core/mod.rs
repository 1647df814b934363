//! Core data structures: monthly series, train/test split and forecasts.

mod forecast;
mod time_series;

pub use forecast::{Forecast, PredictionInterval};
pub use time_series::{
    add_months, first_of_month, months_are_contiguous, MonthlySeries, TrainTestSplit,
    MONTHS_PER_YEAR,
};
