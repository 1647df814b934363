//! Loading the published turnover table and reducing it to complete series.
//!
//! [`TableSource`] abstracts over where the long-format table comes from: a
//! local CSV export ([`CsvFileSource`]) or the statistics bureau's download
//! endpoint with an on-disk cache ([`HttpSource`]). [`clean`] then filters
//! and reshapes the rows into a [`SeriesCollection`].

mod clean;
mod loader;
mod observation;

pub use clean::{
    clean, is_aggregate_industry, is_regional_turnover, parse_label, SeriesCollection,
    SeriesLabel, TurnoverSeries, REGIONS,
};
pub use loader::{read_observations, CsvFileSource, HttpSource, TableSource};
pub use observation::{parse_month, parse_value, Observation, TableId};
