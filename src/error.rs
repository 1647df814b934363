//! Error types for the turnover-forecast crate.

use thiserror::Error;

/// Result type alias for pipeline operations.
pub type Result<T> = std::result::Result<T, Error>;

/// Errors that can occur while loading, cleaning, transforming or modelling
/// turnover data.
#[derive(Error, Debug)]
pub enum Error {
    /// Input data is empty.
    #[error("empty input data")]
    EmptyData,

    /// Insufficient data points for the operation.
    #[error("insufficient data: need at least {needed}, got {got}")]
    InsufficientData { needed: usize, got: usize },

    /// Invalid parameter value.
    #[error("invalid parameter: {0}")]
    InvalidParameter(String),

    /// Dimension mismatch between data structures.
    #[error("dimension mismatch: expected {expected}, got {got}")]
    DimensionMismatch { expected: usize, got: usize },

    /// Missing values detected when not allowed.
    #[error("missing values detected in data")]
    MissingValues,

    /// Reading a local file failed.
    #[error("i/o error: {0}")]
    Io(#[from] std::io::Error),

    /// The table could not be parsed as CSV.
    #[error("csv error: {0}")]
    Csv(#[from] csv::Error),

    /// Fetching the remote table failed.
    #[error("http error fetching {url}: {reason}")]
    Http { url: String, reason: String },

    /// Configuration file could not be read.
    #[error("config error: {0}")]
    Config(String),

    /// A date cell could not be parsed as a month.
    #[error("invalid date '{0}'")]
    InvalidDate(String),

    /// A composite series label did not split into category, region and industry.
    #[error("malformed series label '{0}'")]
    MalformedLabel(String),

    /// Turnover must be non-negative.
    #[error("negative turnover {value} in series {series_id}")]
    NegativeTurnover { series_id: String, value: f64 },

    /// A series holds two observations for the same month.
    #[error("series {series_id} has duplicate month {month}")]
    DuplicateMonth { series_id: String, month: String },

    /// Every series was dropped by the completeness filter.
    #[error("no complete series left after cleaning ({dropped} dropped)")]
    NoCompleteSeries { dropped: usize },

    /// The requested series is not in the cleaned collection.
    #[error("series not found: {0}")]
    SeriesNotFound(String),

    /// Model has not been fitted yet.
    #[error("model must be fitted before prediction")]
    FitRequired,

    /// The estimator did not reach an admissible optimum.
    #[error("{model} did not converge: {reason}")]
    NonConvergence { model: String, reason: String },

    /// Computation error (e.g., numerical issues).
    #[error("computation error: {0}")]
    ComputationError(String),

    /// Chart rendering failed.
    #[error("plot error: {0}")]
    Plot(String),
}

impl Error {
    pub(crate) fn non_convergence(model: impl Into<String>, reason: impl Into<String>) -> Self {
        Error::NonConvergence {
            model: model.into(),
            reason: reason.into(),
        }
    }
}
