//! Raw observations as published, before cleaning.

use std::fmt;

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use crate::core::first_of_month;
use crate::error::{Error, Result};

/// A published table: catalogue number and table number, e.g. `8501.0` / `11`.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct TableId {
    pub catalogue: String,
    pub table: String,
}

impl TableId {
    pub fn new(catalogue: impl Into<String>, table: impl Into<String>) -> Self {
        Self {
            catalogue: catalogue.into(),
            table: table.into(),
        }
    }

    /// The monthly retail trade table with turnover by state and industry.
    pub fn retail_turnover() -> Self {
        Self::new("8501.0", "11")
    }

    /// File name under which the table is cached.
    pub fn cache_file_name(&self) -> String {
        format!("{}_{}.csv", self.catalogue, self.table)
    }
}

impl Default for TableId {
    fn default() -> Self {
        Self::retail_turnover()
    }
}

impl fmt::Display for TableId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} table {}", self.catalogue, self.table)
    }
}

/// One cell of the long-format table.
#[derive(Debug, Clone, PartialEq)]
pub struct Observation {
    pub series_id: String,
    /// Composite label, e.g. `Turnover ;  Victoria ;  Food retailing ;`.
    pub label: String,
    /// First day of the reference month.
    pub month: NaiveDate,
    /// `None` when the cell was empty or not numeric.
    pub value: Option<f64>,
}

/// Parse `YYYY-MM-DD` or `YYYY-MM` into the first of that month.
pub fn parse_month(text: &str) -> Result<NaiveDate> {
    let trimmed = text.trim();
    NaiveDate::parse_from_str(trimmed, "%Y-%m-%d")
        .or_else(|_| NaiveDate::parse_from_str(&format!("{}-01", trimmed), "%Y-%m-%d"))
        .map(first_of_month)
        .map_err(|_| Error::InvalidDate(trimmed.to_string()))
}

/// Parse a turnover cell; blanks and the usual not-available markers are missing.
pub fn parse_value(text: &str) -> Option<f64> {
    match text.trim() {
        "" | "NA" | ".." | "-" => None,
        other => other.parse::<f64>().ok().filter(|v| v.is_finite()),
    }
}
