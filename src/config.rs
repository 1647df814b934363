//! Pipeline configuration.
//!
//! Every field has a default, so an empty or partial TOML file is valid:
//!
//! ```toml
//! test_len = 24
//! levels = [80.0, 95.0]
//! ets_candidates = ["M,A,M", "A,Ad,A"]
//! selection = { seed = 2024 }
//!
//! [source]
//! kind = "url"
//! template = "https://example.org/{catalogue}/{table}.csv"
//! ```

use std::fs;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::data::TableId;
use crate::error::{Error, Result};
use crate::models::{ARIMAOrder, ETSSpec};

/// Where the long-format table is read from.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "lowercase")]
pub enum SourceConfig {
    /// A local CSV export.
    File { path: PathBuf },
    /// A download URL with `{catalogue}` and `{table}` placeholders.
    Url { template: String },
}

impl Default for SourceConfig {
    fn default() -> Self {
        SourceConfig::File {
            path: PathBuf::from("data/retail_turnover.csv"),
        }
    }
}

/// How the single analysed series is chosen.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SeriesSelection {
    SeriesId(String),
    Seed(u64),
}

impl Default for SeriesSelection {
    fn default() -> Self {
        SeriesSelection::Seed(2024)
    }
}

/// Settings for one pipeline run.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PipelineConfig {
    pub source: SourceConfig,
    pub table: TableId,
    pub cache_dir: PathBuf,
    pub selection: SeriesSelection,
    /// Seasonal period in months.
    pub period: usize,
    /// Length of the held-out test suffix.
    pub test_len: usize,
    pub ljung_box_lag: usize,
    /// Prediction interval levels in percent.
    pub levels: Vec<f64>,
    /// ETS shortlist, e.g. `"M,A,M"`.
    pub ets_candidates: Vec<String>,
    /// Seasonal ARIMA shortlist, e.g. `"(2,1,0)(0,1,1)"`.
    pub arima_candidates: Vec<String>,
    pub output_dir: PathBuf,
    pub charts: bool,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            source: SourceConfig::default(),
            table: TableId::retail_turnover(),
            cache_dir: PathBuf::from(".cache"),
            selection: SeriesSelection::default(),
            period: 12,
            test_len: 24,
            ljung_box_lag: 24,
            levels: vec![80.0, 95.0],
            ets_candidates: vec!["M,A,M".to_string(), "A,Ad,A".to_string()],
            arima_candidates: vec![
                "(2,1,0)(0,1,1)".to_string(),
                "(0,1,1)(0,1,1)".to_string(),
            ],
            output_dir: PathBuf::from("output"),
            charts: true,
        }
    }
}

impl PipelineConfig {
    /// Read a TOML file. Missing keys take their defaults.
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let text = fs::read_to_string(path)
            .map_err(|e| Error::Config(format!("reading {}: {}", path.display(), e)))?;
        Self::from_toml(&text)
    }

    pub fn from_toml(text: &str) -> Result<Self> {
        let config: Self = toml::from_str(text).map_err(|e| Error::Config(e.to_string()))?;
        config.validate()?;
        Ok(config)
    }

    /// Check ranges and that every shortlisted model parses.
    pub fn validate(&self) -> Result<()> {
        if self.period < 2 {
            return Err(Error::Config(format!(
                "period must be at least 2, got {}",
                self.period
            )));
        }
        if self.test_len == 0 {
            return Err(Error::Config("test_len must be positive".to_string()));
        }
        if self.ljung_box_lag == 0 {
            return Err(Error::Config("ljung_box_lag must be positive".to_string()));
        }
        if let Some(level) = self.levels.iter().find(|l| !(**l > 0.0 && **l < 100.0)) {
            return Err(Error::Config(format!(
                "interval level {} is outside (0, 100)",
                level
            )));
        }
        self.ets_specs()?;
        self.arima_orders()?;
        Ok(())
    }

    pub fn ets_specs(&self) -> Result<Vec<ETSSpec>> {
        self.ets_candidates
            .iter()
            .map(|s| {
                s.parse::<ETSSpec>()
                    .map_err(|e| Error::Config(format!("ETS candidate '{}': {}", s, e)))
            })
            .collect()
    }

    pub fn arima_orders(&self) -> Result<Vec<ARIMAOrder>> {
        self.arima_candidates
            .iter()
            .map(|s| {
                ARIMAOrder::parse_with_period(s, self.period)
                    .map_err(|e| Error::Config(format!("ARIMA candidate '{}': {}", s, e)))
            })
            .collect()
    }
}
