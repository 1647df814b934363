//! Fetching the published table as long-format CSV.
//!
//! The table has one row per series and month with at least the columns
//! `series_id`, `date`, `series` (the composite label) and `value`; any other
//! columns are ignored.

use std::fs::{self, File};
use std::io::{BufReader, Read};
use std::path::{Path, PathBuf};
use std::time::Duration;

use tracing::{debug, info};

use crate::data::observation::{parse_month, parse_value, Observation, TableId};
use crate::error::{Error, Result};

const REQUIRED_COLUMNS: [&str; 4] = ["series_id", "date", "series", "value"];

/// A place the raw table can be read from.
pub trait TableSource {
    /// Return every observation of `table`, unfiltered.
    fn fetch(&self, table: &TableId) -> Result<Vec<Observation>>;
}

/// Parse long-format CSV from any reader.
pub fn read_observations<R: Read>(reader: R) -> Result<Vec<Observation>> {
    let mut reader = csv::ReaderBuilder::new()
        .trim(csv::Trim::Headers)
        .flexible(true)
        .from_reader(reader);

    let headers = reader.headers()?.clone();
    let mut positions = [0usize; 4];
    for (slot, name) in positions.iter_mut().zip(REQUIRED_COLUMNS) {
        *slot = headers
            .iter()
            .position(|h| h.eq_ignore_ascii_case(name))
            .ok_or_else(|| Error::InvalidParameter(format!("table has no '{}' column", name)))?;
    }
    let [id_col, date_col, label_col, value_col] = positions;

    let mut observations = Vec::new();
    for record in reader.records() {
        let record = record?;
        let field = |i: usize| record.get(i).unwrap_or("");
        observations.push(Observation {
            series_id: field(id_col).trim().to_string(),
            label: field(label_col).to_string(),
            month: parse_month(field(date_col))?,
            value: parse_value(field(value_col)),
        });
    }
    Ok(observations)
}

/// Reads the table from a local CSV file.
#[derive(Debug, Clone)]
pub struct CsvFileSource {
    path: PathBuf,
}

impl CsvFileSource {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl TableSource for CsvFileSource {
    fn fetch(&self, table: &TableId) -> Result<Vec<Observation>> {
        let file = File::open(&self.path)?;
        let observations = read_observations(BufReader::new(file))?;
        info!(
            table = %table,
            path = %self.path.display(),
            rows = observations.len(),
            "loaded table from file"
        );
        Ok(observations)
    }
}

/// Downloads the table over HTTP, keeping a copy in a cache directory.
///
/// The URL template may contain `{catalogue}` and `{table}`. A cached copy,
/// when present, is used instead of the network.
#[derive(Debug, Clone)]
pub struct HttpSource {
    url_template: String,
    cache_dir: PathBuf,
    timeout: Duration,
}

impl HttpSource {
    pub fn new(url_template: impl Into<String>, cache_dir: impl Into<PathBuf>) -> Self {
        Self {
            url_template: url_template.into(),
            cache_dir: cache_dir.into(),
            timeout: Duration::from_secs(60),
        }
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    pub fn url_for(&self, table: &TableId) -> String {
        self.url_template
            .replace("{catalogue}", &table.catalogue)
            .replace("{table}", &table.table)
    }

    pub fn cache_path(&self, table: &TableId) -> PathBuf {
        self.cache_dir.join(table.cache_file_name())
    }

    fn download(&self, url: &str) -> Result<String> {
        let http_error = |reason: String| Error::Http {
            url: url.to_string(),
            reason,
        };
        match ureq::get(url).timeout(self.timeout).call() {
            Ok(response) => response
                .into_string()
                .map_err(|e| http_error(format!("reading body: {}", e))),
            Err(ureq::Error::Status(code, _)) => Err(http_error(format!("HTTP {}", code))),
            Err(e) => Err(http_error(e.to_string())),
        }
    }
}

impl TableSource for HttpSource {
    fn fetch(&self, table: &TableId) -> Result<Vec<Observation>> {
        let cache_path = self.cache_path(table);
        if cache_path.exists() {
            debug!(path = %cache_path.display(), "using cached table");
            return CsvFileSource::new(cache_path).fetch(table);
        }

        let url = self.url_for(table);
        info!(table = %table, url = %url, "downloading table");
        let body = self.download(&url)?;

        fs::create_dir_all(&self.cache_dir)?;
        fs::write(&cache_path, &body)?;
        debug!(path = %cache_path.display(), bytes = body.len(), "cached table");

        read_observations(body.as_bytes())
    }
}
