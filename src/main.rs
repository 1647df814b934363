//! Command-line entry point: runs the turnover pipeline once.

use std::io;
use std::path::PathBuf;
use std::process::ExitCode;

use clap::Parser;
use tracing::{error, info};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use turnover_forecast::config::{PipelineConfig, SeriesSelection, SourceConfig};
use turnover_forecast::pipeline;

#[derive(Parser)]
#[command(name = "turnover-forecast")]
#[command(about = "Compare ETS and ARIMA forecasts of a monthly retail turnover series", long_about = None)]
struct Cli {
    /// TOML configuration file; flags below override it
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Local long-format CSV table
    #[arg(short, long, conflicts_with = "url")]
    input: Option<PathBuf>,

    /// Download URL with {catalogue} and {table} placeholders
    #[arg(short, long)]
    url: Option<String>,

    /// Analyse this series identifier
    #[arg(long, conflicts_with = "seed")]
    series_id: Option<String>,

    /// Seed for picking a random series
    #[arg(long)]
    seed: Option<u64>,

    /// Months held out for testing
    #[arg(long)]
    test_len: Option<usize>,

    /// Directory for SVG charts
    #[arg(short, long)]
    output: Option<PathBuf>,

    /// Skip chart rendering
    #[arg(long)]
    no_charts: bool,
}

impl Cli {
    fn into_config(self) -> turnover_forecast::Result<PipelineConfig> {
        let mut config = match &self.config {
            Some(path) => PipelineConfig::load(path)?,
            None => PipelineConfig::default(),
        };
        if let Some(path) = self.input {
            config.source = SourceConfig::File { path };
        }
        if let Some(template) = self.url {
            config.source = SourceConfig::Url { template };
        }
        if let Some(id) = self.series_id {
            config.selection = SeriesSelection::SeriesId(id);
        }
        if let Some(seed) = self.seed {
            config.selection = SeriesSelection::Seed(seed);
        }
        if let Some(test_len) = self.test_len {
            config.test_len = test_len;
        }
        if let Some(dir) = self.output {
            config.output_dir = dir;
        }
        if self.no_charts {
            config.charts = false;
        }
        config.validate()?;
        Ok(config)
    }
}

fn main() -> ExitCode {
    tracing_subscriber::registry()
        .with(tracing_subscriber::fmt::layer().with_writer(io::stderr))
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "turnover_forecast=info".into()),
        )
        .init();

    let config = match Cli::parse().into_config() {
        Ok(config) => config,
        Err(e) => {
            error!(error = %e, "invalid configuration");
            return ExitCode::FAILURE;
        }
    };

    let stdout = io::stdout();
    match pipeline::run(&config, &mut stdout.lock()) {
        Ok(output) => {
            for path in &output.charts {
                info!(path = %path.display(), "wrote chart");
            }
            ExitCode::SUCCESS
        }
        Err(e) => {
            error!(error = %e, "pipeline failed");
            ExitCode::FAILURE
        }
    }
}
