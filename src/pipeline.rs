//! The linear analysis run: load, clean, select, transform, split, fit,
//! evaluate and report.

use std::io::Write;
use std::path::PathBuf;

use tracing::{debug, info, info_span};

use crate::config::{PipelineConfig, SeriesSelection, SourceConfig};
use crate::core::{MonthlySeries, TrainTestSplit};
use crate::data::{
    clean, CsvFileSource, HttpSource, Observation, SeriesCollection, TableSource, TurnoverSeries,
};
use crate::error::Result;
use crate::evaluation::{evaluate_candidate, CandidateOutcome, EvaluationSettings, ModelFamily};
use crate::models::{
    ARIMAOrder, AutoARIMA, AutoARIMAConfig, AutoETS, BoxCoxForecaster, BoxedForecaster, ARIMA, ETS,
};
use crate::report;
use crate::transform::{analyse, BoxCox, TransformReport};

/// The fitted comparison for one series.
#[derive(Debug)]
pub struct Analysis {
    pub split: TrainTestSplit,
    pub transform: TransformReport,
    pub outcomes: Vec<CandidateOutcome>,
}

/// Everything a full run produced.
#[derive(Debug)]
pub struct PipelineOutput {
    pub selected: TurnoverSeries,
    pub analysis: Analysis,
    pub charts: Vec<PathBuf>,
}

/// The table source named by the configuration.
pub fn source_for(config: &PipelineConfig) -> Box<dyn TableSource> {
    match &config.source {
        SourceConfig::File { path } => Box::new(CsvFileSource::new(path.clone())),
        SourceConfig::Url { template } => {
            Box::new(HttpSource::new(template.clone(), config.cache_dir.clone()))
        }
    }
}

/// Pick the analysed series.
pub fn select<'a>(
    collection: &'a SeriesCollection,
    selection: &SeriesSelection,
) -> Result<&'a TurnoverSeries> {
    match selection {
        SeriesSelection::SeriesId(id) => collection.by_id(id),
        SeriesSelection::Seed(seed) => collection.select_random(*seed),
    }
}

fn ets_candidates(config: &PipelineConfig, boxcox: BoxCox) -> Result<Vec<BoxedForecaster>> {
    let mut candidates: Vec<BoxedForecaster> = config
        .ets_specs()?
        .into_iter()
        .map(|spec| {
            let model = ETS::new(spec, config.period);
            Box::new(BoxCoxForecaster::new(model, boxcox)) as BoxedForecaster
        })
        .collect();
    candidates.push(Box::new(BoxCoxForecaster::new(
        AutoETS::new(config.period),
        boxcox,
    )));
    Ok(candidates)
}

/// Conditioning span shared by every ARIMA candidate: the AR reach of the
/// longest shortlist order or of the widest automatic search that
/// `train_len` months support, whichever is larger.
pub fn arima_conditioning(orders: &[ARIMAOrder], period: usize, train_len: usize) -> usize {
    let search = AutoARIMAConfig {
        seasonal_period: period,
        ..AutoARIMAConfig::default()
    };
    let usable = train_len.saturating_sub(search.max_differencing_loss());
    orders
        .iter()
        .map(ARIMAOrder::ar_span)
        .chain(std::iter::once(search.conditioning_span(usable)))
        .max()
        .unwrap_or(0)
}

fn arima_candidates(
    config: &PipelineConfig,
    boxcox: BoxCox,
    train_len: usize,
) -> Result<Vec<BoxedForecaster>> {
    let orders = config.arima_orders()?;
    let span = arima_conditioning(&orders, config.period, train_len);
    debug!(span, "ARIMA conditioning span");
    let mut candidates: Vec<BoxedForecaster> = orders
        .into_iter()
        .map(|order| {
            let model = ARIMA::new(order).with_conditioning(span);
            Box::new(BoxCoxForecaster::new(model, boxcox)) as BoxedForecaster
        })
        .collect();
    candidates.push(Box::new(BoxCoxForecaster::new(
        AutoARIMA::new(config.period).with_conditioning(span),
        boxcox,
    )));
    Ok(candidates)
}

fn evaluate_family(
    candidates: Vec<BoxedForecaster>,
    family: ModelFamily,
    split: &TrainTestSplit,
    settings: &EvaluationSettings,
) -> Vec<CandidateOutcome> {
    let _span = info_span!("family", %family).entered();
    candidates
        .into_iter()
        .map(|mut model| evaluate_candidate(model.as_mut(), family, split, settings))
        .collect()
}

/// Transform, split and fit both model families on one series.
///
/// The Box-Cox lambda is shared by every candidate; the two families are
/// fitted in parallel.
pub fn analyse_series(series: &MonthlySeries, config: &PipelineConfig) -> Result<Analysis> {
    config.validate()?;
    // The transform stage runs before the split and describes the whole
    // selected series. The test months reach the candidates only through
    // the one Guerrero lambda; no model parameter is estimated on them.
    let transform = analyse(series.values(), config.period)?;
    let split = series.split(config.test_len)?;
    info!(
        train = split.train.len(),
        test = split.test.len(),
        "split series"
    );

    let settings = EvaluationSettings {
        period: config.period,
        levels: config.levels.clone(),
        ljung_box_lag: config.ljung_box_lag,
        acf_lags: 2 * config.period,
    };
    let ets = ets_candidates(config, transform.boxcox)?;
    let arima = arima_candidates(config, transform.boxcox, split.train.len())?;

    let (mut outcomes, arima_outcomes) = rayon::join(
        || evaluate_family(ets, ModelFamily::Ets, &split, &settings),
        || evaluate_family(arima, ModelFamily::Arima, &split, &settings),
    );
    outcomes.extend(arima_outcomes);

    Ok(Analysis {
        split,
        transform,
        outcomes,
    })
}

/// Clean `observations`, select one series and analyse it.
pub fn run_on_observations(
    observations: &[Observation],
    config: &PipelineConfig,
) -> Result<(TurnoverSeries, Analysis)> {
    let collection = clean(observations)?;
    let selected = select(&collection, &config.selection)?.clone();
    info!(
        series_id = %selected.series_id,
        region = selected.region(),
        industry = selected.industry(),
        months = selected.series.len(),
        "selected series"
    );
    let analysis = analyse_series(&selected.series, config)?;
    Ok((selected, analysis))
}

/// Run the whole pipeline, printing tables to `out` and writing charts
/// when enabled.
pub fn run<W: Write>(config: &PipelineConfig, out: &mut W) -> Result<PipelineOutput> {
    let source = source_for(config);
    let observations = {
        let _span = info_span!("load", table = %config.table).entered();
        source.fetch(&config.table)?
    };
    let (selected, analysis) = run_on_observations(&observations, config)?;

    writeln!(
        out,
        "Series {}: {} / {} ({} to {})",
        selected.series_id,
        selected.region(),
        selected.industry(),
        selected.series.start().format("%Y %b"),
        selected.series.end()?.format("%Y %b"),
    )?;
    writeln!(out)?;
    report::write_tables(out, &analysis.transform, &analysis.outcomes)?;

    let charts = if config.charts {
        let titled = MonthlySeries::new(
            format!("{} / {}", selected.region(), selected.industry()),
            selected.series.start(),
            selected.series.values().to_vec(),
        )?;
        report::render_charts(
            &config.output_dir,
            &titled,
            &analysis.split,
            &analysis.transform,
            &analysis.outcomes,
        )?
    } else {
        Vec::new()
    };

    Ok(PipelineOutput {
        selected,
        analysis,
        charts,
    })
}
