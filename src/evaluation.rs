//! Scoring fitted candidates against the held-out test suffix.
//!
//! Each candidate is fitted on the training prefix and reduced to a
//! [`ModelReport`]: fit statistics, test-horizon forecasts with intervals,
//! accuracy measures and residual diagnostics. A candidate whose fit or
//! forecast fails is kept as [`CandidateOutcome::Failed`] so it still
//! appears in the comparison.

use std::cmp::Ordering;
use std::fmt;

use tracing::{info, warn};

use crate::core::{Forecast, TrainTestSplit};
use crate::error::{Error, Result};
use crate::models::{FitStatistics, Forecaster};
use crate::utils::stats::{acf, finite};
use crate::utils::{calculate_metrics, AccuracyMetrics};
use crate::validation::{ljung_box, LjungBoxResult};

/// The model family a candidate belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ModelFamily {
    Ets,
    Arima,
}

impl fmt::Display for ModelFamily {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ModelFamily::Ets => write!(f, "ETS"),
            ModelFamily::Arima => write!(f, "ARIMA"),
        }
    }
}

/// Settings shared by every candidate evaluation.
#[derive(Debug, Clone, PartialEq)]
pub struct EvaluationSettings {
    pub period: usize,
    /// Interval levels in percent.
    pub levels: Vec<f64>,
    pub ljung_box_lag: usize,
    /// Largest lag of the residual ACF.
    pub acf_lags: usize,
}

impl Default for EvaluationSettings {
    fn default() -> Self {
        Self {
            period: 12,
            levels: vec![80.0, 95.0],
            ljung_box_lag: 24,
            acf_lags: 24,
        }
    }
}

/// Equal-width histogram.
#[derive(Debug, Clone, PartialEq)]
pub struct Histogram {
    /// `bins + 1` edges, ascending.
    pub edges: Vec<f64>,
    pub counts: Vec<usize>,
}

impl Histogram {
    /// Bin `values` with Sturges' rule, `ceil(log2 n) + 1` bins.
    pub fn sturges(values: &[f64]) -> Self {
        let values = finite(values);
        if values.is_empty() {
            return Self {
                edges: Vec::new(),
                counts: Vec::new(),
            };
        }
        let bins = (values.len() as f64).log2().ceil() as usize + 1;
        let min = values.iter().copied().fold(f64::INFINITY, f64::min);
        let max = values.iter().copied().fold(f64::NEG_INFINITY, f64::max);
        let (low, width) = if max > min {
            (min, (max - min) / bins as f64)
        } else {
            (min - 0.5, 1.0 / bins as f64)
        };

        let edges: Vec<f64> = (0..=bins).map(|i| low + width * i as f64).collect();
        let mut counts = vec![0usize; bins];
        for v in values {
            let bin = (((v - low) / width).floor() as usize).min(bins - 1);
            counts[bin] += 1;
        }
        Self { edges, counts }
    }

    pub fn bins(&self) -> usize {
        self.counts.len()
    }
}

/// Whiteness checks on the training residuals.
#[derive(Debug, Clone, PartialEq)]
pub struct ResidualDiagnostics {
    /// Finite residuals, warm-up entries removed.
    pub residuals: Vec<f64>,
    /// Autocorrelations at lags `1..=acf.len()`.
    pub acf: Vec<f64>,
    /// Approximate 95 % significance bound, `1.96 / sqrt(n)`.
    pub acf_bound: f64,
    pub histogram: Histogram,
    pub ljung_box: LjungBoxResult,
}

impl ResidualDiagnostics {
    /// Diagnose `residuals` of a model with `n_coefficients` estimated
    /// coefficients. Ljung-Box uses `lag - n_coefficients` degrees of freedom.
    pub fn compute(
        residuals: &[f64],
        acf_lags: usize,
        lb_lag: usize,
        n_coefficients: usize,
    ) -> Self {
        let residuals = finite(residuals);
        let n = residuals.len();
        let acf_bound = if n > 0 { 1.96 / (n as f64).sqrt() } else { f64::NAN };
        Self {
            acf: acf(&residuals, acf_lags),
            acf_bound,
            histogram: Histogram::sturges(&residuals),
            ljung_box: ljung_box(&residuals, lb_lag, n_coefficients),
            residuals,
        }
    }

    /// Lags whose autocorrelation crosses the significance bound.
    pub fn significant_lags(&self) -> Vec<usize> {
        self.acf
            .iter()
            .enumerate()
            .filter(|(_, r)| r.abs() > self.acf_bound)
            .map(|(i, _)| i + 1)
            .collect()
    }
}

/// Everything reported for a successfully fitted candidate.
#[derive(Debug, Clone)]
pub struct ModelReport {
    pub name: String,
    pub family: ModelFamily,
    pub statistics: FitStatistics,
    /// In-sample one-step predictions on the original scale.
    pub fitted: Vec<f64>,
    /// Test-horizon forecast with intervals.
    pub forecast: Forecast,
    pub accuracy: AccuracyMetrics,
    pub diagnostics: ResidualDiagnostics,
}

/// Result of evaluating one candidate.
#[derive(Debug)]
pub enum CandidateOutcome {
    Fitted(Box<ModelReport>),
    Failed {
        name: String,
        family: ModelFamily,
        error: Error,
    },
}

impl CandidateOutcome {
    pub fn name(&self) -> &str {
        match self {
            CandidateOutcome::Fitted(report) => &report.name,
            CandidateOutcome::Failed { name, .. } => name,
        }
    }

    pub fn family(&self) -> ModelFamily {
        match self {
            CandidateOutcome::Fitted(report) => report.family,
            CandidateOutcome::Failed { family, .. } => *family,
        }
    }

    pub fn report(&self) -> Option<&ModelReport> {
        match self {
            CandidateOutcome::Fitted(report) => Some(report.as_ref()),
            CandidateOutcome::Failed { .. } => None,
        }
    }
}

/// Fit `model` on the training prefix and score it on the test suffix.
pub fn evaluate_candidate(
    model: &mut dyn Forecaster,
    family: ModelFamily,
    split: &TrainTestSplit,
    settings: &EvaluationSettings,
) -> CandidateOutcome {
    match try_evaluate(model, family, split, settings) {
        Ok(report) => {
            info!(
                model = %report.name,
                aicc = report.statistics.aicc,
                rmse = report.accuracy.rmse,
                "evaluated candidate"
            );
            CandidateOutcome::Fitted(Box::new(report))
        }
        Err(error) => {
            let name = model.name();
            warn!(model = %name, %error, "candidate failed");
            CandidateOutcome::Failed {
                name,
                family,
                error,
            }
        }
    }
}

fn try_evaluate(
    model: &mut dyn Forecaster,
    family: ModelFamily,
    split: &TrainTestSplit,
    settings: &EvaluationSettings,
) -> Result<ModelReport> {
    model.fit(&split.train)?;
    let statistics = model.fit_statistics().cloned().ok_or(Error::FitRequired)?;
    let fitted = model.fitted_values().ok_or(Error::FitRequired)?.to_vec();
    let residuals = model.residuals().ok_or(Error::FitRequired)?;
    let diagnostics = ResidualDiagnostics::compute(
        residuals,
        settings.acf_lags,
        settings.ljung_box_lag,
        statistics.n_coefficients,
    );

    let forecast = model.predict_with_intervals(split.horizon(), &settings.levels)?;
    let accuracy = calculate_metrics(
        split.test.values(),
        forecast.point(),
        split.train.values(),
        settings.period,
    )?;

    Ok(ModelReport {
        name: model.name(),
        family,
        statistics,
        fitted,
        forecast,
        accuracy,
        diagnostics,
    })
}

/// Fitted candidates of `family`, lowest AICc first.
pub fn rank_by_aicc(outcomes: &[CandidateOutcome], family: ModelFamily) -> Vec<&ModelReport> {
    let mut reports: Vec<&ModelReport> = outcomes
        .iter()
        .filter(|o| o.family() == family)
        .filter_map(CandidateOutcome::report)
        .collect();
    reports.sort_by(|a, b| {
        a.statistics
            .aicc
            .partial_cmp(&b.statistics.aicc)
            .unwrap_or(Ordering::Equal)
    });
    reports
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::MonthlySeries;
    use crate::models::{ETSSpec, ETS};
    use approx::assert_relative_eq;
    use chrono::NaiveDate;

    struct Broken;

    impl Forecaster for Broken {
        fn fit(&mut self, _series: &MonthlySeries) -> Result<()> {
            Err(Error::non_convergence("Broken", "objective is not finite"))
        }
        fn predict(&self, _horizon: usize) -> Result<Forecast> {
            Err(Error::FitRequired)
        }
        fn predict_with_intervals(&self, _horizon: usize, _levels: &[f64]) -> Result<Forecast> {
            Err(Error::FitRequired)
        }
        fn fitted_values(&self) -> Option<&[f64]> {
            None
        }
        fn residuals(&self) -> Option<&[f64]> {
            None
        }
        fn fit_statistics(&self) -> Option<&FitStatistics> {
            None
        }
        fn name(&self) -> String {
            "Broken".to_string()
        }
    }

    fn seasonal_split() -> TrainTestSplit {
        let values: Vec<f64> = (0..72)
            .map(|i| {
                let t = i as f64;
                200.0 + 1.5 * t + 25.0 * (2.0 * std::f64::consts::PI * t / 12.0).sin()
                    + 3.0 * (1.7 * t).sin()
            })
            .collect();
        let start = NaiveDate::from_ymd_opt(2010, 1, 1).unwrap();
        MonthlySeries::new("synthetic", start, values)
            .unwrap()
            .split(24)
            .unwrap()
    }

    #[test]
    fn sturges_bins_cover_all_values() {
        let values: Vec<f64> = (0..100).map(|i| (i as f64 * 0.37).sin()).collect();
        let hist = Histogram::sturges(&values);
        assert_eq!(hist.bins(), 8);
        assert_eq!(hist.edges.len(), 9);
        assert_eq!(hist.counts.iter().sum::<usize>(), 100);
    }

    #[test]
    fn histogram_of_constant_values() {
        let hist = Histogram::sturges(&[2.0, 2.0, 2.0, f64::NAN]);
        assert_eq!(hist.counts.iter().sum::<usize>(), 3);
        assert!(Histogram::sturges(&[]).counts.is_empty());
    }

    #[test]
    fn diagnostics_skip_warm_up_and_subtract_coefficients() {
        let mut residuals = vec![f64::NAN; 13];
        residuals.extend((0..60).map(|i| (i as f64 * 2.3).sin()));
        let diag = ResidualDiagnostics::compute(&residuals, 24, 24, 3);
        assert_eq!(diag.residuals.len(), 60);
        assert_eq!(diag.acf.len(), 24);
        assert_relative_eq!(diag.acf_bound, 1.96 / 60f64.sqrt());
        assert_eq!(diag.ljung_box.df, 21);
    }

    #[test]
    fn failed_fit_is_kept() {
        let split = seasonal_split();
        let outcome = evaluate_candidate(
            &mut Broken,
            ModelFamily::Arima,
            &split,
            &EvaluationSettings::default(),
        );
        match outcome {
            CandidateOutcome::Failed { name, error, .. } => {
                assert_eq!(name, "Broken");
                assert!(matches!(error, Error::NonConvergence { .. }));
            }
            CandidateOutcome::Fitted(_) => panic!("expected failure"),
        }
    }

    #[test]
    fn evaluates_ets_candidate() {
        let split = seasonal_split();
        let mut model = ETS::new(ETSSpec::aada(), 12);
        let outcome = evaluate_candidate(
            &mut model,
            ModelFamily::Ets,
            &split,
            &EvaluationSettings::default(),
        );
        let report = outcome.report().expect("fit should succeed");
        assert_eq!(report.forecast.horizon(), 24);
        assert_eq!(report.forecast.intervals().len(), 2);
        assert_eq!(report.fitted.len(), 48);
        assert!(report.accuracy.rmse.is_finite());
        assert!(report.accuracy.mase.is_some());
        assert!(report.statistics.aicc.is_finite());

        let ranked = rank_by_aicc(std::slice::from_ref(&outcome), ModelFamily::Ets);
        assert_eq!(ranked.len(), 1);
        assert!(rank_by_aicc(&[outcome], ModelFamily::Arima).is_empty());
    }
}
