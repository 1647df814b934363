//! Automatic ETS model selection by AICc.

use tracing::{debug, info};

use crate::core::{Forecast, MonthlySeries};
use crate::error::{Error, Result};
use crate::models::exponential::ets::{ETSSpec, ErrorType, SeasonalType, TrendType, ETS};
use crate::models::{FitStatistics, Forecaster};

/// Configuration for AutoETS.
#[derive(Debug, Clone)]
pub struct AutoETSConfig {
    pub seasonal_period: usize,
    pub allow_multiplicative: bool,
    pub allow_damped: bool,
}

impl Default for AutoETSConfig {
    fn default() -> Self {
        Self {
            seasonal_period: 12,
            allow_multiplicative: true,
            allow_damped: true,
        }
    }
}

/// Fits every admissible ETS specification and keeps the one with the
/// lowest AICc.
///
/// Multiplicative components are only tried on strictly positive data and
/// additive error with multiplicative season is never tried.
#[derive(Debug, Clone)]
pub struct AutoETS {
    config: AutoETSConfig,
    selected_model: Option<ETS>,
    /// AICc of every specification that fitted, best first.
    model_scores: Vec<(ETSSpec, f64)>,
}

impl AutoETS {
    pub fn new(seasonal_period: usize) -> Self {
        Self::with_config(AutoETSConfig {
            seasonal_period,
            ..Default::default()
        })
    }

    pub fn with_config(config: AutoETSConfig) -> Self {
        Self {
            config,
            selected_model: None,
            model_scores: Vec::new(),
        }
    }

    pub fn selected_spec(&self) -> Option<ETSSpec> {
        self.selected_model.as_ref().map(ETS::spec)
    }

    pub fn model_scores(&self) -> &[(ETSSpec, f64)] {
        &self.model_scores
    }

    fn generate_candidates(&self, positive: bool, seasonal: bool) -> Vec<ETSSpec> {
        let multiplicative = positive && self.config.allow_multiplicative;

        let mut errors = vec![ErrorType::Additive];
        let mut trends = vec![TrendType::None, TrendType::Additive];
        let mut seasons = vec![SeasonalType::None];
        if multiplicative {
            errors.push(ErrorType::Multiplicative);
        }
        if self.config.allow_damped {
            trends.push(TrendType::AdditiveDamped);
        }
        if seasonal {
            seasons.push(SeasonalType::Additive);
            if multiplicative {
                seasons.push(SeasonalType::Multiplicative);
            }
        }

        let mut candidates = Vec::new();
        for &error in &errors {
            for &trend in &trends {
                for &season in &seasons {
                    let spec = ETSSpec::new(error, trend, season);
                    if spec.is_stable() {
                        candidates.push(spec);
                    }
                }
            }
        }
        candidates
    }

    fn selected(&self) -> Result<&ETS> {
        self.selected_model.as_ref().ok_or(Error::FitRequired)
    }
}

impl Forecaster for AutoETS {
    fn fit(&mut self, series: &MonthlySeries) -> Result<()> {
        let values = series.values();
        let period = self.config.seasonal_period;
        let positive = values.iter().all(|&v| v > 0.0);
        let seasonal = period > 1 && values.len() >= 2 * period;

        self.model_scores.clear();
        let mut best: Option<(ETS, f64)> = None;

        for spec in self.generate_candidates(positive, seasonal) {
            let mut model = ETS::new(spec, period);
            match model.fit(series) {
                Ok(()) => {
                    let score = model
                        .fit_statistics()
                        .map_or(f64::INFINITY, |stats| stats.aicc);
                    self.model_scores.push((spec, score));
                    if best.as_ref().map_or(true, |(_, b)| score < *b) {
                        best = Some((model, score));
                    }
                }
                Err(e) => debug!(model = %spec, error = %e, "candidate skipped"),
            }
        }

        self.model_scores
            .sort_by(|a, b| a.1.partial_cmp(&b.1).unwrap_or(std::cmp::Ordering::Equal));

        let (model, score) = best.ok_or_else(|| {
            Error::ComputationError("no ETS specification could be fitted".to_string())
        })?;
        info!(
            model = %model.spec(),
            aicc = score,
            tried = self.model_scores.len(),
            "AutoETS selected"
        );
        self.selected_model = Some(model);
        Ok(())
    }

    fn predict(&self, horizon: usize) -> Result<Forecast> {
        self.selected()?.predict(horizon)
    }

    fn predict_with_intervals(&self, horizon: usize, levels: &[f64]) -> Result<Forecast> {
        self.selected()?.predict_with_intervals(horizon, levels)
    }

    fn fitted_values(&self) -> Option<&[f64]> {
        self.selected_model.as_ref()?.fitted_values()
    }

    fn residuals(&self) -> Option<&[f64]> {
        self.selected_model.as_ref()?.residuals()
    }

    fn fit_statistics(&self) -> Option<&FitStatistics> {
        self.selected_model.as_ref()?.fit_statistics()
    }

    fn name(&self) -> String {
        match self.selected_spec() {
            Some(spec) => format!("AutoETS {}", spec),
            None => "AutoETS".to_string(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;
    use std::f64::consts::PI;

    fn monthly(values: Vec<f64>) -> MonthlySeries {
        MonthlySeries::new("test", NaiveDate::from_ymd_opt(2012, 7, 1).unwrap(), values).unwrap()
    }

    #[test]
    fn candidate_set_respects_positivity() {
        let auto = AutoETS::new(12);
        let all = auto.generate_candidates(true, true);
        // 2 errors x 3 trends x 3 seasons minus the three A,*,M models
        assert_eq!(all.len(), 15);
        assert!(all.iter().all(|s| s.is_stable()));

        let additive = auto.generate_candidates(false, true);
        assert_eq!(additive.len(), 6);
        assert!(additive.iter().all(|s| !s.is_multiplicative()));

        assert_eq!(auto.generate_candidates(true, false).len(), 6);
    }

    #[test]
    fn selects_seasonal_model_for_seasonal_data() {
        let values: Vec<f64> = (0..72)
            .map(|i| {
                300.0 + 2.0 * i as f64 + 40.0 * (2.0 * PI * i as f64 / 12.0).sin()
                    + 3.0 * (i as f64 * 2.1).cos()
            })
            .collect();
        let mut auto = AutoETS::new(12);
        auto.fit(&monthly(values)).unwrap();

        let spec = auto.selected_spec().unwrap();
        assert!(spec.has_seasonal());
        assert!(auto.name().starts_with("AutoETS ETS("));

        let scores = auto.model_scores();
        assert!(scores.windows(2).all(|w| w[0].1 <= w[1].1));
        assert_eq!(auto.fit_statistics().unwrap().aicc, scores[0].1);
        assert_eq!(auto.predict(12).unwrap().horizon(), 12);
    }

    #[test]
    fn unfitted_model_reports_fit_required() {
        let auto = AutoETS::new(12);
        assert_eq!(auto.name(), "AutoETS");
        assert!(matches!(auto.predict(1), Err(Error::FitRequired)));
    }
}
