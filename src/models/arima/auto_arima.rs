//! Automatic seasonal ARIMA order selection.
//!
//! Differencing orders come from unit-root heuristics (seasonal strength
//! for D, KPSS for d); the ARMA orders and the constant are then chosen by
//! the Hyndman-Khandakar stepwise search on AICc. Every candidate conditions
//! on the same number of differenced values, so the AICc values it compares
//! come from the same observations.

use std::collections::HashSet;

use tracing::{debug, info};

use crate::core::{Forecast, MonthlySeries};
use crate::error::{Error, Result};
use crate::models::arima::model::{ARIMAOrder, ARIMA};
use crate::models::{FitStatistics, Forecaster};
use crate::transform::seasonal_difference;
use crate::validation::{ndiffs, nsdiffs};

/// Configuration for AutoARIMA.
#[derive(Debug, Clone)]
pub struct AutoARIMAConfig {
    pub seasonal_period: usize,
    pub max_p: usize,
    pub max_q: usize,
    pub max_cap_p: usize,
    pub max_cap_q: usize,
    /// Upper bound on p + q + P + Q.
    pub max_order: usize,
    pub max_d: usize,
    pub max_cap_d: usize,
    /// Significance level of the KPSS tests behind `d`.
    pub alpha: f64,
    /// Cap on the number of models fitted by the stepwise search.
    pub max_models: usize,
}

impl Default for AutoARIMAConfig {
    fn default() -> Self {
        Self {
            seasonal_period: 12,
            max_p: 5,
            max_q: 5,
            max_cap_p: 2,
            max_cap_q: 2,
            max_order: 5,
            max_d: 2,
            max_cap_d: 1,
            alpha: 0.05,
            max_models: 94,
        }
    }
}

impl AutoARIMAConfig {
    /// Observations lost to the largest allowed differencing.
    pub fn max_differencing_loss(&self) -> usize {
        self.max_d + self.max_cap_d * self.seasonal_period
    }

    /// Largest `(max_p, max_cap_p)` whose AR reach `p + P * period` fits in
    /// `span`. Seasonal orders are given up first.
    pub fn ar_limits(&self, span: usize) -> (usize, usize) {
        let (mut p, mut cap_p) = (self.max_p, self.max_cap_p);
        while p + cap_p * self.seasonal_period > span {
            if cap_p > 0 {
                cap_p -= 1;
            } else if p > 0 {
                p -= 1;
            } else {
                break;
            }
        }
        (p, cap_p)
    }

    /// Conditioning span for `n_differenced` usable values: the AR reach of
    /// the largest orders that leave at least half of them for estimation.
    pub fn conditioning_span(&self, n_differenced: usize) -> usize {
        let (p, cap_p) = self.ar_limits(n_differenced / 2);
        p + cap_p * self.seasonal_period
    }
}

/// A point in the search space: ARMA orders plus the constant flag.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
struct Candidate {
    order: ARIMAOrder,
    constant: bool,
}

/// Automatic seasonal ARIMA.
#[derive(Debug, Clone)]
pub struct AutoARIMA {
    config: AutoARIMAConfig,
    /// Fixed conditioning span shared with models fitted elsewhere.
    span: Option<usize>,
    /// AR limits and span of the current search.
    limits: (usize, usize),
    active_span: usize,
    selected_model: Option<ARIMA>,
    /// AICc of every model tried, best first.
    model_scores: Vec<(ARIMAOrder, bool, f64)>,
}

impl AutoARIMA {
    pub fn new(seasonal_period: usize) -> Self {
        Self::with_config(AutoARIMAConfig {
            seasonal_period,
            ..Default::default()
        })
    }

    pub fn with_config(config: AutoARIMAConfig) -> Self {
        Self {
            limits: (config.max_p, config.max_cap_p),
            config,
            span: None,
            active_span: 0,
            selected_model: None,
            model_scores: Vec::new(),
        }
    }

    /// Condition every candidate on `span` differenced values. Orders whose
    /// AR reach exceeds it are left out of the search.
    pub fn with_conditioning(mut self, span: usize) -> Self {
        self.span = Some(span);
        self
    }

    pub fn selected_order(&self) -> Option<ARIMAOrder> {
        self.selected_model.as_ref().map(ARIMA::order)
    }

    /// `(order, has constant, AICc)` for every model tried.
    pub fn model_scores(&self) -> &[(ARIMAOrder, bool, f64)] {
        &self.model_scores
    }

    /// Seasonal then ordinary differencing orders for `values`.
    pub fn differencing_orders(&self, values: &[f64]) -> (usize, usize) {
        let period = self.config.seasonal_period;
        let cap_d = if period > 1 && values.len() >= 2 * period {
            nsdiffs(values, period, self.config.max_cap_d)
        } else {
            0
        };
        let seasonally_differenced = seasonal_difference(values, cap_d, period);
        let d = ndiffs(
            &seasonally_differenced,
            self.config.alpha,
            self.config.max_d,
        );
        (d, cap_d)
    }

    fn within_limits(&self, order: &ARIMAOrder) -> bool {
        order.p <= self.limits.0
            && order.q <= self.config.max_q
            && order.cap_p <= self.limits.1
            && order.cap_q <= self.config.max_cap_q
            && order.num_coefficients() <= self.config.max_order
    }

    fn starting_candidates(&self, d: usize, cap_d: usize, seasonal: bool) -> Vec<Candidate> {
        let period = self.config.seasonal_period;
        let constant = d + cap_d < 2;
        let make = |p, q, sp, sq| {
            let (sp, sq) = if seasonal { (sp, sq) } else { (0, 0) };
            ARIMAOrder::seasonal((p, d, q), (sp, cap_d, sq), period)
        };

        let mut starts = vec![
            Candidate {
                order: make(2, 2, 1, 1),
                constant,
            },
            Candidate {
                order: make(0, 0, 0, 0),
                constant,
            },
            Candidate {
                order: make(1, 0, 1, 0),
                constant,
            },
            Candidate {
                order: make(0, 1, 0, 1),
                constant,
            },
        ];
        if constant {
            starts.push(Candidate {
                order: make(0, 0, 0, 0),
                constant: false,
            });
        }
        starts.retain(|c| self.within_limits(&c.order));
        starts
    }

    /// Orders one step away from `current`.
    fn neighbours(
        &self,
        current: Candidate,
        seasonal: bool,
        allow_constant: bool,
    ) -> Vec<Candidate> {
        let o = current.order;
        let step = |v: usize, delta: i32| -> Option<usize> {
            let next = v as i32 + delta;
            (next >= 0).then_some(next as usize)
        };

        let mut moves: Vec<(i32, i32, i32, i32)> = vec![
            (1, 0, 0, 0),
            (-1, 0, 0, 0),
            (0, 1, 0, 0),
            (0, -1, 0, 0),
            (1, 1, 0, 0),
            (-1, -1, 0, 0),
            (1, -1, 0, 0),
            (-1, 1, 0, 0),
        ];
        if seasonal {
            moves.extend([
                (0, 0, 1, 0),
                (0, 0, -1, 0),
                (0, 0, 0, 1),
                (0, 0, 0, -1),
                (0, 0, 1, 1),
                (0, 0, -1, -1),
                (0, 0, 1, -1),
                (0, 0, -1, 1),
            ]);
        }

        let mut out: Vec<Candidate> = moves
            .into_iter()
            .filter_map(|(dp, dq, dsp, dsq)| {
                let mut order = o;
                order.p = step(o.p, dp)?;
                order.q = step(o.q, dq)?;
                order.cap_p = step(o.cap_p, dsp)?;
                order.cap_q = step(o.cap_q, dsq)?;
                Some(Candidate {
                    order,
                    constant: current.constant,
                })
            })
            .filter(|c| self.within_limits(&c.order))
            .collect();

        if allow_constant {
            out.push(Candidate {
                order: o,
                constant: !current.constant,
            });
        }
        out
    }

    /// Fit one candidate; `None` when it fails.
    fn evaluate(&mut self, candidate: Candidate, series: &MonthlySeries) -> Option<(ARIMA, f64)> {
        let mut model = ARIMA::with_constant(candidate.order, candidate.constant)
            .with_conditioning(self.active_span);
        match model.fit(series) {
            Ok(()) => {
                let score = model
                    .fit_statistics()
                    .map_or(f64::INFINITY, |stats| stats.aicc);
                self.model_scores
                    .push((candidate.order, candidate.constant, score));
                Some((model, score))
            }
            Err(e) => {
                debug!(model = %candidate.order, error = %e, "candidate skipped");
                None
            }
        }
    }

    fn selected(&self) -> Result<&ARIMA> {
        self.selected_model.as_ref().ok_or(Error::FitRequired)
    }
}

impl Forecaster for AutoARIMA {
    fn fit(&mut self, series: &MonthlySeries) -> Result<()> {
        let values = series.values();
        let (d, cap_d) = self.differencing_orders(values);
        let period = self.config.seasonal_period;
        let seasonal = period > 1 && values.len() >= 2 * period;
        let allow_constant = d + cap_d < 2;

        let n_differenced = values.len().saturating_sub(d + cap_d * period);
        let (max_p, max_cap_p) = match self.span {
            Some(span) => self.config.ar_limits(span),
            None => self.config.ar_limits(n_differenced / 2),
        };
        self.limits = (max_p, if seasonal { max_cap_p } else { 0 });
        self.active_span = self
            .span
            .unwrap_or(self.limits.0 + self.limits.1 * period);
        debug!(d, cap_d, span = self.active_span, "AutoARIMA differencing orders");

        self.model_scores.clear();
        let mut visited: HashSet<Candidate> = HashSet::new();
        let mut best: Option<(ARIMA, f64)> = None;

        for candidate in self.starting_candidates(d, cap_d, seasonal) {
            if !visited.insert(candidate) {
                continue;
            }
            if let Some((model, score)) = self.evaluate(candidate, series) {
                if best.as_ref().map_or(true, |(_, b)| score < *b) {
                    best = Some((model, score));
                }
            }
        }

        loop {
            let Some((current_model, current_score)) = best.as_ref() else {
                break;
            };
            let current = Candidate {
                order: current_model.order(),
                constant: current_model.has_constant(),
            };
            let current_score = *current_score;

            let mut improved: Option<(ARIMA, f64)> = None;
            for candidate in self.neighbours(current, seasonal, allow_constant) {
                if visited.len() >= self.config.max_models {
                    break;
                }
                if !visited.insert(candidate) {
                    continue;
                }
                if let Some((model, score)) = self.evaluate(candidate, series) {
                    if score < current_score {
                        improved = Some((model, score));
                        break;
                    }
                }
            }

            match improved {
                Some(next) => best = Some(next),
                None => break,
            }
        }

        self.model_scores
            .sort_by(|a, b| a.2.partial_cmp(&b.2).unwrap_or(std::cmp::Ordering::Equal));

        let (model, score) = best.ok_or_else(|| {
            Error::ComputationError("no ARIMA order could be fitted".to_string())
        })?;
        info!(
            model = %model.name(),
            aicc = score,
            tried = self.model_scores.len(),
            "AutoARIMA selected"
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
        match &self.selected_model {
            Some(model) => format!("AutoARIMA {}", model.name()),
            None => "AutoARIMA".to_string(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;
    use rand::rngs::StdRng;
    use rand::{Rng, SeedableRng};
    use std::f64::consts::PI;

    fn monthly(values: Vec<f64>) -> MonthlySeries {
        MonthlySeries::new("test", NaiveDate::from_ymd_opt(2005, 1, 1).unwrap(), values).unwrap()
    }

    fn seasonal_trend(n: usize, seed: u64) -> Vec<f64> {
        let mut rng = StdRng::seed_from_u64(seed);
        (0..n)
            .map(|i| {
                500.0
                    + 3.0 * i as f64
                    + 60.0 * (2.0 * PI * i as f64 / 12.0).sin()
                    + rng.gen_range(-4.0..4.0)
            })
            .collect()
    }

    #[test]
    fn differencing_orders_for_seasonal_trend() {
        let auto = AutoARIMA::new(12);
        let (d, cap_d) = auto.differencing_orders(&seasonal_trend(96, 1));
        assert_eq!(cap_d, 1);
        assert!(d <= 1);
    }

    #[test]
    fn neighbours_respect_limits() {
        let auto = AutoARIMA::new(12);
        let current = Candidate {
            order: ARIMAOrder::seasonal((0, 1, 0), (0, 1, 0), 12),
            constant: false,
        };
        let next = auto.neighbours(current, true, false);
        assert!(next.iter().all(|c| auto.within_limits(&c.order)));
        assert!(next.iter().all(|c| !c.constant));
        // Only increases are possible from the origin.
        assert_eq!(next.len(), 6);

        let with_constant = auto.neighbours(current, false, true);
        assert_eq!(with_constant.len(), 4);
        assert!(with_constant.iter().any(|c| c.constant));
    }

    #[test]
    fn search_limits_follow_the_conditioning_span() {
        let config = AutoARIMAConfig::default();
        assert_eq!(config.ar_limits(100), (5, 2));
        assert_eq!(config.ar_limits(20), (5, 1));
        assert_eq!(config.ar_limits(10), (5, 0));
        assert_eq!(config.ar_limits(3), (3, 0));
        assert_eq!(config.conditioning_span(46), 17);
        assert_eq!(config.max_differencing_loss(), 14);
    }

    #[test]
    fn every_candidate_conditions_on_the_shared_span() {
        let values = seasonal_trend(84, 5);
        let mut auto = AutoARIMA::new(12).with_conditioning(13);
        auto.fit(&monthly(values)).unwrap();

        let order = auto.selected_order().unwrap();
        assert!(order.ar_span() <= 13);
        assert_eq!(order.cap_p, 0);
        let stats = auto.fit_statistics().unwrap();
        assert_eq!(stats.n_obs, 84 - order.differencing_loss() - 13);
    }

    #[test]
    fn selects_and_forecasts() {
        let values = seasonal_trend(96, 2);
        let mut auto = AutoARIMA::new(12);
        auto.fit(&monthly(values[..84].to_vec())).unwrap();

        let order = auto.selected_order().unwrap();
        assert_eq!(order.cap_d, 1);
        assert!(auto.name().starts_with("AutoARIMA ARIMA("));

        let scores = auto.model_scores();
        assert!(!scores.is_empty());
        assert!(scores.windows(2).all(|w| w[0].2 <= w[1].2));

        let fc = auto.predict_with_intervals(12, &[95.0]).unwrap();
        let band = fc.interval(95.0).unwrap();
        let covered = values[84..]
            .iter()
            .enumerate()
            .filter(|(h, a)| band.lower[*h] <= **a && **a <= band.upper[*h])
            .count();
        assert!(covered >= 9, "only {} of 12 inside the 95% band", covered);
    }

    #[test]
    fn unfitted_model_reports_fit_required() {
        let auto = AutoARIMA::new(12);
        assert!(matches!(auto.predict(1), Err(Error::FitRequired)));
        assert_eq!(auto.name(), "AutoARIMA");
    }
}
