//! ETS (Error-Trend-Seasonal) innovations state-space model.
//!
//! States are a level, an optional (possibly damped) additive trend and an
//! optional additive or multiplicative seasonal component. Written in terms
//! of the additive innovation `u = y - yhat`, the state updates are the same
//! for additive and multiplicative errors; the error type only changes the
//! likelihood and the scale of the prediction intervals.

use std::fmt;
use std::str::FromStr;

use tracing::{debug, warn};

use crate::core::{Forecast, MonthlySeries};
use crate::error::{Error, Result};
use crate::models::{FitStatistics, Forecaster};
use crate::utils::optimization::{nelder_mead, NelderMeadConfig};
use crate::utils::stats::{interval_multiplier, mean};

const SMOOTHING_BOUNDS: (f64, f64) = (0.0001, 0.9999);
const DAMPING_BOUNDS: (f64, f64) = (0.8, 0.98);

/// Error component type.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ErrorType {
    #[default]
    Additive,
    Multiplicative,
}

/// Trend component type.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum TrendType {
    #[default]
    None,
    Additive,
    AdditiveDamped,
}

/// Seasonal component type.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SeasonalType {
    #[default]
    None,
    Additive,
    Multiplicative,
}

/// ETS model specification.
///
/// Parses from the component letters, with or without the `ETS(...)` wrapper:
///
/// ```
/// use turnover_forecast::models::exponential::{ETSSpec, TrendType};
///
/// let spec: ETSSpec = "A,Ad,A".parse().unwrap();
/// assert_eq!(spec.trend, TrendType::AdditiveDamped);
/// assert_eq!(spec.short_name(), "ETS(A,Ad,A)");
/// assert_eq!("ETS(M,A,M)".parse::<ETSSpec>().unwrap().short_name(), "ETS(M,A,M)");
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ETSSpec {
    pub error: ErrorType,
    pub trend: TrendType,
    pub seasonal: SeasonalType,
}

impl ETSSpec {
    pub fn new(error: ErrorType, trend: TrendType, seasonal: SeasonalType) -> Self {
        Self {
            error,
            trend,
            seasonal,
        }
    }

    /// ETS(M,A,M) - multiplicative Holt-Winters.
    pub fn mam() -> Self {
        Self::new(
            ErrorType::Multiplicative,
            TrendType::Additive,
            SeasonalType::Multiplicative,
        )
    }

    /// ETS(A,Ad,A) - damped additive Holt-Winters.
    pub fn aada() -> Self {
        Self::new(
            ErrorType::Additive,
            TrendType::AdditiveDamped,
            SeasonalType::Additive,
        )
    }

    pub fn short_name(&self) -> String {
        let e = match self.error {
            ErrorType::Additive => "A",
            ErrorType::Multiplicative => "M",
        };
        let t = match self.trend {
            TrendType::None => "N",
            TrendType::Additive => "A",
            TrendType::AdditiveDamped => "Ad",
        };
        let s = match self.seasonal {
            SeasonalType::None => "N",
            SeasonalType::Additive => "A",
            SeasonalType::Multiplicative => "M",
        };
        format!("ETS({},{},{})", e, t, s)
    }

    pub fn has_trend(&self) -> bool {
        !matches!(self.trend, TrendType::None)
    }

    pub fn has_seasonal(&self) -> bool {
        !matches!(self.seasonal, SeasonalType::None)
    }

    pub fn is_damped(&self) -> bool {
        matches!(self.trend, TrendType::AdditiveDamped)
    }

    /// Whether any component is multiplicative, which needs positive data.
    pub fn is_multiplicative(&self) -> bool {
        self.error == ErrorType::Multiplicative || self.seasonal == SeasonalType::Multiplicative
    }

    /// Additive error with multiplicative season is numerically unstable
    /// and excluded from automatic selection.
    pub fn is_stable(&self) -> bool {
        !(self.error == ErrorType::Additive && self.seasonal == SeasonalType::Multiplicative)
    }

    /// Number of smoothing and damping parameters.
    pub fn num_smoothing_params(&self) -> usize {
        1 + usize::from(self.has_trend())
            + usize::from(self.has_seasonal())
            + usize::from(self.is_damped())
    }
}

impl fmt::Display for ETSSpec {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.short_name())
    }
}

impl FromStr for ETSSpec {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        let trimmed = s.trim();
        let inner = trimmed
            .strip_prefix("ETS(")
            .and_then(|rest| rest.strip_suffix(')'))
            .unwrap_or(trimmed);
        let parts: Vec<&str> = inner.split(',').map(str::trim).collect();
        let invalid = || Error::InvalidParameter(format!("invalid ETS specification '{}'", s));
        if parts.len() != 3 {
            return Err(invalid());
        }

        let error = match parts[0] {
            "A" => ErrorType::Additive,
            "M" => ErrorType::Multiplicative,
            _ => return Err(invalid()),
        };
        let trend = match parts[1] {
            "N" => TrendType::None,
            "A" => TrendType::Additive,
            "Ad" => TrendType::AdditiveDamped,
            _ => return Err(invalid()),
        };
        let seasonal = match parts[2] {
            "N" => SeasonalType::None,
            "A" => SeasonalType::Additive,
            "M" => SeasonalType::Multiplicative,
            _ => return Err(invalid()),
        };
        Ok(Self::new(error, trend, seasonal))
    }
}

/// Smoothing weights. Unused components are zero (phi is one when undamped).
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ETSParams {
    pub alpha: f64,
    pub beta: f64,
    pub gamma: f64,
    pub phi: f64,
}

/// State at one point in time.
#[derive(Debug, Clone)]
struct State {
    level: f64,
    trend: f64,
    /// Seasonal component for each position within the period.
    seasonals: Vec<f64>,
}

/// Output of one pass of the filter over the data.
struct FilterPass {
    fitted: Vec<f64>,
    innovations: Vec<f64>,
    final_state: State,
    /// Sum of squared innovations on the error's scale.
    sse: f64,
    /// Sum of ln|yhat|, the multiplicative-error Jacobian term.
    sum_log_fitted: f64,
}

/// ETS state-space model.
#[derive(Debug, Clone)]
pub struct ETS {
    spec: ETSSpec,
    seasonal_period: usize,
    /// Fixed weights; estimated when `None`.
    fixed: Option<ETSParams>,
    params: Option<ETSParams>,
    state: Option<State>,
    fitted: Option<Vec<f64>>,
    residuals: Option<Vec<f64>>,
    stats: Option<FitStatistics>,
    n: usize,
}

impl ETS {
    /// ETS model whose weights are estimated by maximum likelihood.
    pub fn new(spec: ETSSpec, seasonal_period: usize) -> Self {
        Self {
            spec,
            seasonal_period,
            fixed: None,
            params: None,
            state: None,
            fitted: None,
            residuals: None,
            stats: None,
            n: 0,
        }
    }

    /// ETS model with fixed weights.
    pub fn with_params(spec: ETSSpec, seasonal_period: usize, params: ETSParams) -> Self {
        let mut model = Self::new(spec, seasonal_period);
        model.fixed = Some(params);
        model
    }

    pub fn spec(&self) -> ETSSpec {
        self.spec
    }

    /// Smoothing weights in effect after fitting.
    pub fn params(&self) -> Option<ETSParams> {
        self.params
    }

    fn period(&self) -> usize {
        if self.spec.has_seasonal() {
            self.seasonal_period
        } else {
            1
        }
    }

    fn min_observations(&self) -> usize {
        if self.spec.has_seasonal() {
            2 * self.seasonal_period
        } else {
            3
        }
    }

    /// Initial states from the first two seasons.
    ///
    /// The trend is the average change between the first two seasonal means
    /// and the level is projected back to just before the first observation.
    fn initialize_state(&self, values: &[f64]) -> State {
        let m = self.period();

        if !self.spec.has_seasonal() {
            let trend = if self.spec.has_trend() {
                values[1] - values[0]
            } else {
                0.0
            };
            return State {
                level: values[0] - trend,
                trend,
                seasonals: vec![0.0],
            };
        }

        let first = mean(&values[..m]);
        let trend = if self.spec.has_trend() {
            (mean(&values[m..2 * m]) - first) / m as f64
        } else {
            0.0
        };
        let level = first - trend * (m as f64 + 1.0) / 2.0;

        let raw: Vec<f64> = values[..m]
            .iter()
            .enumerate()
            .map(|(j, &y)| {
                let base = level + trend * (j as f64 + 1.0);
                match self.spec.seasonal {
                    SeasonalType::Multiplicative => y / base,
                    _ => y - base,
                }
            })
            .collect();
        let centre = mean(&raw);
        let seasonals = match self.spec.seasonal {
            SeasonalType::Multiplicative => raw.iter().map(|s| s / centre).collect(),
            _ => raw.iter().map(|s| s - centre).collect(),
        };

        State {
            level,
            trend,
            seasonals,
        }
    }

    /// Map the optimiser's free vector onto admissible weights.
    ///
    /// Layout: `[alpha, beta*, gamma*, phi]` with absent components skipped;
    /// `beta = beta* * alpha` and `gamma = gamma* * (1 - alpha)`.
    fn params_from_vector(&self, p: &[f64]) -> ETSParams {
        let mut it = p.iter().copied();
        let alpha = it.next().unwrap_or(0.3);
        let beta = if self.spec.has_trend() {
            it.next().unwrap_or(0.1) * alpha
        } else {
            0.0
        };
        let gamma = if self.spec.has_seasonal() {
            it.next().unwrap_or(0.1) * (1.0 - alpha)
        } else {
            0.0
        };
        let phi = if self.spec.is_damped() {
            it.next().unwrap_or(0.98)
        } else {
            1.0
        };
        ETSParams {
            alpha,
            beta,
            gamma,
            phi,
        }
    }

    /// Run the filter. `None` when the states leave the admissible region.
    fn filter(&self, values: &[f64], params: &ETSParams) -> Option<FilterPass> {
        let m = self.period();
        let multiplicative_error = self.spec.error == ErrorType::Multiplicative;
        let mut state = self.initialize_state(values);

        let mut fitted = Vec::with_capacity(values.len());
        let mut innovations = Vec::with_capacity(values.len());
        let mut sse = 0.0;
        let mut sum_log_fitted = 0.0;

        for (t, &y) in values.iter().enumerate() {
            let idx = t % m;
            let s = state.seasonals[idx];
            let base = state.level + params.phi * state.trend;
            let forecast = match self.spec.seasonal {
                SeasonalType::None => base,
                SeasonalType::Additive => base + s,
                SeasonalType::Multiplicative => base * s,
            };
            if !forecast.is_finite() || (self.spec.is_multiplicative() && forecast <= 0.0) {
                return None;
            }

            let u = y - forecast;
            let e = if multiplicative_error { u / forecast } else { u };
            sse += e * e;
            if multiplicative_error {
                sum_log_fitted += forecast.abs().ln();
            }
            fitted.push(forecast);
            innovations.push(e);

            match self.spec.seasonal {
                SeasonalType::Multiplicative => {
                    state.level = base + params.alpha * u / s;
                    state.trend = params.phi * state.trend + params.beta * u / s;
                    state.seasonals[idx] = s + params.gamma * u / base;
                }
                _ => {
                    state.level = base + params.alpha * u;
                    state.trend = params.phi * state.trend + params.beta * u;
                    if self.spec.has_seasonal() {
                        state.seasonals[idx] = s + params.gamma * u;
                    }
                }
            }
        }

        Some(FilterPass {
            fitted,
            innovations,
            final_state: state,
            sse,
            sum_log_fitted,
        })
    }

    fn log_likelihood(pass: &FilterPass, n: usize) -> f64 {
        let n = n as f64;
        let sigma2 = pass.sse / n;
        -0.5 * n * (1.0 + sigma2.ln() + (2.0 * std::f64::consts::PI).ln()) - pass.sum_log_fitted
    }

    /// Maximum-likelihood weights with the bounded simplex.
    fn optimize_params(&self, values: &[f64]) -> Result<(ETSParams, bool)> {
        let mut start = vec![0.3];
        let mut bounds = vec![SMOOTHING_BOUNDS];
        if self.spec.has_trend() {
            start.push(0.1);
            bounds.push(SMOOTHING_BOUNDS);
        }
        if self.spec.has_seasonal() {
            start.push(0.1);
            bounds.push(SMOOTHING_BOUNDS);
        }
        if self.spec.is_damped() {
            start.push(0.98);
            bounds.push(DAMPING_BOUNDS);
        }

        let n = values.len();
        let objective = |p: &[f64]| {
            let params = self.params_from_vector(p);
            match self.filter(values, &params) {
                Some(pass) => {
                    let ll = Self::log_likelihood(&pass, n);
                    if ll.is_finite() {
                        -ll
                    } else {
                        f64::MAX
                    }
                }
                None => f64::MAX,
            }
        };

        let config = NelderMeadConfig {
            max_iter: 1000,
            ..Default::default()
        };
        let optimum = nelder_mead(objective, &start, Some(&bounds), &config);

        if !optimum.value.is_finite() || optimum.value >= f64::MAX {
            return Err(Error::non_convergence(
                self.spec.short_name(),
                "no admissible smoothing weights",
            ));
        }
        Ok((self.params_from_vector(&optimum.point), optimum.converged))
    }

    /// Coefficients `c_j` of the innovations in the h-step forecast error.
    fn error_weights(&self, params: &ETSParams, horizon: usize) -> Vec<f64> {
        let m = self.period();
        (1..horizon)
            .map(|j| {
                let trend_part = if self.spec.has_trend() {
                    params.beta * damped_sum(params.phi, j)
                } else {
                    0.0
                };
                let season_part = if self.spec.has_seasonal() && j % m == 0 {
                    params.gamma
                } else {
                    0.0
                };
                params.alpha + trend_part + season_part
            })
            .collect()
    }

    fn point_forecasts(&self, state: &State, params: &ETSParams, horizon: usize) -> Vec<f64> {
        let m = self.period();
        (1..=horizon)
            .map(|h| {
                let base = state.level + damped_sum(params.phi, h) * state.trend;
                let s = state.seasonals[(self.n + h - 1) % m];
                match self.spec.seasonal {
                    SeasonalType::None => base,
                    SeasonalType::Additive => base + s,
                    SeasonalType::Multiplicative => base * s,
                }
            })
            .collect()
    }
}

/// `phi + phi^2 + ... + phi^h`, which is `h` for an undamped trend.
fn damped_sum(phi: f64, h: usize) -> f64 {
    if (phi - 1.0).abs() < 1e-10 {
        h as f64
    } else {
        phi * (1.0 - phi.powi(h as i32)) / (1.0 - phi)
    }
}

impl Forecaster for ETS {
    fn fit(&mut self, series: &MonthlySeries) -> Result<()> {
        let values = series.values();
        let min_len = self.min_observations();
        if values.len() < min_len {
            return Err(Error::InsufficientData {
                needed: min_len,
                got: values.len(),
            });
        }
        if self.spec.is_multiplicative() && values.iter().any(|&v| v <= 0.0) {
            return Err(Error::InvalidParameter(format!(
                "{} needs strictly positive data",
                self.spec.short_name()
            )));
        }

        self.n = values.len();
        let (params, converged) = match self.fixed {
            Some(p) => (p, true),
            None => self.optimize_params(values)?,
        };
        if !converged {
            warn!(model = %self.spec, "smoothing weight search hit its iteration limit");
        }

        let pass = self.filter(values, &params).ok_or_else(|| {
            Error::non_convergence(self.spec.short_name(), "states left the admissible region")
        })?;

        let log_likelihood = Self::log_likelihood(&pass, self.n);
        let sigma2 = pass.sse / self.n as f64;
        let n_smoothing = if self.fixed.is_some() {
            0
        } else {
            self.spec.num_smoothing_params()
        };
        let n_states = 1
            + usize::from(self.spec.has_trend())
            + if self.spec.has_seasonal() {
                self.seasonal_period - 1
            } else {
                0
            };
        let stats = FitStatistics::from_log_likelihood(
            log_likelihood,
            sigma2,
            n_smoothing + n_states + 1,
            self.spec.num_smoothing_params(),
            self.n,
            converged,
        );
        debug!(
            model = %self.spec,
            alpha = params.alpha,
            beta = params.beta,
            gamma = params.gamma,
            phi = params.phi,
            aicc = stats.aicc,
            "fitted ETS"
        );

        self.params = Some(params);
        self.state = Some(pass.final_state);
        self.fitted = Some(pass.fitted);
        self.residuals = Some(pass.innovations);
        self.stats = Some(stats);
        Ok(())
    }

    fn predict(&self, horizon: usize) -> Result<Forecast> {
        let state = self.state.as_ref().ok_or(Error::FitRequired)?;
        let params = self.params.ok_or(Error::FitRequired)?;
        Ok(Forecast::from_values(
            self.point_forecasts(state, &params, horizon),
        ))
    }

    fn predict_with_intervals(&self, horizon: usize, levels: &[f64]) -> Result<Forecast> {
        let mut forecast = self.predict(horizon)?;
        let params = self.params.ok_or(Error::FitRequired)?;
        let sigma2 = self.stats.as_ref().ok_or(Error::FitRequired)?.sigma2;

        let weights = self.error_weights(&params, horizon);
        let mut cumulative = 1.0;
        let std_errors: Vec<f64> = forecast
            .point()
            .iter()
            .enumerate()
            .map(|(i, &point)| {
                if i > 0 {
                    cumulative += weights[i - 1] * weights[i - 1];
                }
                let scale = if self.spec.error == ErrorType::Multiplicative {
                    point * point
                } else {
                    1.0
                };
                (sigma2 * scale * cumulative).sqrt()
            })
            .collect();

        for &level in levels {
            let z = interval_multiplier(level);
            let (lower, upper) = forecast
                .point()
                .iter()
                .zip(&std_errors)
                .map(|(p, se)| (p - z * se, p + z * se))
                .unzip();
            forecast.push_interval(level, lower, upper)?;
        }
        Ok(forecast)
    }

    fn fitted_values(&self) -> Option<&[f64]> {
        self.fitted.as_deref()
    }

    fn residuals(&self) -> Option<&[f64]> {
        self.residuals.as_deref()
    }

    fn fit_statistics(&self) -> Option<&FitStatistics> {
        self.stats.as_ref()
    }

    fn name(&self) -> String {
        self.spec.short_name()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;
    use chrono::NaiveDate;
    use std::f64::consts::PI;

    fn monthly(values: Vec<f64>) -> MonthlySeries {
        MonthlySeries::new("test", NaiveDate::from_ymd_opt(2010, 1, 1).unwrap(), values).unwrap()
    }

    fn seasonal_series(n: usize) -> Vec<f64> {
        (0..n)
            .map(|i| {
                200.0
                    + 1.5 * i as f64
                    + 25.0 * (2.0 * PI * i as f64 / 12.0).sin()
                    + 2.0 * (i as f64 * 1.7).sin()
            })
            .collect()
    }

    #[test]
    fn spec_parsing() {
        let spec: ETSSpec = "M,A,M".parse().unwrap();
        assert_eq!(spec, ETSSpec::mam());
        assert_eq!(" A , Ad , A ".parse::<ETSSpec>().unwrap(), ETSSpec::aada());
        assert!("A,X,N".parse::<ETSSpec>().is_err());
        assert!("A,N".parse::<ETSSpec>().is_err());
        assert!(!"A,N,M".parse::<ETSSpec>().unwrap().is_stable());
    }

    #[test]
    fn simple_smoothing_with_alpha_one_is_naive() {
        let params = ETSParams {
            alpha: 1.0,
            beta: 0.0,
            gamma: 0.0,
            phi: 1.0,
        };
        let mut model = ETS::with_params("A,N,N".parse().unwrap(), 1, params);
        model.fit(&monthly(vec![3.0, 5.0, 4.0, 8.0])).unwrap();
        let fc = model.predict(3).unwrap();
        assert_eq!(fc.point(), &[8.0, 8.0, 8.0]);
        assert_eq!(model.fitted_values().unwrap()[1..], [3.0, 5.0, 4.0]);
    }

    #[test]
    fn additive_holt_winters_tracks_trend() {
        let values = seasonal_series(72);
        let mut model = ETS::new("A,A,A".parse().unwrap(), 12);
        model.fit(&monthly(values[..60].to_vec())).unwrap();

        let fc = model.predict(12).unwrap();
        for (f, a) in fc.point().iter().zip(&values[60..]) {
            assert!((f - a).abs() < 10.0, "forecast {} vs actual {}", f, a);
        }
        let stats = model.fit_statistics().unwrap();
        assert!(stats.aicc.is_finite());
        assert_eq!(stats.n_coefficients, 3);
        // 3 weights + level + trend + 11 seasonal states + variance
        assert_eq!(stats.n_params, 17);
    }

    #[test]
    fn multiplicative_model_on_positive_data() {
        let values: Vec<f64> = (0..60)
            .map(|i| (100.0 + 2.0 * i as f64) * (1.0 + 0.2 * (2.0 * PI * i as f64 / 12.0).cos()))
            .collect();
        let mut model = ETS::new(ETSSpec::mam(), 12);
        model.fit(&monthly(values)).unwrap();
        let fc = model.predict_with_intervals(24, &[80.0, 95.0]).unwrap();
        assert_eq!(fc.horizon(), 24);
        assert!(fc.point().iter().all(|v| v.is_finite() && *v > 0.0));
    }

    #[test]
    fn multiplicative_model_rejects_non_positive_data() {
        let mut values = seasonal_series(36);
        values[5] = -1.0;
        let mut model = ETS::new(ETSSpec::mam(), 12);
        assert!(matches!(
            model.fit(&monthly(values)),
            Err(Error::InvalidParameter(_))
        ));
    }

    #[test]
    fn intervals_are_nested_and_widen() {
        let mut model = ETS::new(ETSSpec::aada(), 12);
        model.fit(&monthly(seasonal_series(60))).unwrap();
        let fc = model.predict_with_intervals(24, &[80.0, 95.0]).unwrap();
        let i80 = fc.interval(80.0).unwrap();
        let i95 = fc.interval(95.0).unwrap();
        for h in 0..24 {
            assert!(i95.lower[h] <= i80.lower[h]);
            assert!(i80.upper[h] <= i95.upper[h]);
        }
        let width = |h: usize| i95.upper[h] - i95.lower[h];
        assert!(width(23) > width(0));
    }

    #[test]
    fn requires_two_seasons() {
        let mut model = ETS::new(ETSSpec::aada(), 12);
        assert!(matches!(
            model.fit(&monthly(seasonal_series(20))),
            Err(Error::InsufficientData { needed: 24, .. })
        ));
        assert!(matches!(model.predict(3), Err(Error::FitRequired)));
    }

    #[test]
    fn damped_sum_matches_direct_sum() {
        let direct: f64 = (1..=5).map(|i| 0.9_f64.powi(i)).sum();
        assert_relative_eq!(damped_sum(0.9, 5), direct, epsilon = 1e-12);
        assert_relative_eq!(damped_sum(1.0, 5), 5.0);
    }
}
