//! Seasonal ARIMA fitted by conditional sum of squares.
//!
//! The model for `w = (1 - B)^d (1 - B^m)^D y` is
//! `phi(B) Phi(B^m) (w_t - mu) = theta(B) Theta(B^m) e_t`, with the
//! seasonal and non-seasonal polynomials multiplied out before filtering.

use std::fmt;
use std::str::FromStr;

use tracing::{debug, warn};

use crate::core::{Forecast, MonthlySeries, MONTHS_PER_YEAR};
use crate::error::{Error, Result};
use crate::models::{FitStatistics, Forecaster};
use crate::transform::{
    differencing_polynomial, integrate_forecast, multiply_polynomials, DifferencingPlan,
};
use crate::utils::optimization::{nelder_mead, NelderMeadConfig};
use crate::utils::stats::{interval_multiplier, mean};

const COEFFICIENT_BOUNDS: (f64, f64) = (-3.0, 3.0);

/// Model order (p, d, q)(P, D, Q)[period].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ARIMAOrder {
    /// Non-seasonal AR order.
    pub p: usize,
    /// Non-seasonal differencing order.
    pub d: usize,
    /// Non-seasonal MA order.
    pub q: usize,
    /// Seasonal AR order.
    pub cap_p: usize,
    /// Seasonal differencing order.
    pub cap_d: usize,
    /// Seasonal MA order.
    pub cap_q: usize,
    pub period: usize,
}

impl ARIMAOrder {
    pub fn new(p: usize, d: usize, q: usize) -> Self {
        Self {
            p,
            d,
            q,
            cap_p: 0,
            cap_d: 0,
            cap_q: 0,
            period: 1,
        }
    }

    pub fn seasonal(
        (p, d, q): (usize, usize, usize),
        (cap_p, cap_d, cap_q): (usize, usize, usize),
        period: usize,
    ) -> Self {
        Self {
            p,
            d,
            q,
            cap_p,
            cap_d,
            cap_q,
            period,
        }
    }

    pub fn is_seasonal(&self) -> bool {
        self.period > 1 && (self.cap_p > 0 || self.cap_d > 0 || self.cap_q > 0)
    }

    /// p + q + P + Q.
    pub fn num_coefficients(&self) -> usize {
        self.p + self.q + self.cap_p + self.cap_q
    }

    /// Lag reach of the AR side, p + P * period.
    pub fn ar_span(&self) -> usize {
        self.p + self.cap_p * self.period
    }

    /// Observations lost to differencing.
    pub fn differencing_loss(&self) -> usize {
        self.d + self.cap_d * self.period
    }

    /// Default for the constant term: a mean or drift only while d + D < 2.
    pub fn default_constant(&self) -> bool {
        self.d + self.cap_d < 2
    }

    /// Parse `"(p,d,q)"` or `"(p,d,q)(P,D,Q)"`, optionally followed by
    /// `"[m]"`; `default_period` applies when no period is given.
    pub fn parse_with_period(s: &str, default_period: usize) -> Result<Self> {
        let invalid = || Error::InvalidParameter(format!("invalid ARIMA order '{}'", s));
        let text = s.trim();
        let text = text.strip_prefix("ARIMA").unwrap_or(text).trim();

        let (groups_text, period) = match text.find('[') {
            Some(open) => {
                let close = text.rfind(']').ok_or_else(invalid)?;
                let period: usize = text[open + 1..close]
                    .trim()
                    .parse()
                    .map_err(|_| invalid())?;
                (&text[..open], period)
            }
            None => (text, default_period),
        };

        let mut groups = Vec::new();
        for chunk in groups_text.split(')').map(str::trim).filter(|c| !c.is_empty()) {
            let inner = chunk.strip_prefix('(').ok_or_else(invalid)?;
            let values = inner
                .split(',')
                .map(|v| v.trim().parse::<usize>())
                .collect::<std::result::Result<Vec<_>, _>>()
                .map_err(|_| invalid())?;
            if values.len() != 3 {
                return Err(invalid());
            }
            groups.push((values[0], values[1], values[2]));
        }

        match groups.as_slice() {
            [non_seasonal] => Ok(Self::seasonal(*non_seasonal, (0, 0, 0), period)),
            [non_seasonal, seasonal] => {
                if period < 2 && *seasonal != (0, 0, 0) {
                    return Err(invalid());
                }
                Ok(Self::seasonal(*non_seasonal, *seasonal, period))
            }
            _ => Err(invalid()),
        }
    }
}

impl FromStr for ARIMAOrder {
    type Err = Error;

    /// Parses with a monthly period unless one is given.
    fn from_str(s: &str) -> Result<Self> {
        Self::parse_with_period(s, MONTHS_PER_YEAR)
    }
}

impl fmt::Display for ARIMAOrder {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "ARIMA({},{},{})", self.p, self.d, self.q)?;
        if self.is_seasonal() {
            write!(
                f,
                "({},{},{})[{}]",
                self.cap_p, self.cap_d, self.cap_q, self.period
            )?;
        }
        Ok(())
    }
}

/// Estimated coefficients, sign convention
/// `(1 - phi_1 B - ...)(1 - Phi_1 B^m - ...) x_t = (1 + theta_1 B + ...)(1 + Theta_1 B^m + ...) e_t`.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct ARIMACoefficients {
    pub ar: Vec<f64>,
    pub seasonal_ar: Vec<f64>,
    pub ma: Vec<f64>,
    pub seasonal_ma: Vec<f64>,
    /// Mean of the differenced series (zero without a constant).
    pub mean: f64,
}

impl ARIMACoefficients {
    fn from_vector(order: &ARIMAOrder, with_constant: bool, v: &[f64]) -> Self {
        let (ar, rest) = v.split_at(order.p);
        let (seasonal_ar, rest) = rest.split_at(order.cap_p);
        let (ma, rest) = rest.split_at(order.q);
        let (seasonal_ma, rest) = rest.split_at(order.cap_q);
        Self {
            ar: ar.to_vec(),
            seasonal_ar: seasonal_ar.to_vec(),
            ma: ma.to_vec(),
            seasonal_ma: seasonal_ma.to_vec(),
            mean: if with_constant {
                rest.first().copied().unwrap_or(0.0)
            } else {
                0.0
            },
        }
    }

    /// Stationary AR factors and invertible MA factors.
    pub fn is_admissible(&self) -> bool {
        let negated = |c: &[f64]| c.iter().map(|x| -x).collect::<Vec<_>>();
        is_stationary(&self.ar)
            && is_stationary(&self.seasonal_ar)
            && is_stationary(&negated(&self.ma))
            && is_stationary(&negated(&self.seasonal_ma))
    }

    /// Coefficients `a_i` of the expanded AR side, `x_t = sum a_i x_{t-i} + ...`.
    fn expanded_ar(&self, period: usize) -> Vec<f64> {
        let poly = multiply_polynomials(
            &lag_polynomial(&self.ar, 1, -1.0),
            &lag_polynomial(&self.seasonal_ar, period, -1.0),
        );
        poly.iter().skip(1).map(|c| -c).collect()
    }

    /// Coefficients `b_j` of the expanded MA side, `... + sum b_j e_{t-j}`.
    fn expanded_ma(&self, period: usize) -> Vec<f64> {
        let poly = multiply_polynomials(
            &lag_polynomial(&self.ma, 1, 1.0),
            &lag_polynomial(&self.seasonal_ma, period, 1.0),
        );
        poly.into_iter().skip(1).collect()
    }
}

/// `1 + sign * (c_1 B^lag + c_2 B^(2 lag) + ...)` as coefficients.
fn lag_polynomial(coefficients: &[f64], lag: usize, sign: f64) -> Vec<f64> {
    let mut poly = vec![0.0; coefficients.len() * lag + 1];
    poly[0] = 1.0;
    for (i, &c) in coefficients.iter().enumerate() {
        poly[(i + 1) * lag] = sign * c;
    }
    poly
}

/// Whether `x_t = sum a_i x_{t-i}` is stationary.
///
/// Runs the Levinson recursion backwards to recover the partial
/// autocorrelations; the process is stationary iff all lie strictly
/// inside (-1, 1).
pub fn is_stationary(ar: &[f64]) -> bool {
    let mut a = ar.to_vec();
    while let Some(&r) = a.last() {
        if !r.is_finite() || r.abs() >= 1.0 {
            return false;
        }
        let k = a.len() - 1;
        let denom = 1.0 - r * r;
        let prev: Vec<f64> = (0..k).map(|i| (a[i] + r * a[k - 1 - i]) / denom).collect();
        a = prev;
    }
    true
}

/// Residuals from the CSS recursion; the first `start` are conditioned to zero.
fn css_residuals(x: &[f64], ar: &[f64], ma: &[f64], start: usize) -> Vec<f64> {
    let mut e = vec![0.0; x.len()];
    for t in start..x.len() {
        let mut pred = 0.0;
        for (i, a) in ar.iter().enumerate() {
            pred += a * x[t - 1 - i];
        }
        for (j, b) in ma.iter().enumerate() {
            if t > j {
                pred += b * e[t - 1 - j];
            }
        }
        e[t] = x[t] - pred;
    }
    e
}

/// Seasonal ARIMA model.
///
/// The CSS likelihood conditions on the first `max(p + P * period, span)`
/// differenced values. Candidates fitted with the same span and the same
/// differencing orders are scored on the same observations, so their AICc
/// values can be compared.
#[derive(Debug, Clone)]
pub struct ARIMA {
    order: ARIMAOrder,
    with_constant: bool,
    span: usize,
    coefficients: Option<ARIMACoefficients>,
    history: Option<Vec<f64>>,
    /// Differenced series and its CSS residuals.
    differenced: Option<Vec<f64>>,
    innovations: Option<Vec<f64>>,
    fitted: Option<Vec<f64>>,
    residuals: Option<Vec<f64>>,
    stats: Option<FitStatistics>,
}

impl ARIMA {
    /// Model with the default constant rule (d + D < 2).
    pub fn new(order: ARIMAOrder) -> Self {
        Self::with_constant(order, order.default_constant())
    }

    pub fn with_constant(order: ARIMAOrder, with_constant: bool) -> Self {
        Self {
            order,
            with_constant,
            span: 0,
            coefficients: None,
            history: None,
            differenced: None,
            innovations: None,
            fitted: None,
            residuals: None,
            stats: None,
        }
    }

    /// Condition the likelihood on at least `span` differenced values.
    pub fn with_conditioning(mut self, span: usize) -> Self {
        self.span = span;
        self
    }

    pub fn order(&self) -> ARIMAOrder {
        self.order
    }

    pub fn has_constant(&self) -> bool {
        self.with_constant
    }

    pub fn coefficients(&self) -> Option<&ARIMACoefficients> {
        self.coefficients.as_ref()
    }

    fn display_name(&self) -> String {
        if self.with_constant {
            format!("{} w/ const", self.order)
        } else {
            self.order.to_string()
        }
    }

    /// Number of initial differenced values the CSS recursion conditions on.
    pub fn conditioning(&self) -> usize {
        self.order.ar_span().max(self.span)
    }

    fn num_estimated(&self) -> usize {
        self.order.num_coefficients() + usize::from(self.with_constant)
    }

    fn css(&self, w: &[f64], coefficients: &ARIMACoefficients) -> (Vec<f64>, f64) {
        let x: Vec<f64> = w.iter().map(|v| v - coefficients.mean).collect();
        let start = self.conditioning();
        let e = css_residuals(
            &x,
            &coefficients.expanded_ar(self.order.period),
            &coefficients.expanded_ma(self.order.period),
            start,
        );
        let sse = e[start..].iter().map(|v| v * v).sum();
        (e, sse)
    }

    fn estimate(&self, w: &[f64]) -> Result<(ARIMACoefficients, bool)> {
        let k = self.num_estimated();
        let mut start = vec![0.0; k];
        let mut bounds = vec![COEFFICIENT_BOUNDS; k];
        if self.with_constant {
            start[k - 1] = mean(w);
            bounds[k - 1] = (f64::NEG_INFINITY, f64::INFINITY);
        }

        if k == 0 {
            let coefficients = ARIMACoefficients::default();
            return Ok((coefficients, true));
        }

        let objective = |v: &[f64]| {
            let coefficients = ARIMACoefficients::from_vector(&self.order, self.with_constant, v);
            if !coefficients.is_admissible() {
                return f64::MAX;
            }
            let (_, sse) = self.css(w, &coefficients);
            if sse.is_finite() {
                sse
            } else {
                f64::MAX
            }
        };

        let config = NelderMeadConfig {
            max_iter: 2000,
            initial_step: 0.05,
            ..Default::default()
        };
        let optimum = nelder_mead(objective, &start, Some(&bounds), &config);
        if !optimum.value.is_finite() || optimum.value >= f64::MAX {
            return Err(Error::non_convergence(
                self.display_name(),
                "no admissible coefficients found",
            ));
        }

        let coefficients =
            ARIMACoefficients::from_vector(&self.order, self.with_constant, &optimum.point);
        if !coefficients.is_admissible() {
            return Err(Error::non_convergence(
                self.display_name(),
                "estimated polynomials are not stationary and invertible",
            ));
        }
        Ok((coefficients, optimum.converged))
    }

    /// Psi weights of the full model, differencing included.
    fn psi_weights(&self, coefficients: &ARIMACoefficients, horizon: usize) -> Vec<f64> {
        let period = self.order.period;
        let stationary_ar = multiply_polynomials(
            &lag_polynomial(&coefficients.ar, 1, -1.0),
            &lag_polynomial(&coefficients.seasonal_ar, period, -1.0),
        );
        let full_ar = multiply_polynomials(
            &stationary_ar,
            &differencing_polynomial(self.order.d, self.order.cap_d, period),
        );
        let ma = coefficients.expanded_ma(period);

        let mut psi = vec![0.0; horizon.max(1)];
        psi[0] = 1.0;
        for j in 1..horizon {
            let mut value = ma.get(j - 1).copied().unwrap_or(0.0);
            for i in 1..full_ar.len().min(j + 1) {
                value -= full_ar[i] * psi[j - i];
            }
            psi[j] = value;
        }
        psi
    }
}

impl Forecaster for ARIMA {
    fn fit(&mut self, series: &MonthlySeries) -> Result<()> {
        let values = series.values();
        let order = self.order;
        let (w, _) = DifferencingPlan::apply(values, order.d, order.cap_d, order.period);

        let needed = order.differencing_loss() + self.conditioning() + self.num_estimated() + 3;
        if values.len() < needed || w.is_empty() {
            return Err(Error::InsufficientData {
                needed,
                got: values.len(),
            });
        }

        let (coefficients, converged) = self.estimate(&w)?;
        if !converged {
            warn!(model = %self.display_name(), "coefficient search hit its iteration limit");
        }

        let (e, sse) = self.css(&w, &coefficients);
        let start = self.conditioning();
        let n_used = w.len() - start;
        let sigma2 = sse / n_used as f64;
        let log_likelihood =
            -0.5 * n_used as f64 * (1.0 + sigma2.ln() + (2.0 * std::f64::consts::PI).ln());
        if !log_likelihood.is_finite() {
            return Err(Error::non_convergence(
                self.display_name(),
                "residual variance is zero or undefined",
            ));
        }

        let lost = order.differencing_loss();
        let mut residuals = vec![f64::NAN; values.len()];
        let mut fitted = vec![f64::NAN; values.len()];
        for t in start..w.len() {
            residuals[t + lost] = e[t];
            fitted[t + lost] = values[t + lost] - e[t];
        }

        let stats = FitStatistics::from_log_likelihood(
            log_likelihood,
            sigma2,
            self.num_estimated() + 1,
            order.num_coefficients(),
            n_used,
            converged,
        );
        debug!(model = %self.display_name(), sigma2, aicc = stats.aicc, "fitted ARIMA");

        self.coefficients = Some(coefficients);
        self.history = Some(values.to_vec());
        self.differenced = Some(w);
        self.innovations = Some(e);
        self.fitted = Some(fitted);
        self.residuals = Some(residuals);
        self.stats = Some(stats);
        Ok(())
    }

    fn predict(&self, horizon: usize) -> Result<Forecast> {
        let coefficients = self.coefficients.as_ref().ok_or(Error::FitRequired)?;
        let history = self.history.as_ref().ok_or(Error::FitRequired)?;
        let w = self.differenced.as_ref().ok_or(Error::FitRequired)?;
        let innovations = self.innovations.as_ref().ok_or(Error::FitRequired)?;

        let period = self.order.period;
        let ar = coefficients.expanded_ar(period);
        let ma = coefficients.expanded_ma(period);

        let mut x: Vec<f64> = w.iter().map(|v| v - coefficients.mean).collect();
        let n = x.len();
        for h in 0..horizon {
            let t = n + h;
            let mut value = 0.0;
            for (i, a) in ar.iter().enumerate() {
                if t > i {
                    value += a * x[t - 1 - i];
                }
            }
            for (j, b) in ma.iter().enumerate() {
                // Future innovations have expectation zero.
                if t >= j + 1 && t - 1 - j < n {
                    value += b * innovations[t - 1 - j];
                }
            }
            x.push(value);
        }

        let future: Vec<f64> = x[n..].iter().map(|v| v + coefficients.mean).collect();
        Ok(Forecast::from_values(integrate_forecast(
            history,
            &future,
            self.order.d,
            self.order.cap_d,
            period,
        )))
    }

    fn predict_with_intervals(&self, horizon: usize, levels: &[f64]) -> Result<Forecast> {
        let mut forecast = self.predict(horizon)?;
        let coefficients = self.coefficients.as_ref().ok_or(Error::FitRequired)?;
        let sigma2 = self.stats.as_ref().ok_or(Error::FitRequired)?.sigma2;

        let psi = self.psi_weights(coefficients, horizon);
        let mut cumulative = 0.0;
        let std_errors: Vec<f64> = psi
            .iter()
            .take(horizon)
            .map(|w| {
                cumulative += w * w;
                (sigma2 * cumulative).sqrt()
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
        self.display_name()
    }
}
