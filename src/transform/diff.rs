//! Lagged differencing and its inverse.
//!
//! Seasonal differencing is differencing at lag `period`; ordinary
//! differencing is lag 1. Each round of lag-`k` differencing shortens the
//! series by `k` and is undone by [`undifference`] given the `k` values it
//! dropped.

/// Apply `order` rounds of lag-1 differencing.
pub fn difference(series: &[f64], order: usize) -> Vec<f64> {
    (0..order).fold(series.to_vec(), |acc, _| lag_difference(&acc, 1))
}

/// Apply `order` rounds of seasonal differencing at `period`.
pub fn seasonal_difference(series: &[f64], order: usize, period: usize) -> Vec<f64> {
    (0..order).fold(series.to_vec(), |acc, _| lag_difference(&acc, period))
}

/// One round of lag-`lag` differencing: `y[t] - y[t - lag]`.
pub fn lag_difference(series: &[f64], lag: usize) -> Vec<f64> {
    if lag == 0 {
        return series.to_vec();
    }
    if series.len() <= lag {
        return Vec::new();
    }
    series[lag..]
        .iter()
        .zip(series)
        .map(|(curr, prev)| curr - prev)
        .collect()
}

/// Invert one round of lag-`lag` differencing.
///
/// `initial` holds the first `lag` values of the undifferenced series.
pub fn undifference(differenced: &[f64], initial: &[f64], lag: usize) -> Vec<f64> {
    let mut out = Vec::with_capacity(initial.len() + differenced.len());
    out.extend_from_slice(initial);
    for (i, &d) in differenced.iter().enumerate() {
        let prev = out[i + initial.len() - lag];
        out.push(prev + d);
    }
    out
}

/// A record of the lagged differences applied to a series, in order.
///
/// Keeps the values each round dropped so the original can be rebuilt.
#[derive(Debug, Clone, PartialEq)]
pub struct DifferencingPlan {
    lags: Vec<usize>,
    initials: Vec<Vec<f64>>,
}

impl DifferencingPlan {
    /// Seasonal differencing `seasonal_order` times, then ordinary `order` times.
    pub fn apply(
        series: &[f64],
        order: usize,
        seasonal_order: usize,
        period: usize,
    ) -> (Vec<f64>, Self) {
        let lags: Vec<usize> = std::iter::repeat(period)
            .take(seasonal_order)
            .chain(std::iter::repeat(1).take(order))
            .collect();

        let mut current = series.to_vec();
        let mut initials = Vec::with_capacity(lags.len());
        for &lag in &lags {
            initials.push(current.iter().take(lag).copied().collect());
            current = lag_difference(&current, lag);
        }
        (current, Self { lags, initials })
    }

    /// Total number of observations lost.
    pub fn lost(&self) -> usize {
        self.lags.iter().sum()
    }

    /// Rebuild the original series from its differences.
    pub fn integrate(&self, differenced: &[f64]) -> Vec<f64> {
        self.lags
            .iter()
            .zip(&self.initials)
            .rev()
            .fold(differenced.to_vec(), |acc, (&lag, initial)| {
                undifference(&acc, initial, lag)
            })
    }
}

/// Continue a series past its end from forecasts of its differences.
///
/// `history` is the undifferenced series and `future_diffs` the forecasts of
/// `(1 - B)^order (1 - B^period)^seasonal_order y`.
pub fn integrate_forecast(
    history: &[f64],
    future_diffs: &[f64],
    order: usize,
    seasonal_order: usize,
    period: usize,
) -> Vec<f64> {
    let poly = differencing_polynomial(order, seasonal_order, period);
    let mut extended = history.to_vec();
    for &w in future_diffs {
        let t = extended.len();
        // (poly)(B) y_t = w_t with poly[0] = 1
        let mut y = w;
        for (i, &c) in poly.iter().enumerate().skip(1) {
            if c != 0.0 && t >= i {
                y -= c * extended[t - i];
            }
        }
        extended.push(y);
    }
    extended.split_off(history.len())
}

/// Coefficients of `(1 - B)^order (1 - B^period)^seasonal_order`, lowest power first.
pub fn differencing_polynomial(order: usize, seasonal_order: usize, period: usize) -> Vec<f64> {
    let mut poly = vec![1.0];
    for _ in 0..order {
        poly = multiply_polynomials(&poly, &[1.0, -1.0]);
    }
    if period > 0 {
        let mut seasonal = vec![0.0; period + 1];
        seasonal[0] = 1.0;
        seasonal[period] = -1.0;
        for _ in 0..seasonal_order {
            poly = multiply_polynomials(&poly, &seasonal);
        }
    }
    poly
}

/// Product of two polynomials given by coefficients, lowest power first.
pub fn multiply_polynomials(a: &[f64], b: &[f64]) -> Vec<f64> {
    if a.is_empty() || b.is_empty() {
        return Vec::new();
    }
    let mut out = vec![0.0; a.len() + b.len() - 1];
    for (i, &x) in a.iter().enumerate() {
        for (j, &y) in b.iter().enumerate() {
            out[i + j] += x * y;
        }
    }
    out
}
