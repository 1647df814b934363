//! KPSS stationarity test and the differencing-order heuristics built on it.

use crate::seasonality::decompose;
use crate::transform::{difference, seasonal_difference};

/// Seasonal strength above which one seasonal difference is taken.
pub const SEASONAL_STRENGTH_THRESHOLD: f64 = 0.64;

/// Critical values of the KPSS level-stationarity statistic.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct CriticalValues {
    pub cv_10pct: f64,
    pub cv_5pct: f64,
    pub cv_2_5pct: f64,
    pub cv_1pct: f64,
}

impl Default for CriticalValues {
    fn default() -> Self {
        Self {
            cv_10pct: 0.347,
            cv_5pct: 0.463,
            cv_2_5pct: 0.574,
            cv_1pct: 0.739,
        }
    }
}

/// Result of a KPSS test.
#[derive(Debug, Clone, PartialEq)]
pub struct KpssResult {
    pub statistic: f64,
    /// Interpolated in the critical-value table, so clamped to [0.01, 0.10].
    pub p_value: f64,
    /// Bartlett window width used for the long-run variance.
    pub lags: usize,
    pub critical_values: CriticalValues,
}

impl KpssResult {
    /// True when level stationarity is not rejected at `alpha`.
    pub fn is_stationary(&self, alpha: f64) -> bool {
        self.p_value >= alpha
    }
}

/// KPSS test of the null hypothesis that `series` is level stationary.
///
/// The long-run variance uses a Bartlett kernel with
/// `trunc(4 * (n / 100)^0.25)` lags unless `lags` is given. A series with
/// no variation is reported as stationary.
pub fn kpss_test(series: &[f64], lags: Option<usize>) -> KpssResult {
    let n = series.len();
    let critical_values = CriticalValues::default();

    if n < 4 {
        return KpssResult {
            statistic: f64::NAN,
            p_value: f64::NAN,
            lags: 0,
            critical_values,
        };
    }

    let lags = lags
        .unwrap_or_else(|| (4.0 * (n as f64 / 100.0).powf(0.25)).trunc() as usize)
        .min(n - 1);

    let mean = series.iter().sum::<f64>() / n as f64;
    let residuals: Vec<f64> = series.iter().map(|&x| x - mean).collect();

    let partial_sums: Vec<f64> = residuals
        .iter()
        .scan(0.0, |acc, r| {
            *acc += r;
            Some(*acc)
        })
        .collect();
    let numerator = partial_sums.iter().map(|s| s * s).sum::<f64>() / (n * n) as f64;

    let mut long_run = residuals.iter().map(|r| r * r).sum::<f64>() / n as f64;
    for j in 1..=lags {
        let weight = 1.0 - j as f64 / (lags + 1) as f64;
        let autocov = residuals[j..]
            .iter()
            .zip(&residuals)
            .map(|(a, b)| a * b)
            .sum::<f64>()
            / n as f64;
        long_run += 2.0 * weight * autocov;
    }

    if long_run <= 1e-12 {
        return KpssResult {
            statistic: 0.0,
            p_value: 0.10,
            lags,
            critical_values,
        };
    }

    let statistic = numerator / long_run;
    KpssResult {
        statistic,
        p_value: kpss_p_value(statistic, &critical_values),
        lags,
        critical_values,
    }
}

/// Linear interpolation of the p-value between tabulated critical values.
fn kpss_p_value(statistic: f64, cv: &CriticalValues) -> f64 {
    let table = [
        (cv.cv_10pct, 0.10),
        (cv.cv_5pct, 0.05),
        (cv.cv_2_5pct, 0.025),
        (cv.cv_1pct, 0.01),
    ];
    if statistic.is_nan() {
        return f64::NAN;
    }
    if statistic <= table[0].0 {
        return table[0].1;
    }
    for pair in table.windows(2) {
        let ((x0, p0), (x1, p1)) = (pair[0], pair[1]);
        if statistic <= x1 {
            return p0 + (statistic - x0) * (p1 - p0) / (x1 - x0);
        }
    }
    table[3].1
}

/// Number of ordinary differences needed for KPSS stationarity.
///
/// Differences are added one at a time while the test rejects at `alpha`,
/// up to `max_d`.
pub fn ndiffs(series: &[f64], alpha: f64, max_d: usize) -> usize {
    let mut current = series.to_vec();
    for d in 0..max_d {
        let result = kpss_test(&current, None);
        if result.p_value.is_nan() || result.is_stationary(alpha) {
            return d;
        }
        current = difference(&current, 1);
    }
    max_d
}

/// Number of seasonal differences needed, from the seasonal strength of a
/// classical decomposition.
///
/// A seasonal difference is taken while the strength exceeds
/// [`SEASONAL_STRENGTH_THRESHOLD`], up to `max_d`.
pub fn nsdiffs(series: &[f64], period: usize, max_d: usize) -> usize {
    if period < 2 {
        return 0;
    }
    let mut current = series.to_vec();
    for d in 0..max_d {
        let strength = match decompose(&current, period) {
            Ok(decomposition) => decomposition.seasonal_strength(),
            Err(_) => return d,
        };
        if strength <= SEASONAL_STRENGTH_THRESHOLD {
            return d;
        }
        current = seasonal_difference(&current, 1, period);
    }
    max_d
}
