//! Statistical utility functions.

use statrs::distribution::{ChiSquared, ContinuousCDF, Normal};

/// Quantile of the standard normal distribution.
///
/// # Example
/// ```
/// use turnover_forecast::utils::quantile_normal;
///
/// let z = quantile_normal(0.975);
/// assert!((z - 1.959964).abs() < 1e-5);
/// ```
pub fn quantile_normal(p: f64) -> f64 {
    if p <= 0.0 {
        return f64::NEG_INFINITY;
    }
    if p >= 1.0 {
        return f64::INFINITY;
    }
    match Normal::new(0.0, 1.0) {
        Ok(normal) => normal.inverse_cdf(p),
        Err(_) => f64::NAN,
    }
}

/// Two-sided normal multiplier for a central interval at `level` percent.
pub fn interval_multiplier(level: f64) -> f64 {
    quantile_normal(0.5 + level / 200.0)
}

/// Upper tail probability of a chi-squared variable with `df` degrees of freedom.
pub fn chi_squared_sf(x: f64, df: usize) -> f64 {
    if df == 0 || x.is_nan() {
        return f64::NAN;
    }
    if x <= 0.0 {
        return 1.0;
    }
    match ChiSquared::new(df as f64) {
        Ok(dist) => dist.sf(x),
        Err(_) => f64::NAN,
    }
}

/// Calculate the mean of a slice.
pub fn mean(values: &[f64]) -> f64 {
    if values.is_empty() {
        return f64::NAN;
    }
    values.iter().sum::<f64>() / values.len() as f64
}

/// Sample variance (n - 1 denominator).
pub fn variance(values: &[f64]) -> f64 {
    if values.len() < 2 {
        return f64::NAN;
    }
    let m = mean(values);
    values.iter().map(|x| (x - m).powi(2)).sum::<f64>() / (values.len() - 1) as f64
}

pub fn std_dev(values: &[f64]) -> f64 {
    variance(values).sqrt()
}

/// Sample autocorrelations at lags `1..=max_lag`.
///
/// Uses the usual biased estimator (sum of lagged products over the total sum
/// of squares), so values stay within [-1, 1].
pub fn acf(values: &[f64], max_lag: usize) -> Vec<f64> {
    let n = values.len();
    if n < 2 {
        return Vec::new();
    }
    let m = mean(values);
    let centered: Vec<f64> = values.iter().map(|v| v - m).collect();
    let denom: f64 = centered.iter().map(|c| c * c).sum();

    (1..=max_lag.min(n - 1))
        .map(|lag| {
            if denom == 0.0 {
                return 0.0;
            }
            centered[lag..]
                .iter()
                .zip(&centered)
                .map(|(a, b)| a * b)
                .sum::<f64>()
                / denom
        })
        .collect()
}

/// Keep only finite values (drops the warm-up NaNs of differenced models).
pub fn finite(values: &[f64]) -> Vec<f64> {
    values.iter().copied().filter(|v| v.is_finite()).collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    #[test]
    fn quantile_normal_known_values() {
        assert_relative_eq!(quantile_normal(0.5), 0.0, epsilon = 1e-9);
        assert_relative_eq!(quantile_normal(0.975), 1.959964, epsilon = 1e-5);
        assert_relative_eq!(quantile_normal(0.025), -1.959964, epsilon = 1e-5);
        assert_eq!(quantile_normal(0.0), f64::NEG_INFINITY);
        assert_eq!(quantile_normal(1.0), f64::INFINITY);
    }

    #[test]
    fn interval_multiplier_for_common_levels() {
        assert_relative_eq!(interval_multiplier(95.0), 1.959964, epsilon = 1e-5);
        assert_relative_eq!(interval_multiplier(80.0), 1.281552, epsilon = 1e-5);
    }

    #[test]
    fn chi_squared_tail() {
        // 95th percentile of chi2(1) is 3.841.
        assert_relative_eq!(chi_squared_sf(3.841459, 1), 0.05, epsilon = 1e-5);
        assert_eq!(chi_squared_sf(0.0, 3), 1.0);
        assert!(chi_squared_sf(1.0, 0).is_nan());
    }

    #[test]
    fn moments() {
        assert_relative_eq!(mean(&[1.0, 2.0, 3.0, 4.0, 5.0]), 3.0);
        assert_relative_eq!(variance(&[1.0, 2.0, 3.0, 4.0, 5.0]), 2.5);
        assert_relative_eq!(std_dev(&[1.0, 2.0, 3.0, 4.0, 5.0]), 2.5_f64.sqrt());
        assert!(mean(&[]).is_nan());
        assert!(variance(&[1.0]).is_nan());
    }

    #[test]
    fn acf_of_trend_is_high_and_of_alternation_negative() {
        let trend: Vec<f64> = (0..20).map(|i| i as f64).collect();
        assert!(acf(&trend, 1)[0] > 0.8);

        let alternating: Vec<f64> = (0..20).map(|i| if i % 2 == 0 { 1.0 } else { -1.0 }).collect();
        let r = acf(&alternating, 2);
        assert!(r[0] < -0.9);
        assert!(r[1] > 0.8);
    }

    #[test]
    fn acf_caps_lag_at_length() {
        assert_eq!(acf(&[1.0, 2.0, 3.0], 10).len(), 2);
        assert!(acf(&[1.0], 5).is_empty());
        assert_eq!(acf(&[2.0, 2.0, 2.0], 2), vec![0.0, 0.0]);
    }

    #[test]
    fn finite_drops_nan() {
        assert_eq!(finite(&[f64::NAN, 1.0, 2.0]), vec![1.0, 2.0]);
    }
}
