//! Portmanteau test for autocorrelation left in model residuals.

use crate::utils::stats::{acf, chi_squared_sf, finite};

/// Ljung-Box test result.
#[derive(Debug, Clone, PartialEq)]
pub struct LjungBoxResult {
    /// Test statistic Q
    pub statistic: f64,
    pub p_value: f64,
    /// Number of autocorrelation lags summed
    pub lags: usize,
    /// Degrees of freedom: lags minus fitted coefficients
    pub df: usize,
}

impl LjungBoxResult {
    /// True when the null of no autocorrelation is not rejected at `alpha`.
    pub fn is_white_noise(&self, alpha: f64) -> bool {
        self.p_value > alpha
    }
}

/// Ljung-Box test on `residuals` using autocorrelations up to `lag`.
///
/// Non-finite entries (warm-up residuals of differenced models) are skipped.
/// `fitted_params` reduces the degrees of freedom of the reference
/// chi-squared distribution.
///
/// # Example
/// ```
/// use turnover_forecast::validation::ljung_box;
///
/// let residuals = [0.3, -0.1, 0.4, -0.5, 0.2, -0.2, 0.1, -0.4, 0.5, -0.3, 0.0, 0.2];
/// let result = ljung_box(&residuals, 5, 0);
/// assert_eq!(result.df, 5);
/// assert!(result.p_value >= 0.0 && result.p_value <= 1.0);
/// ```
pub fn ljung_box(residuals: &[f64], lag: usize, fitted_params: usize) -> LjungBoxResult {
    let values = finite(residuals);
    let n = values.len();

    if n < 3 || lag == 0 {
        return LjungBoxResult {
            statistic: f64::NAN,
            p_value: f64::NAN,
            lags: 0,
            df: 0,
        };
    }

    let lags = lag.min(n - 1);
    let df = lags.saturating_sub(fitted_params).max(1);

    let q = acf(&values, lags)
        .iter()
        .enumerate()
        .map(|(i, r)| r * r / (n - (i + 1)) as f64)
        .sum::<f64>()
        * n as f64
        * (n + 2) as f64;

    LjungBoxResult {
        statistic: q,
        p_value: chi_squared_sf(q, df),
        lags,
        df,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;
    use rand::rngs::StdRng;
    use rand::{Rng, SeedableRng};

    #[test]
    fn white_noise_passes() {
        let mut rng = StdRng::seed_from_u64(7);
        let residuals: Vec<f64> = (0..200).map(|_| rng.gen_range(-1.0..1.0)).collect();
        let result = ljung_box(&residuals, 24, 0);
        assert!(result.is_white_noise(0.01), "p = {}", result.p_value);
    }

    #[test]
    fn autocorrelated_residuals_fail() {
        let mut rng = StdRng::seed_from_u64(11);
        let mut residuals = vec![0.0; 200];
        for t in 1..200 {
            residuals[t] = 0.8 * residuals[t - 1] + rng.gen_range(-1.0..1.0);
        }
        let result = ljung_box(&residuals, 24, 2);
        assert_eq!(result.df, 22);
        assert!(!result.is_white_noise(0.05));
    }

    #[test]
    fn constant_residuals_have_zero_statistic() {
        let result = ljung_box(&[0.5; 30], 10, 0);
        assert_relative_eq!(result.statistic, 0.0);
        assert_relative_eq!(result.p_value, 1.0);
    }

    #[test]
    fn warm_up_nans_are_ignored() {
        let mut residuals = vec![f64::NAN; 13];
        residuals.extend([0.2, -0.1, 0.3, -0.4, 0.1, 0.0, -0.2, 0.3, -0.1, 0.2]);
        let result = ljung_box(&residuals, 24, 0);
        assert_eq!(result.lags, 9);
        assert!(result.statistic.is_finite());
    }

    #[test]
    fn short_input_is_nan() {
        assert!(ljung_box(&[1.0, 2.0], 5, 0).p_value.is_nan());
    }
}
