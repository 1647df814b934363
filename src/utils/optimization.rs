//! Derivative-free optimizers used for parameter estimation.
//!
//! The multi-parameter fits (ETS smoothing weights, ARIMA coefficients) use a
//! bounded Nelder-Mead simplex; the Box-Cox parameter uses a one-dimensional
//! golden-section search.

use std::cmp::Ordering;

/// Result of a minimisation.
#[derive(Debug, Clone)]
pub struct Optimum {
    /// Best point found.
    pub point: Vec<f64>,
    /// Objective value at `point`.
    pub value: f64,
    pub iterations: usize,
    /// False when the iteration budget ran out before the tolerance was met.
    pub converged: bool,
}

/// Configuration for Nelder-Mead optimization.
#[derive(Debug, Clone)]
pub struct NelderMeadConfig {
    pub max_iter: usize,
    /// Stop once the spread of objective values across the simplex is below this.
    pub tolerance: f64,
    /// Reflection coefficient.
    pub reflection: f64,
    /// Expansion coefficient.
    pub expansion: f64,
    /// Contraction coefficient.
    pub contraction: f64,
    /// Shrink coefficient.
    pub shrink: f64,
    /// Initial simplex step as a fraction of the bound width (or of |x| when unbounded).
    pub initial_step: f64,
}

impl Default for NelderMeadConfig {
    fn default() -> Self {
        Self {
            max_iter: 2000,
            tolerance: 1e-8,
            reflection: 1.0,
            expansion: 2.0,
            contraction: 0.5,
            shrink: 0.5,
            initial_step: 0.1,
        }
    }
}

/// Box constraints, one `(lower, upper)` pair per dimension.
pub type Bounds<'a> = Option<&'a [(f64, f64)]>;

fn clamp_to(point: &mut [f64], bounds: Bounds<'_>) {
    if let Some(b) = bounds {
        for (x, &(lo, hi)) in point.iter_mut().zip(b.iter()) {
            *x = x.clamp(lo, hi);
        }
    }
}

fn cmp_values(a: f64, b: f64) -> Ordering {
    // NaN sorts last so that invalid vertices are replaced first.
    match (a.is_nan(), b.is_nan()) {
        (true, true) => Ordering::Equal,
        (true, false) => Ordering::Greater,
        (false, true) => Ordering::Less,
        _ => a.partial_cmp(&b).unwrap_or(Ordering::Equal),
    }
}

/// Move from `from` along `towards - from` by `coef`.
fn along(from: &[f64], towards: &[f64], coef: f64) -> Vec<f64> {
    from.iter()
        .zip(towards)
        .map(|(f, t)| f + coef * (t - f))
        .collect()
}

/// Minimise `objective` with a bounded Nelder-Mead simplex.
///
/// # Example
/// ```
/// use turnover_forecast::utils::optimization::{nelder_mead, NelderMeadConfig};
///
/// let best = nelder_mead(
///     |x| (x[0] - 2.0).powi(2) + (x[1] + 1.0).powi(2),
///     &[0.0, 0.0],
///     None,
///     &NelderMeadConfig::default(),
/// );
/// assert!(best.converged);
/// assert!((best.point[0] - 2.0).abs() < 1e-3);
/// ```
pub fn nelder_mead<F>(
    objective: F,
    start: &[f64],
    bounds: Bounds<'_>,
    config: &NelderMeadConfig,
) -> Optimum
where
    F: Fn(&[f64]) -> f64,
{
    let dim = start.len();
    if dim == 0 {
        return Optimum {
            point: Vec::new(),
            value: f64::NAN,
            iterations: 0,
            converged: false,
        };
    }

    let mut origin = start.to_vec();
    clamp_to(&mut origin, bounds);

    let mut simplex: Vec<Vec<f64>> = Vec::with_capacity(dim + 1);
    simplex.push(origin.clone());
    for i in 0..dim {
        let width = bounds
            .and_then(|b| b.get(i))
            .map(|&(lo, hi)| hi - lo)
            .filter(|w| w.is_finite());
        let step = match width {
            Some(w) => config.initial_step * w,
            None if origin[i].abs() > 1e-8 => config.initial_step * origin[i].abs(),
            None => config.initial_step,
        };
        let mut vertex = origin.clone();
        vertex[i] += step;
        if let Some(&(_, hi)) = bounds.and_then(|b| b.get(i)) {
            if vertex[i] > hi {
                vertex[i] = origin[i] - step;
            }
        }
        clamp_to(&mut vertex, bounds);
        simplex.push(vertex);
    }
    let mut values: Vec<f64> = simplex.iter().map(|v| objective(v)).collect();

    let mut iterations = 0;
    let mut converged = false;
    let mut order: Vec<usize> = (0..=dim).collect();

    while iterations < config.max_iter {
        iterations += 1;
        order.sort_by(|&a, &b| cmp_values(values[a], values[b]));
        let (best, second_worst, worst) = (order[0], order[dim - 1], order[dim]);

        if (values[worst] - values[best]).abs() < config.tolerance {
            converged = true;
            break;
        }

        let mut centroid = vec![0.0; dim];
        for (_, vertex) in simplex.iter().enumerate().filter(|&(i, _)| i != worst) {
            for (c, x) in centroid.iter_mut().zip(vertex) {
                *c += x / dim as f64;
            }
        }

        let mut reflected = along(&centroid, &simplex[worst], -config.reflection);
        clamp_to(&mut reflected, bounds);
        let f_reflected = objective(&reflected);

        if cmp_values(f_reflected, values[best]) == Ordering::Less {
            let mut expanded = along(&centroid, &reflected, config.expansion);
            clamp_to(&mut expanded, bounds);
            let f_expanded = objective(&expanded);
            if cmp_values(f_expanded, f_reflected) == Ordering::Less {
                simplex[worst] = expanded;
                values[worst] = f_expanded;
            } else {
                simplex[worst] = reflected;
                values[worst] = f_reflected;
            }
            continue;
        }

        if cmp_values(f_reflected, values[second_worst]) == Ordering::Less {
            simplex[worst] = reflected;
            values[worst] = f_reflected;
            continue;
        }

        let outside = cmp_values(f_reflected, values[worst]) == Ordering::Less;
        let target = if outside { &reflected } else { &simplex[worst] };
        let mut contracted = along(&centroid, target, config.contraction);
        clamp_to(&mut contracted, bounds);
        let f_contracted = objective(&contracted);
        let threshold = if outside { f_reflected } else { values[worst] };
        if cmp_values(f_contracted, threshold) != Ordering::Greater {
            simplex[worst] = contracted;
            values[worst] = f_contracted;
            continue;
        }

        let anchor = simplex[best].clone();
        for i in (0..=dim).filter(|&i| i != best) {
            let mut shrunk = along(&anchor, &simplex[i], config.shrink);
            clamp_to(&mut shrunk, bounds);
            values[i] = objective(&shrunk);
            simplex[i] = shrunk;
        }
    }

    let best = (0..=dim)
        .min_by(|&a, &b| cmp_values(values[a], values[b]))
        .unwrap_or(0);

    Optimum {
        point: simplex[best].clone(),
        value: values[best],
        iterations,
        converged,
    }
}

/// Minimise a unimodal function on `[lower, upper]` by golden-section search.
///
/// Returns the abscissa of the minimum.
pub fn golden_section<F>(objective: F, lower: f64, upper: f64, tolerance: f64) -> f64
where
    F: Fn(f64) -> f64,
{
    let inv_phi = (5.0_f64.sqrt() - 1.0) / 2.0;
    let (mut a, mut b) = (lower.min(upper), lower.max(upper));
    let mut c = b - inv_phi * (b - a);
    let mut d = a + inv_phi * (b - a);
    let mut fc = objective(c);
    let mut fd = objective(d);

    while (b - a).abs() > tolerance {
        if cmp_values(fc, fd) == Ordering::Less {
            b = d;
            d = c;
            fd = fc;
            c = b - inv_phi * (b - a);
            fc = objective(c);
        } else {
            a = c;
            c = d;
            fc = fd;
            d = a + inv_phi * (b - a);
            fd = objective(d);
        }
    }

    (a + b) / 2.0
}
