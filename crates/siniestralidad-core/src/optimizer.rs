//! Derivative-free minimisation (Nelder–Mead simplex)
//!
//! Used to minimise the conditional sum of squares over the unconstrained
//! SARIMA parameters. Fully deterministic: the initial simplex is built from
//! the start point with a fixed step, and ties are broken by index.

/// Nelder–Mead settings
#[derive(Debug, Clone, Copy)]
pub struct NelderMeadConfig {
    /// Iteration budget
    pub max_iter: usize,
    /// Spread of objective values (relative, floored at 1) at which the
    /// simplex has converged. Its square root bounds the simplex size.
    pub tolerance: f64,
    /// Offset of the initial simplex vertices from the start point
    pub initial_step: f64,
}

impl Default for NelderMeadConfig {
    fn default() -> Self {
        Self {
            max_iter: 5000,
            tolerance: 1e-8,
            initial_step: 0.1,
        }
    }
}

/// Outcome of a minimisation
#[derive(Debug, Clone)]
pub struct NelderMeadResult {
    pub optimal_point: Vec<f64>,
    pub optimal_value: f64,
    pub iterations: usize,
    pub converged: bool,
}

const REFLECTION: f64 = 1.0;
const EXPANSION: f64 = 2.0;
const CONTRACTION: f64 = 0.5;
const SHRINK: f64 = 0.5;

/// Minimise `f` starting from `initial`
///
/// NaN objective values are treated as +∞ so the simplex moves away from
/// them.
pub fn nelder_mead<F>(f: F, initial: &[f64], config: NelderMeadConfig) -> NelderMeadResult
where
    F: Fn(&[f64]) -> f64,
{
    let eval = |x: &[f64]| {
        let value = f(x);
        if value.is_nan() {
            f64::INFINITY
        } else {
            value
        }
    };

    let n = initial.len();
    if n == 0 {
        return NelderMeadResult {
            optimal_point: Vec::new(),
            optimal_value: eval(initial),
            iterations: 0,
            converged: true,
        };
    }

    let mut simplex: Vec<Vec<f64>> = Vec::with_capacity(n + 1);
    simplex.push(initial.to_vec());
    for i in 0..n {
        let mut vertex = initial.to_vec();
        vertex[i] += config.initial_step;
        simplex.push(vertex);
    }
    let mut values: Vec<f64> = simplex.iter().map(|x| eval(x)).collect();

    let x_tolerance = config.tolerance.sqrt();
    let mut iterations = 0;
    let mut converged = false;

    while iterations < config.max_iter {
        order_simplex(&mut simplex, &mut values);

        if has_converged(&simplex, &values, config.tolerance, x_tolerance) {
            converged = true;
            break;
        }
        iterations += 1;

        let worst = n;
        let centroid = centroid(&simplex[..worst]);

        let reflected = along(&centroid, &simplex[worst], -REFLECTION);
        let f_reflected = eval(&reflected);

        if f_reflected < values[0] {
            let expanded = along(&centroid, &simplex[worst], -EXPANSION);
            let f_expanded = eval(&expanded);
            if f_expanded < f_reflected {
                simplex[worst] = expanded;
                values[worst] = f_expanded;
            } else {
                simplex[worst] = reflected;
                values[worst] = f_reflected;
            }
            continue;
        }

        if f_reflected < values[worst - 1] {
            simplex[worst] = reflected;
            values[worst] = f_reflected;
            continue;
        }

        // Contract towards the better of the reflected and worst points
        let (contracted, f_contracted) = if f_reflected < values[worst] {
            let point = along(&centroid, &simplex[worst], -CONTRACTION);
            let value = eval(&point);
            (point, value)
        } else {
            let point = along(&centroid, &simplex[worst], CONTRACTION);
            let value = eval(&point);
            (point, value)
        };

        if f_contracted < values[worst].min(f_reflected) {
            simplex[worst] = contracted;
            values[worst] = f_contracted;
            continue;
        }

        let best = simplex[0].clone();
        for i in 1..=n {
            simplex[i] = along(&best, &simplex[i], SHRINK);
            values[i] = eval(&simplex[i]);
        }
    }

    order_simplex(&mut simplex, &mut values);
    if !converged {
        converged = has_converged(&simplex, &values, config.tolerance, x_tolerance);
    }

    NelderMeadResult {
        optimal_point: simplex.swap_remove(0),
        optimal_value: values[0],
        iterations,
        converged,
    }
}

/// Sort vertices by objective, best first; stable so equal values keep order
fn order_simplex(simplex: &mut Vec<Vec<f64>>, values: &mut Vec<f64>) {
    let mut order: Vec<usize> = (0..values.len()).collect();
    order.sort_by(|&a, &b| values[a].total_cmp(&values[b]));
    *simplex = order.iter().map(|&i| simplex[i].clone()).collect();
    *values = order.iter().map(|&i| values[i]).collect();
}

fn has_converged(simplex: &[Vec<f64>], values: &[f64], f_tol: f64, x_tol: f64) -> bool {
    let best = values[0];
    let worst = values[values.len() - 1];
    if !best.is_finite() || !worst.is_finite() {
        return false;
    }
    let f_spread = worst - best;
    let x_spread = simplex[1..]
        .iter()
        .flat_map(|v| v.iter().zip(&simplex[0]).map(|(a, b)| (a - b).abs()))
        .fold(0.0, f64::max);
    f_spread <= f_tol * (best.abs() + 1.0) && x_spread <= x_tol
}

fn centroid(points: &[Vec<f64>]) -> Vec<f64> {
    let n = points.len() as f64;
    let dim = points[0].len();
    (0..dim)
        .map(|i| points.iter().map(|p| p[i]).sum::<f64>() / n)
        .collect()
}

/// `origin + t·(target − origin)`; negative `t` goes through `origin` away from `target`
fn along(origin: &[f64], target: &[f64], t: f64) -> Vec<f64> {
    origin
        .iter()
        .zip(target)
        .map(|(o, x)| o + t * (x - o))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_minimises_shifted_quadratic() {
        let result = nelder_mead(
            |x| (x[0] - 1.5).powi(2) + 2.0 * (x[1] + 0.5).powi(2) + 3.0,
            &[0.0, 0.0],
            NelderMeadConfig::default(),
        );
        assert!(result.converged);
        assert!((result.optimal_point[0] - 1.5).abs() < 1e-3);
        assert!((result.optimal_point[1] + 0.5).abs() < 1e-3);
        assert!((result.optimal_value - 3.0).abs() < 1e-6);
    }

    #[test]
    fn test_minimises_rosenbrock() {
        let result = nelder_mead(
            |x| (1.0 - x[0]).powi(2) + 100.0 * (x[1] - x[0] * x[0]).powi(2),
            &[-1.2, 1.0],
            NelderMeadConfig {
                max_iter: 10_000,
                ..Default::default()
            },
        );
        assert!(result.converged);
        assert!((result.optimal_point[0] - 1.0).abs() < 1e-2);
        assert!((result.optimal_point[1] - 1.0).abs() < 1e-2);
    }

    #[test]
    fn test_reports_exhausted_budget() {
        let result = nelder_mead(
            |x| x.iter().map(|v| (v - 10.0).powi(2)).sum(),
            &[0.0, 0.0, 0.0],
            NelderMeadConfig {
                max_iter: 2,
                ..Default::default()
            },
        );
        assert!(!result.converged);
        assert_eq!(result.iterations, 2);
    }

    #[test]
    fn test_nan_treated_as_infinite() {
        let result = nelder_mead(
            |x| if x[0] < 0.0 { f64::NAN } else { (x[0] - 0.3).powi(2) },
            &[0.05],
            NelderMeadConfig::default(),
        );
        assert!(result.optimal_value.is_finite());
        assert!((result.optimal_point[0] - 0.3).abs() < 1e-3);
    }

    #[test]
    fn test_deterministic() {
        let f = |x: &[f64]| (x[0] * x[1] - 2.0).powi(2) + (x[0] - x[1]).powi(2);
        let a = nelder_mead(f, &[0.5, 0.1], NelderMeadConfig::default());
        let b = nelder_mead(f, &[0.5, 0.1], NelderMeadConfig::default());
        assert_eq!(a.optimal_point, b.optimal_point);
        assert_eq!(a.iterations, b.iterations);
    }

    #[test]
    fn test_empty_parameter_vector() {
        let result = nelder_mead(|_| 4.0, &[], NelderMeadConfig::default());
        assert!(result.converged);
        assert_eq!(result.optimal_value, 4.0);
    }
}
