//! Finite difference methods for numerical differentiation.
//!
//! This module provides central-difference gradients and Hessians of a scalar
//! function. Step sizes are given per coordinate, so callers can scale them to
//! the natural width of each parameter.

use ndarray::{Array1, Array2};

/// Smallest step used for a coordinate.
const MIN_STEP: f64 = 1e-8;

fn effective_step(step: f64, value: f64) -> f64 {
    if step.is_finite() && step > MIN_STEP {
        step
    } else {
        MIN_STEP.max(1e-6 * value.abs())
    }
}

/// Compute the gradient of a scalar function using central finite differences.
///
/// # Arguments
///
/// * `f` - The function to differentiate
/// * `params` - The point at which to evaluate the gradient
/// * `steps` - Step size for each coordinate
///
/// # Returns
///
/// * `Array1<f64>` - The gradient vector
pub fn gradient<F>(f: &mut F, params: &Array1<f64>, steps: &Array1<f64>) -> Array1<f64>
where
    F: FnMut(&Array1<f64>) -> f64,
{
    let n_params = params.len();
    let mut grad = Array1::zeros(n_params);

    for j in 0..n_params {
        let eps_j = effective_step(steps[j], params[j]);

        let mut params_forward = params.clone();
        params_forward[j] += eps_j;

        let mut params_backward = params.clone();
        params_backward[j] -= eps_j;

        let f_forward = f(&params_forward);
        let f_backward = f(&params_backward);

        grad[j] = (f_forward - f_backward) / (2.0 * eps_j);
    }

    grad
}

/// Compute the Hessian matrix using central finite differences.
///
/// Returns the Hessian together with the gradient, which comes for free from
/// the diagonal evaluations.
///
/// # Arguments
///
/// * `f` - The function to differentiate
/// * `params` - The point at which to evaluate the Hessian
/// * `steps` - Step size for each coordinate
///
/// # Returns
///
/// * `(Array2<f64>, Array1<f64>)` - The Hessian matrix and the gradient
pub fn hessian<F>(
    f: &mut F,
    params: &Array1<f64>,
    steps: &Array1<f64>,
) -> (Array2<f64>, Array1<f64>)
where
    F: FnMut(&Array1<f64>) -> f64,
{
    let n_params = params.len();
    let mut hess = Array2::zeros((n_params, n_params));
    let mut grad = Array1::zeros(n_params);

    let f0 = f(params);

    for i in 0..n_params {
        let eps_i = effective_step(steps[i], params[i]);

        for j in 0..=i {
            if i == j {
                let mut params_p = params.clone();
                let mut params_m = params.clone();
                params_p[i] += eps_i;
                params_m[i] -= eps_i;

                let f_p = f(&params_p);
                let f_m = f(&params_m);

                hess[[i, i]] = (f_p - 2.0 * f0 + f_m) / (eps_i * eps_i);
                grad[i] = (f_p - f_m) / (2.0 * eps_i);
            } else {
                let eps_j = effective_step(steps[j], params[j]);

                let mut params_pp = params.clone();
                let mut params_pm = params.clone();
                let mut params_mp = params.clone();
                let mut params_mm = params.clone();

                params_pp[i] += eps_i;
                params_pp[j] += eps_j;

                params_pm[i] += eps_i;
                params_pm[j] -= eps_j;

                params_mp[i] -= eps_i;
                params_mp[j] += eps_j;

                params_mm[i] -= eps_i;
                params_mm[j] -= eps_j;

                let f_pp = f(&params_pp);
                let f_pm = f(&params_pm);
                let f_mp = f(&params_mp);
                let f_mm = f(&params_mm);

                hess[[i, j]] = (f_pp - f_pm - f_mp + f_mm) / (4.0 * eps_i * eps_j);
                hess[[j, i]] = hess[[i, j]];
            }
        }
    }

    (hess, grad)
}
