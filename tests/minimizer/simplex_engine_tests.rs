//! End-to-end fits with the argmin-backed simplex engine

use approx::assert_relative_eq;
use minopt_rs::models::{GaussianNll, PolynomialChi2};
use minopt_rs::objective::Objective;
use minopt_rs::{MinimizerEngine, Minimizer, SimplexEngine};
use rand::SeedableRng;
use rand_chacha::ChaCha8Rng;
use rand_distr::{Distribution, Normal};

fn gaussian_sample(n: usize, mean: f64, sigma: f64, seed: u64) -> Vec<f64> {
    let mut rng = ChaCha8Rng::seed_from_u64(seed);
    let normal = Normal::new(mean, sigma).unwrap();
    (0..n).map(|_| normal.sample(&mut rng)).collect()
}

/// Sample mean and maximum-likelihood standard deviation
fn moments(data: &[f64]) -> (f64, f64) {
    let n = data.len() as f64;
    let mean = data.iter().sum::<f64>() / n;
    let var = data.iter().map(|x| (x - mean).powi(2)).sum::<f64>() / n;
    (mean, var.sqrt())
}

fn value(minimizer: &Minimizer<GaussianNll, SimplexEngine>, name: &str) -> f64 {
    minimizer.objective().parameters().get(name).unwrap().value()
}

#[test]
fn test_gaussian_fit_matches_closed_form() {
    let data = gaussian_sample(400, 5.0, 2.0, 42);
    let (mean, sigma) = moments(&data);
    let n = data.len() as f64;

    let nll = GaussianNll::new(data, 4.0, 1.5).unwrap().with_silent(true);
    let mut minimizer = Minimizer::new(nll, SimplexEngine::new());

    assert_eq!(minimizer.migrad(), 0);
    assert_relative_eq!(value(&minimizer, "mean"), mean, epsilon = 5e-3);
    assert_relative_eq!(value(&minimizer, "sigma"), sigma, epsilon = 5e-3);

    assert_eq!(minimizer.hesse(), 0);
    let params = minimizer.objective().parameters();
    let mean_err = params.get("mean").unwrap().stderr().unwrap();
    let sigma_err = params.get("sigma").unwrap().stderr().unwrap();
    assert_relative_eq!(mean_err, sigma / n.sqrt(), max_relative = 0.02);
    assert_relative_eq!(sigma_err, sigma / (2.0 * n).sqrt(), max_relative = 0.05);

    assert!(minimizer.edm().unwrap() < 1e-3);
}

#[test]
fn test_gaussian_minos_errors_are_nearly_symmetric() {
    let data = gaussian_sample(200, 0.0, 1.0, 7);
    let (_, sigma) = moments(&data);
    let n = data.len() as f64;

    let nll = GaussianNll::new(data, 0.5, 1.2).unwrap().with_silent(true);
    let mut minimizer = Minimizer::new(nll, SimplexEngine::new());
    minimizer.migrad();

    assert_eq!(minimizer.minos_subset(&["mean"]), 0);

    let mean = minimizer.objective().parameters().get("mean").unwrap();
    let (lower, upper) = mean.asym_errors().unwrap();
    assert_relative_eq!(-lower, sigma / n.sqrt(), max_relative = 0.03);
    assert_relative_eq!(upper, sigma / n.sqrt(), max_relative = 0.03);

    // Minos ran on mean only
    let sigma_par = minimizer.objective().parameters().get("sigma").unwrap();
    assert!(sigma_par.asym_errors().is_none());
}

#[test]
fn test_fixed_sigma_is_held() {
    let data = gaussian_sample(100, 1.0, 0.5, 3);
    let (mean, _) = moments(&data);

    let mut nll = GaussianNll::new(data, 0.0, 0.7).unwrap().with_silent(true);
    nll.parameters_mut().set_constant("sigma", true).unwrap();
    let mut minimizer = Minimizer::new(nll, SimplexEngine::new());
    minimizer.optimize_const(true);
    assert!(minimizer.objective().has_cached_normalization());

    assert_eq!(minimizer.migrad(), 0);

    assert_eq!(value(&minimizer, "sigma"), 0.7);
    assert_relative_eq!(value(&minimizer, "mean"), mean, epsilon = 5e-3);
}

#[test]
fn test_invalid_region_is_walled_off() {
    let data = gaussian_sample(50, 0.0, 0.1, 11);
    let (_, sigma) = moments(&data);

    // An upper limit flips the first sigma step to negative values
    let mut nll = GaussianNll::new(data, 0.0, 0.3).unwrap().with_silent(true);
    nll.parameters_mut()
        .get_mut("sigma")
        .unwrap()
        .set_max(0.5)
        .unwrap();
    let mut minimizer = Minimizer::new(nll, SimplexEngine::new());
    minimizer.set_print_eval_errors(-1);

    minimizer.migrad();

    assert!(minimizer.num_invalid_evaluations() > 0);
    assert_relative_eq!(value(&minimizer, "sigma"), sigma, epsilon = 1e-2);
}

#[test]
fn test_line_fit_with_released_intercept() {
    let x: Vec<f64> = (0..21).map(|i| i as f64 * 0.1).collect();
    let y: Vec<f64> = x.iter().map(|x| 0.5 + 1.5 * x).collect();
    let chi2 = PolynomialChi2::new(x, y, vec![0.1; 21], 1).unwrap();
    let mut minimizer = Minimizer::new(chi2, SimplexEngine::new());

    minimizer
        .objective_mut()
        .parameters_mut()
        .set_value("c0", 0.5)
        .unwrap();
    minimizer
        .objective_mut()
        .parameters_mut()
        .set_constant("c0", true)
        .unwrap();
    minimizer.optimize_const(true);
    assert_eq!(minimizer.migrad(), 0);
    assert!(minimizer.engine().config().params_settings()[0].is_fixed());

    let params = minimizer.objective().parameters();
    assert_eq!(params.get("c0").unwrap().value(), 0.5);
    assert_relative_eq!(params.get("c1").unwrap().value(), 1.5, epsilon = 1e-2);

    minimizer
        .objective_mut()
        .parameters_mut()
        .set_constant("c0", false)
        .unwrap();
    assert_eq!(minimizer.improve(), 0);

    let params = minimizer.objective().parameters();
    assert_relative_eq!(params.get("c0").unwrap().value(), 0.5, epsilon = 1e-2);
    assert_relative_eq!(params.get("c1").unwrap().value(), 1.5, epsilon = 1e-2);
    assert!(!minimizer.engine().config().params_settings()[0].is_fixed());
    assert!(minimizer.engine().result().unwrap().min_fcn < 1e-2);
}
