//! Nelder-Mead minimizer engine.
//!
//! Minimization runs argmin's Nelder-Mead solver over the floating
//! coordinates; fixed ones are removed from the search space and limits are
//! enforced by clamping every trial point. Parabolic errors come from a
//! finite-difference Hessian at the minimum, and asymmetric errors from
//! locating where the profiled objective rises by the error level.
//!
//! # Status codes
//!
//! | code | meaning                                         |
//! |------|-------------------------------------------------|
//! | 0    | converged                                       |
//! | 1    | Hessian not positive definite, errors diagonal  |
//! | 4    | iteration limit reached before convergence      |
//! | 5    | an error crossing could not be located          |

use std::cell::{Cell, RefCell};

use argmin::core::{
    CostFunction, Error as ArgminError, Executor, State, TerminationReason, TerminationStatus,
};
use argmin::solver::neldermead::NelderMead;
use log::{debug, info, warn};
use ndarray::{Array1, Array2};

use crate::engine::{FcnFunction, FitConfig, FitResult, MinimizerEngine, ParameterSettings};
use crate::utils::finite_difference::hessian;
use crate::utils::matrix::{invert, standard_errors_from_covariance};

/// Engine family reported by [`SimplexEngine`]
pub const SIMPLEX_MINIMIZER_TYPE: &str = "Simplex";

const STATUS_OK: i32 = 0;
const STATUS_NOT_POSDEF: i32 = 1;
const STATUS_CALL_LIMIT: i32 = 4;
const STATUS_FAILED: i32 = 5;

/// Iterations per floating coordinate when no limit is configured
const DEFAULT_ITERS_PER_DIM: usize = 200;

/// Doublings of the step while bracketing an error crossing
const MAX_BRACKET_STEPS: usize = 20;

/// Bisection steps once a crossing is bracketed
const MAX_BISECTION_STEPS: usize = 50;

/// The objective restricted to a subset of coordinates
///
/// Coordinates outside `free` keep the values in `base`.
struct ReducedFcn<'a> {
    fcn: RefCell<&'a mut dyn FcnFunction>,
    settings: &'a [ParameterSettings],
    base: Vec<f64>,
    free: Vec<usize>,
    calls: &'a Cell<usize>,
}

impl<'a> ReducedFcn<'a> {
    fn new(
        fcn: &'a mut dyn FcnFunction,
        settings: &'a [ParameterSettings],
        base: Vec<f64>,
        free: Vec<usize>,
        calls: &'a Cell<usize>,
    ) -> Self {
        Self {
            fcn: RefCell::new(fcn),
            settings,
            base,
            free,
            calls,
        }
    }

    fn expand(&self, p: &[f64]) -> Vec<f64> {
        let mut x = self.base.clone();
        for (k, &i) in self.free.iter().enumerate() {
            x[i] = self.settings[i].clamp(p[k]);
        }
        x
    }

    fn eval(&self, p: &[f64]) -> f64 {
        self.calls.set(self.calls.get() + 1);
        let x = self.expand(p);
        self.fcn.borrow_mut().eval(&x)
    }
}

impl CostFunction for ReducedFcn<'_> {
    type Param = Vec<f64>;
    type Output = f64;

    fn cost(&self, p: &Self::Param) -> Result<Self::Output, ArgminError> {
        let value = self.eval(p);
        // The simplex ordering cannot handle NaN
        Ok(if value.is_nan() { f64::INFINITY } else { value })
    }
}

/// Best point, its cost, and whether the solver converged
struct SimplexOutcome {
    best: Vec<f64>,
    cost: f64,
    converged: bool,
}

fn run_simplex(
    problem: ReducedFcn<'_>,
    start: &[f64],
    steps: &[f64],
    max_iters: u64,
    tolerance: f64,
) -> Result<SimplexOutcome, ArgminError> {
    let simplex = initial_simplex(start, steps);
    let solver: NelderMead<Vec<f64>, f64> = NelderMead::new(simplex).with_sd_tolerance(tolerance)?;

    let res = Executor::new(problem, solver)
        .configure(|state| state.max_iters(max_iters))
        .run()?;

    let state = res.state();
    let converged = matches!(
        state.get_termination_status(),
        TerminationStatus::Terminated(TerminationReason::SolverConverged)
    );
    debug!(
        "simplex finished after {} iterations: {}",
        state.get_iter(),
        state.get_termination_status()
    );

    Ok(SimplexOutcome {
        best: state
            .get_best_param()
            .cloned()
            .unwrap_or_else(|| start.to_vec()),
        cost: state.get_best_cost(),
        converged,
    })
}

fn initial_simplex(start: &[f64], steps: &[f64]) -> Vec<Vec<f64>> {
    let mut vertices = Vec::with_capacity(start.len() + 1);
    vertices.push(start.to_vec());
    for (i, step) in steps.iter().enumerate() {
        let mut vertex = start.to_vec();
        vertex[i] += step;
        vertices.push(vertex);
    }
    vertices
}

fn usable_step(settings: &ParameterSettings) -> f64 {
    let step = settings.step_size();
    if step.is_finite() && step > 0.0 {
        step
    } else {
        0.1 * settings.value().abs().max(1.0)
    }
}

/// Step for the initial simplex, pointing away from a nearby upper limit
fn simplex_step(settings: &ParameterSettings, x: f64) -> f64 {
    let step = usable_step(settings);
    if settings.has_upper_limit() && x + step > settings.upper_limit() {
        -step
    } else {
        step
    }
}

/// Parabolic errors at a point
struct HesseOutcome {
    errors: Vec<f64>,
    covariance: Array2<f64>,
    edm: f64,
    status: i32,
}

/// Minimizer engine built on argmin's Nelder-Mead solver
#[derive(Debug, Clone)]
pub struct SimplexEngine {
    config: FitConfig,
    result: Option<FitResult>,
}

impl Default for SimplexEngine {
    fn default() -> Self {
        Self::new()
    }
}

impl SimplexEngine {
    pub fn new() -> Self {
        Self::with_config(FitConfig::new(SIMPLEX_MINIMIZER_TYPE))
    }

    pub fn with_config(config: FitConfig) -> Self {
        Self {
            config,
            result: None,
        }
    }

    fn max_iters(&self, n_free: usize) -> u64 {
        let options = &self.config.options;
        let mut limit = if options.max_iterations > 0 {
            options.max_iterations
        } else {
            DEFAULT_ITERS_PER_DIM * (n_free + 1)
        };
        if options.max_function_calls > 0 {
            limit = limit.min(options.max_function_calls);
        }
        limit as u64
    }

    fn sd_tolerance(&self) -> f64 {
        let options = &self.config.options;
        (1e-3 * options.tolerance * options.error_def).max(1e-12)
    }

    /// Extra simplex restarts from the current best point
    fn restarts(&self) -> usize {
        if self.config.algorithm == "migradimproved" || self.config.options.strategy >= 2 {
            1
        } else {
            0
        }
    }

    fn check_dimensions(&self, fcn: &dyn FcnFunction) -> bool {
        let n = self.config.params_settings().len();
        if fcn.n_dim() != n {
            warn!(
                "function has {} coordinates but {} parameter settings are configured",
                fcn.n_dim(),
                n
            );
            return false;
        }
        true
    }

    fn hesse_at(
        &self,
        fcn: &mut dyn FcnFunction,
        settings: &[ParameterSettings],
        x: &[f64],
        free: &[usize],
        calls: &Cell<usize>,
    ) -> HesseOutcome {
        let n = settings.len();
        let up = self.config.options.error_def;
        let mut covariance = Array2::zeros((n, n));
        let mut errors = vec![0.0; n];

        if free.is_empty() {
            return HesseOutcome {
                errors,
                covariance,
                edm: 0.0,
                status: STATUS_OK,
            };
        }

        let p = Array1::from_iter(free.iter().map(|&i| x[i]));
        let h = Array1::from_iter(free.iter().map(|&i| 0.1 * usable_step(&settings[i])));
        let reduced = ReducedFcn::new(&mut *fcn, settings, x.to_vec(), free.to_vec(), calls);
        let mut f = |q: &Array1<f64>| reduced.eval(q.as_slice().unwrap_or(&[]));
        let (hess, grad) = hessian(&mut f, &p, &h);

        let (cov_free, edm, status) = match invert(&hess) {
            Some(inv) if inv.diag().iter().all(|v| *v > 0.0) => {
                let edm = 0.5 * grad.dot(&inv.dot(&grad));
                (inv * (2.0 * up), edm, STATUS_OK)
            }
            _ => {
                warn!("Hessian is not positive definite, using its diagonal");
                let m = free.len();
                let mut cov = Array2::zeros((m, m));
                let mut edm = 0.0;
                for k in 0..m {
                    let hkk = hess[[k, k]];
                    if hkk > 0.0 {
                        cov[[k, k]] = 2.0 * up / hkk;
                        edm += 0.5 * grad[k] * grad[k] / hkk;
                    } else {
                        let step = usable_step(&settings[free[k]]);
                        cov[[k, k]] = step * step;
                    }
                }
                (cov, edm, STATUS_NOT_POSDEF)
            }
        };

        let free_errors = standard_errors_from_covariance(&cov_free);
        for (a, &i) in free.iter().enumerate() {
            for (b, &j) in free.iter().enumerate() {
                covariance[[i, j]] = cov_free[[a, b]];
            }
            errors[i] = free_errors[a];
        }

        HesseOutcome {
            errors,
            covariance,
            edm,
            status,
        }
    }

    /// Minimum of the objective over all floating coordinates except `index`,
    /// with coordinate `index` held at `t`
    #[allow(clippy::too_many_arguments)]
    fn profile(
        &self,
        fcn: &mut dyn FcnFunction,
        settings: &[ParameterSettings],
        x_hat: &[f64],
        errors: &[f64],
        index: usize,
        t: f64,
        calls: &Cell<usize>,
    ) -> f64 {
        let mut base = x_hat.to_vec();
        base[index] = t;
        let others: Vec<usize> = (0..settings.len())
            .filter(|&i| i != index && !settings[i].is_fixed())
            .collect();

        if others.is_empty() {
            calls.set(calls.get() + 1);
            return fcn.eval(&base);
        }

        let start: Vec<f64> = others.iter().map(|&i| x_hat[i]).collect();
        let steps: Vec<f64> = others
            .iter()
            .map(|&i| {
                let scale = if errors[i] > 0.0 {
                    errors[i]
                } else {
                    usable_step(&settings[i])
                };
                simplex_step(&settings[i], x_hat[i]).signum() * 0.5 * scale
            })
            .collect();
        let max_iters = self.max_iters(others.len());
        let tolerance = self.sd_tolerance();

        let problem = ReducedFcn::new(&mut *fcn, settings, base, others, calls);
        match run_simplex(problem, &start, &steps, max_iters, tolerance) {
            Ok(outcome) => outcome.cost,
            Err(e) => {
                warn!("profile minimization failed: {}", e);
                f64::INFINITY
            }
        }
    }

    /// Signed distance from the minimum to where the profile crosses
    /// `fmin + up` on one side, `None` if no crossing was found
    #[allow(clippy::too_many_arguments)]
    fn minos_crossing(
        &self,
        fcn: &mut dyn FcnFunction,
        settings: &[ParameterSettings],
        x_hat: &[f64],
        errors: &[f64],
        index: usize,
        direction: f64,
        target: f64,
        calls: &Cell<usize>,
    ) -> Option<f64> {
        let entry = &settings[index];
        let sigma = if errors[index] > 0.0 {
            errors[index]
        } else {
            usable_step(entry)
        };
        let limit_distance = if direction > 0.0 && entry.has_upper_limit() {
            Some((entry.upper_limit() - x_hat[index]).max(0.0))
        } else if direction < 0.0 && entry.has_lower_limit() {
            Some((x_hat[index] - entry.lower_limit()).max(0.0))
        } else {
            None
        };

        let mut inner = 0.0;
        let mut outer = sigma;
        let mut bracketed = false;
        for _ in 0..MAX_BRACKET_STEPS {
            let mut at_limit = false;
            if let Some(dist) = limit_distance {
                if outer >= dist {
                    outer = dist;
                    at_limit = true;
                }
            }
            let t = x_hat[index] + direction * outer;
            if self.profile(fcn, settings, x_hat, errors, index, t, calls) >= target {
                bracketed = true;
                break;
            }
            if at_limit {
                debug!("error crossing of {} lies beyond its limit", entry.name());
                return Some(direction * outer);
            }
            inner = outer;
            outer *= 2.0;
        }
        if !bracketed {
            return None;
        }

        for _ in 0..MAX_BISECTION_STEPS {
            if outer - inner <= 1e-4 * sigma {
                break;
            }
            let mid = 0.5 * (inner + outer);
            let t = x_hat[index] + direction * mid;
            if self.profile(fcn, settings, x_hat, errors, index, t, calls) < target {
                inner = mid;
            } else {
                outer = mid;
            }
        }
        Some(direction * 0.5 * (inner + outer))
    }

    /// Write values and error-based step sizes back into the settings
    fn update_settings(&mut self, values: &[f64], errors: &[f64]) {
        let settings = self.config.params_settings_mut();
        for (i, (&value, &error)) in values.iter().zip(errors).enumerate() {
            if let Some(entry) = settings.get_mut(i) {
                entry.set_value(value);
                if error > 0.0 {
                    entry.set_step_size(error);
                }
            }
        }
    }

    fn report(&self, label: &str) {
        if self.config.options.print_level > 0 {
            if let Some(result) = &self.result {
                info!("{}:\n{}", label, result);
            }
        }
    }
}

impl MinimizerEngine for SimplexEngine {
    fn config(&self) -> &FitConfig {
        &self.config
    }

    fn config_mut(&mut self) -> &mut FitConfig {
        &mut self.config
    }

    fn fit_fcn(&mut self, fcn: &mut dyn FcnFunction) -> bool {
        if !self.check_dimensions(&*fcn) {
            return false;
        }
        let settings: Vec<ParameterSettings> = self.config.params_settings().to_vec();
        let names: Vec<String> = settings.iter().map(|s| s.name().to_string()).collect();
        let mut x: Vec<f64> = settings.iter().map(|s| s.clamp(s.value())).collect();
        let free: Vec<usize> = (0..settings.len())
            .filter(|&i| !settings[i].is_fixed())
            .collect();
        let calls = Cell::new(0);

        let (min_fcn, mut status) = if free.is_empty() {
            calls.set(1);
            (fcn.eval(&x), STATUS_OK)
        } else {
            let max_iters = self.max_iters(free.len());
            let tolerance = self.sd_tolerance();
            let mut outcome = None;
            for _ in 0..=self.restarts() {
                let start: Vec<f64> = free.iter().map(|&i| x[i]).collect();
                let steps: Vec<f64> = free
                    .iter()
                    .map(|&i| simplex_step(&settings[i], x[i]))
                    .collect();
                let problem = ReducedFcn::new(&mut *fcn, &settings, x.clone(), free.clone(), &calls);
                match run_simplex(problem, &start, &steps, max_iters, tolerance) {
                    Ok(run) => {
                        for (k, &i) in free.iter().enumerate() {
                            x[i] = settings[i].clamp(run.best[k]);
                        }
                        outcome = Some(run);
                    }
                    Err(e) => {
                        warn!("simplex minimization failed: {}", e);
                        return false;
                    }
                }
            }
            match outcome {
                Some(run) if run.converged => (run.cost, STATUS_OK),
                Some(run) => (run.cost, STATUS_CALL_LIMIT),
                None => return false,
            }
        };

        let hesse = self.hesse_at(fcn, &settings, &x, &free, &calls);
        if status == STATUS_OK {
            status = hesse.status;
        }

        let mut result = FitResult::new(names, x.clone());
        result.status = status;
        result.valid = status == STATUS_OK;
        result.min_fcn = min_fcn;
        result.edm = hesse.edm;
        result.errors = hesse.errors;
        result.covariance = Some(hesse.covariance);
        result.n_calls = calls.get();

        self.update_settings(&x, &result.errors);
        self.result = Some(result);
        self.report("minimization");
        true
    }

    fn calculate_hess_errors(&mut self, fcn: &mut dyn FcnFunction) -> bool {
        if !self.check_dimensions(&*fcn) {
            return false;
        }
        let settings: Vec<ParameterSettings> = self.config.params_settings().to_vec();
        let names: Vec<String> = settings.iter().map(|s| s.name().to_string()).collect();
        let x: Vec<f64> = settings.iter().map(|s| s.clamp(s.value())).collect();
        let free: Vec<usize> = (0..settings.len())
            .filter(|&i| !settings[i].is_fixed())
            .collect();
        let calls = Cell::new(1);
        let fval = fcn.eval(&x);

        let hesse = self.hesse_at(fcn, &settings, &x, &free, &calls);

        let previous_calls = self.result.as_ref().map_or(0, |r| r.n_calls);
        let mut result = FitResult::new(names, x.clone());
        result.status = hesse.status;
        result.valid = hesse.status == STATUS_OK;
        result.min_fcn = fval;
        result.edm = hesse.edm;
        result.errors = hesse.errors;
        result.covariance = Some(hesse.covariance);
        result.n_calls = previous_calls + calls.get();

        self.update_settings(&x, &result.errors);
        self.result = Some(result);
        self.report("Hesse");
        true
    }

    fn calculate_minos_errors(&mut self, fcn: &mut dyn FcnFunction) -> bool {
        let Some(mut result) = self.result.clone() else {
            warn!("Minos requires a minimum; run a minimization first");
            return false;
        };
        if !self.check_dimensions(&*fcn) {
            return false;
        }
        let settings: Vec<ParameterSettings> = self.config.params_settings().to_vec();
        if result.n_params() != settings.len() {
            warn!("parameter settings changed since the last minimization");
            return false;
        }

        let indices: Vec<usize> = if self.config.minos_params().is_empty() {
            (0..settings.len()).collect()
        } else {
            self.config.minos_params().to_vec()
        };

        let target = result.min_fcn + self.config.options.error_def;
        let x_hat = result.values.clone();
        let errors = result.errors.clone();
        let calls = Cell::new(0);
        let mut status = STATUS_OK;

        for index in indices {
            let Some(entry) = settings.get(index) else {
                warn!("Minos parameter index {} out of range", index);
                continue;
            };
            if entry.is_fixed() {
                continue;
            }

            let lower = self.minos_crossing(
                fcn, &settings, &x_hat, &errors, index, -1.0, target, &calls,
            );
            let upper = self.minos_crossing(
                fcn, &settings, &x_hat, &errors, index, 1.0, target, &calls,
            );
            match (lower, upper) {
                (Some(lo), Some(up)) => result.minos_errors[index] = Some((lo, up)),
                _ => {
                    warn!("no error crossing found for {}", entry.name());
                    status = STATUS_FAILED;
                }
            }
        }

        // Restore the objective to the minimum after the profile scans
        calls.set(calls.get() + 1);
        fcn.eval(&x_hat);

        result.status = status;
        result.n_calls += calls.get();
        self.result = Some(result);
        self.report("Minos");
        true
    }

    fn result(&self) -> Option<&FitResult> {
        self.result.as_ref()
    }
}
