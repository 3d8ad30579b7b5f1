//! Evaluating the objective at engine coordinates.

use std::fmt::Write as _;
use std::io::Write as _;

use log::{info, warn};

use crate::engine::{FcnFunction, FitResult};
use crate::fcn::{EvalStrategy, MinimizerFcn};
use crate::objective::Objective;
use crate::parameters::Parameters;
use crate::utils::format_significant;

impl MinimizerFcn {
    /// Evaluate the objective at coordinates `x`
    ///
    /// Coordinate `i` is written to floating parameter `i` only when it
    /// differs from the current value. If the objective reports errors, the
    /// evaluation counts as invalid; with the error wall on, the largest valid
    /// value seen so far is returned instead of the objective's value.
    pub fn eval<O: Objective + ?Sized>(&mut self, objective: &mut O, x: &[f64]) -> f64 {
        let verbose = self.config().verbose;
        let mut changed = String::new();

        match self.strategy() {
            EvalStrategy::Generic => {
                let params = objective.parameters_mut();
                for (name, &xi) in self.float_params.iter().zip(x) {
                    let Some(par) = params.get_mut(name) else {
                        continue;
                    };
                    if par.value() != xi {
                        par.set_value(xi);
                        if verbose {
                            let _ = write!(changed, "{}={}, ", name, xi);
                        }
                    }
                }
            }
            EvalStrategy::Cached => {
                let params = objective.parameters_mut();
                let cache = &mut self.cache;
                for (i, &xi) in x.iter().enumerate().take(cache.values.len()) {
                    if cache.values[i] == xi {
                        continue;
                    }
                    let Some(pos) = cache.positions[i] else {
                        continue;
                    };
                    let Some(par) = params.get_index_mut(pos) else {
                        continue;
                    };
                    par.set_value(xi);
                    // Read back, the parameter may have clamped or rounded
                    cache.values[i] = par.value();
                    if verbose {
                        let _ = write!(changed, "{}={}, ", par.name(), xi);
                    }
                }
            }
        }

        let mut value = objective.value();
        self.eval_count += 1;

        if objective.eval_errors().has_errors() {
            if self.config().report_errors {
                self.report_invalid(objective);
            }
            if self.config().error_wall {
                value = self.max_fcn;
            }
            let errors = objective.eval_errors_mut();
            errors.clear_error_flag();
            errors.clear();
            self.num_bad_evaluations += 1;
        } else if value > self.max_fcn {
            self.max_fcn = value;
        }

        self.write_log_line(x, value);

        if verbose {
            info!("{}prevFCN = {}", changed, format_significant(value, 10));
        }

        value
    }

    fn report_invalid<O: Objective + ?Sized>(&self, objective: &O) {
        let mut message = if self.config().error_wall {
            format!(
                "minimized function has error status; returning maximum FCN so far ({}) \
                 to force the minimizer out of this region. Error log follows",
                self.max_fcn
            )
        } else {
            "minimized function has error status but is ignored".to_string()
        };

        let params = objective.parameters();
        let values: Vec<String> = self
            .float_params
            .iter()
            .filter_map(|name| params.get(name))
            .map(|p| format!("{}={}", p.name(), p.value()))
            .collect();
        let _ = write!(message, "\nParameter values: {}", values.join(", "));

        let log = objective.eval_errors();
        if !log.errors().is_empty() {
            let _ = write!(
                message,
                "\n{}",
                log.format_errors(self.config().max_reported_errors)
            );
        }
        warn!("{}", message);
    }

    /// Append `x` and `value` to the evaluation log
    ///
    /// Every line, the first included, formats coordinates at 4 significant
    /// digits and the value at 15.
    fn write_log_line(&mut self, x: &[f64], value: f64) {
        let Some(sink) = self.log_sink.as_mut() else {
            return;
        };
        let mut line = String::new();
        for &xi in x {
            line.push_str(&format_significant(xi, 4));
            line.push(' ');
        }
        line.push_str(&format_significant(value, 15));
        line.push('\n');

        if let Err(e) = sink.write_all(line.as_bytes()) {
            warn!("failed to write evaluation log, closing it: {}", e);
            self.log_sink = None;
        }
    }

    /// Refresh the cached positions and values from `params`
    pub fn rebuild_cache(&mut self, params: &Parameters) {
        self.cache.positions = self
            .float_params
            .iter()
            .map(|name| params.index_of(name))
            .collect();
        self.cache.values = self
            .float_params
            .iter()
            .map(|name| params.get(name).map_or(f64::NAN, |p| p.value()))
            .collect();
    }

    /// Copy a fit result into the objective's floating parameters
    ///
    /// Entries are matched by name, so a result from before the floating
    /// list was reshaped only reaches the parameters it was computed for.
    /// Values and parabolic errors are always written. Asymmetric errors are
    /// stored when the result carries a non-trivial pair and cleared
    /// otherwise. The evaluation cache is refreshed afterwards.
    pub fn back_prop<O: Objective + ?Sized>(&mut self, objective: &mut O, result: &FitResult) {
        let params = objective.parameters_mut();
        for (index, name) in self.float_params.iter().enumerate() {
            let Some(j) = result_index(result, index, name) else {
                continue;
            };
            let Some(par) = params.get_mut(name) else {
                continue;
            };
            par.set_value(result.values[j]);
            par.set_stderr(Some(result.errors[j]));
            match result.minos_errors[j] {
                Some((lower, upper)) if upper > 0.0 || lower < 0.0 => {
                    par.set_asym_errors(lower, upper)
                }
                _ => par.clear_asym_errors(),
            }
        }
        self.rebuild_cache(objective.parameters());
    }
}

/// Position of `name` in `result`, trying the expected slot first
fn result_index(result: &FitResult, index: usize, name: &str) -> Option<usize> {
    if result.names.get(index).is_some_and(|n| n == name) {
        return Some(index);
    }
    result.names.iter().position(|n| n == name)
}

/// A [`MinimizerFcn`] paired with its objective, evaluable by an engine
pub struct FcnBinding<'a, O: Objective + ?Sized> {
    fcn: &'a mut MinimizerFcn,
    objective: &'a mut O,
}

impl<'a, O: Objective + ?Sized> FcnBinding<'a, O> {
    pub fn new(fcn: &'a mut MinimizerFcn, objective: &'a mut O) -> Self {
        Self { fcn, objective }
    }
}

impl<O: Objective + ?Sized> FcnFunction for FcnBinding<'_, O> {
    fn n_dim(&self) -> usize {
        self.fcn.n_dim()
    }

    fn eval(&mut self, x: &[f64]) -> f64 {
        self.fcn.eval(&mut *self.objective, x)
    }
}
