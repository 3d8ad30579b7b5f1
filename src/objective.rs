//! The model contract consumed by the fit machinery.
//!
//! An [`Objective`] owns its [`Parameters`], computes a scalar (a negative
//! log-likelihood, a χ², ...) from their current values, and keeps an
//! [`EvalErrorLog`] of problems hit during evaluation. It can also react to
//! changes in its set of constant parameters by precomputing terms that no
//! longer change during a fit.

use std::fmt::Write as _;

use log::warn;

use crate::parameters::Parameters;

/// Kind of change reported to an objective's constant-term optimizer
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConstOptChange {
    /// Constant-term optimization was switched on
    Activate,

    /// Constant-term optimization was switched off; drop cached terms
    Deactivate,

    /// The set of constant parameters changed; cached terms must be rebuilt
    ConfigChange,

    /// Only values of constant parameters changed
    ValueChange,
}

/// How evaluation errors are handled when they are raised
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EvalErrorMode {
    /// Emit each error to the log immediately
    PrintErrors,

    /// Store errors so they can be reported later
    CollectErrors,

    /// Only count errors
    CountErrors,

    /// Drop errors
    Ignore,
}

/// A single evaluation problem
#[derive(Debug, Clone, PartialEq)]
pub struct EvalError {
    /// Name of the component that raised the error
    pub origin: String,

    /// Description of the problem
    pub message: String,
}

/// Accumulated evaluation errors of an objective
#[derive(Debug, Clone)]
pub struct EvalErrorLog {
    mode: EvalErrorMode,
    errors: Vec<EvalError>,
    count: usize,
    error_flag: bool,
}

impl Default for EvalErrorLog {
    fn default() -> Self {
        Self::new()
    }
}

impl EvalErrorLog {
    /// Create an empty log in print mode
    pub fn new() -> Self {
        Self {
            mode: EvalErrorMode::PrintErrors,
            errors: Vec::new(),
            count: 0,
            error_flag: false,
        }
    }

    /// Current handling mode
    pub fn mode(&self) -> EvalErrorMode {
        self.mode
    }

    /// Switch the handling mode, returning the previous one
    pub fn set_mode(&mut self, mode: EvalErrorMode) -> EvalErrorMode {
        std::mem::replace(&mut self.mode, mode)
    }

    /// Record an evaluation error according to the current mode
    pub fn log_error(&mut self, origin: &str, message: &str) {
        match self.mode {
            EvalErrorMode::PrintErrors => {
                warn!("{}: evaluation error: {}", origin, message);
            }
            EvalErrorMode::CollectErrors => {
                self.errors.push(EvalError {
                    origin: origin.to_string(),
                    message: message.to_string(),
                });
                self.count += 1;
            }
            EvalErrorMode::CountErrors => self.count += 1,
            EvalErrorMode::Ignore => {}
        }
    }

    /// Number of errors counted since the last clear
    pub fn num_errors(&self) -> usize {
        self.count
    }

    /// Collected errors
    pub fn errors(&self) -> &[EvalError] {
        &self.errors
    }

    /// Raise the model-local error flag (e.g. an invalid normalization)
    pub fn raise_error_flag(&mut self) {
        self.error_flag = true;
    }

    /// Whether the model-local error flag is raised
    pub fn error_flag(&self) -> bool {
        self.error_flag
    }

    /// Lower the model-local error flag
    pub fn clear_error_flag(&mut self) {
        self.error_flag = false;
    }

    /// Whether either the flag or the counter signals a problem
    pub fn has_errors(&self) -> bool {
        self.error_flag || self.count > 0
    }

    /// Drop collected errors and reset the counter
    pub fn clear(&mut self) {
        self.errors.clear();
        self.count = 0;
    }

    /// Render at most `max_errors` collected errors, one per line
    pub fn format_errors(&self, max_errors: usize) -> String {
        let mut out = String::new();
        for err in self.errors.iter().take(max_errors) {
            let _ = writeln!(out, "    {}: {}", err.origin, err.message);
        }
        if self.errors.len() > max_errors {
            let _ = writeln!(
                out,
                "    ... {} further errors suppressed",
                self.errors.len() - max_errors
            );
        }
        out
    }
}

/// A scalar function of named parameters that can be minimized
///
/// Implementors must be deterministic: two calls to [`Objective::value`] with
/// unchanged parameter state return the same number.
pub trait Objective {
    /// The parameters the objective depends on
    fn parameters(&self) -> &Parameters;

    /// Mutable access to the parameters
    fn parameters_mut(&mut self) -> &mut Parameters;

    /// Evaluate the objective at the current parameter values
    ///
    /// Problems are reported through [`Objective::eval_errors_mut`] rather
    /// than by returning an error, since the minimizer needs a number for
    /// every trial point.
    fn value(&mut self) -> f64;

    /// Errors raised during evaluation
    fn eval_errors(&self) -> &EvalErrorLog;

    /// Mutable access to the evaluation error log
    fn eval_errors_mut(&mut self) -> &mut EvalErrorLog;

    /// Notification that constant parameters changed
    ///
    /// The default implementation does nothing.
    fn const_optimize(&mut self, _change: ConstOptChange) {}

    /// Objective change corresponding to one standard deviation
    ///
    /// 1.0 for a χ², 0.5 for a negative log-likelihood.
    fn default_error_level(&self) -> f64 {
        1.0
    }

    /// Whether the objective asks for quiet operation
    fn is_silent(&self) -> bool {
        false
    }
}
