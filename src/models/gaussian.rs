//! Gaussian negative log-likelihood.

use std::f64::consts::PI;

use crate::error::{MinOptError, Result};
use crate::objective::{ConstOptChange, EvalErrorLog, Objective};
use crate::parameters::Parameters;

/// Negative log-likelihood of an unbinned sample under a Gaussian
///
/// NLL(μ, σ) = n·ln(σ√(2π)) + Σ (xᵢ - μ)² / (2σ²)
///
/// Parameters are `mean` and `sigma`. A non-positive `sigma` is an invalid
/// normalization: it is logged as an evaluation error and the value is NaN.
///
/// With constant-term optimization active and `sigma` constant, the
/// normalization term is computed once and reused until the next
/// notification.
pub struct GaussianNll {
    data: Vec<f64>,
    params: Parameters,
    errors: EvalErrorLog,
    const_opt: bool,
    norm_cache: Option<f64>,
    silent: bool,
}

impl GaussianNll {
    /// Create the likelihood of `data` with starting values for both parameters
    ///
    /// # Returns
    ///
    /// An error if `data` is empty
    pub fn new(data: Vec<f64>, mean: f64, sigma: f64) -> Result<Self> {
        if data.is_empty() {
            return Err(MinOptError::InvalidConfig(
                "a Gaussian likelihood needs at least one observation".to_string(),
            ));
        }

        let mut params = Parameters::new();
        params.add_param("mean", mean)?;
        params.add_param("sigma", sigma)?;

        Ok(Self {
            data,
            params,
            errors: EvalErrorLog::new(),
            const_opt: false,
            norm_cache: None,
            silent: false,
        })
    }

    /// Builder-style quiet flag
    pub fn with_silent(mut self, silent: bool) -> Self {
        self.silent = silent;
        self
    }

    pub fn data(&self) -> &[f64] {
        &self.data
    }

    /// Whether the normalization term is currently cached
    pub fn has_cached_normalization(&self) -> bool {
        self.norm_cache.is_some()
    }

    fn normalization(&self, sigma: f64) -> f64 {
        self.data.len() as f64 * (sigma * (2.0 * PI).sqrt()).ln()
    }

    fn param_value(&self, name: &str) -> f64 {
        self.params.get(name).map_or(f64::NAN, |p| p.value())
    }

    fn refresh_cache(&mut self) {
        let sigma = self.params.get("sigma");
        self.norm_cache = match sigma {
            Some(s) if s.is_constant() && s.value() > 0.0 => Some(self.normalization(s.value())),
            _ => None,
        };
    }
}

impl Objective for GaussianNll {
    fn parameters(&self) -> &Parameters {
        &self.params
    }

    fn parameters_mut(&mut self) -> &mut Parameters {
        &mut self.params
    }

    fn value(&mut self) -> f64 {
        let mean = self.param_value("mean");
        let sigma = self.param_value("sigma");

        if sigma.is_nan() || sigma <= 0.0 {
            self.errors.raise_error_flag();
            self.errors
                .log_error("GaussianNll", &format!("sigma = {} is not positive", sigma));
            return f64::NAN;
        }

        let norm = self
            .norm_cache
            .unwrap_or_else(|| self.normalization(sigma));
        let inv_two_var = 1.0 / (2.0 * sigma * sigma);
        let sum: f64 = self
            .data
            .iter()
            .map(|x| (x - mean) * (x - mean) * inv_two_var)
            .sum();
        norm + sum
    }

    fn eval_errors(&self) -> &EvalErrorLog {
        &self.errors
    }

    fn eval_errors_mut(&mut self) -> &mut EvalErrorLog {
        &mut self.errors
    }

    fn const_optimize(&mut self, change: ConstOptChange) {
        match change {
            ConstOptChange::Activate | ConstOptChange::ConfigChange => {
                self.const_opt = true;
                self.refresh_cache();
            }
            ConstOptChange::ValueChange => {
                if self.const_opt {
                    self.refresh_cache();
                }
            }
            ConstOptChange::Deactivate => {
                self.const_opt = false;
                self.norm_cache = None;
            }
        }
    }

    fn default_error_level(&self) -> f64 {
        0.5
    }

    fn is_silent(&self) -> bool {
        self.silent
    }
}
