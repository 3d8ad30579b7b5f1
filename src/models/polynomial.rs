//! Polynomial least-squares objective.

use crate::error::{MinOptError, Result};
use crate::objective::{ConstOptChange, EvalErrorLog, Objective};
use crate::parameters::Parameters;

/// Contribution of the constant coefficients at every data point
struct FixedTerms {
    coefficients: Vec<usize>,
    partial: Vec<f64>,
}

/// χ² of a polynomial against data with known uncertainties
///
/// The polynomial function is defined as:
///
/// f(x) = c0 + c1*x + c2*x^2 + ... + cn*x^n
///
/// and the objective is Σ ((yᵢ - f(xᵢ)) / σᵢ)². With constant-term
/// optimization active, the part of f contributed by constant coefficients is
/// precomputed per data point.
pub struct PolynomialChi2 {
    x: Vec<f64>,
    y: Vec<f64>,
    sigma: Vec<f64>,
    names: Vec<String>,
    params: Parameters,
    errors: EvalErrorLog,
    const_opt: bool,
    fixed_terms: Option<FixedTerms>,
}

impl PolynomialChi2 {
    /// Create the χ² for a polynomial of the given degree
    ///
    /// Coefficients are named `c0` to `c{degree}` and start at 0.
    ///
    /// # Arguments
    ///
    /// * `x` - The independent variable values
    /// * `y` - The observed values
    /// * `sigma` - The uncertainty of each observation, all positive
    /// * `degree` - The degree of the polynomial
    pub fn new(x: Vec<f64>, y: Vec<f64>, sigma: Vec<f64>, degree: usize) -> Result<Self> {
        if x.len() != y.len() || x.len() != sigma.len() {
            return Err(MinOptError::DimensionMismatch(format!(
                "x, y and sigma have lengths {}, {} and {}",
                x.len(),
                y.len(),
                sigma.len()
            )));
        }
        if sigma.iter().any(|s| s.is_nan() || *s <= 0.0) {
            return Err(MinOptError::InvalidConfig(
                "all uncertainties must be positive".to_string(),
            ));
        }

        let names: Vec<String> = (0..=degree).map(|k| format!("c{}", k)).collect();
        let mut params = Parameters::new();
        for name in &names {
            params.add_param(name, 0.0)?;
        }

        Ok(Self {
            x,
            y,
            sigma,
            names,
            params,
            errors: EvalErrorLog::new(),
            const_opt: false,
            fixed_terms: None,
        })
    }

    pub fn degree(&self) -> usize {
        self.names.len() - 1
    }

    /// Whether constant coefficients are currently precomputed
    pub fn has_fixed_terms(&self) -> bool {
        self.fixed_terms.is_some()
    }

    fn coefficients(&self) -> Vec<f64> {
        self.names
            .iter()
            .map(|n| self.params.get(n).map_or(f64::NAN, |p| p.value()))
            .collect()
    }

    fn refresh_fixed_terms(&mut self) {
        let coefficients: Vec<usize> = self
            .names
            .iter()
            .enumerate()
            .filter(|(_, n)| self.params.get(n).is_some_and(|p| p.is_constant()))
            .map(|(k, _)| k)
            .collect();
        if coefficients.is_empty() {
            self.fixed_terms = None;
            return;
        }

        let c = self.coefficients();
        let partial = self
            .x
            .iter()
            .map(|&xi| coefficients.iter().map(|&k| c[k] * xi.powi(k as i32)).sum())
            .collect();
        self.fixed_terms = Some(FixedTerms {
            coefficients,
            partial,
        });
    }
}

impl Objective for PolynomialChi2 {
    fn parameters(&self) -> &Parameters {
        &self.params
    }

    fn parameters_mut(&mut self) -> &mut Parameters {
        &mut self.params
    }

    fn value(&mut self) -> f64 {
        let mut c = self.coefficients();
        if c.iter().any(|v| !v.is_finite()) {
            self.errors.raise_error_flag();
            self.errors
                .log_error("PolynomialChi2", "non-finite polynomial coefficient");
            return f64::NAN;
        }

        if let Some(fixed) = &self.fixed_terms {
            for &k in &fixed.coefficients {
                c[k] = 0.0;
            }
        }

        let mut chi2 = 0.0;
        for (i, &xi) in self.x.iter().enumerate() {
            let mut model = self.fixed_terms.as_ref().map_or(0.0, |f| f.partial[i]);
            let mut x_power = 1.0;
            for ck in &c {
                model += ck * x_power;
                x_power *= xi;
            }
            let r = (self.y[i] - model) / self.sigma[i];
            chi2 += r * r;
        }
        chi2
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
                self.refresh_fixed_terms();
            }
            ConstOptChange::ValueChange => {
                if self.const_opt {
                    self.refresh_fixed_terms();
                }
            }
            ConstOptChange::Deactivate => {
                self.const_opt = false;
                self.fixed_terms = None;
            }
        }
    }
}
