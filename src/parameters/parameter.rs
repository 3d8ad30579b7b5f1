//! Parameter definition and implementation
//!
//! This module provides the Parameter struct, the named real-valued quantity a
//! model exposes to a fit. A parameter is either floating (the minimizer may
//! vary it) or constant, may carry bounds, and records the parabolic and
//! asymmetric errors that a fit propagates back into it.

use crate::parameters::bounds::{Bounds, BoundsError};
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Errors that can occur when working with parameters
#[derive(Error, Debug, Clone, PartialEq)]
pub enum ParameterError {
    #[error("Bounds error: {0}")]
    BoundsError(#[from] BoundsError),

    #[error("Parameter '{name}' not found")]
    ParameterNotFound { name: String },

    #[error("Parameter '{name}' already exists")]
    DuplicateParameter { name: String },
}

/// The concrete kind of a model parameter.
///
/// Only [`ParameterKind::Real`] parameters can be driven by a minimizer.
/// Discrete parameters (category indices, channel selectors, ...) may sit in a
/// model's parameter list, but they are rejected if they are ever left floating.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ParameterKind {
    /// Continuous real-valued parameter
    Real,

    /// Integer-valued parameter; assigned values are rounded
    Discrete,
}

impl Default for ParameterKind {
    fn default() -> Self {
        ParameterKind::Real
    }
}

/// A named model parameter
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Parameter {
    /// Name of the parameter
    pub name: String,

    /// Current value of the parameter
    value: f64,

    /// Initial value when created (for reset operations)
    init_value: f64,

    /// Whether this parameter is held fixed during minimization
    constant: bool,

    /// Concrete kind of the parameter
    #[serde(default)]
    kind: ParameterKind,

    /// Minimum and maximum bounds for the parameter value
    bounds: Bounds,

    /// Parabolic error, doubles as the initial step size of a fit
    pub stderr: Option<f64>,

    /// Asymmetric (lower, upper) errors from a Minos run
    pub asym_errors: Option<(f64, f64)>,
}

impl Parameter {
    /// Create a new floating parameter with the given name and value
    ///
    /// # Examples
    ///
    /// ```
    /// use minopt_rs::parameters::parameter::Parameter;
    ///
    /// let param = Parameter::new("mean", 10.0);
    /// assert_eq!(param.name(), "mean");
    /// assert_eq!(param.value(), 10.0);
    /// assert!(!param.is_constant());
    /// assert!(!param.has_min() && !param.has_max());
    /// ```
    pub fn new(name: &str, value: f64) -> Self {
        Self {
            name: name.to_string(),
            value,
            init_value: value,
            constant: false,
            kind: ParameterKind::Real,
            bounds: Bounds::default(),
            stderr: None,
            asym_errors: None,
        }
    }

    /// Create a new floating parameter with the given name, value, and bounds
    ///
    /// The value is clamped into the bounds.
    ///
    /// # Examples
    ///
    /// ```
    /// use minopt_rs::parameters::parameter::Parameter;
    ///
    /// let param = Parameter::with_bounds("sigma", 25.0, 0.0, 20.0).unwrap();
    /// assert_eq!(param.value(), 20.0);
    /// assert_eq!(param.min(), 0.0);
    /// assert_eq!(param.max(), 20.0);
    /// ```
    pub fn with_bounds(name: &str, value: f64, min: f64, max: f64) -> Result<Self, ParameterError> {
        let bounds = Bounds::new(min, max)?;
        let value = bounds.clamp(value);

        Ok(Self {
            bounds,
            value,
            init_value: value,
            ..Self::new(name, value)
        })
    }

    /// Create a discrete parameter; it is constant by default
    pub fn discrete(name: &str, value: i64) -> Self {
        Self {
            constant: true,
            kind: ParameterKind::Discrete,
            ..Self::new(name, value as f64)
        }
    }

    /// Builder-style constant flag
    pub fn constant(mut self, constant: bool) -> Self {
        self.constant = constant;
        self
    }

    /// Builder-style initial error estimate
    pub fn with_error(mut self, error: f64) -> Self {
        self.stderr = Some(error);
        self
    }

    /// Get the current value of the parameter
    pub fn value(&self) -> f64 {
        self.value
    }

    /// Set the value of the parameter.
    ///
    /// Values outside the bounds are clamped onto the nearest limit, and
    /// discrete parameters round to the nearest integer, so the stored value
    /// may differ from the argument. Read it back with [`Parameter::value`].
    pub fn set_value(&mut self, value: f64) {
        let value = match self.kind {
            ParameterKind::Real => value,
            ParameterKind::Discrete => value.round(),
        };
        self.value = if value.is_nan() {
            value
        } else {
            self.bounds.clamp(value)
        };
    }

    /// Get the initial value of the parameter
    pub fn init_value(&self) -> f64 {
        self.init_value
    }

    /// Reset the parameter to its initial value
    pub fn reset(&mut self) {
        self.value = self.bounds.clamp(self.init_value);
    }

    /// Get the name of the parameter
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Whether the parameter is held fixed during minimization
    pub fn is_constant(&self) -> bool {
        self.constant
    }

    /// Set whether the parameter is held fixed during minimization
    pub fn set_constant(&mut self, constant: bool) {
        self.constant = constant;
    }

    /// Get the kind of the parameter
    pub fn kind(&self) -> ParameterKind {
        self.kind
    }

    /// Whether the parameter is a continuous real-valued parameter
    pub fn is_real(&self) -> bool {
        self.kind == ParameterKind::Real
    }

    /// Get the minimum allowed value for the parameter
    pub fn min(&self) -> f64 {
        self.bounds.min
    }

    /// Get the maximum allowed value for the parameter
    pub fn max(&self) -> f64 {
        self.bounds.max
    }

    /// Whether a finite lower bound is set
    pub fn has_min(&self) -> bool {
        self.bounds.has_lower_bound()
    }

    /// Whether a finite upper bound is set
    pub fn has_max(&self) -> bool {
        self.bounds.has_upper_bound()
    }

    /// Get the bounds of the parameter
    pub fn bounds(&self) -> &Bounds {
        &self.bounds
    }

    /// Set the bounds for the parameter
    ///
    /// # Returns
    ///
    /// `Ok(())` if the bounds were set successfully, or an error if min > max.
    /// The current value is clamped into the new range.
    pub fn set_bounds(&mut self, min: f64, max: f64) -> Result<(), ParameterError> {
        let bounds = Bounds::new(min, max)?;
        self.bounds = bounds;
        self.value = bounds.clamp(self.value);

        Ok(())
    }

    /// Set the minimum bound for the parameter
    pub fn set_min(&mut self, min: f64) -> Result<(), ParameterError> {
        self.set_bounds(min, self.bounds.max)
    }

    /// Set the maximum bound for the parameter
    pub fn set_max(&mut self, max: f64) -> Result<(), ParameterError> {
        self.set_bounds(self.bounds.min, max)
    }

    /// Remove both bounds
    pub fn remove_bounds(&mut self) {
        self.bounds = Bounds::unbounded();
    }

    /// Parabolic error, or 0 when none is known
    pub fn error(&self) -> f64 {
        self.stderr.unwrap_or(0.0)
    }

    /// Get the standard error of the parameter (if available)
    pub fn stderr(&self) -> Option<f64> {
        self.stderr
    }

    /// Set the standard error of the parameter
    pub fn set_stderr(&mut self, stderr: Option<f64>) {
        self.stderr = stderr;
    }

    /// Asymmetric (lower, upper) errors, lower is negative
    pub fn asym_errors(&self) -> Option<(f64, f64)> {
        self.asym_errors
    }

    /// Store asymmetric errors
    pub fn set_asym_errors(&mut self, lower: f64, upper: f64) {
        self.asym_errors = Some((lower, upper));
    }

    /// Drop any stored asymmetric errors
    pub fn clear_asym_errors(&mut self) {
        self.asym_errors = None;
    }
}
