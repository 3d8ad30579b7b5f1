//! Outcome of an engine run.

use ndarray::Array2;
use serde::{Deserialize, Serialize};
use std::fmt;

use crate::utils::calculate_correlation;

/// Result of the last minimization or error calculation
///
/// Vectors are indexed like the engine's parameter settings; fixed
/// parameters carry their value and a zero error.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FitResult {
    /// Engine status code, 0 on success
    pub status: i32,

    /// Whether the minimum and its errors can be trusted
    pub valid: bool,

    /// Estimated vertical distance to the minimum
    pub edm: f64,

    /// Objective value at the minimum
    pub min_fcn: f64,

    /// Number of objective calls made by the engine
    pub n_calls: usize,

    /// Parameter names, in settings order
    pub names: Vec<String>,

    /// Parameter values at the minimum
    pub values: Vec<f64>,

    /// Parabolic errors
    pub errors: Vec<f64>,

    /// Asymmetric (lower, upper) errors where they were computed
    pub minos_errors: Vec<Option<(f64, f64)>>,

    /// Covariance matrix, zero rows and columns for fixed parameters
    pub covariance: Option<Array2<f64>>,
}

impl FitResult {
    /// Empty result for `n` parameters
    pub fn new(names: Vec<String>, values: Vec<f64>) -> Self {
        let n = values.len();
        Self {
            status: 0,
            valid: false,
            edm: f64::NAN,
            min_fcn: f64::NAN,
            n_calls: 0,
            names,
            values,
            errors: vec![0.0; n],
            minos_errors: vec![None; n],
            covariance: None,
        }
    }

    pub fn n_params(&self) -> usize {
        self.values.len()
    }

    pub fn value(&self, index: usize) -> Option<f64> {
        self.values.get(index).copied()
    }

    pub fn error(&self, index: usize) -> Option<f64> {
        self.errors.get(index).copied()
    }

    /// Minos lower error (negative), if computed
    pub fn lower_error(&self, index: usize) -> Option<f64> {
        self.minos_errors.get(index).copied().flatten().map(|(lo, _)| lo)
    }

    /// Minos upper error (positive), if computed
    pub fn upper_error(&self, index: usize) -> Option<f64> {
        self.minos_errors.get(index).copied().flatten().map(|(_, up)| up)
    }

    /// Correlation matrix derived from the covariance
    pub fn correlation(&self) -> Option<Array2<f64>> {
        self.covariance.as_ref().map(calculate_correlation)
    }
}

impl fmt::Display for FitResult {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "Fit Result:")?;
        writeln!(f, "  Status: {}", self.status)?;
        writeln!(f, "  Valid: {}", self.valid)?;
        writeln!(f, "  FCN: {:.6e}", self.min_fcn)?;
        writeln!(f, "  EDM: {:.3e}", self.edm)?;
        writeln!(f, "  Function calls: {}", self.n_calls)?;
        for (i, name) in self.names.iter().enumerate() {
            write!(f, "  {:<12} {:>14.6e} +/- {:.3e}", name, self.values[i], self.errors[i])?;
            if let Some((lo, up)) = self.minos_errors[i] {
                write!(f, "  ({:+.3e}, {:+.3e})", lo, up)?;
            }
            writeln!(f)?;
        }
        Ok(())
    }
}
