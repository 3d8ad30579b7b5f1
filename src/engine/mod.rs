//! # Minimizer Engines
//!
//! An engine minimizes a plain function of a coordinate vector and computes
//! parabolic (Hesse) and asymmetric (Minos) errors for it. It knows nothing
//! about named parameters: everything it needs is in its [`FitConfig`], whose
//! parameter settings are kept in step with the model by the synchronizer.
//!
//! - [`FcnFunction`]: the function an engine minimizes
//! - [`MinimizerEngine`]: the engine contract
//! - [`SimplexEngine`]: an engine built on argmin's Nelder-Mead solver

pub mod result;
pub mod settings;

#[cfg(feature = "simplex")]
pub mod simplex;

pub use result::FitResult;
pub use settings::{FitConfig, MinimizerOptions, ParameterSettings, SettingChange, SettingsList};

#[cfg(feature = "simplex")]
pub use simplex::SimplexEngine;

/// A scalar function of `n_dim` coordinates
///
/// Coordinate `i` corresponds to entry `i` of the engine's parameter settings.
pub trait FcnFunction {
    /// Number of coordinates
    fn n_dim(&self) -> usize;

    /// Evaluate at `x`
    fn eval(&mut self, x: &[f64]) -> f64;
}

impl<F: FnMut(&[f64]) -> f64> FcnFunction for (usize, F) {
    fn n_dim(&self) -> usize {
        self.0
    }

    fn eval(&mut self, x: &[f64]) -> f64 {
        (self.1)(x)
    }
}

/// A numerical minimizer
///
/// Operations return `true` when the engine ran; the quality of the outcome is
/// reported through [`FitResult::status`].
pub trait MinimizerEngine {
    /// Current configuration
    fn config(&self) -> &FitConfig;

    /// Mutable configuration; parameter settings are edited through here
    fn config_mut(&mut self) -> &mut FitConfig;

    /// Minimize `fcn` starting from the configured parameter settings
    fn fit_fcn(&mut self, fcn: &mut dyn FcnFunction) -> bool;

    /// Compute parabolic errors at the configured parameter values
    fn calculate_hess_errors(&mut self, fcn: &mut dyn FcnFunction) -> bool;

    /// Compute asymmetric errors for the configured Minos parameters
    fn calculate_minos_errors(&mut self, fcn: &mut dyn FcnFunction) -> bool;

    /// Result of the last operation, if any ran
    fn result(&self) -> Option<&FitResult>;

    /// Whether a minimization has been performed
    fn has_minimizer(&self) -> bool {
        self.result().is_some()
    }
}
