//! Parameter settings and configuration held by a minimizer engine.
//!
//! A [`SettingsList`] is the engine's own, positionally indexed view of the
//! parameters it minimizes over. It is never edited behind the engine's back:
//! the synchronizer describes the required edits as [`SettingChange`]s and the
//! caller commits them with [`SettingsList::apply`].

use serde::{Deserialize, Serialize};
use std::ops::Deref;

use crate::error::{MinOptError, Result};

/// Engine-side description of one parameter
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ParameterSettings {
    name: String,
    value: f64,
    step_size: f64,
    lower_limit: f64,
    upper_limit: f64,
    has_lower_limit: bool,
    has_upper_limit: bool,
    fixed: bool,
}

impl ParameterSettings {
    /// An unbounded, floating entry
    pub fn new(name: &str, value: f64, step_size: f64) -> Self {
        Self {
            name: name.to_string(),
            value,
            step_size,
            lower_limit: 0.0,
            upper_limit: 0.0,
            has_lower_limit: false,
            has_upper_limit: false,
            fixed: false,
        }
    }

    /// A floating entry limited on both sides
    pub fn bounded(name: &str, value: f64, step_size: f64, lower: f64, upper: f64) -> Self {
        let mut settings = Self::new(name, value, step_size);
        settings.set_limits(lower, upper);
        settings
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn value(&self) -> f64 {
        self.value
    }

    pub fn step_size(&self) -> f64 {
        self.step_size
    }

    /// Lower limit, 0 when unset
    pub fn lower_limit(&self) -> f64 {
        self.lower_limit
    }

    /// Upper limit, 0 when unset
    pub fn upper_limit(&self) -> f64 {
        self.upper_limit
    }

    pub fn has_lower_limit(&self) -> bool {
        self.has_lower_limit
    }

    pub fn has_upper_limit(&self) -> bool {
        self.has_upper_limit
    }

    /// Whether at least one limit is set
    pub fn is_bound(&self) -> bool {
        self.has_lower_limit || self.has_upper_limit
    }

    pub fn is_fixed(&self) -> bool {
        self.fixed
    }

    pub fn set_value(&mut self, value: f64) {
        self.value = value;
    }

    pub fn set_step_size(&mut self, step_size: f64) {
        self.step_size = step_size;
    }

    /// Set both limits; an inverted pair removes the limits instead
    pub fn set_limits(&mut self, lower: f64, upper: f64) {
        if lower > upper {
            self.remove_limits();
            return;
        }
        self.lower_limit = lower;
        self.upper_limit = upper;
        self.has_lower_limit = true;
        self.has_upper_limit = true;
    }

    /// Set only a lower limit; any upper limit is dropped
    pub fn set_lower_limit(&mut self, lower: f64) {
        self.lower_limit = lower;
        self.upper_limit = 0.0;
        self.has_lower_limit = true;
        self.has_upper_limit = false;
    }

    /// Set only an upper limit; any lower limit is dropped
    pub fn set_upper_limit(&mut self, upper: f64) {
        self.lower_limit = 0.0;
        self.upper_limit = upper;
        self.has_lower_limit = false;
        self.has_upper_limit = true;
    }

    pub fn remove_limits(&mut self) {
        self.lower_limit = 0.0;
        self.upper_limit = 0.0;
        self.has_lower_limit = false;
        self.has_upper_limit = false;
    }

    pub fn fix(&mut self) {
        self.fixed = true;
    }

    pub fn release(&mut self) {
        self.fixed = false;
    }

    /// Clamp a coordinate into this entry's limits
    pub fn clamp(&self, x: f64) -> f64 {
        let mut x = x;
        if self.has_lower_limit && x < self.lower_limit {
            x = self.lower_limit;
        }
        if self.has_upper_limit && x > self.upper_limit {
            x = self.upper_limit;
        }
        x
    }
}

/// One edit of a [`SettingsList`]
#[derive(Debug, Clone, PartialEq)]
pub enum SettingChange {
    /// Add an entry at the end
    Append(ParameterSettings),

    /// Replace the entry at `index` with a new description
    Replace { index: usize, settings: ParameterSettings },

    SetValue { index: usize, value: f64 },

    SetStepSize { index: usize, step_size: f64 },

    SetLimits { index: usize, lower: f64, upper: f64 },

    SetLowerLimit { index: usize, lower: f64 },

    SetUpperLimit { index: usize, upper: f64 },

    RemoveLimits { index: usize },

    Fix { index: usize },

    Release { index: usize },

    /// Drop every entry from `len` onwards
    Truncate { len: usize },
}

/// Ordered parameter settings of an engine
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SettingsList {
    entries: Vec<ParameterSettings>,
}

impl Deref for SettingsList {
    type Target = [ParameterSettings];

    fn deref(&self) -> &Self::Target {
        &self.entries
    }
}

impl SettingsList {
    pub fn new() -> Self {
        Self::default()
    }

    /// Mutable access to one entry
    pub fn get_mut(&mut self, index: usize) -> Option<&mut ParameterSettings> {
        self.entries.get_mut(index)
    }

    pub fn push(&mut self, settings: ParameterSettings) {
        self.entries.push(settings);
    }

    pub fn clear(&mut self) {
        self.entries.clear();
    }

    /// Commit a sequence of edits, in order
    ///
    /// Edits before a failing one stay applied.
    pub fn apply(&mut self, changes: &[SettingChange]) -> Result<()> {
        for change in changes {
            match change {
                SettingChange::Append(settings) => self.entries.push(settings.clone()),
                SettingChange::Replace { index, settings } => {
                    *self.entry(*index)? = settings.clone();
                }
                SettingChange::SetValue { index, value } => self.entry(*index)?.set_value(*value),
                SettingChange::SetStepSize { index, step_size } => {
                    self.entry(*index)?.set_step_size(*step_size)
                }
                SettingChange::SetLimits {
                    index,
                    lower,
                    upper,
                } => self.entry(*index)?.set_limits(*lower, *upper),
                SettingChange::SetLowerLimit { index, lower } => {
                    self.entry(*index)?.set_lower_limit(*lower)
                }
                SettingChange::SetUpperLimit { index, upper } => {
                    self.entry(*index)?.set_upper_limit(*upper)
                }
                SettingChange::RemoveLimits { index } => self.entry(*index)?.remove_limits(),
                SettingChange::Fix { index } => self.entry(*index)?.fix(),
                SettingChange::Release { index } => self.entry(*index)?.release(),
                SettingChange::Truncate { len } => self.entries.truncate(*len),
            }
        }
        Ok(())
    }

    fn entry(&mut self, index: usize) -> Result<&mut ParameterSettings> {
        let len = self.entries.len();
        self.entries.get_mut(index).ok_or_else(|| {
            MinOptError::DimensionMismatch(format!(
                "settings index {} out of range for {} entries",
                index, len
            ))
        })
    }
}

/// Numerical options of a minimizer engine
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MinimizerOptions {
    /// Maximum number of iterations, 0 lets the engine choose. Default: 0
    pub max_iterations: usize,

    /// Maximum number of objective calls, 0 lets the engine choose. Default: 0
    pub max_function_calls: usize,

    /// Convergence tolerance. Default: 0.01
    pub tolerance: f64,

    /// Engine verbosity. Default: 0
    pub print_level: i32,

    /// Speed/accuracy trade-off, 0 (fast) to 2 (careful). Default: 1
    pub strategy: i32,

    /// Objective change defining one standard deviation. Default: 1.0
    pub error_def: f64,
}

impl MinimizerOptions {
    /// Default convergence tolerance
    pub const DEFAULT_TOLERANCE: f64 = 0.01;

    pub fn with_max_iterations(mut self, max_iterations: usize) -> Self {
        self.max_iterations = max_iterations;
        self
    }

    pub fn with_max_function_calls(mut self, max_function_calls: usize) -> Self {
        self.max_function_calls = max_function_calls;
        self
    }

    /// Set the convergence tolerance.
    pub fn with_tolerance(mut self, tolerance: f64) -> Self {
        self.tolerance = tolerance;
        self
    }

    pub fn with_strategy(mut self, strategy: i32) -> Self {
        self.strategy = strategy;
        self
    }

    /// Set the objective change defining one standard deviation
    /// (1 for χ², 0.5 for a negative log-likelihood).
    pub fn with_error_def(mut self, error_def: f64) -> Self {
        self.error_def = error_def;
        self
    }
}

impl Default for MinimizerOptions {
    fn default() -> Self {
        Self {
            max_iterations: 0,
            max_function_calls: 0,
            tolerance: Self::DEFAULT_TOLERANCE,
            print_level: 0,
            strategy: 1,
            error_def: 1.0,
        }
    }
}

/// Complete configuration of a fit: algorithm choice, options and parameters
#[derive(Debug, Clone, PartialEq)]
pub struct FitConfig {
    /// Engine family, e.g. "Minuit2"
    pub minimizer_type: String,

    /// Algorithm within the family, empty for the engine default
    pub algorithm: String,

    pub options: MinimizerOptions,

    params_settings: SettingsList,

    minos_params: Vec<usize>,
}

impl FitConfig {
    pub fn new(minimizer_type: &str) -> Self {
        Self {
            minimizer_type: minimizer_type.to_string(),
            algorithm: String::new(),
            options: MinimizerOptions::default(),
            params_settings: SettingsList::new(),
            minos_params: Vec::new(),
        }
    }

    /// Replace the numerical options
    pub fn with_options(mut self, options: MinimizerOptions) -> Self {
        self.options = options;
        self
    }

    /// Select engine family and algorithm
    pub fn set_minimizer(&mut self, minimizer_type: &str, algorithm: Option<&str>) {
        self.minimizer_type = minimizer_type.to_string();
        self.algorithm = algorithm.unwrap_or_default().to_string();
    }

    pub fn params_settings(&self) -> &SettingsList {
        &self.params_settings
    }

    pub fn params_settings_mut(&mut self) -> &mut SettingsList {
        &mut self.params_settings
    }

    /// Restrict Minos error calculation to these parameter positions
    ///
    /// An empty list means all floating parameters.
    pub fn set_minos_errors(&mut self, indices: Vec<usize>) {
        self.minos_params = indices;
    }

    pub fn minos_params(&self) -> &[usize] {
        &self.minos_params
    }
}
