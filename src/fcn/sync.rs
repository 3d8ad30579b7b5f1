//! Reconciling the model's parameters with the engine's settings.
//!
//! [`MinimizerFcn::synchronize`] compares the declared parameter state with
//! the engine's [`ParameterSettings`] and returns the edits needed to bring
//! the engine up to date, together with what changed about constant
//! parameters. It runs in two passes:
//!
//! 1. Migration: constant parameters that have been released move to the
//!    floating list, and changes to constant values are detected.
//! 2. Reconciliation: every entry of the floating list is compared with the
//!    engine setting at the same position and the differences are emitted.

use log::{info, warn};

use crate::engine::{ParameterSettings, SettingChange};
use crate::fcn::{MinimizerFcn, ParamSnapshot};
use crate::objective::{ConstOptChange, EvalErrorMode, Objective};
use crate::parameters::{Bounds, Parameter};

/// Outcome of a synchronization
#[derive(Debug, Clone, Default, PartialEq)]
pub struct SyncReport {
    /// Edits to apply to the engine's settings, in order
    pub changes: Vec<SettingChange>,

    /// A parameter switched between constant and floating
    pub const_set_changed: bool,

    /// A constant parameter changed value
    pub const_values_changed: bool,
}

impl SyncReport {
    /// Whether the engine settings are already up to date
    pub fn is_empty(&self) -> bool {
        self.changes.is_empty()
    }
}

/// Initial step size for a parameter without an error estimate
///
/// Bounded parameters get a tenth of their range, shrunk to half the distance
/// to a nearby limit so the first step stays inside; the upper limit is
/// checked first. If that leaves a zero step (the value sits on a limit) the
/// tenth of the range is used after all. Unbounded parameters get 1.
///
/// # Examples
///
/// ```
/// use minopt_rs::fcn::default_step_size;
/// use minopt_rs::parameters::Bounds;
///
/// let bounds = Bounds::new(0.0, 10.0).unwrap();
/// assert_eq!(default_step_size(5.0, &bounds), 1.0);
/// assert_eq!(default_step_size(9.5, &bounds), 0.25);
/// assert_eq!(default_step_size(10.0, &bounds), 1.0);
/// assert_eq!(default_step_size(3.0, &Bounds::unbounded()), 1.0);
/// ```
pub fn default_step_size(value: f64, bounds: &Bounds) -> f64 {
    let Some(range) = bounds.range() else {
        return 1.0;
    };

    let mut step = 0.1 * range;
    if bounds.max - value < 2.0 * step {
        step = (bounds.max - value) / 2.0;
    } else if value - bounds.min < 2.0 * step {
        step = (value - bounds.min) / 2.0;
    }

    if step == 0.0 {
        step = 0.1 * range;
    }
    step
}

/// Limits a parameter presents to the engine
///
/// Constant parameters are pinned to their value.
fn engine_limits(par: &Parameter) -> (f64, f64) {
    if par.is_constant() {
        return (par.value(), par.value());
    }
    let min = if par.has_min() { par.min() } else { 0.0 };
    let max = if par.has_max() { par.max() } else { 0.0 };
    (min, max)
}

/// Settings entry describing `par` from scratch
fn new_settings(par: &Parameter, step: f64) -> ParameterSettings {
    let (min, max) = engine_limits(par);
    let mut settings = if par.has_min() && par.has_max() {
        ParameterSettings::bounded(par.name(), par.value(), step, min, max)
    } else {
        let mut settings = ParameterSettings::new(par.name(), par.value(), step);
        if par.has_min() {
            settings.set_lower_limit(min);
        } else if par.has_max() {
            settings.set_upper_limit(max);
        }
        settings
    };
    if par.is_constant() {
        settings.fix();
    }
    settings
}

impl MinimizerFcn {
    /// Bring the engine settings in line with the objective's parameters
    ///
    /// `settings` is the engine's current parameter list; it is not modified.
    /// Apply [`SyncReport::changes`] to it to complete the synchronization.
    /// When `opt_const` is set and constant parameters changed, the objective
    /// is told through [`Objective::const_optimize`], with its error logging
    /// switched to collect mode for the duration of the call.
    pub fn synchronize<O: Objective + ?Sized>(
        &mut self,
        settings: &[ParameterSettings],
        objective: &mut O,
        opt_const: bool,
        verbose: bool,
    ) -> SyncReport {
        let mut report = SyncReport::default();

        self.migrate_released_constants(objective, verbose, &mut report);
        self.reconcile_floating(settings, objective, verbose, &mut report);

        if opt_const {
            let previous = objective
                .eval_errors_mut()
                .set_mode(EvalErrorMode::CollectErrors);
            if report.const_set_changed {
                if verbose {
                    info!("set of constant parameters changed, rerunning const optimizer");
                }
                objective.const_optimize(ConstOptChange::ConfigChange);
            } else if report.const_values_changed {
                if verbose {
                    info!("constant parameter values changed, rerunning const optimizer");
                }
                objective.const_optimize(ConstOptChange::ValueChange);
            }
            objective.eval_errors_mut().set_mode(previous);
        }

        self.rebuild_cache(objective.parameters());
        report
    }

    fn migrate_released_constants<O: Objective + ?Sized>(
        &mut self,
        objective: &O,
        verbose: bool,
        report: &mut SyncReport,
    ) {
        let mut index = 0;
        while index < self.const_params.len() {
            let name = self.const_params[index].clone();
            let Some(par) = objective.parameters().get(&name) else {
                warn!("constant parameter {} no longer exists, dropping it", name);
                self.const_params.remove(index);
                continue;
            };

            let snapshot = self
                .init_const
                .iter()
                .find(|s| s.name == name)
                .cloned()
                .unwrap_or_else(|| ParamSnapshot::of(par));

            let mut migrated = false;
            if !par.is_constant() {
                self.const_params.remove(index);
                if !self.float_params.contains(&name) {
                    self.float_params.push(name.clone());
                    self.init_float.push(snapshot.clone());
                }
                report.const_set_changed = true;
                migrated = true;
                if verbose {
                    info!("parameter {} is now floating", name);
                }
            }

            if par.value() != snapshot.value {
                report.const_values_changed = true;
                if verbose {
                    info!(
                        "value of constant parameter {} changed from {} to {}",
                        name,
                        snapshot.value,
                        par.value()
                    );
                }
            }

            if !migrated {
                index += 1;
            }
        }

        let params = objective.parameters();
        self.init_const = self
            .const_params
            .iter()
            .filter_map(|name| params.get(name).map(ParamSnapshot::of))
            .collect();
    }

    fn reconcile_floating<O: Objective + ?Sized>(
        &mut self,
        settings: &[ParameterSettings],
        objective: &O,
        verbose: bool,
        report: &mut SyncReport,
    ) {
        let mut index = 0;
        while index < self.float_params.len() {
            let name = self.float_params[index].clone();
            let Some(par) = objective.parameters().get(&name) else {
                warn!("floating parameter {} no longer exists, skipping it", name);
                self.drop_float(index);
                continue;
            };

            let mut step = 0.0;
            if !par.is_constant() {
                if !par.is_real() {
                    warn!(
                        "parameter {} is floating but not real-valued, skipping it",
                        name
                    );
                    self.drop_float(index);
                    continue;
                }
                step = par.error();
                if step <= 0.0 {
                    step = default_step_size(par.value(), par.bounds());
                    if verbose {
                        warn!(
                            "no initial error estimate available for {}: using {}",
                            name, step
                        );
                    }
                }
            }
            let (min, max) = engine_limits(par);

            let Some(old) = settings.get(index) else {
                report.changes.push(SettingChange::Append(new_settings(par, step)));
                index += 1;
                continue;
            };

            if old.name() != name {
                if verbose {
                    info!(
                        "settings slot {} now describes {} instead of {}",
                        index,
                        name,
                        old.name()
                    );
                }
                report.changes.push(SettingChange::Replace {
                    index,
                    settings: new_settings(par, step),
                });
                index += 1;
                continue;
            }

            let value = par.value();
            if par.is_constant() && !old.is_fixed() {
                if old.value() != value {
                    report.changes.push(SettingChange::SetValue { index, value });
                    if verbose {
                        info!(
                            "value of parameter {} changed from {} to {}",
                            name,
                            old.value(),
                            value
                        );
                    }
                }
                report.changes.push(SettingChange::Fix { index });
                report.const_set_changed = true;
                if verbose {
                    info!("parameter {} is now fixed", name);
                }
            } else if par.is_constant() {
                if old.value() != value {
                    report.changes.push(SettingChange::SetValue { index, value });
                    report.const_values_changed = true;
                    if verbose {
                        info!(
                            "value of fixed parameter {} changed from {} to {}",
                            name,
                            old.value(),
                            value
                        );
                    }
                }
            } else {
                if old.is_fixed() {
                    report.changes.push(SettingChange::Release { index });
                    report.const_set_changed = true;
                    if verbose {
                        info!("parameter {} is now floating", name);
                    }
                }

                // Unset limits read as 0, so compare presence as well
                let limits_changed = old.lower_limit() != min
                    || old.upper_limit() != max
                    || old.has_lower_limit() != par.has_min()
                    || old.has_upper_limit() != par.has_max();
                if old.value() != value || limits_changed || old.step_size() != step {
                    report.changes.push(SettingChange::SetValue { index, value });
                    report.changes.push(SettingChange::SetStepSize {
                        index,
                        step_size: step,
                    });

                    if par.has_min() && par.has_max() {
                        report.changes.push(SettingChange::SetLimits {
                            index,
                            lower: min,
                            upper: max,
                        });
                    } else if par.has_min() {
                        report
                            .changes
                            .push(SettingChange::SetLowerLimit { index, lower: min });
                    } else if par.has_max() {
                        report
                            .changes
                            .push(SettingChange::SetUpperLimit { index, upper: max });
                    } else if old.is_bound() {
                        report.changes.push(SettingChange::RemoveLimits { index });
                    }
                }

                if verbose {
                    if old.value() != value {
                        info!(
                            "value of parameter {} changed from {} to {}",
                            name,
                            old.value(),
                            value
                        );
                    }
                    if limits_changed {
                        info!(
                            "limits of parameter {} changed from [{},{}] to [{},{}]",
                            name,
                            old.lower_limit(),
                            old.upper_limit(),
                            min,
                            max
                        );
                    }
                    // A zero old step means the engine never had an estimate
                    if old.step_size() != step && old.step_size() != 0.0 {
                        info!(
                            "error/step size of parameter {} changed from {} to {}",
                            name,
                            old.step_size(),
                            step
                        );
                    }
                }
            }

            index += 1;
        }

        if settings.len() > self.float_params.len() {
            report.changes.push(SettingChange::Truncate {
                len: self.float_params.len(),
            });
        }
    }

    fn drop_float(&mut self, index: usize) {
        let name = self.float_params.remove(index);
        self.init_float.retain(|s| s.name != name);
    }
}
