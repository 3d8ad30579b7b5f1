//! Integration tests for MinimizerFcn::synchronize
//!
//! Each test builds an adapter over a `Bowl` objective, synchronizes it
//! against an engine settings list, and checks the emitted edits.

use minopt_rs::engine::{ParameterSettings, SettingChange, SettingsList};
use minopt_rs::fcn::{EvalStrategy, FcnConfig, MinimizerFcn, SyncReport};
use minopt_rs::objective::{ConstOptChange, EvalErrorMode, Objective};
use minopt_rs::parameters::Parameter;

use crate::test_helpers::Bowl;

fn sync(
    fcn: &mut MinimizerFcn,
    settings: &mut SettingsList,
    bowl: &mut Bowl,
    opt_const: bool,
) -> SyncReport {
    let report = fcn.synchronize(settings, bowl, opt_const, false);
    settings.apply(&report.changes).unwrap();
    report
}

fn setup(bowl: &Bowl) -> (MinimizerFcn, SettingsList) {
    let fcn = MinimizerFcn::new(bowl.parameters(), EvalStrategy::Cached, FcnConfig::default());
    (fcn, SettingsList::new())
}

#[test]
fn test_first_sync_appends_every_floating_parameter() {
    let mut bowl = Bowl::new(&[1.0, 2.0], &[0.0, 0.0]);
    bowl.add(Parameter::with_bounds("p2", 9.5, 0.0, 10.0).unwrap());
    bowl.add(Parameter::new("k", 4.0).constant(true));
    bowl.targets.extend([0.0, 0.0]);
    let (mut fcn, mut settings) = setup(&bowl);

    let report = sync(&mut fcn, &mut settings, &mut bowl, false);

    assert_eq!(report.changes.len(), 3);
    assert!(report
        .changes
        .iter()
        .all(|c| matches!(c, SettingChange::Append(_))));
    assert!(!report.const_set_changed);
    assert!(!report.const_values_changed);

    assert_eq!(settings.len(), 3);
    assert_eq!(settings[0].name(), "p0");
    assert_eq!(settings[0].step_size(), 1.0);
    assert!(!settings[0].is_bound());

    // Near the upper limit the step shrinks to half the remaining distance
    assert_eq!(settings[2].step_size(), 0.25);
    assert_eq!(settings[2].lower_limit(), 0.0);
    assert_eq!(settings[2].upper_limit(), 10.0);
}

#[test]
fn test_second_sync_without_changes_is_empty() {
    let mut bowl = Bowl::new(&[1.0, 2.0], &[0.0, 0.0]);
    let (mut fcn, mut settings) = setup(&bowl);
    sync(&mut fcn, &mut settings, &mut bowl, true);

    let report = sync(&mut fcn, &mut settings, &mut bowl, true);

    assert!(report.is_empty());
    assert!(bowl.notifications.is_empty());
}

#[test]
fn test_error_estimate_is_used_as_step() {
    let mut bowl = Bowl::new(&[1.0], &[0.0]);
    bowl.params.get_mut("p0").unwrap().set_stderr(Some(0.03));
    let (mut fcn, mut settings) = setup(&bowl);

    sync(&mut fcn, &mut settings, &mut bowl, false);

    assert_eq!(settings[0].step_size(), 0.03);
}

#[test]
fn test_value_change_is_pushed_to_settings() {
    let mut bowl = Bowl::new(&[1.0, 2.0], &[0.0, 0.0]);
    let (mut fcn, mut settings) = setup(&bowl);
    sync(&mut fcn, &mut settings, &mut bowl, false);

    bowl.params.set_value("p1", 5.0).unwrap();
    let report = sync(&mut fcn, &mut settings, &mut bowl, false);

    assert!(report
        .changes
        .contains(&SettingChange::SetValue { index: 1, value: 5.0 }));
    assert_eq!(settings[1].value(), 5.0);
    assert_eq!(fcn.cached_values(), &[1.0, 5.0]);
}

#[test]
fn test_fixing_a_floating_parameter() {
    let mut bowl = Bowl::new(&[1.0, 2.0], &[0.0, 0.0]);
    let (mut fcn, mut settings) = setup(&bowl);
    sync(&mut fcn, &mut settings, &mut bowl, true);

    bowl.params.set_constant("p0", true).unwrap();
    bowl.params.set_value("p0", 1.5).unwrap();
    let report = sync(&mut fcn, &mut settings, &mut bowl, true);

    assert!(report.const_set_changed);
    assert!(settings[0].is_fixed());
    assert_eq!(settings[0].value(), 1.5);
    // Still a coordinate, the engine just holds it
    assert_eq!(fcn.n_dim(), 2);
    assert_eq!(bowl.notifications, vec![ConstOptChange::ConfigChange]);

    // Changing the fixed value later is a value change only
    bowl.params.set_value("p0", 1.7).unwrap();
    let report = sync(&mut fcn, &mut settings, &mut bowl, true);
    assert!(!report.const_set_changed);
    assert!(report.const_values_changed);
    assert_eq!(settings[0].value(), 1.7);
    assert_eq!(bowl.notifications.last(), Some(&ConstOptChange::ValueChange));
}

#[test]
fn test_refloating_a_fixed_parameter() {
    let mut bowl = Bowl::new(&[1.0, 2.0], &[0.0, 0.0]);
    let (mut fcn, mut settings) = setup(&bowl);
    sync(&mut fcn, &mut settings, &mut bowl, false);
    bowl.params.set_constant("p1", true).unwrap();
    sync(&mut fcn, &mut settings, &mut bowl, false);

    bowl.params.set_constant("p1", false).unwrap();
    let report = sync(&mut fcn, &mut settings, &mut bowl, false);

    assert!(report.const_set_changed);
    assert!(report.changes.contains(&SettingChange::Release { index: 1 }));
    assert!(!settings[1].is_fixed());
}

#[test]
fn test_released_constant_migrates_to_the_end() {
    let mut bowl = Bowl::new(&[1.0], &[0.0]);
    bowl.add(Parameter::new("k", 3.0).constant(true));
    bowl.add(Parameter::new("m", 4.0).constant(true));
    bowl.targets.extend([0.0, 0.0]);
    let (mut fcn, mut settings) = setup(&bowl);
    sync(&mut fcn, &mut settings, &mut bowl, true);
    assert_eq!(fcn.const_names(), &["k".to_string(), "m".to_string()]);

    bowl.params.set_constant("k", false).unwrap();
    let report = sync(&mut fcn, &mut settings, &mut bowl, true);

    assert!(report.const_set_changed);
    assert_eq!(fcn.float_names(), &["p0".to_string(), "k".to_string()]);
    assert_eq!(fcn.const_names(), &["m".to_string()]);
    assert_eq!(settings.len(), 2);
    assert_eq!(settings[1].name(), "k");
    assert_eq!(settings[1].value(), 3.0);
    assert!(!settings[1].is_fixed());
    assert_eq!(fcn.cached_values(), &[1.0, 3.0]);
    assert_eq!(bowl.notifications, vec![ConstOptChange::ConfigChange]);
}

#[test]
fn test_constant_value_change_notifies_objective() {
    let mut bowl = Bowl::new(&[1.0], &[0.0]);
    bowl.add(Parameter::new("k", 3.0).constant(true));
    bowl.targets.push(0.0);
    let (mut fcn, mut settings) = setup(&bowl);
    sync(&mut fcn, &mut settings, &mut bowl, true);

    bowl.params.set_value("k", 3.5).unwrap();
    let report = sync(&mut fcn, &mut settings, &mut bowl, true);

    assert!(report.const_values_changed);
    assert!(!report.const_set_changed);
    assert!(report.is_empty());
    assert_eq!(bowl.notifications, vec![ConstOptChange::ValueChange]);

    // The new value is the reference for the next pass
    let report = sync(&mut fcn, &mut settings, &mut bowl, true);
    assert!(!report.const_values_changed);
}

#[test]
fn test_notifications_need_constant_optimization() {
    let mut bowl = Bowl::new(&[1.0], &[0.0]);
    bowl.add(Parameter::new("k", 3.0).constant(true));
    bowl.targets.push(0.0);
    let (mut fcn, mut settings) = setup(&bowl);
    sync(&mut fcn, &mut settings, &mut bowl, false);

    bowl.params.set_value("k", 3.5).unwrap();
    let report = sync(&mut fcn, &mut settings, &mut bowl, false);

    assert!(report.const_values_changed);
    assert!(bowl.notifications.is_empty());
}

#[test]
fn test_error_mode_is_restored_after_notification() {
    let mut bowl = Bowl::new(&[1.0], &[0.0]);
    bowl.add(Parameter::new("k", 3.0).constant(true));
    bowl.targets.push(0.0);
    bowl.errors.set_mode(EvalErrorMode::CountErrors);
    let (mut fcn, mut settings) = setup(&bowl);

    bowl.params.set_constant("k", false).unwrap();
    sync(&mut fcn, &mut settings, &mut bowl, true);

    assert_eq!(bowl.notifications.len(), 1);
    assert_eq!(bowl.errors.mode(), EvalErrorMode::CountErrors);
}

#[test]
fn test_limit_edits() {
    let mut bowl = Bowl::new(&[1.0], &[0.0]);
    let (mut fcn, mut settings) = setup(&bowl);
    sync(&mut fcn, &mut settings, &mut bowl, false);

    bowl.params.get_mut("p0").unwrap().set_bounds(0.0, 4.0).unwrap();
    let report = sync(&mut fcn, &mut settings, &mut bowl, false);
    assert!(report.changes.contains(&SettingChange::SetLimits {
        index: 0,
        lower: 0.0,
        upper: 4.0
    }));
    assert!(settings[0].has_lower_limit() && settings[0].has_upper_limit());
    assert_eq!(settings[0].step_size(), 0.4);

    bowl.params.get_mut("p0").unwrap().set_bounds(0.0, f64::INFINITY).unwrap();
    sync(&mut fcn, &mut settings, &mut bowl, false);
    assert!(settings[0].has_lower_limit());
    assert!(!settings[0].has_upper_limit());

    bowl.params.get_mut("p0").unwrap().remove_bounds();
    let report = sync(&mut fcn, &mut settings, &mut bowl, false);
    assert!(report.changes.contains(&SettingChange::RemoveLimits { index: 0 }));
    assert!(!settings[0].is_bound());
}

#[test]
fn test_zero_lower_limit_removed_in_verbose_mode() {
    let mut bowl = Bowl::new(&[1.0], &[0.0]);
    bowl.params.get_mut("p0").unwrap().set_bounds(0.0, f64::INFINITY).unwrap();
    let (mut fcn, mut settings) = setup(&bowl);
    let report = fcn.synchronize(&mut settings, &mut bowl, false, true);
    settings.apply(&report.changes).unwrap();
    assert!(settings[0].has_lower_limit());
    assert_eq!(settings[0].lower_limit(), 0.0);

    bowl.params.get_mut("p0").unwrap().remove_bounds();
    let report = fcn.synchronize(&mut settings, &mut bowl, false, true);
    settings.apply(&report.changes).unwrap();

    assert!(report.changes.contains(&SettingChange::RemoveLimits { index: 0 }));
    assert!(!settings[0].is_bound());
}

#[test]
fn test_removed_parameter_truncates_settings() {
    let mut bowl = Bowl::new(&[1.0, 2.0, 3.0], &[0.0, 0.0, 0.0]);
    let (mut fcn, mut settings) = setup(&bowl);
    sync(&mut fcn, &mut settings, &mut bowl, false);

    bowl.params.remove("p1");
    let report = sync(&mut fcn, &mut settings, &mut bowl, false);

    assert_eq!(fcn.float_names(), &["p0".to_string(), "p2".to_string()]);
    assert!(report.changes.contains(&SettingChange::Truncate { len: 2 }));
    assert_eq!(settings.len(), 2);
    // The slot that described p1 now describes p2
    assert_eq!(settings[1].name(), "p2");
    assert_eq!(settings[1].value(), 3.0);
}

#[test]
fn test_floating_discrete_parameter_is_skipped() {
    let mut bowl = Bowl::new(&[1.0], &[0.0]);
    bowl.add(Parameter::discrete("channel", 2).constant(false));
    bowl.targets.push(0.0);
    let (mut fcn, mut settings) = setup(&bowl);

    sync(&mut fcn, &mut settings, &mut bowl, false);

    assert_eq!(fcn.n_dim(), 1);
    assert_eq!(settings.len(), 1);
}

#[test]
fn test_settings_are_not_touched_by_synchronize() {
    let mut bowl = Bowl::new(&[1.0], &[0.0]);
    let (mut fcn, _) = setup(&bowl);
    let settings = SettingsList::new();

    let report = fcn.synchronize(&settings, &mut bowl, false, false);

    assert_eq!(report.changes.len(), 1);
    assert!(settings.is_empty());
    assert_eq!(
        report.changes[0],
        SettingChange::Append(ParameterSettings::new("p0", 1.0, 1.0))
    );
}
