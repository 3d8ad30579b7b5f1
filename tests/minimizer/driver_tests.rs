//! Integration tests for the Minimizer driver
//!
//! These tests run the driver against `MockEngine`, which records every
//! request, so the protocol around each operation can be checked exactly.

use minopt_rs::engine::MinimizerEngine;
use minopt_rs::objective::{ConstOptChange, EvalErrorMode, Objective};
use minopt_rs::parameters::Parameter;
use minopt_rs::{EvalStrategy, FcnConfig, FitSummary, MinOptError, Minimizer};

use crate::test_helpers::{approx_eq, Bowl, MockEngine};

fn driver() -> Minimizer<Bowl, MockEngine> {
    let bowl = Bowl::new(&[1.0, 2.0], &[0.0, 0.0]);
    Minimizer::new(bowl, MockEngine::new())
}

#[test]
fn test_construction_configures_and_synchronizes() {
    let minimizer = driver();
    let config = minimizer.engine().config();

    assert_eq!(config.params_settings().len(), 2);
    assert_eq!(config.options.max_iterations, 1000);
    assert_eq!(config.options.max_function_calls, 1000);
    assert_eq!(config.options.tolerance, 0.01);
    assert_eq!(config.options.error_def, 1.0);
    assert_eq!(config.options.print_level, 2);
    assert_eq!(minimizer.minimizer_type(), "Mock");
    assert_eq!(minimizer.status(), 0);
    assert!(minimizer.status_history().is_empty());
    assert!(minimizer.engine().calls.is_empty());
}

#[test]
fn test_migrad_records_status_and_copies_result_back() {
    let mut minimizer = driver();
    minimizer.engine_mut().fitted_values = Some(vec![0.5, -0.5]);

    assert_eq!(minimizer.migrad(), 0);

    assert_eq!(minimizer.engine().calls, vec!["fit"]);
    assert_eq!(minimizer.engine().algorithms, vec!["migrad".to_string()]);
    assert_eq!(
        minimizer.status_history(),
        &[("MIGRAD".to_string(), 0)]
    );

    let params = minimizer.objective().parameters();
    assert_eq!(params.get("p0").unwrap().value(), 0.5);
    assert_eq!(params.get("p1").unwrap().value(), -0.5);
    assert_eq!(params.get("p0").unwrap().stderr(), Some(0.1));
    assert_eq!(minimizer.fcn().cached_values(), &[0.5, -0.5]);
}

#[test]
fn test_operation_labels_and_algorithms() {
    let mut minimizer = driver();
    minimizer.engine_mut().status = 3;

    assert_eq!(minimizer.improve(), 3);
    assert_eq!(minimizer.hesse(), 3);
    assert_eq!(minimizer.minimize("Other", Some("simplex")), 3);

    let labels: Vec<&str> = minimizer
        .status_history()
        .iter()
        .map(|(label, _)| label.as_str())
        .collect();
    assert_eq!(labels, vec!["IMPROVE", "HESSE", "MINIMIZE"]);
    assert_eq!(
        minimizer.engine().algorithms,
        vec!["migradimproved".to_string(), "simplex".to_string()]
    );
    assert_eq!(minimizer.engine().config().minimizer_type, "Other");
    // The default family is unchanged by an explicit minimize
    assert_eq!(minimizer.minimizer_type(), "Mock");
}

#[test]
fn test_hesse_and_minos_need_a_minimizer() {
    let mut minimizer = driver();

    assert_eq!(minimizer.hesse(), -1);
    assert_eq!(minimizer.minos(), -1);
    assert_eq!(minimizer.minos_subset(&["p0"]), -1);

    assert!(minimizer.engine().calls.is_empty());
    assert!(minimizer.status_history().is_empty());
    assert_eq!(minimizer.status(), -1);
}

#[test]
fn test_failed_engine_run_reports_minus_one() {
    let mut minimizer = driver();
    minimizer.engine_mut().succeed = false;

    assert_eq!(minimizer.migrad(), -1);
    assert_eq!(minimizer.status_history(), &[("MIGRAD".to_string(), -1)]);
    // Nothing to copy back
    assert_eq!(minimizer.objective().value_of("p0"), 1.0);
}

#[test]
fn test_failed_run_after_removal_keeps_values_by_name() {
    let bowl = Bowl::new(&[1.0, 2.0, 3.0], &[0.0, 0.0, 0.0]);
    let mut minimizer = Minimizer::new(bowl, MockEngine::new());
    minimizer.engine_mut().fitted_values = Some(vec![0.5, 0.6, 0.7]);
    assert_eq!(minimizer.migrad(), 0);

    // The engine still holds the three-parameter result
    minimizer.objective_mut().parameters_mut().remove("p1");
    minimizer.engine_mut().succeed = false;
    assert_eq!(minimizer.migrad(), -1);

    let params = minimizer.objective().parameters();
    assert_eq!(params.get("p0").unwrap().value(), 0.5);
    assert_eq!(params.get("p2").unwrap().value(), 0.7);
    assert_eq!(params.get("p2").unwrap().stderr(), Some(0.1));
    assert_eq!(minimizer.fcn().float_names(), &["p0".to_string(), "p2".to_string()]);
}

#[test]
fn test_hesse_updates_errors() {
    let mut minimizer = driver();
    minimizer.migrad();

    assert_eq!(minimizer.hesse(), 0);

    assert_eq!(minimizer.engine().calls, vec!["fit", "hesse"]);
    let p1 = minimizer.objective().parameters().get("p1").unwrap();
    assert_eq!(p1.stderr(), Some(0.2));
}

#[test]
fn test_minos_computes_all_parameters() {
    let mut minimizer = driver();
    minimizer.migrad();

    assert_eq!(minimizer.minos(), 0);

    assert_eq!(minimizer.engine().minos_requests, vec![Vec::<usize>::new()]);
    let params = minimizer.objective().parameters();
    assert_eq!(params.get("p0").unwrap().asym_errors(), Some((-0.3, 0.4)));
    assert_eq!(params.get("p1").unwrap().asym_errors(), Some((-0.3, 0.4)));
    assert_eq!(minimizer.status_history().last().unwrap().0, "MINOS");
}

#[test]
fn test_minos_subset_resolves_names() {
    let mut minimizer = driver();
    minimizer.migrad();

    assert_eq!(minimizer.minos_subset(&["p1", "missing"]), 0);

    assert_eq!(minimizer.engine().minos_requests, vec![vec![1]]);
    let params = minimizer.objective().parameters();
    assert_eq!(params.get("p0").unwrap().asym_errors(), None);
    assert_eq!(params.get("p1").unwrap().asym_errors(), Some((-0.3, 0.4)));

    // A full run afterwards is not limited to the earlier subset
    minimizer.minos();
    assert_eq!(minimizer.engine().minos_requests[1], Vec::<usize>::new());
}

#[test]
fn test_minos_subset_without_matches_keeps_status() {
    let mut minimizer = driver();
    minimizer.engine_mut().status = 3;
    minimizer.migrad();

    assert_eq!(minimizer.minos_subset(&["missing"]), 3);

    assert_eq!(minimizer.engine().calls, vec!["fit"]);
    assert_eq!(
        minimizer.status_history().last(),
        Some(&("MINOS".to_string(), 3))
    );
}

#[test]
fn test_minos_subset_skips_constant_parameters() {
    let mut minimizer = driver();
    minimizer.migrad();
    minimizer
        .objective_mut()
        .parameters_mut()
        .set_constant("p0", true)
        .unwrap();

    minimizer.minos_subset(&["p0"]);

    assert!(minimizer.engine().minos_requests.is_empty());
}

#[test]
fn test_empty_minos_subset_does_nothing() {
    let mut minimizer = driver();
    minimizer.migrad();

    assert_eq!(minimizer.minos_subset(&[]), 0);
    assert_eq!(minimizer.status_history().len(), 1);
}

#[test]
fn test_edm_requires_a_fit() {
    let mut minimizer = driver();
    assert!(matches!(
        minimizer.edm(),
        Err(MinOptError::NoFitPerformed(_))
    ));

    minimizer.migrad();
    assert!(approx_eq(minimizer.edm().unwrap(), 1e-6, 1e-15));
}

#[test]
fn test_set_print_level_returns_previous() {
    let mut minimizer = driver();

    assert_eq!(minimizer.set_print_level(0), 2);
    assert_eq!(minimizer.engine().config().options.print_level, 1);
    assert_eq!(minimizer.set_print_level(3), 1);
    assert_eq!(minimizer.set_print_level(-1), 4);
    assert_eq!(minimizer.engine().config().options.print_level, 0);
}

#[test]
fn test_option_setters_reach_the_engine() {
    let mut minimizer = driver();
    minimizer.set_strategy(2);
    minimizer.set_eps(1e-4);
    minimizer.set_max_iterations(10);
    minimizer.set_max_function_calls(20);
    minimizer.set_error_level(0.5);

    let options = &minimizer.engine().config().options;
    assert_eq!(options.strategy, 2);
    assert_eq!(options.tolerance, 1e-4);
    assert_eq!(options.max_iterations, 10);
    assert_eq!(options.max_function_calls, 20);
    assert_eq!(options.error_def, 0.5);
}

#[test]
fn test_optimize_const_notifies_once_per_switch() {
    let mut minimizer = driver();

    minimizer.optimize_const(true);
    minimizer.optimize_const(true);
    minimizer.optimize_const(false);

    assert_eq!(
        minimizer.objective().notifications,
        vec![ConstOptChange::Activate, ConstOptChange::Deactivate]
    );
}

#[test]
fn test_released_constant_joins_the_next_fit() {
    let mut bowl = Bowl::new(&[1.0], &[0.0]);
    bowl.add(Parameter::new("k", 2.0).constant(true));
    bowl.targets.push(0.0);
    let mut minimizer = Minimizer::new(bowl, MockEngine::new());
    minimizer.optimize_const(true);
    assert_eq!(minimizer.engine().config().params_settings().len(), 1);

    minimizer
        .objective_mut()
        .parameters_mut()
        .set_constant("k", false)
        .unwrap();
    minimizer.migrad();

    let settings = minimizer.engine().config().params_settings();
    assert_eq!(settings.len(), 2);
    assert_eq!(settings[1].name(), "k");
    assert_eq!(
        minimizer.objective().notifications,
        vec![ConstOptChange::Activate, ConstOptChange::ConfigChange]
    );
}

#[test]
fn test_invalid_evaluations_are_walled_and_counted() {
    let bowl = Bowl::new(&[1.0, 2.0], &[0.0, 0.0]).with_wall(3.0);
    let mut minimizer = Minimizer::new(bowl, MockEngine::new());
    minimizer.set_print_eval_errors(2);

    minimizer.migrad();
    assert_eq!(minimizer.engine().result().unwrap().min_fcn, 5.0);

    minimizer.engine_mut().fitted_values = Some(vec![4.0, 0.0]);
    minimizer.migrad();

    assert_eq!(minimizer.num_invalid_evaluations(), 1);
    assert_eq!(minimizer.engine().result().unwrap().min_fcn, 5.0);
    // Back in print mode between operations
    assert_eq!(
        minimizer.objective().eval_errors().mode(),
        EvalErrorMode::PrintErrors
    );
    assert!(!minimizer.objective().eval_errors().has_errors());
}

#[test]
fn test_error_wall_can_be_switched_off() {
    let bowl = Bowl::new(&[5.0], &[0.0]).with_wall(3.0);
    let mut minimizer = Minimizer::new(bowl, MockEngine::new());
    minimizer.set_eval_error_wall(false);
    minimizer.set_print_eval_errors(-1);

    minimizer.migrad();

    assert_eq!(minimizer.engine().result().unwrap().min_fcn, 25.0);
    assert!(!minimizer.fcn().config().report_errors);
}

#[test]
fn test_generic_strategy_drives_the_same_fit() {
    let bowl = Bowl::new(&[1.0, 2.0], &[0.0, 0.0]);
    let mut minimizer =
        Minimizer::with_strategy(bowl, MockEngine::new(), EvalStrategy::Generic);
    minimizer.engine_mut().fitted_values = Some(vec![0.25, 0.75]);

    minimizer.migrad();

    assert_eq!(minimizer.fcn().strategy(), EvalStrategy::Generic);
    assert_eq!(minimizer.objective().value_of("p1"), 0.75);
}

#[test]
fn test_evaluation_log_through_the_driver() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("fit.log");
    let mut minimizer = driver();
    minimizer.set_log_file(Some(&path)).unwrap();

    minimizer.migrad();

    let text = std::fs::read_to_string(&path).unwrap();
    assert_eq!(text, "1 2 5\n");
}

#[test]
fn test_save_summary() {
    let mut minimizer = driver();
    assert!(minimizer.save("early").is_err());

    minimizer.engine_mut().fitted_values = Some(vec![0.0, 0.5]);
    minimizer.migrad();
    minimizer.hesse();
    let summary = minimizer.save("bowl").unwrap();

    assert_eq!(summary.name, "bowl");
    assert_eq!(summary.status_history.len(), 2);
    assert_eq!(
        summary.initial_floating,
        vec![("p0".to_string(), 1.0), ("p1".to_string(), 2.0)]
    );
    assert_eq!(summary.final_floating[1].value(), 0.5);
    assert!(summary.constants.is_empty());

    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("summary.json");
    summary.save_json(&path).unwrap();
    let loaded: FitSummary =
        serde_json::from_str(&std::fs::read_to_string(&path).unwrap()).unwrap();
    assert_eq!(loaded.status_history, summary.status_history);
    assert_eq!(loaded.final_floating[0].name(), "p0");
}

#[test]
fn test_into_parts_returns_objective_and_engine() {
    let mut minimizer = driver();
    minimizer.migrad();

    let (bowl, engine) = minimizer.into_parts();
    assert_eq!(engine.calls, vec!["fit"]);
    assert!(bowl.calls >= 1);
}

#[test]
fn test_explicit_error_policy() {
    let bowl = Bowl::new(&[5.0], &[0.0]).with_wall(3.0);
    let config = FcnConfig::default()
        .with_error_wall(false)
        .with_report_errors(false);
    let mut minimizer =
        Minimizer::with_config(bowl, MockEngine::new(), EvalStrategy::Cached, config);

    minimizer.migrad();

    assert_eq!(minimizer.engine().result().unwrap().min_fcn, 25.0);
    assert_eq!(minimizer.num_invalid_evaluations(), 1);
}

#[test]
fn test_evaluation_counters_reset() {
    let mut minimizer = driver();
    minimizer.migrad();
    minimizer.hesse();
    assert_eq!(minimizer.eval_count(), 2);

    minimizer.zero_eval_count();
    assert_eq!(minimizer.eval_count(), 0);
    assert_eq!(minimizer.num_invalid_evaluations(), 0);
}
