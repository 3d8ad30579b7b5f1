//! Integration tests for the Parameters collection
//!
//! These tests verify that the Parameters collection behaves correctly in various scenarios.

use minopt_rs::parameters::{Parameter, Parameters};

#[test]
fn test_parameters_basic_operations() {
    let mut params = Parameters::new();
    assert_eq!(params.len(), 0);
    assert!(params.is_empty());

    params.add(Parameter::new("amplitude", 10.0)).unwrap();
    params.add_param("center", 5.0).unwrap();
    params.add_param_with_bounds("sigma", 2.0, 0.1, 10.0).unwrap();

    assert_eq!(params.len(), 3);
    assert!(params.contains("sigma"));
    assert_eq!(params.names(), vec!["amplitude", "center", "sigma"]);

    // Duplicate names are rejected
    assert!(params.add_param("center", 1.0).is_err());

    params.get_mut("center").unwrap().set_value(6.0);
    assert_eq!(params.get("center").unwrap().value(), 6.0);

    let removed = params.remove("amplitude").unwrap();
    assert_eq!(removed.value(), 10.0);
    assert_eq!(params.index_of("sigma"), Some(1));
}

#[test]
fn test_toggling_constant_moves_between_partitions() {
    let mut params = Parameters::new();
    params.add_param("a", 1.0).unwrap();
    params.add_param("b", 2.0).unwrap();
    params.add_param("c", 3.0).unwrap();

    params.set_constant("b", true).unwrap();
    assert_eq!(params.floating().len(), 2);
    assert_eq!(params.constants()[0].name(), "b");

    params.set_constant("b", false).unwrap();
    assert!(params.constants().is_empty());
}

#[test]
fn test_reset_restores_initial_values() {
    let mut params = Parameters::new();
    params.add_param("a", 1.0).unwrap();
    params.add_param_with_bounds("b", 2.0, 0.0, 4.0).unwrap();

    params.set_value("a", 7.0).unwrap();
    params.set_value("b", 3.5).unwrap();
    params.reset();

    assert_eq!(params.values(), vec![1.0, 2.0]);
}

#[test]
fn test_save_and_load_file() {
    let mut params = Parameters::new();
    params.add(Parameter::new("mean", 0.3).with_error(0.05)).unwrap();
    params.add_param_with_bounds("sigma", 1.0, 0.0, 5.0).unwrap();
    params.set_constant("sigma", true).unwrap();

    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("params.json");
    params.save_json(&path).unwrap();

    let loaded = Parameters::load_json(&path).unwrap();
    assert_eq!(loaded.names(), params.names());
    assert_eq!(loaded.get("mean").unwrap().stderr(), Some(0.05));
    assert!(loaded.get("sigma").unwrap().is_constant());
    assert_eq!(loaded.get("sigma").unwrap().min(), 0.0);
}
