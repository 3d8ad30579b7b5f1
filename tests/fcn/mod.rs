//! Integration tests for the parameter synchronizer and the objective evaluator

// Settings reconciliation and constant migration
mod synchronize_tests;
