//! Integration tests for the fit driver

// Driver protocol against a scripted engine
mod driver_tests;

// End-to-end fits with the argmin-backed engine
#[cfg(feature = "simplex")]
mod simplex_engine_tests;
