//! Utility functions and helpers for the minopt-rs library.

pub mod finite_difference;
pub mod format;
pub mod matrix;

// Re-export commonly used utilities
pub use finite_difference::{gradient, hessian};
pub use format::format_significant;
pub use matrix::{calculate_correlation, standard_errors_from_covariance};
