//! # minopt-rs
//!
//! `minopt-rs` connects an objective function with named parameters to a
//! numerical minimizer engine that only understands indexed coordinates.
//!
//! The library provides:
//! - A parameter system with bounds, constant flags and fitted errors
//! - Synchronization of parameter state into engine settings, including
//!   migration between floating and constant parameters
//! - Cached evaluation of the objective with an error wall that steers the
//!   engine away from invalid regions
//! - A driver exposing the MIGRAD / IMPROVE / HESSE / MINOS / MINIMIZE
//!   operations with a status history
//! - An argmin-backed simplex engine (feature `simplex`, on by default)
//!
//! ## Basic Usage
//!
//! ```
//! # #[cfg(feature = "simplex")]
//! # {
//! use minopt_rs::models::GaussianNll;
//! use minopt_rs::{Minimizer, Objective, SimplexEngine};
//!
//! let data = vec![4.8, 5.1, 5.3, 4.9, 5.0, 4.7, 5.2];
//! let nll = GaussianNll::new(data, 4.0, 1.0).unwrap();
//!
//! let mut minimizer = Minimizer::new(nll, SimplexEngine::new());
//! assert_eq!(minimizer.migrad(), 0);
//!
//! let mean = minimizer.objective().parameters().get("mean").unwrap().value();
//! assert!((mean - 5.0).abs() < 1e-2);
//! # }
//! ```

// Public modules
pub mod error;

// Parameter system
pub mod parameters;

// Objective interface and evaluation error log
pub mod objective;

// Engine abstraction and settings
pub mod engine;

// Synchronization and evaluation adapter
pub mod fcn;

// Driver
pub mod minimizer;

// Built-in objectives
pub mod models;

pub mod utils;

// Re-exports for convenience
pub use engine::{FcnFunction, FitResult, MinimizerEngine};
pub use error::{MinOptError, Result};
pub use fcn::{EvalStrategy, FcnConfig, MinimizerFcn};
pub use minimizer::{FitSummary, Minimizer};
pub use objective::{ConstOptChange, Objective};

#[cfg(feature = "simplex")]
pub use engine::SimplexEngine;

/// Version of the library
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
