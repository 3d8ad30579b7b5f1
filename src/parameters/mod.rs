//! # Parameter System
//!
//! Named, bounded model parameters as the fit machinery sees them.
//!
//! ## Core Components
//!
//! - [`Parameter`]: a named value with optional bounds, a constant flag, and
//!   the parabolic/asymmetric errors a fit writes back
//! - [`Parameters`]: an insertion-ordered collection owned by a model
//! - [`Bounds`]: lower/upper limits, infinite meaning "no limit"
//!
//! ## Example Usage
//!
//! ```rust
//! use minopt_rs::parameters::{Parameter, Parameters};
//!
//! let mut params = Parameters::new();
//! params.add_param("mean", 1.0).unwrap();
//! params.add_param_with_bounds("sigma", 2.0, 0.0, 10.0).unwrap();
//! params.add(Parameter::discrete("channel", 0)).unwrap();
//!
//! // Hold the width fixed during the next fit
//! params.set_constant("sigma", true).unwrap();
//!
//! assert_eq!(params.floating().len(), 1);
//! assert_eq!(params.constants().len(), 2);
//! ```

pub mod bounds;
pub mod parameter;
pub mod parameters;


// Re-export key types
pub use bounds::{Bounds, BoundsError};
pub use parameter::{Parameter, ParameterError, ParameterKind};
pub use parameters::{Parameters, SerializationError};
