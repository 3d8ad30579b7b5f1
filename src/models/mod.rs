//! Built-in objectives for common fitting problems.
//!
//! Both implement [`Objective`](crate::objective::Objective) and react to
//! constant-term notifications by precomputing what no longer varies.

mod gaussian;
mod polynomial;

pub use gaussian::GaussianNll;
pub use polynomial::PolynomialChi2;
