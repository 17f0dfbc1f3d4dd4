//! Numerical primitives: linear and polynomial least squares,
//! Levenberg–Marquardt, and Brent root finding.

pub mod brent;
pub mod lm;
pub mod ols;
pub mod poly;

pub use brent::*;
pub use lm::*;
pub use ols::*;
pub use poly::*;
