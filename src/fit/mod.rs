//! Fitting stages of the hydration pipeline.
//!
//! Responsibilities:
//!
//! - T1(p) model fit and evaluation at the enhancement powers
//! - nonlinear saturation-curve fit for `ksig_smax` and `p_12`
//! - root solve for the correlation time

pub mod saturation;
pub mod t1;
pub mod tcorr;

pub use saturation::*;
pub use t1::*;
pub use tcorr::*;
