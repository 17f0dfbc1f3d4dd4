//! Physical model functions.
//!
//! Models are implemented as small, pure functions so that the fitting code can
//! stay generic.

pub mod saturation;
pub mod spectral;
pub mod t1;

pub use saturation::*;
pub use spectral::*;
pub use t1::*;
