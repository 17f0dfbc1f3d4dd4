//! Hydration-parameter calculation.
//!
//! - `calculator`: one experiment, from raw series to `HydrationResults`
//! - `batch`: many independent experiments in parallel

pub mod batch;
pub mod calculator;

pub use batch::*;
pub use calculator::*;
