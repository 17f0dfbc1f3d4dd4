//! `odnp-hydration` library crate.
//!
//! Computes hydration parameters (`k_sigma`, `k_rho`, `ksi`, `tcorr`, local
//! diffusivity) from ODNP enhancement and T1 series. The binary (`odnp`) is a
//! thin wrapper around this library so that:
//!
//! - the numeric core is testable without spawning processes
//! - batch tools and notebooks can call `HydrationCalculator` directly

pub mod app;
pub mod cli;
pub mod data;
pub mod domain;
pub mod error;
pub mod fit;
pub mod hydration;
pub mod io;
pub mod math;
pub mod models;
pub mod plot;
pub mod report;

pub use domain::{HydrationDiagnostics, HydrationParameter, HydrationResults, SmaxModel, T1InterpMethod};
pub use error::{ErrorKind, HydrationError, HydrationResult};
pub use hydration::{Experiment, HydrationCalculator, calculate_batch, calculate_entries};
