//! Domain types used throughout the pipeline.
//!
//! This module defines:
//!
//! - configuration (`HydrationParameter`, `SmaxModel`, `T1InterpMethod`, `SolverOptions`)
//! - measurement series (`PowerSeries`)
//! - outputs (`HydrationResults`, `HydrationDiagnostics`, `SaturationFit`)

pub mod types;

pub use types::*;
