//! Input/output helpers.
//!
//! - series CSV ingest (`ingest`)
//! - parameter files and batch manifests (`params`)
//! - result exports (JSON/CSV) (`export`)

pub mod export;
pub mod ingest;
pub mod params;

pub use export::*;
pub use ingest::*;
pub use params::*;
