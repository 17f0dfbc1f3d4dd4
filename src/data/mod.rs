//! Data sources beyond file ingest.

pub mod synthetic;

pub use synthetic::{SyntheticConfig, SyntheticData};
