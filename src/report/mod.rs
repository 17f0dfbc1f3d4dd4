//! Reporting utilities: per-point tables and formatted terminal output.

pub mod format;

pub use format::*;

use crate::domain::HydrationDiagnostics;

/// One enhancement point with every per-point quantity of the calculation.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PointRow {
    pub power: f64,
    pub enhancement: f64,
    pub t1: f64,
    pub ksig_sp: f64,
    pub ksig_sp_fit: f64,
    pub ksig_sp_uncorr: f64,
}

impl PointRow {
    pub fn residual(&self) -> f64 {
        self.ksig_sp - self.ksig_sp_fit
    }
}

/// Zip the diagnostic curves into rows ordered by power.
pub fn point_rows(d: &HydrationDiagnostics) -> Vec<PointRow> {
    (0..d.power.len())
        .map(|i| PointRow {
            power: d.power[i],
            enhancement: d.enhancement[i],
            t1: d.t1_fit[i],
            ksig_sp: d.ksig_sp[i],
            ksig_sp_fit: d.ksig_sp_fit[i],
            ksig_sp_uncorr: d.ksig_sp_uncorr[i],
        })
        .collect()
}
