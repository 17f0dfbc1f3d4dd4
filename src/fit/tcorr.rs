//! Correlation time from the coupling factor.
//!
//! Inverts the FFHS coupling factor `ξ(τ)` with Brent's method over
//! `τ ∈ [1, 1e5]` ps. `ξ(τ)` decreases monotonically over that bracket, so an
//! observed `ξ` outside `(ξ(1e5), ξ(1))` has no root and is reported as
//! non-convergence.

use tracing::debug;

use crate::error::HydrationResult;
use crate::math::{BrentOptions, brentq};
use crate::models::{LarmorFrequencies, coupling_factor};

const STAGE: &str = "correlation-time solve";

/// Search bracket for the correlation time, ps.
pub const TCORR_BRACKET_PS: (f64, f64) = (1.0, 1e5);

/// Correlation time (ps) whose FFHS coupling factor equals `ksi`.
pub fn get_tcorr(ksi: f64, freqs: &LarmorFrequencies, opts: &BrentOptions) -> HydrationResult<f64> {
    let (lo, hi) = TCORR_BRACKET_PS;
    let report = brentq(|t| coupling_factor(t, freqs) - ksi, lo, hi, opts)
        .map_err(|e| e.in_stage(STAGE))?;
    debug!(ksi, tcorr = report.root, iterations = report.iterations, "correlation time solved");
    Ok(report.root)
}
