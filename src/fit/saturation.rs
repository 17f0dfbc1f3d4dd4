//! Saturation-curve fit: `ksig_sp(P) ≈ ksig_smax · P / (p_12 + P)`.
//!
//! Nonlinear least squares (Levenberg–Marquardt, analytic Jacobian) from the
//! initial guess `ksig_smax = 75`, `p_12 = max(P) / 2`. Parameter standard
//! errors come from the covariance `s² (JᵀJ)⁻¹` with `s² = SSE / (n − 2)`.

use nalgebra::{DMatrix, DVector};
use tracing::debug;

use crate::domain::SaturationFit;
use crate::error::{HydrationError, HydrationResult};
use crate::math::{LmOptions, levenberg_marquardt, spd_inverse};
use crate::models::{saturation_curve, saturation_gradient};

const STAGE: &str = "saturation fit";

/// Initial guess for `ksig_smax`, s⁻¹M⁻¹.
pub const INITIAL_KSIG_SMAX: f64 = 75.0;

/// Largest accepted `p_12 / max(P)`. Beyond it the data never bend over and
/// `ksig_smax` is not determined.
pub const MAX_P12_OVER_PMAX: f64 = 1e3;

/// Fit `(ksig_smax, p_12)` to the per-point `k_sigma·s(p)` data.
pub fn fit_ksig_smax(power: &[f64], ksig_sp: &[f64], opts: &LmOptions) -> HydrationResult<SaturationFit> {
    let n = power.len();
    if n != ksig_sp.len() {
        return Err(HydrationError::input_shape(format!(
            "power and ksig_sp must have same length ({n} vs {})",
            ksig_sp.len()
        )));
    }
    if n < 2 {
        return Err(HydrationError::non_convergence(
            STAGE,
            format!("two parameters need at least 2 enhancement points (got {n})"),
        ));
    }
    let p_max = power.iter().copied().fold(f64::NEG_INFINITY, f64::max);
    if !(p_max.is_finite() && p_max > 0.0) {
        return Err(HydrationError::non_convergence(
            STAGE,
            format!("enhancement powers contain no positive value (max = {p_max})"),
        ));
    }

    let residual = |x: &DVector<f64>| {
        DVector::from_iterator(
            n,
            power
                .iter()
                .zip(ksig_sp)
                .map(|(&p, &y)| saturation_curve(p, x[0], x[1]) - y),
        )
    };
    let jacobian = |x: &DVector<f64>| {
        let mut j = DMatrix::zeros(n, 2);
        for (i, &p) in power.iter().enumerate() {
            let (dk, dp) = saturation_gradient(p, x[0], x[1]);
            j[(i, 0)] = dk;
            j[(i, 1)] = dp;
        }
        j
    };

    let x0 = DVector::from_row_slice(&[INITIAL_KSIG_SMAX, p_max / 2.0]);
    let report = levenberg_marquardt(x0, residual, jacobian, opts).map_err(|e| e.in_stage(STAGE))?;

    let ksig_smax = report.x[0];
    let p_12 = report.x[1];
    if !ksig_smax.is_finite() || !p_12.is_finite() {
        return Err(HydrationError::non_convergence(
            STAGE,
            format!("fit returned non-finite parameters (ksig_smax = {ksig_smax}, p_12 = {p_12})"),
        ));
    }
    if p_12 <= 0.0 {
        return Err(HydrationError::non_convergence(
            STAGE,
            format!("fit returned a non-positive half-saturation power p_12 = {p_12}"),
        ));
    }

    if p_12 > MAX_P12_OVER_PMAX * p_max {
        return Err(HydrationError::non_convergence(
            STAGE,
            format!(
                "half-saturation power p_12 = {p_12:.3e} W is far beyond the measured range \
                 (max {p_max} W); the data do not saturate"
            ),
        ));
    }

    let (ksig_smax_stderr, p_12_stderr) = if n > 2 {
        let s2 = report.sse / (n - 2) as f64;
        let jtj = report.jacobian.transpose() * &report.jacobian;
        match spd_inverse(&jtj) {
            Some(inv) => (stderr(s2 * inv[(0, 0)]), stderr(s2 * inv[(1, 1)])),
            None => (None, None),
        }
    } else {
        (None, None)
    };

    debug!(
        ksig_smax,
        p_12,
        sse = report.sse,
        iterations = report.iterations,
        termination = ?report.termination,
        "saturation curve fitted"
    );

    Ok(SaturationFit {
        ksig_smax,
        p_12,
        ksig_smax_stderr,
        p_12_stderr,
        sse: report.sse,
        iterations: report.iterations,
    })
}

fn stderr(variance: f64) -> Option<f64> {
    (variance.is_finite() && variance >= 0.0).then(|| variance.sqrt())
}
