//! Linear least squares on small dense systems.
//!
//! Both T1-power models reduce to ordinary least squares on a Vandermonde
//! design (one column per polynomial power). The systems are tiny (2–3
//! columns, a handful of rows) but can be badly conditioned when the power
//! range is narrow, so we solve through the SVD instead of the normal
//! equations.

use nalgebra::{DMatrix, DVector};

/// Solve `min ||x β - y||²` using SVD.
///
/// Returns `None` if the system is too ill-conditioned to solve robustly.
pub fn solve_least_squares(x: &DMatrix<f64>, y: &DVector<f64>) -> Option<DVector<f64>> {
    // Nalgebra's `QR::solve` only handles square systems, the SVD copes with
    // tall designs.
    let svd = x.clone().svd(true, true);

    for &tol in &[1e-12, 1e-10, 1e-8] {
        if let Ok(beta) = svd.solve(y, tol) {
            if beta.iter().all(|v| v.is_finite()) {
                return Some(beta);
            }
        }
    }

    None
}

/// Inverse of a symmetric positive-definite matrix such as `JᵀJ`.
///
/// Returns `None` when the matrix is not positive definite (Cholesky fails).
pub fn spd_inverse(a: &DMatrix<f64>) -> Option<DMatrix<f64>> {
    let inv = a.clone().cholesky()?.inverse();
    inv.iter().all(|v| v.is_finite()).then_some(inv)
}
