//! Polynomial regression and evaluation.
//!
//! Coefficients are stored in ascending order: `c[0] + c[1] x + c[2] x² + ...`.

use nalgebra::{DMatrix, DVector};

use crate::math::solve_least_squares;

/// Least-squares polynomial of the given degree through `(x_i, y_i)`.
///
/// Returns `None` if there are fewer than `degree + 1` points, the inputs
/// differ in length, or the design is too ill-conditioned.
pub fn polyfit(x: &[f64], y: &[f64], degree: usize) -> Option<Vec<f64>> {
    let n = x.len();
    let cols = degree + 1;
    if n != y.len() || n < cols {
        return None;
    }

    let mut design = DMatrix::<f64>::zeros(n, cols);
    for (i, &xi) in x.iter().enumerate() {
        let mut v = 1.0;
        for j in 0..cols {
            design[(i, j)] = v;
            v *= xi;
        }
    }
    let rhs = DVector::from_column_slice(y);

    solve_least_squares(&design, &rhs).map(|beta| beta.iter().copied().collect())
}

/// Evaluate a polynomial with ascending coefficients (Horner).
pub fn polyval(coeffs: &[f64], x: f64) -> f64 {
    coeffs.iter().rev().fold(0.0, |acc, &c| acc * x + c)
}
