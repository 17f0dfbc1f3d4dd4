//! Saturation curve `ksig_sp(P) = ksig_smax · P / (p_12 + P)` and the
//! maximal saturation factor.

use crate::domain::SmaxModel;

/// Model value at power `p` (W).
pub fn saturation_curve(p: f64, ksig_smax: f64, p_12: f64) -> f64 {
    ksig_smax * p / (p_12 + p)
}

/// Partial derivatives `(∂/∂ksig_smax, ∂/∂p_12)` at power `p`.
pub fn saturation_gradient(p: f64, ksig_smax: f64, p_12: f64) -> (f64, f64) {
    let denom = p_12 + p;
    (p / denom, -ksig_smax * p / (denom * denom))
}

/// Maximal saturation factor for the given probe model and spin-label concentration (µM).
///
/// A free probe follows `1 − 2 / (3 + 3·C·198.7)` with `C` in mol/L
/// (Türke & Bennati 2011; Hyde, Chien & Freed 1968).
pub fn s_max(model: SmaxModel, sl_c_um: f64) -> f64 {
    match model {
        SmaxModel::Tethered => 1.0,
        SmaxModel::Free => 1.0 - 2.0 / (3.0 + 3.0 * (sl_c_um * 1e-6 * 198.7)),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn half_saturation_at_p12() {
        assert!((saturation_curve(0.4, 90.0, 0.4) - 45.0).abs() < 1e-12);
        assert_eq!(saturation_curve(0.0, 90.0, 0.4), 0.0);
    }

    #[test]
    fn gradient_matches_finite_difference() {
        let (k, p12, p) = (80.0, 0.3, 0.7);
        let (dk, dp) = saturation_gradient(p, k, p12);
        let h = 1e-6;
        let fd_k = (saturation_curve(p, k + h, p12) - saturation_curve(p, k - h, p12)) / (2.0 * h);
        let fd_p = (saturation_curve(p, k, p12 + h) - saturation_curve(p, k, p12 - h)) / (2.0 * h);
        assert!((dk - fd_k).abs() < 1e-6);
        assert!((dp - fd_p).abs() < 1e-5);
    }

    #[test]
    fn smax_models() {
        assert_eq!(s_max(SmaxModel::Tethered, 500.0), 1.0);
        let free = s_max(SmaxModel::Free, 200.0);
        let expected = 1.0 - 2.0 / (3.0 + 3.0 * 200.0 * 1e-6 * 198.7);
        assert_eq!(free, expected);
        assert!(free < 1.0 && free > 0.0);
    }
}
