//! Force-free hard-sphere (FFHS) spectral density and the coupling factor.
//!
//! The reduced spectral density is the rational approximant (Barnes et al.,
//! JACS 2017, Eq. 2):
//!
//! ```text
//!         1 + (5√2/8)√z + z/4
//! J(z) = ------------------------------------------------------------------
//!         1 + √(2z) + z + (√2/3) z^1.5 + (16/81) z² + (4√2/81) z^2.5 + z³/81
//! ```
//!
//! evaluated at `z = ω·τ` for the electron-proton difference, sum and proton
//! frequencies. The coupling factor is
//! `ξ(τ) = (6 J_diff − J_sum) / (6 J_diff + 3 J_H + J_sum)`.

use std::f64::consts::SQRT_2;

use crate::domain::HydrationParameter;

/// Electron and proton angular Larmor frequencies in rad/ps.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct LarmorFrequencies {
    pub omega_e: f64,
    pub omega_h: f64,
}

impl LarmorFrequencies {
    /// Frequencies at `field` (mT) for gyromagnetic ratios in 1e6 rad s⁻¹ T⁻¹.
    pub fn new(field_mt: f64, gamma_e: f64, gamma_h: f64) -> Self {
        let tesla = field_mt / 1000.0;
        Self {
            omega_e: gamma_e * 1e-6 * tesla,
            omega_h: gamma_h * 1e-6 * tesla,
        }
    }

    pub fn from_parameter(hp: &HydrationParameter) -> Self {
        Self::new(hp.field, hp.gamma_e, hp.gamma_h)
    }

    /// `ω_e / ω_H`, the ratio converting `S₀/I₀` in the enhancement equation.
    pub fn ratio(&self) -> f64 {
        self.omega_e / self.omega_h
    }
}

/// FFHS reduced spectral density `J(z)` for `z ≥ 0`.
pub fn ffhs_spectral_density(z: f64) -> f64 {
    let sz = z.sqrt();
    let numer = 1.0 + (5.0 * SQRT_2 / 8.0) * sz + z / 4.0;
    let denom = 1.0
        + (2.0 * z).sqrt()
        + z
        + (SQRT_2 / 3.0) * z * sz
        + (16.0 / 81.0) * z * z
        + (4.0 * SQRT_2 / 81.0) * z * z * sz
        + z * z * z / 81.0;
    numer / denom
}

/// Coupling factor predicted for a correlation time `tcorr` (ps).
pub fn coupling_factor(tcorr: f64, freqs: &LarmorFrequencies) -> f64 {
    let j_diff = ffhs_spectral_density((freqs.omega_e - freqs.omega_h) * tcorr);
    let j_sum = ffhs_spectral_density((freqs.omega_e + freqs.omega_h) * tcorr);
    let j_h = ffhs_spectral_density(freqs.omega_h * tcorr);

    (6.0 * j_diff - j_sum) / (6.0 * j_diff + 3.0 * j_h + j_sum)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn x_band() -> LarmorFrequencies {
        LarmorFrequencies::new(348.5, crate::domain::GAMMA_E, crate::domain::GAMMA_H)
    }

    #[test]
    fn spectral_density_limits() {
        assert_eq!(ffhs_spectral_density(0.0), 1.0);
        let mut prev = 1.0;
        for &z in &[1e-3, 0.1, 1.0, 10.0, 100.0, 1e4] {
            let j = ffhs_spectral_density(z);
            assert!(j > 0.0 && j < prev, "J({z}) = {j} should decrease");
            prev = j;
        }
    }

    #[test]
    fn x_band_frequencies() {
        let f = x_band();
        assert!((f.omega_e - 0.061365958).abs() < 1e-8);
        assert!((f.omega_h - 9.3231482e-5).abs() < 1e-11);
        assert!((f.ratio() - 658.2107).abs() < 1e-3);
    }

    #[test]
    fn coupling_factor_is_monotone_over_bracket() {
        let f = x_band();
        let k_fast = coupling_factor(1.0, &f);
        let k_slow = coupling_factor(1e5, &f);
        assert!((k_fast - 0.4793).abs() < 1e-3);
        assert!(k_slow > 0.0 && k_slow < 1e-4);

        let mut prev = f64::INFINITY;
        for i in 0..=50 {
            let t = 10f64.powf(i as f64 / 10.0);
            let k = coupling_factor(t, &f);
            assert!(k < prev);
            prev = k;
        }
    }
}
