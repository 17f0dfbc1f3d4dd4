//! T1(p) relaxation models.
//!
//! Both models turn measured `T1(p)` into a quantity that is (approximately)
//! polynomial in microwave power, and back:
//!
//! - linear (Franck et al., PNMRS 2013, Eq. 39):
//!   `u = 1 / (1/T1 − 1/T10 + 1/T100)` is linear in `p`;
//!   back-transform `T1 = u / (1 + u/T10 − u/T100)`.
//! - second order (Franck & Han, Methods Enzymol. 2019, Eq. 22–23):
//!   the paramagnetic relaxivity
//!   `krp = (1/T1 − 1/(T100 + ΔT1·p) − kHH·C) / C` is quadratic in `p`,
//!   where `kHH = (1/T10 − 1/T100) / C` and `ΔT1 = T1(p_max) − T1(p_min)`;
//!   back-transform `T1 = 1 / (C·krp + 1/(T100 + ΔT1·p) + kHH·C)`.
//!
//! `C` is the spin-label concentration in mol/L.

use crate::error::{HydrationResult, checked_div};

/// Linear-in-power T1 model.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct LinearT1 {
    pub t10: f64,
    pub t100: f64,
}

impl LinearT1 {
    pub fn transform(&self, t1: f64) -> HydrationResult<f64> {
        let rate = 1.0 / t1 - 1.0 / self.t10 + 1.0 / self.t100;
        checked_div(1.0, rate, "linear T1 transform")
    }

    pub fn inverse(&self, u: f64) -> HydrationResult<f64> {
        checked_div(u, 1.0 + u / self.t10 - u / self.t100, "linear T1 back-transform")
    }
}

/// Second-order T1 model with its heating drift `ΔT1`.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct QuadraticT1 {
    pub t100: f64,
    pub spin_molar: f64,
    pub k_hh: f64,
    pub delta_t1: f64,
}

impl QuadraticT1 {
    /// Build from the zero-power constants and a T1 series sorted by ascending power.
    pub fn new(t10: f64, t100: f64, spin_molar: f64, t1_sorted: &[f64]) -> HydrationResult<Self> {
        let k_hh = checked_div(1.0 / t10 - 1.0 / t100, spin_molar, "kHH")?;
        let delta_t1 = match (t1_sorted.first(), t1_sorted.last()) {
            (Some(first), Some(last)) => last - first,
            _ => 0.0,
        };
        Ok(Self {
            t100,
            spin_molar,
            k_hh,
            delta_t1,
        })
    }

    fn drifted_t100(&self, p: f64) -> f64 {
        self.t100 + self.delta_t1 * p
    }

    /// Paramagnetic relaxivity `krp` for a T1 measured at power `p`.
    pub fn transform(&self, t1: f64, p: f64) -> HydrationResult<f64> {
        let drift = checked_div(1.0, self.drifted_t100(p), "drifted T100")?;
        let numer = 1.0 / t1 - drift - self.k_hh * self.spin_molar;
        checked_div(numer, self.spin_molar, "krp")
    }

    /// T1 at power `p` given the fitted relaxivity `krp`.
    pub fn inverse(&self, krp: f64, p: f64) -> HydrationResult<f64> {
        let drift = checked_div(1.0, self.drifted_t100(p), "drifted T100")?;
        let rate = self.spin_molar * krp + drift + self.k_hh * self.spin_molar;
        checked_div(1.0, rate, "second-order T1 back-transform")
    }
}
