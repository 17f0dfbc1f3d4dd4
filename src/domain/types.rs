//! Shared domain types.
//!
//! These types are intentionally kept lightweight and serializable so they can be:
//!
//! - used in-memory during the hydration calculation
//! - loaded from parameter files and exported to JSON/CSV
//! - handed to the terminal report and plot

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::{HydrationError, HydrationResult};
use crate::math::{BrentOptions, LmOptions};

/// Electron gyromagnetic ratio, 1e6 rad s⁻¹ T⁻¹ (NIST).
pub const GAMMA_E: f64 = 1.76085963023e5;

/// Proton gyromagnetic ratio, 1e6 rad s⁻¹ T⁻¹ (NIST).
pub const GAMMA_H: f64 = 267.52218744;

/// How the spin label samples the microwave field.
///
/// The maximal saturation factor `s_max` depends on it: a tethered label is
/// assumed fully saturable, a free probe is limited by Heisenberg exchange.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case", try_from = "String")]
pub enum SmaxModel {
    Tethered,
    Free,
}

/// Which physical model maps measured T1(p) onto the enhancement powers.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case", try_from = "String")]
pub enum T1InterpMethod {
    /// Linear in power after the `1/(1/T1 - 1/T10 + 1/T100)` transform.
    Linear,
    /// Quadratic fit of the paramagnetic relaxivity `krp(p)`.
    SecondOrder,
}

impl SmaxModel {
    pub fn as_str(self) -> &'static str {
        match self {
            SmaxModel::Tethered => "tethered",
            SmaxModel::Free => "free",
        }
    }
}

impl T1InterpMethod {
    pub fn as_str(self) -> &'static str {
        match self {
            T1InterpMethod::Linear => "linear",
            T1InterpMethod::SecondOrder => "second_order",
        }
    }

    /// Polynomial degree used to fit the transformed T1 series.
    pub fn degree(self) -> usize {
        match self {
            T1InterpMethod::Linear => 1,
            T1InterpMethod::SecondOrder => 2,
        }
    }
}

impl FromStr for SmaxModel {
    type Err = HydrationError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "tethered" => Ok(SmaxModel::Tethered),
            "free" => Ok(SmaxModel::Free),
            other => Err(HydrationError::unsupported(format!(
                "smax_model `{other}` (expected `tethered` or `free`)"
            ))),
        }
    }
}

impl FromStr for T1InterpMethod {
    type Err = HydrationError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "linear" => Ok(T1InterpMethod::Linear),
            "second_order" => Ok(T1InterpMethod::SecondOrder),
            other => Err(HydrationError::unsupported(format!(
                "t1_interp_method `{other}` (expected `linear` or `second_order`)"
            ))),
        }
    }
}

impl TryFrom<String> for SmaxModel {
    type Error = HydrationError;

    fn try_from(s: String) -> Result<Self, Self::Error> {
        s.parse()
    }
}

impl TryFrom<String> for T1InterpMethod {
    type Error = HydrationError;

    fn try_from(s: String) -> Result<Self, Self::Error> {
        s.parse()
    }
}

impl fmt::Display for SmaxModel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl fmt::Display for T1InterpMethod {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Experiment constants for one hydration analysis.
///
/// Units: `field` mT, `sl_c` µM, `t10`/`t100` s, `tcorr_bulk` ps,
/// `d_h2o`/`d_sl` m²/s, bulk relaxivities s⁻¹M⁻¹. Gyromagnetic ratios are in
/// 1e6 rad s⁻¹ T⁻¹.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct HydrationParameter {
    pub field: f64,
    #[serde(rename = "slC")]
    pub sl_c: f64,
    #[serde(rename = "T10")]
    pub t10: f64,
    #[serde(rename = "T100")]
    pub t100: f64,
    pub smax_model: SmaxModel,
    pub t1_interp_method: T1InterpMethod,
    pub ksig_bulk: f64,
    pub k_low_bulk: f64,
    pub tcorr_bulk: f64,
    #[serde(rename = "dH2O")]
    pub d_h2o: f64,
    #[serde(rename = "dSL")]
    pub d_sl: f64,
    pub gamma_e: f64,
    pub gamma_h: f64,
}

impl Default for HydrationParameter {
    fn default() -> Self {
        Self {
            field: 348.5,
            sl_c: 100.0,
            t10: 1.33,
            t100: 2.5,
            smax_model: SmaxModel::Tethered,
            t1_interp_method: T1InterpMethod::Linear,
            ksig_bulk: 95.4,
            k_low_bulk: 366.0,
            tcorr_bulk: 54.0,
            d_h2o: 2.3e-9,
            d_sl: 4.1e-10,
            gamma_e: GAMMA_E,
            gamma_h: GAMMA_H,
        }
    }
}

impl HydrationParameter {
    /// Check the physical invariants every later stage relies on.
    pub fn validate(&self) -> HydrationResult<()> {
        let positive = [
            ("field", self.field),
            ("slC", self.sl_c),
            ("T10", self.t10),
            ("T100", self.t100),
            ("gamma_e", self.gamma_e),
            ("gamma_h", self.gamma_h),
        ];
        for (name, v) in positive {
            if !(v.is_finite() && v > 0.0) {
                return Err(HydrationError::domain(format!(
                    "{name} must be finite and > 0 (got {v})"
                )));
            }
        }

        let finite = [
            ("ksig_bulk", self.ksig_bulk),
            ("k_low_bulk", self.k_low_bulk),
            ("tcorr_bulk", self.tcorr_bulk),
            ("dH2O", self.d_h2o),
            ("dSL", self.d_sl),
        ];
        for (name, v) in finite {
            if !v.is_finite() {
                return Err(HydrationError::domain(format!("{name} must be finite (got {v})")));
            }
        }
        Ok(())
    }

    /// Spin-label concentration in mol/L.
    pub fn spin_molar(&self) -> f64 {
        self.sl_c * 1e-6
    }
}

/// One power-dependent measurement series: `values[i]` was measured at `power[i]` (W).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PowerSeries {
    pub power: Vec<f64>,
    pub values: Vec<f64>,
}

impl PowerSeries {
    /// Build a series, rejecting mismatched lengths.
    pub fn new(name: &str, power: Vec<f64>, values: Vec<f64>) -> HydrationResult<Self> {
        if power.len() != values.len() {
            return Err(HydrationError::input_shape(format!(
                "{name} and {name}_power must have same length ({} vs {})",
                values.len(),
                power.len()
            )));
        }
        Ok(Self { power, values })
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    /// Copy of the series ordered by ascending power.
    ///
    /// Ties are broken by value so the order never depends on input order.
    pub fn sorted_by_power(&self) -> Self {
        let mut pairs: Vec<(f64, f64)> = self
            .power
            .iter()
            .copied()
            .zip(self.values.iter().copied())
            .collect();
        pairs.sort_by(|a, b| a.0.total_cmp(&b.0).then(a.1.total_cmp(&b.1)));
        let (power, values) = pairs.into_iter().unzip();
        Self { power, values }
    }

    pub fn max_power(&self) -> Option<f64> {
        self.power.iter().copied().reduce(f64::max)
    }

    pub fn min_power(&self) -> Option<f64> {
        self.power.iter().copied().reduce(f64::min)
    }
}

/// Iteration budgets and tolerances for the two nonlinear solvers.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SolverOptions {
    pub lm: LmOptions,
    pub brent: BrentOptions,
}

/// Result of the saturation-curve fit `ksig_sp(P) ≈ ksig_smax·P/(p_12 + P)`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SaturationFit {
    pub ksig_smax: f64,
    pub p_12: f64,
    /// Standard error of `ksig_smax` (absent with ≤ 2 points or a singular JᵀJ).
    pub ksig_smax_stderr: Option<f64>,
    pub p_12_stderr: Option<f64>,
    pub sse: f64,
    pub iterations: usize,
}

/// The fixed-key hydration result mapping.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HydrationResults {
    /// Cross relaxivity, s⁻¹M⁻¹.
    pub k_sigma: f64,
    /// Per-enhancement-point `k_sigma·s(p)/s_max`, s⁻¹M⁻¹.
    pub k_sigma_array: Vec<f64>,
    pub ksigma_kbulk_invratio: f64,
    /// Self relaxivity, s⁻¹M⁻¹.
    pub k_rho: f64,
    /// Low-field relaxivity, s⁻¹M⁻¹.
    pub k_low: f64,
    pub klow_klow_bulk_ratio: f64,
    /// Coupling factor.
    pub ksi: f64,
    /// Correlation time, ps.
    pub tcorr: f64,
    pub tcorr_tcorr_bulk_ratio: f64,
    /// Local water diffusivity, m²/s.
    #[serde(rename = "dLocal")]
    pub d_local: f64,
}

impl HydrationResults {
    /// Scalar entries in their canonical key order.
    pub fn scalar_entries(&self) -> [(&'static str, f64); 9] {
        [
            ("k_sigma", self.k_sigma),
            ("ksigma_kbulk_invratio", self.ksigma_kbulk_invratio),
            ("k_rho", self.k_rho),
            ("k_low", self.k_low),
            ("klow_klow_bulk_ratio", self.klow_klow_bulk_ratio),
            ("ksi", self.ksi),
            ("tcorr", self.tcorr),
            ("tcorr_tcorr_bulk_ratio", self.tcorr_tcorr_bulk_ratio),
            ("dLocal", self.d_local),
        ]
    }
}

/// Intermediate curves and fit statistics kept for reporting and plotting.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HydrationDiagnostics {
    /// Enhancement powers (W), ascending.
    pub power: Vec<f64>,
    /// Enhancements, ordered like `power`.
    pub enhancement: Vec<f64>,
    /// T1 evaluated at each enhancement power.
    pub t1_fit: Vec<f64>,
    pub ksig_sp: Vec<f64>,
    /// Corrected model curve at each enhancement power.
    pub ksig_sp_fit: Vec<f64>,
    /// Uncorrected curve using T10 instead of `t1_fit`.
    pub ksig_sp_uncorr: Vec<f64>,
    pub saturation: SaturationFit,
    pub s_max: f64,
    pub k_sigma_stderr: Option<f64>,
    /// True when some enhancement power lies outside the measured T1 power range.
    pub t1_extrapolated: bool,
}
