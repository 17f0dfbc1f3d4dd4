//! Synthetic ODNP datasets generated from the forward model.
//!
//! Given a target `k_sigma`, `p_12` and `k_rho`, this produces enhancement and
//! T1 series that the hydration calculation should invert back to those
//! values. Noise is optional and seeded so every dataset is reproducible.

use rand::prelude::*;
use rand::rngs::StdRng;
use rand_distr::Normal;
use serde::{Deserialize, Serialize};

use crate::domain::{HydrationParameter, PowerSeries};
use crate::error::{HydrationError, HydrationResult};
use crate::models::{LarmorFrequencies, LinearT1, s_max, saturation_curve};

/// Forward-model inputs.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SyntheticConfig {
    /// Base constants. `t10` is overwritten so it agrees with `k_rho`.
    pub parameter: HydrationParameter,
    pub k_sigma: f64,
    pub p_12: f64,
    pub k_rho: f64,
    /// Heating drift of the linearized T1, s/W.
    pub t1_slope: f64,
    pub e_powers: Vec<f64>,
    pub t1_powers: Vec<f64>,
    /// Absolute standard deviation added to every enhancement.
    pub e_noise: f64,
    /// Relative standard deviation applied to every T1.
    pub t1_noise: f64,
    pub seed: u64,
}

impl Default for SyntheticConfig {
    fn default() -> Self {
        Self {
            parameter: HydrationParameter {
                sl_c: 200.0,
                ..HydrationParameter::default()
            },
            k_sigma: 95.0,
            p_12: 0.5,
            k_rho: 353.0,
            t1_slope: 0.3,
            e_powers: linspace(0.0, 2.0, 10),
            t1_powers: linspace(0.0, 2.0, 5),
            e_noise: 0.0,
            t1_noise: 0.0,
            seed: 1,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SyntheticData {
    pub parameter: HydrationParameter,
    pub enhancement: PowerSeries,
    pub t1: PowerSeries,
}

/// `n` evenly spaced points on `[start, stop]` (both ends included).
pub fn linspace(start: f64, stop: f64, n: usize) -> Vec<f64> {
    match n {
        0 => Vec::new(),
        1 => vec![start],
        _ => {
            let step = (stop - start) / (n - 1) as f64;
            (0..n).map(|i| start + step * i as f64).collect()
        }
    }
}

pub fn generate(config: &SyntheticConfig) -> HydrationResult<SyntheticData> {
    if config.e_powers.is_empty() || config.t1_powers.is_empty() {
        return Err(HydrationError::input_shape("synthetic power grids must not be empty"));
    }
    if !(config.e_noise >= 0.0 && config.t1_noise >= 0.0) {
        return Err(HydrationError::domain("noise levels must be >= 0"));
    }

    let mut parameter = config.parameter.clone();
    let c = parameter.spin_molar();
    parameter.t10 = 1.0 / (1.0 / parameter.t100 + config.k_rho * c);
    parameter.validate()?;

    let wr = LarmorFrequencies::from_parameter(&parameter).ratio();
    let ksig_smax = config.k_sigma * s_max(parameter.smax_model, parameter.sl_c);
    let model = LinearT1 {
        t10: parameter.t10,
        t100: parameter.t100,
    };
    let t1_at = |p: f64| model.inverse(parameter.t100 + config.t1_slope * p);

    let mut rng = StdRng::seed_from_u64(config.seed);
    let e_dist = Normal::new(0.0, config.e_noise)
        .map_err(|e| HydrationError::domain(format!("enhancement noise: {e}")))?;
    let t1_dist = Normal::new(0.0, config.t1_noise)
        .map_err(|e| HydrationError::domain(format!("T1 noise: {e}")))?;

    let mut enhancement = Vec::with_capacity(config.e_powers.len());
    for &p in &config.e_powers {
        let ksig_sp = saturation_curve(p, ksig_smax, config.p_12);
        let e = 1.0 - ksig_sp * c * wr * t1_at(p)?;
        enhancement.push(e + e_dist.sample(&mut rng));
    }

    let mut t1 = Vec::with_capacity(config.t1_powers.len());
    for &p in &config.t1_powers {
        t1.push(t1_at(p)? * (1.0 + t1_dist.sample(&mut rng)));
    }

    Ok(SyntheticData {
        parameter,
        enhancement: PowerSeries::new("E", config.e_powers.clone(), enhancement)?,
        t1: PowerSeries::new("T1", config.t1_powers.clone(), t1)?,
    })
}
