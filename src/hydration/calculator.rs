//! The hydration calculation.
//!
//! Pipeline (all on series sorted by ascending power):
//!
//! 1. validate shapes, then the parameter set
//! 2. T1 at every enhancement power from the selected T1 model
//! 3. `ksig_sp = (1 − E) / (C · ω_e/ω_H · T1)`
//! 4. saturation fit for `ksig_smax`, `p_12`
//! 5. `k_sigma`, `k_rho`, `ksi`, `k_low`
//! 6. `tcorr` by root solve, then `dLocal` and the bulk ratios
//!
//! `C` is the spin-label concentration in mol/L. The calculation runs once in
//! [`HydrationCalculator::new`]; the accessors only read stored values.

use tracing::{debug, info};

use crate::domain::{
    HydrationDiagnostics, HydrationParameter, HydrationResults, PowerSeries, SaturationFit,
    SolverOptions,
};
use crate::error::{HydrationError, HydrationResult, checked_div, ensure_finite};
use crate::fit::{T1Fit, fit_ksig_smax, fit_t1, get_tcorr};
use crate::models::{LarmorFrequencies, s_max};

/// Relaxivities derived from the saturation fit.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Relaxivities {
    pub s_max: f64,
    pub k_sigma: f64,
    pub k_rho: f64,
    pub ksi: f64,
    pub k_low: f64,
}

/// `k_sigma`, `k_rho`, `ksi` and `k_low` for a fitted `ksig_smax`.
pub fn derive_relaxivities(hp: &HydrationParameter, ksig_smax: f64) -> HydrationResult<Relaxivities> {
    let c = hp.spin_molar();
    let s_max = s_max(hp.smax_model, hp.sl_c);
    let k_sigma = checked_div(ksig_smax, s_max, "k_sigma (s_max)")?;
    let k_rho = checked_div(1.0 / hp.t10 - 1.0 / hp.t100, c, "k_rho (slC)")?;
    let ksi = checked_div(k_sigma, k_rho, "ksi (k_rho)")?;
    let k_low = ensure_finite((5.0 * k_rho - 7.0 * k_sigma) / 3.0, "k_low")?;
    Ok(Relaxivities {
        s_max,
        k_sigma,
        k_rho,
        ksi,
        k_low,
    })
}

/// Reject empty, mismatched or non-finite series before any numerics run.
pub fn validate_series(t1: &PowerSeries, enhancement: &PowerSeries) -> HydrationResult<()> {
    for (name, series) in [("T1", t1), ("E", enhancement)] {
        if series.power.len() != series.values.len() {
            return Err(HydrationError::input_shape(format!(
                "{name} and {name}_power must have same length ({} vs {})",
                series.values.len(),
                series.power.len()
            )));
        }
        if series.is_empty() {
            return Err(HydrationError::input_shape(format!("{name} series is empty")));
        }
        let finite = series
            .power
            .iter()
            .chain(&series.values)
            .all(|v| v.is_finite());
        if !finite {
            return Err(HydrationError::input_shape(format!(
                "{name} series contains non-finite values"
            )));
        }
    }
    Ok(())
}

/// A completed hydration calculation for one experiment.
#[derive(Debug, Clone)]
pub struct HydrationCalculator {
    parameter: HydrationParameter,
    t1: PowerSeries,
    enhancement: PowerSeries,
    t1_fit: T1Fit,
    results: HydrationResults,
    diagnostics: HydrationDiagnostics,
}

impl HydrationCalculator {
    /// Run the calculation with default solver options.
    pub fn new(
        t1: &[f64],
        t1_power: &[f64],
        e: &[f64],
        e_power: &[f64],
        hp: HydrationParameter,
    ) -> HydrationResult<Self> {
        Self::with_options(t1, t1_power, e, e_power, hp, &SolverOptions::default())
    }

    pub fn with_options(
        t1: &[f64],
        t1_power: &[f64],
        e: &[f64],
        e_power: &[f64],
        hp: HydrationParameter,
        opts: &SolverOptions,
    ) -> HydrationResult<Self> {
        let t1 = PowerSeries::new("T1", t1_power.to_vec(), t1.to_vec())?;
        let enhancement = PowerSeries::new("E", e_power.to_vec(), e.to_vec())?;
        Self::from_series(t1, enhancement, hp, opts)
    }

    pub fn from_series(
        t1: PowerSeries,
        enhancement: PowerSeries,
        hp: HydrationParameter,
        opts: &SolverOptions,
    ) -> HydrationResult<Self> {
        validate_series(&t1, &enhancement)?;
        hp.validate()?;

        let t1 = t1.sorted_by_power();
        let enhancement = enhancement.sorted_by_power();

        let t1_fit = fit_t1(&t1, &enhancement.power, &hp)?;

        let freqs = LarmorFrequencies::from_parameter(&hp);
        let c = hp.spin_molar();
        let scale = c * freqs.ratio();

        let ksig_sp = enhancement
            .values
            .iter()
            .zip(&t1_fit.t1_at_power)
            .map(|(&e, &t1p)| checked_div(1.0 - e, scale * t1p, "ksig_sp"))
            .collect::<HydrationResult<Vec<_>>>()?;
        let ksig_sp_uncorr = enhancement
            .values
            .iter()
            .map(|&e| checked_div(1.0 - e, scale * hp.t10, "ksig_sp_uncorr"))
            .collect::<HydrationResult<Vec<_>>>()?;

        let saturation = fit_ksig_smax(&enhancement.power, &ksig_sp, &opts.lm)?;
        let ksig_sp_fit = fitted_curve(&enhancement.power, &saturation)?;

        let rel = derive_relaxivities(&hp, saturation.ksig_smax)?;
        debug!(
            s_max = rel.s_max,
            k_sigma = rel.k_sigma,
            k_rho = rel.k_rho,
            ksi = rel.ksi,
            k_low = rel.k_low,
            "relaxivities derived"
        );

        let tcorr = get_tcorr(rel.ksi, &freqs, &opts.brent)?;
        let d_local = checked_div(hp.tcorr_bulk, tcorr, "dLocal (tcorr)")? * (hp.d_h2o + hp.d_sl);

        let k_sigma_array = ksig_sp
            .iter()
            .map(|&k| checked_div(k, rel.s_max, "k_sigma_array (s_max)"))
            .collect::<HydrationResult<Vec<_>>>()?;
        let k_sigma_stderr = saturation.ksig_smax_stderr.map(|se| se / rel.s_max);

        let results = HydrationResults {
            k_sigma: rel.k_sigma,
            k_sigma_array,
            ksigma_kbulk_invratio: checked_div(hp.ksig_bulk, rel.k_sigma, "ksigma_kbulk_invratio (k_sigma)")?,
            k_rho: rel.k_rho,
            k_low: rel.k_low,
            klow_klow_bulk_ratio: checked_div(rel.k_low, hp.k_low_bulk, "klow_klow_bulk_ratio (k_low_bulk)")?,
            ksi: rel.ksi,
            tcorr,
            tcorr_tcorr_bulk_ratio: checked_div(tcorr, hp.tcorr_bulk, "tcorr_tcorr_bulk_ratio (tcorr_bulk)")?,
            d_local,
        };

        let diagnostics = HydrationDiagnostics {
            power: enhancement.power.clone(),
            enhancement: enhancement.values.clone(),
            t1_fit: t1_fit.t1_at_power.clone(),
            ksig_sp,
            ksig_sp_fit,
            ksig_sp_uncorr,
            saturation,
            s_max: rel.s_max,
            k_sigma_stderr,
            t1_extrapolated: t1_fit.extrapolated,
        };

        info!(
            k_sigma = results.k_sigma,
            k_rho = results.k_rho,
            ksi = results.ksi,
            tcorr = results.tcorr,
            "hydration parameters computed"
        );

        Ok(Self {
            parameter: hp,
            t1,
            enhancement,
            t1_fit,
            results,
            diagnostics,
        })
    }

    pub fn results(&self) -> &HydrationResults {
        &self.results
    }

    pub fn diagnostics(&self) -> &HydrationDiagnostics {
        &self.diagnostics
    }

    pub fn t1_fit(&self) -> &T1Fit {
        &self.t1_fit
    }

    pub fn parameter(&self) -> &HydrationParameter {
        &self.parameter
    }

    /// T1 series as used by the calculation (sorted by power).
    pub fn t1_series(&self) -> &PowerSeries {
        &self.t1
    }

    /// Enhancement series as used by the calculation (sorted by power).
    pub fn enhancement_series(&self) -> &PowerSeries {
        &self.enhancement
    }

    pub fn into_results(self) -> HydrationResults {
        self.results
    }
}

fn fitted_curve(power: &[f64], fit: &SaturationFit) -> HydrationResult<Vec<f64>> {
    power
        .iter()
        .map(|&p| checked_div(fit.ksig_smax * p, fit.p_12 + p, "ksig_sp_fit (p_12 + P)"))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::data::synthetic::{SyntheticConfig, SyntheticData, generate};
    use crate::domain::{SmaxModel, T1InterpMethod};
    use crate::error::ErrorKind;
    use crate::models::coupling_factor;
    use proptest::prelude::*;

    fn synthetic(smax_model: SmaxModel) -> SyntheticData {
        let mut cfg = SyntheticConfig::default();
        cfg.parameter.smax_model = smax_model;
        generate(&cfg).unwrap()
    }

    fn run(data: &SyntheticData) -> HydrationResult<HydrationCalculator> {
        HydrationCalculator::new(
            &data.t1.values,
            &data.t1.power,
            &data.enhancement.values,
            &data.enhancement.power,
            data.parameter.clone(),
        )
    }

    #[test]
    fn recovers_synthetic_hydration_parameters() {
        let data = synthetic(SmaxModel::Tethered);
        let calc = run(&data).unwrap();
        let r = calc.results();

        assert!((r.k_sigma - 95.0).abs() < 1e-6, "k_sigma {}", r.k_sigma);
        assert!((r.k_rho - 353.0).abs() < 1e-6, "k_rho {}", r.k_rho);
        assert!((r.ksi - 95.0 / 353.0).abs() < 1e-9, "ksi {}", r.ksi);
        assert!((r.k_low - (5.0 * 353.0 - 7.0 * 95.0) / 3.0).abs() < 1e-5);

        let freqs = LarmorFrequencies::from_parameter(calc.parameter());
        assert!((coupling_factor(r.tcorr, &freqs) - r.ksi).abs() < 1e-10);
        assert!(r.tcorr > 50.0 && r.tcorr < 60.0, "tcorr {}", r.tcorr);

        let hp = calc.parameter();
        assert!((r.ksigma_kbulk_invratio - hp.ksig_bulk / r.k_sigma).abs() < 1e-12);
        assert!((r.klow_klow_bulk_ratio - r.k_low / hp.k_low_bulk).abs() < 1e-12);
        assert!((r.tcorr_tcorr_bulk_ratio - r.tcorr / hp.tcorr_bulk).abs() < 1e-12);
        let d_local = hp.tcorr_bulk / r.tcorr * (hp.d_h2o + hp.d_sl);
        assert!((r.d_local - d_local).abs() < 1e-20);

        let d = calc.diagnostics();
        assert_eq!(d.s_max, 1.0);
        assert!((d.saturation.p_12 - 0.5).abs() < 1e-8);
        assert!(!d.t1_extrapolated);
        for (fit, obs) in d.ksig_sp_fit.iter().zip(&d.ksig_sp) {
            assert!((fit - obs).abs() < 1e-8);
        }
    }

    #[test]
    fn free_probe_divides_by_smax() {
        let data = synthetic(SmaxModel::Free);
        let calc = run(&data).unwrap();
        let d = calc.diagnostics();
        let r = calc.results();
        assert!(d.s_max < 1.0);
        assert!((r.k_sigma - d.saturation.ksig_smax / d.s_max).abs() < 1e-9);
        assert!((r.k_sigma - 95.0).abs() < 1e-6, "k_sigma {}", r.k_sigma);
        for (ks, ksp) in r.k_sigma_array.iter().zip(&d.ksig_sp) {
            assert!((ks - ksp / d.s_max).abs() < 1e-9);
        }
    }

    #[test]
    fn second_order_t1_model_is_close() {
        let mut data = synthetic(SmaxModel::Tethered);
        data.parameter.t1_interp_method = T1InterpMethod::SecondOrder;
        let r = run(&data).unwrap().into_results();
        assert!((r.k_sigma - 95.0).abs() < 1.0, "k_sigma {}", r.k_sigma);
        assert!((r.k_rho - 353.0).abs() < 1e-6);
    }

    #[test]
    fn convex_linear_scenario_fails_in_saturation_fit() {
        let hp = HydrationParameter {
            field: 348.5,
            sl_c: 200.0,
            t10: 1.0,
            t100: 2.5,
            smax_model: SmaxModel::Tethered,
            t1_interp_method: T1InterpMethod::Linear,
            ..HydrationParameter::default()
        };
        let rel = derive_relaxivities(&hp, 95.0).unwrap();
        assert_eq!(rel.s_max, 1.0);
        assert!((rel.k_rho - 3000.0).abs() < 1e-9, "k_rho {}", rel.k_rho);

        // ksig_sp is convex in power here, so no saturating curve fits it.
        let err = HydrationCalculator::new(
            &[1.0, 0.9, 0.8],
            &[0.0, 1.0, 2.0],
            &[1.0, 0.5, 0.0],
            &[0.0, 1.0, 2.0],
            hp,
        )
        .unwrap_err();
        assert!(
            matches!(err, HydrationError::NonConvergence { stage: "saturation fit", .. }),
            "unexpected error {err}"
        );
    }

    #[test]
    fn zero_k_rho_is_domain_error() {
        let hp = HydrationParameter {
            t10: 2.5,
            t100: 2.5,
            ..HydrationParameter::default()
        };
        let err = derive_relaxivities(&hp, 95.0).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Domain);
    }

    #[test]
    fn shape_errors_come_before_parameter_errors() {
        let bad_hp = HydrationParameter {
            t100: 0.0,
            ..HydrationParameter::default()
        };
        let err = HydrationCalculator::new(&[1.0, 1.1], &[0.0], &[1.0], &[0.0], bad_hp.clone()).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::InputShape);

        let err = HydrationCalculator::new(&[], &[], &[1.0], &[0.0], bad_hp.clone()).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::InputShape);

        let err = HydrationCalculator::new(&[1.0, f64::NAN], &[0.0, 1.0], &[1.0], &[0.0], bad_hp)
            .unwrap_err();
        assert_eq!(err.kind(), ErrorKind::InputShape);
    }

    #[test]
    fn single_enhancement_point_is_non_convergence() {
        let data = synthetic(SmaxModel::Tethered);
        let err = HydrationCalculator::new(
            &data.t1.values,
            &data.t1.power,
            &data.enhancement.values[..1],
            &data.enhancement.power[..1],
            data.parameter.clone(),
        )
        .unwrap_err();
        assert_eq!(err.kind(), ErrorKind::NonConvergence);
    }

    #[test]
    fn repeated_runs_are_bitwise_identical() {
        let data = synthetic(SmaxModel::Tethered);
        let a = run(&data).unwrap();
        let b = run(&data).unwrap();
        assert_eq!(a.results(), b.results());
        assert_eq!(a.diagnostics(), b.diagnostics());
    }

    #[test]
    fn input_order_does_not_matter() {
        let data = synthetic(SmaxModel::Tethered);
        let sorted = run(&data).unwrap();

        let rev = |v: &[f64]| v.iter().rev().copied().collect::<Vec<_>>();
        let shuffled = HydrationCalculator::new(
            &rev(&data.t1.values),
            &rev(&data.t1.power),
            &rev(&data.enhancement.values),
            &rev(&data.enhancement.power),
            data.parameter.clone(),
        )
        .unwrap();
        assert_eq!(sorted.results(), shuffled.results());
        assert_eq!(shuffled.enhancement_series().power, data.enhancement.power);
    }

    proptest! {
        #![proptest_config(ProptestConfig::with_cases(64))]

        #[test]
        fn mismatched_lengths_are_input_shape(n in 1usize..8, extra in 1usize..4, on_t1 in any::<bool>()) {
            let values = vec![1.0; n];
            let power: Vec<f64> = (0..n + extra).map(|i| i as f64).collect();
            let err = if on_t1 {
                HydrationCalculator::new(&values, &power, &values, &power[..n], HydrationParameter::default())
            } else {
                HydrationCalculator::new(&values, &power[..n], &values, &power, HydrationParameter::default())
            }
            .unwrap_err();
            prop_assert_eq!(err.kind(), ErrorKind::InputShape);
        }

        #[test]
        fn k_sigma_array_matches_enhancement_length(
            n in 3usize..15,
            p_max in 0.5f64..3.0,
            p_12 in 0.1f64..1.0,
            k_sigma in 30.0f64..120.0,
        ) {
            let cfg = SyntheticConfig {
                k_sigma,
                p_12,
                e_powers: crate::data::synthetic::linspace(0.0, p_max, n),
                t1_powers: crate::data::synthetic::linspace(0.0, p_max, 4),
                ..SyntheticConfig::default()
            };
            let data = generate(&cfg).unwrap();
            let calc = run(&data).unwrap();
            prop_assert_eq!(calc.results().k_sigma_array.len(), n);
            prop_assert!((calc.results().k_sigma - k_sigma).abs() < 1e-6 * k_sigma);
        }

        #[test]
        fn any_permutation_gives_identical_results(
            e_perm in Just((0..10).collect::<Vec<usize>>()).prop_shuffle(),
            t1_perm in Just((0..5).collect::<Vec<usize>>()).prop_shuffle(),
        ) {
            let data = synthetic(SmaxModel::Tethered);
            let pick = |v: &[f64], perm: &[usize]| perm.iter().map(|&i| v[i]).collect::<Vec<_>>();
            let permuted = HydrationCalculator::new(
                &pick(&data.t1.values, &t1_perm),
                &pick(&data.t1.power, &t1_perm),
                &pick(&data.enhancement.values, &e_perm),
                &pick(&data.enhancement.power, &e_perm),
                data.parameter.clone(),
            )
            .unwrap();
            let sorted = run(&data).unwrap();
            prop_assert_eq!(sorted.results(), permuted.results());
        }
    }
}
