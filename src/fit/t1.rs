//! T1-power model fit: T1 at every enhancement power.
//!
//! The measured `T1(p)` series is transformed by the selected model, fitted by
//! a polynomial in power, evaluated at the enhancement powers (extrapolating
//! where needed) and transformed back.

use tracing::{debug, warn};

use crate::domain::{HydrationParameter, PowerSeries, T1InterpMethod};
use crate::error::{HydrationError, HydrationResult};
use crate::math::{polyfit, polyval};
use crate::models::{LinearT1, QuadraticT1};

const STAGE: &str = "T1 fit";

/// T1 values at the enhancement powers plus the fitted polynomial.
#[derive(Debug, Clone, PartialEq)]
pub struct T1Fit {
    pub method: T1InterpMethod,
    /// Ascending polynomial coefficients in the transformed space.
    pub coeffs: Vec<f64>,
    pub t1_at_power: Vec<f64>,
    /// Some enhancement power lies outside the measured T1 power range.
    pub extrapolated: bool,
}

/// Fit `t1` (sorted by ascending power) and evaluate at `e_power`.
pub fn fit_t1(t1: &PowerSeries, e_power: &[f64], hp: &HydrationParameter) -> HydrationResult<T1Fit> {
    let method = hp.t1_interp_method;
    let needed = method.degree() + 1;
    let distinct = count_distinct(&t1.power);
    if distinct < needed {
        return Err(HydrationError::input_shape(format!(
            "{method} T1 model needs at least {needed} distinct T1 powers (got {distinct})"
        )));
    }

    let (coeffs, t1_at_power) = match method {
        T1InterpMethod::Linear => {
            let model = LinearT1 {
                t10: hp.t10,
                t100: hp.t100,
            };
            let u = t1
                .values
                .iter()
                .map(|&v| model.transform(v))
                .collect::<HydrationResult<Vec<_>>>()?;
            let coeffs = fit_poly(&t1.power, &u, method.degree())?;
            let fitted = e_power
                .iter()
                .map(|&p| model.inverse(polyval(&coeffs, p)))
                .collect::<HydrationResult<Vec<_>>>()?;
            (coeffs, fitted)
        }
        T1InterpMethod::SecondOrder => {
            let model = QuadraticT1::new(hp.t10, hp.t100, hp.spin_molar(), &t1.values)?;
            let krp = t1
                .power
                .iter()
                .zip(&t1.values)
                .map(|(&p, &v)| model.transform(v, p))
                .collect::<HydrationResult<Vec<_>>>()?;
            let coeffs = fit_poly(&t1.power, &krp, method.degree())?;
            let fitted = e_power
                .iter()
                .map(|&p| model.inverse(polyval(&coeffs, p), p))
                .collect::<HydrationResult<Vec<_>>>()?;
            (coeffs, fitted)
        }
    };

    if let Some(bad) = t1_at_power.iter().find(|v| !(v.is_finite() && **v > 0.0)) {
        return Err(HydrationError::domain(format!(
            "{method} T1 model produced a non-positive T1 ({bad}) at an enhancement power"
        )));
    }

    let extrapolated = match (t1.min_power(), t1.max_power()) {
        (Some(lo), Some(hi)) => e_power.iter().any(|&p| p < lo || p > hi),
        _ => false,
    };
    if extrapolated {
        warn!(
            method = method.as_str(),
            "enhancement powers extend beyond the measured T1 power range; T1 is extrapolated"
        );
    }
    debug!(method = method.as_str(), ?coeffs, "T1 model fitted");

    Ok(T1Fit {
        method,
        coeffs,
        t1_at_power,
        extrapolated,
    })
}

fn fit_poly(x: &[f64], y: &[f64], degree: usize) -> HydrationResult<Vec<f64>> {
    polyfit(x, y, degree).ok_or_else(|| {
        HydrationError::non_convergence(STAGE, format!("degree-{degree} regression is ill-conditioned"))
    })
}

fn count_distinct(values: &[f64]) -> usize {
    let mut v = values.to_vec();
    v.sort_by(f64::total_cmp);
    v.dedup();
    v.len()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ErrorKind;

    fn params(method: T1InterpMethod) -> HydrationParameter {
        HydrationParameter {
            t10: 1.0,
            t100: 2.5,
            sl_c: 200.0,
            t1_interp_method: method,
            ..HydrationParameter::default()
        }
    }

    #[test]
    fn linear_interpolates_exact_model_data() {
        // Generate T1 from an exactly linear transformed series u = 2.5 + 0.3 p.
        let hp = params(T1InterpMethod::Linear);
        let model = LinearT1 { t10: 1.0, t100: 2.5 };
        let power = vec![0.0, 0.5, 1.0, 2.0];
        let t1: Vec<f64> = power
            .iter()
            .map(|&p| model.inverse(2.5 + 0.3 * p).unwrap())
            .collect();
        let series = PowerSeries::new("T1", power, t1).unwrap();

        let e_power = [0.25, 1.5, 3.0];
        let fit = fit_t1(&series, &e_power, &hp).unwrap();
        assert_eq!(fit.t1_at_power.len(), 3);
        assert!((fit.coeffs[0] - 2.5).abs() < 1e-10);
        assert!((fit.coeffs[1] - 0.3).abs() < 1e-10);
        for (&p, &t) in e_power.iter().zip(&fit.t1_at_power) {
            let expected = model.inverse(2.5 + 0.3 * p).unwrap();
            assert!((t - expected).abs() < 1e-10);
        }
        assert!(fit.extrapolated);
    }

    #[test]
    fn second_order_reproduces_three_measured_points() {
        let hp = params(T1InterpMethod::SecondOrder);
        let series = PowerSeries::new("T1", vec![0.0, 1.0, 2.0], vec![1.0, 1.08, 1.2]).unwrap();
        let fit = fit_t1(&series, &[0.0, 1.0, 2.0], &hp).unwrap();
        assert_eq!(fit.coeffs.len(), 3);
        for (a, b) in fit.t1_at_power.iter().zip(&series.values) {
            assert!((a - b).abs() < 1e-9, "{a} vs {b}");
        }
        assert!(!fit.extrapolated);
    }

    #[test]
    fn too_few_distinct_powers_is_input_error() {
        let hp = params(T1InterpMethod::SecondOrder);
        let series = PowerSeries::new("T1", vec![0.0, 1.0, 1.0], vec![1.0, 1.1, 1.1]).unwrap();
        let err = fit_t1(&series, &[0.5], &hp).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::InputShape);
    }
}
