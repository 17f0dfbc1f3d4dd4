//! Bracketed scalar root finding (Brent's method).
//!
//! Combines bisection with secant / inverse-quadratic steps. The bracket must
//! straddle a sign change; every iterate stays inside it, so convergence is
//! guaranteed within `log2((b - a) / xtol)` bisection-equivalent steps.

use serde::{Deserialize, Serialize};

use crate::error::{HydrationError, HydrationResult};

const STAGE: &str = "root solve";

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct BrentOptions {
    pub max_iterations: usize,
    /// Absolute tolerance on the root.
    pub xtol: f64,
    /// Relative tolerance on the root.
    pub rtol: f64,
}

impl Default for BrentOptions {
    fn default() -> Self {
        Self {
            max_iterations: 100,
            xtol: 2e-12,
            rtol: 4.0 * f64::EPSILON,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RootReport {
    pub root: f64,
    pub f_root: f64,
    pub iterations: usize,
}

/// Find `x ∈ [a, b]` with `f(x) = 0`.
pub fn brentq<F>(f: F, a: f64, b: f64, opts: &BrentOptions) -> HydrationResult<RootReport>
where
    F: Fn(f64) -> f64,
{
    let eval = |x: f64| -> HydrationResult<f64> {
        let v = f(x);
        if v.is_finite() {
            Ok(v)
        } else {
            Err(HydrationError::non_convergence(
                STAGE,
                format!("objective is not finite at x = {x}"),
            ))
        }
    };

    let mut xpre = a;
    let mut xcur = b;
    let mut fpre = eval(xpre)?;
    let mut fcur = eval(xcur)?;

    if fpre * fcur > 0.0 {
        return Err(HydrationError::non_convergence(
            STAGE,
            format!("no sign change over [{a}, {b}] (f(a) = {fpre:.6e}, f(b) = {fcur:.6e})"),
        ));
    }
    if fpre == 0.0 {
        return Ok(RootReport {
            root: xpre,
            f_root: 0.0,
            iterations: 0,
        });
    }
    if fcur == 0.0 {
        return Ok(RootReport {
            root: xcur,
            f_root: 0.0,
            iterations: 0,
        });
    }

    let mut xblk = 0.0;
    let mut fblk = 0.0;
    let mut spre = 0.0;
    let mut scur = 0.0;

    for iter in 0..opts.max_iterations {
        if fpre != 0.0 && fcur != 0.0 && (fpre.is_sign_negative() != fcur.is_sign_negative()) {
            xblk = xpre;
            fblk = fpre;
            spre = xcur - xpre;
            scur = spre;
        }
        if fblk.abs() < fcur.abs() {
            xpre = xcur;
            xcur = xblk;
            xblk = xpre;

            fpre = fcur;
            fcur = fblk;
            fblk = fpre;
        }

        let delta = (opts.xtol + opts.rtol * xcur.abs()) / 2.0;
        let sbis = (xblk - xcur) / 2.0;
        if fcur == 0.0 || sbis.abs() < delta {
            return Ok(RootReport {
                root: xcur,
                f_root: fcur,
                iterations: iter,
            });
        }

        if spre.abs() > delta && fcur.abs() < fpre.abs() {
            let stry = if xpre == xblk {
                // secant
                -fcur * (xcur - xpre) / (fcur - fpre)
            } else {
                // inverse quadratic
                let dpre = (fpre - fcur) / (xpre - xcur);
                let dblk = (fblk - fcur) / (xblk - xcur);
                -fcur * (fblk * dblk - fpre * dpre) / (dblk * dpre * (fblk - fpre))
            };

            if 2.0 * stry.abs() < spre.abs().min(3.0 * sbis.abs() - delta) {
                spre = scur;
                scur = stry;
            } else {
                spre = sbis;
                scur = sbis;
            }
        } else {
            spre = sbis;
            scur = sbis;
        }

        xpre = xcur;
        fpre = fcur;
        if scur.abs() > delta {
            xcur += scur;
        } else {
            xcur += if sbis > 0.0 { delta } else { -delta };
        }
        fcur = eval(xcur)?;
    }

    Err(HydrationError::non_convergence(
        STAGE,
        format!(
            "maximum iterations {} reached near x = {xcur}",
            opts.max_iterations
        ),
    ))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ErrorKind;

    #[test]
    fn finds_sqrt_two() {
        let r = brentq(|x| x * x - 2.0, 0.0, 2.0, &BrentOptions::default()).unwrap();
        assert!((r.root - 2f64.sqrt()).abs() < 1e-11);
    }

    #[test]
    fn finds_root_of_decreasing_function_on_wide_bracket() {
        // 1/x - 0.01 has its root at 100
        let r = brentq(|x| 1.0 / x - 0.01, 1.0, 1e5, &BrentOptions::default()).unwrap();
        assert!((r.root - 100.0).abs() < 1e-9, "root {}", r.root);
    }

    #[test]
    fn endpoint_root_returns_immediately() {
        let r = brentq(|x| x - 1.0, 1.0, 3.0, &BrentOptions::default()).unwrap();
        assert_eq!(r.root, 1.0);
        assert_eq!(r.iterations, 0);
    }

    #[test]
    fn missing_sign_change_is_non_convergence() {
        let err = brentq(|x| x * x + 1.0, -1.0, 1.0, &BrentOptions::default()).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::NonConvergence);
        assert!(format!("{err}").contains("no sign change"));
    }

    #[test]
    fn iteration_budget_is_enforced() {
        let opts = BrentOptions {
            max_iterations: 2,
            ..BrentOptions::default()
        };
        let err = brentq(|x| x.powi(3) - 7.0, 0.0, 1e3, &opts).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::NonConvergence);
    }
}
