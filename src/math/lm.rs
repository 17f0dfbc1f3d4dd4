//! Levenberg–Marquardt nonlinear least squares.
//!
//! Minimizes `½ Σ r_i(x)²` for a residual function with an analytic Jacobian.
//! Damping uses Marquardt's diagonal scaling `(JᵀJ + λ diag(JᵀJ)) δ = -Jᵀr`;
//! `λ` shrinks ×10 on an accepted step and grows ×10 on a rejected one.
//!
//! Termination (any one is success):
//! - `gtol`: `‖Jᵀr‖∞ ≤ gtol · max(1, cost)`
//! - `xtol`: accepted step with `‖δ‖ ≤ xtol (xtol + ‖x‖)`
//! - `ftol`: accepted step whose cost reduction is `≤ ftol · cost`
//!
//! When `λ` grows past `max_lambda` without an acceptable step the cost is
//! usually at its rounding floor. That counts as converged only if the
//! undamped Gauss-Newton step is negligible (`‖δ‖ ≤ 1e-8 (1 + ‖x‖)`).
//! Otherwise, and when `max_iterations` runs out, it is a non-convergence
//! error.

use nalgebra::{DMatrix, DVector};
use serde::{Deserialize, Serialize};
use tracing::trace;

use crate::error::{HydrationError, HydrationResult};

const STAGE: &str = "least-squares fit";
const STALL_STEP_TOL: f64 = 1e-8;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct LmOptions {
    pub max_iterations: usize,
    pub ftol: f64,
    pub xtol: f64,
    pub gtol: f64,
    pub initial_lambda: f64,
    pub max_lambda: f64,
}

impl Default for LmOptions {
    fn default() -> Self {
        Self {
            max_iterations: 200,
            ftol: 1e-12,
            xtol: 1e-12,
            gtol: 1e-12,
            initial_lambda: 1e-3,
            max_lambda: 1e16,
        }
    }
}

/// Which criterion ended a successful run.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LmTermination {
    Gradient,
    Step,
    Reduction,
    Stalled,
}

#[derive(Debug, Clone)]
pub struct LmReport {
    pub x: DVector<f64>,
    pub residuals: DVector<f64>,
    /// Jacobian evaluated at `x`.
    pub jacobian: DMatrix<f64>,
    /// `Σ r_i²` at `x`.
    pub sse: f64,
    pub iterations: usize,
    pub termination: LmTermination,
}

/// Run Levenberg–Marquardt from `x0`.
pub fn levenberg_marquardt<F, J>(
    x0: DVector<f64>,
    residual_fn: F,
    jacobian_fn: J,
    opts: &LmOptions,
) -> HydrationResult<LmReport>
where
    F: Fn(&DVector<f64>) -> DVector<f64>,
    J: Fn(&DVector<f64>) -> DMatrix<f64>,
{
    let mut x = x0;
    let mut r = residual_fn(&x);
    if !all_finite(&r) {
        return Err(HydrationError::non_convergence(
            STAGE,
            "residuals are not finite at the initial guess",
        ));
    }
    let mut cost = 0.5 * r.norm_squared();
    let mut lambda = opts.initial_lambda;

    let finish = |x: DVector<f64>, r: DVector<f64>, iterations, termination| {
        let jacobian = jacobian_fn(&x);
        let sse = r.norm_squared();
        LmReport {
            x,
            residuals: r,
            jacobian,
            sse,
            iterations,
            termination,
        }
    };

    for iter in 0..opts.max_iterations {
        let jac = jacobian_fn(&x);
        let jtj = jac.transpose() * &jac;
        let grad = jac.transpose() * &r;
        let neg_grad = -grad.clone();

        if grad.amax() <= opts.gtol * cost.max(1.0) {
            return Ok(finish(x, r, iter, LmTermination::Gradient));
        }

        // Marquardt scaling with a floor so a zero column does not make the
        // damped system singular.
        let diag_max = jtj.diagonal().amax().max(f64::MIN_POSITIVE);
        let diag = jtj.diagonal().map(|d| d.max(1e-12 * diag_max));

        loop {
            let mut damped = jtj.clone();
            for i in 0..damped.nrows() {
                damped[(i, i)] += lambda * diag[i];
            }

            let step = damped.lu().solve(&neg_grad).filter(all_finite);
            if let Some(delta) = step {
                let x_new = &x + &delta;
                let r_new = residual_fn(&x_new);
                if all_finite(&r_new) {
                    let cost_new = 0.5 * r_new.norm_squared();
                    if cost_new < cost {
                        let reduction = cost - cost_new;
                        let prev_cost = cost;
                        trace!(iter, cost = cost_new, lambda, "lm step accepted");

                        x = x_new;
                        r = r_new;
                        cost = cost_new;
                        lambda = (lambda / 10.0).max(1e-15);

                        if delta.norm() <= opts.xtol * (opts.xtol + x.norm()) {
                            return Ok(finish(x, r, iter + 1, LmTermination::Step));
                        }
                        if reduction <= opts.ftol * prev_cost {
                            return Ok(finish(x, r, iter + 1, LmTermination::Reduction));
                        }
                        break;
                    }
                }
            }

            lambda *= 10.0;
            if lambda > opts.max_lambda {
                let negligible = jtj
                    .clone()
                    .lu()
                    .solve(&neg_grad)
                    .is_some_and(|gn| gn.norm() <= STALL_STEP_TOL * (1.0 + x.norm()));
                if negligible {
                    return Ok(finish(x, r, iter + 1, LmTermination::Stalled));
                }
                return Err(HydrationError::non_convergence(
                    STAGE,
                    format!(
                        "no downhill step at iteration {iter} (cost = {cost:.6e}, damping exhausted)"
                    ),
                ));
            }
        }
    }

    Err(HydrationError::non_convergence(
        STAGE,
        format!(
            "maximum iterations {} reached, cost = {cost:.6e}",
            opts.max_iterations
        ),
    ))
}

fn all_finite(v: &DVector<f64>) -> bool {
    v.iter().all(|x| x.is_finite())
}
