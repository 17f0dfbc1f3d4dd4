//! Parallel evaluation of independent experiments.

use rayon::prelude::*;
use tracing::warn;

use crate::domain::{HydrationParameter, PowerSeries, SolverOptions};
use crate::error::HydrationResult;
use crate::hydration::HydrationCalculator;

/// One experiment's inputs.
#[derive(Debug, Clone)]
pub struct Experiment {
    pub name: String,
    pub t1: PowerSeries,
    pub enhancement: PowerSeries,
    pub parameter: HydrationParameter,
}

/// Run every experiment on the rayon pool.
///
/// Output order matches `experiments`; a failure is kept with its experiment
/// name and does not affect the others.
pub fn calculate_batch(
    experiments: &[Experiment],
    opts: &SolverOptions,
) -> Vec<(String, HydrationResult<HydrationCalculator>)> {
    experiments
        .par_iter()
        .map(|exp| (exp.name.clone(), run_experiment(exp.clone(), opts)))
        .collect()
}

/// Like [`calculate_batch`], for entries whose loading may already have failed.
///
/// A load failure is reported in place, under the entry's name.
pub fn calculate_entries(
    entries: Vec<(String, HydrationResult<Experiment>)>,
    opts: &SolverOptions,
) -> Vec<(String, HydrationResult<HydrationCalculator>)> {
    entries
        .into_par_iter()
        .map(|(name, entry)| {
            let outcome = match entry {
                Ok(exp) => run_experiment(exp, opts),
                Err(err) => {
                    warn!(experiment = %name, %err, "experiment could not be loaded");
                    Err(err)
                }
            };
            (name, outcome)
        })
        .collect()
}

fn run_experiment(exp: Experiment, opts: &SolverOptions) -> HydrationResult<HydrationCalculator> {
    let outcome = HydrationCalculator::from_series(exp.t1, exp.enhancement, exp.parameter, opts);
    if let Err(err) = &outcome {
        warn!(experiment = %exp.name, %err, "experiment failed");
    }
    outcome
}
