//! The `calc` workflow shared by the CLI front-end and its tests.
//!
//! ingest -> parameters -> hydration calculation
//!
//! Presentation (printing, plotting, exporting) stays in `app`.

use std::path::PathBuf;

use tracing::{info, warn};

use crate::cli::{CalcArgs, ParamOverrides};
use crate::domain::{HydrationParameter, SolverOptions};
use crate::error::HydrationResult;
use crate::hydration::HydrationCalculator;
use crate::io::ingest::{IngestedSeries, PowerSpec, read_series_csv};
use crate::io::params::load_parameter_file;

/// Resolved inputs of one `odnp calc` run.
#[derive(Debug, Clone)]
pub struct CalcConfig {
    pub enhancements: PathBuf,
    pub t1: PathBuf,
    pub params: Option<PathBuf>,
    pub overrides: ParamOverrides,
    pub power: PowerSpec,
    pub solver: SolverOptions,
}

impl CalcConfig {
    pub fn from_args(args: &CalcArgs) -> Self {
        Self {
            enhancements: args.enhancements.clone(),
            t1: args.t1.clone(),
            params: args.params.clone(),
            overrides: args.overrides.clone(),
            power: args.power.power_spec(),
            solver: args.solver.options(),
        }
    }
}

/// All computed outputs of a single `odnp calc` run.
#[derive(Debug, Clone)]
pub struct RunOutput {
    pub enhancements: IngestedSeries,
    pub t1: IngestedSeries,
    pub calc: HydrationCalculator,
}

/// Parameter file (or defaults) with command-line overrides applied.
pub fn resolve_parameter(params: Option<&PathBuf>, overrides: &ParamOverrides) -> HydrationResult<HydrationParameter> {
    let mut hp = match params {
        Some(path) => load_parameter_file(path)?,
        None => HydrationParameter::default(),
    };
    overrides.apply(&mut hp)?;
    Ok(hp)
}

/// Execute ingest and the hydration calculation.
pub fn run_calc(config: &CalcConfig) -> HydrationResult<RunOutput> {
    let hp = resolve_parameter(config.params.as_ref(), &config.overrides)?;

    let enhancements = read_series_csv(&config.enhancements, "E", &config.power)?;
    let t1 = read_series_csv(&config.t1, "T1", &config.power)?;
    for (label, ingest) in [("E", &enhancements), ("T1", &t1)] {
        if !ingest.row_errors.is_empty() {
            warn!(series = label, rejected = ingest.row_errors.len(), "skipped unparseable rows");
        }
    }
    info!(
        e_points = enhancements.rows_used(),
        t1_points = t1.rows_used(),
        "input series loaded"
    );

    let calc = HydrationCalculator::from_series(
        t1.series.clone(),
        enhancements.series.clone(),
        hp,
        &config.solver,
    )?;

    Ok(RunOutput {
        enhancements,
        t1,
        calc,
    })
}
