//! Command-line parsing for the ODNP hydration calculator.
//!
//! The goal of this module is to keep **argument parsing** separate from the
//! numerics. Dispatch lives in `app`.

use std::path::PathBuf;

use clap::{Args, Parser, Subcommand};

use crate::domain::{HydrationParameter, SmaxModel, SolverOptions, T1InterpMethod};
use crate::error::HydrationResult;
use crate::io::ingest::{PowerSpec, PowerUnit};

/// Top-level CLI.
#[derive(Debug, Parser)]
#[command(name = "odnp", version, about = "ODNP hydration-parameter calculator")]
pub struct Cli {
    /// Increase log verbosity (-v info, -vv debug, -vvv trace). Logs go to stderr.
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    pub verbose: u8,

    #[command(subcommand)]
    pub command: Command,
}

/// CLI subcommands.
#[derive(Debug, Subcommand)]
pub enum Command {
    /// Compute hydration parameters for one experiment.
    Calc(CalcArgs),
    /// Compute hydration parameters for every experiment in a manifest.
    Batch(BatchArgs),
    /// Write a synthetic enhancement/T1 data set generated from the forward model.
    Simulate(SimulateArgs),
}

/// Per-field overrides applied on top of defaults or a parameter file.
#[derive(Debug, Args, Clone, Default)]
pub struct ParamOverrides {
    /// Magnetic field (mT).
    #[arg(long)]
    pub field: Option<f64>,

    /// Spin-label concentration (uM).
    #[arg(long = "slc")]
    pub sl_c: Option<f64>,

    /// Spin-labeled zero-power T1 (s).
    #[arg(long = "t10")]
    pub t10: Option<f64>,

    /// Unlabeled zero-power T1 (s).
    #[arg(long = "t100")]
    pub t100: Option<f64>,

    /// Spin-label saturation model: `tethered` or `free`.
    #[arg(long)]
    pub smax_model: Option<String>,

    /// T1 interpolation model: `linear` or `second_order`.
    #[arg(long = "t1-interp")]
    pub t1_interp_method: Option<String>,

    /// Bulk-water k_sigma reference (1/(s*M)).
    #[arg(long)]
    pub ksig_bulk: Option<f64>,

    /// Bulk-water k_low reference (1/(s*M)).
    #[arg(long)]
    pub k_low_bulk: Option<f64>,

    /// Bulk-water correlation time (ps).
    #[arg(long)]
    pub tcorr_bulk: Option<f64>,
}

impl ParamOverrides {
    /// Model names are checked here so an unknown one is an unsupported-configuration error.
    pub fn apply(&self, hp: &mut HydrationParameter) -> HydrationResult<()> {
        let fields = [
            (self.field, &mut hp.field),
            (self.sl_c, &mut hp.sl_c),
            (self.t10, &mut hp.t10),
            (self.t100, &mut hp.t100),
            (self.ksig_bulk, &mut hp.ksig_bulk),
            (self.k_low_bulk, &mut hp.k_low_bulk),
            (self.tcorr_bulk, &mut hp.tcorr_bulk),
        ];
        for (value, slot) in fields {
            if let Some(v) = value {
                *slot = v;
            }
        }
        if let Some(m) = &self.smax_model {
            hp.smax_model = m.parse::<SmaxModel>()?;
        }
        if let Some(m) = &self.t1_interp_method {
            hp.t1_interp_method = m.parse::<T1InterpMethod>()?;
        }
        Ok(())
    }
}

/// Power column interpretation shared by `calc` and `batch`.
#[derive(Debug, Args, Clone)]
pub struct PowerArgs {
    /// Unit of the `power` column.
    #[arg(long, value_enum, default_value_t = PowerUnit::W)]
    pub power_unit: PowerUnit,

    /// Attenuation (dB) added to dBm readings before conversion.
    #[arg(long, default_value_t = 0.0, allow_negative_numbers = true)]
    pub dbm_offset: f64,
}

impl PowerArgs {
    pub fn power_spec(&self) -> PowerSpec {
        PowerSpec {
            unit: self.power_unit,
            dbm_offset: self.dbm_offset,
        }
    }
}

/// Solver budgets.
#[derive(Debug, Args, Clone)]
pub struct SolverArgs {
    /// Levenberg-Marquardt iteration budget for the saturation fit.
    #[arg(long, default_value_t = 200)]
    pub lm_max_iterations: usize,

    /// Brent iteration budget for the correlation-time solve.
    #[arg(long, default_value_t = 100)]
    pub brent_max_iterations: usize,
}

impl SolverArgs {
    pub fn options(&self) -> SolverOptions {
        let mut opts = SolverOptions::default();
        opts.lm.max_iterations = self.lm_max_iterations;
        opts.brent.max_iterations = self.brent_max_iterations;
        opts
    }
}

#[derive(Debug, Parser, Clone)]
pub struct CalcArgs {
    /// Enhancement CSV (`power,value`).
    #[arg(short = 'e', long, value_name = "CSV")]
    pub enhancements: PathBuf,

    /// T1 CSV (`power,value`, T1 in seconds).
    #[arg(long, value_name = "CSV")]
    pub t1: PathBuf,

    /// Parameter JSON; flags below override individual fields.
    #[arg(long, value_name = "JSON")]
    pub params: Option<PathBuf>,

    #[command(flatten)]
    pub overrides: ParamOverrides,

    #[command(flatten)]
    pub power: PowerArgs,

    #[command(flatten)]
    pub solver: SolverArgs,

    /// Export results (`.csv` for key,value rows, otherwise JSON).
    #[arg(long)]
    pub export: Option<PathBuf>,

    /// Render an ASCII plot in the terminal (enabled by default).
    #[arg(long, default_value_t = true)]
    pub plot: bool,

    /// Disable the terminal plot.
    #[arg(long)]
    pub no_plot: bool,

    /// Plot width (columns).
    #[arg(long, default_value_t = 72)]
    pub width: usize,

    /// Plot height (rows).
    #[arg(long, default_value_t = 20)]
    pub height: usize,
}

#[derive(Debug, Parser, Clone)]
pub struct BatchArgs {
    /// Batch manifest JSON.
    #[arg(value_name = "MANIFEST")]
    pub manifest: PathBuf,

    #[command(flatten)]
    pub solver: SolverArgs,

    /// Worker threads (defaults to the number of CPUs).
    #[arg(long)]
    pub threads: Option<usize>,

    /// Directory for one JSON export per successful experiment.
    #[arg(long, value_name = "DIR")]
    pub export_dir: Option<PathBuf>,
}

#[derive(Debug, Parser, Clone)]
pub struct SimulateArgs {
    /// Output directory for `enhancements.csv`, `t1.csv` and `params.json`.
    #[arg(long, value_name = "DIR", default_value = ".")]
    pub out_dir: PathBuf,

    /// Target k_sigma (1/(s*M)).
    #[arg(long, default_value_t = 95.0)]
    pub k_sigma: f64,

    /// Half-saturation power (W).
    #[arg(long = "p12", default_value_t = 0.5)]
    pub p_12: f64,

    /// Target k_rho (1/(s*M)); sets T10.
    #[arg(long, default_value_t = 353.0)]
    pub k_rho: f64,

    /// Heating drift of the linearized T1 (s/W).
    #[arg(long, default_value_t = 0.3)]
    pub t1_slope: f64,

    /// Highest microwave power (W).
    #[arg(long, default_value_t = 2.0)]
    pub max_power: f64,

    /// Number of enhancement points.
    #[arg(long, default_value_t = 10)]
    pub points: usize,

    /// Number of T1 points.
    #[arg(long, default_value_t = 5)]
    pub t1_points: usize,

    /// Absolute noise standard deviation on E.
    #[arg(long, default_value_t = 0.0)]
    pub e_noise: f64,

    /// Relative noise standard deviation on T1.
    #[arg(long, default_value_t = 0.0)]
    pub t1_noise: f64,

    #[arg(long, default_value_t = 1)]
    pub seed: u64,

    #[command(flatten)]
    pub overrides: ParamOverrides,
}
