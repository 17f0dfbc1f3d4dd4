//! Top-level application orchestration.
//!
//! `src/main.rs` is intentionally tiny; this module is the "real main" that:
//! - parses CLI arguments and installs the log subscriber
//! - loads series and parameters
//! - runs the hydration calculation (single or batch)
//! - prints reports/plots
//! - writes optional exports

use std::fs;
use std::path::Path;

use clap::Parser;
use tracing::{Level, info};

use crate::cli::{BatchArgs, CalcArgs, Command, SimulateArgs};
use crate::data::synthetic::{SyntheticConfig, generate, linspace};
use crate::error::{HydrationError, HydrationResult};
use crate::report::InputSources;

pub mod pipeline;

/// Entry point for the `odnp` binary.
pub fn run() -> HydrationResult<()> {
    let cli = crate::cli::Cli::parse();
    init_logging(cli.verbose);

    match cli.command {
        Command::Calc(args) => handle_calc(args),
        Command::Batch(args) => handle_batch(args),
        Command::Simulate(args) => handle_simulate(args),
    }
}

/// Map `-v` repetitions to a level; warnings are always shown.
pub fn log_level(verbose: u8) -> Level {
    match verbose {
        0 => Level::WARN,
        1 => Level::INFO,
        2 => Level::DEBUG,
        _ => Level::TRACE,
    }
}

fn init_logging(verbose: u8) {
    // Logs share the terminal with the report, so they go to stderr.
    let _ = tracing_subscriber::fmt()
        .with_max_level(log_level(verbose))
        .with_target(false)
        .with_writer(std::io::stderr)
        .try_init();
}

fn handle_calc(args: CalcArgs) -> HydrationResult<()> {
    let config = pipeline::CalcConfig::from_args(&args);
    let run = pipeline::run_calc(&config)?;

    let e_label = args.enhancements.display().to_string();
    let t1_label = args.t1.display().to_string();
    let sources = InputSources {
        enhancements: (e_label.as_str(), &run.enhancements),
        t1: (t1_label.as_str(), &run.t1),
    };
    println!("{}", crate::report::format_run_summary(&run.calc, Some(&sources)));

    if args.plot && !args.no_plot {
        let plot = crate::plot::render_saturation_plot(run.calc.diagnostics(), args.width, args.height);
        println!("{plot}");
    }

    if let Some(path) = &args.export {
        crate::io::export::write_results(path, &run.calc)?;
        info!(path = %path.display(), "results exported");
    }

    Ok(())
}

fn handle_batch(args: BatchArgs) -> HydrationResult<()> {
    if let Some(n) = args.threads {
        rayon::ThreadPoolBuilder::new()
            .num_threads(n)
            .build_global()
            .map_err(|e| HydrationError::unsupported(format!("thread pool: {e}")))?;
    }

    let entries = crate::io::params::load_manifest(&args.manifest)?;
    info!(count = entries.len(), "batch manifest loaded");
    let outcomes = crate::hydration::calculate_entries(entries, &args.solver.options());

    if let Some(dir) = &args.export_dir {
        fs::create_dir_all(dir).map_err(|e| HydrationError::io(dir, e))?;
    }

    let mut failed = 0usize;
    for (name, outcome) in &outcomes {
        println!("{}", crate::report::format_batch_line(name, outcome));
        match outcome {
            Ok(calc) => {
                if let Some(dir) = &args.export_dir {
                    let path = dir.join(format!("{}.json", sanitize_file_stem(name)));
                    crate::io::export::write_results(&path, calc)?;
                }
            }
            Err(_) => failed += 1,
        }
    }
    println!("{} experiments, {} failed", outcomes.len(), failed);

    Ok(())
}

fn handle_simulate(args: SimulateArgs) -> HydrationResult<()> {
    let mut cfg = SyntheticConfig {
        k_sigma: args.k_sigma,
        p_12: args.p_12,
        k_rho: args.k_rho,
        t1_slope: args.t1_slope,
        e_powers: linspace(0.0, args.max_power, args.points),
        t1_powers: linspace(0.0, args.max_power, args.t1_points),
        e_noise: args.e_noise,
        t1_noise: args.t1_noise,
        seed: args.seed,
        ..SyntheticConfig::default()
    };
    args.overrides.apply(&mut cfg.parameter)?;
    let data = generate(&cfg)?;

    let dir = args.out_dir.as_path();
    fs::create_dir_all(dir).map_err(|e| HydrationError::io(dir, e))?;
    write_simulation(dir, &data)?;

    println!(
        "Wrote {} enhancement and {} T1 points to {} (T10 = {:.6} s)",
        data.enhancement.len(),
        data.t1.len(),
        dir.display(),
        data.parameter.t10
    );
    Ok(())
}

fn write_simulation(dir: &Path, data: &crate::data::synthetic::SyntheticData) -> HydrationResult<()> {
    crate::io::export::write_series_csv(&dir.join("enhancements.csv"), &data.enhancement)?;
    crate::io::export::write_series_csv(&dir.join("t1.csv"), &data.t1)?;
    crate::io::export::write_parameter_json(&dir.join("params.json"), &data.parameter)
}

/// Experiment names become file names; keep them portable.
fn sanitize_file_stem(name: &str) -> String {
    let stem: String = name
        .chars()
        .map(|c| if c.is_ascii_alphanumeric() || c == '-' || c == '_' { c } else { '_' })
        .collect();
    if stem.is_empty() { "experiment".to_string() } else { stem }
}
