//! Formatted terminal output.
//!
//! Formatting lives here so the numeric code never builds strings, and output
//! changes stay local to one file.

use crate::error::HydrationError;
use crate::hydration::HydrationCalculator;
use crate::io::ingest::IngestedSeries;
use crate::report::{PointRow, point_rows};

/// Where the two input series came from, for the summary header.
#[derive(Debug, Clone, Copy)]
pub struct InputSources<'a> {
    pub enhancements: (&'a str, &'a IngestedSeries),
    pub t1: (&'a str, &'a IngestedSeries),
}

/// Format the full run summary: inputs, parameters, fit stages and results.
pub fn format_run_summary(calc: &HydrationCalculator, sources: Option<&InputSources<'_>>) -> String {
    let hp = calc.parameter();
    let d = calc.diagnostics();
    let mut out = String::new();

    out.push_str("=== odnp - ODNP hydration parameters ===\n");
    if let Some(src) = sources {
        for (label, (path, ingest)) in [("E", src.enhancements), ("T1", src.t1)] {
            out.push_str(&format!(
                "{label:<3} {path}: rows={} used={} rejected={}\n",
                ingest.rows_read,
                ingest.rows_used(),
                ingest.row_errors.len()
            ));
            for e in ingest.row_errors.iter().take(5) {
                out.push_str(&format!("      line {}: {}\n", e.line, e.message));
            }
        }
    }
    out.push_str(&format!(
        "Field: {:.2} mT | slC: {:.1} uM | T10: {:.4} s | T100: {:.4} s\n",
        hp.field, hp.sl_c, hp.t10, hp.t100
    ));
    out.push_str(&format!(
        "Models: smax={} | T1 interpolation={}\n",
        hp.smax_model, hp.t1_interp_method
    ));

    let t1 = calc.t1_series();
    out.push_str(&format!(
        "Points: E n={} | T1 n={} | power=[{:.4}, {:.4}] W\n",
        d.power.len(),
        t1.len(),
        d.power.first().copied().unwrap_or(f64::NAN),
        d.power.last().copied().unwrap_or(f64::NAN),
    ));

    out.push_str("\nFit stages:\n");
    out.push_str(&format!(
        "- T1 model: coeffs {}{}\n",
        fmt_vec(&calc.t1_fit().coeffs),
        if d.t1_extrapolated { " (extrapolated)" } else { "" }
    ));
    let sat = &d.saturation;
    out.push_str(&format!(
        "- saturation: ksig_smax={} p_12={} W SSE={:.4} iterations={}\n",
        fmt_with_err(sat.ksig_smax, sat.ksig_smax_stderr),
        fmt_with_err(sat.p_12, sat.p_12_stderr),
        sat.sse,
        sat.iterations
    ));
    out.push_str(&format!("- s_max: {:.6}\n", d.s_max));
    out.push('\n');

    out.push_str(&format_results(calc));
    out.push('\n');
    out.push_str(&format_point_table(&point_rows(d)));
    out
}

/// The fixed-key results table.
pub fn format_results(calc: &HydrationCalculator) -> String {
    let r = calc.results();
    let d = calc.diagnostics();
    let mut out = String::new();
    out.push_str(format!("{:<24} {:>14} {:<10}", "result", "value", "unit").trim_end());
    out.push('\n');
    out.push_str(format!("{:-<24} {:-<14} {:-<10}", "", "", "").trim_end());
    out.push('\n');

    for (key, value) in r.scalar_entries() {
        let line = format!("{key:<24} {:>14} {:<10}", fmt_num(value), unit_of(key));
        out.push_str(line.trim_end());
        out.push('\n');
    }
    if let Some(se) = d.k_sigma_stderr {
        let line = format!("{:<24} {:>14} {:<10}", "k_sigma_stderr", fmt_num(se), unit_of("k_sigma"));
        out.push_str(line.trim_end());
        out.push('\n');
    }
    out
}

/// Per-point table of the enhancement series and derived curves.
pub fn format_point_table(rows: &[PointRow]) -> String {
    let mut out = String::new();
    out.push_str(&format!(
        "{:>10} {:>10} {:>10} {:>10} {:>10} {:>10}\n",
        "power_W", "E", "T1_s", "ksig_sp", "fit", "uncorr"
    ));
    out.push_str(&format!(
        "{:->10} {:->10} {:->10} {:->10} {:->10} {:->10}\n",
        "", "", "", "", "", ""
    ));
    for row in rows {
        out.push_str(&format!(
            "{:>10.4} {:>10.4} {:>10.4} {:>10.3} {:>10.3} {:>10.3}\n",
            row.power, row.enhancement, row.t1, row.ksig_sp, row.ksig_sp_fit, row.ksig_sp_uncorr
        ));
    }
    out
}

/// One line per batch experiment.
pub fn format_batch_line(name: &str, outcome: &Result<HydrationCalculator, HydrationError>) -> String {
    match outcome {
        Ok(calc) => {
            let r = calc.results();
            format!(
                "{:<20} ok   k_sigma={:>9} k_rho={:>9} ksi={:.4} tcorr={:.2}ps dLocal={:.3e}",
                truncate(name, 20),
                fmt_num(r.k_sigma),
                fmt_num(r.k_rho),
                r.ksi,
                r.tcorr,
                r.d_local
            )
        }
        Err(err) => format!("{:<20} FAIL {err}", truncate(name, 20)),
    }
}

fn unit_of(key: &str) -> &'static str {
    match key {
        "k_sigma" | "k_rho" | "k_low" => "1/(s*M)",
        "tcorr" => "ps",
        "dLocal" => "m^2/s",
        _ => "",
    }
}

fn fmt_num(v: f64) -> String {
    let a = v.abs();
    if a != 0.0 && !(1e-3..1e6).contains(&a) {
        format!("{v:.4e}")
    } else {
        format!("{v:.4}")
    }
}

fn fmt_with_err(v: f64, se: Option<f64>) -> String {
    match se {
        Some(se) => format!("{v:.4}±{se:.4}"),
        None => format!("{v:.4}"),
    }
}

fn fmt_vec(v: &[f64]) -> String {
    let parts: Vec<String> = v.iter().map(|x| format!("{x:.6}")).collect();
    format!("[{}]", parts.join(", "))
}

fn truncate(s: &str, max: usize) -> String {
    if s.chars().count() <= max {
        return s.to_string();
    }
    let mut out: String = s.chars().take(max.saturating_sub(1)).collect();
    out.push('.');
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::data::synthetic::{SyntheticConfig, generate};

    fn calculator() -> HydrationCalculator {
        let data = generate(&SyntheticConfig::default()).unwrap();
        HydrationCalculator::from_series(data.t1, data.enhancement, data.parameter, &Default::default())
            .unwrap()
    }

    #[test]
    fn results_table_lists_every_key() {
        let calc = calculator();
        let table = format_results(&calc);
        for (key, _) in calc.results().scalar_entries() {
            assert!(table.contains(key), "missing {key}");
        }
        assert!(table.lines().any(|l| l.starts_with("k_sigma ") && l.contains("95.0000")));
        assert!(table.lines().any(|l| l.starts_with("dLocal") && l.contains("e-")));
    }

    #[test]
    fn summary_has_point_table() {
        let calc = calculator();
        let s = format_run_summary(&calc, None);
        assert!(s.starts_with("=== odnp"));
        assert!(s.contains("Models: smax=tethered | T1 interpolation=linear"));
        // Header + rule + one row per enhancement point.
        let table_rows = s.lines().skip_while(|l| !l.contains("power_W")).count();
        assert_eq!(table_rows, 2 + 10);
    }

    #[test]
    fn batch_line_reports_failure() {
        let err: Result<HydrationCalculator, HydrationError> =
            Err(HydrationError::input_shape("E and E_power must have same length"));
        let line = format_batch_line("a-very-long-experiment-name", &err);
        assert!(line.starts_with("a-very-long-experim."));
        assert!(line.contains("FAIL Input shape error"));
    }

    #[test]
    fn number_formatting_switches_to_scientific() {
        assert_eq!(fmt_num(95.0), "95.0000");
        assert_eq!(fmt_num(2.71e-9), "2.7100e-9");
        assert_eq!(fmt_num(0.0), "0.0000");
    }
}
