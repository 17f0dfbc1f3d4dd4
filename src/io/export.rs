//! Export hydration results.
//!
//! - JSON: tool metadata, parameters, results and diagnostics
//! - CSV: flat `key,value` rows, easy to paste into a spreadsheet
//!
//! The format is picked from the file extension (`.csv` → CSV, anything else → JSON).
//! Series and parameter writers produce files the ingest side reads back.

use std::fs::File;
use std::io::{BufWriter, Write};
use std::path::Path;

use chrono::{DateTime, Utc};
use serde::Serialize;

use crate::domain::{HydrationDiagnostics, HydrationParameter, HydrationResults, PowerSeries};
use crate::error::{HydrationError, HydrationResult};
use crate::hydration::HydrationCalculator;

/// Schema of the JSON export.
#[derive(Debug, Serialize)]
pub struct ResultsFile<'a> {
    pub tool: &'static str,
    pub version: &'static str,
    pub generated_at: DateTime<Utc>,
    pub parameter: &'a HydrationParameter,
    pub results: &'a HydrationResults,
    pub diagnostics: &'a HydrationDiagnostics,
}

impl<'a> ResultsFile<'a> {
    pub fn new(calc: &'a HydrationCalculator, generated_at: DateTime<Utc>) -> Self {
        Self {
            tool: "odnp",
            version: env!("CARGO_PKG_VERSION"),
            generated_at,
            parameter: calc.parameter(),
            results: calc.results(),
            diagnostics: calc.diagnostics(),
        }
    }
}

/// Write results to `path`, choosing CSV or JSON by extension.
pub fn write_results(path: &Path, calc: &HydrationCalculator) -> HydrationResult<()> {
    let file = File::create(path).map_err(|e| HydrationError::io(path, e))?;
    let mut out = BufWriter::new(file);

    let is_csv = path
        .extension()
        .and_then(|e| e.to_str())
        .is_some_and(|e| e.eq_ignore_ascii_case("csv"));
    if is_csv {
        write_results_csv(&mut out, calc)?;
    } else {
        write_results_json(&mut out, calc, Utc::now())?;
    }
    out.flush().map_err(|e| HydrationError::io(path, e))
}

pub fn write_results_json<W: Write>(
    writer: W,
    calc: &HydrationCalculator,
    generated_at: DateTime<Utc>,
) -> HydrationResult<()> {
    serde_json::to_writer_pretty(writer, &ResultsFile::new(calc, generated_at))
        .map_err(|e| HydrationError::parse(format!("failed to serialize results JSON: {e}")))
}

pub fn write_results_csv<W: Write>(writer: W, calc: &HydrationCalculator) -> HydrationResult<()> {
    let mut w = csv::Writer::from_writer(writer);
    let csv_err = |e: csv::Error| HydrationError::parse(format!("failed to write results CSV: {e}"));

    w.write_record(["key", "value"]).map_err(csv_err)?;
    let results = calc.results();
    for (key, value) in results.scalar_entries() {
        w.write_record([key.to_string(), format!("{value:.10e}")])
            .map_err(csv_err)?;
    }
    for (i, v) in results.k_sigma_array.iter().enumerate() {
        w.write_record([format!("k_sigma_array[{i}]"), format!("{v:.10e}")])
            .map_err(csv_err)?;
    }

    let d = calc.diagnostics();
    let extra = [
        ("ksig_smax", Some(d.saturation.ksig_smax)),
        ("p_12", Some(d.saturation.p_12)),
        ("s_max", Some(d.s_max)),
        ("k_sigma_stderr", d.k_sigma_stderr),
        ("p_12_stderr", d.saturation.p_12_stderr),
    ];
    for (key, value) in extra {
        let value = value.map(|v| format!("{v:.10e}")).unwrap_or_default();
        w.write_record([key.to_string(), value]).map_err(csv_err)?;
    }

    w.flush()
        .map_err(|e| HydrationError::parse(format!("failed to flush results CSV: {e}")))
}

/// Write a `power,value` CSV (power in W).
pub fn write_series_csv(path: &Path, series: &PowerSeries) -> HydrationResult<()> {
    let file = File::create(path).map_err(|e| HydrationError::io(path, e))?;
    let mut w = csv::Writer::from_writer(BufWriter::new(file));
    let csv_err = |e: csv::Error| HydrationError::parse(format!("{}: {e}", path.display()));

    w.write_record(["power", "value"]).map_err(csv_err)?;
    for (p, v) in series.power.iter().zip(&series.values) {
        w.write_record([p.to_string(), v.to_string()]).map_err(csv_err)?;
    }
    w.flush().map_err(|e| HydrationError::io(path, e))
}

pub fn write_parameter_json(path: &Path, hp: &HydrationParameter) -> HydrationResult<()> {
    let file = File::create(path).map_err(|e| HydrationError::io(path, e))?;
    let mut out = BufWriter::new(file);
    serde_json::to_writer_pretty(&mut out, hp)
        .map_err(|e| HydrationError::parse(format!("failed to serialize parameters: {e}")))?;
    out.flush().map_err(|e| HydrationError::io(path, e))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::data::synthetic::{SyntheticConfig, generate};
    use chrono::TimeZone;

    fn calculator() -> HydrationCalculator {
        let data = generate(&SyntheticConfig::default()).unwrap();
        HydrationCalculator::from_series(data.t1, data.enhancement, data.parameter, &Default::default())
            .unwrap()
    }

    #[test]
    fn json_export_has_fixed_result_keys() {
        let calc = calculator();
        let ts = Utc.with_ymd_and_hms(2024, 5, 1, 12, 0, 0).unwrap();
        let mut buf = Vec::new();
        write_results_json(&mut buf, &calc, ts).unwrap();

        let v: serde_json::Value = serde_json::from_slice(&buf).unwrap();
        assert_eq!(v["tool"], "odnp");
        assert_eq!(v["generated_at"], "2024-05-01T12:00:00Z");
        assert_eq!(v["parameter"]["slC"], 200.0);
        for key in [
            "k_sigma",
            "k_sigma_array",
            "ksigma_kbulk_invratio",
            "k_rho",
            "k_low",
            "klow_klow_bulk_ratio",
            "ksi",
            "tcorr",
            "tcorr_tcorr_bulk_ratio",
            "dLocal",
        ] {
            assert!(v["results"].get(key).is_some(), "missing {key}");
        }
        assert_eq!(v["results"]["k_sigma_array"].as_array().unwrap().len(), 10);
    }

    #[test]
    fn csv_export_is_key_value() {
        let calc = calculator();
        let mut buf = Vec::new();
        write_results_csv(&mut buf, &calc).unwrap();
        let text = String::from_utf8(buf).unwrap();

        let mut lines = text.lines();
        assert_eq!(lines.next(), Some("key,value"));
        assert!(text.lines().any(|l| l.starts_with("k_sigma,9.5")));
        assert!(text.lines().any(|l| l.starts_with("k_sigma_array[9],")));
        assert!(text.lines().any(|l| l.starts_with("dLocal,")));
    }
}
