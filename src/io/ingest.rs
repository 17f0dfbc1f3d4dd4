//! CSV ingest for power-dependent series.
//!
//! An enhancement or T1 file is a two-column table:
//!
//! ```text
//! power,value
//! 0.0,1.0
//! 0.5,-4.2
//! ```
//!
//! - header names are case-insensitive; a UTF-8 BOM is tolerated
//! - extra columns are ignored
//! - bad rows are skipped and reported as `RowError`s
//! - power is converted to watts according to `PowerUnit`

use std::collections::HashMap;
use std::fs::File;
use std::io::Read;
use std::path::Path;

use clap::ValueEnum;
use csv::StringRecord;
use serde::{Deserialize, Serialize};

use crate::domain::PowerSeries;
use crate::error::{HydrationError, HydrationResult};

/// Unit of the `power` column.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize, ValueEnum)]
#[serde(rename_all = "snake_case")]
pub enum PowerUnit {
    #[default]
    W,
    Mw,
    Dbm,
}

/// How to interpret the power column.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PowerSpec {
    pub unit: PowerUnit,
    /// Attenuation (dB) between the power meter and the sample, added to dBm readings.
    pub dbm_offset: f64,
}

impl Default for PowerSpec {
    fn default() -> Self {
        Self {
            unit: PowerUnit::W,
            dbm_offset: 0.0,
        }
    }
}

impl PowerSpec {
    pub fn to_watts(&self, raw: f64) -> f64 {
        match self.unit {
            PowerUnit::W => raw,
            PowerUnit::Mw => raw * 1e-3,
            PowerUnit::Dbm => 1e-3 * 10f64.powf((raw + self.dbm_offset) / 10.0),
        }
    }
}

/// A row-level error encountered during ingest.
#[derive(Debug, Clone, PartialEq)]
pub struct RowError {
    pub line: usize,
    pub message: String,
}

/// Ingest output: the series plus bookkeeping for the run summary.
#[derive(Debug, Clone)]
pub struct IngestedSeries {
    pub series: PowerSeries,
    pub row_errors: Vec<RowError>,
    pub rows_read: usize,
}

impl IngestedSeries {
    pub fn rows_used(&self) -> usize {
        self.series.len()
    }
}

/// Load a series CSV from disk.
pub fn read_series_csv(path: &Path, name: &str, power: &PowerSpec) -> HydrationResult<IngestedSeries> {
    let file = File::open(path).map_err(|e| HydrationError::io(path, e))?;
    read_series(file, name, power)
        .map_err(|e| match e {
            HydrationError::Parse { what } => {
                HydrationError::parse(format!("{}: {what}", path.display()))
            }
            other => other,
        })
}

/// Load a series CSV from any reader.
pub fn read_series<R: Read>(reader: R, name: &str, power: &PowerSpec) -> HydrationResult<IngestedSeries> {
    let mut reader = csv::ReaderBuilder::new()
        .flexible(true)
        .trim(csv::Trim::All)
        .from_reader(reader);

    let headers = reader
        .headers()
        .map_err(|e| HydrationError::parse(format!("failed to read CSV headers: {e}")))?
        .clone();
    let header_map = build_header_map(&headers);
    for column in ["power", "value"] {
        if !header_map.contains_key(column) {
            return Err(HydrationError::parse(format!("missing required column: `{column}`")));
        }
    }

    let mut powers = Vec::new();
    let mut values = Vec::new();
    let mut row_errors = Vec::new();
    let mut rows_read = 0usize;

    for (idx, result) in reader.records().enumerate() {
        // Header is line 1.
        let line = idx + 2;
        rows_read += 1;

        let record = match result {
            Ok(r) => r,
            Err(e) => {
                row_errors.push(RowError {
                    line,
                    message: format!("CSV parse error: {e}"),
                });
                continue;
            }
        };

        match parse_row(&record, &header_map, power) {
            Ok((p, v)) => {
                powers.push(p);
                values.push(v);
            }
            Err(message) => row_errors.push(RowError { line, message }),
        }
    }

    if powers.is_empty() {
        return Err(HydrationError::input_shape(format!(
            "{name}: no valid rows ({rows_read} read, {} rejected)",
            row_errors.len()
        )));
    }

    Ok(IngestedSeries {
        series: PowerSeries::new(name, powers, values)?,
        row_errors,
        rows_read,
    })
}

fn build_header_map(headers: &StringRecord) -> HashMap<String, usize> {
    headers
        .iter()
        .enumerate()
        .map(|(idx, name)| (normalize_header_name(name), idx))
        .collect()
}

fn normalize_header_name(name: &str) -> String {
    // Spreadsheet exports often prefix the first header with a BOM.
    let name = name.trim().trim_start_matches('\u{feff}');
    name.to_ascii_lowercase()
}

fn parse_row(
    record: &StringRecord,
    header_map: &HashMap<String, usize>,
    power: &PowerSpec,
) -> Result<(f64, f64), String> {
    let raw_power = parse_f64(get_required(record, header_map, "power")?, "power")?;
    let value = parse_f64(get_required(record, header_map, "value")?, "value")?;

    let watts = power.to_watts(raw_power);
    if !watts.is_finite() || watts < 0.0 {
        return Err(format!("invalid power {raw_power} (converts to {watts} W)"));
    }
    Ok((watts, value))
}

fn get_required<'a>(
    record: &'a StringRecord,
    header_map: &HashMap<String, usize>,
    name: &str,
) -> Result<&'a str, String> {
    let idx = header_map
        .get(name)
        .ok_or_else(|| format!("missing required column: `{name}`"))?;
    record
        .get(*idx)
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .ok_or_else(|| format!("missing required value: `{name}`"))
}

fn parse_f64(s: &str, column: &str) -> Result<f64, String> {
    match s.parse::<f64>() {
        Ok(v) if v.is_finite() => Ok(v),
        _ => Err(format!("invalid `{column}` value '{s}'")),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ErrorKind;

    #[test]
    fn reads_series_and_reports_bad_rows() {
        let csv = "\u{feff}Power,Value,note\n0,1.0,ref\n0.5,-3.5,\nabc,2\n1.0,\n1.5,-7.25,x\n";
        let out = read_series(csv.as_bytes(), "E", &PowerSpec::default()).unwrap();
        assert_eq!(out.series.power, vec![0.0, 0.5, 1.5]);
        assert_eq!(out.series.values, vec![1.0, -3.5, -7.25]);
        assert_eq!(out.rows_read, 5);
        assert_eq!(out.rows_used(), 3);
        let lines: Vec<usize> = out.row_errors.iter().map(|e| e.line).collect();
        assert_eq!(lines, vec![4, 5]);
    }

    #[test]
    fn missing_column_is_parse_error() {
        let err = read_series("p,value\n0,1\n".as_bytes(), "T1", &PowerSpec::default()).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Parse);
        assert!(format!("{err}").contains("power"));
    }

    #[test]
    fn no_usable_rows_is_input_shape() {
        let err = read_series("power,value\nx,y\n".as_bytes(), "T1", &PowerSpec::default()).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::InputShape);
    }

    #[test]
    fn dbm_conversion_applies_offset() {
        let shifted = PowerSpec {
            unit: PowerUnit::Dbm,
            dbm_offset: 10.0,
        };
        // 20 dBm + 10 dB = 30 dBm = 1 W.
        assert!((shifted.to_watts(20.0) - 1.0).abs() < 1e-12);

        let plain = PowerSpec {
            unit: PowerUnit::Dbm,
            dbm_offset: 0.0,
        };
        assert!((plain.to_watts(0.0) - 1e-3).abs() < 1e-15);

        let mw = PowerSpec {
            unit: PowerUnit::Mw,
            dbm_offset: 0.0,
        };
        assert_eq!(mw.to_watts(250.0), 0.25);
    }

    #[test]
    fn negative_power_rows_are_rejected() {
        let out = read_series("power,value\n-1,1\n0,1\n".as_bytes(), "E", &PowerSpec::default()).unwrap();
        assert_eq!(out.series.len(), 1);
        assert_eq!(out.row_errors.len(), 1);
    }
}
