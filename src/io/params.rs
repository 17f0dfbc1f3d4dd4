//! Parameter files and batch manifests.
//!
//! A parameter file is a JSON object with any subset of the
//! `HydrationParameter` fields; missing fields take their defaults.
//!
//! A batch manifest lists experiments; each experiment's `parameter` object is
//! layered over the manifest-level `defaults`:
//!
//! ```json
//! {
//!   "defaults": { "slC": 200, "T100": 2.5 },
//!   "power": { "unit": "dbm", "dbm_offset": 21.9992 },
//!   "experiments": [
//!     { "name": "A", "enhancements": "a_E.csv", "t1": "a_T1.csv", "parameter": { "T10": 1.4 } }
//!   ]
//! }
//! ```
//!
//! Relative CSV paths are resolved against the manifest's directory.

use std::fs;
use std::path::{Path, PathBuf};
use std::str::FromStr;

use serde::Deserialize;
use serde_json::{Map, Value};

use crate::domain::{HydrationParameter, SmaxModel, T1InterpMethod};
use crate::error::{HydrationError, HydrationResult};
use crate::hydration::Experiment;
use crate::io::ingest::{PowerSpec, read_series_csv};

pub fn load_parameter_file(path: &Path) -> HydrationResult<HydrationParameter> {
    let text = fs::read_to_string(path).map_err(|e| HydrationError::io(path, e))?;
    parse_parameter(&text).map_err(|e| e.with_context(path.display()))
}

/// Parse a parameter JSON document.
pub fn parse_parameter(text: &str) -> HydrationResult<HydrationParameter> {
    match serde_json::from_str(text).map_err(|e| HydrationError::parse(e.to_string()))? {
        Value::Object(map) => parameter_from_map(map),
        _ => Err(HydrationError::parse("parameters must be a JSON object")),
    }
}

/// Build parameters from a JSON object; missing fields take their defaults.
///
/// Model names go through `FromStr` first, so an unknown one is an
/// unsupported-configuration error rather than a parse error.
pub fn parameter_from_map(map: Map<String, Value>) -> HydrationResult<HydrationParameter> {
    check_option::<SmaxModel>(&map, "smax_model")?;
    check_option::<T1InterpMethod>(&map, "t1_interp_method")?;
    serde_json::from_value(Value::Object(map)).map_err(|e| HydrationError::parse(e.to_string()))
}

fn check_option<T: FromStr<Err = HydrationError>>(map: &Map<String, Value>, key: &str) -> HydrationResult<()> {
    match map.get(key) {
        Some(Value::String(s)) => s.parse::<T>().map(|_| ()),
        _ => Ok(()),
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct Manifest {
    #[serde(default)]
    pub defaults: Map<String, Value>,
    #[serde(default)]
    pub power: PowerSpec,
    pub experiments: Vec<ManifestEntry>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ManifestEntry {
    pub name: String,
    pub enhancements: PathBuf,
    pub t1: PathBuf,
    #[serde(default)]
    pub parameter: Map<String, Value>,
}

impl ManifestEntry {
    /// Entry parameters layered over `defaults`.
    pub fn resolve_parameter(&self, defaults: &Map<String, Value>) -> HydrationResult<HydrationParameter> {
        let mut merged = defaults.clone();
        for (k, v) in &self.parameter {
            merged.insert(k.clone(), v.clone());
        }
        parameter_from_map(merged).map_err(|e| e.with_context(format!("experiment `{}` parameter", self.name)))
    }

    /// Resolve parameters and read both CSVs, relative paths against `base`.
    pub fn load(&self, base: &Path, defaults: &Map<String, Value>, power: &PowerSpec) -> HydrationResult<Experiment> {
        let parameter = self.resolve_parameter(defaults)?;
        let enhancement = read_series_csv(&base.join(&self.enhancements), "E", power)?;
        let t1 = read_series_csv(&base.join(&self.t1), "T1", power)?;
        Ok(Experiment {
            name: self.name.clone(),
            t1: t1.series,
            enhancement: enhancement.series,
            parameter,
        })
    }
}

pub fn parse_manifest(text: &str) -> HydrationResult<Manifest> {
    serde_json::from_str(text).map_err(|e| HydrationError::parse(format!("batch manifest: {e}")))
}

/// Read a manifest and every CSV it references.
///
/// Only an unreadable or malformed manifest fails as a whole. Each entry keeps
/// its own load result, in manifest order.
pub fn load_manifest(path: &Path) -> HydrationResult<Vec<(String, HydrationResult<Experiment>)>> {
    let text = fs::read_to_string(path).map_err(|e| HydrationError::io(path, e))?;
    let manifest = parse_manifest(&text)?;
    let base = path.parent().unwrap_or_else(|| Path::new("."));

    Ok(manifest
        .experiments
        .iter()
        .map(|entry| {
            let loaded = entry.load(base, &manifest.defaults, &manifest.power);
            (entry.name.clone(), loaded)
        })
        .collect())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::SmaxModel;
    use crate::error::ErrorKind;
    use crate::io::ingest::PowerUnit;

    #[test]
    fn manifest_layers_entry_over_defaults() {
        let manifest = parse_manifest(
            r#"{
                "defaults": {"slC": 200, "T10": 1.2, "smax_model": "free"},
                "power": {"unit": "dbm", "dbm_offset": 21.9992},
                "experiments": [
                    {"name": "A", "enhancements": "a.csv", "t1": "a_t1.csv", "parameter": {"T10": 1.4}},
                    {"name": "B", "enhancements": "b.csv", "t1": "b_t1.csv"}
                ]
            }"#,
        )
        .unwrap();
        assert_eq!(manifest.power.unit, PowerUnit::Dbm);
        assert_eq!(manifest.experiments.len(), 2);

        let a = manifest.experiments[0].resolve_parameter(&manifest.defaults).unwrap();
        let b = manifest.experiments[1].resolve_parameter(&manifest.defaults).unwrap();
        assert_eq!(a.t10, 1.4);
        assert_eq!(b.t10, 1.2);
        assert_eq!(a.sl_c, 200.0);
        assert_eq!(b.smax_model, SmaxModel::Free);
        assert_eq!(b.t100, 2.5);
    }

    #[test]
    fn unknown_option_is_unsupported_config() {
        let manifest = parse_manifest(
            r#"{"experiments": [{"name": "A", "enhancements": "a.csv", "t1": "t.csv",
                "parameter": {"t1_interp_method": "cubic"}}]}"#,
        )
        .unwrap();
        let err = manifest.experiments[0]
            .resolve_parameter(&manifest.defaults)
            .unwrap_err();
        assert_eq!(err.kind(), ErrorKind::UnsupportedConfig);
        assert!(format!("{err}").contains("experiment `A`"));

        let err = parse_parameter(r#"{"smax_model": "bound"}"#).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::UnsupportedConfig);
    }

    #[test]
    fn malformed_parameter_values_are_parse_errors() {
        assert_eq!(parse_parameter(r#"{"slC": "lots"}"#).unwrap_err().kind(), ErrorKind::Parse);
        assert_eq!(parse_parameter(r#"{"smax_model": 3}"#).unwrap_err().kind(), ErrorKind::Parse);
        assert_eq!(parse_parameter("[1, 2]").unwrap_err().kind(), ErrorKind::Parse);
        assert_eq!(parse_parameter(r#"{"T10": 1.4}"#).unwrap().t10, 1.4);
    }

    #[test]
    fn unknown_option_in_parameter_file_keeps_kind() {
        let dir = std::env::temp_dir().join(format!("odnp-params-{}", std::process::id()));
        fs::create_dir_all(&dir).unwrap();
        let path = dir.join("params.json");
        fs::write(&path, r#"{"t1_interp_method": "spline"}"#).unwrap();

        let err = load_parameter_file(&path).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::UnsupportedConfig);
        assert!(format!("{err}").contains("params.json"));

        fs::remove_dir_all(&dir).unwrap();
    }

    #[test]
    fn bad_manifest_entry_stays_local() {
        let dir = std::env::temp_dir().join(format!("odnp-manifest-{}", std::process::id()));
        fs::create_dir_all(&dir).unwrap();
        fs::write(dir.join("e.csv"), "power,value\n0,1\n1,-2\n").unwrap();
        fs::write(dir.join("t1.csv"), "power,value\n0,1.3\n1,1.4\n").unwrap();
        let manifest = dir.join("batch.json");
        fs::write(
            &manifest,
            r#"{"experiments": [
                {"name": "good", "enhancements": "e.csv", "t1": "t1.csv"},
                {"name": "missing", "enhancements": "nope.csv", "t1": "t1.csv"},
                {"name": "bad-model", "enhancements": "e.csv", "t1": "t1.csv",
                 "parameter": {"smax_model": "bound"}}
            ]}"#,
        )
        .unwrap();

        let entries = load_manifest(&manifest).unwrap();
        let names: Vec<&str> = entries.iter().map(|(n, _)| n.as_str()).collect();
        assert_eq!(names, ["good", "missing", "bad-model"]);
        assert_eq!(entries[0].1.as_ref().unwrap().enhancement.len(), 2);
        assert_eq!(entries[1].1.as_ref().unwrap_err().kind(), ErrorKind::Io);
        assert_eq!(entries[2].1.as_ref().unwrap_err().kind(), ErrorKind::UnsupportedConfig);

        fs::remove_dir_all(&dir).unwrap();
    }

    #[test]
    fn missing_experiments_is_parse_error() {
        assert_eq!(parse_manifest("{}").unwrap_err().kind(), ErrorKind::Parse);
    }
}
