//! Per-endpoint SLA thresholds.
//!
//! A threshold source is a mapping from endpoint name to
//! `{ p95_ms, error_rate_pct }`, written as TOML, YAML or JSON:
//!
//! ```toml
//! ["GET /users"]
//! p95_ms = 250
//! error_rate_pct = 1.0
//! ```
//!
//! Any malformed entry rejects the whole source.

use std::collections::BTreeMap;
use std::fs;
use std::path::Path;

use serde::Serialize;
use serde_json::{Map, Value};

use crate::error::{CoreError, CoreResult};

const DOCUMENT: &str = "<document>";

/// SLA ceilings for one endpoint.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct Threshold {
    /// Maximum acceptable p95 latency in milliseconds.
    pub p95_ms: f64,
    /// Maximum acceptable failure rate (0-100).
    pub error_rate_pct: f64,
}

/// Supported threshold source formats.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ThresholdFormat {
    Toml,
    Yaml,
    Json,
}

impl ThresholdFormat {
    /// Picks the format from the file extension, ignoring ASCII case.
    pub fn from_path(path: &Path) -> CoreResult<Self> {
        let extension = path.extension().and_then(|ext| ext.to_str()).unwrap_or_default();
        let is = |candidate: &str| extension.eq_ignore_ascii_case(candidate);

        if is("toml") {
            Ok(Self::Toml)
        } else if is("yaml") || is("yml") {
            Ok(Self::Yaml)
        } else if is("json") {
            Ok(Self::Json)
        } else {
            Err(CoreError::malformed_threshold(
                DOCUMENT,
                format!(
                    "unsupported threshold source `{}` (expected .toml, .yaml or .json)",
                    path.display()
                ),
            ))
        }
    }
}

/// Thresholds keyed by endpoint name.
///
/// Endpoints without an entry are exempt from validation.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct ThresholdSet {
    entries: BTreeMap<String, Threshold>,
}

impl ThresholdSet {
    pub fn new() -> Self {
        Self::default()
    }

    /// Builds a set from `(name, threshold)` pairs. Later duplicates win.
    pub fn from_entries<I, S>(entries: I) -> Self
    where
        I: IntoIterator<Item = (S, Threshold)>,
        S: Into<String>,
    {
        Self {
            entries: entries
                .into_iter()
                .map(|(name, threshold)| (name.into(), threshold))
                .collect(),
        }
    }

    /// Loads thresholds from a TOML, YAML or JSON file.
    pub fn load(path: impl AsRef<Path>) -> CoreResult<Self> {
        let path = path.as_ref();
        if !path.exists() {
            return Err(CoreError::ThresholdSourceNotFound {
                path: path.to_path_buf(),
            });
        }

        let format = ThresholdFormat::from_path(path)?;
        let content = fs::read_to_string(path)?;
        let set = Self::parse(&content, format)?;

        tracing::info!(
            path = %path.display(),
            endpoints = set.len(),
            "Loaded SLA thresholds"
        );
        Ok(set)
    }

    /// Parses threshold source content.
    pub fn parse(content: &str, format: ThresholdFormat) -> CoreResult<Self> {
        let document: Value = match format {
            ThresholdFormat::Toml => {
                let table: toml::Table = toml::from_str(content)
                    .map_err(|e| CoreError::malformed_threshold(DOCUMENT, e.to_string()))?;
                serde_json::to_value(table)
                    .map_err(|e| CoreError::malformed_threshold(DOCUMENT, e.to_string()))?
            }
            // An empty YAML document is an empty mapping, as it is for TOML.
            ThresholdFormat::Yaml if content.trim().is_empty() => Value::Object(Map::new()),
            ThresholdFormat::Yaml => serde_yaml::from_str(content)
                .map_err(|e| CoreError::malformed_threshold(DOCUMENT, e.to_string()))?,
            ThresholdFormat::Json => serde_json::from_str(content)
                .map_err(|e| CoreError::malformed_threshold(DOCUMENT, e.to_string()))?,
        };

        let Value::Object(document) = document else {
            return Err(CoreError::malformed_threshold(
                DOCUMENT,
                "expected a mapping of endpoint name to thresholds",
            ));
        };

        let mut entries = BTreeMap::new();
        for (name, value) in &document {
            entries.insert(name.clone(), parse_entry(name, value)?);
        }

        Ok(Self { entries })
    }

    pub fn get(&self, name: &str) -> Option<&Threshold> {
        self.entries.get(name)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Iterates entries in name order.
    pub fn iter(&self) -> impl Iterator<Item = (&str, &Threshold)> {
        self.entries.iter().map(|(name, t)| (name.as_str(), t))
    }
}

fn parse_entry(name: &str, value: &Value) -> CoreResult<Threshold> {
    let fields = value.as_object().ok_or_else(|| {
        CoreError::malformed_threshold(name, "expected a mapping with `p95_ms` and `error_rate_pct`")
    })?;

    Ok(Threshold {
        p95_ms: required_number(name, fields, &["p95_ms"])?,
        // `error_rate` is the key used by older threshold files
        error_rate_pct: required_number(name, fields, &["error_rate_pct", "error_rate"])?,
    })
}

fn required_number(entry: &str, fields: &Map<String, Value>, keys: &[&str]) -> CoreResult<f64> {
    let (key, value) = keys
        .iter()
        .find_map(|key| fields.get(*key).map(|value| (*key, value)))
        .ok_or_else(|| {
            CoreError::malformed_threshold(
                entry,
                format!("missing required field `{}`", keys[0]),
            )
        })?;

    match value.as_f64() {
        Some(number) if number.is_finite() && number >= 0.0 => Ok(number),
        _ => Err(CoreError::malformed_threshold(
            entry,
            format!("field `{}` must be a finite, non-negative number (got {})", key, value),
        )),
    }
}
