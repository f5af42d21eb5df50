use std::{collections::BTreeMap, fmt, fs, path::Path};

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};

/// One row of `deformer_import.json`.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct CalibrationEntry {
    #[serde(rename = "OriginX")]
    pub origin_x: f64,
    #[serde(rename = "OriginY")]
    pub origin_y: f64,
    #[serde(rename = "heightLevel", default)]
    pub height_level: Option<f64>,
    #[serde(rename = "heightRank", default)]
    pub height_rank: Option<f64>,
}

/// Normalized body-size index used to address calibration rows.
///
/// Numeric values are rounded to the nearest integer; anything else is kept
/// as literal text.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct CalibrationKey(String);

impl CalibrationKey {
    pub fn from_number(value: f64) -> Self {
        Self(format!("{}", value.round_ties_even() as i64))
    }

    pub fn from_text(text: &str) -> Self {
        let text = text.trim();
        match text.parse::<f64>() {
            Ok(value) if value.is_finite() => Self::from_number(value),
            _ => Self(text.to_string()),
        }
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for CalibrationKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Read-only body-size index → origin lookup.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct CalibrationTable {
    rows: BTreeMap<CalibrationKey, CalibrationEntry>,
}

impl CalibrationTable {
    /// Build a table from raw string keys, normalizing each key.
    pub fn from_rows(rows: impl IntoIterator<Item = (String, CalibrationEntry)>) -> Self {
        Self {
            rows: rows
                .into_iter()
                .map(|(key, entry)| (CalibrationKey::from_text(&key), entry))
                .collect(),
        }
    }

    pub fn parse(text: &str) -> Result<Self> {
        let rows: BTreeMap<String, CalibrationEntry> =
            serde_json::from_str(text).context("failed to parse calibration table")?;
        Ok(Self::from_rows(rows))
    }

    pub fn load(path: &Path) -> Result<Self> {
        let content = fs::read_to_string(path)
            .with_context(|| format!("failed to read calibration table: {}", path.display()))?;
        Self::parse(&content).with_context(|| format!("invalid calibration table: {}", path.display()))
    }

    pub fn get(&self, key: &CalibrationKey) -> Option<&CalibrationEntry> {
        self.rows.get(key)
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }
}
