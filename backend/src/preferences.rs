use std::{fs, path::Path};

use anyhow::{Context, Result};
use l2dkit::reconcile::MissingPolicy;
use serde::{Deserialize, Serialize};

use crate::log_warn;

pub const PREFERENCES_FILE: &str = "config.json";

/// Last-used paths and choices, restored on the next start.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Preferences {
    pub jsonl_root_path: String,
    pub last_prefix: String,
    pub model_json_path: String,
    pub file_or_dir: String,
    pub figure_path: String,
    pub color_match_source_path: String,
    pub color_match_target_path: String,
    pub missing_policy: MissingPolicy,
    pub target_body_index: Option<f64>,
}

impl Default for Preferences {
    fn default() -> Self {
        Self {
            jsonl_root_path: String::new(),
            last_prefix: String::new(),
            model_json_path: String::new(),
            file_or_dir: String::new(),
            figure_path: String::new(),
            color_match_source_path: String::new(),
            color_match_target_path: String::new(),
            missing_policy: MissingPolicy::Drop,
            target_body_index: None,
        }
    }
}

/// Persist preferences as pretty JSON.
pub fn save_preferences(path: &Path, preferences: &Preferences) -> Result<()> {
    let content =
        serde_json::to_string_pretty(preferences).context("failed to serialize preferences as JSON")?;
    fs::write(path, content)
        .with_context(|| format!("failed to write preferences: {}", path.display()))
}

/// Load preferences, falling back to defaults.
///
/// A missing file is the first start. An unreadable or broken file is logged
/// and replaced by defaults on the next save.
pub fn load_preferences(path: &Path) -> Preferences {
    if !path.exists() {
        return Preferences::default();
    }

    let parsed = fs::read_to_string(path)
        .with_context(|| format!("failed to read preferences: {}", path.display()))
        .and_then(|content| {
            serde_json::from_str(&content)
                .with_context(|| format!("failed to parse preferences: {}", path.display()))
        });

    parsed.unwrap_or_else(|err| {
        log_warn!("{err:#}; using defaults");
        Preferences::default()
    })
}
