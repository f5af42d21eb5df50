//! Aggregate JSONL manifests consumed by the game engine.
//!
//! A manifest holds one record per model followed by a single summary line
//! carrying the cross-model motion/expression aggregates.

pub mod collect;
pub mod conf;
pub mod io;
pub mod merge;
pub mod resolve;

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

// Re-export the entry points callers reach for most.
pub use collect::{CollectFailure, CollectPhase, Collection, Collector, collect, collect_to_file};
pub use io::{
    ManifestIssue, RecordEdit, check_manifest, edit_summary_import, load_manifest, parse_manifest,
    render_manifest, update_records, write_manifest,
};
pub use merge::{MergeReport, append_and_remerge};

/// Folder value used for descriptors placed directly in the manifest root.
pub const ROOT_FOLDER: &str = ".";

/// One model line of a manifest.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ManifestRecord {
    pub index: usize,
    pub id: String,
    pub path: String,
    #[serde(default)]
    pub folder: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub x: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub y: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub xscale: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub yscale: Option<f64>,
    /// Keys written by other tools, preserved on rewrite.
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl ManifestRecord {
    pub fn new(index: usize, prefix: &str, path: impl Into<String>, folder: impl Into<String>) -> Self {
        Self {
            index,
            id: format!("{prefix}{index}"),
            path: path.into(),
            folder: folder.into(),
            x: None,
            y: None,
            xscale: None,
            yscale: None,
            extra: Map::new(),
        }
    }
}

/// The trailing aggregate line of a manifest.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ManifestSummary {
    /// Motion names every included model provides, sorted.
    #[serde(default)]
    pub motions: Vec<String>,
    /// Expression names any included model provides, sorted.
    #[serde(default)]
    pub expressions: Vec<String>,
    /// Uniform `PARAM_IMPORT` override applied to all models.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub import: Option<i64>,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl ManifestSummary {
    /// A decoded line is the summary iff it carries either aggregate key.
    pub fn is_summary_line(object: &Map<String, Value>) -> bool {
        object.contains_key("motions") || object.contains_key("expressions")
    }
}

/// Where the summary lines sat in the parsed file, by 1-based line number.
///
/// Empty for manifests built in memory.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ManifestLayout {
    pub summary_lines: Vec<usize>,
    /// Line number of the last non-blank line.
    pub last_line: usize,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Manifest {
    pub records: Vec<ManifestRecord>,
    /// The last summary line of the file.
    pub summary: Option<ManifestSummary>,
    #[serde(skip)]
    pub layout: ManifestLayout,
}
