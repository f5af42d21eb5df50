use std::{
    collections::{BTreeMap, BTreeSet},
    fs,
    path::{Path, PathBuf},
};

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};

use super::{ManifestRecord, ManifestSummary, ROOT_FOLDER, io::write_manifest};
use crate::descriptor::load_descriptor;

/// Lifecycle of one collection run. There are no retries: a descriptor that
/// fails to load is recorded and skipped.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum CollectPhase {
    Idle,
    Scanning,
    Aggregating,
    Done,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CollectFailure {
    pub path: String,
    pub message: String,
}

/// Result of a collection run over the successfully loaded descriptors.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Collection {
    pub records: Vec<ManifestRecord>,
    pub summary: ManifestSummary,
    pub failures: Vec<CollectFailure>,
    pub phase: CollectPhase,
}

/// Normalize a caller-supplied relative path to forward slashes.
fn normalize_relative(raw: &str) -> String {
    let mut path = raw.trim().replace('\\', "/");
    while let Some(rest) = path.strip_prefix("./") {
        path = rest.to_string();
    }
    path
}

fn folder_of(relative: &str) -> String {
    match relative.rsplit_once('/') {
        Some((folder, _)) if !folder.is_empty() => folder.to_string(),
        _ => ROOT_FOLDER.to_string(),
    }
}

/// Folds descriptors into manifest records and cross-model aggregates.
pub struct Collector {
    root: PathBuf,
    prefix: String,
    phase: CollectPhase,
    records: Vec<ManifestRecord>,
    motion_counts: BTreeMap<String, usize>,
    expressions: BTreeSet<String>,
    failures: Vec<CollectFailure>,
}

impl Collector {
    pub fn new(root: &Path, prefix: &str) -> Self {
        Self {
            root: root.to_path_buf(),
            prefix: prefix.to_string(),
            phase: CollectPhase::Idle,
            records: Vec::new(),
            motion_counts: BTreeMap::new(),
            expressions: BTreeSet::new(),
            failures: Vec::new(),
        }
    }

    pub fn phase(&self) -> CollectPhase {
        self.phase
    }

    /// Load one descriptor and, on success, emit its record with the next
    /// contiguous index.
    pub fn scan(&mut self, relative_path: &str) {
        self.phase = CollectPhase::Scanning;

        let relative = normalize_relative(relative_path);
        let absolute = self.root.join(&relative);

        let descriptor = match load_descriptor(&absolute) {
            Ok(descriptor) => descriptor,
            Err(err) => {
                self.failures.push(CollectFailure {
                    path: relative,
                    message: format!("{err:#}"),
                });
                return;
            }
        };

        for name in descriptor.motion_names() {
            *self.motion_counts.entry(name).or_insert(0) += 1;
        }
        self.expressions.extend(descriptor.expression_names());

        let index = self.records.len();
        let folder = folder_of(&relative);
        self.records
            .push(ManifestRecord::new(index, &self.prefix, relative, folder));
    }

    /// Build the summary: motions every loaded model has, expressions any
    /// loaded model has.
    pub fn finish(mut self) -> Collection {
        self.phase = CollectPhase::Aggregating;

        let required_count = self.records.len();
        let motions = self
            .motion_counts
            .into_iter()
            .filter(|(_, count)| *count == required_count)
            .map(|(name, _)| name)
            .collect();

        let summary = ManifestSummary {
            motions,
            expressions: self.expressions.into_iter().collect(),
            ..ManifestSummary::default()
        };

        Collection {
            records: self.records,
            summary,
            failures: self.failures,
            phase: CollectPhase::Done,
        }
    }
}

/// Collect the descriptors at `ordered_relative_paths` (relative to
/// `root_dir`, in the order given) into manifest records and a summary.
///
/// Only an unreadable root directory is fatal.
pub fn collect(root_dir: &Path, id_prefix: &str, ordered_relative_paths: &[String]) -> Result<Collection> {
    fs::read_dir(root_dir)
        .with_context(|| format!("failed to open root directory: {}", root_dir.display()))?;

    let mut collector = Collector::new(root_dir, id_prefix);
    for relative_path in ordered_relative_paths {
        collector.scan(relative_path);
    }
    Ok(collector.finish())
}

/// [`collect`] and write the manifest to `output_path`.
pub fn collect_to_file(
    root_dir: &Path,
    output_path: &Path,
    id_prefix: &str,
    ordered_relative_paths: &[String],
) -> Result<Collection> {
    let collection = collect(root_dir, id_prefix, ordered_relative_paths)?;
    write_manifest(output_path, &collection.records, &collection.summary)?;
    Ok(collection)
}
