use std::{
    collections::HashSet,
    fs,
    io::Write,
    path::Path,
};

use anyhow::{Context, Result, bail};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use tempfile::NamedTempFile;

use super::{Manifest, ManifestRecord, ManifestSummary};

// ─── Serialization ────────────────────────────────────────────────────────────

/// Render records and the summary as JSONL text, one object per line.
pub fn render_manifest(records: &[ManifestRecord], summary: &ManifestSummary) -> Result<String> {
    let mut content = String::new();
    for record in records {
        let line = serde_json::to_string(record)
            .with_context(|| format!("failed to serialize manifest record {}", record.id))?;
        content.push_str(&line);
        content.push('\n');
    }
    let line = serde_json::to_string(summary).context("failed to serialize manifest summary")?;
    content.push_str(&line);
    content.push('\n');
    Ok(content)
}

/// Replace `path` with `content` through a temporary file in the same directory.
pub(crate) fn write_atomically(path: &Path, content: &str) -> Result<()> {
    let dir = match path.parent() {
        Some(parent) if !parent.as_os_str().is_empty() => parent,
        _ => Path::new("."),
    };
    let mut temp = NamedTempFile::new_in(dir)
        .with_context(|| format!("failed to create temporary file in {}", dir.display()))?;
    temp.write_all(content.as_bytes())
        .with_context(|| format!("failed to write temporary file for {}", path.display()))?;
    // Temporary files are created owner-only; keep the replaced file's mode.
    if let Ok(metadata) = fs::metadata(path) {
        temp.as_file()
            .set_permissions(metadata.permissions())
            .with_context(|| format!("failed to copy permissions of {}", path.display()))?;
    }
    temp.persist(path)
        .with_context(|| format!("failed to replace {}", path.display()))?;
    Ok(())
}

/// Write a manifest: records in their given order, then the summary.
pub fn write_manifest(
    path: &Path,
    records: &[ManifestRecord],
    summary: &ManifestSummary,
) -> Result<()> {
    let content = render_manifest(records, summary)?;
    write_atomically(path, &content)
}

// ─── Parsing ──────────────────────────────────────────────────────────────────

/// Parse JSONL manifest text. Record indices are trusted, not recomputed.
///
/// A misplaced or repeated summary is accepted here and recorded in
/// [`Manifest::layout`]; [`check_manifest`] reports it.
pub fn parse_manifest(text: &str) -> Result<Manifest> {
    let mut manifest = Manifest::default();

    for (line_index, line) in text.lines().enumerate() {
        let line = line.trim();
        if line.is_empty() {
            continue;
        }
        let line_number = line_index + 1;
        let value: Value = serde_json::from_str(line)
            .with_context(|| format!("line {line_number} is not valid JSON"))?;

        let is_summary = value
            .as_object()
            .map(ManifestSummary::is_summary_line)
            .unwrap_or(false);

        manifest.layout.last_line = line_number;
        if is_summary {
            let summary = serde_json::from_value(value)
                .with_context(|| format!("line {line_number} is not a valid summary record"))?;
            manifest.summary = Some(summary);
            manifest.layout.summary_lines.push(line_number);
        } else {
            let record = serde_json::from_value(value)
                .with_context(|| format!("line {line_number} is not a valid manifest record"))?;
            manifest.records.push(record);
        }
    }

    Ok(manifest)
}

pub fn load_manifest(path: &Path) -> Result<Manifest> {
    let content = fs::read_to_string(path)
        .with_context(|| format!("failed to read manifest: {}", path.display()))?;
    parse_manifest(&content).with_context(|| format!("failed to parse manifest: {}", path.display()))
}

/// Load a manifest that is about to be rewritten.
///
/// Rewriting keeps one summary line, so a file with several is refused
/// rather than losing the others.
pub(crate) fn load_manifest_for_rewrite(path: &Path) -> Result<Manifest> {
    let manifest = load_manifest(path)?;
    if manifest.layout.summary_lines.len() > 1 {
        bail!(
            "manifest has {} summary lines (lines {:?}); keep only one: {}",
            manifest.layout.summary_lines.len(),
            manifest.layout.summary_lines,
            path.display()
        );
    }
    Ok(manifest)
}

// ─── Validation ───────────────────────────────────────────────────────────────

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum ManifestIssue {
    MissingSummary,
    /// Records follow the summary line.
    SummaryNotLast { line: usize },
    MultipleSummaries { lines: Vec<usize> },
    IndexGap { position: usize, expected: usize, found: usize },
    DuplicateId { id: String },
}

/// Report structural problems: a missing, misplaced or repeated summary,
/// non-contiguous indices, or repeated ids.
pub fn check_manifest(manifest: &Manifest) -> Vec<ManifestIssue> {
    let mut issues = Vec::new();
    if manifest.summary.is_none() {
        issues.push(ManifestIssue::MissingSummary);
    }

    let layout = &manifest.layout;
    if layout.summary_lines.len() > 1 {
        issues.push(ManifestIssue::MultipleSummaries {
            lines: layout.summary_lines.clone(),
        });
    }
    if let Some(&line) = layout.summary_lines.last() {
        if line != layout.last_line {
            issues.push(ManifestIssue::SummaryNotLast { line });
        }
    }

    let mut ids = HashSet::new();
    for (position, record) in manifest.records.iter().enumerate() {
        if record.index != position {
            issues.push(ManifestIssue::IndexGap {
                position,
                expected: position,
                found: record.index,
            });
        }
        if !ids.insert(record.id.as_str()) {
            issues.push(ManifestIssue::DuplicateId {
                id: record.id.clone(),
            });
        }
    }
    issues
}

// ─── Editing ──────────────────────────────────────────────────────────────────

/// Set or remove the summary's `import` override in place.
pub fn edit_summary_import(path: &Path, import: Option<i64>) -> Result<Manifest> {
    let mut manifest = load_manifest_for_rewrite(path)?;
    let summary = manifest.summary.get_or_insert_with(ManifestSummary::default);
    summary.import = import;
    write_manifest(path, &manifest.records, summary)?;
    Ok(manifest)
}

/// New placement values for one record, addressed by id.
///
/// `None` removes the field from the record.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct RecordEdit {
    pub id: String,
    pub x: Option<f64>,
    pub y: Option<f64>,
    pub xscale: Option<f64>,
    pub yscale: Option<f64>,
}

/// Apply placement edits and rewrite the manifest, keeping the summary line.
///
/// Returns the number of records that matched an edit.
pub fn update_records(path: &Path, edits: &[RecordEdit]) -> Result<usize> {
    let mut manifest = load_manifest_for_rewrite(path)?;

    let mut matched = 0;
    for record in &mut manifest.records {
        if let Some(edit) = edits.iter().find(|edit| edit.id == record.id) {
            record.x = edit.x;
            record.y = edit.y;
            record.xscale = edit.xscale;
            record.yscale = edit.yscale;
            matched += 1;
        }
    }

    let summary = manifest.summary.unwrap_or_default();
    write_manifest(path, &manifest.records, &summary)?;
    Ok(matched)
}
