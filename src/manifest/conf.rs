//! Conversion between manifests and the 8-line `.conf` stage script.
//!
//! Line layout:
//!
//! 1. script name
//! 2. `changeFigure` commands joined by a literal `\n`
//! 3. primary model path
//! 4. `setTransform` commands joined by a literal `\n`
//! 5. primary model transform
//! 6. other model paths joined by a literal `\n`
//! 7. `|dx|,|dy|` offsets of every other model against the primary
//! 8. import value

use std::{
    collections::BTreeSet,
    fs,
    path::{Path, PathBuf},
};

use anyhow::{Context, Result};
use thiserror::Error;

use super::{
    Manifest, ManifestRecord, ManifestSummary, ROOT_FOLDER,
    io::{load_manifest, write_manifest},
};
use crate::descriptor::load_descriptor;
use crate::paths::relative_or_file_name;

pub const CONF_LINE_COUNT: usize = 8;
pub const CONF_RECORD_PREFIX: &str = "myid";
/// Output directory for converted manifests, next to the `.conf` file.
pub const CONVERTED_DIR: &str = "converted_jsonl";

const LITERAL_NEWLINE: &str = "\\n";
const DEFAULT_TRANSFORM: &str = "0.000|0.000|1.000|0.000";
const DEFAULT_RECORD_ID: &str = "model";

#[derive(Debug, Error, PartialEq)]
pub enum ConfError {
    #[error("stage script needs at least 8 lines, found {found}")]
    TooShort { found: usize },
    #[error("invalid offset value: {value}")]
    InvalidOffset { value: String },
    #[error("manifest has no model records")]
    Empty,
}

fn record_id(record: &ManifestRecord) -> &str {
    if record.id.is_empty() {
        DEFAULT_RECORD_ID
    } else {
        &record.id
    }
}

fn joined_figure_path(figure_rel_dir: &str, path: &str) -> String {
    let dir = figure_rel_dir.trim_end_matches('/');
    if dir.is_empty() || dir == ROOT_FOLDER {
        path.to_string()
    } else {
        format!("{dir}/{path}")
    }
}

/// Render a manifest as a stage script.
///
/// `figure_rel_dir` is the manifest directory relative to the engine's
/// figure root and prefixes every model path.
pub fn manifest_to_conf(manifest: &Manifest, figure_rel_dir: &str, name: &str) -> Result<String, ConfError> {
    let Some(primary) = manifest.records.first() else {
        return Err(ConfError::Empty);
    };

    let full_paths: Vec<String> = manifest
        .records
        .iter()
        .map(|record| joined_figure_path(figure_rel_dir, &record.path))
        .collect();

    let change_line = manifest
        .records
        .iter()
        .zip(&full_paths)
        .map(|(record, path)| format!("changeFigure:{path} -id={} %me%;", record_id(record)))
        .collect::<Vec<_>>()
        .join(LITERAL_NEWLINE);

    let transform_line = manifest
        .records
        .iter()
        .map(|record| format!("setTransform:%me% -target={} -duration=750;", record_id(record)))
        .collect::<Vec<_>>()
        .join(LITERAL_NEWLINE);

    let primary_x = primary.x.unwrap_or(0.0);
    let primary_y = primary.y.unwrap_or(0.0);
    let offsets = manifest.records[1..]
        .iter()
        .flat_map(|record| {
            let dx = (record.x.unwrap_or(0.0) - primary_x).round_ties_even().abs() as i64;
            let dy = (record.y.unwrap_or(0.0) - primary_y).round_ties_even().abs() as i64;
            [dx.to_string(), dy.to_string()]
        })
        .collect::<Vec<_>>()
        .join(",");

    let lines = [
        name.to_string(),
        change_line,
        full_paths[0].clone(),
        transform_line,
        DEFAULT_TRANSFORM.to_string(),
        full_paths[1..].join(LITERAL_NEWLINE),
        offsets,
        "0".to_string(),
    ];
    Ok(lines.join("\n"))
}

/// Write `<output_dir>/<manifest stem>.conf` for a manifest on disk.
pub fn export_conf(manifest_path: &Path, figure_root: &Path, output_dir: &Path) -> Result<PathBuf> {
    let manifest = load_manifest(manifest_path)?;
    let name = manifest_path
        .file_stem()
        .map(|stem| stem.to_string_lossy().into_owned())
        .unwrap_or_default();
    let manifest_dir = manifest_path.parent().unwrap_or(Path::new("."));
    let figure_rel_dir = relative_or_file_name(manifest_dir, figure_root);

    let content = manifest_to_conf(&manifest, &figure_rel_dir, &name)
        .with_context(|| format!("failed to convert manifest: {}", manifest_path.display()))?;

    fs::create_dir_all(output_dir)
        .with_context(|| format!("failed to create output directory: {}", output_dir.display()))?;
    let conf_path = output_dir.join(format!("{name}.conf"));
    fs::write(&conf_path, content)
        .with_context(|| format!("failed to write stage script: {}", conf_path.display()))?;
    Ok(conf_path)
}

/// A manifest rebuilt from a stage script, named after its first line.
#[derive(Debug, Clone, PartialEq)]
pub struct ConfConversion {
    pub name: String,
    pub manifest: Manifest,
}

fn split_literal(line: &str) -> Vec<&str> {
    if line.is_empty() {
        Vec::new()
    } else {
        line.split(LITERAL_NEWLINE).collect()
    }
}

fn parse_offsets(line: &str) -> Result<Vec<f64>, ConfError> {
    if line.is_empty() {
        return Ok(Vec::new());
    }
    line.split(',')
        .map(|value| {
            value.trim().parse::<f64>().map_err(|_| ConfError::InvalidOffset {
                value: value.to_string(),
            })
        })
        .collect()
}

fn base_name(path: &str) -> &str {
    path.rsplit(['/', '\\']).next().unwrap_or(path)
}

fn parent_dir(path: &str) -> &str {
    path.rfind(['/', '\\']).map(|at| &path[..at]).unwrap_or("")
}

/// Parse a stage script back into a manifest.
///
/// Records get `myid{index}` ids and bare file names as paths. Non-primary
/// records take `y` from the offsets line. The summary is the union of the
/// names found in each model directory's `model.json` under `figure_root`;
/// models that cannot be read contribute nothing.
pub fn conf_to_manifest(text: &str, figure_root: &Path) -> Result<ConfConversion, ConfError> {
    let lines: Vec<&str> = text.lines().map(str::trim).collect();
    let start = lines.iter().position(|line| !line.is_empty()).unwrap_or(lines.len());
    let end = lines.iter().rposition(|line| !line.is_empty()).map_or(start, |at| at + 1);
    let lines = &lines[start..end];
    if lines.len() < CONF_LINE_COUNT {
        return Err(ConfError::TooShort { found: lines.len() });
    }

    let name = lines[0].to_string();
    let main_path = lines[2];
    let other_paths = split_literal(lines[5]);
    let offsets = parse_offsets(lines[6])?;
    let import = lines[7]
        .bytes()
        .all(|byte| byte.is_ascii_digit())
        .then(|| lines[7].parse::<i64>().ok())
        .flatten();

    let all_paths: Vec<&str> = std::iter::once(main_path).chain(other_paths).collect();

    let records = all_paths
        .iter()
        .enumerate()
        .map(|(index, path)| {
            let mut record =
                ManifestRecord::new(index, CONF_RECORD_PREFIX, base_name(path), ROOT_FOLDER);
            if index > 0 {
                record.y = offsets.get(2 * (index - 1) + 1).copied();
            }
            record
        })
        .collect();

    let mut motions = BTreeSet::new();
    let mut expressions = BTreeSet::new();
    for path in &all_paths {
        let descriptor_path = figure_root.join(parent_dir(path)).join("model.json");
        if let Ok(descriptor) = load_descriptor(&descriptor_path) {
            motions.extend(descriptor.motion_names());
            expressions.extend(descriptor.expression_names());
        }
    }

    let summary = ManifestSummary {
        motions: motions.into_iter().collect(),
        expressions: expressions.into_iter().collect(),
        import,
        ..ManifestSummary::default()
    };

    Ok(ConfConversion {
        name,
        manifest: Manifest {
            records,
            summary: Some(summary),
            ..Manifest::default()
        },
    })
}

/// Convert a `.conf` file to `<conf dir>/converted_jsonl/<name>.jsonl`.
pub fn convert_conf_file(conf_path: &Path, figure_root: &Path) -> Result<PathBuf> {
    let text = fs::read_to_string(conf_path)
        .with_context(|| format!("failed to read stage script: {}", conf_path.display()))?;
    let conversion = conf_to_manifest(&text, figure_root)
        .with_context(|| format!("failed to parse stage script: {}", conf_path.display()))?;

    let output_dir = conf_path
        .parent()
        .unwrap_or(Path::new("."))
        .join(CONVERTED_DIR);
    fs::create_dir_all(&output_dir)
        .with_context(|| format!("failed to create output directory: {}", output_dir.display()))?;

    let output_path = output_dir.join(format!("{}.jsonl", conversion.name));
    let summary = conversion.manifest.summary.unwrap_or_default();
    write_manifest(&output_path, &conversion.manifest.records, &summary)?;
    Ok(output_path)
}
