use std::path::Path;

use anyhow::Result;
use nalgebra::Vector2;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::calibration::{CalibrationEntry, CalibrationKey, CalibrationTable};
use crate::introspect::ModelIntrospector;
use crate::manifest::{
    ManifestRecord,
    io::{load_manifest_for_rewrite, write_manifest},
    resolve::resolve_record_path,
};

/// Height of the coordinate space the calibration origins are authored in.
pub const SOURCE_CANVAS_HEIGHT: f64 = 1500.0;
/// Height of the canvas the engine renders to.
pub const TARGET_CANVAS_HEIGHT: f64 = 1080.0;
/// Vertical correction between the two spaces. Both share horizontal extent,
/// so x is never rescaled.
pub const SCALE_Y: f64 = TARGET_CANVAS_HEIGHT / SOURCE_CANVAS_HEIGHT;

#[derive(Debug, Clone, PartialEq, Error, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum OffsetError {
    /// The requested target body index has no calibration row.
    #[error("no calibration row for target body index {key}")]
    MissingTarget { key: String },
    /// The model's own body index has no calibration row.
    #[error("no calibration row for body index {key}")]
    MissingRow { key: String },
    #[error("model has no PARAM_IMPORT parameter")]
    MissingParameter,
    #[error("model descriptor not found: {path}")]
    MissingDescriptor { path: String },
    #[error("introspection failed: {message}")]
    Introspection { message: String },
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OffsetFailure {
    pub id: String,
    pub error: OffsetError,
}

/// A model whose `PARAM_IMPORT` range does not cover the target index, so its
/// offset is an extrapolation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RangeWarning {
    pub id: String,
    pub path: String,
    pub min: f64,
    pub max: f64,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct OffsetReport {
    /// Ids of the records whose `x`/`y` were written.
    pub updated: Vec<String>,
    pub failures: Vec<OffsetFailure>,
    pub warnings: Vec<RangeWarning>,
}

fn origin(entry: &CalibrationEntry) -> Vector2<f64> {
    Vector2::new(entry.origin_x, entry.origin_y)
}

/// Computes the placement offset that moves a model authored at `row` onto
/// the `target` calibration origin.
///
/// # Arguments
///
/// * `target` - Calibration row of the target body index.
/// * `row` - Calibration row of the model's own body index.
///
/// # Returns
///
/// `(target - row)` with the y component scaled by [`SCALE_Y`]. Both axes
/// come from the same pair of rows.
pub fn placement_offset(target: &CalibrationEntry, row: &CalibrationEntry) -> Vector2<f64> {
    (origin(target) - origin(row)).component_mul(&Vector2::new(1.0, SCALE_Y))
}

fn offset_for_record(
    record: &ManifestRecord,
    model_root: &Path,
    introspector: &dyn ModelIntrospector,
    table: &CalibrationTable,
    target_entry: &CalibrationEntry,
    target: f64,
    warnings: &mut Vec<RangeWarning>,
) -> Result<Vector2<f64>, OffsetError> {
    let descriptor = resolve_record_path(model_root, &record.path).ok_or_else(|| {
        OffsetError::MissingDescriptor {
            path: record.path.clone(),
        }
    })?;

    let info = introspector
        .inspect(&descriptor)
        .map_err(|err| OffsetError::Introspection {
            message: format!("{err:#}"),
        })?;
    let parameter = info.import_parameter().ok_or(OffsetError::MissingParameter)?;

    if target < parameter.min || target > parameter.max {
        warnings.push(RangeWarning {
            id: record.id.clone(),
            path: record.path.clone(),
            min: parameter.min,
            max: parameter.max,
        });
    }

    let key = CalibrationKey::from_number(parameter.default);
    let row = table
        .get(&key)
        .ok_or_else(|| OffsetError::MissingRow { key: key.to_string() })?;

    Ok(placement_offset(target_entry, row))
}

/// Writes `x`/`y` placement offsets into every record.
///
/// # Arguments
///
/// * `records` - Manifest records, updated in place.
/// * `model_root` - Directory record paths are resolved against.
/// * `introspector` - Source of each model's `PARAM_IMPORT` parameter.
/// * `table` - Calibration table.
/// * `target` - Target body index.
///
/// # Returns
///
/// The per-record outcome. Only a missing target row is an error; every
/// other problem is a per-record failure and leaves that record untouched.
pub fn compute_offsets(
    records: &mut [ManifestRecord],
    model_root: &Path,
    introspector: &dyn ModelIntrospector,
    table: &CalibrationTable,
    target: f64,
) -> Result<OffsetReport, OffsetError> {
    let target_key = CalibrationKey::from_number(target);
    let target_entry = table.get(&target_key).ok_or_else(|| OffsetError::MissingTarget {
        key: target_key.to_string(),
    })?;

    let mut report = OffsetReport::default();
    for record in records.iter_mut() {
        match offset_for_record(
            record,
            model_root,
            introspector,
            table,
            target_entry,
            target,
            &mut report.warnings,
        ) {
            Ok(offset) => {
                record.x = Some(offset.x);
                record.y = Some(offset.y);
                report.updated.push(record.id.clone());
            }
            Err(error) => report.failures.push(OffsetFailure {
                id: record.id.clone(),
                error,
            }),
        }
    }
    Ok(report)
}

/// [`compute_offsets`] over a manifest file, rewriting it with the summary
/// line kept.
pub fn apply_offsets(
    manifest_path: &Path,
    introspector: &dyn ModelIntrospector,
    table: &CalibrationTable,
    target: f64,
) -> Result<OffsetReport> {
    let mut manifest = load_manifest_for_rewrite(manifest_path)?;
    let model_root = manifest_path.parent().unwrap_or(Path::new("."));

    let report = compute_offsets(&mut manifest.records, model_root, introspector, table, target)?;

    if !report.updated.is_empty() {
        let summary = manifest.summary.unwrap_or_default();
        write_manifest(manifest_path, &manifest.records, &summary)?;
    }
    Ok(report)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::introspect::{ModelInfo, ParameterInfo, StaticIntrospector};
    use crate::manifest::{ManifestSummary, ROOT_FOLDER, io::load_manifest};
    use pretty_assertions::assert_eq;
    use std::fs;

    fn entry(origin_x: f64, origin_y: f64) -> CalibrationEntry {
        CalibrationEntry {
            origin_x,
            origin_y,
            height_level: None,
            height_rank: None,
        }
    }

    fn table() -> CalibrationTable {
        CalibrationTable::from_rows([
            ("50".to_string(), entry(100.0, 200.0)),
            ("10".to_string(), entry(80.0, 150.0)),
            ("20".to_string(), entry(90.0, 170.0)),
        ])
    }

    fn import_info(default: f64, min: f64, max: f64) -> ModelInfo {
        ModelInfo {
            part_ids: Vec::new(),
            parameters: vec![ParameterInfo {
                id: "PARAM_IMPORT".to_string(),
                default,
                min,
                max,
                value: default,
            }],
        }
    }

    fn model_dir(files: &[&str]) -> tempfile::TempDir {
        let dir = tempfile::tempdir().expect("tempdir");
        for file in files {
            let path = dir.path().join(file);
            fs::create_dir_all(path.parent().expect("parent")).expect("dirs");
            fs::write(path, r#"{"version":"1","layout":{},"model":"m.moc"}"#).expect("write");
        }
        dir
    }

    #[test]
    fn given_target_and_model_rows_when_computing_offset_then_only_y_is_scaled() {
        let offset = placement_offset(&entry(100.0, 200.0), &entry(80.0, 150.0));
        assert_eq!(offset.x, 20.0);
        assert!((offset.y - 36.0).abs() < 1e-9);
        assert!((SCALE_Y - 0.72).abs() < 1e-12);
    }

    #[test]
    fn given_records_when_computing_offsets_then_each_uses_its_own_row() {
        let dir = model_dir(&["a/model.json", "b/model.json"]);
        let introspector = StaticIntrospector::new()
            .with_model("a/model.json", import_info(10.0, 0.0, 100.0))
            .with_model("b/model.json", import_info(19.6, 0.0, 100.0));
        let mut records = vec![
            ManifestRecord::new(0, "m", "a/model.json", "a"),
            ManifestRecord::new(1, "m", "b/model.json", "b"),
        ];

        let report = compute_offsets(&mut records, dir.path(), &introspector, &table(), 50.0)
            .expect("offsets");

        assert_eq!(report.updated, vec!["m0", "m1"]);
        assert!(report.failures.is_empty());
        assert_eq!(records[0].x, Some(20.0));
        assert_eq!(records[1].x, Some(10.0));
        assert!((records[1].y.expect("y") - 30.0 * SCALE_Y).abs() < 1e-9);
    }

    #[test]
    fn given_model_range_below_target_when_computing_then_warning_reports_range() {
        let dir = model_dir(&["a/model.json"]);
        let introspector =
            StaticIntrospector::new().with_model("a/model.json", import_info(10.0, 0.0, 40.0));
        let mut records = vec![ManifestRecord::new(0, "m", "a/model.json", "a")];

        let report = compute_offsets(&mut records, dir.path(), &introspector, &table(), 50.0)
            .expect("offsets");

        assert_eq!(
            report.warnings,
            vec![RangeWarning {
                id: "m0".to_string(),
                path: "a/model.json".to_string(),
                min: 0.0,
                max: 40.0,
            }]
        );
        assert_eq!(report.updated, vec!["m0"]);
    }

    #[test]
    fn given_missing_target_row_when_computing_then_invocation_fails() {
        let mut records = vec![ManifestRecord::new(0, "m", "a/model.json", ROOT_FOLDER)];
        let result = compute_offsets(
            &mut records,
            Path::new("."),
            &StaticIntrospector::new(),
            &table(),
            33.0,
        );
        assert_eq!(
            result,
            Err(OffsetError::MissingTarget {
                key: "33".to_string()
            })
        );
    }

    #[test]
    fn given_per_model_problems_when_computing_then_batch_continues() {
        let dir = model_dir(&["a/model.json", "b/model.json", "c/model.json", "d/model.json"]);
        let introspector = StaticIntrospector::new()
            .with_model("a/model.json", import_info(30.0, 0.0, 100.0))
            .with_model("b/model.json", ModelInfo::default())
            .with_model("d/model.json", import_info(20.0, 0.0, 100.0));
        let mut records = vec![
            ManifestRecord::new(0, "m", "a/model.json", "a"),
            ManifestRecord::new(1, "m", "b/model.json", "b"),
            ManifestRecord::new(2, "m", "c/model.json", "c"),
            ManifestRecord::new(3, "m", "d/model.json", "d"),
            ManifestRecord::new(4, "m", "gone/model.json", "gone"),
        ];

        let report = compute_offsets(&mut records, dir.path(), &introspector, &table(), 50.0)
            .expect("offsets");

        assert_eq!(report.updated, vec!["m3"]);
        let kinds: Vec<(&str, &OffsetError)> = report
            .failures
            .iter()
            .map(|failure| (failure.id.as_str(), &failure.error))
            .collect();
        assert_eq!(kinds[0], ("m0", &OffsetError::MissingRow { key: "30".to_string() }));
        assert_eq!(kinds[1], ("m1", &OffsetError::MissingParameter));
        assert!(matches!(kinds[2].1, OffsetError::Introspection { .. }));
        assert!(matches!(kinds[3].1, OffsetError::MissingDescriptor { .. }));
        assert_eq!(records[0].x, None);
    }

    #[test]
    fn given_manifest_file_when_applying_offsets_then_records_are_rewritten() {
        let dir = model_dir(&["a/model.json"]);
        let manifest_path = dir.path().join("set.jsonl");
        let summary = ManifestSummary {
            motions: vec!["idle".to_string()],
            import: Some(50),
            ..ManifestSummary::default()
        };
        write_manifest(
            &manifest_path,
            &[ManifestRecord::new(0, "m", "a/model.json", "a")],
            &summary,
        )
        .expect("write");
        let introspector =
            StaticIntrospector::new().with_model("a/model.json", import_info(10.0, 0.0, 100.0));

        apply_offsets(&manifest_path, &introspector, &table(), 50.0).expect("apply");

        let manifest = load_manifest(&manifest_path).expect("load");
        assert_eq!(manifest.records[0].x, Some(20.0));
        assert_eq!(manifest.summary, Some(summary));
    }
}
