use std::{
    collections::BTreeSet,
    path::{Path, PathBuf},
};

use anyhow::Result;
use serde::{Deserialize, Serialize};

use super::{
    io::{load_manifest_for_rewrite, write_manifest},
    resolve::resolve_record_path,
};
use crate::descriptor::add_assets;
use crate::reconcile::BatchReport;

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct MergeReport {
    /// Per-descriptor outcome of the asset append.
    pub batch: BatchReport,
    pub new_motions: Vec<String>,
    pub new_expressions: Vec<String>,
    /// Whether the summary line was rewritten.
    pub summary_updated: bool,
}

fn union_sorted(existing: &[String], added: &BTreeSet<String>) -> Vec<String> {
    existing
        .iter()
        .cloned()
        .chain(added.iter().cloned())
        .collect::<BTreeSet<_>>()
        .into_iter()
        .collect()
}

/// Append motion/expression files to every descriptor a manifest references,
/// then fold the new names into the summary.
///
/// The summary becomes the sorted union of its previous names and the added
/// ones; `import` and unknown summary keys are kept. Records are not touched.
pub fn append_and_remerge(manifest_path: &Path, files: &[PathBuf], prefix: &str) -> Result<MergeReport> {
    let manifest = load_manifest_for_rewrite(manifest_path)?;
    let manifest_dir = manifest_path.parent().unwrap_or(Path::new("."));

    let mut report = MergeReport::default();
    let mut new_motions = BTreeSet::new();
    let mut new_expressions = BTreeSet::new();

    for record in &manifest.records {
        let Some(descriptor_path) = resolve_record_path(manifest_dir, &record.path) else {
            report.batch.skip(&record.path, "model descriptor not found");
            continue;
        };

        match add_assets(&descriptor_path, files, prefix) {
            Ok(added) if added.added_count() > 0 => {
                report.batch.succeeded += 1;
                new_motions.extend(added.added_motions);
                new_expressions.extend(added.added_expressions);
            }
            Ok(_) => report.batch.skip(&record.path, "no assets were added"),
            Err(err) => report.batch.fail(&record.path, format!("{err:#}")),
        }
    }

    if report.batch.succeeded > 0 {
        let mut summary = manifest.summary.unwrap_or_default();
        summary.motions = union_sorted(&summary.motions, &new_motions);
        summary.expressions = union_sorted(&summary.expressions, &new_expressions);
        write_manifest(manifest_path, &manifest.records, &summary)?;
        report.summary_updated = true;
    }

    report.new_motions = new_motions.into_iter().collect();
    report.new_expressions = new_expressions.into_iter().collect();
    Ok(report)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::descriptor::load_descriptor;
    use crate::manifest::{ManifestRecord, ManifestSummary, io::load_manifest};
    use pretty_assertions::assert_eq;
    use serde_json::json;
    use std::fs;

    fn write_model(path: &Path) {
        fs::create_dir_all(path.parent().expect("parent")).expect("dirs");
        let body = json!({
            "version": "1", "layout": {}, "model": "m.moc",
            "motions": {"idle": [{"file": "idle.mtn"}]}
        });
        fs::write(path, serde_json::to_string_pretty(&body).expect("json")).expect("write");
    }

    #[test]
    fn given_new_assets_when_remerging_then_summary_is_united_and_import_kept() {
        let dir = tempfile::tempdir().expect("tempdir");
        write_model(&dir.path().join("a/model.json"));
        write_model(&dir.path().join("b/model.json"));
        let assets = dir.path().join("assets");
        fs::create_dir_all(&assets).expect("assets");
        fs::write(assets.join("wave.mtn"), "").expect("mtn");
        fs::write(assets.join("smile.exp.json"), "{}").expect("exp");

        let manifest_path = dir.path().join("set.jsonl");
        let records = vec![
            ManifestRecord::new(0, "s", "a/model.json", "a"),
            ManifestRecord::new(1, "s", "b/model.json", "b"),
            ManifestRecord::new(2, "s", "gone/model.json", "gone"),
        ];
        let summary = ManifestSummary {
            motions: vec!["idle".to_string()],
            import: Some(7),
            ..ManifestSummary::default()
        };
        write_manifest(&manifest_path, &records, &summary).expect("write manifest");

        let files = vec![assets.join("wave.mtn"), assets.join("smile.exp.json")];
        let report = append_and_remerge(&manifest_path, &files, "x_").expect("remerge");

        assert_eq!(report.batch.succeeded, 2);
        assert_eq!(report.batch.skipped, 1);
        assert!(report.summary_updated);

        let manifest = load_manifest(&manifest_path).expect("load");
        let summary = manifest.summary.expect("summary");
        assert_eq!(summary.motions, vec!["idle", "x_wave"]);
        assert_eq!(summary.expressions, vec!["x_smile"]);
        assert_eq!(summary.import, Some(7));
        assert_eq!(manifest.records, records);

        let descriptor = load_descriptor(&dir.path().join("a/model.json")).expect("descriptor");
        let motions = descriptor.motions.expect("motions");
        assert_eq!(motions.0["x_wave"][0].file.as_deref(), Some("../assets/wave.mtn"));
    }

    #[test]
    fn given_nothing_added_when_remerging_then_manifest_is_untouched() {
        let dir = tempfile::tempdir().expect("tempdir");
        write_model(&dir.path().join("a/model.json"));
        let manifest_path = dir.path().join("set.jsonl");
        let records = vec![ManifestRecord::new(0, "s", "a/model.json", "a")];
        write_manifest(&manifest_path, &records, &ManifestSummary::default()).expect("write");
        let before = fs::read_to_string(&manifest_path).expect("read");

        let files = vec![dir.path().join("missing.mtn")];
        let report = append_and_remerge(&manifest_path, &files, "").expect("remerge");

        assert!(!report.summary_updated);
        assert_eq!(report.batch.skipped, 1);
        assert_eq!(fs::read_to_string(&manifest_path).expect("read"), before);
    }
}
