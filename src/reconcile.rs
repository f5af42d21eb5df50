use std::{
    collections::HashSet,
    path::{Path, PathBuf},
};

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};

use crate::descriptor::{
    ExpressionEntry, ModelDescriptor, MotionEntry, entry_exists, load_descriptor, save_descriptor,
};
use crate::manifest::{io::load_manifest, resolve::resolve_record_path};

/// What to do with entries whose referenced file does not exist.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MissingPolicy {
    /// Remove missing entries.
    #[default]
    Drop,
    /// Keep missing entries in place; they are still reported.
    Keep,
    /// Keep missing entries until the caller decides once for the whole set
    /// through [`ReconcileOutcome::resolve`].
    Report,
}

/// Where a missing reference was found.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum MissingEntry {
    Motion { group: String, file: String },
    Expression { name: Option<String>, file: String },
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ReconcileOutcome {
    pub descriptor: ModelDescriptor,
    pub missing: Vec<MissingEntry>,
    pub duplicates_removed: usize,
    /// Entries dropped because their `file` was empty or absent.
    pub invalid_removed: usize,
    /// True under [`MissingPolicy::Report`] while missing entries await a decision.
    pub decision_pending: bool,
}

impl ReconcileOutcome {
    /// Apply the caller's single keep/drop decision for all missing entries.
    pub fn resolve(mut self, drop_missing: bool) -> ModelDescriptor {
        if drop_missing && !self.missing.is_empty() {
            let missing_motions: HashSet<(&str, &str)> = self
                .missing
                .iter()
                .filter_map(|entry| match entry {
                    MissingEntry::Motion { group, file } => Some((group.as_str(), file.as_str())),
                    MissingEntry::Expression { .. } => None,
                })
                .collect();
            let missing_expressions: HashSet<&str> = self
                .missing
                .iter()
                .filter_map(|entry| match entry {
                    MissingEntry::Expression { file, .. } => Some(file.as_str()),
                    MissingEntry::Motion { .. } => None,
                })
                .collect();

            if let Some(motions) = self.descriptor.motions.as_mut() {
                for (group, entries) in motions.0.iter_mut() {
                    entries.retain(|entry| {
                        let file = entry.file.as_deref().unwrap_or_default();
                        !missing_motions.contains(&(group.as_str(), file))
                    });
                }
                motions.compact();
            }
            if let Some(expressions) = self.descriptor.expressions.as_mut() {
                expressions.retain(|entry| {
                    let file = entry.file.as_deref().unwrap_or_default();
                    !missing_expressions.contains(file)
                });
            }
        }
        self.descriptor
    }
}

/// Per-list bookkeeping shared by the motion and expression passes.
#[derive(Default)]
struct Tally {
    duplicates: usize,
    invalid: usize,
}

/// Deduplicate a list by `file`, keeping the last occurrence in its place.
///
/// Returns the surviving entries in original order together with the files
/// that do not exist below `base_dir`.
fn dedup_last_wins<T>(
    entries: Vec<T>,
    file_of: impl Fn(&T) -> Option<&str>,
    base_dir: &Path,
    keep_missing: bool,
    tally: &mut Tally,
) -> (Vec<T>, Vec<T>)
where
    T: Clone,
{
    let mut seen = HashSet::<String>::new();
    let mut kept = Vec::with_capacity(entries.len());
    let mut missing = Vec::new();

    for entry in entries.into_iter().rev() {
        let file = match file_of(&entry) {
            Some(file) if !file.is_empty() => file.to_string(),
            _ => {
                tally.invalid += 1;
                continue;
            }
        };
        if !seen.insert(file.clone()) {
            tally.duplicates += 1;
            continue;
        }
        if entry_exists(base_dir, &file) {
            kept.push(entry);
        } else {
            missing.push(entry.clone());
            if keep_missing {
                kept.push(entry);
            }
        }
    }

    kept.reverse();
    missing.reverse();
    (kept, missing)
}

/// Remove duplicate and dangling motion/expression references.
///
/// Every motion group is deduplicated on its own; within a group the
/// last-inserted entry for a file survives. Empty groups are removed.
///
/// The same file listed under two groups stays in both. The Python
/// `live2d_tool` dedup shared one seen-set across all groups and kept only
/// one of them.
pub fn reconcile(
    descriptor: &ModelDescriptor,
    base_dir: &Path,
    policy: MissingPolicy,
) -> ReconcileOutcome {
    let keep_missing = policy != MissingPolicy::Drop;
    let mut descriptor = descriptor.clone();
    let mut tally = Tally::default();
    let mut missing = Vec::<MissingEntry>::new();

    if let Some(motions) = descriptor.motions.as_mut() {
        for (group, entries) in motions.0.iter_mut() {
            let (kept, group_missing) = dedup_last_wins(
                std::mem::take(entries),
                |entry: &MotionEntry| entry.file.as_deref(),
                base_dir,
                keep_missing,
                &mut tally,
            );
            *entries = kept;
            missing.extend(group_missing.into_iter().map(|entry| MissingEntry::Motion {
                group: group.clone(),
                file: entry.file.unwrap_or_default(),
            }));
        }
        motions.compact();
    }

    if let Some(expressions) = descriptor.expressions.as_mut() {
        let (kept, expression_missing) = dedup_last_wins(
            std::mem::take(expressions),
            |entry: &ExpressionEntry| entry.file.as_deref(),
            base_dir,
            keep_missing,
            &mut tally,
        );
        *expressions = kept;
        missing.extend(
            expression_missing
                .into_iter()
                .map(|entry| MissingEntry::Expression {
                    name: entry.name,
                    file: entry.file.unwrap_or_default(),
                }),
        );
    }

    ReconcileOutcome {
        decision_pending: policy == MissingPolicy::Report && !missing.is_empty(),
        descriptor,
        missing,
        duplicates_removed: tally.duplicates,
        invalid_removed: tally.invalid,
    }
}

/// Repair a descriptor file in place.
///
/// Under [`MissingPolicy::Report`] the missing entries are kept; callers that
/// want to decide first should use [`reconcile`] and
/// [`ReconcileOutcome::resolve`] directly.
pub fn repair_descriptor_file(path: &Path, policy: MissingPolicy) -> Result<ReconcileOutcome> {
    let descriptor = load_descriptor(path)?;
    let base_dir = path.parent().unwrap_or(Path::new("."));
    let outcome = reconcile(&descriptor, base_dir, policy);
    save_descriptor(path, &outcome.descriptor)?;
    Ok(outcome)
}

/// One per-item problem of a batch operation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BatchIssue {
    pub item: String,
    pub message: String,
}

/// Counts reported by bulk operations; partial success is normal.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct BatchReport {
    pub succeeded: usize,
    pub skipped: usize,
    pub failed: usize,
    pub issues: Vec<BatchIssue>,
}

impl BatchReport {
    pub fn skip(&mut self, item: impl Into<String>, message: impl Into<String>) {
        self.skipped += 1;
        self.issues.push(BatchIssue {
            item: item.into(),
            message: message.into(),
        });
    }

    pub fn fail(&mut self, item: impl Into<String>, message: impl Into<String>) {
        self.failed += 1;
        self.issues.push(BatchIssue {
            item: item.into(),
            message: message.into(),
        });
    }
}

/// Repair every descriptor referenced by a manifest.
pub fn repair_manifest_descriptors(
    manifest_path: &Path,
    policy: MissingPolicy,
) -> Result<BatchReport> {
    let manifest = load_manifest(manifest_path)?;
    let manifest_dir = manifest_path.parent().unwrap_or(Path::new("."));

    let mut report = BatchReport::default();
    for record in &manifest.records {
        let Some(path) = resolve_record_path(manifest_dir, &record.path) else {
            report.skip(&record.path, "model descriptor not found");
            continue;
        };
        match repair_descriptor_file(&path, policy) {
            Ok(_) => report.succeeded += 1,
            Err(err) => report.fail(&record.path, format!("{err:#}")),
        }
    }
    Ok(report)
}

/// Repair each descriptor of an explicit list.
pub fn repair_descriptor_files(paths: &[PathBuf], policy: MissingPolicy) -> BatchReport {
    let mut report = BatchReport::default();
    for path in paths {
        let item = path.display().to_string();
        if !path.is_file() {
            report.skip(item, "file does not exist");
            continue;
        }
        match repair_descriptor_file(path, policy)
            .with_context(|| format!("failed to repair {}", path.display()))
        {
            Ok(_) => report.succeeded += 1,
            Err(err) => report.fail(item, format!("{err:#}")),
        }
    }
    report
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::descriptor::Motions;
    use pretty_assertions::assert_eq;
    use serde_json::json;
    use std::fs;

    fn touch(dir: &Path, names: &[&str]) {
        for name in names {
            let path = dir.join(name);
            if let Some(parent) = path.parent() {
                fs::create_dir_all(parent).expect("create parent");
            }
            fs::write(path, "").expect("touch");
        }
    }

    fn descriptor(value: serde_json::Value) -> ModelDescriptor {
        serde_json::from_value(value).expect("descriptor fixture")
    }

    fn files(entries: &[MotionEntry]) -> Vec<&str> {
        entries
            .iter()
            .map(|entry| entry.file.as_deref().unwrap_or_default())
            .collect()
    }

    #[test]
    fn given_duplicate_motion_when_reconciling_then_last_occurrence_wins() {
        let dir = tempfile::tempdir().expect("tempdir");
        touch(dir.path(), &["a", "b"]);
        let source = descriptor(json!({
            "motions": {"idle": [{"file": "a", "tag": 1}, {"file": "b"}, {"file": "a", "tag": 2}]}
        }));

        let outcome = reconcile(&source, dir.path(), MissingPolicy::Drop);

        let motions = outcome.descriptor.motions.expect("motions");
        assert_eq!(files(&motions.0["idle"]), vec!["b", "a"]);
        assert_eq!(motions.0["idle"][1].extra["tag"], json!(2));
        assert_eq!(outcome.duplicates_removed, 1);
    }

    #[test]
    fn given_same_file_in_two_groups_when_reconciling_then_both_groups_keep_it() {
        let dir = tempfile::tempdir().expect("tempdir");
        touch(dir.path(), &["a"]);
        let source = descriptor(json!({
            "motions": {"idle": [{"file": "a"}], "tap": [{"file": "a"}]}
        }));

        let outcome = reconcile(&source, dir.path(), MissingPolicy::Drop);

        let motions = outcome.descriptor.motions.expect("motions");
        assert_eq!(motions.0.len(), 2);
    }

    #[test]
    fn given_dangling_motion_when_policy_is_drop_then_empty_group_is_removed() {
        let dir = tempfile::tempdir().expect("tempdir");
        touch(dir.path(), &["mtn/idle.mtn"]);
        let source = descriptor(json!({
            "motions": {
                "idle": [{"file": "mtn/idle.mtn"}],
                "gone": [{"file": "mtn/gone.mtn"}]
            }
        }));

        let outcome = reconcile(&source, dir.path(), MissingPolicy::Drop);

        let motions = outcome.descriptor.motions.expect("motions");
        assert_eq!(motions.names().collect::<Vec<_>>(), vec!["idle"]);
        assert_eq!(
            outcome.missing,
            vec![MissingEntry::Motion {
                group: "gone".to_string(),
                file: "mtn/gone.mtn".to_string()
            }]
        );
        assert!(!outcome.decision_pending);
    }

    #[test]
    fn given_dangling_expression_when_policy_is_keep_then_entry_stays_in_place() {
        let dir = tempfile::tempdir().expect("tempdir");
        touch(dir.path(), &["smile.exp.json"]);
        let source = descriptor(json!({
            "expressions": [
                {"name": "gone", "file": "gone.exp.json"},
                {"name": "smile", "file": "smile.exp.json"}
            ]
        }));

        let outcome = reconcile(&source, dir.path(), MissingPolicy::Keep);

        let names: Vec<_> = outcome
            .descriptor
            .expressions
            .as_ref()
            .expect("expressions")
            .iter()
            .filter_map(|entry| entry.name.clone())
            .collect();
        assert_eq!(names, vec!["gone", "smile"]);
        assert_eq!(outcome.missing.len(), 1);
    }

    #[test]
    fn given_report_policy_when_caller_drops_then_missing_entries_are_removed() {
        let dir = tempfile::tempdir().expect("tempdir");
        touch(dir.path(), &["a"]);
        let source = descriptor(json!({
            "motions": {"idle": [{"file": "a"}], "gone": [{"file": "x"}]},
            "expressions": [{"name": "gone", "file": "y"}]
        }));

        let outcome = reconcile(&source, dir.path(), MissingPolicy::Report);
        assert!(outcome.decision_pending);
        assert_eq!(outcome.missing.len(), 2);

        let resolved = outcome.resolve(true);
        let motions = resolved.motions.expect("motions");
        assert_eq!(motions.names().collect::<Vec<_>>(), vec!["idle"]);
        assert!(resolved.expressions.expect("expressions").is_empty());
    }

    #[test]
    fn given_entry_without_file_when_reconciling_then_it_is_dropped_under_any_policy() {
        let dir = tempfile::tempdir().expect("tempdir");
        let source = descriptor(json!({
            "motions": {"idle": [{"fade_in": 100}, {"file": ""}]}
        }));

        for policy in [MissingPolicy::Drop, MissingPolicy::Keep, MissingPolicy::Report] {
            let outcome = reconcile(&source, dir.path(), policy);
            assert_eq!(outcome.invalid_removed, 2);
            assert_eq!(outcome.descriptor.motions, Some(Motions::default()));
        }
    }

    #[test]
    fn given_reconciled_descriptor_when_reconciling_again_then_output_is_unchanged() {
        let dir = tempfile::tempdir().expect("tempdir");
        touch(dir.path(), &["a", "b", "e1"]);
        let source = descriptor(json!({
            "motions": {
                "idle": [{"file": "a"}, {"file": "x"}, {"file": "b"}, {"file": "a"}],
                "tap": [{"file": "x"}, {"file": "x"}]
            },
            "expressions": [
                {"name": "e", "file": "e1"},
                {"name": "f", "file": "missing"},
                {"name": "e", "file": "e1"}
            ]
        }));

        for policy in [MissingPolicy::Drop, MissingPolicy::Keep] {
            let once = reconcile(&source, dir.path(), policy).descriptor;
            let twice = reconcile(&once, dir.path(), policy).descriptor;
            assert_eq!(once, twice);
        }
    }

    #[test]
    fn given_descriptor_file_when_repairing_then_result_is_written_back() {
        let dir = tempfile::tempdir().expect("tempdir");
        touch(dir.path(), &["a.mtn"]);
        let path = dir.path().join("model.json");
        fs::write(
            &path,
            json!({
                "version": "1", "layout": {}, "model": "m.moc",
                "motions": {"idle": [{"file": "a.mtn"}, {"file": "a.mtn"}], "gone": [{"file": "z.mtn"}]}
            })
            .to_string(),
        )
        .expect("write descriptor");

        let outcome = repair_descriptor_file(&path, MissingPolicy::Drop).expect("repair");
        assert_eq!(outcome.duplicates_removed, 1);

        let reloaded = load_descriptor(&path).expect("reload");
        let motions = reloaded.motions.expect("motions");
        assert_eq!(motions.0.len(), 1);
        assert_eq!(motions.0["idle"].len(), 1);
    }

    #[test]
    fn given_missing_file_in_list_when_repairing_batch_then_it_is_skipped() {
        let dir = tempfile::tempdir().expect("tempdir");
        let report = repair_descriptor_files(&[dir.path().join("none.json")], MissingPolicy::Drop);
        assert_eq!(report.skipped, 1);
        assert_eq!(report.succeeded, 0);
    }
}
