//! Batch edits of `NAME=value` lines in text `.mtn` motion files.

use std::{
    fs,
    path::{Path, PathBuf},
};

use anyhow::{Context, Result, bail};
use walkdir::WalkDir;

use crate::descriptor::MOTION_SUFFIX;
use crate::reconcile::BatchReport;

fn is_param_line(line: &str, name: &str) -> bool {
    line.trim()
        .strip_prefix(name)
        .is_some_and(|rest| rest.starts_with('='))
}

/// Replace the first `name=` line with `name=value`, or append one.
pub fn set_param_line(text: &str, name: &str, value: &str) -> String {
    let replacement = format!("{name}={value}");
    let mut lines: Vec<&str> = text.lines().collect();

    match lines.iter().position(|line| is_param_line(line, name)) {
        Some(at) => lines[at] = &replacement,
        None => lines.push(&replacement),
    }

    let mut output = lines.join("\n");
    output.push('\n');
    output
}

/// Drop every `name=` line. Returns `None` when nothing matched.
pub fn remove_param_lines(text: &str, name: &str) -> Option<String> {
    let lines: Vec<&str> = text.lines().collect();
    let kept: Vec<&str> = lines
        .iter()
        .copied()
        .filter(|line| !is_param_line(line, name))
        .collect();
    if kept.len() == lines.len() {
        return None;
    }

    let mut output = kept.join("\n");
    if !output.is_empty() {
        output.push('\n');
    }
    Some(output)
}

fn motion_files(dir: &Path) -> Result<Vec<PathBuf>> {
    if !dir.is_dir() {
        bail!("not a directory: {}", dir.display());
    }
    Ok(WalkDir::new(dir)
        .sort_by_file_name()
        .into_iter()
        .filter_map(|entry| entry.ok())
        .filter(|entry| entry.file_type().is_file())
        .filter(|entry| entry.file_name().to_string_lossy().ends_with(MOTION_SUFFIX))
        .map(|entry| entry.into_path())
        .collect())
}

fn edit_file(path: &Path, edit: impl Fn(&str) -> Option<String>) -> Result<bool> {
    let text = fs::read_to_string(path)
        .with_context(|| format!("failed to read motion file: {}", path.display()))?;
    let Some(updated) = edit(&text) else {
        return Ok(false);
    };
    fs::write(path, updated)
        .with_context(|| format!("failed to write motion file: {}", path.display()))?;
    Ok(true)
}

fn edit_all(dir: &Path, edit: impl Fn(&str) -> Option<String>, unchanged: &str) -> Result<BatchReport> {
    let mut report = BatchReport::default();
    for path in motion_files(dir)? {
        match edit_file(&path, &edit) {
            Ok(true) => report.succeeded += 1,
            Ok(false) => report.skip(path.display().to_string(), unchanged),
            Err(err) => report.fail(path.display().to_string(), format!("{err:#}")),
        }
    }
    Ok(report)
}

/// Set `name=value` in every `.mtn` file below `dir`.
pub fn set_mtn_param(dir: &Path, name: &str, value: &str) -> Result<BatchReport> {
    edit_all(dir, |text| Some(set_param_line(text, name, value)), "unchanged")
}

/// Remove the `name=` lines of every `.mtn` file below `dir`.
pub fn remove_mtn_param(dir: &Path, name: &str) -> Result<BatchReport> {
    edit_all(
        dir,
        |text| remove_param_lines(text, name),
        &format!("no {name} line"),
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    const MOTION: &str = "# Live2D Animator Motion Data\n$fps=30\nPARAM_ANGLE_X=0,1,2\nPARAM_IMPORT=10\nPARAM_IMPORT_2=3\n";

    #[test]
    fn given_existing_line_when_setting_then_only_exact_name_is_replaced() {
        let updated = set_param_line(MOTION, "PARAM_IMPORT", "50");
        assert_eq!(
            updated,
            "# Live2D Animator Motion Data\n$fps=30\nPARAM_ANGLE_X=0,1,2\nPARAM_IMPORT=50\nPARAM_IMPORT_2=3\n"
        );
    }

    #[test]
    fn given_no_line_and_no_trailing_newline_when_setting_then_line_is_appended() {
        assert_eq!(set_param_line("$fps=30", "PARAM_IMPORT", "7"), "$fps=30\nPARAM_IMPORT=7\n");
    }

    #[test]
    fn given_lines_when_removing_then_matches_are_dropped_or_none() {
        assert_eq!(
            remove_param_lines(MOTION, "PARAM_IMPORT").as_deref(),
            Some("# Live2D Animator Motion Data\n$fps=30\nPARAM_ANGLE_X=0,1,2\nPARAM_IMPORT_2=3\n")
        );
        assert_eq!(remove_param_lines("$fps=30\n", "PARAM_IMPORT"), None);
    }

    #[test]
    fn given_directory_when_batch_editing_then_counts_are_reported() {
        let dir = tempfile::tempdir().expect("tempdir");
        fs::create_dir_all(dir.path().join("nested")).expect("dirs");
        fs::write(dir.path().join("a.mtn"), MOTION).expect("write a");
        fs::write(dir.path().join("nested/b.mtn"), "$fps=30\n").expect("write b");
        fs::write(dir.path().join("notes.txt"), "PARAM_IMPORT=1\n").expect("write txt");

        let report = set_mtn_param(dir.path(), "PARAM_IMPORT", "50").expect("set");
        assert_eq!(report.succeeded, 2);
        assert!(fs::read_to_string(dir.path().join("nested/b.mtn"))
            .expect("read b")
            .ends_with("PARAM_IMPORT=50\n"));

        fs::write(dir.path().join("nested/b.mtn"), "$fps=30\n").expect("reset b");
        let report = remove_mtn_param(dir.path(), "PARAM_IMPORT").expect("remove");
        assert_eq!(report.succeeded, 1);
        assert_eq!(report.skipped, 1);
        assert_eq!(
            fs::read_to_string(dir.path().join("notes.txt")).expect("read txt"),
            "PARAM_IMPORT=1\n"
        );
    }

    #[test]
    fn given_missing_directory_when_batch_editing_then_error_is_returned() {
        let dir = tempfile::tempdir().expect("tempdir");
        assert!(set_mtn_param(&dir.path().join("nope"), "PARAM_IMPORT", "1").is_err());
    }
}
