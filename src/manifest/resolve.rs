use std::path::{Path, PathBuf};

use walkdir::WalkDir;

use crate::paths::sanitize_path;

const GAME_DIR: &str = "game";
const FIGURE_DIR: &str = "figure";
const DESCRIPTOR_FILE_NAME: &str = "model.json";

/// Strip quotes and leading `./`, use forward slashes, and drop a leading
/// `game/` segment.
pub fn normalize_record_path(raw: &str) -> String {
    let mut relative = sanitize_path(raw).replace('\\', "/");
    while let Some(rest) = relative.strip_prefix("./") {
        relative = rest.to_string();
    }
    match relative.strip_prefix("game/") {
        Some(rest) => rest.to_string(),
        None => relative,
    }
}

/// Nearest ancestor of `start_dir` (inclusive) named `game`, else `start_dir`.
pub fn find_game_root(start_dir: &Path) -> PathBuf {
    start_dir
        .ancestors()
        .find(|dir| dir.file_name().is_some_and(|name| name == GAME_DIR))
        .unwrap_or(start_dir)
        .to_path_buf()
}

/// Locate the descriptor a manifest record's `path` refers to.
///
/// # Arguments
///
/// * `manifest_dir` - Directory containing the manifest file
/// * `raw` - The record's `path` value as written
///
/// # Returns
///
/// The first existing candidate, tried in order: the raw path when absolute,
/// `<manifest_dir>/<rel>`, `<game>/<rel>`, `<game>/figure/<rel>`, and finally
/// a `model.json` below `<game>` whose path ends with `<rel>`
/// (case-insensitive).
pub fn resolve_record_path(manifest_dir: &Path, raw: &str) -> Option<PathBuf> {
    let trimmed = sanitize_path(raw);
    if trimmed.is_empty() {
        return None;
    }

    let raw_path = Path::new(&trimmed);
    if raw_path.is_absolute() && raw_path.is_file() {
        return Some(raw_path.to_path_buf());
    }

    let relative = normalize_record_path(&trimmed);
    let game_root = find_game_root(manifest_dir);

    let candidates = [
        manifest_dir.join(&relative),
        game_root.join(&relative),
        game_root.join(FIGURE_DIR).join(&relative),
    ];
    if let Some(found) = candidates.into_iter().find(|candidate| candidate.is_file()) {
        return Some(found);
    }

    let tail = relative.to_lowercase();
    WalkDir::new(&game_root)
        .sort_by_file_name()
        .into_iter()
        .filter_map(|entry| entry.ok())
        .filter(|entry| entry.file_type().is_file())
        .filter(|entry| {
            entry
                .file_name()
                .to_string_lossy()
                .eq_ignore_ascii_case(DESCRIPTOR_FILE_NAME)
        })
        .find(|entry| {
            let full = entry.path().to_string_lossy().replace('\\', "/").to_lowercase();
            full.ends_with(&tail)
        })
        .map(|entry| entry.into_path())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;

    fn touch(path: &Path) {
        fs::create_dir_all(path.parent().expect("parent")).expect("create dirs");
        fs::write(path, "{}").expect("write");
    }

    #[test]
    fn given_quoted_game_prefixed_path_when_normalizing_then_it_is_cleaned() {
        assert_eq!(normalize_record_path("\"./game\\figure\\a\\model.json\""), "figure/a/model.json");
        assert_eq!(normalize_record_path("a/model.json"), "a/model.json");
    }

    #[test]
    fn given_nested_manifest_when_finding_game_root_then_ancestor_is_used() {
        let dir = tempfile::tempdir().expect("tempdir");
        let nested = dir.path().join("game").join("figure").join("set");
        assert_eq!(find_game_root(&nested), dir.path().join("game"));

        let elsewhere = dir.path().join("other");
        assert_eq!(find_game_root(&elsewhere), elsewhere);
    }

    #[test]
    fn given_path_relative_to_manifest_when_resolving_then_it_is_found() {
        let dir = tempfile::tempdir().expect("tempdir");
        let descriptor = dir.path().join("a").join("model.json");
        touch(&descriptor);

        assert_eq!(resolve_record_path(dir.path(), "a/model.json"), Some(descriptor));
    }

    #[test]
    fn given_path_relative_to_figure_when_resolving_then_figure_dir_is_tried() {
        let dir = tempfile::tempdir().expect("tempdir");
        let game = dir.path().join("game");
        let descriptor = game.join("figure").join("char").join("model.json");
        touch(&descriptor);
        let manifest_dir = game.join("scripts");
        fs::create_dir_all(&manifest_dir).expect("manifest dir");

        assert_eq!(
            resolve_record_path(&manifest_dir, "game/char/model.json"),
            Some(descriptor)
        );
    }

    #[test]
    fn given_only_a_tail_match_when_resolving_then_walk_finds_it() {
        let dir = tempfile::tempdir().expect("tempdir");
        let game = dir.path().join("game");
        let descriptor = game.join("deep").join("Pack").join("Hair").join("model.json");
        touch(&descriptor);

        assert_eq!(resolve_record_path(&game, "pack/hair/model.json"), Some(descriptor));
        assert_eq!(resolve_record_path(&game, "nothing/model.json"), None);
        assert_eq!(resolve_record_path(&game, "  "), None);
    }
}
