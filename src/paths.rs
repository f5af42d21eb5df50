use std::{
    fs, io,
    path::{Component, Path, PathBuf},
};

/// Render a path with forward slashes regardless of the host separator.
pub fn to_slash(path: &Path) -> String {
    path.components()
        .filter_map(|component| match component {
            Component::Normal(part) => Some(part.to_string_lossy().into_owned()),
            Component::ParentDir => Some("..".to_string()),
            _ => None,
        })
        .collect::<Vec<_>>()
        .join("/")
}

/// Compute `path` relative to `base`, walking up with `..` where needed.
///
/// Returns `None` when the two paths do not share a root (for example two
/// different drive letters).
pub fn relative_path(path: &Path, base: &Path) -> Option<PathBuf> {
    let path = std::path::absolute(path).ok()?;
    let base = std::path::absolute(base).ok()?;

    let path_components: Vec<Component<'_>> = path.components().collect();
    let base_components: Vec<Component<'_>> = base.components().collect();

    if path_components.first() != base_components.first() {
        return None;
    }

    let common = path_components
        .iter()
        .zip(base_components.iter())
        .take_while(|(left, right)| left == right)
        .count();

    let mut relative = PathBuf::new();
    for _ in common..base_components.len() {
        relative.push("..");
    }
    for component in &path_components[common..] {
        relative.push(component.as_os_str());
    }
    Some(relative)
}

/// Relative forward-slash path, falling back to the bare file name when no
/// relative path exists.
pub fn relative_or_file_name(path: &Path, base: &Path) -> String {
    match relative_path(path, base) {
        Some(relative) => to_slash(&relative),
        None => path
            .file_name()
            .map(|name| name.to_string_lossy().into_owned())
            .unwrap_or_default(),
    }
}

/// Strip surrounding whitespace and quotes from a user-supplied path.
pub fn sanitize_path(raw: &str) -> String {
    raw.trim().trim_matches('"').trim_matches('\'').to_string()
}

/// Read a directory and return its entries sorted by file name.
pub fn sorted_entries(dir: &Path) -> io::Result<Vec<PathBuf>> {
    let mut entries = fs::read_dir(dir)?
        .map(|entry| entry.map(|entry| entry.path()))
        .collect::<io::Result<Vec<_>>>()?;
    entries.sort_by(|left, right| left.file_name().cmp(&right.file_name()));
    Ok(entries)
}

/// Case-insensitive check for a `.json` file name.
pub fn has_json_extension(path: &Path) -> bool {
    path.extension()
        .map(|ext| ext.eq_ignore_ascii_case("json"))
        .unwrap_or(false)
}
