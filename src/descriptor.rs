use std::{
    collections::BTreeSet,
    fs,
    path::{Path, PathBuf},
};

use anyhow::{Context, Result};
use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value, json};
use walkdir::WalkDir;

use crate::paths::{has_json_extension, relative_or_file_name, sorted_entries, to_slash};

/// Keys a JSON file must carry to be treated as a Live2D model descriptor.
pub const REQUIRED_KEYS: [&str; 3] = ["version", "layout", "model"];

const MOTIONS_KEY: &str = "motions";
const EXPRESSIONS_KEY: &str = "expressions";
const INIT_OPACITIES_KEY: &str = "init_opacities";
const INIT_PARAMS_KEY: &str = "init_params";

// ─── Entry types ──────────────────────────────────────────────────────────────

/// A single motion reference inside a motion group.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct MotionEntry {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub file: Option<String>,
    /// Any other keys (`fade_in`, `fade_out`, `sound`, ...), kept verbatim.
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl MotionEntry {
    pub fn new(file: impl Into<String>) -> Self {
        Self {
            file: Some(file.into()),
            extra: Map::new(),
        }
    }
}

/// A named expression reference.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ExpressionEntry {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub file: Option<String>,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl ExpressionEntry {
    pub fn new(name: impl Into<String>, file: impl Into<String>) -> Self {
        Self {
            name: Some(name.into()),
            file: Some(file.into()),
            extra: Map::new(),
        }
    }
}

/// Initial opacity override for one model part.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PartOpacity {
    #[serde(rename = "id")]
    pub part_id: String,
    pub value: f64,
}

/// Initial value override for one model parameter.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ParamValue {
    pub id: String,
    pub value: f64,
}

// ─── Shape variants ───────────────────────────────────────────────────────────

/// Motion entry in the flat list layout, carrying its group name inline.
#[derive(Debug, Clone, Deserialize)]
pub struct NamedMotion {
    pub name: String,
    #[serde(flatten)]
    pub entry: MotionEntry,
}

/// The two motion layouts found in the wild.
#[derive(Debug, Clone, Deserialize)]
#[serde(untagged)]
pub enum MotionsRepresentation {
    Grouped(IndexMap<String, Vec<MotionEntry>>),
    Flat(Vec<NamedMotion>),
}

/// Motion groups keyed by motion name, in file order.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(from = "MotionsRepresentation")]
pub struct Motions(pub IndexMap<String, Vec<MotionEntry>>);

impl From<MotionsRepresentation> for Motions {
    fn from(value: MotionsRepresentation) -> Self {
        match value {
            MotionsRepresentation::Grouped(groups) => Motions(groups),
            MotionsRepresentation::Flat(list) => {
                let mut groups: IndexMap<String, Vec<MotionEntry>> = IndexMap::new();
                for motion in list {
                    groups.entry(motion.name).or_default().push(motion.entry);
                }
                Motions(groups)
            }
        }
    }
}

impl Motions {
    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.0.keys().map(String::as_str)
    }

    pub fn push(&mut self, name: impl Into<String>, entry: MotionEntry) {
        self.0.entry(name.into()).or_default().push(entry);
    }

    /// Drop groups that no longer hold any entry.
    pub fn compact(&mut self) {
        self.0.retain(|_, entries| !entries.is_empty());
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(untagged)]
enum KeyedExpression {
    File(String),
    Entry(ExpressionEntry),
}

#[derive(Debug, Clone, Deserialize)]
#[serde(untagged)]
enum ExpressionsRepresentation {
    List(Vec<ExpressionEntry>),
    Keyed(IndexMap<String, KeyedExpression>),
}

impl From<ExpressionsRepresentation> for Vec<ExpressionEntry> {
    fn from(value: ExpressionsRepresentation) -> Self {
        match value {
            ExpressionsRepresentation::List(list) => list,
            ExpressionsRepresentation::Keyed(map) => map
                .into_iter()
                .map(|(name, expression)| match expression {
                    KeyedExpression::File(file) => ExpressionEntry::new(name, file),
                    KeyedExpression::Entry(mut entry) => {
                        entry.name.get_or_insert(name);
                        entry
                    }
                })
                .collect(),
        }
    }
}

// ─── Descriptor ───────────────────────────────────────────────────────────────

/// A Live2D `model.json` descriptor.
///
/// Motions, expressions and the init override lists are typed; every other
/// key stays in `other` so a read-modify-write keeps the file's key order
/// and content intact.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(try_from = "Map<String, Value>", into = "Map<String, Value>")]
pub struct ModelDescriptor {
    pub motions: Option<Motions>,
    pub expressions: Option<Vec<ExpressionEntry>>,
    pub init_opacities: Option<Vec<PartOpacity>>,
    pub init_params: Option<Vec<ParamValue>>,
    pub other: Map<String, Value>,
}

fn take_typed<T: serde::de::DeserializeOwned>(
    map: &mut Map<String, Value>,
    key: &str,
) -> Result<Option<T>, serde_json::Error> {
    match map.get_mut(key) {
        None => Ok(None),
        Some(value) if value.is_null() => Ok(None),
        // The key keeps its slot in `other` as a null placeholder.
        Some(value) => serde_json::from_value(value.take()).map(Some),
    }
}

impl TryFrom<Map<String, Value>> for ModelDescriptor {
    type Error = serde_json::Error;

    fn try_from(mut map: Map<String, Value>) -> Result<Self, Self::Error> {
        let motions = take_typed::<Motions>(&mut map, MOTIONS_KEY)?;
        let expressions = take_typed::<ExpressionsRepresentation>(&mut map, EXPRESSIONS_KEY)?
            .map(Vec::<ExpressionEntry>::from);
        let init_opacities = take_typed(&mut map, INIT_OPACITIES_KEY)?;
        let init_params = take_typed(&mut map, INIT_PARAMS_KEY)?;

        Ok(Self {
            motions,
            expressions,
            init_opacities,
            init_params,
            other: map,
        })
    }
}

fn put_typed<T: Serialize>(map: &mut Map<String, Value>, key: &str, value: Option<&T>) {
    match value.map(serde_json::to_value) {
        Some(Ok(value)) => {
            map.insert(key.to_string(), value);
        }
        _ => {
            map.shift_remove(key);
        }
    }
}

impl From<ModelDescriptor> for Map<String, Value> {
    fn from(descriptor: ModelDescriptor) -> Self {
        let mut map = descriptor.other;
        put_typed(&mut map, MOTIONS_KEY, descriptor.motions.as_ref());
        put_typed(&mut map, EXPRESSIONS_KEY, descriptor.expressions.as_ref());
        put_typed(&mut map, INIT_OPACITIES_KEY, descriptor.init_opacities.as_ref());
        put_typed(&mut map, INIT_PARAMS_KEY, descriptor.init_params.as_ref());
        map
    }
}

impl ModelDescriptor {
    /// Path of the binary model geometry, when present.
    pub fn model(&self) -> Option<&str> {
        self.other.get("model").and_then(Value::as_str)
    }

    pub fn motion_names(&self) -> Vec<String> {
        self.motions
            .as_ref()
            .map(|motions| motions.names().map(ToOwned::to_owned).collect())
            .unwrap_or_default()
    }

    /// Distinct expression names, sorted.
    pub fn expression_names(&self) -> BTreeSet<String> {
        self.expressions
            .iter()
            .flatten()
            .filter_map(|entry| entry.name.clone())
            .collect()
    }

    pub fn motions_mut(&mut self) -> &mut Motions {
        self.motions.get_or_insert_with(Motions::default)
    }

    pub fn expressions_mut(&mut self) -> &mut Vec<ExpressionEntry> {
        self.expressions.get_or_insert_with(Vec::new)
    }
}

/// Whether `file`, resolved against `base_dir`, points at an existing file.
pub fn entry_exists(base_dir: &Path, file: &str) -> bool {
    !file.is_empty() && base_dir.join(file).is_file()
}

// ─── Load / save ──────────────────────────────────────────────────────────────

pub fn load_descriptor(path: &Path) -> Result<ModelDescriptor> {
    let content = fs::read_to_string(path)
        .with_context(|| format!("failed to read model descriptor: {}", path.display()))?;
    serde_json::from_str(&content)
        .with_context(|| format!("failed to parse model descriptor: {}", path.display()))
}

/// Write a descriptor with 2-space indentation and non-ASCII kept literal.
pub fn save_descriptor(path: &Path, descriptor: &ModelDescriptor) -> Result<()> {
    let content = serde_json::to_string_pretty(descriptor)
        .context("failed to serialize model descriptor as JSON")?;
    fs::write(path, content)
        .with_context(|| format!("failed to save model descriptor: {}", path.display()))
}

/// Cheap structural check used to filter candidate files during scans.
///
/// Unreadable or malformed files are simply "not a descriptor".
pub fn is_valid_descriptor(path: &Path) -> bool {
    let Ok(content) = fs::read_to_string(path) else {
        return false;
    };
    let Ok(Value::Object(map)) = serde_json::from_str::<Value>(&content) else {
        return false;
    };
    REQUIRED_KEYS.iter().all(|key| map.contains_key(*key))
}

// ─── Directory search ─────────────────────────────────────────────────────────

/// A directory the scanner could not read; the subtree is skipped.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ScanIssue {
    pub path: PathBuf,
    pub message: String,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct DescriptorSearch {
    pub found: Option<PathBuf>,
    pub skipped: Vec<ScanIssue>,
}

/// Find the canonical descriptor of a model folder.
///
/// Files of a directory are checked (sorted by name) before any of its
/// sub-directories, and the first valid descriptor ends the search. Folders
/// deeper than `max_depth` below `folder` are not visited.
pub fn find_descriptor(folder: &Path, max_depth: usize) -> DescriptorSearch {
    let mut search = DescriptorSearch::default();
    search.found = find_descriptor_in(folder, 0, max_depth, &mut search.skipped);
    search
}

fn find_descriptor_in(
    dir: &Path,
    depth: usize,
    max_depth: usize,
    skipped: &mut Vec<ScanIssue>,
) -> Option<PathBuf> {
    let entries = match sorted_entries(dir) {
        Ok(entries) => entries,
        Err(err) => {
            skipped.push(ScanIssue {
                path: dir.to_path_buf(),
                message: err.to_string(),
            });
            return None;
        }
    };

    if let Some(hit) = entries
        .iter()
        .filter(|path| path.is_file() && has_json_extension(path))
        .find(|path| is_valid_descriptor(path))
    {
        return Some(hit.clone());
    }

    if depth >= max_depth {
        return None;
    }

    entries
        .iter()
        .filter(|path| path.is_dir())
        .find_map(|sub| find_descriptor_in(sub, depth + 1, max_depth, skipped))
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct DescriptorScan {
    /// Forward-slash paths relative to the scan root, in sorted walk order.
    pub descriptors: Vec<String>,
    pub skipped: Vec<ScanIssue>,
}

/// List every valid descriptor below `root`.
///
/// Fails only when `root` itself cannot be opened.
pub fn scan_descriptors(root: &Path, max_depth: Option<usize>) -> Result<DescriptorScan> {
    fs::read_dir(root)
        .with_context(|| format!("failed to open root directory: {}", root.display()))?;

    let mut walker = WalkDir::new(root).min_depth(1).sort_by_file_name();
    if let Some(depth) = max_depth {
        walker = walker.max_depth(depth + 1);
    }

    let mut scan = DescriptorScan::default();
    for entry in walker {
        let entry = match entry {
            Ok(entry) => entry,
            Err(err) => {
                scan.skipped.push(ScanIssue {
                    path: err.path().map(Path::to_path_buf).unwrap_or_default(),
                    message: err.to_string(),
                });
                continue;
            }
        };
        let path = entry.path();
        if entry.file_type().is_file() && has_json_extension(path) && is_valid_descriptor(path) {
            if let Ok(relative) = path.strip_prefix(root) {
                scan.descriptors.push(to_slash(relative));
            }
        }
    }
    Ok(scan)
}

// ─── Asset files ──────────────────────────────────────────────────────────────

pub const MOTION_SUFFIX: &str = ".mtn";
pub const EXPRESSION_SUFFIX: &str = ".exp.json";
const PHYSICS_SUFFIX: &str = ".physics.json";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AssetKind {
    Motion,
    Expression,
}

/// Classify a motion/expression file and derive its entry name.
///
/// `wave.mtn` is the motion `wave`, `smile.exp.json` the expression `smile`.
pub fn classify_asset(path: &Path) -> Option<(AssetKind, String)> {
    let file_name = path.file_name()?.to_string_lossy();
    let lower = file_name.to_ascii_lowercase();
    if lower.ends_with(MOTION_SUFFIX) {
        let stem = &file_name[..file_name.len() - MOTION_SUFFIX.len()];
        return Some((AssetKind::Motion, stem.to_string()));
    }
    if lower.ends_with(EXPRESSION_SUFFIX) {
        let stem = &file_name[..file_name.len() - EXPRESSION_SUFFIX.len()];
        return Some((AssetKind::Expression, stem.to_string()));
    }
    None
}

/// List motion and expression files below `dir`, sorted.
pub fn collect_asset_files(dir: &Path) -> Vec<PathBuf> {
    WalkDir::new(dir)
        .sort_by_file_name()
        .into_iter()
        .filter_map(|entry| entry.ok())
        .filter(|entry| entry.file_type().is_file())
        .map(|entry| entry.into_path())
        .filter(|path| classify_asset(path).is_some())
        .collect()
}

/// Build a fresh descriptor from the files of a Live2D asset folder.
pub fn scan_asset_directory(dir: &Path) -> Result<ModelDescriptor> {
    fs::read_dir(dir)
        .with_context(|| format!("failed to open asset directory: {}", dir.display()))?;

    let mut model = String::new();
    let mut physics: Option<String> = None;
    let mut textures = Vec::<String>::new();
    let mut motions = Motions::default();
    let mut expressions = Vec::<ExpressionEntry>::new();

    for entry in WalkDir::new(dir)
        .sort_by_file_name()
        .into_iter()
        .filter_map(|entry| entry.ok())
        .filter(|entry| entry.file_type().is_file())
    {
        let path = entry.path();
        let Ok(relative) = path.strip_prefix(dir) else {
            continue;
        };
        let relative = to_slash(relative);
        let lower = relative.to_ascii_lowercase();

        if lower.ends_with(".moc") {
            model = relative;
        } else if lower.ends_with(PHYSICS_SUFFIX) {
            physics = Some(relative);
        } else if lower.ends_with(".png") {
            textures.push(relative);
        } else if let Some((kind, name)) = classify_asset(path) {
            match kind {
                AssetKind::Motion => motions.push(name, MotionEntry::new(relative)),
                AssetKind::Expression => expressions.push(ExpressionEntry::new(name, relative)),
            }
        }
    }

    let mut other = json!({
        "version": "Sample 1.0.0",
        "layout": {"center_x": 0, "center_y": 0, "width": 2},
        "hit_areas_custom": {
            "head_x": [-0.25, 1], "head_y": [0.25, 0.2],
            "body_x": [-0.3, 0.2], "body_y": [0.3, -1.9]
        },
        "model": model,
    });
    if let (Some(map), Some(physics)) = (other.as_object_mut(), physics) {
        map.insert("physics".to_string(), Value::String(physics));
    }
    if let Some(map) = other.as_object_mut() {
        map.insert("textures".to_string(), json!(textures));
    }

    Ok(ModelDescriptor {
        motions: Some(motions),
        expressions: Some(expressions),
        init_opacities: None,
        init_params: None,
        other: match other {
            Value::Object(map) => map,
            _ => Map::new(),
        },
    })
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct AddAssetsReport {
    pub added_motions: Vec<String>,
    pub added_expressions: Vec<String>,
    pub missing: Vec<PathBuf>,
    pub unsupported: Vec<PathBuf>,
}

impl AddAssetsReport {
    pub fn added_count(&self) -> usize {
        self.added_motions.len() + self.added_expressions.len()
    }
}

/// Append motion/expression files to a descriptor on disk.
///
/// Entry names get `prefix` prepended. The descriptor is only rewritten when
/// at least one file was added.
pub fn add_assets(descriptor_path: &Path, files: &[PathBuf], prefix: &str) -> Result<AddAssetsReport> {
    let mut descriptor = load_descriptor(descriptor_path)?;
    let base_dir = descriptor_path.parent().unwrap_or(Path::new("."));

    let mut report = AddAssetsReport::default();
    for file in files {
        if !file.exists() {
            report.missing.push(file.clone());
            continue;
        }
        let Some((kind, name)) = classify_asset(file) else {
            report.unsupported.push(file.clone());
            continue;
        };

        let relative = relative_or_file_name(file, base_dir);
        let name = format!("{prefix}{name}");
        match kind {
            AssetKind::Motion => {
                descriptor
                    .motions_mut()
                    .push(name.clone(), MotionEntry::new(relative));
                report.added_motions.push(name);
            }
            AssetKind::Expression => {
                descriptor
                    .expressions_mut()
                    .push(ExpressionEntry::new(name.clone(), relative));
                report.added_expressions.push(name);
            }
        }
    }

    if report.added_count() > 0 {
        save_descriptor(descriptor_path, &descriptor)?;
    }
    Ok(report)
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn write(path: &Path, content: &str) {
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent).expect("create parent");
        }
        fs::write(path, content).expect("write fixture");
    }

    const VALID: &str = r#"{"version": "1", "layout": {}, "model": "a.moc"}"#;

    #[test]
    fn given_flat_motion_list_when_parsing_then_groups_are_built() {
        let descriptor: ModelDescriptor = serde_json::from_value(json!({
            "model": "a.moc",
            "motions": [
                {"name": "idle", "file": "idle.mtn"},
                {"name": "wave", "file": "wave.mtn"},
                {"name": "idle", "file": "idle2.mtn"}
            ]
        }))
        .expect("parse descriptor");

        let motions = descriptor.motions.expect("motions");
        assert_eq!(motions.0["idle"].len(), 2);
        assert_eq!(motions.0["wave"][0].file.as_deref(), Some("wave.mtn"));
    }

    #[test]
    fn given_keyed_expressions_when_parsing_then_list_is_built() {
        let descriptor: ModelDescriptor = serde_json::from_value(json!({
            "expressions": {"smile": "exp/smile.exp.json", "sad": {"file": "exp/sad.exp.json"}}
        }))
        .expect("parse descriptor");

        let names = descriptor.expression_names();
        assert_eq!(names.into_iter().collect::<Vec<_>>(), vec!["sad", "smile"]);
    }

    #[test]
    fn given_descriptor_when_round_tripping_then_key_order_and_extras_are_kept() {
        let source = json!({
            "version": "Sample 1.0.0",
            "motions": {"idle": [{"file": "idle.mtn", "fade_in": 200}]},
            "layout": {"center_x": 0},
            "model": "model.moc",
            "expressions": [{"name": "smile", "file": "smile.exp.json"}]
        });

        let descriptor: ModelDescriptor = serde_json::from_value(source.clone()).expect("parse");
        let back = serde_json::to_value(&descriptor).expect("serialize");

        assert_eq!(back, source);
        let keys: Vec<&String> = back.as_object().expect("object").keys().collect();
        assert_eq!(keys, vec!["version", "motions", "layout", "model", "expressions"]);
    }

    #[test]
    fn given_required_keys_when_validating_then_descriptor_is_accepted() {
        let dir = tempfile::tempdir().expect("tempdir");
        let good = dir.path().join("model.json");
        let bad = dir.path().join("other.json");
        let broken = dir.path().join("broken.json");
        write(&good, VALID);
        write(&bad, r#"{"version": "1"}"#);
        write(&broken, "{not json");

        assert!(is_valid_descriptor(&good));
        assert!(!is_valid_descriptor(&bad));
        assert!(!is_valid_descriptor(&broken));
        assert!(!is_valid_descriptor(&dir.path().join("absent.json")));
    }

    #[test]
    fn given_nested_folders_when_finding_then_shallowest_sibling_wins() {
        let dir = tempfile::tempdir().expect("tempdir");
        write(&dir.path().join("a").join("deep").join("model.json"), VALID);
        write(&dir.path().join("b.json"), r#"{"not": "descriptor"}"#);
        write(&dir.path().join("c.json"), VALID);

        let search = find_descriptor(dir.path(), 2);
        assert_eq!(search.found, Some(dir.path().join("c.json")));
    }

    #[test]
    fn given_descriptor_below_depth_limit_when_finding_then_nothing_is_found() {
        let dir = tempfile::tempdir().expect("tempdir");
        write(&dir.path().join("a").join("b").join("c").join("model.json"), VALID);

        assert_eq!(find_descriptor(dir.path(), 2).found, None);
        assert!(find_descriptor(dir.path(), 3).found.is_some());
    }

    #[test]
    fn given_model_tree_when_scanning_then_relative_paths_are_sorted() {
        let dir = tempfile::tempdir().expect("tempdir");
        write(&dir.path().join("b").join("model.json"), VALID);
        write(&dir.path().join("a").join("model.json"), VALID);
        write(&dir.path().join("a").join("notes.json"), "{}");

        let scan = scan_descriptors(dir.path(), None).expect("scan");
        assert_eq!(scan.descriptors, vec!["a/model.json", "b/model.json"]);
    }

    #[test]
    fn given_missing_root_when_scanning_then_error_is_returned() {
        let dir = tempfile::tempdir().expect("tempdir");
        assert!(scan_descriptors(&dir.path().join("nope"), None).is_err());
    }

    #[test]
    fn given_asset_folder_when_scanning_then_descriptor_lists_assets() {
        let dir = tempfile::tempdir().expect("tempdir");
        write(&dir.path().join("model.moc"), "");
        write(&dir.path().join("tex").join("texture_00.png"), "");
        write(&dir.path().join("mtn").join("idle.mtn"), "");
        write(&dir.path().join("exp").join("smile.exp.json"), "{}");

        let descriptor = scan_asset_directory(dir.path()).expect("scan assets");

        assert_eq!(descriptor.model(), Some("model.moc"));
        assert_eq!(descriptor.motion_names(), vec!["idle"]);
        assert!(descriptor.expression_names().contains("smile"));
        assert!(!descriptor.other.contains_key("physics"));
        assert_eq!(descriptor.other["textures"], json!(["tex/texture_00.png"]));
    }

    #[test]
    fn given_new_files_when_adding_assets_then_prefixed_entries_are_appended() {
        let dir = tempfile::tempdir().expect("tempdir");
        let model_path = dir.path().join("model").join("model.json");
        write(&model_path, VALID);
        let motion = dir.path().join("shared").join("wave.mtn");
        let expression = dir.path().join("shared").join("smile.exp.json");
        write(&motion, "");
        write(&expression, "{}");

        let files = vec![
            motion,
            expression,
            dir.path().join("shared").join("absent.mtn"),
            dir.path().join("model").join("model.json"),
        ];
        let report = add_assets(&model_path, &files, "extra_").expect("add assets");

        assert_eq!(report.added_motions, vec!["extra_wave"]);
        assert_eq!(report.added_expressions, vec!["extra_smile"]);
        assert_eq!(report.missing.len(), 1);
        assert_eq!(report.unsupported.len(), 1);

        let descriptor = load_descriptor(&model_path).expect("reload");
        let motions = descriptor.motions.expect("motions");
        assert_eq!(
            motions.0["extra_wave"][0].file.as_deref(),
            Some("../shared/wave.mtn")
        );
    }
}
