use std::path::{Path, PathBuf};

use l2dkit::{
    calibration::CalibrationTable,
    color::{ColorTransform, ResizeInterpolation, format_rgb_code, format_transform_code, match_color_files},
    descriptor::{AddAssetsReport, add_assets, collect_asset_files, scan_descriptors},
    expression::merge_face_expression_files,
    introspect::{CommandIntrospector, ModelIntrospector, StaticIntrospector},
    manifest::{
        Collection, ManifestIssue, ManifestSummary, MergeReport, append_and_remerge, check_manifest,
        collect_to_file,
        conf::{ConfError, convert_conf_file, export_conf},
        edit_summary_import, load_manifest,
    },
    mtn::{remove_mtn_param, set_mtn_param},
    offset::{OffsetError, OffsetReport, apply_offsets},
    opacity::{PartPresets, PresetMatch, apply_preset_batch, detect_preset_file},
    reconcile::{BatchReport, MissingPolicy, repair_descriptor_files, repair_manifest_descriptors},
};
use serde::{Deserialize, Serialize};

use crate::{
    error::AppError,
    log_info, log_warn,
    logging::ResultExt,
    preferences::{Preferences, load_preferences, save_preferences},
};

/// IPC payload for manifest generation.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GenerateManifestRequest {
    pub root_path: String,
    pub output_path: String,
    pub prefix: String,
    /// Descriptor paths relative to the root, in manifest order. Empty means
    /// every descriptor found below the root.
    #[serde(default)]
    pub model_paths: Vec<String>,
}

/// IPC payload for descriptor repair.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RepairRequest {
    #[serde(default)]
    pub descriptor_paths: Vec<String>,
    pub manifest_path: Option<String>,
    #[serde(default)]
    pub policy: MissingPolicy,
}

/// Where model parameters come from: a static info file or an external dump
/// command.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "kind", content = "path", rename_all = "snake_case")]
pub enum IntrospectorSource {
    ModelInfo(String),
    DumpCommand(String),
}

/// IPC payload for offset calculation.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ComputeOffsetsRequest {
    pub manifest_path: String,
    pub table_path: String,
    pub target_body_index: f64,
    pub introspector: IntrospectorSource,
}

/// IPC payload for editing the summary `import` value.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SetImportRequest {
    pub manifest_path: String,
    /// `None` removes the value.
    pub import: Option<i64>,
}

/// IPC payload for adding motion/expression files.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AddAssetsRequest {
    /// Asset files or directories holding them.
    pub asset_paths: Vec<String>,
    pub target_path: String,
    #[serde(default)]
    pub prefix: String,
}

/// IPC payload for a single manifest path.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ManifestRequest {
    pub manifest_path: String,
}

/// IPC payload for manifest → stage script export.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ExportConfRequest {
    pub manifest_path: String,
    pub figure_root: String,
    pub output_dir: String,
}

/// IPC payload for stage script → manifest conversion.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ImportConfRequest {
    pub conf_paths: Vec<String>,
    pub figure_root: String,
}

/// IPC payload for `.mtn` parameter edits.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MtnParamRequest {
    pub dir: String,
    pub name: String,
    /// `None` removes the parameter lines.
    pub value: Option<String>,
}

/// IPC payload for preset detection.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DetectPresetRequest {
    pub descriptor_paths: Vec<String>,
    pub parts_path: String,
}

/// IPC payload for applying part presets.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ApplyPresetRequest {
    pub descriptor_paths: Vec<String>,
    pub parts_path: String,
    pub categories: Vec<String>,
    pub introspector: IntrospectorSource,
}

/// Detected preset of one descriptor.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PresetStatus {
    pub path: String,
    pub preset: PresetMatch,
}

/// IPC payload for merging face expressions.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MergeFacesRequest {
    pub left_path: String,
    pub right_path: String,
    pub face_map_path: String,
    pub output_path: String,
}

/// IPC payload for background colour matching.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ColorMatchRequest {
    pub source_path: String,
    pub target_path: String,
    pub output_path: String,
    #[serde(default)]
    pub interpolation: ResizeInterpolation,
}

/// Colour matching outcome with the ready-to-paste engine commands.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ColorMatchResult {
    pub transform: ColorTransform,
    pub transform_code: String,
    pub rgb_code: String,
}

/// IPC payload for saving preferences.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SavePreferencesRequest {
    pub path: String,
    pub preferences: Preferences,
}

/// IPC payload for loading preferences.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoadPreferencesRequest {
    pub path: String,
}

// ─── Helpers ──────────────────────────────────────────────────────────────────

fn log_batch(label: &str, report: &BatchReport) {
    log_info!(
        "{label}: {} succeeded, {} skipped, {} failed",
        report.succeeded,
        report.skipped,
        report.failed
    );
    for issue in &report.issues {
        log_warn!("{}: {}", issue.item, issue.message);
    }
}

fn to_paths(paths: &[String]) -> Vec<PathBuf> {
    paths.iter().map(PathBuf::from).collect()
}

fn build_introspector(source: &IntrospectorSource) -> Result<Box<dyn ModelIntrospector>, AppError> {
    match source {
        IntrospectorSource::ModelInfo(path) => {
            Ok(Box::new(StaticIntrospector::load(Path::new(path))?))
        }
        IntrospectorSource::DumpCommand(program) => Ok(Box::new(CommandIntrospector::new(program))),
    }
}

/// Surface typed offset errors instead of flattening them.
fn offset_error(error: anyhow::Error) -> AppError {
    match error.downcast::<OffsetError>() {
        Ok(error) => AppError::Offset(error),
        Err(error) => AppError::from(error),
    }
}

fn conf_error(error: anyhow::Error) -> AppError {
    match error.downcast::<ConfError>() {
        Ok(error) => AppError::Conf(error),
        Err(error) => AppError::from(error),
    }
}

// ─── Manifest ─────────────────────────────────────────────────────────────────

/// Generate a manifest through the IPC boundary.
pub fn generate_manifest_ipc(request: GenerateManifestRequest) -> Result<Collection, String> {
    let root = PathBuf::from(&request.root_path);
    let output = PathBuf::from(&request.output_path);
    log_info!("Generating manifest from {}", root.display());

    let models = if request.model_paths.is_empty() {
        let scan = scan_descriptors(&root, None)
            .map_err(AppError::from)
            .log_error(Some("Descriptor scan failed"))?;
        for issue in &scan.skipped {
            log_warn!("Skipped {}: {}", issue.path.display(), issue.message);
        }
        scan.descriptors
    } else {
        request.model_paths
    };

    let collection = collect_to_file(&root, &output, &request.prefix, &models)
        .map_err(AppError::from)
        .log_error(Some("Manifest generation failed"))?;

    for failure in &collection.failures {
        log_warn!("Skipped {}: {}", failure.path, failure.message);
    }
    log_info!(
        "Manifest written: {} ({} records, {} motions, {} expressions)",
        output.display(),
        collection.records.len(),
        collection.summary.motions.len(),
        collection.summary.expressions.len()
    );
    Ok(collection)
}

/// Report structural problems of a manifest through the IPC boundary.
pub fn check_manifest_ipc(request: ManifestRequest) -> Result<Vec<ManifestIssue>, String> {
    let path = PathBuf::from(&request.manifest_path);
    let manifest = load_manifest(&path)
        .map_err(AppError::from)
        .log_error(Some("Manifest check failed"))?;
    let issues = check_manifest(&manifest);
    log_info!("{}: {} issue(s)", path.display(), issues.len());
    Ok(issues)
}

/// Set or remove the summary `import` value through the IPC boundary.
pub fn set_import_ipc(request: SetImportRequest) -> Result<ManifestSummary, String> {
    let path = PathBuf::from(&request.manifest_path);
    let manifest = edit_summary_import(&path, request.import)
        .map_err(AppError::from)
        .log_error(Some("Import edit failed"))?;
    match request.import {
        Some(value) => log_info!("import set to {value}: {}", path.display()),
        None => log_info!("import removed: {}", path.display()),
    }
    Ok(manifest.summary.unwrap_or_default())
}

/// Recompute placement offsets through the IPC boundary.
pub fn compute_offsets_ipc(request: ComputeOffsetsRequest) -> Result<OffsetReport, String> {
    let manifest = PathBuf::from(&request.manifest_path);
    log_info!(
        "Computing offsets for {} (target {})",
        manifest.display(),
        request.target_body_index
    );

    let table = CalibrationTable::load(Path::new(&request.table_path))
        .map_err(AppError::from)
        .log_error(Some("Calibration table unavailable"))?;
    let introspector = build_introspector(&request.introspector).log_error(Some("Model info unavailable"))?;

    let report = apply_offsets(&manifest, introspector.as_ref(), &table, request.target_body_index)
        .map_err(offset_error)
        .log_error(Some("Offset calculation failed"))?;

    log_info!("Offsets updated for {} record(s)", report.updated.len());
    for failure in &report.failures {
        log_warn!("{}: {}", failure.id, failure.error);
    }
    for warning in &report.warnings {
        log_warn!(
            "{} ({}): target {} outside [{}, {}]",
            warning.id,
            warning.path,
            request.target_body_index,
            warning.min,
            warning.max
        );
    }
    Ok(report)
}

/// Export a manifest as a stage script through the IPC boundary.
pub fn export_conf_ipc(request: ExportConfRequest) -> Result<String, String> {
    let conf_path = export_conf(
        Path::new(&request.manifest_path),
        Path::new(&request.figure_root),
        Path::new(&request.output_dir),
    )
    .map_err(conf_error)
    .log_error(Some("Stage script export failed"))?;

    log_info!("Stage script written: {}", conf_path.display());
    Ok(conf_path.to_string_lossy().to_string())
}

/// Convert stage scripts to manifests through the IPC boundary.
///
/// Each script is converted independently; failures are reported per file.
pub fn import_conf_ipc(request: ImportConfRequest) -> Result<BatchReport, String> {
    let figure_root = PathBuf::from(&request.figure_root);
    let mut report = BatchReport::default();

    for conf in &request.conf_paths {
        match convert_conf_file(Path::new(conf), &figure_root) {
            Ok(path) => {
                log_info!("Manifest written: {}", path.display());
                report.succeeded += 1;
            }
            Err(err) => report.fail(conf.as_str(), format!("{:#}", conf_error(err))),
        }
    }

    log_batch("Stage scripts", &report);
    Ok(report)
}

// ─── Descriptors ──────────────────────────────────────────────────────────────

/// Deduplicate and repair descriptors through the IPC boundary.
pub fn repair_descriptors_ipc(request: RepairRequest) -> Result<BatchReport, String> {
    let mut report = BatchReport::default();

    if let Some(manifest) = &request.manifest_path {
        log_info!("Repairing descriptors of {manifest}");
        report = repair_manifest_descriptors(Path::new(manifest), request.policy)
            .map_err(AppError::from)
            .log_error(Some("Manifest unavailable"))?;
    }

    if !request.descriptor_paths.is_empty() {
        let files = repair_descriptor_files(&to_paths(&request.descriptor_paths), request.policy);
        report.succeeded += files.succeeded;
        report.skipped += files.skipped;
        report.failed += files.failed;
        report.issues.extend(files.issues);
    }

    log_batch("Repaired", &report);
    Ok(report)
}

fn expand_assets(paths: &[String]) -> Vec<PathBuf> {
    to_paths(paths)
        .into_iter()
        .flat_map(|path| {
            if path.is_dir() {
                collect_asset_files(&path)
            } else {
                vec![path]
            }
        })
        .collect()
}

/// Add asset files to one descriptor through the IPC boundary.
pub fn add_assets_ipc(request: AddAssetsRequest) -> Result<AddAssetsReport, String> {
    let descriptor = PathBuf::from(&request.target_path);
    let files = expand_assets(&request.asset_paths);
    log_info!("Adding {} file(s) to {}", files.len(), descriptor.display());

    let report = add_assets(&descriptor, &files, &request.prefix)
        .map_err(AppError::from)
        .log_error(Some("Adding assets failed"))?;

    log_info!(
        "Added {} motion(s), {} expression(s)",
        report.added_motions.len(),
        report.added_expressions.len()
    );
    for path in &report.missing {
        log_warn!("Missing: {}", path.display());
    }
    for path in &report.unsupported {
        log_warn!("Unsupported: {}", path.display());
    }
    Ok(report)
}

/// Add asset files to every descriptor of a manifest and merge the summary
/// through the IPC boundary.
pub fn append_and_remerge_ipc(request: AddAssetsRequest) -> Result<MergeReport, String> {
    let manifest = PathBuf::from(&request.target_path);
    let files = expand_assets(&request.asset_paths);
    log_info!("Adding {} file(s) to the models of {}", files.len(), manifest.display());

    let report = append_and_remerge(&manifest, &files, &request.prefix)
        .map_err(AppError::from)
        .log_error(Some("Append and merge failed"))?;

    log_batch("Descriptors", &report.batch);
    if report.summary_updated {
        log_info!(
            "Summary updated: {} new motion(s), {} new expression(s)",
            report.new_motions.len(),
            report.new_expressions.len()
        );
    }
    Ok(report)
}

/// Set or remove a `.mtn` parameter line through the IPC boundary.
pub fn mtn_param_ipc(request: MtnParamRequest) -> Result<BatchReport, String> {
    let dir = PathBuf::from(&request.dir);
    let report = match &request.value {
        Some(value) => set_mtn_param(&dir, &request.name, value),
        None => remove_mtn_param(&dir, &request.name),
    }
    .map_err(AppError::from)
    .log_error(Some("Motion file edit failed"))?;

    log_batch("Motion files", &report);
    Ok(report)
}

// ─── Presets ──────────────────────────────────────────────────────────────────

/// Report the current part preset of each descriptor through the IPC boundary.
pub fn detect_presets_ipc(request: DetectPresetRequest) -> Result<Vec<PresetStatus>, String> {
    let presets = PartPresets::load(Path::new(&request.parts_path))
        .map_err(AppError::from)
        .log_error(Some("Part presets unavailable"))?;

    let mut statuses = Vec::new();
    for path in &request.descriptor_paths {
        match detect_preset_file(Path::new(path), &presets) {
            Ok(preset) => statuses.push(PresetStatus {
                path: path.clone(),
                preset,
            }),
            Err(err) => log_warn!("{path}: {err:#}"),
        }
    }
    Ok(statuses)
}

/// Apply part presets to descriptors through the IPC boundary.
pub fn apply_presets_ipc(request: ApplyPresetRequest) -> Result<BatchReport, String> {
    let presets = PartPresets::load(Path::new(&request.parts_path))
        .map_err(AppError::from)
        .log_error(Some("Part presets unavailable"))?;
    let introspector = build_introspector(&request.introspector).log_error(Some("Model info unavailable"))?;

    log_info!(
        "Applying [{}] to {} descriptor(s)",
        request.categories.join(", "),
        request.descriptor_paths.len()
    );
    let report = apply_preset_batch(
        &to_paths(&request.descriptor_paths),
        &request.categories,
        &presets,
        introspector.as_ref(),
    );
    log_batch("Presets applied", &report);
    Ok(report)
}

// ─── Expressions and colour ───────────────────────────────────────────────────

/// Merge a left-face and a right-face expression through the IPC boundary.
pub fn merge_faces_ipc(request: MergeFacesRequest) -> Result<usize, String> {
    let output = PathBuf::from(&request.output_path);
    let merged = merge_face_expression_files(
        Path::new(&request.left_path),
        Path::new(&request.right_path),
        Path::new(&request.face_map_path),
        &output,
    )
    .map_err(AppError::from)
    .log_error(Some("Expression merge failed"))?;

    log_info!("Expression written: {} ({} params)", output.display(), merged.params.len());
    Ok(merged.params.len())
}

/// Match a background to a reference image through the IPC boundary.
pub fn color_match_ipc(request: ColorMatchRequest) -> Result<ColorMatchResult, String> {
    let output = PathBuf::from(&request.output_path);
    let transform = match_color_files(
        Path::new(&request.source_path),
        Path::new(&request.target_path),
        &output,
        request.interpolation,
    )
    .map_err(AppError::from)
    .log_error(Some("Colour matching failed"))?;

    let transform_code = format_transform_code(&transform).map_err(|err| err.to_string())?;
    log_info!("Matched image written: {}", output.display());
    Ok(ColorMatchResult {
        transform,
        transform_code,
        rgb_code: format_rgb_code(&transform),
    })
}

// ─── Preferences ──────────────────────────────────────────────────────────────

/// Save preferences through the IPC boundary.
pub fn save_preferences_ipc(request: SavePreferencesRequest) -> Result<(), String> {
    let path = PathBuf::from(request.path);
    save_preferences(&path, &request.preferences)
        .map_err(|err| AppError::Preferences(format!("{err:#}")))
        .log_error(None)
        .map_err(String::from)
}

/// Load preferences through the IPC boundary.
pub fn load_preferences_ipc(request: LoadPreferencesRequest) -> Result<Preferences, String> {
    let path = PathBuf::from(request.path);
    Ok(load_preferences(&path))
}
