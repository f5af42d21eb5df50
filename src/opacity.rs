//! Part opacity and parameter overrides, and named part presets.

use std::{
    collections::BTreeSet,
    fs,
    path::{Path, PathBuf},
};

use anyhow::{Context, Result, bail};
use indexmap::IndexMap;
use serde::{Deserialize, Serialize};

use crate::descriptor::{ModelDescriptor, ParamValue, PartOpacity, load_descriptor, save_descriptor};
use crate::introspect::ModelIntrospector;
use crate::reconcile::BatchReport;

/// Opacity a part must have to count as shown by a preset.
pub const VISIBLE: f64 = 1.0;
pub const HIDDEN: f64 = 0.0;

/// Replace a descriptor's `init_opacities`, clamping every value to `[0, 1]`.
pub fn set_init_opacities(path: &Path, opacities: &[PartOpacity]) -> Result<()> {
    let mut descriptor = load_descriptor(path)?;
    descriptor.init_opacities = Some(
        opacities
            .iter()
            .map(|opacity| PartOpacity {
                part_id: opacity.part_id.clone(),
                value: opacity.value.clamp(HIDDEN, VISIBLE),
            })
            .collect(),
    );
    save_descriptor(path, &descriptor)
}

/// Replace a descriptor's `init_params`.
pub fn set_init_params(path: &Path, params: &[ParamValue]) -> Result<()> {
    let mut descriptor = load_descriptor(path)?;
    descriptor.init_params = Some(params.to_vec());
    save_descriptor(path, &descriptor)
}

/// Named part sets from `parts.json`: category → part ids.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct PartPresets(pub IndexMap<String, Vec<String>>);

impl PartPresets {
    pub fn load(path: &Path) -> Result<Self> {
        let content = fs::read_to_string(path)
            .with_context(|| format!("failed to read part presets: {}", path.display()))?;
        serde_json::from_str(&content)
            .with_context(|| format!("failed to parse part presets: {}", path.display()))
    }

    pub fn categories(&self) -> impl Iterator<Item = &str> {
        self.0.keys().map(String::as_str)
    }

    /// Union of the part ids of `categories`.
    pub fn parts_for(&self, categories: &[String]) -> Result<BTreeSet<String>> {
        let mut parts = BTreeSet::new();
        for category in categories {
            let Some(ids) = self.0.get(category) else {
                bail!("unknown part preset category: {category}");
            };
            parts.extend(ids.iter().cloned());
        }
        Ok(parts)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", content = "name", rename_all = "snake_case")]
pub enum PresetMatch {
    /// The descriptor has no `init_opacities`.
    None,
    Named(String),
    /// Visible parts match no preset.
    Custom,
}

/// Identify the preset whose part set equals the descriptor's visible parts.
pub fn detect_preset(descriptor: &ModelDescriptor, presets: &PartPresets) -> PresetMatch {
    let Some(opacities) = descriptor.init_opacities.as_ref() else {
        return PresetMatch::None;
    };
    let visible: BTreeSet<&str> = opacities
        .iter()
        .filter(|opacity| opacity.value == VISIBLE)
        .map(|opacity| opacity.part_id.as_str())
        .collect();

    presets
        .0
        .iter()
        .find(|(_, parts)| parts.iter().map(String::as_str).collect::<BTreeSet<_>>() == visible)
        .map(|(category, _)| PresetMatch::Named(category.clone()))
        .unwrap_or(PresetMatch::Custom)
}

pub fn detect_preset_file(path: &Path, presets: &PartPresets) -> Result<PresetMatch> {
    Ok(detect_preset(&load_descriptor(path)?, presets))
}

/// Show exactly the parts of `categories` and hide every other part the
/// model has. Motions and expressions are removed.
///
/// Returns the number of parts written.
pub fn apply_preset(
    path: &Path,
    categories: &[String],
    presets: &PartPresets,
    introspector: &dyn ModelIntrospector,
) -> Result<usize> {
    let shown = presets.parts_for(categories)?;
    let info = introspector
        .inspect(path)
        .with_context(|| format!("failed to list parts of {}", path.display()))?;

    let mut descriptor = load_descriptor(path)?;
    descriptor.motions = None;
    descriptor.expressions = None;
    let opacities: Vec<PartOpacity> = info
        .part_ids
        .iter()
        .map(|part_id| PartOpacity {
            part_id: part_id.clone(),
            value: if shown.contains(part_id) { VISIBLE } else { HIDDEN },
        })
        .collect();
    let count = opacities.len();
    descriptor.init_opacities = Some(opacities);

    save_descriptor(path, &descriptor)?;
    Ok(count)
}

/// [`apply_preset`] over several descriptors; failures are collected.
pub fn apply_preset_batch(
    paths: &[PathBuf],
    categories: &[String],
    presets: &PartPresets,
    introspector: &dyn ModelIntrospector,
) -> BatchReport {
    let mut report = BatchReport::default();
    for path in paths {
        match apply_preset(path, categories, presets, introspector) {
            Ok(_) => report.succeeded += 1,
            Err(err) => report.fail(path.display().to_string(), format!("{err:#}")),
        }
    }
    report
}
