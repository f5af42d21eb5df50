//! Part and parameter queries against a model, behind a narrow trait so the
//! offset and preset logic never touch a rendering runtime directly.

use std::{
    collections::BTreeMap,
    fs,
    io::Write,
    path::{Path, PathBuf},
    process::Command,
};

use anyhow::{Context, Result, bail};
use serde::{Deserialize, Serialize};
use tempfile::Builder;

use crate::descriptor::load_descriptor;
use crate::paths::to_slash;

/// Prefix of the parameters whose default encodes a model's body-size index.
pub const IMPORT_PARAM_PREFIX: &str = "PARAM_IMPORT";

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ParameterInfo {
    pub id: String,
    #[serde(default)]
    pub default: f64,
    #[serde(default)]
    pub min: f64,
    #[serde(default = "default_max")]
    pub max: f64,
    #[serde(default)]
    pub value: f64,
}

fn default_max() -> f64 {
    1.0
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ModelInfo {
    #[serde(default)]
    pub part_ids: Vec<String>,
    #[serde(default)]
    pub parameters: Vec<ParameterInfo>,
}

impl ModelInfo {
    /// First parameter of the `PARAM_IMPORT` family.
    pub fn import_parameter(&self) -> Option<&ParameterInfo> {
        self.parameters
            .iter()
            .find(|parameter| parameter.id.starts_with(IMPORT_PARAM_PREFIX))
    }
}

pub trait ModelIntrospector {
    /// List the parts and parameters of the model described at `descriptor`.
    fn inspect(&self, descriptor: &Path) -> Result<ModelInfo>;
}

// ─── External command ─────────────────────────────────────────────────────────

/// Runs an external Live2D-capable dump tool.
///
/// The tool is invoked as `program [args..] <descriptor>` and must print a
/// [`ModelInfo`] JSON object on stdout. It receives a temporary copy of the
/// descriptor with motions and expressions removed, placed next to the
/// original so relative references still resolve. The copy is removed when
/// the call returns.
#[derive(Debug, Clone)]
pub struct CommandIntrospector {
    pub program: PathBuf,
    pub args: Vec<String>,
}

impl CommandIntrospector {
    pub fn new(program: impl Into<PathBuf>) -> Self {
        Self {
            program: program.into(),
            args: Vec::new(),
        }
    }

    pub fn with_args(mut self, args: impl IntoIterator<Item = impl Into<String>>) -> Self {
        self.args = args.into_iter().map(Into::into).collect();
        self
    }
}

impl ModelIntrospector for CommandIntrospector {
    fn inspect(&self, descriptor: &Path) -> Result<ModelInfo> {
        let mut stripped = load_descriptor(descriptor)?;
        stripped.motions = None;
        stripped.expressions = None;
        let content = serde_json::to_string_pretty(&stripped)
            .context("failed to serialize stripped descriptor")?;

        let dir = descriptor.parent().unwrap_or(Path::new("."));
        let mut temp = Builder::new()
            .prefix(".introspect-")
            .suffix(".json")
            .tempfile_in(dir)
            .with_context(|| format!("failed to create temporary descriptor in {}", dir.display()))?;
        temp.write_all(content.as_bytes())
            .context("failed to write temporary descriptor")?;
        temp.flush().context("failed to flush temporary descriptor")?;

        let output = Command::new(&self.program)
            .args(&self.args)
            .arg(temp.path())
            .output()
            .with_context(|| format!("failed to run {}", self.program.display()))?;

        if !output.status.success() {
            bail!(
                "{} exited with {}: {}",
                self.program.display(),
                output.status,
                String::from_utf8_lossy(&output.stderr).trim()
            );
        }

        serde_json::from_slice(&output.stdout).with_context(|| {
            format!(
                "{} printed invalid model info for {}",
                self.program.display(),
                descriptor.display()
            )
        })
    }
}

// ─── Static data ──────────────────────────────────────────────────────────────

/// Hand-authored model info keyed by descriptor path.
///
/// A key matches a descriptor whose forward-slash path equals it or ends with
/// `/<key>`.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct StaticIntrospector {
    models: BTreeMap<String, ModelInfo>,
}

impl StaticIntrospector {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, key: impl Into<String>, info: ModelInfo) {
        self.models.insert(key.into(), info);
    }

    pub fn with_model(mut self, key: impl Into<String>, info: ModelInfo) -> Self {
        self.insert(key, info);
        self
    }

    pub fn load(path: &Path) -> Result<Self> {
        let content = fs::read_to_string(path)
            .with_context(|| format!("failed to read model info file: {}", path.display()))?;
        serde_json::from_str(&content)
            .with_context(|| format!("failed to parse model info file: {}", path.display()))
    }

    fn lookup(&self, descriptor: &Path) -> Option<&ModelInfo> {
        let full = to_slash(descriptor);
        self.models.get(&full).or_else(|| {
            self.models
                .iter()
                .find(|(key, _)| full.ends_with(&format!("/{}", key.trim_start_matches('/'))))
                .map(|(_, info)| info)
        })
    }
}

impl ModelIntrospector for StaticIntrospector {
    fn inspect(&self, descriptor: &Path) -> Result<ModelInfo> {
        match self.lookup(descriptor) {
            Some(info) => Ok(info.clone()),
            None => bail!("no model info for {}", descriptor.display()),
        }
    }
}
