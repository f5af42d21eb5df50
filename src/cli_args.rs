//! Argument definitions for the `l2dkit` command line, keeping `main.rs`
//! focused on dispatch.

use std::path::PathBuf;

use clap::{Parser, Subcommand, ValueEnum};
use l2dkit::{color::ResizeInterpolation, reconcile::MissingPolicy};

/// Live2D model asset toolbox
#[derive(Parser)]
#[command(name = "l2dkit")]
#[command(author, version, about, long_about = None)]
pub(crate) struct Cli {
    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Clone, Copy, ValueEnum)]
pub(crate) enum PolicyArg {
    Drop,
    Keep,
    Report,
}

impl From<PolicyArg> for MissingPolicy {
    fn from(value: PolicyArg) -> Self {
        match value {
            PolicyArg::Drop => MissingPolicy::Drop,
            PolicyArg::Keep => MissingPolicy::Keep,
            PolicyArg::Report => MissingPolicy::Report,
        }
    }
}

#[derive(Clone, Copy, ValueEnum)]
pub(crate) enum InterpolationArg {
    Nearest,
    Bilinear,
    Bicubic,
    Lanczos3,
}

impl From<InterpolationArg> for ResizeInterpolation {
    fn from(value: InterpolationArg) -> Self {
        match value {
            InterpolationArg::Nearest => ResizeInterpolation::Nearest,
            InterpolationArg::Bilinear => ResizeInterpolation::Bilinear,
            InterpolationArg::Bicubic => ResizeInterpolation::Bicubic,
            InterpolationArg::Lanczos3 => ResizeInterpolation::Lanczos3,
        }
    }
}

#[derive(Subcommand)]
pub(crate) enum Commands {
    /// Check whether a JSON file is a model descriptor
    Validate {
        /// Path to the candidate descriptor
        path: PathBuf,
    },

    /// Find the descriptor of a model folder
    Find {
        /// Model folder
        folder: PathBuf,

        /// How many directory levels to descend
        #[arg(long, default_value_t = 2)]
        max_depth: usize,
    },

    /// List every descriptor below a directory, or build one from an asset folder
    Scan {
        /// Directory to scan
        root: PathBuf,

        /// Limit how deep the scan descends
        #[arg(long)]
        max_depth: Option<usize>,

        /// Build a new descriptor from the asset folder and write it here
        #[arg(long)]
        write_descriptor: Option<PathBuf>,
    },

    /// Deduplicate descriptor entries and handle missing files
    Repair {
        /// Descriptor files to repair
        paths: Vec<PathBuf>,

        /// Repair every descriptor referenced by this manifest
        #[arg(long)]
        manifest: Option<PathBuf>,

        /// What to do with entries whose file is missing
        #[arg(long, value_enum, default_value = "drop")]
        missing: PolicyArg,
    },

    /// Generate a manifest from descriptors below a root directory
    Generate {
        /// Root directory the descriptor paths are relative to
        root: PathBuf,

        /// Output manifest path (.jsonl)
        #[arg(short, long)]
        output: PathBuf,

        /// Id prefix for the records
        #[arg(short, long)]
        prefix: String,

        /// Descriptor paths relative to the root, in manifest order
        /// (default: every descriptor found below the root)
        #[arg(long = "model")]
        models: Vec<String>,
    },

    /// Compute placement offsets for a manifest from a calibration table
    Offsets {
        /// Manifest to update
        manifest: PathBuf,

        /// Calibration table (deformer_import.json)
        #[arg(long)]
        table: PathBuf,

        /// Target body index
        #[arg(long)]
        target: f64,

        /// Model info JSON file (descriptor path -> parts and parameters)
        #[arg(long, conflicts_with = "dump_command")]
        model_info: Option<PathBuf>,

        /// External command printing model info JSON for a descriptor
        #[arg(long)]
        dump_command: Option<PathBuf>,
    },

    /// Set or remove the manifest's uniform import value
    SetImport {
        /// Manifest to edit
        manifest: PathBuf,

        /// New import value (omit together with --remove)
        value: Option<i64>,

        /// Remove the import value
        #[arg(long, conflicts_with = "value")]
        remove: bool,
    },

    /// Add motion/expression files to descriptors
    AddAssets {
        /// Asset files, or directories scanned for .mtn/.exp.json files
        #[arg(required = true)]
        assets: Vec<PathBuf>,

        /// Descriptor to update
        #[arg(long, required_unless_present = "manifest", conflicts_with = "manifest")]
        descriptor: Option<PathBuf>,

        /// Update every descriptor of this manifest and merge its summary
        #[arg(long)]
        manifest: Option<PathBuf>,

        /// Prefix for the new entry names
        #[arg(long, default_value = "")]
        prefix: String,
    },

    /// Report structural problems of a manifest
    Check {
        /// Manifest to check
        manifest: PathBuf,
    },

    /// Convert a manifest to a .conf stage script
    ToConf {
        /// Manifest to convert
        manifest: PathBuf,

        /// Engine figure root directory
        #[arg(long)]
        figure_root: PathBuf,

        /// Output directory for the .conf file
        #[arg(short, long, default_value = "output_conf")]
        output_dir: PathBuf,
    },

    /// Convert a .conf stage script back to a manifest
    FromConf {
        /// Stage script to convert
        conf: PathBuf,

        /// Engine figure root directory
        #[arg(long)]
        figure_root: PathBuf,
    },

    /// Set or remove a parameter line in every .mtn file below a directory
    MtnParam {
        /// Directory containing .mtn files
        dir: PathBuf,

        /// Parameter name
        #[arg(long, default_value = "PARAM_IMPORT")]
        name: String,

        /// New value (omit together with --remove)
        value: Option<String>,

        /// Remove the parameter lines instead
        #[arg(long, conflicts_with = "value")]
        remove: bool,
    },

    /// Detect or apply part opacity presets
    Preset {
        /// Descriptors to inspect or update
        #[arg(required = true)]
        paths: Vec<PathBuf>,

        /// Part presets file (category -> part ids)
        #[arg(long, default_value = "parts.json")]
        parts: PathBuf,

        /// Categories to apply; without any, the current preset is reported
        #[arg(long = "apply")]
        categories: Vec<String>,

        /// Model info JSON file (descriptor path -> parts and parameters)
        #[arg(long, conflicts_with = "dump_command")]
        model_info: Option<PathBuf>,

        /// External command printing model info JSON for a descriptor
        #[arg(long)]
        dump_command: Option<PathBuf>,
    },

    /// Merge a left-face and a right-face expression
    MergeFaces {
        /// Expression supplying the left side
        left: PathBuf,

        /// Expression supplying the right side
        right: PathBuf,

        /// Face side map
        #[arg(long, default_value = "exps.json")]
        face_map: PathBuf,

        /// Output expression path
        #[arg(short, long)]
        output: PathBuf,
    },

    /// Match a background's colours to a reference image
    ColorMatch {
        /// Image to recolour
        source: PathBuf,

        /// Reference image
        reference: PathBuf,

        /// Output image path
        #[arg(short, long)]
        output: PathBuf,

        /// Interpolation used to resize the reference image
        #[arg(long, value_enum, default_value = "bicubic")]
        interpolation: InterpolationArg,
    },
}
