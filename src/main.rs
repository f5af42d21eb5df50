mod cli_args;

use std::{
    path::{Path, PathBuf},
    process,
};

use anyhow::{Context, bail};
use clap::Parser;
use l2dkit::{
    calibration::CalibrationTable,
    color::{format_rgb_code, format_transform_code, match_color_files},
    descriptor::{
        add_assets, collect_asset_files, find_descriptor, is_valid_descriptor, load_descriptor,
        save_descriptor, scan_asset_directory, scan_descriptors,
    },
    expression::merge_face_expression_files,
    introspect::{CommandIntrospector, ModelIntrospector, StaticIntrospector},
    manifest::{
        append_and_remerge, check_manifest, collect_to_file,
        conf::{convert_conf_file, export_conf},
        edit_summary_import, load_manifest,
    },
    mtn::{remove_mtn_param, set_mtn_param},
    offset::apply_offsets,
    opacity::{PartPresets, apply_preset_batch, detect_preset_file},
    reconcile::{
        BatchReport, MissingPolicy, reconcile, repair_descriptor_files,
        repair_manifest_descriptors,
    },
};

use cli_args::{Cli, Commands};

fn main() {
    let cli = Cli::parse();
    if let Err(err) = run(cli.command) {
        eprintln!("{err:#}");
        process::exit(1);
    }
}

fn print_batch(label: &str, report: &BatchReport) {
    println!(
        "{label}: {} succeeded, {} skipped, {} failed",
        report.succeeded, report.skipped, report.failed
    );
    for issue in &report.issues {
        eprintln!("  {}: {}", issue.item, issue.message);
    }
}

fn introspector(
    model_info: Option<PathBuf>,
    dump_command: Option<PathBuf>,
) -> anyhow::Result<Box<dyn ModelIntrospector>> {
    match (model_info, dump_command) {
        (Some(path), _) => Ok(Box::new(StaticIntrospector::load(&path)?)),
        (None, Some(program)) => Ok(Box::new(CommandIntrospector::new(program))),
        (None, None) => bail!("either --model-info or --dump-command is required"),
    }
}

/// Expand directories into the motion/expression files they contain.
fn expand_assets(assets: &[PathBuf]) -> Vec<PathBuf> {
    assets
        .iter()
        .flat_map(|path| {
            if path.is_dir() {
                collect_asset_files(path)
            } else {
                vec![path.clone()]
            }
        })
        .collect()
}

fn repair_paths(paths: &[PathBuf], policy: MissingPolicy) -> anyhow::Result<()> {
    if policy != MissingPolicy::Report {
        print_batch("Repaired", &repair_descriptor_files(paths, policy));
        return Ok(());
    }

    // Report only: show what is missing without touching the files.
    for path in paths {
        let descriptor = load_descriptor(path)?;
        let base_dir = path.parent().unwrap_or(Path::new("."));
        let outcome = reconcile(&descriptor, base_dir, policy);
        println!(
            "{}: {} duplicates, {} invalid, {} missing",
            path.display(),
            outcome.duplicates_removed,
            outcome.invalid_removed,
            outcome.missing.len()
        );
        for missing in &outcome.missing {
            println!("  {}", serde_json::to_string(missing)?);
        }
    }
    Ok(())
}

fn run(command: Commands) -> anyhow::Result<()> {
    match command {
        Commands::Validate { path } => {
            if is_valid_descriptor(&path) {
                println!("{}: valid model descriptor", path.display());
            } else {
                bail!("{}: not a model descriptor", path.display());
            }
        }

        Commands::Find { folder, max_depth } => {
            let search = find_descriptor(&folder, max_depth);
            for issue in &search.skipped {
                eprintln!("skipped {}: {}", issue.path.display(), issue.message);
            }
            match search.found {
                Some(path) => println!("{}", path.display()),
                None => bail!("no model descriptor found in {}", folder.display()),
            }
        }

        Commands::Scan {
            root,
            max_depth,
            write_descriptor,
        } => {
            if let Some(output) = write_descriptor {
                let descriptor = scan_asset_directory(&root)?;
                save_descriptor(&output, &descriptor)?;
                println!(
                    "Descriptor: {} ({} motions, {} expressions)",
                    output.display(),
                    descriptor.motion_names().len(),
                    descriptor.expression_names().len()
                );
            } else {
                let scan = scan_descriptors(&root, max_depth)?;
                for issue in &scan.skipped {
                    eprintln!("skipped {}: {}", issue.path.display(), issue.message);
                }
                for path in &scan.descriptors {
                    println!("{path}");
                }
            }
        }

        Commands::Repair {
            paths,
            manifest,
            missing,
        } => {
            let policy = MissingPolicy::from(missing);
            if let Some(manifest) = manifest {
                let report = repair_manifest_descriptors(&manifest, policy)?;
                print_batch("Repaired", &report);
            }
            if !paths.is_empty() {
                repair_paths(&paths, policy)?;
            }
        }

        Commands::Generate {
            root,
            output,
            prefix,
            models,
        } => {
            let models = if models.is_empty() {
                scan_descriptors(&root, None)?.descriptors
            } else {
                models
            };
            let collection = collect_to_file(&root, &output, &prefix, &models)?;
            for failure in &collection.failures {
                eprintln!("skipped {}: {}", failure.path, failure.message);
            }
            println!("Manifest: {}", output.display());
            println!(
                "Records: {}, Motions: {}, Expressions: {}",
                collection.records.len(),
                collection.summary.motions.len(),
                collection.summary.expressions.len()
            );
        }

        Commands::Offsets {
            manifest,
            table,
            target,
            model_info,
            dump_command,
        } => {
            let table = CalibrationTable::load(&table)?;
            let introspector = introspector(model_info, dump_command)?;
            let report = apply_offsets(&manifest, introspector.as_ref(), &table, target)?;
            println!("Updated: {}", report.updated.len());
            for failure in &report.failures {
                eprintln!("  {}: {}", failure.id, failure.error);
            }
            for warning in &report.warnings {
                eprintln!(
                    "  {} ({}): target {target} outside [{}, {}]",
                    warning.id, warning.path, warning.min, warning.max
                );
            }
        }

        Commands::SetImport {
            manifest,
            value,
            remove,
        } => {
            if value.is_none() && !remove {
                bail!("give an import value or --remove");
            }
            edit_summary_import(&manifest, value)?;
            match value {
                Some(value) => println!("import set to {value}"),
                None => println!("import removed"),
            }
        }

        Commands::AddAssets {
            assets,
            descriptor,
            manifest,
            prefix,
        } => {
            let files = expand_assets(&assets);
            if let Some(manifest) = manifest {
                let report = append_and_remerge(&manifest, &files, &prefix)?;
                print_batch("Descriptors", &report.batch);
                println!(
                    "New motions: {}, New expressions: {}",
                    report.new_motions.len(),
                    report.new_expressions.len()
                );
            } else if let Some(descriptor) = descriptor {
                let report = add_assets(&descriptor, &files, &prefix)?;
                println!(
                    "Added: {} motions, {} expressions",
                    report.added_motions.len(),
                    report.added_expressions.len()
                );
                for path in &report.missing {
                    eprintln!("  missing: {}", path.display());
                }
                for path in &report.unsupported {
                    eprintln!("  unsupported: {}", path.display());
                }
            }
        }

        Commands::Check { manifest } => {
            let issues = check_manifest(&load_manifest(&manifest)?);
            if issues.is_empty() {
                println!("{}: ok", manifest.display());
            } else {
                for issue in &issues {
                    eprintln!("  {}", serde_json::to_string(issue)?);
                }
                bail!("{}: {} issue(s)", manifest.display(), issues.len());
            }
        }

        Commands::ToConf {
            manifest,
            figure_root,
            output_dir,
        } => {
            let path = export_conf(&manifest, &figure_root, &output_dir)?;
            println!("Stage script: {}", path.display());
        }

        Commands::FromConf { conf, figure_root } => {
            let path = convert_conf_file(&conf, &figure_root)?;
            println!("Manifest: {}", path.display());
        }

        Commands::MtnParam {
            dir,
            name,
            value,
            remove,
        } => {
            let report = match (value, remove) {
                (_, true) => remove_mtn_param(&dir, &name)?,
                (Some(value), false) => set_mtn_param(&dir, &name, &value)?,
                (None, false) => bail!("give a value or --remove"),
            };
            print_batch("Motion files", &report);
        }

        Commands::Preset {
            paths,
            parts,
            categories,
            model_info,
            dump_command,
        } => {
            let presets = PartPresets::load(&parts)?;
            if categories.is_empty() {
                for path in &paths {
                    let found = detect_preset_file(path, &presets)
                        .with_context(|| format!("failed to inspect {}", path.display()))?;
                    println!("{}: {}", path.display(), serde_json::to_string(&found)?);
                }
            } else {
                let introspector = introspector(model_info, dump_command)?;
                let report =
                    apply_preset_batch(&paths, &categories, &presets, introspector.as_ref());
                print_batch("Presets applied", &report);
            }
        }

        Commands::MergeFaces {
            left,
            right,
            face_map,
            output,
        } => {
            let merged = merge_face_expression_files(&left, &right, &face_map, &output)?;
            println!("Expression: {} ({} params)", output.display(), merged.params.len());
        }

        Commands::ColorMatch {
            source,
            reference,
            output,
            interpolation,
        } => {
            let transform = match_color_files(&source, &reference, &output, interpolation.into())?;
            println!("Matched image: {}", output.display());
            println!("{}", format_transform_code(&transform)?);
            println!("{}", format_rgb_code(&transform));
        }
    }

    Ok(())
}
