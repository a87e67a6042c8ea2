use std::fs;
use std::io::{Read, Write};
use std::path::{Path, PathBuf};

use clap::Subcommand;
use cue_document::{update_file, OverrideMode, PathExpression};
use deployment_manager::{write_bundle, BatchApplier, OverrideConfig};
use serde_json::Value;
use tracing::{debug, info, instrument};

use crate::config::UpdaterConfig;
use crate::errors::Error;

#[cfg(test)]
#[path = "update_cmd_tests.rs"]
mod tests;

/// Subcommands for the update command
#[derive(Subcommand, Debug)]
pub enum UpdateCommands {
    /// Overrides a target path in a Timoni bundle values field with the given value
    Bundle {
        /// Path to the bundle file to update
        #[arg(short = 'f', long)]
        bundle_file: PathBuf,

        /// The instance to update
        #[arg(short, long)]
        instance: String,

        /// Update the file in place
        #[arg(long)]
        in_place: bool,

        /// A dot separated path to the value to update (must already exist)
        path: String,

        /// The value to install at the path
        value: String,
    },

    /// Performs a mass update on Timoni bundle files using given input data
    Deployments {
        /// The root directory where bundle files are located
        root_dir: PathBuf,

        /// The environment to update
        #[arg(short, long)]
        environment: String,

        /// Path to a JSON array of overrides; read from stdin when omitted
        #[arg(short, long)]
        input: Option<PathBuf>,

        /// Write bundles only after every override has been applied in memory
        #[arg(long)]
        atomic: bool,
    },

    /// Overrides a target path in a CUE file with the given value
    File {
        /// Path to the CUE file to update
        #[arg(short, long)]
        file: PathBuf,

        /// Treat the path as relative to `bundle.instances.<instance>.values`
        #[arg(short, long)]
        instance: Option<String>,

        /// Update the file in place
        #[arg(long)]
        in_place: bool,

        /// A dot separated path to the value to update (must already exist)
        path: String,

        /// The value to install at the path
        value: String,
    },
}

/// Execute the update command
///
/// Rendered documents are written to `out` unless updated in place;
/// `input` is read when `update deployments` gets no input file.
#[instrument(skip(config, input, out))]
pub fn execute(
    cmd: &UpdateCommands,
    config: &UpdaterConfig,
    input: &mut impl Read,
    out: &mut impl Write,
) -> Result<(), Error> {
    match cmd {
        UpdateCommands::Bundle {
            bundle_file,
            instance,
            in_place,
            path,
            value,
        } => update_single(bundle_file, Some(instance.as_str()), path, value, *in_place, out),
        UpdateCommands::File {
            file,
            instance,
            in_place,
            path,
            value,
        } => update_single(file, instance.as_deref(), path, value, *in_place, out),
        UpdateCommands::Deployments {
            root_dir,
            environment,
            input: input_file,
            atomic,
        } => update_deployments(
            root_dir,
            environment,
            input_file.as_deref(),
            *atomic,
            config,
            input,
        ),
    }
}

/// Builds the document path for a single file update.
pub fn target_path(instance: Option<&str>, path: &str) -> Result<PathExpression, Error> {
    let relative = PathExpression::parse(path)?;
    match instance {
        Some(instance) => {
            let prefix = PathExpression::from_segments(["bundle", "instances", instance, "values"])?;
            Ok(prefix.join(&relative))
        }
        None => Ok(relative),
    }
}

fn update_single(
    file: &Path,
    instance: Option<&str>,
    path: &str,
    value: &str,
    in_place: bool,
    out: &mut impl Write,
) -> Result<(), Error> {
    let target = target_path(instance, path)?;
    let rendered = update_file(
        file,
        &target,
        Value::String(value.to_string()),
        OverrideMode::Strict,
    )?;

    if in_place {
        write_bundle(file, &rendered)?;
        info!(message = "Updated file in place", file = ?file, path = %target);
    } else {
        out.write_all(rendered.as_bytes()).map_err(Error::WriteOutput)?;
    }
    Ok(())
}

fn update_deployments(
    root_dir: &Path,
    environment: &str,
    input_file: Option<&Path>,
    atomic: bool,
    config: &UpdaterConfig,
    input: &mut impl Read,
) -> Result<(), Error> {
    if !root_dir.is_dir() {
        return Err(Error::InvalidArguments(format!(
            "Root directory does not exist: {:?}",
            root_dir
        )));
    }

    let data = match input_file {
        Some(path) => fs::read(path).map_err(|source| Error::ReadInput {
            path: path.to_path_buf(),
            source,
        })?,
        None => {
            debug!(message = "Reading overrides from stdin");
            let mut data = Vec::new();
            input.read_to_end(&mut data).map_err(Error::ReadStdin)?;
            data
        }
    };
    let overrides: Vec<OverrideConfig> = serde_json::from_slice(&data).map_err(Error::ParseInput)?;

    let applier = BatchApplier::new(root_dir, environment)
        .with_bundle_filename(config.bundles.filename.as_str());
    if atomic {
        let written = applier.apply_all_staged(&overrides)?;
        info!(message = "Updated deployments", environment = %environment, bundles = written);
    } else {
        let applied = applier.apply_all(&overrides)?;
        info!(message = "Updated deployments", environment = %environment, overrides = applied);
    }
    Ok(())
}
