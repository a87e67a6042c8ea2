use std::io::Write;
use std::path::PathBuf;

use clap::Args;
use deployment_manager::{apply_templates, parse_template_pair, ManifestScanner};
use tracing::{debug, info, instrument};

use crate::config::UpdaterConfig;
use crate::errors::Error;

#[cfg(test)]
#[path = "scan_cmd_tests.rs"]
mod tests;

/// Arguments for the scan command
#[derive(Args, Debug)]
pub struct ScanArgs {
    /// The path to scan for deployment files
    pub path: PathBuf,

    /// A KEY=VALUE pair; overrides whose value is exactly KEY get VALUE instead
    #[arg(short = 't', long = "template", value_parser = parse_key_val)]
    pub templates: Vec<(String, String)>,
}

/// Parses a `KEY=VALUE` template argument.
pub fn parse_key_val(s: &str) -> Result<(String, String), String> {
    parse_template_pair(s).map_err(|e| e.to_string())
}

/// Scans for manifests and writes their overrides to `out` as a JSON array.
#[instrument(skip(config, out))]
pub fn execute(args: &ScanArgs, config: &UpdaterConfig, out: &mut impl Write) -> Result<(), Error> {
    let scanner = ManifestScanner::new().with_filename(config.scan.manifest_filename.as_str());
    let mut overrides = scanner.scan_overrides(&args.path)?;
    debug!(message = "Collected overrides", count = overrides.len());

    apply_templates(&mut overrides, &args.templates);

    let output = serde_json::to_string(&overrides).map_err(Error::SerializeOutput)?;
    writeln!(out, "{output}").map_err(Error::WriteOutput)?;

    info!(message = "Scan complete", path = ?args.path, overrides = overrides.len());
    Ok(())
}
