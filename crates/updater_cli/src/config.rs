//! Configuration for the updater CLI.
//!
//! The configuration is optional. It is read from `updater.toml` in the
//! current directory, or from the file given with `--config`.
//!
//! ```toml
//! [scan]
//! manifest_filename = "deployment.yml"
//!
//! [bundles]
//! filename = "bundle.cue"
//! ```

use std::{
    fs,
    path::{Path, PathBuf},
};

use deployment_manager::{BUNDLE_FILENAME, DEPLOYMENT_FILENAME};
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::errors::Error;

/// Default configuration file name
pub const DEFAULT_CONFIG_FILENAME: &str = "updater.toml";

#[cfg(test)]
#[path = "config_tests.rs"]
mod tests;

/// Settings for the updater CLI.
#[derive(Debug, Default, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UpdaterConfig {
    #[serde(default)]
    pub scan: ScanConfig,

    #[serde(default)]
    pub bundles: BundleConfig,
}

impl UpdaterConfig {
    /// Loads configuration from a TOML file.
    ///
    /// # Errors
    ///
    /// Returns `Error::Config` if the file does not exist, cannot be read or
    /// is not valid TOML for this structure.
    pub fn load(path: &Path) -> Result<Self, Error> {
        debug!(message = "Loading configuration", path = ?path);

        if !path.exists() {
            return Err(Error::Config(format!(
                "Configuration file not found: {:?}",
                path
            )));
        }

        let content = fs::read_to_string(path)
            .map_err(|e| Error::Config(format!("Failed to read configuration file: {}", e)))?;

        toml::from_str(&content)
            .map_err(|e| Error::Config(format!("Failed to parse configuration file: {}", e)))
    }

    /// Loads the configuration for a CLI invocation.
    ///
    /// An explicitly given file must exist. Without one, `updater.toml` in
    /// the current directory is used when present and the defaults otherwise.
    pub fn resolve(config_path: Option<&str>) -> Result<Self, Error> {
        let path = get_config_path(config_path);
        if config_path.is_none() && !path.exists() {
            debug!(message = "No configuration file, using defaults", path = ?path);
            return Ok(Self::default());
        }
        Self::load(&path)
    }
}

/// Settings for the `scan` command.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ScanConfig {
    /// File name that identifies a deployment manifest.
    #[serde(default = "ScanConfig::default_manifest_filename")]
    pub manifest_filename: String,
}

impl ScanConfig {
    fn default_manifest_filename() -> String {
        DEPLOYMENT_FILENAME.to_string()
    }
}

impl Default for ScanConfig {
    fn default() -> Self {
        Self {
            manifest_filename: Self::default_manifest_filename(),
        }
    }
}

/// Settings for locating bundle files.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BundleConfig {
    /// File name of the bundle inside `<root>/<environment>/<app>/`.
    #[serde(default = "BundleConfig::default_filename")]
    pub filename: String,
}

impl BundleConfig {
    fn default_filename() -> String {
        BUNDLE_FILENAME.to_string()
    }
}

impl Default for BundleConfig {
    fn default() -> Self {
        Self {
            filename: Self::default_filename(),
        }
    }
}

/// Resolves the path to the configuration file.
///
/// Returns `config_path` when given, otherwise `updater.toml` in the current
/// directory.
pub fn get_config_path(config_path: Option<&str>) -> PathBuf {
    if let Some(path) = config_path {
        PathBuf::from(path)
    } else {
        let current_dir = std::env::current_dir().unwrap_or_else(|_| PathBuf::from("."));
        current_dir.join(DEFAULT_CONFIG_FILENAME)
    }
}
