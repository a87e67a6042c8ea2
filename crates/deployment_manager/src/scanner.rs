//! Discovery of deployment manifests in a directory tree.

use std::fs;
use std::path::{Path, PathBuf};

use tracing::{debug, error, info, warn};
use walkdir::WalkDir;

use crate::errors::{DeploymentError, DeploymentResult};
use crate::manifest::{DeploymentFile, OverrideConfig, DEPLOYMENT_FILENAME};

#[cfg(test)]
#[path = "scanner_tests.rs"]
mod tests;

/// Walks a directory tree and parses every manifest it finds.
///
/// Entries are visited in file name order, so repeated scans of an
/// unchanged tree return the same manifests in the same order.
#[derive(Debug, Clone)]
pub struct ManifestScanner {
    filename: String,
}

impl Default for ManifestScanner {
    fn default() -> Self {
        Self::new()
    }
}

impl ManifestScanner {
    pub fn new() -> Self {
        Self {
            filename: DEPLOYMENT_FILENAME.to_string(),
        }
    }

    /// Looks for manifests named `filename` instead of [`DEPLOYMENT_FILENAME`].
    pub fn with_filename(mut self, filename: impl Into<String>) -> Self {
        self.filename = filename.into();
        self
    }

    pub fn filename(&self) -> &str {
        &self.filename
    }

    /// Returns every manifest below `root` that parses.
    ///
    /// A manifest that is not valid UTF-8 YAML for [`DeploymentFile`] is
    /// logged and skipped. Failing to traverse the tree or to read a manifest is an
    /// error.
    pub fn scan(&self, root: &Path) -> DeploymentResult<Vec<DeploymentFile>> {
        info!(message = "Scanning for deployment manifests", root = ?root, filename = %self.filename);

        let mut manifests = Vec::new();
        for entry in WalkDir::new(root).sort_by_file_name() {
            let entry = entry.map_err(|e| {
                let path = e.path().map_or_else(|| root.to_path_buf(), Path::to_path_buf);
                error!(message = "Failed to read directory entry", path = ?path, error = %e);
                DeploymentError::Walk { path, source: e }
            })?;

            // Symlinked manifests are read through the link.
            if entry.file_name() != self.filename.as_str() || !entry.path().is_file() {
                continue;
            }

            if let Some(manifest) = self.read_manifest(entry.path())? {
                manifests.push(manifest);
            }
        }

        info!(message = "Finished scanning", root = ?root, manifests = manifests.len());
        Ok(manifests)
    }

    /// Returns the overrides of every manifest below `root`, in scan order.
    pub fn scan_overrides(&self, root: &Path) -> DeploymentResult<Vec<OverrideConfig>> {
        Ok(self
            .scan(root)?
            .into_iter()
            .flat_map(|manifest| manifest.overrides)
            .collect())
    }

    fn read_manifest(&self, path: &Path) -> DeploymentResult<Option<DeploymentFile>> {
        let contents = fs::read(path).map_err(|source| DeploymentError::ManifestRead {
            path: PathBuf::from(path),
            source,
        })?;

        match serde_yaml::from_slice::<DeploymentFile>(&contents) {
            Ok(manifest) => {
                debug!(
                    message = "Parsed deployment manifest",
                    path = ?path,
                    overrides = manifest.overrides.len()
                );
                Ok(Some(manifest))
            }
            Err(e) => {
                warn!(
                    message = "Skipping file that is not a valid deployment manifest",
                    path = ?path,
                    error = %e
                );
                Ok(None)
            }
        }
    }
}

/// Scans `root` for [`DEPLOYMENT_FILENAME`] manifests.
pub fn scan_for_deployment_files(root: &Path) -> DeploymentResult<Vec<DeploymentFile>> {
    ManifestScanner::new().scan(root)
}

/// Scans `root` and flattens the overrides of all manifests found.
pub fn collect_overrides(root: &Path) -> DeploymentResult<Vec<OverrideConfig>> {
    ManifestScanner::new().scan_overrides(root)
}
