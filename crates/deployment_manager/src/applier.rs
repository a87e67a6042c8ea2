//! Application of overrides to bundle files.
//!
//! Bundles are laid out as `<root>/<environment>/<app>/bundle.cue`. An override
//! for app `svc` with path `image.tag` updates the field
//! `bundle.instances.svc.values.image.tag` of that app's bundle.

use std::fs;
use std::io::{self, Write};
use std::path::{Component, Path, PathBuf};

use cue_document::{override_path, read_file, ConfigDocument, OverrideMode, PathExpression};
use serde_json::Value;
use tempfile::NamedTempFile;
use tracing::{debug, info};

use crate::errors::{DeploymentError, DeploymentResult};
use crate::manifest::OverrideConfig;

#[cfg(test)]
#[path = "applier_tests.rs"]
mod tests;

/// File name of the bundle document inside an app directory.
pub const BUNDLE_FILENAME: &str = "bundle.cue";

/// Applies overrides to the bundles of one environment.
#[derive(Debug, Clone)]
pub struct BatchApplier {
    root: PathBuf,
    environment: String,
    bundle_filename: String,
}

impl BatchApplier {
    pub fn new(root: impl Into<PathBuf>, environment: impl Into<String>) -> Self {
        Self {
            root: root.into(),
            environment: environment.into(),
            bundle_filename: BUNDLE_FILENAME.to_string(),
        }
    }

    pub fn with_bundle_filename(mut self, filename: impl Into<String>) -> Self {
        self.bundle_filename = filename.into();
        self
    }

    /// Location of the bundle file for `app`.
    pub fn bundle_path(&self, app: &str) -> PathBuf {
        self.root
            .join(&self.environment)
            .join(app)
            .join(&self.bundle_filename)
    }

    /// Full document path addressed by an override:
    /// `bundle.instances.<instance>.values.<path>`.
    pub fn values_path(override_config: &OverrideConfig) -> DeploymentResult<PathExpression> {
        let invalid = |e: cue_document::Error| DeploymentError::InvalidOverride {
            app: override_config.app.clone(),
            reason: e.to_string(),
        };

        let prefix = PathExpression::from_segments([
            "bundle",
            "instances",
            override_config.instance_name(),
            "values",
        ])
        .map_err(invalid)?;
        let relative = PathExpression::parse(&override_config.path).map_err(invalid)?;
        Ok(prefix.join(&relative))
    }

    /// Applies `overrides` one at a time, writing each bundle as soon as its
    /// override has been applied.
    ///
    /// The first failure stops the batch. Bundles written by earlier
    /// overrides keep their new contents. Returns the number of overrides
    /// applied.
    pub fn apply_all(&self, overrides: &[OverrideConfig]) -> DeploymentResult<usize> {
        info!(
            message = "Applying overrides",
            environment = %self.environment,
            count = overrides.len()
        );

        for override_config in overrides {
            let (bundle, path) = self.locate(override_config)?;
            let doc = load_bundle(&bundle)?;
            let updated = apply_override(&bundle, &doc, &path, override_config)?;
            let rendered = render_bundle(&bundle, &updated)?;
            write_bundle(&bundle, &rendered)?;

            info!(
                message = "Applied override",
                app = %override_config.app,
                instance = %override_config.instance_name(),
                path = %path,
                bundle = ?bundle
            );
        }
        Ok(overrides.len())
    }

    /// Applies all `overrides` in memory and writes the affected bundles only
    /// when every override succeeded.
    ///
    /// Several overrides for the same bundle are applied on top of each
    /// other. A failure leaves every bundle untouched. Returns the number of
    /// bundles written.
    pub fn apply_all_staged(&self, overrides: &[OverrideConfig]) -> DeploymentResult<usize> {
        info!(
            message = "Staging overrides",
            environment = %self.environment,
            count = overrides.len()
        );

        let mut staged: Vec<(PathBuf, ConfigDocument)> = Vec::new();
        for override_config in overrides {
            let (bundle, path) = self.locate(override_config)?;
            let index = match staged.iter().position(|(p, _)| *p == bundle) {
                Some(index) => index,
                None => {
                    let doc = load_bundle(&bundle)?;
                    staged.push((bundle.clone(), doc));
                    staged.len() - 1
                }
            };

            let updated = apply_override(&bundle, &staged[index].1, &path, override_config)?;
            staged[index].1 = updated;
            debug!(
                message = "Staged override",
                app = %override_config.app,
                path = %path,
                bundle = ?bundle
            );
        }

        let mut rendered = Vec::with_capacity(staged.len());
        for (bundle, doc) in &staged {
            rendered.push((bundle, render_bundle(bundle, doc)?));
        }
        for (bundle, contents) in &rendered {
            write_bundle(bundle, contents)?;
            info!(message = "Wrote bundle", bundle = ?bundle);
        }
        Ok(rendered.len())
    }

    /// Resolves the bundle file and document path for an override.
    fn locate(&self, override_config: &OverrideConfig) -> DeploymentResult<(PathBuf, PathExpression)> {
        if !is_single_component(&override_config.app) {
            return Err(DeploymentError::InvalidOverride {
                app: override_config.app.clone(),
                reason: "app must be a single directory name".to_string(),
            });
        }

        let bundle = self.bundle_path(&override_config.app);
        if !bundle.is_file() {
            return Err(DeploymentError::BundleNotFound { path: bundle });
        }
        let path = Self::values_path(override_config)?;
        Ok((bundle, path))
    }
}

fn is_single_component(name: &str) -> bool {
    let mut components = Path::new(name).components();
    matches!(components.next(), Some(Component::Normal(_))) && components.next().is_none()
}

fn load_bundle(bundle: &Path) -> DeploymentResult<ConfigDocument> {
    read_file(bundle).map_err(|source| DeploymentError::BundleUpdate {
        path: bundle.to_path_buf(),
        source,
    })
}

fn apply_override(
    bundle: &Path,
    doc: &ConfigDocument,
    path: &PathExpression,
    override_config: &OverrideConfig,
) -> DeploymentResult<ConfigDocument> {
    override_path(
        doc,
        path,
        Value::String(override_config.value.clone()),
        OverrideMode::CreateMissing,
    )
    .map_err(|source| DeploymentError::BundleUpdate {
        path: bundle.to_path_buf(),
        source,
    })
}

fn render_bundle(bundle: &Path, doc: &ConfigDocument) -> DeploymentResult<String> {
    doc.render().map_err(|source| DeploymentError::BundleUpdate {
        path: bundle.to_path_buf(),
        source,
    })
}

/// Replaces the contents of `bundle` with `contents`.
///
/// The new contents are written to a temporary file in the same directory
/// and renamed over the bundle, so readers see either the old or the new
/// file. The bundle's permissions are kept.
pub fn write_bundle(bundle: &Path, contents: &str) -> DeploymentResult<()> {
    let write_error = |source: io::Error| DeploymentError::BundleWrite {
        path: bundle.to_path_buf(),
        source,
    };

    let dir = bundle.parent().unwrap_or_else(|| Path::new("."));
    let mut temp = NamedTempFile::new_in(dir).map_err(write_error)?;
    temp.write_all(contents.as_bytes()).map_err(write_error)?;
    if let Ok(metadata) = fs::metadata(bundle) {
        fs::set_permissions(temp.path(), metadata.permissions()).map_err(write_error)?;
    }
    temp.persist(bundle).map_err(|e| write_error(e.error))?;

    debug!(message = "Wrote bundle file", bundle = ?bundle, bytes = contents.len());
    Ok(())
}
