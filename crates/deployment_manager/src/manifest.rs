//! Deployment manifest types.
//!
//! A manifest is a YAML file named [`DEPLOYMENT_FILENAME`] that lists values
//! to override in application bundles:
//!
//! ```yaml
//! overrides:
//!   - app: podinfo
//!     instance: podinfo-canary
//!     path: image.tag
//!     value: "6.6.0"
//! ```

use serde::{Deserialize, Serialize};

#[cfg(test)]
#[path = "manifest_tests.rs"]
mod tests;

/// File name that identifies a deployment manifest.
pub const DEPLOYMENT_FILENAME: &str = "deployment.yml";

/// The contents of one deployment manifest.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize, Serialize)]
pub struct DeploymentFile {
    #[serde(default)]
    pub overrides: Vec<OverrideConfig>,
}

/// A request to replace one value in an application's bundle.
///
/// The same shape is used in manifests and in the JSON array exchanged
/// between `scan` and `update deployments`.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Deserialize, Serialize)]
pub struct OverrideConfig {
    /// Application whose bundle is updated.
    pub app: String,

    /// Bundle instance to update. Empty means the instance named after the app.
    #[serde(default)]
    pub instance: String,

    /// Dotted path below the instance's `values`.
    pub path: String,

    /// New value, or a template key to be substituted before applying.
    pub value: String,
}

impl OverrideConfig {
    pub fn new(app: impl Into<String>, path: impl Into<String>, value: impl Into<String>) -> Self {
        Self {
            app: app.into(),
            instance: String::new(),
            path: path.into(),
            value: value.into(),
        }
    }

    pub fn with_instance(mut self, instance: impl Into<String>) -> Self {
        self.instance = instance.into();
        self
    }

    /// The bundle instance this override targets.
    pub fn instance_name(&self) -> &str {
        if self.instance.is_empty() {
            &self.app
        } else {
            &self.instance
        }
    }
}
