//! Deployment pipeline error types.
//!
//! Errors raised while scanning for deployment manifests and applying the
//! overrides they contain to bundle files.

use std::io;
use std::path::PathBuf;

use thiserror::Error;

#[cfg(test)]
#[path = "errors_tests.rs"]
mod tests;

/// Errors that can occur while scanning manifests or applying overrides.
#[derive(Error, Debug)]
pub enum DeploymentError {
    /// The scan root or one of its descendants could not be traversed.
    #[error("Failed to walk directory {path:?}: {source}")]
    Walk {
        path: PathBuf,
        #[source]
        source: walkdir::Error,
    },

    /// A manifest file was found but could not be read.
    #[error("Failed to read manifest {path:?}: {source}")]
    ManifestRead {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    /// The bundle file an override addresses does not exist.
    #[error("Bundle file not found: {path:?}")]
    BundleNotFound { path: PathBuf },

    /// The override could not be applied to the bundle document.
    #[error("Failed to update bundle {path:?}: {source}")]
    BundleUpdate {
        path: PathBuf,
        #[source]
        source: cue_document::Error,
    },

    /// The updated bundle could not be written back to disk.
    #[error("Failed to write bundle {path:?}: {source}")]
    BundleWrite {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    /// The override cannot address a bundle, e.g. its app name is empty or
    /// its path expression is malformed.
    #[error("Invalid override for app '{app}': {reason}")]
    InvalidOverride { app: String, reason: String },

    /// A template argument was not of the form `key=value`.
    #[error("Invalid template '{pair}': expected key=value")]
    InvalidTemplatePair { pair: String },
}

/// Result type alias for deployment operations.
pub type DeploymentResult<T> = Result<T, DeploymentError>;
