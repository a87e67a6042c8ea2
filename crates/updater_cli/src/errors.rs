use std::io;
use std::path::PathBuf;

use deployment_manager::DeploymentError;
use thiserror::Error;

#[cfg(test)]
#[path = "errors_tests.rs"]
mod tests;

/// Errors that can occur in the updater CLI.
#[derive(Error, Debug)]
pub enum Error {
    /// The configuration file could not be read or parsed.
    #[error("Configuration error: {0}")]
    Config(String),

    /// The command-line arguments are valid for the parser but cannot be
    /// acted on, e.g. a root directory that does not exist.
    #[error("Invalid arguments: {0}")]
    InvalidArguments(String),

    /// Reading, overriding or rendering a document failed.
    #[error(transparent)]
    Document(#[from] cue_document::Error),

    /// Scanning manifests or applying overrides to bundles failed.
    #[error(transparent)]
    Deployment(#[from] DeploymentError),

    /// The override input file could not be read.
    #[error("Failed to read input data from {path:?}: {source}")]
    ReadInput {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    /// The override input could not be read from standard input.
    #[error("Failed to read input data from stdin: {0}")]
    ReadStdin(#[source] io::Error),

    /// The override input is not a JSON array of overrides.
    #[error("Failed to parse input data: {0}")]
    ParseInput(#[source] serde_json::Error),

    /// The scan result could not be serialized.
    #[error("Failed to marshal overrides: {0}")]
    SerializeOutput(#[source] serde_json::Error),

    /// Writing to standard output failed.
    #[error("Failed to write output: {0}")]
    WriteOutput(#[source] io::Error),
}
