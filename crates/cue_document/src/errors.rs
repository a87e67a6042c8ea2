use std::io;
use std::path::PathBuf;

use thiserror::Error;

#[cfg(test)]
#[path = "errors_tests.rs"]
mod tests;

/// Errors that can occur while reading, evaluating, overriding or rendering a
/// CUE document.
///
/// # Examples
///
/// ```rust
/// use cue_document::{ConfigDocument, Error, PathExpression};
///
/// let doc = ConfigDocument::compile("foo: 1").unwrap();
/// let path = PathExpression::parse("bar").unwrap();
/// match doc.lookup(&path) {
///     Err(Error::PathNotFound { path }) => assert_eq!(path, "bar"),
///     other => panic!("unexpected result: {other:?}"),
/// }
/// ```
#[derive(Error, Debug)]
pub enum Error {
    /// The document source could not be read from disk.
    #[error("Failed to read file {path:?}: {source}")]
    SourceRead {
        /// The file that was being read
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    /// The source text is not valid for the supported CUE subset.
    #[error("Failed to compile document at line {line}, column {column}: {message}")]
    Compile {
        line: usize,
        column: usize,
        message: String,
    },

    /// A path that must exist could not be resolved in the document.
    #[error("Path {path} does not exist")]
    PathNotFound { path: String },

    /// A path expression is empty or contains an empty segment.
    #[error("Invalid path expression '{input}': {reason}")]
    InvalidPath { input: String, reason: String },

    /// A missing struct could not be created because a non-struct value
    /// already occupies that position.
    #[error("Cannot create path {path}: '{segment}' is not a struct")]
    PathConflict { path: String, segment: String },

    /// The document could not be reduced to a concrete value.
    ///
    /// This covers conflicting values, unresolved references, reference
    /// cycles and values that are still abstract (e.g. `string`).
    #[error("Failed to evaluate document at {path}: {reason}")]
    Evaluation { path: String, reason: String },

    /// The mutated value tree could not be turned back into source text.
    #[error("Failed to serialize document: {0}")]
    Serialization(String),
}

/// Result type alias for document operations.
pub type Result<T> = std::result::Result<T, Error>;
