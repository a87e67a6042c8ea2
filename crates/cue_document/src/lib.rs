//! CUE document model for deployment bundles
//!
//! This crate reads bundle documents written in a subset of CUE, evaluates
//! them into concrete value trees, replaces values at dotted paths and
//! renders the result back to canonical source text.
//!
//! Supported: package clauses, comments, attributes, regular, quoted,
//! definition (`#D`), hidden (`_h`) and optional (`a?`) labels, structs,
//! lists, scalars, basic kinds, `_`, unification, disjunctions with defaults
//! and references with selectors. Imports, comprehensions, interpolation and
//! arithmetic are rejected at compile time.

use std::fs;
use std::path::Path;

use serde_json::Value;
use tracing::debug;

mod ast;
pub mod errors;
mod evaluator;
mod formatter;
mod lexer;
pub mod override_engine;
mod parser;
pub mod path;

pub use errors::{Error, Result};
pub use override_engine::{override_path, update_file, OverrideMode};
pub use path::PathExpression;

use ast::SourceFile;

#[cfg(test)]
#[path = "lib_tests.rs"]
mod tests;

/// A compiled document.
///
/// Compilation only checks syntax. Evaluation errors such as conflicting
/// values surface from [`ConfigDocument::to_value`], [`ConfigDocument::lookup`]
/// and [`ConfigDocument::render`].
#[derive(Debug, Clone, PartialEq)]
pub struct ConfigDocument {
    source: SourceFile,
}

impl ConfigDocument {
    /// Compiles source text. JSON text is accepted as well.
    pub fn compile(source: impl AsRef<[u8]>) -> Result<Self> {
        let text = std::str::from_utf8(source.as_ref()).map_err(|e| {
            let prefix = &source.as_ref()[..e.valid_up_to()];
            let line = prefix.iter().filter(|b| **b == b'\n').count() + 1;
            let column = prefix.iter().rev().take_while(|b| **b != b'\n').count() + 1;
            Error::Compile {
                line,
                column,
                message: "source is not valid UTF-8".to_string(),
            }
        })?;
        let source = parser::parse(text)?;
        Ok(Self { source })
    }

    /// The name from the `package` clause, if any.
    pub fn package(&self) -> Option<&str> {
        self.source.package.as_deref()
    }

    pub(crate) fn set_package(&mut self, package: Option<String>) {
        self.source.package = package;
    }

    /// The concrete value at `path`.
    pub fn lookup(&self, path: &PathExpression) -> Result<Value> {
        evaluator::lookup(&self.source, path.segments())?.ok_or_else(|| Error::PathNotFound {
            path: path.to_string(),
        })
    }

    /// Whether a field is declared at `path`.
    ///
    /// The value at `path` does not need to be concrete.
    pub fn exists(&self, path: &PathExpression) -> Result<bool> {
        evaluator::exists(&self.source, path.segments())
    }

    /// Evaluates the whole document into a plain value tree.
    pub fn to_value(&self) -> Result<Value> {
        evaluator::export(&self.source)
    }

    /// Renders the evaluated document as canonical source text.
    pub fn render(&self) -> Result<String> {
        let value = self.to_value()?;
        formatter::format_document(self.package(), &value)
    }
}

/// Reads and compiles the document at `file`.
pub fn read_file(file: &Path) -> Result<ConfigDocument> {
    debug!(message = "Reading document", file = ?file);

    let bytes = fs::read(file).map_err(|source| Error::SourceRead {
        path: file.to_path_buf(),
        source,
    })?;
    ConfigDocument::compile(bytes)
}
