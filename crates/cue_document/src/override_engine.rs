//! Path based value replacement.
//!
//! A compiled document cannot be edited in place: a concrete field such as
//! `tag: "v1"` unifies with any later `tag: "v2"` into a conflict. Instead the
//! document is exported to a plain value tree, the tree is mutated, and the
//! result is serialized to JSON and compiled again. Comments, definitions,
//! references and formatting of the source are not carried over; only the
//! concrete values (and the package clause) survive the round trip.

use std::path::Path;

use serde_json::{Map, Value};
use tracing::{debug, info};

use crate::errors::{Error, Result};
use crate::path::PathExpression;
use crate::{read_file, ConfigDocument};

#[cfg(test)]
#[path = "override_engine_tests.rs"]
mod tests;

/// How [`override_path`] treats parts of the path that are missing.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum OverrideMode {
    /// The full path must already exist in the document.
    #[default]
    Strict,

    /// Missing intermediate structs are created and a missing final field is
    /// added. An existing non-struct value in an intermediate position is an
    /// error rather than being replaced.
    CreateMissing,
}

/// Returns a new document with `value` installed at `path`.
///
/// `doc` itself is left untouched.
///
/// # Examples
///
/// ```rust
/// use cue_document::{override_path, ConfigDocument, OverrideMode, PathExpression};
/// use serde_json::json;
///
/// let doc = ConfigDocument::compile("foo: 1").unwrap();
/// let path = PathExpression::parse("foo").unwrap();
/// let updated = override_path(&doc, &path, json!(2), OverrideMode::Strict).unwrap();
/// assert_eq!(updated.lookup(&path).unwrap(), json!(2));
/// ```
pub fn override_path(
    doc: &ConfigDocument,
    path: &PathExpression,
    value: Value,
    mode: OverrideMode,
) -> Result<ConfigDocument> {
    let mut tree = doc.to_value()?;
    set_value(&mut tree, path, value, mode)?;

    let json = serde_json::to_vec(&tree).map_err(|e| Error::Serialization(e.to_string()))?;
    let mut updated = ConfigDocument::compile(json)?;
    updated.set_package(doc.package().map(str::to_string));
    Ok(updated)
}

/// Reads `file`, installs `value` at `path` and returns the rendered result.
///
/// The file is not modified.
pub fn update_file(
    file: &Path,
    path: &PathExpression,
    value: Value,
    mode: OverrideMode,
) -> Result<String> {
    debug!(
        message = "Updating document",
        file = ?file,
        path = %path,
        mode = ?mode
    );

    let doc = read_file(file)?;
    let updated = override_path(&doc, path, value, mode)?;
    let rendered = updated.render()?;

    info!(
        message = "Rendered updated document",
        file = ?file,
        path = %path,
        bytes = rendered.len()
    );
    Ok(rendered)
}

/// Sets `value` at `path` inside a plain value tree.
pub(crate) fn set_value(
    tree: &mut Value,
    path: &PathExpression,
    value: Value,
    mode: OverrideMode,
) -> Result<()> {
    let (last, parents) = path.split_last();
    let not_found = || Error::PathNotFound {
        path: path.to_string(),
    };

    let mut current = tree;
    for (depth, segment) in parents.iter().enumerate() {
        let map = as_struct(current, path, parents, depth, mode)?;
        current = match mode {
            OverrideMode::Strict => map.get_mut(segment).ok_or_else(not_found)?,
            OverrideMode::CreateMissing => map
                .entry(segment.clone())
                .or_insert_with(|| Value::Object(Map::new())),
        };
    }

    let map = as_struct(current, path, parents, parents.len(), mode)?;
    match mode {
        OverrideMode::Strict => {
            let slot = map.get_mut(last).ok_or_else(not_found)?;
            *slot = value;
        }
        OverrideMode::CreateMissing => {
            map.insert(last.to_string(), value);
        }
    }
    Ok(())
}

/// The struct at `parents[..depth]`, or the error for a non-struct value there.
fn as_struct<'v>(
    value: &'v mut Value,
    path: &PathExpression,
    parents: &[String],
    depth: usize,
    mode: OverrideMode,
) -> Result<&'v mut Map<String, Value>> {
    match value {
        Value::Object(map) => Ok(map),
        _ => match mode {
            OverrideMode::Strict => Err(Error::PathNotFound {
                path: path.to_string(),
            }),
            OverrideMode::CreateMissing => Err(Error::PathConflict {
                path: path.to_string(),
                segment: parents
                    .get(depth.saturating_sub(1))
                    .cloned()
                    .unwrap_or_default(),
            }),
        },
    }
}
