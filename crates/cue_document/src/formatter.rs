//! Canonical source rendering of a concrete value tree.
//!
//! The output uses tab indentation, aligns the values of consecutive
//! single-line fields and ends with a newline. Rendering the same tree twice
//! always produces the same bytes.

use serde_json::{Map, Value};

use crate::errors::{Error, Result};

#[cfg(test)]
#[path = "formatter_tests.rs"]
mod tests;

/// Identifiers that cannot be used as unquoted labels.
const RESERVED_LABELS: &[&str] = &[
    "package", "import", "for", "in", "if", "let", "true", "false", "null",
];

/// Renders `value` as a source file, preceded by `package <name>` when given.
///
/// The top-level value must be an object.
pub(crate) fn format_document(package: Option<&str>, value: &Value) -> Result<String> {
    let Value::Object(fields) = value else {
        return Err(Error::Serialization(format!(
            "top-level value must be a struct, found {}",
            type_name(value)
        )));
    };

    let mut out = String::new();
    if let Some(name) = package {
        out.push_str("package ");
        out.push_str(name);
        out.push_str("\n\n");
    }
    if fields.is_empty() {
        out.push_str("{}\n");
    }
    write_fields(&mut out, fields, 0)?;
    Ok(out)
}

fn write_fields(out: &mut String, fields: &Map<String, Value>, depth: usize) -> Result<()> {
    let entries: Vec<(String, &Value)> = fields
        .iter()
        .map(|(name, value)| (format_label(name), value))
        .collect();

    let mut start = 0;
    while start < entries.len() {
        if !is_inline(entries[start].1) {
            let (label, value) = &entries[start];
            indent(out, depth);
            out.push_str(label);
            out.push_str(": ");
            write_value(out, value, depth)?;
            out.push('\n');
            start += 1;
            continue;
        }

        let end = entries[start..]
            .iter()
            .position(|(_, value)| !is_inline(value))
            .map_or(entries.len(), |offset| start + offset);
        let width = entries[start..end]
            .iter()
            .map(|(label, _)| label.chars().count())
            .max()
            .unwrap_or(0);

        for (label, value) in &entries[start..end] {
            indent(out, depth);
            out.push_str(label);
            out.push(':');
            let padding = width - label.chars().count() + 1;
            out.extend(std::iter::repeat(' ').take(padding));
            write_value(out, value, depth)?;
            out.push('\n');
        }
        start = end;
    }
    Ok(())
}

fn write_value(out: &mut String, value: &Value, depth: usize) -> Result<()> {
    match value {
        Value::Object(fields) if fields.is_empty() => out.push_str("{}"),
        Value::Object(fields) => {
            out.push_str("{\n");
            write_fields(out, fields, depth + 1)?;
            indent(out, depth);
            out.push('}');
        }
        Value::Array(items) if items.iter().all(is_scalar) => {
            out.push('[');
            for (i, item) in items.iter().enumerate() {
                if i > 0 {
                    out.push_str(", ");
                }
                write_scalar(out, item)?;
            }
            out.push(']');
        }
        Value::Array(items) => {
            out.push_str("[\n");
            for item in items {
                indent(out, depth + 1);
                write_value(out, item, depth + 1)?;
                out.push_str(",\n");
            }
            indent(out, depth);
            out.push(']');
        }
        scalar => write_scalar(out, scalar)?,
    }
    Ok(())
}

fn write_scalar(out: &mut String, value: &Value) -> Result<()> {
    let text = serde_json::to_string(value).map_err(|e| Error::Serialization(e.to_string()))?;
    out.push_str(&text);
    Ok(())
}

/// Values rendered on a single line take part in label alignment.
fn is_inline(value: &Value) -> bool {
    match value {
        Value::Object(fields) => fields.is_empty(),
        Value::Array(items) => items.iter().all(is_scalar),
        _ => true,
    }
}

fn is_scalar(value: &Value) -> bool {
    !matches!(value, Value::Object(_) | Value::Array(_))
}

fn indent(out: &mut String, depth: usize) {
    out.extend(std::iter::repeat('\t').take(depth));
}

/// Writes `name` bare when it is a plain identifier, quoted otherwise.
pub(crate) fn format_label(name: &str) -> String {
    let mut chars = name.chars();
    let plain = matches!(chars.next(), Some(c) if c.is_ascii_alphabetic() || c == '$')
        && chars.all(|c| c.is_ascii_alphanumeric() || c == '_' || c == '$')
        && !RESERVED_LABELS.contains(&name);
    if plain {
        name.to_string()
    } else {
        Value::String(name.to_string()).to_string()
    }
}

fn type_name(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "bool",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "list",
        Value::Object(_) => "struct",
    }
}
