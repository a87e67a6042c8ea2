//! Dot separated path expressions addressing a location inside a document.
//!
//! A path such as `bundle.instances.api.values.image.tag` is parsed into an
//! ordered list of map keys. Segments that contain a literal `.` can be
//! written in double quotes (`values."app.kubernetes.io/name"`), using JSON
//! string escaping. List indices are not supported; every segment is a
//! struct label.

use std::fmt;
use std::str::FromStr;

use crate::errors::{Error, Result};

#[cfg(test)]
#[path = "path_tests.rs"]
mod tests;

/// A non-empty sequence of struct labels.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct PathExpression {
    segments: Vec<String>,
}

impl PathExpression {
    /// Parses a dot separated path.
    ///
    /// Without quotes this is the same as splitting on `.`, except that empty
    /// segments are rejected.
    ///
    /// # Examples
    ///
    /// ```rust
    /// use cue_document::PathExpression;
    ///
    /// let path = PathExpression::parse(r#"values."app.kubernetes.io/name""#).unwrap();
    /// assert_eq!(path.segments(), ["values", "app.kubernetes.io/name"]);
    /// ```
    pub fn parse(input: &str) -> Result<Self> {
        let invalid = |reason: &str| Error::InvalidPath {
            input: input.to_string(),
            reason: reason.to_string(),
        };

        if input.is_empty() {
            return Err(invalid("path is empty"));
        }

        let mut segments = Vec::new();
        let mut rest = input;
        loop {
            let (segment, remainder) = if rest.starts_with('"') {
                let end = closing_quote(rest).ok_or_else(|| invalid("unterminated quote"))?;
                let segment: String = serde_json::from_str(&rest[..=end])
                    .map_err(|e| invalid(&format!("invalid quoted segment: {e}")))?;
                let remainder = &rest[end + 1..];
                if !remainder.is_empty() && !remainder.starts_with('.') {
                    return Err(invalid("expected '.' after quoted segment"));
                }
                (segment, remainder)
            } else {
                match rest.find('.') {
                    Some(pos) => (rest[..pos].to_string(), &rest[pos..]),
                    None => (rest.to_string(), ""),
                }
            };

            if segment.is_empty() {
                return Err(invalid("path contains an empty segment"));
            }
            segments.push(segment);

            match remainder.strip_prefix('.') {
                Some(next) => {
                    if next.is_empty() {
                        return Err(invalid("path ends with '.'"));
                    }
                    rest = next;
                }
                None => break,
            }
        }

        Ok(Self { segments })
    }

    /// Builds a path from already separated segments.
    pub fn from_segments<I, S>(segments: I) -> Result<Self>
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let segments: Vec<String> = segments.into_iter().map(Into::into).collect();
        if segments.is_empty() {
            return Err(Error::InvalidPath {
                input: String::new(),
                reason: "path is empty".to_string(),
            });
        }
        if segments.iter().any(String::is_empty) {
            return Err(Error::InvalidPath {
                input: segments.join("."),
                reason: "path contains an empty segment".to_string(),
            });
        }
        Ok(Self { segments })
    }

    pub fn segments(&self) -> &[String] {
        &self.segments
    }

    pub fn len(&self) -> usize {
        self.segments.len()
    }

    /// Always `false`; kept for API symmetry with `len`.
    pub fn is_empty(&self) -> bool {
        self.segments.is_empty()
    }

    /// Appends `other` to this path.
    pub fn join(&self, other: &PathExpression) -> PathExpression {
        let mut segments = self.segments.clone();
        segments.extend(other.segments.iter().cloned());
        PathExpression { segments }
    }

    /// Splits off the final segment.
    pub fn split_last(&self) -> (&str, &[String]) {
        let (last, parents) = self
            .segments
            .split_last()
            .map(|(last, parents)| (last.as_str(), parents))
            .unwrap_or(("", &[]));
        (last, parents)
    }
}

impl FromStr for PathExpression {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        PathExpression::parse(s)
    }
}

impl fmt::Display for PathExpression {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (index, segment) in self.segments.iter().enumerate() {
            if index > 0 {
                f.write_str(".")?;
            }
            if segment.contains('.') || segment.starts_with('"') {
                let quoted = serde_json::to_string(segment).map_err(|_| fmt::Error)?;
                f.write_str(&quoted)?;
            } else {
                f.write_str(segment)?;
            }
        }
        Ok(())
    }
}

/// Byte offset of the quote closing the string that opens at offset 0.
fn closing_quote(input: &str) -> Option<usize> {
    let mut escaped = false;
    for (offset, ch) in input.char_indices().skip(1) {
        match ch {
            _ if escaped => escaped = false,
            '\\' => escaped = true,
            '"' => return Some(offset),
            _ => {}
        }
    }
    None
}
