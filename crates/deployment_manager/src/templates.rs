//! Substitution of placeholder override values.
//!
//! A manifest can carry a placeholder (e.g. `value: TAG`) that the pipeline
//! fills in at deploy time. Matching is on the whole value; placeholders are
//! never interpolated inside a longer string.

use tracing::debug;

use crate::errors::{DeploymentError, DeploymentResult};
use crate::manifest::OverrideConfig;

#[cfg(test)]
#[path = "templates_tests.rs"]
mod tests;

/// Replaces the value of every override whose value equals `key`.
///
/// Returns the number of overrides that were updated.
pub fn apply_template_value(overrides: &mut [OverrideConfig], key: &str, value: &str) -> usize {
    let mut replaced = 0;
    for override_config in overrides.iter_mut().filter(|o| o.value == key) {
        override_config.value = value.to_string();
        replaced += 1;
    }
    debug!(message = "Applied template value", key = %key, replaced = replaced);
    replaced
}

/// Applies each `(key, value)` pair in order.
///
/// Pairs are applied one after another, so a value substituted by an earlier
/// pair can be matched by a later one. Keys that match nothing are ignored.
pub fn apply_templates<K, V>(overrides: &mut [OverrideConfig], templates: &[(K, V)])
where
    K: AsRef<str>,
    V: AsRef<str>,
{
    for (key, value) in templates {
        apply_template_value(overrides, key.as_ref(), value.as_ref());
    }
}

/// Splits `key=value` at the first `=`.
///
/// The value may be empty or contain further `=` characters; the key may not
/// be empty.
pub fn parse_template_pair(pair: &str) -> DeploymentResult<(String, String)> {
    match pair.split_once('=') {
        Some((key, value)) if !key.is_empty() => Ok((key.to_string(), value.to_string())),
        _ => Err(DeploymentError::InvalidTemplatePair {
            pair: pair.to_string(),
        }),
    }
}
