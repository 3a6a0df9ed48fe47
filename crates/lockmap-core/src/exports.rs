//! Package.json `exports` condition matching.
//!
//! Mirrors the matching rules bundlers and CDNs apply:
//! - String shorthand (`"exports": "./index.js"`)
//! - Root condition maps (`{"import": ..., "default": ...}`)
//! - Subpath maps, with `./dir/` folder keys and `./dir/*` pattern keys
//! - Fallback arrays, tried in order
//!
//! Conditions are matched in the order the package declares them, not in the
//! order the caller lists them.

use crate::manifest::ExportsField;
use serde_json::Value;
use std::fmt;
use thiserror::Error;

/// The set of condition names a lookup accepts.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Conditions {
    allowed: Vec<String>,
}

impl Conditions {
    /// Build the allowed set: `default`, the requested conditions, `import`,
    /// and the platform condition (`browser` or `node`).
    #[must_use]
    pub fn new(requested: &[String], browser: bool) -> Self {
        let platform = if browser { "browser" } else { "node" };
        let mut allowed: Vec<String> = Vec::with_capacity(requested.len() + 3);

        for name in std::iter::once("default")
            .chain(requested.iter().map(String::as_str))
            .chain(["import", platform])
        {
            if !allowed.iter().any(|a| a == name) {
                allowed.push(name.to_string());
            }
        }

        Self { allowed }
    }

    /// Whether `key` is an accepted condition.
    #[must_use]
    pub fn allows(&self, key: &str) -> bool {
        self.allowed.iter().any(|a| a == key)
    }

    /// Accepted condition names.
    #[must_use]
    pub fn names(&self) -> &[String] {
        &self.allowed
    }
}

impl Default for Conditions {
    fn default() -> Self {
        Self::new(&["module".to_string()], false)
    }
}

impl fmt::Display for Conditions {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.allowed.join(", "))
    }
}

/// Failure to match a requested subpath against `exports`.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ExportError {
    /// No key in `exports` covers the subpath.
    #[error("missing \"{0}\" export")]
    Missing(String),
    /// A key covers the subpath but none of its conditions are accepted.
    #[error("no known conditions for \"{subpath}\" export (accepted: {accepted})")]
    NoConditions { subpath: String, accepted: String },
}

/// Walk an export target, returning the first string reached through
/// accepted conditions.
///
/// Within an object the first accepted key (in declaration order) is taken
/// and its value followed; later keys are never consulted. Arrays are tried
/// element by element.
#[must_use]
pub fn resolve_target<'a>(target: &'a Value, conditions: &Conditions) -> Option<&'a str> {
    match target {
        Value::String(s) => Some(s),
        Value::Array(items) => items
            .iter()
            .find_map(|item| resolve_target(item, conditions)),
        Value::Object(map) => map
            .iter()
            .find(|(key, _)| conditions.allows(key))
            .and_then(|(_, value)| resolve_target(value, conditions)),
        Value::Null | Value::Bool(_) | Value::Number(_) => None,
    }
}

/// Resolve `subpath` (`.` or `./feature`) against a classified `exports`
/// field. Returns the target as declared, typically starting with `./`.
pub fn resolve_export(
    exports: &ExportsField,
    subpath: &str,
    conditions: &Conditions,
) -> Result<String, ExportError> {
    let no_conditions = || ExportError::NoConditions {
        subpath: subpath.to_string(),
        accepted: conditions.to_string(),
    };

    match exports {
        ExportsField::Target(target) => {
            if subpath == "." {
                Ok(target.clone())
            } else {
                Err(ExportError::Missing(subpath.to_string()))
            }
        }
        ExportsField::Conditional(target) => {
            if subpath != "." {
                return Err(ExportError::Missing(subpath.to_string()));
            }
            resolve_target(target, conditions)
                .map(str::to_string)
                .ok_or_else(no_conditions)
        }
        ExportsField::Subpaths(map) => {
            if let Some(target) = map.get(subpath) {
                return resolve_target(target, conditions)
                    .map(str::to_string)
                    .ok_or_else(no_conditions);
            }

            for (key, target) in map {
                if let Some(prefix) = key.strip_suffix('*') {
                    let rest = subpath.strip_prefix(prefix).unwrap_or_default();
                    if subpath.starts_with(prefix) && !rest.is_empty() {
                        let resolved = resolve_target(target, conditions).ok_or_else(no_conditions)?;
                        return Ok(resolved.replacen('*', rest, 1));
                    }
                } else if key.ends_with('/') {
                    if let Some(rest) = subpath.strip_prefix(key.as_str()) {
                        let resolved = resolve_target(target, conditions).ok_or_else(no_conditions)?;
                        return Ok(format!("{resolved}{rest}"));
                    }
                }
            }

            Err(ExportError::Missing(subpath.to_string()))
        }
    }
}

/// Strip the leading `./` from an export target, yielding a path relative
/// to the package root.
#[must_use]
pub fn relative_target(target: &str) -> &str {
    target
        .strip_prefix("./")
        .or_else(|| target.strip_prefix('/'))
        .unwrap_or(target)
}
