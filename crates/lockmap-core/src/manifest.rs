//! Package manifest (`package.json`) as served by the CDN.

use serde::{Deserialize, Deserializer};
use serde_json::{Map, Value};

/// The `exports` field, classified once at parse time.
#[derive(Debug, Clone, PartialEq)]
pub enum ExportsField {
    /// `"exports": "./index.js"`: a single root target.
    Target(String),
    /// A root-only target gated by conditions, e.g.
    /// `{"import": "./esm.js", "default": "./cjs.js"}`, or a fallback array.
    Conditional(Value),
    /// Subpath map whose keys start with `.`, in declaration order.
    Subpaths(Map<String, Value>),
}

impl ExportsField {
    /// Classify a raw `exports` value. `null` and scalars other than strings
    /// are treated as if the field were absent.
    #[must_use]
    pub fn from_value(value: Value) -> Option<Self> {
        match value {
            Value::String(target) => Some(Self::Target(target)),
            Value::Object(map) => {
                // Node requires all keys to agree; the first one decides.
                // `{}` has no first key and exports nothing.
                let is_subpaths = map.keys().next().map_or(true, |k| k.starts_with('.'));
                if is_subpaths {
                    Some(Self::Subpaths(map))
                } else {
                    Some(Self::Conditional(Value::Object(map)))
                }
            }
            Value::Array(items) if items.is_empty() => Some(Self::Subpaths(Map::new())),
            Value::Array(_) => Some(Self::Conditional(value)),
            Value::Null | Value::Bool(_) | Value::Number(_) => None,
        }
    }
}

fn deserialize_exports<'de, D>(deserializer: D) -> Result<Option<ExportsField>, D::Error>
where
    D: Deserializer<'de>,
{
    let value = Option::<Value>::deserialize(deserializer)?;
    Ok(value.and_then(ExportsField::from_value))
}

/// The manifest fields that decide where a package's entry points live.
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
pub struct PackageManifest {
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub version: Option<String>,
    #[serde(default, deserialize_with = "deserialize_exports")]
    pub exports: Option<ExportsField>,
    #[serde(default)]
    pub module: Option<Value>,
    #[serde(default)]
    pub main: Option<Value>,
}

impl PackageManifest {
    /// Parse a manifest from JSON text.
    pub fn from_json(source: &str) -> Result<Self, serde_json::Error> {
        serde_json::from_str(source)
    }

    /// The declared entry point: `module`, then `main`, whichever is first a
    /// string, with a leading `./` or `/` removed.
    #[must_use]
    pub fn entry_field(&self) -> Option<&str> {
        [&self.module, &self.main]
            .into_iter()
            .find_map(|field| field.as_ref().and_then(Value::as_str))
            .map(|entry| {
                entry
                    .strip_prefix("./")
                    .or_else(|| entry.strip_prefix('/'))
                    .unwrap_or(entry)
            })
    }
}
