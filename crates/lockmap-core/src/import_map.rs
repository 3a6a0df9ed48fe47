//! The import map document.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Specifier -> URL. Sorted so serialized output is stable.
pub type SpecifierMap = BTreeMap<String, String>;

/// A browser import map: top-level `imports` plus per-URL-prefix `scopes`.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ImportMap {
    #[serde(default)]
    pub imports: SpecifierMap,
    #[serde(default)]
    pub scopes: BTreeMap<String, SpecifierMap>,
}

impl ImportMap {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Parse an import map from JSON text.
    pub fn from_json(source: &str) -> serde_json::Result<Self> {
        serde_json::from_str(source)
    }

    /// Remove scopes with no entries. Returns how many were removed.
    pub fn prune_empty_scopes(&mut self) -> usize {
        let before = self.scopes.len();
        self.scopes.retain(|_, specifiers| !specifiers.is_empty());
        before - self.scopes.len()
    }

    /// Pretty-printed JSON with two-space indentation.
    pub fn to_json(&self) -> serde_json::Result<String> {
        serde_json::to_string_pretty(self)
    }

    /// Resolve a bare specifier the way a browser applies this map.
    ///
    /// Scopes whose prefix matches `referrer` are consulted longest first,
    /// then `imports`. Within one specifier map an exact key wins over the
    /// longest matching `/`-terminated key.
    #[must_use]
    pub fn resolve(&self, specifier: &str, referrer: Option<&str>) -> Option<String> {
        if let Some(referrer) = referrer {
            let mut matching: Vec<(&String, &SpecifierMap)> = self
                .scopes
                .iter()
                .filter(|(prefix, _)| referrer.starts_with(prefix.as_str()))
                .collect();
            matching.sort_by_key(|(prefix, _)| std::cmp::Reverse(prefix.len()));

            for (_, specifiers) in matching {
                if let Some(url) = lookup(specifiers, specifier) {
                    return Some(url);
                }
            }
        }

        lookup(&self.imports, specifier)
    }
}

fn lookup(specifiers: &SpecifierMap, specifier: &str) -> Option<String> {
    if let Some(url) = specifiers.get(specifier) {
        return Some(url.clone());
    }

    specifiers
        .iter()
        .filter(|(key, url)| {
            key.ends_with('/') && url.ends_with('/') && specifier.starts_with(key.as_str())
        })
        .max_by_key(|(key, _)| key.len())
        .map(|(key, url)| format!("{url}{}", &specifier[key.len()..]))
}
