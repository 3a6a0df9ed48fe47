//! Turn a package manifest into the specifiers it contributes to an import map.

use crate::cdn::{CdnLayout, MetadataSource, PackageRef};
use crate::error::ResolutionError;
use crate::exports::{relative_target, resolve_export, resolve_target, Conditions, ExportError};
use crate::listing::FileListing;
use crate::manifest::{ExportsField, PackageManifest};
use serde_json::{Map, Value};
use std::collections::BTreeMap;
use tracing::{debug, warn};

/// Specifier -> absolute URL for one package-version.
pub type ResolvedDefinition = BTreeMap<String, String>;

/// Extensions probed after an entry point without `exports`, in order.
const PROBE_EXTENSIONS: [&str; 4] = ["", ".mjs", ".js", ".json"];

/// Entry point assumed when `module` and `main` do not lead anywhere.
const DEFAULT_ENTRY: &str = "index.js";

/// A resolved definition and what it took to build it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Resolved {
    pub definition: ResolvedDefinition,
    /// Whether the file listing had to be fetched.
    pub fetched_listing: bool,
}

/// Fetch what a package-version needs and build its definition.
///
/// The listing is only requested for packages without `exports`.
pub async fn fetch_definition<S: MetadataSource>(
    source: &S,
    pkg: &PackageRef,
    conditions: &Conditions,
) -> Result<Resolved, ResolutionError> {
    let manifest = source.fetch_manifest(pkg).await?;

    if let Some(exports) = &manifest.exports {
        let definition = resolve_exports(source.layout(), pkg, exports, conditions)?;
        return Ok(Resolved {
            definition,
            fetched_listing: false,
        });
    }

    let listing = source.fetch_listing(pkg).await?;
    Ok(Resolved {
        definition: resolve_without_exports(source.layout(), pkg, &manifest, &listing),
        fetched_listing: true,
    })
}

/// Definition of a package that declares `exports`.
///
/// Condition-matching failures are fatal for the package.
pub fn resolve_exports(
    layout: &CdnLayout,
    pkg: &PackageRef,
    exports: &ExportsField,
    conditions: &Conditions,
) -> Result<ResolvedDefinition, ResolutionError> {
    let unresolved = |e: ExportError| {
        ResolutionError::export_unresolved(format!("{e}")).for_package(&pkg.name, &pkg.version)
    };

    let mut definition = ResolvedDefinition::new();

    match exports {
        ExportsField::Target(_) | ExportsField::Conditional(_) => {
            let target = resolve_export(exports, ".", conditions).map_err(unresolved)?;
            definition.insert(
                pkg.name.clone(),
                layout.file_url(pkg, relative_target(&target)),
            );
        }
        ExportsField::Subpaths(map) => {
            resolve_subpaths(layout, pkg, exports, map, conditions, &mut definition)
                .map_err(unresolved)?;
        }
    }

    Ok(definition)
}

fn resolve_subpaths(
    layout: &CdnLayout,
    pkg: &PackageRef,
    exports: &ExportsField,
    map: &Map<String, Value>,
    conditions: &Conditions,
    definition: &mut ResolvedDefinition,
) -> Result<(), ExportError> {
    let missing_conditions = |key: &str| ExportError::NoConditions {
        subpath: key.to_string(),
        accepted: conditions.to_string(),
    };

    for (key, target) in map {
        if target.is_null() {
            debug!(package = %pkg, key = %key, "Skipping excluded export");
            continue;
        }

        let specifier = key.replacen('.', &pkg.name, 1);

        if let Some(prefix) = key.strip_suffix("/*") {
            // Expose the pattern itself: "pkg/lib/" -> ".../dist/lib/"
            let resolved =
                resolve_target(target, conditions).ok_or_else(|| missing_conditions(key))?;
            let target_prefix = match resolved.find('*') {
                Some(idx) => &resolved[..idx],
                None => resolved,
            };
            definition.insert(
                format!("{}/", prefix.replacen('.', &pkg.name, 1)),
                layout.file_url(pkg, relative_target(target_prefix)),
            );
        } else if key.contains('*') {
            debug!(package = %pkg, key = %key, "Skipping pattern export an import map cannot express");
        } else if key.ends_with('/') {
            let resolved =
                resolve_target(target, conditions).ok_or_else(|| missing_conditions(key))?;
            definition.insert(specifier, layout.file_url(pkg, relative_target(resolved)));
        } else {
            let resolved = resolve_export(exports, key, conditions)?;
            definition.insert(specifier, layout.file_url(pkg, relative_target(&resolved)));
        }
    }

    Ok(())
}

/// Definition of a package without `exports`, probed against its listing.
///
/// Always contains `"<name>/"`; contains `"<name>"` only when an entry point
/// exists in the listing.
#[must_use]
pub fn resolve_without_exports(
    layout: &CdnLayout,
    pkg: &PackageRef,
    manifest: &PackageManifest,
    listing: &FileListing,
) -> ResolvedDefinition {
    let mut definition = ResolvedDefinition::new();

    match resolve_entry(manifest, listing) {
        Some(entry) => {
            definition.insert(pkg.name.clone(), layout.file_url(pkg, &entry));
        }
        None => {
            warn!(package = %pkg, "No entry point found; only the package directory is mapped");
        }
    }

    definition.insert(format!("{}/", pkg.name), layout.base_url(pkg));
    definition
}

/// Pick the entry file of a package without `exports`.
///
/// The `module`/`main` entry is probed with each of [`PROBE_EXTENSIONS`];
/// failing that, `index.js` is probed the same way.
#[must_use]
pub fn resolve_entry(manifest: &PackageManifest, listing: &FileListing) -> Option<String> {
    manifest
        .entry_field()
        .and_then(|entry| probe(entry, listing))
        .or_else(|| probe(DEFAULT_ENTRY, listing))
}

fn probe(entry: &str, listing: &FileListing) -> Option<String> {
    PROBE_EXTENSIONS
        .iter()
        .map(|ext| format!("{entry}{ext}"))
        .find(|candidate| listing.contains(candidate))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::codes;
    use serde_json::json;

    const CDN: &str = "https://cdn.jsdelivr.net/npm";

    fn pkg(name: &str, version: &str) -> PackageRef {
        PackageRef::from_version_key(name, version).unwrap()
    }

    fn manifest(value: Value) -> PackageManifest {
        serde_json::from_value(value).unwrap()
    }

    fn exports_definition(name: &str, value: Value) -> Result<ResolvedDefinition, ResolutionError> {
        let m = manifest(json!({ "name": name, "exports": value }));
        let exports = m.exports.as_ref().unwrap();
        resolve_exports(
            &CdnLayout::default(),
            &pkg(name, "1.0.0"),
            exports,
            &Conditions::default(),
        )
    }

    fn def(entries: &[(&str, String)]) -> ResolvedDefinition {
        entries
            .iter()
            .map(|(k, v)| ((*k).to_string(), v.clone()))
            .collect()
    }

    #[test]
    fn test_export_shapes() {
        let cases: Vec<(&str, Value, ResolvedDefinition)> = vec![
            (
                "string exports",
                json!("./index.js"),
                def(&[("a", format!("{CDN}/a@1.0.0/index.js"))]),
            ),
            (
                "conditional root",
                json!({ "module": "./esm/index.js", "default": "./cjs/index.js" }),
                def(&[("a", format!("{CDN}/a@1.0.0/esm/index.js"))]),
            ),
            (
                "subpath map with pattern",
                json!({
                    ".": { "import": "./dist/index.mjs", "require": "./dist/index.cjs" },
                    "./merge": "./dist/merge.mjs",
                    "./lib/*": "./dist/lib/*.js",
                    "./package.json": "./package.json"
                }),
                def(&[
                    ("a", format!("{CDN}/a@1.0.0/dist/index.mjs")),
                    ("a/merge", format!("{CDN}/a@1.0.0/dist/merge.mjs")),
                    ("a/lib/", format!("{CDN}/a@1.0.0/dist/lib/")),
                    ("a/package.json", format!("{CDN}/a@1.0.0/package.json")),
                ]),
            ),
            (
                "catch-all pattern",
                json!({ ".": "./index.js", "./*": "./*" }),
                def(&[
                    ("a", format!("{CDN}/a@1.0.0/index.js")),
                    ("a/", format!("{CDN}/a@1.0.0/")),
                ]),
            ),
            (
                "folder mapping",
                json!({ "./features/": "./src/features/" }),
                def(&[("a/features/", format!("{CDN}/a@1.0.0/src/features/"))]),
            ),
            (
                "excluded and inexpressible keys",
                json!({
                    ".": "./index.js",
                    "./internal/*": null,
                    "./*.css": "./styles/*.css"
                }),
                def(&[("a", format!("{CDN}/a@1.0.0/index.js"))]),
            ),
        ];

        for (name, exports, expected) in cases {
            let actual = exports_definition("a", exports).unwrap();
            assert_eq!(actual, expected, "case: {name}");
        }
    }

    #[test]
    fn test_conditional_root_without_match_is_fatal() {
        let err = exports_definition("a", json!({ "require": "./cjs.js" })).unwrap_err();
        assert_eq!(err.code(), codes::RESOLVE_EXPORT_UNRESOLVED);
        assert_eq!(err.package(), Some("a@1.0.0"));
    }

    #[test]
    fn test_subpath_without_match_is_fatal() {
        let err = exports_definition(
            "a",
            json!({ ".": "./index.js", "./node-only": { "require": "./n.cjs" } }),
        )
        .unwrap_err();
        assert_eq!(err.code(), codes::RESOLVE_EXPORT_UNRESOLVED);
        assert!(err.message().contains("./node-only"));
    }

    #[test]
    fn test_scoped_package_subpaths() {
        let m = manifest(json!({
            "exports": { ".": "./index.js", "./helpers/*": "./helpers/*.js" }
        }));
        let definition = resolve_exports(
            &CdnLayout::default(),
            &pkg("@babel/runtime", "7.20.0"),
            m.exports.as_ref().unwrap(),
            &Conditions::default(),
        )
        .unwrap();

        assert_eq!(
            definition["@babel/runtime/helpers/"],
            format!("{CDN}/@babel/runtime@7.20.0/helpers/")
        );
        assert_eq!(
            definition["@babel/runtime"],
            format!("{CDN}/@babel/runtime@7.20.0/index.js")
        );
    }

    #[test]
    fn test_fallback_probes_extensions() {
        let m = manifest(json!({ "module": "./dist/x", "main": "./lib/x.js" }));
        let listing = FileListing::from_paths(["dist/x.mjs", "lib/x.js", "package.json"]);
        assert_eq!(resolve_entry(&m, &listing), Some("dist/x.mjs".to_string()));
    }

    #[test]
    fn test_fallback_bare_name_wins() {
        let m = manifest(json!({ "main": "lib/x.js" }));
        let listing = FileListing::from_paths(["lib/x.js", "lib/x.js.js"]);
        assert_eq!(resolve_entry(&m, &listing), Some("lib/x.js".to_string()));
    }

    #[test]
    fn test_fallback_index_js() {
        let m = manifest(json!({ "name": "x" }));
        let listing = FileListing::from_paths(["index.js", "package.json"]);
        assert_eq!(resolve_entry(&m, &listing), Some("index.js".to_string()));
    }

    #[test]
    fn test_fallback_declared_entry_missing_uses_index() {
        let m = manifest(json!({ "main": "./gone.js" }));
        let listing = FileListing::from_paths(["index.js"]);
        assert_eq!(resolve_entry(&m, &listing), Some("index.js".to_string()));
    }

    #[test]
    fn test_fallback_exhausted_is_soft_miss() {
        let m = manifest(json!({ "main": "./gone.js" }));
        let listing = FileListing::from_paths(["README.md"]);
        assert_eq!(resolve_entry(&m, &listing), None);

        let definition =
            resolve_without_exports(&CdnLayout::default(), &pkg("x", "1.0.0"), &m, &listing);
        assert_eq!(definition, def(&[("x/", format!("{CDN}/x@1.0.0/"))]));
    }

    #[test]
    fn test_fallback_definition() {
        let m = manifest(json!({ "main": "./b.js" }));
        let listing = FileListing::from_paths(["b.js"]);
        let definition =
            resolve_without_exports(&CdnLayout::default(), &pkg("b", "2.0.0"), &m, &listing);

        assert_eq!(
            definition,
            def(&[
                ("b", format!("{CDN}/b@2.0.0/b.js")),
                ("b/", format!("{CDN}/b@2.0.0/")),
            ])
        );
    }
}
