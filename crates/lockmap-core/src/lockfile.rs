//! Typed view over a pnpm lockfile.
//!
//! Only the parts the import map needs are modelled: root dependency sets and,
//! per package, its runtime dependency edges. Two layouts are understood:
//!
//! ```yaml
//! # pnpm v5
//! lockfileVersion: 5.4
//! dependencies:
//!   a: 1.0.0
//! packages:
//!   /a/1.0.0:
//!     dependencies:
//!       b: 2.0.0_react@18.2.0
//! ```
//!
//! ```yaml
//! # pnpm v6
//! lockfileVersion: '6.0'
//! dependencies:
//!   a:
//!     specifier: ^1.0.0
//!     version: 1.0.0
//! packages:
//!   /a@1.0.0:
//!     dependencies:
//!       b: 2.0.0(react@18.2.0)
//! ```

use crate::config::GenerateOptions;
use serde::Deserialize;
use std::collections::BTreeMap;
use std::fmt;
use std::io;
use std::path::Path;

/// Default lockfile filename.
pub const LOCKFILE_NAME: &str = "pnpm-lock.yaml";

/// Lockfile error codes.
pub mod codes {
    /// Lockfile not found at the expected path.
    pub const LOCK_NOT_FOUND: &str = "LOCK_NOT_FOUND";
    /// Lockfile could not be read.
    pub const LOCK_READ_FAILED: &str = "LOCK_READ_FAILED";
    /// Lockfile is not valid YAML or does not have the expected shape.
    pub const LOCK_INVALID_YAML: &str = "LOCK_INVALID_YAML";
    /// A dependency edge points at a package with no `packages` entry.
    pub const LOCK_PACKAGE_MISSING: &str = "LOCK_PACKAGE_MISSING";
}

/// Strip the disambiguating suffix pnpm appends to a version-key.
///
/// `1.2.3_abcd1234` (v5 peer hash) and `1.2.3(react@18.2.0)` (v6 peer list)
/// both yield `1.2.3`.
#[must_use]
pub fn actual_version(version_key: &str) -> &str {
    match version_key.find(['_', '(']) {
        Some(idx) => &version_key[..idx],
        None => version_key,
    }
}

/// `lockfileVersion` is a bare number up to v5 and a quoted string from v6.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(untagged)]
pub enum LockfileVersion {
    Number(f64),
    Text(String),
}

impl fmt::Display for LockfileVersion {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Number(n) => write!(f, "{n}"),
            Self::Text(s) => f.write_str(s),
        }
    }
}

/// A root-level dependency declaration.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(untagged)]
pub enum RootDep {
    /// v5: `name: version-key`
    Version(String),
    /// v6: `name: { specifier, version }`
    Specified { specifier: String, version: String },
}

impl RootDep {
    /// The locked version-key.
    #[must_use]
    pub fn version(&self) -> &str {
        match self {
            Self::Version(v) | Self::Specified { version: v, .. } => v,
        }
    }
}

/// A locked package entry.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LockPackage {
    /// Runtime dependencies (name -> version-key).
    #[serde(default)]
    pub dependencies: BTreeMap<String, String>,
    /// Optional dependencies (name -> version-key).
    #[serde(default)]
    pub optional_dependencies: BTreeMap<String, String>,
}

impl LockPackage {
    /// All runtime edges. A name listed in both maps takes its
    /// `dependencies` version-key.
    #[must_use]
    pub fn edges(&self) -> BTreeMap<&str, &str> {
        let mut edges: BTreeMap<&str, &str> = self
            .optional_dependencies
            .iter()
            .map(|(name, version)| (name.as_str(), version.as_str()))
            .collect();
        for (name, version) in &self.dependencies {
            edges.insert(name.as_str(), version.as_str());
        }
        edges
    }
}

/// A parsed pnpm lockfile.
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Lockfile {
    #[serde(default)]
    pub lockfile_version: Option<LockfileVersion>,
    #[serde(default)]
    pub dependencies: BTreeMap<String, RootDep>,
    #[serde(default)]
    pub dev_dependencies: BTreeMap<String, RootDep>,
    #[serde(default)]
    pub optional_dependencies: BTreeMap<String, RootDep>,
    /// Keyed `/<name>/<version-key>` (v5) or `/<name>@<version-key>` (v6).
    #[serde(default)]
    pub packages: BTreeMap<String, LockPackage>,
}

impl Lockfile {
    /// Parse lockfile YAML text.
    pub fn from_yaml(source: &str) -> Result<Self, LockfileError> {
        serde_yaml::from_str(source).map_err(|e| {
            LockfileError::new(codes::LOCK_INVALID_YAML, format!("Invalid lockfile: {e}"))
        })
    }

    /// Read and parse a lockfile from disk.
    pub fn read_from(path: &Path) -> Result<Self, LockfileError> {
        let content = lockmap_util::fs::read_to_string_lossy(path).map_err(|e| {
            if e.kind() == io::ErrorKind::NotFound {
                LockfileError::new(
                    codes::LOCK_NOT_FOUND,
                    format!("Lockfile not found: {}", path.display()),
                )
            } else {
                LockfileError::new(
                    codes::LOCK_READ_FAILED,
                    format!("Failed to read lockfile {}: {e}", path.display()),
                )
            }
        })?;

        Self::from_yaml(&content)
    }

    /// Look up a package entry by name and version-key.
    #[must_use]
    pub fn get_package(&self, name: &str, version_key: &str) -> Option<&LockPackage> {
        self.packages
            .get(&format!("/{name}/{version_key}"))
            .or_else(|| self.packages.get(&format!("/{name}@{version_key}")))
    }

    /// Like [`Lockfile::get_package`], but a missing entry is an error.
    pub fn package(&self, name: &str, version_key: &str) -> Result<&LockPackage, LockfileError> {
        self.get_package(name, version_key).ok_or_else(|| {
            LockfileError::new(
                codes::LOCK_PACKAGE_MISSING,
                format!("No packages entry for {name}@{version_key}"),
            )
        })
    }

    /// Root dependencies that seed the walk, name -> version-key.
    ///
    /// Sets are layered dev, then optional, then regular, so a name declared
    /// in several enabled sets keeps its regular-dependency version-key.
    #[must_use]
    pub fn root_dependencies(&self, options: &GenerateOptions) -> BTreeMap<String, String> {
        let mut roots = BTreeMap::new();
        let layers = [
            (options.include_dev_dependencies, &self.dev_dependencies),
            (
                options.include_optional_dependencies,
                &self.optional_dependencies,
            ),
            (options.include_dependencies, &self.dependencies),
        ];

        for (enabled, deps) in layers {
            if !enabled {
                continue;
            }
            for (name, dep) in deps {
                roots.insert(name.clone(), dep.version().to_string());
            }
        }

        roots
    }
}

/// Lockfile error.
#[derive(Debug)]
pub struct LockfileError {
    code: &'static str,
    message: String,
}

impl LockfileError {
    /// Create a new error.
    #[must_use]
    pub fn new(code: &'static str, message: impl Into<String>) -> Self {
        Self {
            code,
            message: message.into(),
        }
    }

    /// Get the error code.
    #[must_use]
    pub fn code(&self) -> &'static str {
        self.code
    }

    /// Get the error message.
    #[must_use]
    pub fn message(&self) -> &str {
        &self.message
    }
}

impl fmt::Display for LockfileError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {}", self.code, self.message)
    }
}

impl std::error::Error for LockfileError {}
