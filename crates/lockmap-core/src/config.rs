use crate::error::Error;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// Runtime configuration for the lockmap CLI.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    /// Current working directory.
    pub cwd: PathBuf,

    /// Whether to emit JSON logs.
    pub json_logs: bool,

    /// Verbosity level (0 = INFO, 1 = DEBUG, 2+ = TRACE).
    pub verbosity: u8,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            cwd: std::env::current_dir().unwrap_or_else(|_| PathBuf::from(".")),
            json_logs: false,
            verbosity: 0,
        }
    }
}

impl Config {
    /// Create a new config with the given working directory.
    #[must_use]
    pub fn new(cwd: PathBuf) -> Self {
        Self {
            cwd,
            ..Default::default()
        }
    }

    /// Set verbosity level.
    #[must_use]
    pub fn with_verbosity(mut self, verbosity: u8) -> Self {
        self.verbosity = verbosity;
        self
    }

    /// Set JSON log output.
    #[must_use]
    pub fn with_json_logs(mut self, json: bool) -> Self {
        self.json_logs = json;
        self
    }

    /// Resolve `path` against the working directory.
    #[must_use]
    pub fn resolve_path(&self, path: &Path) -> PathBuf {
        if path.is_absolute() {
            path.to_path_buf()
        } else {
            self.cwd.join(path)
        }
    }
}

/// Default number of package-versions fetched concurrently.
pub const DEFAULT_CONCURRENCY: usize = 16;

/// Options controlling one import map generation run.
///
/// Field names follow the camelCase JSON config file:
///
/// ```json
/// {
///   "includeDependencies": true,
///   "includeDevDependencies": false,
///   "includeOptionalDependencies": false,
///   "conditions": ["module"],
///   "browser": true,
///   "concurrency": 8
/// }
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default, deny_unknown_fields)]
pub struct GenerateOptions {
    /// Seed the walk with root `dependencies`.
    pub include_dependencies: bool,
    /// Seed the walk with root `devDependencies`.
    pub include_dev_dependencies: bool,
    /// Seed the walk with root `optionalDependencies`.
    pub include_optional_dependencies: bool,
    /// Export conditions requested in addition to `default` and `import`.
    pub conditions: Vec<String>,
    /// Match the `browser` condition instead of `node`.
    pub browser: bool,
    /// Maximum package-versions fetched at once. `1` fetches strictly one at a time.
    pub concurrency: usize,
}

impl Default for GenerateOptions {
    fn default() -> Self {
        Self {
            include_dependencies: true,
            include_dev_dependencies: true,
            include_optional_dependencies: false,
            conditions: vec!["module".to_string()],
            browser: false,
            concurrency: DEFAULT_CONCURRENCY,
        }
    }
}

impl GenerateOptions {
    /// Read options from a JSON config file. Missing fields keep their defaults.
    pub fn read_from(path: &Path) -> Result<Self, Error> {
        let content = std::fs::read_to_string(path).map_err(|source| Error::ConfigRead {
            path: path.to_path_buf(),
            source,
        })?;

        serde_json::from_str(&content).map_err(|source| Error::ConfigParse {
            path: path.to_path_buf(),
            source,
        })
    }

    /// Concurrency clamped to at least one in-flight fetch.
    #[must_use]
    pub fn effective_concurrency(&self) -> usize {
        self.concurrency.max(1)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_generate_options_defaults() {
        let options = GenerateOptions::default();
        assert!(options.include_dependencies);
        assert!(options.include_dev_dependencies);
        assert!(!options.include_optional_dependencies);
        assert_eq!(options.conditions, vec!["module".to_string()]);
        assert!(!options.browser);
        assert_eq!(options.concurrency, DEFAULT_CONCURRENCY);
    }

    #[test]
    fn test_generate_options_partial_json() {
        let options: GenerateOptions =
            serde_json::from_str(r#"{"includeDevDependencies": false, "browser": true}"#).unwrap();
        assert!(options.include_dependencies);
        assert!(!options.include_dev_dependencies);
        assert!(options.browser);
        assert_eq!(options.conditions, vec!["module".to_string()]);
    }

    #[test]
    fn test_generate_options_rejects_unknown_fields() {
        let result = serde_json::from_str::<GenerateOptions>(r#"{"includeDeps": true}"#);
        assert!(result.is_err());
    }

    #[test]
    fn test_effective_concurrency_never_zero() {
        let options = GenerateOptions {
            concurrency: 0,
            ..Default::default()
        };
        assert_eq!(options.effective_concurrency(), 1);
    }

    #[test]
    fn test_read_from_missing_file() {
        let err = GenerateOptions::read_from(Path::new("/nonexistent/lockmap.json")).unwrap_err();
        assert!(matches!(err, Error::ConfigRead { .. }));
    }

    #[test]
    fn test_read_from_invalid_json() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("lockmap.json");
        std::fs::write(&path, "{ not json").unwrap();

        let err = GenerateOptions::read_from(&path).unwrap_err();
        assert!(matches!(err, Error::ConfigParse { .. }));
    }

    #[test]
    fn test_read_from_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("lockmap.json");
        std::fs::write(&path, r#"{"includeOptionalDependencies": true, "concurrency": 2}"#)
            .unwrap();

        let options = GenerateOptions::read_from(&path).unwrap();
        assert!(options.include_optional_dependencies);
        assert_eq!(options.concurrency, 2);
    }

    #[test]
    fn test_config_resolve_path() {
        let config = Config::new(PathBuf::from("/project"));
        assert_eq!(
            config.resolve_path(Path::new("pnpm-lock.yaml")),
            PathBuf::from("/project/pnpm-lock.yaml")
        );
        assert_eq!(
            config.resolve_path(Path::new("/elsewhere/pnpm-lock.yaml")),
            PathBuf::from("/elsewhere/pnpm-lock.yaml")
        );
    }
}
