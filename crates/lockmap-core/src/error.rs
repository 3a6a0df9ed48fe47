//! Error types for import map generation.

use crate::lockfile::LockfileError;
use std::fmt;
use std::path::PathBuf;
use thiserror::Error;

/// Top-level error for lockmap operations.
///
/// Every variant is fatal: generation stops and nothing is written.
#[derive(Error, Debug)]
pub enum Error {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Failed to read config at {path}: {source}")]
    ConfigRead {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Failed to parse config at {path}: {source}")]
    ConfigParse {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },

    #[error(transparent)]
    Lockfile(#[from] LockfileError),

    #[error(transparent)]
    Resolution(#[from] ResolutionError),

    #[error("Failed to write import map to {path}: {source}")]
    Output {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Failed to serialize import map: {0}")]
    Serialize(#[source] serde_json::Error),
}

impl Error {
    /// Stable error code, when the underlying error carries one.
    #[must_use]
    pub fn code(&self) -> Option<&'static str> {
        match self {
            Self::Lockfile(e) => Some(e.code()),
            Self::Resolution(e) => Some(e.code()),
            _ => None,
        }
    }
}

/// Resolution error codes.
pub mod codes {
    /// Network failure talking to the CDN or listing API.
    pub const RESOLVE_FETCH_FAILED: &str = "RESOLVE_FETCH_FAILED";
    /// The CDN answered 404 for a manifest or listing.
    pub const RESOLVE_NOT_FOUND: &str = "RESOLVE_NOT_FOUND";
    /// The CDN answered with another non-success status.
    pub const RESOLVE_HTTP_STATUS: &str = "RESOLVE_HTTP_STATUS";
    /// A manifest or listing body was not the expected JSON.
    pub const RESOLVE_INVALID_JSON: &str = "RESOLVE_INVALID_JSON";
    /// An `exports` entry matched none of the allowed conditions.
    pub const RESOLVE_EXPORT_UNRESOLVED: &str = "RESOLVE_EXPORT_UNRESOLVED";
    /// A lockfile version-key does not carry a semver version.
    pub const RESOLVE_VERSION_INVALID: &str = "RESOLVE_VERSION_INVALID";
    /// A configured CDN or listing base URL is not a valid URL.
    pub const RESOLVE_CDN_URL_INVALID: &str = "RESOLVE_CDN_URL_INVALID";
}

/// Fatal failure while resolving one package-version.
#[derive(Debug)]
pub struct ResolutionError {
    code: &'static str,
    package: Option<String>,
    message: String,
}

impl ResolutionError {
    /// Create a new error with the given code and message.
    #[must_use]
    pub fn new(code: &'static str, message: impl Into<String>) -> Self {
        Self {
            code,
            package: None,
            message: message.into(),
        }
    }

    /// Attach the offending `name@version`.
    #[must_use]
    pub fn for_package(mut self, name: &str, version: impl fmt::Display) -> Self {
        self.package = Some(format!("{name}@{version}"));
        self
    }

    /// Get the error code.
    #[must_use]
    pub fn code(&self) -> &'static str {
        self.code
    }

    /// The `name@version` this error is about, if known.
    #[must_use]
    pub fn package(&self) -> Option<&str> {
        self.package.as_deref()
    }

    /// Get the error message.
    #[must_use]
    pub fn message(&self) -> &str {
        &self.message
    }

    pub fn fetch_failed(msg: impl Into<String>) -> Self {
        Self::new(codes::RESOLVE_FETCH_FAILED, msg)
    }

    #[must_use]
    pub fn not_found(url: &str) -> Self {
        Self::new(codes::RESOLVE_NOT_FOUND, format!("Not found: {url}"))
    }

    #[must_use]
    pub fn http_status(url: &str, status: impl fmt::Display) -> Self {
        Self::new(
            codes::RESOLVE_HTTP_STATUS,
            format!("CDN returned status {status} for {url}"),
        )
    }

    pub fn invalid_json(msg: impl Into<String>) -> Self {
        Self::new(codes::RESOLVE_INVALID_JSON, msg)
    }

    pub fn export_unresolved(msg: impl Into<String>) -> Self {
        Self::new(codes::RESOLVE_EXPORT_UNRESOLVED, msg)
    }

    #[must_use]
    pub fn version_invalid(name: &str, version_key: &str) -> Self {
        Self::new(
            codes::RESOLVE_VERSION_INVALID,
            format!("Version '{version_key}' of '{name}' is not a semver version"),
        )
    }

    pub fn cdn_url_invalid(msg: impl Into<String>) -> Self {
        Self::new(codes::RESOLVE_CDN_URL_INVALID, msg)
    }
}

impl fmt::Display for ResolutionError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.package {
            Some(package) => write!(f, "{}: {package}: {}", self.code, self.message),
            None => write!(f, "{}: {}", self.code, self.message),
        }
    }
}

impl std::error::Error for ResolutionError {}

impl From<reqwest::Error> for ResolutionError {
    fn from(e: reqwest::Error) -> Self {
        if e.is_timeout() {
            Self::fetch_failed(format!("Request timed out: {e}"))
        } else if e.is_connect() {
            Self::fetch_failed(format!("Connection failed: {e}"))
        } else {
            Self::fetch_failed(e.to_string())
        }
    }
}

impl From<serde_json::Error> for ResolutionError {
    fn from(e: serde_json::Error) -> Self {
        Self::invalid_json(format!("Invalid JSON: {e}"))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display_with_package() {
        let err = ResolutionError::not_found("https://cdn.example/npm/a@1.0.0/package.json")
            .for_package("a", "1.0.0");
        assert_eq!(err.code(), codes::RESOLVE_NOT_FOUND);
        assert_eq!(err.package(), Some("a@1.0.0"));
        assert!(err.to_string().starts_with("RESOLVE_NOT_FOUND: a@1.0.0: "));
    }

    #[test]
    fn test_error_display_without_package() {
        let err = ResolutionError::cdn_url_invalid("bad url");
        assert_eq!(err.to_string(), "RESOLVE_CDN_URL_INVALID: bad url");
        assert_eq!(err.package(), None);
    }

    #[test]
    fn test_json_error_conversion() {
        let json_err = serde_json::from_str::<serde_json::Value>("<html>").unwrap_err();
        let err: ResolutionError = json_err.into();
        assert_eq!(err.code(), codes::RESOLVE_INVALID_JSON);
    }

    #[test]
    fn test_top_level_error_exposes_code() {
        let err: Error = ResolutionError::version_invalid("a", "link:../a").into();
        assert_eq!(err.code(), Some(codes::RESOLVE_VERSION_INVALID));

        let err: Error = std::io::Error::new(std::io::ErrorKind::Other, "boom").into();
        assert_eq!(err.code(), None);
    }

    #[test]
    fn test_error_codes_uppercase() {
        let all_codes = [
            codes::RESOLVE_FETCH_FAILED,
            codes::RESOLVE_NOT_FOUND,
            codes::RESOLVE_HTTP_STATUS,
            codes::RESOLVE_INVALID_JSON,
            codes::RESOLVE_EXPORT_UNRESOLVED,
            codes::RESOLVE_VERSION_INVALID,
            codes::RESOLVE_CDN_URL_INVALID,
        ];

        for code in all_codes {
            assert!(
                code.chars().all(|c| c.is_uppercase() || c == '_'),
                "Error code '{code}' should be SCREAMING_SNAKE_CASE"
            );
        }
    }
}
