//! CDN endpoints and the package metadata fetcher.

use crate::error::ResolutionError;
use crate::listing::{FileListing, ListingResponse};
use crate::lockfile::actual_version;
use crate::manifest::PackageManifest;
use crate::version::USER_AGENT;
use reqwest::Client;
use semver::Version;
use serde::de::DeserializeOwned;
use std::fmt;
use std::future::Future;
use std::time::Duration;
use tracing::debug;
use url::Url;

/// Default CDN base serving package files.
pub const DEFAULT_CDN_URL: &str = "https://cdn.jsdelivr.net/npm/";

/// Default base of the file listing API.
pub const DEFAULT_LISTING_URL: &str = "https://data.jsdelivr.com/v1/package/npm/";

/// Environment variable to override the CDN base.
pub const CDN_URL_ENV: &str = "LOCKMAP_CDN_URL";

/// Environment variable to override the listing API base.
pub const LISTING_URL_ENV: &str = "LOCKMAP_LISTING_URL";

/// A package at an exact version, as the CDN addresses it.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct PackageRef {
    pub name: String,
    pub version: Version,
}

impl PackageRef {
    /// Build from a lockfile version-key, dropping any peer suffix.
    pub fn from_version_key(name: &str, version_key: &str) -> Result<Self, ResolutionError> {
        let version = Version::parse(actual_version(version_key))
            .map_err(|_| ResolutionError::version_invalid(name, version_key))?;

        Ok(Self {
            name: name.to_string(),
            version,
        })
    }
}

impl fmt::Display for PackageRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}@{}", self.name, self.version)
    }
}

/// URL layout of the CDN and its listing API.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CdnLayout {
    cdn: String,
    listing: String,
}

impl CdnLayout {
    /// Create a layout from two base URLs. A missing trailing `/` is added.
    pub fn new(cdn: &str, listing: &str) -> Result<Self, ResolutionError> {
        Ok(Self {
            cdn: parse_base(cdn)?,
            listing: parse_base(listing)?,
        })
    }

    /// Bases from [`CDN_URL_ENV`] / [`LISTING_URL_ENV`], falling back to jsDelivr.
    pub fn from_env() -> Result<Self, ResolutionError> {
        let cdn = std::env::var(CDN_URL_ENV).unwrap_or_else(|_| DEFAULT_CDN_URL.to_string());
        let listing =
            std::env::var(LISTING_URL_ENV).unwrap_or_else(|_| DEFAULT_LISTING_URL.to_string());
        Self::new(&cdn, &listing)
    }

    #[must_use]
    pub fn cdn_base(&self) -> &str {
        &self.cdn
    }

    #[must_use]
    pub fn listing_base(&self) -> &str {
        &self.listing
    }

    /// URL of `path` inside a package-version, e.g.
    /// `https://cdn.jsdelivr.net/npm/a@1.0.0/index.js`.
    #[must_use]
    pub fn file_url(&self, pkg: &PackageRef, path: &str) -> String {
        format!("{}{}@{}/{path}", self.cdn, pkg.name, pkg.version)
    }

    /// Directory URL of a package-version. Doubles as its scope key.
    #[must_use]
    pub fn base_url(&self, pkg: &PackageRef) -> String {
        self.file_url(pkg, "")
    }

    #[must_use]
    pub fn manifest_url(&self, pkg: &PackageRef) -> String {
        self.file_url(pkg, "package.json")
    }

    #[must_use]
    pub fn listing_url(&self, pkg: &PackageRef) -> String {
        format!("{}{}@{}", self.listing, pkg.name, pkg.version)
    }
}

impl Default for CdnLayout {
    fn default() -> Self {
        Self {
            cdn: DEFAULT_CDN_URL.to_string(),
            listing: DEFAULT_LISTING_URL.to_string(),
        }
    }
}

fn parse_base(raw: &str) -> Result<String, ResolutionError> {
    let mut url = Url::parse(raw)
        .map_err(|e| ResolutionError::cdn_url_invalid(format!("Invalid base URL '{raw}': {e}")))?;

    if url.cannot_be_a_base() {
        return Err(ResolutionError::cdn_url_invalid(format!(
            "Invalid base URL '{raw}': cannot be a base"
        )));
    }

    if !url.path().ends_with('/') {
        let path = format!("{}/", url.path());
        url.set_path(&path);
    }

    Ok(url.into())
}

/// Where package manifests and file listings come from.
///
/// Implementations must not cache: the generator already guarantees at most
/// one call of each method per package-version.
pub trait MetadataSource {
    /// URL layout used to build the import map's URLs.
    fn layout(&self) -> &CdnLayout;

    /// Fetch `package.json` for a package-version.
    fn fetch_manifest(
        &self,
        pkg: &PackageRef,
    ) -> impl Future<Output = Result<PackageManifest, ResolutionError>> + Send;

    /// Fetch every published file path for a package-version.
    fn fetch_listing(
        &self,
        pkg: &PackageRef,
    ) -> impl Future<Output = Result<FileListing, ResolutionError>> + Send;
}

/// HTTP client for the CDN and listing API.
#[derive(Debug, Clone)]
pub struct CdnClient {
    layout: CdnLayout,
    http: Client,
}

impl CdnClient {
    /// Create a client for the given layout.
    pub fn new(layout: CdnLayout) -> Result<Self, ResolutionError> {
        let http = Client::builder()
            .connect_timeout(Duration::from_secs(5))
            .timeout(Duration::from_secs(15))
            .user_agent(USER_AGENT)
            .build()
            .map_err(|e| {
                ResolutionError::fetch_failed(format!("Failed to create HTTP client: {e}"))
            })?;

        Ok(Self { layout, http })
    }

    /// Create a client using endpoints from the environment or the defaults.
    pub fn from_env() -> Result<Self, ResolutionError> {
        Self::new(CdnLayout::from_env()?)
    }

    async fn get_json<T: DeserializeOwned>(&self, url: &str) -> Result<T, ResolutionError> {
        debug!(url = %url, "Fetching");

        let response = self.http.get(url).send().await?;

        if response.status() == reqwest::StatusCode::NOT_FOUND {
            return Err(ResolutionError::not_found(url));
        }

        if !response.status().is_success() {
            return Err(ResolutionError::http_status(url, response.status()));
        }

        let body = response.text().await?;
        serde_json::from_str(&body)
            .map_err(|e| ResolutionError::invalid_json(format!("Invalid JSON from {url}: {e}")))
    }
}

impl MetadataSource for CdnClient {
    fn layout(&self) -> &CdnLayout {
        &self.layout
    }

    async fn fetch_manifest(&self, pkg: &PackageRef) -> Result<PackageManifest, ResolutionError> {
        let url = self.layout.manifest_url(pkg);
        self.get_json(&url)
            .await
            .map_err(|e| e.for_package(&pkg.name, &pkg.version))
    }

    async fn fetch_listing(&self, pkg: &PackageRef) -> Result<FileListing, ResolutionError> {
        let url = self.layout.listing_url(pkg);
        let response: ListingResponse = self
            .get_json(&url)
            .await
            .map_err(|e| e.for_package(&pkg.name, &pkg.version))?;
        Ok(FileListing::flatten(response))
    }
}
