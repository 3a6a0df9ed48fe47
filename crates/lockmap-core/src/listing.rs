//! Published file listings from the jsDelivr data API.
//!
//! The API returns a tree:
//!
//! ```json
//! { "files": [
//!     { "type": "file", "name": "package.json" },
//!     { "type": "directory", "name": "dist", "files": [
//!         { "type": "file", "name": "index.mjs" }
//!     ] }
//! ] }
//! ```

use serde::Deserialize;
use std::collections::HashSet;

/// Node kind in a listing tree.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum NodeKind {
    File,
    Directory,
}

/// One node of a listing tree.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct ListingNode {
    #[serde(rename = "type")]
    pub kind: NodeKind,
    pub name: String,
    #[serde(default)]
    pub files: Vec<ListingNode>,
}

/// Listing API response body.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
pub struct ListingResponse {
    #[serde(default)]
    pub files: Vec<ListingNode>,
}

/// Every file path published for one package-version, relative to the
/// package root and `/`-separated.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FileListing {
    files: HashSet<String>,
}

impl FileListing {
    /// Build a listing from already-flat paths.
    pub fn from_paths<I, S>(paths: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            files: paths.into_iter().map(Into::into).collect(),
        }
    }

    /// Flatten a listing tree.
    ///
    /// Uses an explicit stack of `(node, prefix)` pairs, so arbitrarily deep
    /// trees cannot exhaust the call stack.
    #[must_use]
    pub fn flatten(response: ListingResponse) -> Self {
        let mut files = HashSet::new();
        let mut stack: Vec<(ListingNode, String)> = response
            .files
            .into_iter()
            .map(|node| (node, String::new()))
            .collect();

        while let Some((node, prefix)) = stack.pop() {
            match node.kind {
                NodeKind::Directory => {
                    let dir = format!("{prefix}{}/", node.name);
                    stack.extend(node.files.into_iter().map(|child| (child, dir.clone())));
                }
                NodeKind::File => {
                    files.insert(format!("{prefix}{}", node.name));
                }
            }
        }

        Self { files }
    }

    /// Whether `path` is published.
    #[must_use]
    pub fn contains(&self, path: &str) -> bool {
        self.files.contains(path)
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.files.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.files.is_empty()
    }
}
