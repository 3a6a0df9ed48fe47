//! `lockmap resolve` command implementation.

use lockmap_core::{Config, ImportMap};
use lockmap_util::fs::read_to_string_lossy;
use miette::{miette, IntoDiagnostic, Result};
use serde::Serialize;
use std::path::Path;
use tracing::debug;

#[derive(Debug, Serialize)]
struct ResolveOutput<'a> {
    specifier: &'a str,
    referrer: Option<&'a str>,
    url: Option<&'a str>,
}

pub fn run(config: &Config, specifier: &str, map: &Path, from: Option<&str>) -> Result<()> {
    let path = config.resolve_path(map);
    debug!(map = %path.display(), "Reading import map");

    let source = read_to_string_lossy(&path)
        .map_err(|e| miette!("Failed to read import map {}: {e}", path.display()))?;
    let import_map = ImportMap::from_json(&source)
        .map_err(|e| miette!("Invalid import map {}: {e}", path.display()))?;

    let url = import_map.resolve(specifier, from);

    if config.json_logs {
        let output = ResolveOutput {
            specifier,
            referrer: from,
            url: url.as_deref(),
        };
        println!("{}", serde_json::to_string_pretty(&output).into_diagnostic()?);
    } else if let Some(url) = &url {
        println!("{url}");
    }

    match url {
        Some(_) => Ok(()),
        None => Err(miette!("'{specifier}' is not mapped")),
    }
}
