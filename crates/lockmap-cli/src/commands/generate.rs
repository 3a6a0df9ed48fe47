//! `lockmap generate` command implementation.

use lockmap_core::{
    generate_import_map, CdnClient, CdnLayout, Config, Error, GenerateOptions, Lockfile,
    LOCKFILE_NAME,
};
use lockmap_util::digest::short_digest;
use lockmap_util::fs::atomic_write;
use miette::{IntoDiagnostic, Result};
use std::io::Write;
use std::path::{Path, PathBuf};
use tracing::info;

/// Arguments of `lockmap generate`, as parsed from the command line.
#[derive(Debug, Clone, Default)]
pub struct GenerateArgs {
    pub lockfile: Option<PathBuf>,
    pub output: Option<PathBuf>,
    pub options_file: Option<PathBuf>,
    pub no_deps: bool,
    pub no_dev: bool,
    pub optional: bool,
    pub conditions: Vec<String>,
    pub browser: bool,
    pub concurrency: Option<usize>,
    pub cdn: String,
    pub listing_api: String,
}

impl GenerateArgs {
    /// Options from the config file, if any, with command-line flags applied on top.
    fn options(&self, config: &Config) -> Result<GenerateOptions, Error> {
        let mut options = match &self.options_file {
            Some(path) => GenerateOptions::read_from(&config.resolve_path(path))?,
            None => GenerateOptions::default(),
        };

        if self.no_deps {
            options.include_dependencies = false;
        }
        if self.no_dev {
            options.include_dev_dependencies = false;
        }
        if self.optional {
            options.include_optional_dependencies = true;
        }
        if !self.conditions.is_empty() {
            options.conditions.clone_from(&self.conditions);
        }
        if self.browser {
            options.browser = true;
        }
        if let Some(concurrency) = self.concurrency {
            options.concurrency = concurrency;
        }

        Ok(options)
    }
}

pub fn run(config: &Config, args: GenerateArgs) -> Result<()> {
    let runtime = tokio::runtime::Runtime::new().into_diagnostic()?;
    runtime
        .block_on(generate(config, &args))
        .into_diagnostic()
}

async fn generate(config: &Config, args: &GenerateArgs) -> Result<(), Error> {
    let options = args.options(config)?;

    let lockfile_path = config.resolve_path(
        args.lockfile
            .as_deref()
            .unwrap_or_else(|| Path::new(LOCKFILE_NAME)),
    );
    info!(lockfile = %lockfile_path.display(), "Reading lockfile");
    let lockfile = Lockfile::read_from(&lockfile_path)?;

    let client = CdnClient::new(CdnLayout::new(&args.cdn, &args.listing_api)?)?;
    let report = generate_import_map(&lockfile, &client, &options).await?;

    let mut json = report.import_map.to_json().map_err(Error::Serialize)?;
    json.push('\n');

    match &args.output {
        Some(output) => {
            let path = config.resolve_path(output);
            atomic_write(&path, json.as_bytes()).map_err(|source| Error::Output {
                path: path.clone(),
                source,
            })?;
            info!(
                output = %path.display(),
                imports = report.import_map.imports.len(),
                scopes = report.import_map.scopes.len(),
                digest = %short_digest(json.as_bytes(), 12),
                "Wrote import map"
            );
        }
        None => {
            let mut stdout = std::io::stdout().lock();
            stdout.write_all(json.as_bytes())?;
            stdout.flush()?;
        }
    }

    Ok(())
}
