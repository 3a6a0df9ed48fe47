#![deny(clippy::all)]
#![warn(clippy::pedantic)]
#![allow(clippy::module_name_repetitions)]
#![allow(clippy::struct_excessive_bools)]
#![allow(clippy::needless_pass_by_value)]
#![allow(clippy::missing_errors_doc)]
#![allow(clippy::doc_markdown)]

mod commands;
mod logging;

use clap::Parser;
use lockmap_core::cdn::{CDN_URL_ENV, DEFAULT_CDN_URL, DEFAULT_LISTING_URL, LISTING_URL_ENV};
use lockmap_core::Config;
use miette::Result;
use std::path::PathBuf;

#[derive(Parser, Debug)]
#[command(name = "lockmap")]
#[command(author, version, about = "Generate browser import maps from pnpm lockfiles", long_about = None)]
struct Cli {
    /// Increase logging verbosity (-v for DEBUG, -vv for TRACE)
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    verbose: u8,

    /// Emit JSON formatted logs and output (stable, machine-readable)
    #[arg(long, global = true)]
    json: bool,

    /// Override the working directory
    #[arg(long, global = true, value_name = "PATH")]
    cwd: Option<PathBuf>,

    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(clap::Subcommand, Debug)]
enum Commands {
    /// Print version information
    Version,

    /// Generate an import map from a pnpm lockfile
    Generate {
        /// Path to the lockfile (default: pnpm-lock.yaml)
        lockfile: Option<PathBuf>,

        /// Write the import map to a file instead of stdout
        #[arg(short, long, value_name = "FILE")]
        output: Option<PathBuf>,

        /// JSON file with generation options (flags override it)
        #[arg(long, value_name = "FILE")]
        config: Option<PathBuf>,

        /// Skip root dependencies
        #[arg(long)]
        no_deps: bool,

        /// Skip root devDependencies
        #[arg(long)]
        no_dev: bool,

        /// Include root optionalDependencies
        #[arg(long)]
        optional: bool,

        /// Extra export condition to accept (repeatable, replaces the default "module")
        #[arg(long = "condition", value_name = "NAME")]
        conditions: Vec<String>,

        /// Match the "browser" export condition instead of "node"
        #[arg(long)]
        browser: bool,

        /// Maximum package-versions fetched at once
        #[arg(long, value_name = "N")]
        concurrency: Option<usize>,

        /// CDN base URL serving package files
        #[arg(long, env = CDN_URL_ENV, default_value = DEFAULT_CDN_URL, value_name = "URL")]
        cdn: String,

        /// Base URL of the file listing API
        #[arg(long, env = LISTING_URL_ENV, default_value = DEFAULT_LISTING_URL, value_name = "URL")]
        listing_api: String,
    },

    /// Resolve a specifier against a generated import map
    Resolve {
        /// Bare specifier to resolve (e.g. "lodash/merge")
        specifier: String,

        /// Import map file to read
        #[arg(long, value_name = "FILE", default_value = "importmap.json")]
        map: PathBuf,

        /// URL of the importing module, to apply its scope
        #[arg(long, value_name = "URL")]
        from: Option<String>,
    },
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    // Determine working directory
    let cwd = cli
        .cwd
        .or_else(|| std::env::current_dir().ok())
        .unwrap_or_else(|| PathBuf::from("."));

    let config = Config::new(cwd.clone())
        .with_verbosity(cli.verbose)
        .with_json_logs(cli.json);

    logging::init(config.verbosity, config.json_logs);

    match cli.command {
        Some(Commands::Version) | None => commands::version::run(),
        Some(Commands::Generate {
            lockfile,
            output,
            config: options_file,
            no_deps,
            no_dev,
            optional,
            conditions,
            browser,
            concurrency,
            cdn,
            listing_api,
        }) => {
            let span = tracing::info_span!("generate", cmd = "generate", cwd = %cwd.display());
            let _guard = span.enter();
            commands::generate::run(
                &config,
                commands::generate::GenerateArgs {
                    lockfile,
                    output,
                    options_file,
                    no_deps,
                    no_dev,
                    optional,
                    conditions,
                    browser,
                    concurrency,
                    cdn,
                    listing_api,
                },
            )
        }
        Some(Commands::Resolve {
            specifier,
            map,
            from,
        }) => commands::resolve::run(&config, &specifier, &map, from.as_deref()),
    }
}
