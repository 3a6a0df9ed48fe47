#![deny(clippy::all)]
#![warn(clippy::pedantic)]
#![allow(clippy::module_name_repetitions)]
#![allow(clippy::missing_errors_doc)]
#![allow(clippy::too_many_lines)]
#![allow(clippy::needless_pass_by_value)]
#![allow(clippy::return_self_not_must_use)]

//! Generate browser import maps from pnpm lockfiles.
//!
//! The pipeline is:
//! 1. [`Lockfile`] seeds a work queue with the root dependencies.
//! 2. [`Generator`] walks the dependency graph, fetching each package-version's
//!    manifest (and, when it has no `exports`, its file listing) exactly once
//!    through a [`MetadataSource`].
//! 3. [`resolve`] turns a manifest into a specifier → URL definition.
//! 4. The resulting [`ImportMap`] is pruned and serialized.

pub mod cdn;
pub mod config;
pub mod error;
pub mod exports;
pub mod generate;
pub mod import_map;
pub mod listing;
pub mod lockfile;
pub mod manifest;
pub mod resolve;
pub mod version;

pub use cdn::{CdnClient, CdnLayout, MetadataSource, PackageRef};
pub use config::{Config, GenerateOptions};
pub use error::{codes as resolve_codes, Error, ResolutionError};
pub use exports::{Conditions, ExportError};
pub use generate::{generate_import_map, GenerateReport, GenerateStats, Generator, Target, WorkItem};
pub use import_map::{ImportMap, SpecifierMap};
pub use listing::FileListing;
pub use lockfile::{actual_version, LockPackage, Lockfile, LockfileError, RootDep, LOCKFILE_NAME};
pub use manifest::{ExportsField, PackageManifest};
pub use resolve::ResolvedDefinition;
pub use version::VERSION;
