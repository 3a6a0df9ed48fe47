//! Import map generation: the dependency-graph walk and per-version cache.
//!
//! Walks the lockfile's dependency graph breadth-first. Every distinct
//! package-version (keyed by its CDN base URL) is resolved once; each edge
//! that reaches it afterwards copies the cached definition into the map
//! that declared the edge, either the top-level `imports` or the dependent's
//! scope.
//!
//! Each pass drains the whole queue as a batch, fetches metadata for the
//! uncached package-versions concurrently, then applies the batch strictly
//! in discovery order, so output never depends on network timing.

use crate::cdn::{MetadataSource, PackageRef};
use crate::config::GenerateOptions;
use crate::error::Error;
use crate::exports::Conditions;
use crate::import_map::ImportMap;
use crate::lockfile::{actual_version, Lockfile};
use crate::resolve::{fetch_definition, Resolved, ResolvedDefinition};
use futures::stream::{self, StreamExt, TryStreamExt};
use std::collections::{HashMap, HashSet, VecDeque};
use tracing::{debug, info};

/// Where an edge's resolved specifiers are copied.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum Target {
    /// Top-level `imports`.
    Imports,
    /// The scope of the dependent, keyed by its CDN base URL.
    Scope(String),
}

/// One dependency edge waiting to be processed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WorkItem {
    pub name: String,
    /// Version-key as written in the lockfile, suffix included.
    pub version_key: String,
    pub target: Target,
}

/// Counters collected during one run.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct GenerateStats {
    /// Distinct package-versions resolved.
    pub packages_resolved: usize,
    pub manifests_fetched: usize,
    pub listings_fetched: usize,
    /// Edges served from the cache.
    pub cache_hits: usize,
    /// Empty scopes removed before emission.
    pub scopes_pruned: usize,
}

/// Result of a generation run.
#[derive(Debug, Clone)]
pub struct GenerateReport {
    pub import_map: ImportMap,
    pub stats: GenerateStats,
}

/// Import map generator for one lockfile and one metadata source.
///
/// Owns all mutable state of a run: the work queue, the per-version cache
/// and the map under construction.
pub struct Generator<'a, S> {
    lockfile: &'a Lockfile,
    source: &'a S,
    conditions: Conditions,
    concurrency: usize,
    /// Enabled root dependencies, name -> actual version.
    root_versions: HashMap<String, String>,
    queue: VecDeque<WorkItem>,
    /// CDN base URL -> definition, for every package-version already expanded.
    cache: HashMap<String, ResolvedDefinition>,
    import_map: ImportMap,
    stats: GenerateStats,
}

impl<'a, S: MetadataSource> Generator<'a, S> {
    /// Create a generator with the queue seeded from the enabled root
    /// dependency sets.
    pub fn new(lockfile: &'a Lockfile, source: &'a S, options: &GenerateOptions) -> Self {
        let roots = lockfile.root_dependencies(options);

        let root_versions = roots
            .iter()
            .map(|(name, key)| (name.clone(), actual_version(key).to_string()))
            .collect();

        let queue = roots
            .into_iter()
            .map(|(name, version_key)| WorkItem {
                name,
                version_key,
                target: Target::Imports,
            })
            .collect();

        Self {
            lockfile,
            source,
            conditions: Conditions::new(&options.conditions, options.browser),
            concurrency: options.effective_concurrency(),
            root_versions,
            queue,
            cache: HashMap::new(),
            import_map: ImportMap::new(),
            stats: GenerateStats::default(),
        }
    }

    /// Items still waiting in the queue.
    #[must_use]
    pub fn pending(&self) -> &VecDeque<WorkItem> {
        &self.queue
    }

    /// Walk the graph to completion and return the pruned import map.
    pub async fn run(mut self) -> Result<GenerateReport, Error> {
        info!(
            roots = self.queue.len(),
            conditions = %self.conditions,
            concurrency = self.concurrency,
            "Generating import map"
        );

        while !self.queue.is_empty() {
            let batch: Vec<WorkItem> = self.queue.drain(..).collect();
            let mut prefetched = self.prefetch(&batch).await?;

            for item in batch {
                self.apply(item, &mut prefetched).await?;
            }
        }

        self.stats.scopes_pruned = self.import_map.prune_empty_scopes();

        info!(
            packages = self.stats.packages_resolved,
            manifests = self.stats.manifests_fetched,
            listings = self.stats.listings_fetched,
            cache_hits = self.stats.cache_hits,
            scopes = self.import_map.scopes.len(),
            "Import map generated"
        );

        Ok(GenerateReport {
            import_map: self.import_map,
            stats: self.stats,
        })
    }

    /// Fetch definitions for the batch's uncached package-versions.
    ///
    /// Lockfile and version-key problems surface here, before any request.
    async fn prefetch(
        &mut self,
        batch: &[WorkItem],
    ) -> Result<HashMap<String, Resolved>, Error> {
        let layout = self.source.layout();
        let mut seen = HashSet::new();
        let mut pending = Vec::new();

        for item in batch {
            let pkg = PackageRef::from_version_key(&item.name, &item.version_key)?;
            let base = layout.base_url(&pkg);
            if self.cache.contains_key(&base) || !seen.insert(base.clone()) {
                continue;
            }
            self.lockfile.package(&item.name, &item.version_key)?;
            pending.push((base, pkg));
        }

        if pending.is_empty() {
            return Ok(HashMap::new());
        }

        debug!(count = pending.len(), "Prefetching package metadata");

        let source = self.source;
        let conditions = &self.conditions;
        let fetched: Vec<(String, Resolved)> = stream::iter(pending)
            .map(|(base, pkg)| async move {
                let resolved = fetch_definition(source, &pkg, conditions).await?;
                Ok::<_, Error>((base, resolved))
            })
            .buffered(self.concurrency)
            .try_collect()
            .await?;

        for (_, resolved) in &fetched {
            self.record_fetch(resolved);
        }

        Ok(fetched.into_iter().collect())
    }

    /// Process one edge: expand its package-version on first reach, then
    /// copy the definition into the edge's target.
    async fn apply(
        &mut self,
        item: WorkItem,
        prefetched: &mut HashMap<String, Resolved>,
    ) -> Result<(), Error> {
        let pkg = PackageRef::from_version_key(&item.name, &item.version_key)?;
        let base = self.source.layout().base_url(&pkg);

        if self.cache.contains_key(&base) {
            debug!(package = %pkg, "Cached");
            self.stats.cache_hits += 1;
        } else {
            let definition = self.expand(&item, &pkg, &base, prefetched).await?;
            self.cache.insert(base.clone(), definition);
        }

        if let Some(definition) = self.cache.get(&base) {
            copy_definition(
                &mut self.import_map,
                &self.root_versions,
                &item.target,
                &pkg,
                definition,
            );
        }

        Ok(())
    }

    /// First reach of a package-version: resolve it, open its scope and
    /// enqueue its own dependencies into that scope.
    async fn expand(
        &mut self,
        item: &WorkItem,
        pkg: &PackageRef,
        base: &str,
        prefetched: &mut HashMap<String, Resolved>,
    ) -> Result<ResolvedDefinition, Error> {
        info!(package = %pkg, "Resolving");

        let lockfile = self.lockfile;
        let entry = lockfile.package(&item.name, &item.version_key)?;

        let resolved = match prefetched.remove(base) {
            Some(resolved) => resolved,
            None => {
                let resolved = fetch_definition(self.source, pkg, &self.conditions).await?;
                self.record_fetch(&resolved);
                resolved
            }
        };

        self.import_map.scopes.entry(base.to_string()).or_default();
        self.queue
            .extend(entry.edges().into_iter().map(|(name, version_key)| WorkItem {
                name: name.to_string(),
                version_key: version_key.to_string(),
                target: Target::Scope(base.to_string()),
            }));
        self.stats.packages_resolved += 1;

        Ok(resolved.definition)
    }

    fn record_fetch(&mut self, resolved: &Resolved) {
        self.stats.manifests_fetched += 1;
        if resolved.fetched_listing {
            self.stats.listings_fetched += 1;
        }
    }
}

/// Copy a cached definition into an edge's target.
///
/// `imports` always receives the copy. A scope is skipped when the root set
/// already maps the same name at the same version, since lookups from the
/// scope fall back to `imports`.
fn copy_definition(
    import_map: &mut ImportMap,
    root_versions: &HashMap<String, String>,
    target: &Target,
    pkg: &PackageRef,
    definition: &ResolvedDefinition,
) {
    let specifiers = match target {
        Target::Imports => &mut import_map.imports,
        Target::Scope(scope) => {
            let inherited = root_versions
                .get(&pkg.name)
                .is_some_and(|root| *root == pkg.version.to_string());
            if inherited {
                debug!(package = %pkg, scope = %scope, "Inherited from imports");
                return;
            }
            import_map.scopes.entry(scope.clone()).or_default()
        }
    };

    specifiers.extend(
        definition
            .iter()
            .map(|(specifier, url)| (specifier.clone(), url.clone())),
    );
}

/// Generate an import map for `lockfile` with metadata from `source`.
pub async fn generate_import_map<S: MetadataSource>(
    lockfile: &Lockfile,
    source: &S,
    options: &GenerateOptions,
) -> Result<GenerateReport, Error> {
    Generator::new(lockfile, source, options).run().await
}

#[cfg(test)]
mod tests {
    use super::*;

    const LOCK: &str = r"
lockfileVersion: 5.4
dependencies:
  a: 1.0.0
devDependencies:
  d: 3.0.0
optionalDependencies:
  o: 4.0.0
packages:
  /a/1.0.0:
    dependencies:
      b: 2.0.0
  /b/2.0.0: {}
  /d/3.0.0: {}
  /o/4.0.0: {}
";

    struct NoSource(crate::cdn::CdnLayout);

    impl MetadataSource for NoSource {
        fn layout(&self) -> &crate::cdn::CdnLayout {
            &self.0
        }

        async fn fetch_manifest(
            &self,
            pkg: &PackageRef,
        ) -> Result<crate::manifest::PackageManifest, crate::error::ResolutionError> {
            Err(crate::error::ResolutionError::not_found(&pkg.to_string()))
        }

        async fn fetch_listing(
            &self,
            pkg: &PackageRef,
        ) -> Result<crate::listing::FileListing, crate::error::ResolutionError> {
            Err(crate::error::ResolutionError::not_found(&pkg.to_string()))
        }
    }

    fn seeds(options: &GenerateOptions) -> Vec<(String, Target)> {
        let lockfile = Lockfile::from_yaml(LOCK).unwrap();
        let source = NoSource(crate::cdn::CdnLayout::default());
        Generator::new(&lockfile, &source, options)
            .pending()
            .iter()
            .map(|item| (item.name.clone(), item.target.clone()))
            .collect()
    }

    #[test]
    fn test_seeds_default_sets() {
        assert_eq!(
            seeds(&GenerateOptions::default()),
            vec![
                ("a".to_string(), Target::Imports),
                ("d".to_string(), Target::Imports)
            ]
        );
    }

    #[test]
    fn test_seeds_filtered() {
        let options = GenerateOptions {
            include_dev_dependencies: false,
            include_optional_dependencies: true,
            ..GenerateOptions::default()
        };
        let names: Vec<String> = seeds(&options).into_iter().map(|(n, _)| n).collect();
        assert_eq!(names, vec!["a", "o"]);
    }

    #[test]
    fn test_copy_policy() {
        let pkg = PackageRef::from_version_key("b", "2.0.0_peer").unwrap();
        let definition = ResolvedDefinition::from([("b".to_string(), "u".to_string())]);
        let scope = Target::Scope("s/".to_string());

        let mut map = ImportMap::new();
        let roots = HashMap::from([("b".to_string(), "2.0.0".to_string())]);
        copy_definition(&mut map, &roots, &Target::Imports, &pkg, &definition);
        copy_definition(&mut map, &roots, &scope, &pkg, &definition);
        assert_eq!(map.imports.len(), 1);
        assert!(map.scopes.is_empty());

        let roots = HashMap::from([("b".to_string(), "1.0.0".to_string())]);
        copy_definition(&mut map, &roots, &scope, &pkg, &definition);
        assert_eq!(map.scopes["s/"]["b"], "u");
    }
}
