//! Dependency resolution: one concrete version per declared dependency.

use std::fmt;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use anyhow::anyhow;
use repo_index::{parse_version, select_highest, CatalogCache, Constraint, FileCatalogCache};
use tracing::{debug, trace};

use crate::dependency::{Dependency, DependencyKey, Lock, ResolvedDependency, SourceAliases};
use crate::digest::lock_digest;
use crate::error::ResolveError;
use crate::local::{clean_path, ensure_exists, resolve_local_path};
use crate::metadata::ChartMetadata;
use crate::registry::RegistryClient;
use crate::source::{oci_reference, Source};

/// Directory of vendored subcharts inside a chart.
pub const CHARTS_DIR: &str = "charts";

/// File extension of a packaged chart.
pub const ARCHIVE_EXTENSION: &str = ".tgz";

/// Resolves the dependencies declared by one chart.
///
/// The resolver only reads: the chart directory, the catalog cache and the
/// registry. It holds no state between calls, so resolving the same input
/// against unchanged collaborators gives the same lock.
#[derive(Clone)]
pub struct Resolver {
    chart_path: PathBuf,
    catalogs: Arc<dyn CatalogCache>,
    registry: Arc<dyn RegistryClient>,
}

impl fmt::Debug for Resolver {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Resolver")
            .field("chart_path", &self.chart_path)
            .finish_non_exhaustive()
    }
}

impl Resolver {
    pub fn new(
        chart_path: impl Into<PathBuf>,
        catalogs: Arc<dyn CatalogCache>,
        registry: Arc<dyn RegistryClient>,
    ) -> Self {
        Self {
            chart_path: chart_path.into(),
            catalogs,
            registry,
        }
    }

    /// Resolver reading indexes from a repository cache directory.
    pub fn with_repository_cache(
        chart_path: impl Into<PathBuf>,
        repository_cache: impl Into<PathBuf>,
        registry: Arc<dyn RegistryClient>,
    ) -> Self {
        Self::new(
            chart_path,
            Arc::new(FileCatalogCache::new(repository_cache)),
            registry,
        )
    }

    /// Base directory local dependencies are resolved against.
    pub fn chart_path(&self) -> &Path {
        &self.chart_path
    }

    /// Resolve every requirement and bind the result with a digest.
    ///
    /// `aliases` maps each remote dependency's `name-position` key to the
    /// repository alias its cached index is stored under. The first failure
    /// aborts the call.
    #[tracing::instrument(
        name = "chart_resolve",
        level = "trace",
        skip_all,
        fields(chart = %self.chart_path.display(), dependencies = requirements.len())
    )]
    pub fn resolve(
        &self,
        requirements: &[Dependency],
        aliases: &SourceAliases,
    ) -> Result<Lock, ResolveError> {
        let resolved = requirements
            .iter()
            .enumerate()
            .map(|(position, dependency)| self.resolve_one(position, dependency, aliases))
            .collect::<Result<Vec<_>, _>>()?;

        let digest = lock_digest(requirements, &resolved)?;
        debug!(
            "resolved {} dependencies of {:?}",
            resolved.len(),
            self.chart_path
        );
        Ok(Lock::new(resolved, digest))
    }

    fn resolve_one(
        &self,
        position: usize,
        dependency: &Dependency,
        aliases: &SourceAliases,
    ) -> Result<ResolvedDependency, ResolveError> {
        let key = dependency.key(position);
        let constraint = Constraint::parse(&dependency.version)
            .map_err(|e| ResolveError::from_index(dependency, e))?;

        let version = match dependency.source() {
            Source::LocalSubchart => self.resolve_subchart(dependency)?,
            Source::LocalPath { locator } => self.resolve_local(dependency, &locator, &constraint)?,
            Source::Remote { repository, oci } => {
                self.resolve_remote(dependency, &key, &repository, oci, &constraint, aliases)?
            }
        };

        trace!("{} resolved to {}", key, version);
        Ok(ResolvedDependency::new(
            dependency.name.clone(),
            dependency.repository.clone(),
            version,
        ))
    }

    /// A subchart vendored as `charts/<name>` or `charts/<name>-<version>.tgz`.
    fn resolve_subchart(&self, dependency: &Dependency) -> Result<String, ResolveError> {
        let version = dependency.version.trim();
        let charts = self.chart_path.join(CHARTS_DIR);

        match ensure_exists(clean_path(&charts.join(&dependency.name))) {
            Ok(path) => trace!("subchart {} found at {:?}", dependency.name, path),
            Err(ResolveError::LocalPathNotFound { path }) => {
                let archive = charts.join(format!("{}-{version}{ARCHIVE_EXTENSION}", dependency.name));
                match ensure_exists(clean_path(&archive)) {
                    Ok(archive) => trace!("subchart {} found at {:?}", dependency.name, archive),
                    // report the directory, the primary location
                    Err(ResolveError::LocalPathNotFound { .. }) => {
                        return Err(ResolveError::LocalPathNotFound { path })
                    }
                    Err(e) => return Err(e),
                }
            }
            Err(e) => return Err(e),
        }

        Ok(version.to_string())
    }

    /// A chart directory or archive named by a `file://` locator.
    fn resolve_local(
        &self,
        dependency: &Dependency,
        locator: &str,
        constraint: &Constraint,
    ) -> Result<String, ResolveError> {
        let path = resolve_local_path(locator, &self.chart_path)?;

        if path.is_dir() {
            let metadata = ChartMetadata::load(&path)?;
            if !constraint.matches_str(&metadata.version) {
                debug!(
                    "local chart {:?} has version {} outside {:?}",
                    path,
                    metadata.version,
                    constraint.as_str()
                );
                return Err(ResolveError::unsatisfied(dependency));
            }
            return Ok(metadata.version);
        }

        let is_archive = path
            .file_name()
            .and_then(|name| name.to_str())
            .is_some_and(|name| name.ends_with(ARCHIVE_EXTENSION));
        if !is_archive {
            debug!("{:?} is neither a chart directory nor an archive", path);
            return Err(ResolveError::LocalPathNotFound { path });
        }

        match archive_version(&path, &dependency.name) {
            Some(version) if constraint.matches_str(&version) => Ok(version),
            Some(_) => Err(ResolveError::unsatisfied(dependency)),
            // only an exact declaration can stand in for the archive's version
            None => match constraint.exact_version() {
                Some(_) => {
                    trace!("no version in archive name {:?}, trusting declaration", path);
                    Ok(dependency.version.trim().to_string())
                }
                None => Err(ResolveError::unsatisfied(dependency)),
            },
        }
    }

    fn resolve_remote(
        &self,
        dependency: &Dependency,
        key: &DependencyKey,
        repository: &str,
        oci: bool,
        constraint: &Constraint,
        aliases: &SourceAliases,
    ) -> Result<String, ResolveError> {
        let Some(alias) = aliases.get(key) else {
            debug!("no repository alias for {}, keeping declared version", key);
            return Ok(dependency.version.trim().to_string());
        };

        if oci {
            return self.resolve_oci(dependency, repository, constraint);
        }

        let index = self
            .catalogs
            .load(alias)
            .map_err(|source| ResolveError::CacheUnavailable {
                alias: alias.to_string(),
                source,
            })?;

        index
            .find_matching(&dependency.name, constraint)
            .map_err(|e| ResolveError::from_index(dependency, e))
    }

    fn resolve_oci(
        &self,
        dependency: &Dependency,
        repository: &str,
        constraint: &Constraint,
    ) -> Result<String, ResolveError> {
        if constraint.exact_version().is_some() {
            return Ok(dependency.version.trim().to_string());
        }

        let registry_error = |source: anyhow::Error| ResolveError::Registry {
            repository: repository.to_string(),
            source,
        };

        let reference = oci_reference(repository, &dependency.name)
            .ok_or_else(|| registry_error(anyhow!("invalid OCI reference {repository}")))?;
        // tags cannot carry '+', registries publish build metadata with '_'
        let tags: Vec<String> = self
            .registry
            .tags(&reference)
            .map_err(registry_error)?
            .into_iter()
            .map(|tag| tag.replace('_', "+"))
            .collect();

        trace!("{} tags listed for {}", tags.len(), reference);
        select_highest(tags.iter().map(String::as_str), constraint)
            .map(str::to_string)
            .ok_or_else(|| ResolveError::unsatisfied(dependency))
    }
}

/// Version encoded in a `<name>-<version>.tgz` archive file name.
fn archive_version(path: &Path, name: &str) -> Option<String> {
    let file_name = path.file_name()?.to_str()?;
    let version = file_name
        .strip_suffix(ARCHIVE_EXTENSION)?
        .strip_prefix(name)?
        .strip_prefix('-')?;
    parse_version(version).ok().map(|_| version.to_string())
}

#[cfg(test)]
mod tests {
    use std::collections::HashMap;

    use repo_index::{ChartVersion, IndexFile};

    use super::*;
    use crate::registry::MemoryRegistry;

    fn fixture_resolver() -> Resolver {
        Resolver::with_repository_cache(
            "testdata/chartpath",
            "testdata/repository",
            Arc::new(MemoryRegistry::new()),
        )
    }

    fn fixture_aliases() -> SourceAliases {
        [
            ("alpine-0", "kubernetes-charts"),
            ("redis-0", "kubernetes-charts"),
        ]
        .into_iter()
        .collect()
    }

    fn versions(lock: &Lock) -> Vec<&str> {
        lock.dependencies().iter().map(|d| d.version.as_str()).collect()
    }

    #[test]
    fn test_resolve() {
        struct Case {
            name: &'static str,
            req: Vec<Dependency>,
            expect: Option<Vec<ResolvedDependency>>,
        }

        let cases = vec![
            Case {
                name: "version failure",
                req: vec![Dependency::new("oedipus-rex", "http://example.com", ">a1")],
                expect: None,
            },
            Case {
                name: "cache index failure",
                req: vec![Dependency::new("oedipus-rex", "http://example.com", "1.0.0")],
                expect: Some(vec![ResolvedDependency::new(
                    "oedipus-rex",
                    "http://example.com",
                    "1.0.0",
                )]),
            },
            Case {
                name: "chart not found failure",
                req: vec![Dependency::new("redis", "http://example.com", "1.0.0")],
                expect: None,
            },
            Case {
                name: "constraint not satisfied failure",
                req: vec![Dependency::new("alpine", "http://example.com", ">=1.0.0")],
                expect: None,
            },
            Case {
                name: "valid lock",
                req: vec![Dependency::new("alpine", "http://example.com", ">=0.1.0")],
                expect: Some(vec![ResolvedDependency::new(
                    "alpine",
                    "http://example.com",
                    "0.2.0",
                )]),
            },
            Case {
                name: "repo from valid local path",
                req: vec![Dependency::new("base", "file://base", "0.1.0")],
                expect: Some(vec![ResolvedDependency::new("base", "file://base", "0.1.0")]),
            },
            Case {
                name: "repo from valid local path with range resolution",
                req: vec![Dependency::new("base", "file://base", "^0.1.0")],
                expect: Some(vec![ResolvedDependency::new("base", "file://base", "0.1.0")]),
            },
            Case {
                name: "repo from invalid local path",
                req: vec![Dependency::new("nonexistent", "file://testdata/nonexistent", "0.1.0")],
                expect: None,
            },
            Case {
                name: "repo from valid path under charts path",
                req: vec![Dependency::new("localdependency", "", "0.1.0")],
                expect: Some(vec![ResolvedDependency::new("localdependency", "", "0.1.0")]),
            },
            Case {
                name: "repo from invalid path under charts path",
                req: vec![Dependency::new("nonexistentdependency", "", "0.1.0")],
                expect: None,
            },
        ];

        let resolver = fixture_resolver();
        let aliases = fixture_aliases();

        for case in cases {
            let result = resolver.resolve(&case.req, &aliases);
            match (result, case.expect) {
                (Err(_), None) => {}
                (Err(e), Some(_)) => panic!("{}: unexpected error: {e}", case.name),
                (Ok(lock), None) => panic!("{}: expected error, got {lock:?}", case.name),
                (Ok(lock), Some(expect)) => {
                    assert_eq!(lock.dependencies(), expect.as_slice(), "{}", case.name);
                    assert_eq!(
                        lock.digest(),
                        lock_digest(&case.req, &expect).unwrap(),
                        "{}: digest",
                        case.name
                    );
                    assert!(!lock.is_stale(&case.req), "{}", case.name);
                }
            }
        }
    }

    #[test]
    fn test_error_kinds() {
        let resolver = fixture_resolver();
        let aliases = fixture_aliases();

        let err = resolver
            .resolve(&[Dependency::new("oedipus-rex", "http://example.com", ">a1")], &aliases)
            .unwrap_err();
        assert!(matches!(err, ResolveError::InvalidConstraint { ref name, .. } if name == "oedipus-rex"));

        let err = resolver
            .resolve(&[Dependency::new("redis", "http://example.com", "1.0.0")], &aliases)
            .unwrap_err();
        assert!(matches!(err, ResolveError::ChartNotFound { ref name, .. } if name == "redis"));

        let err = resolver
            .resolve(&[Dependency::new("alpine", "http://example.com", ">=1.0.0")], &aliases)
            .unwrap_err();
        assert!(matches!(err, ResolveError::ConstraintUnsatisfied { .. }));

        let err = resolver
            .resolve(&[Dependency::new("nonexistentdependency", "", "0.1.0")], &aliases)
            .unwrap_err();
        match err {
            ResolveError::LocalPathNotFound { path } => {
                assert!(path.ends_with("charts/nonexistentdependency"))
            }
            other => panic!("unexpected error: {other}"),
        }

        let err = resolver
            .resolve(&[Dependency::new("base", "file://base", ">=1.0.0")], &aliases)
            .unwrap_err();
        assert!(matches!(err, ResolveError::ConstraintUnsatisfied { ref name, .. } if name == "base"));
    }

    #[test]
    fn test_invalid_constraint_for_every_source() {
        let resolver = fixture_resolver();
        let aliases = fixture_aliases();

        for dependency in [
            Dependency::new("localdependency", "", ">a1"),
            Dependency::new("base", "file://base", ">a1"),
            Dependency::new("alpine", "http://example.com", ""),
        ] {
            let err = resolver.resolve(&[dependency], &aliases).unwrap_err();
            assert!(matches!(err, ResolveError::InvalidConstraint { .. }));
        }
    }

    #[test]
    fn test_missing_cache_for_alias() {
        let resolver = fixture_resolver();
        let aliases: SourceAliases = [("alpine-0", "unknown")].into_iter().collect();

        let err = resolver
            .resolve(&[Dependency::new("alpine", "http://example.com", ">=0.1.0")], &aliases)
            .unwrap_err();
        assert!(matches!(err, ResolveError::CacheUnavailable { ref alias, .. } if alias == "unknown"));
    }

    #[test]
    fn test_same_name_different_repositories() {
        let resolver = fixture_resolver();
        let req = vec![
            Dependency::new("alpine", "http://example.com/repo1", ">=0.1.0"),
            Dependency::new("alpine", "http://example.com/repo2", "^0.1.0"),
        ];
        let mut aliases = SourceAliases::new();
        aliases.insert_for(&req[0], 0, "kubernetes-charts");
        aliases.insert_for(&req[1], 1, "kubernetes-charts");

        let lock = resolver.resolve(&req, &aliases).unwrap();
        assert_eq!(versions(&lock), vec!["0.2.0", "0.1.0"]);
        assert_eq!(lock.dependencies()[0].repository, "http://example.com/repo1");
        assert_eq!(lock.dependencies()[1].repository, "http://example.com/repo2");
    }

    #[test]
    fn test_in_memory_catalog() {
        let mut index = IndexFile::new();
        index.add(ChartVersion::new("alpine", "0.2.0"));
        let catalogs: HashMap<String, Arc<IndexFile>> =
            HashMap::from([("known-remote".to_string(), Arc::new(index))]);

        let resolver = Resolver::new(
            "testdata/chartpath",
            Arc::new(catalogs),
            Arc::new(MemoryRegistry::new()),
        );
        let req = vec![Dependency::new("alpine", "https://charts.example.com", ">=0.1.0")];
        let aliases: SourceAliases = [("alpine-0", "known-remote")].into_iter().collect();

        let lock = resolver.resolve(&req, &aliases).unwrap();
        let expect = vec![ResolvedDependency::new(
            "alpine",
            "https://charts.example.com",
            "0.2.0",
        )];
        assert_eq!(lock.dependencies(), expect.as_slice());
        assert_eq!(lock.digest(), lock_digest(&req, &expect).unwrap());
    }

    #[test]
    fn test_resolve_is_idempotent() {
        let resolver = fixture_resolver();
        let aliases = fixture_aliases();
        let req = vec![
            Dependency::new("alpine", "http://example.com", ">=0.1.0"),
            Dependency::new("base", "file://base", "0.1.0"),
            Dependency::new("localdependency", "", "0.1.0"),
        ];

        let first = resolver.resolve(&req, &aliases).unwrap();
        let second = resolver.resolve(&req, &aliases).unwrap();
        assert_eq!(first, second);
    }

    #[test]
    fn test_fail_fast() {
        let resolver = fixture_resolver();
        let aliases = fixture_aliases();
        let req = vec![
            Dependency::new("alpine", "http://example.com", ">=0.1.0"),
            Dependency::new("nonexistentdependency", "", "0.1.0"),
            Dependency::new("redis", "http://example.com", "1.0.0"),
        ];

        let err = resolver.resolve(&req, &aliases).unwrap_err();
        assert!(matches!(err, ResolveError::LocalPathNotFound { .. }));
    }

    #[test]
    fn test_chart_file_dependencies() {
        let resolver = fixture_resolver();
        let metadata = ChartMetadata::load(resolver.chart_path()).unwrap();
        let aliases: SourceAliases = [("alpine-0", "kubernetes-charts")].into_iter().collect();

        let lock = resolver.resolve(&metadata.dependencies, &aliases).unwrap();
        assert_eq!(versions(&lock), vec!["0.2.0", "0.1.0", "0.1.0"]);
        assert!(!lock.is_stale(&metadata.dependencies));
    }

    #[test]
    fn test_subchart_archive() {
        let chart = tempfile::tempdir().unwrap();
        let charts = chart.path().join(CHARTS_DIR);
        std::fs::create_dir(&charts).unwrap();
        std::fs::write(charts.join("packaged-1.2.3.tgz"), b"").unwrap();

        let resolver = Resolver::new(
            chart.path(),
            Arc::new(HashMap::<String, Arc<IndexFile>>::new()),
            Arc::new(MemoryRegistry::new()),
        );
        let lock = resolver
            .resolve(&[Dependency::new("packaged", "", "1.2.3")], &SourceAliases::new())
            .unwrap();
        assert_eq!(versions(&lock), vec!["1.2.3"]);

        let err = resolver
            .resolve(&[Dependency::new("packaged", "", "1.2.4")], &SourceAliases::new())
            .unwrap_err();
        assert!(matches!(err, ResolveError::LocalPathNotFound { .. }));
    }

    #[test]
    fn test_local_archive() {
        let chart = tempfile::tempdir().unwrap();
        let vendor = chart.path().join("vendor");
        std::fs::create_dir(&vendor).unwrap();
        std::fs::write(vendor.join("redis-1.4.0.tgz"), b"").unwrap();
        std::fs::write(vendor.join("redis.tgz"), b"").unwrap();

        let resolver = Resolver::new(
            chart.path(),
            Arc::new(HashMap::<String, Arc<IndexFile>>::new()),
            Arc::new(MemoryRegistry::new()),
        );
        let aliases = SourceAliases::new();

        let lock = resolver
            .resolve(
                &[Dependency::new("redis", "file://vendor/redis-1.4.0.tgz", "^1.0.0")],
                &aliases,
            )
            .unwrap();
        assert_eq!(versions(&lock), vec!["1.4.0"]);

        let err = resolver
            .resolve(
                &[Dependency::new("redis", "file://vendor/redis-1.4.0.tgz", "^2.0.0")],
                &aliases,
            )
            .unwrap_err();
        assert!(matches!(err, ResolveError::ConstraintUnsatisfied { .. }));

        // no version in the file name
        let lock = resolver
            .resolve(&[Dependency::new("redis", "file://vendor/redis.tgz", "1.0.0")], &aliases)
            .unwrap();
        assert_eq!(versions(&lock), vec!["1.0.0"]);

        let err = resolver
            .resolve(&[Dependency::new("redis", "file://vendor/redis.tgz", "^1.0.0")], &aliases)
            .unwrap_err();
        assert!(matches!(err, ResolveError::ConstraintUnsatisfied { ref name, .. } if name == "redis"));
    }

    #[test]
    fn test_local_file_is_not_a_package() {
        let resolver = fixture_resolver();
        let aliases = fixture_aliases();

        for version in ["^0.1.0", "0.1.0"] {
            let err = resolver
                .resolve(&[Dependency::new("base", "file://base/Chart.yaml", version)], &aliases)
                .unwrap_err();
            match err {
                ResolveError::LocalPathNotFound { path } => {
                    assert!(path.ends_with("base/Chart.yaml"))
                }
                other => panic!("unexpected error: {other}"),
            }
        }
    }

    #[test]
    fn test_local_chart_without_metadata() {
        let chart = tempfile::tempdir().unwrap();
        std::fs::create_dir(chart.path().join("empty")).unwrap();

        let resolver = Resolver::new(
            chart.path(),
            Arc::new(HashMap::<String, Arc<IndexFile>>::new()),
            Arc::new(MemoryRegistry::new()),
        );
        let err = resolver
            .resolve(&[Dependency::new("empty", "file://empty", "0.1.0")], &SourceAliases::new())
            .unwrap_err();
        assert!(matches!(err, ResolveError::ChartMetadata { .. }));
    }

    #[test]
    fn test_oci() {
        let registry = MemoryRegistry::new().with_tags(
            "registry.example.com/charts/alpine",
            ["0.1.0", "0.2.0", "0.2.1_build.1", "1.0.0"],
        );
        let resolver = Resolver::new(
            "testdata/chartpath",
            Arc::new(HashMap::<String, Arc<IndexFile>>::new()),
            Arc::new(registry),
        );
        let aliases: SourceAliases = [("alpine-0", "oci://registry.example.com/charts")]
            .into_iter()
            .collect();
        let resolve = |version: &str| {
            resolver.resolve(
                &[Dependency::new("alpine", "oci://registry.example.com/charts", version)],
                &aliases,
            )
        };

        assert_eq!(versions(&resolve("^0.1.0").unwrap()), vec!["0.1.0"]);
        assert_eq!(versions(&resolve("~0.2.0").unwrap()), vec!["0.2.1+build.1"]);
        assert_eq!(versions(&resolve(">=0.1.0").unwrap()), vec!["1.0.0"]);
        // exact versions skip the registry
        assert_eq!(versions(&resolve("9.9.9").unwrap()), vec!["9.9.9"]);

        let err = resolve(">=2.0.0").unwrap_err();
        assert!(matches!(err, ResolveError::ConstraintUnsatisfied { .. }));
    }

    #[test]
    fn test_oci_registry_failure() {
        let resolver = fixture_resolver();
        let aliases: SourceAliases = [("redis-0", "oci://registry.example.com/charts")]
            .into_iter()
            .collect();

        let err = resolver
            .resolve(
                &[Dependency::new("redis", "oci://registry.example.com/charts", "^1.0.0")],
                &aliases,
            )
            .unwrap_err();
        assert!(matches!(err, ResolveError::Registry { .. }));
    }

    #[test]
    fn test_archive_version() {
        assert_eq!(
            archive_version(Path::new("vendor/redis-1.4.0.tgz"), "redis").as_deref(),
            Some("1.4.0")
        );
        assert_eq!(
            archive_version(Path::new("my-chart-0.1.0-rc.1.tgz"), "my-chart").as_deref(),
            Some("0.1.0-rc.1")
        );
        assert_eq!(archive_version(Path::new("redis.tgz"), "redis"), None);
        assert_eq!(archive_version(Path::new("redis-latest.tgz"), "redis"), None);
        assert_eq!(archive_version(Path::new("other-1.0.0.tgz"), "redis"), None);
    }
}
