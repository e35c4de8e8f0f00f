use std::path::{Path, PathBuf};
use std::sync::Arc;

use anyhow::{bail, Context};
use chart_resolver::{ChartMetadata, Lock, MemoryRegistry, Resolver, SourceAliases};
use tracing::{debug, info};

use crate::config::{Config, OutputFormat};
use crate::lockfile;
use crate::repositories::RepositoryFile;

/// Options of the `resolve` subcommand after merging flags over config.
#[derive(Debug, Clone)]
pub struct ResolveOptions {
    pub chart_dir: PathBuf,
    /// `KEY=ALIAS` pairs overriding derived aliases
    pub aliases: Vec<(String, String)>,
    pub output: OutputFormat,
    pub write: bool,
}

/// Parse a `KEY=ALIAS` command-line pair.
pub fn parse_alias(pair: &str) -> Result<(String, String), String> {
    match pair.split_once('=') {
        Some((key, alias)) if !key.trim().is_empty() && !alias.trim().is_empty() => {
            Ok((key.trim().to_string(), alias.trim().to_string()))
        }
        _ => Err(format!("expected KEY=ALIAS, got {pair:?}")),
    }
}

fn chart_dir(path: &Path) -> anyhow::Result<PathBuf> {
    dunce::canonicalize(path).with_context(|| format!("chart directory {} not found", path.display()))
}

fn build_aliases(
    config: &Config,
    metadata: &ChartMetadata,
    overrides: &[(String, String)],
) -> anyhow::Result<SourceAliases> {
    let repositories = RepositoryFile::load(&config.repository_config)?;
    let mut aliases = repositories.derive_aliases(&metadata.dependencies)?;
    for (key, alias) in overrides {
        debug!("alias override {} -> {}", key, alias);
        aliases.insert(key.as_str(), alias.as_str());
    }
    Ok(aliases)
}

/// Resolve the dependencies of a chart; prints the lock or writes `Chart.lock`.
pub fn resolve(config: &Config, options: &ResolveOptions) -> anyhow::Result<Lock> {
    let chart_dir = chart_dir(&options.chart_dir)?;
    let metadata = ChartMetadata::load(&chart_dir)?;
    let aliases = build_aliases(config, &metadata, &options.aliases)?;

    // a networked registry client is not bundled, exact OCI versions still resolve
    let resolver = Resolver::with_repository_cache(
        &chart_dir,
        &config.repository_cache,
        Arc::new(MemoryRegistry::new()),
    );
    let lock = resolver.resolve(&metadata.dependencies, &aliases).map_err(|e| {
        let context = match e.dependency_name() {
            Some(name) => format!("failed to resolve dependency {name} of {}", metadata.name),
            None => format!("failed to resolve dependencies of {}", metadata.name),
        };
        anyhow::Error::new(e).context(context)
    })?;

    if options.write {
        let path = lockfile::write(&chart_dir, &lock)?;
        info!("wrote {}", path.display());
    } else {
        print!("{}", lockfile::render(&lock, options.output)?);
    }
    Ok(lock)
}

/// Fail unless `Chart.lock` was produced from the declared dependencies.
pub fn verify(path: &Path) -> anyhow::Result<()> {
    let chart_dir = chart_dir(path)?;
    let metadata = ChartMetadata::load(&chart_dir)?;
    let lock = lockfile::read(&chart_dir)?;

    if lock.is_stale(&metadata.dependencies) {
        bail!(
            "{} is out of sync with the dependencies in {}",
            lockfile::LOCK_FILE,
            chart_resolver::CHART_FILE
        );
    }
    info!("{} is up to date", lockfile::lock_path(&chart_dir).display());
    Ok(())
}
