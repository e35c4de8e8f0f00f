//! Configured chart repositories and the alias map derived from them.

use std::io::ErrorKind;
use std::path::Path;

use anyhow::Context;
use chart_resolver::{Dependency, Source, SourceAliases};
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::{debug, warn};
use url::Url;

const ALIAS_SHORTHAND: &str = "@";
const ALIAS_PREFIX: &str = "alias:";

#[derive(Debug, Error, PartialEq, Eq)]
pub enum AliasError {
    #[error("no repository definition for {reference} (dependency {dependency})")]
    UnknownRepository {
        dependency: String,
        reference: String,
    },
}

/// A named chart repository.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Repository {
    pub name: String,
    pub url: String,
}

/// The `repositories.yaml` file.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RepositoryFile {
    #[serde(default)]
    pub api_version: String,
    #[serde(default)]
    pub repositories: Vec<Repository>,
}

impl RepositoryFile {
    /// Load the file; a missing file means no repositories are configured.
    pub fn load(path: &Path) -> anyhow::Result<Self> {
        let content = match std::fs::read_to_string(path) {
            Ok(content) => content,
            Err(e) if e.kind() == ErrorKind::NotFound => {
                debug!("no repository file at {:?}", path);
                return Ok(Self::default());
            }
            Err(e) => {
                return Err(e)
                    .with_context(|| format!("failed to read repository file {}", path.display()))
            }
        };
        serde_yaml::from_str(&content)
            .with_context(|| format!("invalid repository file {}", path.display()))
    }

    pub fn get(&self, name: &str) -> Option<&Repository> {
        self.repositories.iter().find(|r| r.name == name)
    }

    /// Repository whose URL designates the same location as `url`.
    pub fn find_by_url(&self, url: &str) -> Option<&Repository> {
        self.repositories.iter().find(|r| same_location(&r.url, url))
    }

    /// Derive the alias of every remote dependency from the configured
    /// repositories.
    ///
    /// `@name` and `alias:name` references must name a configured repository.
    /// OCI repositories are their own alias. Other URLs are matched against
    /// the configured repository URLs; dependencies with no match get no
    /// alias and keep their declared version.
    pub fn derive_aliases(&self, dependencies: &[Dependency]) -> Result<SourceAliases, AliasError> {
        let mut aliases = SourceAliases::new();

        for (position, dependency) in dependencies.iter().enumerate() {
            let repository = match dependency.source() {
                Source::Remote { oci: true, repository } => {
                    aliases.insert_for(dependency, position, repository);
                    continue;
                }
                Source::Remote { repository, .. } => repository,
                _ => continue,
            };

            let reference = repository
                .strip_prefix(ALIAS_SHORTHAND)
                .or_else(|| repository.strip_prefix(ALIAS_PREFIX));
            if let Some(name) = reference {
                if self.get(name).is_none() {
                    return Err(AliasError::UnknownRepository {
                        dependency: dependency.name.clone(),
                        reference: repository.clone(),
                    });
                }
                aliases.insert_for(dependency, position, name);
                continue;
            }

            match self.find_by_url(&repository) {
                Some(found) => {
                    aliases.insert_for(dependency, position, found.name.as_str());
                }
                None => warn!(
                    "no configured repository for {} ({}), keeping version {:?}",
                    dependency.name, repository, dependency.version
                ),
            }
        }

        Ok(aliases)
    }
}

fn same_location(a: &str, b: &str) -> bool {
    let a = a.trim().trim_end_matches('/');
    let b = b.trim().trim_end_matches('/');
    if a == b {
        return true;
    }
    // Url normalizes scheme and host case
    match (Url::parse(a), Url::parse(b)) {
        (Ok(a), Ok(b)) => a.as_str().trim_end_matches('/') == b.as_str().trim_end_matches('/'),
        _ => false,
    }
}
