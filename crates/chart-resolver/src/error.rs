//! Error types for chart-resolver.

use std::path::PathBuf;

use repo_index::IndexError;
use thiserror::Error;

use crate::dependency::Dependency;

/// Errors that abort a resolution. None of them is retried.
#[derive(Debug, Error)]
pub enum ResolveError {
    /// The declared version is neither an exact version nor a range
    #[error("dependency {name:?} has an invalid version/constraint format {constraint:?}: {reason}")]
    InvalidConstraint {
        name: String,
        constraint: String,
        reason: String,
    },

    /// No usable cached index for the repository alias
    #[error("no cached repository for {alias} found (try updating the repository index): {source}")]
    CacheUnavailable {
        alias: String,
        #[source]
        source: IndexError,
    },

    /// The repository index has no entries for the chart
    #[error("{name} chart not found in repo {repository}")]
    ChartNotFound { name: String, repository: String },

    /// Versions exist but none satisfies the declared constraint
    #[error("can't get a valid version for {name:?} (repository {repository:?}, version {constraint:?})")]
    ConstraintUnsatisfied {
        name: String,
        repository: String,
        constraint: String,
    },

    /// A local chart location does not exist
    #[error("directory {} not found", path.display())]
    LocalPathNotFound { path: PathBuf },

    /// Requirement and resolved lists differ in length
    #[error("cannot digest {requirements} requirements against {resolved} resolved dependencies")]
    DigestInputMismatch { requirements: usize, resolved: usize },

    /// A local chart's `Chart.yaml` is missing or invalid
    #[error("invalid chart metadata in {}: {reason}", path.display())]
    ChartMetadata { path: PathBuf, reason: String },

    /// The registry client failed to list tags
    #[error("could not retrieve list of tags for repository {repository}: {source}")]
    Registry {
        repository: String,
        #[source]
        source: anyhow::Error,
    },

    /// Filesystem failure other than a missing path
    #[error("failed to access {}: {source}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// Index failure with no more specific kind
    #[error("failed to look up {name}: {source}")]
    Index {
        name: String,
        #[source]
        source: IndexError,
    },

    /// The canonical digest input could not be encoded
    #[error("failed to encode lock digest input: {0}")]
    Encode(#[from] serde_json::Error),
}

impl ResolveError {
    /// Attach the dependency to an index lookup failure.
    pub(crate) fn from_index(dependency: &Dependency, err: IndexError) -> Self {
        match err {
            IndexError::InvalidConstraint { constraint, reason } => ResolveError::InvalidConstraint {
                name: dependency.name.clone(),
                constraint,
                reason,
            },
            IndexError::ChartNotFound { name } => ResolveError::ChartNotFound {
                name,
                repository: dependency.repository.clone(),
            },
            IndexError::ConstraintUnsatisfied { name, constraint } => {
                ResolveError::ConstraintUnsatisfied {
                    name,
                    repository: dependency.repository.clone(),
                    constraint,
                }
            }
            source => ResolveError::Index {
                name: dependency.name.clone(),
                source,
            },
        }
    }

    pub(crate) fn unsatisfied(dependency: &Dependency) -> Self {
        ResolveError::ConstraintUnsatisfied {
            name: dependency.name.clone(),
            repository: dependency.repository.clone(),
            constraint: dependency.version.clone(),
        }
    }

    /// Name of the dependency the error is about, when it is known.
    pub fn dependency_name(&self) -> Option<&str> {
        match self {
            ResolveError::InvalidConstraint { name, .. }
            | ResolveError::ChartNotFound { name, .. }
            | ResolveError::ConstraintUnsatisfied { name, .. }
            | ResolveError::Index { name, .. } => Some(name),
            _ => None,
        }
    }
}
