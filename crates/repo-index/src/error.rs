//! Error types for repo-index.

use std::path::PathBuf;

use thiserror::Error;

/// Errors that can occur while loading an index or looking up a version in it.
#[derive(Debug, Error)]
pub enum IndexError {
    /// The index file could not be read
    #[error("failed to read index file {}: {source}", path.display())]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// The index file is not valid YAML for an index
    #[error("failed to parse index file {}: {source}", path.display())]
    Parse {
        path: PathBuf,
        #[source]
        source: serde_yaml::Error,
    },

    /// The index file has no `apiVersion`
    #[error("no API version specified in index file {}", path.display())]
    MissingApiVersion { path: PathBuf },

    /// The version string is neither an exact version nor a range
    #[error("invalid version constraint {constraint:?}: {reason}")]
    InvalidConstraint { constraint: String, reason: String },

    /// No index is cached under the alias
    #[error("no index cached for repository {alias}")]
    NotCached { alias: String },

    /// The index has no entries at all for the chart
    #[error("chart {name} not found in index")]
    ChartNotFound { name: String },

    /// The chart has entries but none satisfies the constraint
    #[error("no version of chart {name} satisfies {constraint:?}")]
    ConstraintUnsatisfied { name: String, constraint: String },
}

impl IndexError {
    pub(crate) fn invalid_constraint(constraint: &str, reason: impl ToString) -> Self {
        IndexError::InvalidConstraint {
            constraint: constraint.to_string(),
            reason: reason.to_string(),
        }
    }
}
