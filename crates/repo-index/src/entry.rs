//! Serializable index types for a chart repository.
//!
//! The shape follows a repository's `index.yaml`: an API version plus a map of
//! chart name to every published version of that chart.

use std::collections::HashMap;
use std::path::Path;

use serde::{Deserialize, Serialize};
use tracing::trace;

use crate::constraint::parse_version;
use crate::error::IndexError;

/// A single published version of a chart.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ChartVersion {
    /// Chart name (matches the key it is listed under)
    #[serde(default)]
    pub name: String,
    /// Version string as published (e.g., "0.2.0")
    pub version: String,
    /// Download locations for the packaged chart
    #[serde(default)]
    pub urls: Vec<String>,
    /// Whether the chart author deprecated this chart
    #[serde(default)]
    pub deprecated: bool,
    /// Archive digest as published
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub digest: Option<String>,
    /// Version of the packaged application
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub app_version: Option<String>,
}

impl ChartVersion {
    /// Create a downloadable entry with a single URL.
    pub fn new(name: impl Into<String>, version: impl Into<String>) -> Self {
        let name = name.into();
        let version = version.into();
        let urls = vec![format!("{name}-{version}.tgz")];
        Self {
            name,
            version,
            urls,
            ..Default::default()
        }
    }

    /// Parse the version string into a semver::Version.
    pub fn semver_version(&self) -> Option<semver::Version> {
        parse_version(&self.version).ok()
    }

    /// Returns true if this entry may be selected by a lookup.
    ///
    /// Deprecated entries and entries nothing can be downloaded from are skipped.
    pub fn is_selectable(&self) -> bool {
        !self.deprecated && !self.urls.is_empty()
    }
}

/// Parsed repository index.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct IndexFile {
    #[serde(default)]
    pub api_version: String,
    /// Chart name -> versions, newest first after `sort_entries`
    #[serde(default)]
    pub entries: HashMap<String, Vec<ChartVersion>>,
}

impl IndexFile {
    /// Create an empty index with the current API version.
    pub fn new() -> Self {
        Self {
            api_version: "v1".to_string(),
            entries: HashMap::new(),
        }
    }

    /// Load and validate an index file from disk.
    pub fn load(path: &Path) -> Result<Self, IndexError> {
        let content = std::fs::read_to_string(path).map_err(|source| IndexError::Read {
            path: path.to_path_buf(),
            source,
        })?;
        Self::parse(path, &content)
    }

    /// Parse index content; `path` is only used for error reporting.
    pub fn parse(path: &Path, content: &str) -> Result<Self, IndexError> {
        let mut index: IndexFile =
            serde_yaml::from_str(content).map_err(|source| IndexError::Parse {
                path: path.to_path_buf(),
                source,
            })?;

        if index.api_version.is_empty() {
            return Err(IndexError::MissingApiVersion {
                path: path.to_path_buf(),
            });
        }

        index.sort_entries();
        trace!(
            "parsed index {:?} with {} charts",
            path,
            index.entries.len()
        );
        Ok(index)
    }

    /// Add an entry, keeping the per-chart list sorted newest first.
    pub fn add(&mut self, entry: ChartVersion) {
        let versions = self.entries.entry(entry.name.clone()).or_default();
        versions.push(entry);
        sort_versions(versions);
    }

    /// Sort every chart's versions by semver, newest first.
    ///
    /// Versions that do not parse sort after all valid ones.
    pub fn sort_entries(&mut self) {
        for versions in self.entries.values_mut() {
            sort_versions(versions);
        }
    }

    /// All published versions of a chart, if the index lists it.
    pub fn get(&self, name: &str) -> Option<&[ChartVersion]> {
        self.entries.get(name).map(Vec::as_slice)
    }

    /// Returns true if the index lists the chart.
    pub fn has(&self, name: &str) -> bool {
        self.entries.contains_key(name)
    }

    /// Returns the number of charts in the index.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Returns true if the index lists no charts.
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

fn sort_versions(versions: &mut [ChartVersion]) {
    versions.sort_by(|a, b| match (a.semver_version(), b.semver_version()) {
        (Some(a), Some(b)) => b.cmp(&a),
        (Some(_), None) => std::cmp::Ordering::Less,
        (None, Some(_)) => std::cmp::Ordering::Greater,
        (None, None) => a.version.cmp(&b.version),
    });
}
