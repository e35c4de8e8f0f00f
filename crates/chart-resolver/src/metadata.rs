//! Chart metadata (`Chart.yaml`).

use std::io::ErrorKind;
use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::dependency::Dependency;
use crate::error::ResolveError;

/// Metadata file at the root of every chart directory.
pub const CHART_FILE: &str = "Chart.yaml";

/// The parts of `Chart.yaml` dependency resolution reads.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ChartMetadata {
    #[serde(default)]
    pub api_version: String,
    pub name: String,
    pub version: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub app_version: Option<String>,
    /// Declared dependencies, in declaration order
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub dependencies: Vec<Dependency>,
}

impl ChartMetadata {
    /// Load `Chart.yaml` from a chart directory.
    pub fn load(chart_dir: &Path) -> Result<Self, ResolveError> {
        let path = chart_dir.join(CHART_FILE);
        let content = std::fs::read_to_string(&path).map_err(|e| {
            let reason = if e.kind() == ErrorKind::NotFound {
                format!("{CHART_FILE} file is missing")
            } else {
                e.to_string()
            };
            ResolveError::ChartMetadata {
                path: path.clone(),
                reason,
            }
        })?;
        Self::parse(&path, &content)
    }

    /// Parse and validate metadata; `path` is only used for error reporting.
    pub fn parse(path: &Path, content: &str) -> Result<Self, ResolveError> {
        let invalid = |reason: String| ResolveError::ChartMetadata {
            path: path.to_path_buf(),
            reason,
        };

        let metadata: ChartMetadata =
            serde_yaml::from_str(content).map_err(|e| invalid(e.to_string()))?;

        if metadata.name.trim().is_empty() {
            return Err(invalid("chart name is required".to_string()));
        }
        if metadata.semver_version().is_none() {
            return Err(invalid(format!(
                "chart version {:?} is not a valid semantic version",
                metadata.version
            )));
        }
        Ok(metadata)
    }

    /// Parse the chart version into a semver::Version.
    pub fn semver_version(&self) -> Option<semver::Version> {
        repo_index::parse_version(&self.version).ok()
    }
}
