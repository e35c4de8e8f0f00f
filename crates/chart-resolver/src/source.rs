//! Classification of a dependency's repository locator.

use url::Url;

use crate::local::FILE_SCHEME;

const OCI_SCHEME: &str = "oci";

/// Where a dependency is fetched from.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Source {
    /// Vendored under the chart's `charts/` directory (empty repository)
    LocalSubchart,
    /// A `file://` locator
    LocalPath { locator: String },
    /// A repository URL or alias reference
    Remote { repository: String, oci: bool },
}

impl Source {
    pub fn classify(repository: &str) -> Self {
        let repository = repository.trim();
        if repository.is_empty() {
            Source::LocalSubchart
        } else if repository.starts_with(FILE_SCHEME) {
            Source::LocalPath {
                locator: repository.to_string(),
            }
        } else {
            let oci = Url::parse(repository).is_ok_and(|url| url.scheme() == OCI_SCHEME);
            Source::Remote {
                repository: repository.to_string(),
                oci,
            }
        }
    }
}

/// Registry reference for a chart in an OCI repository:
/// `oci://registry.example.com/charts` + `alpine` -> `registry.example.com/charts/alpine`.
pub(crate) fn oci_reference(repository: &str, name: &str) -> Option<String> {
    let url = Url::parse(repository.trim()).ok()?;
    if url.scheme() != OCI_SCHEME {
        return None;
    }
    let host = url.host_str()?;
    let port = url.port().map(|p| format!(":{p}")).unwrap_or_default();
    let path = url.path().trim_matches('/');
    if path.is_empty() {
        Some(format!("{host}{port}/{name}"))
    } else {
        Some(format!("{host}{port}/{path}/{name}"))
    }
}
