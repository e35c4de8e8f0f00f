//! Declared and resolved dependency records, the lock and the alias map.

use std::borrow::Borrow;
use std::collections::HashMap;
use std::fmt;

use serde::{Deserialize, Serialize};

use crate::digest::lock_digest;
use crate::source::Source;

/// A dependency as declared by a chart.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Dependency {
    /// Chart name
    pub name: String,
    /// Exact version or range expression
    #[serde(default)]
    pub version: String,
    /// Source locator: empty, `file://...`, or a repository URL/alias
    #[serde(default)]
    pub repository: String,
}

impl Dependency {
    pub fn new(
        name: impl Into<String>,
        repository: impl Into<String>,
        version: impl Into<String>,
    ) -> Self {
        Self {
            name: name.into(),
            version: version.into(),
            repository: repository.into(),
        }
    }

    /// Alias map key of this dependency at `position` in its declaration list.
    pub fn key(&self, position: usize) -> DependencyKey {
        DependencyKey::new(&self.name, position)
    }

    /// Where this dependency comes from.
    pub fn source(&self) -> Source {
        Source::classify(&self.repository)
    }
}

/// A dependency pinned to one concrete version.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ResolvedDependency {
    pub name: String,
    /// Concrete version
    pub version: String,
    #[serde(default)]
    pub repository: String,
}

impl ResolvedDependency {
    pub fn new(
        name: impl Into<String>,
        repository: impl Into<String>,
        version: impl Into<String>,
    ) -> Self {
        Self {
            name: name.into(),
            version: version.into(),
            repository: repository.into(),
        }
    }
}

/// The resolved dependencies of a chart and the digest binding them to the
/// requirements they were resolved from.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Lock {
    dependencies: Vec<ResolvedDependency>,
    digest: String,
}

impl Lock {
    pub(crate) fn new(dependencies: Vec<ResolvedDependency>, digest: String) -> Self {
        Self {
            dependencies,
            digest,
        }
    }

    /// Resolved dependencies, in declaration order.
    pub fn dependencies(&self) -> &[ResolvedDependency] {
        &self.dependencies
    }

    /// `sha256:<hex>` digest of requirements and resolution.
    pub fn digest(&self) -> &str {
        &self.digest
    }

    /// Returns true if the lock was not produced from `requirements`.
    ///
    /// A lock with a different number of dependencies is always stale.
    pub fn is_stale(&self, requirements: &[Dependency]) -> bool {
        match lock_digest(requirements, &self.dependencies) {
            Ok(digest) => digest != self.digest,
            Err(_) => true,
        }
    }
}

/// Per-dependency alias map key: `<name>-<position>`.
///
/// Keys are positional so that two dependencies sharing a name but pointing
/// at different repositories get different aliases. Reordering the
/// declaration list without rebuilding the alias map misroutes lookups.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct DependencyKey(String);

impl DependencyKey {
    pub fn new(name: &str, position: usize) -> Self {
        Self(format!("{name}-{position}"))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for DependencyKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl Borrow<str> for DependencyKey {
    fn borrow(&self) -> &str {
        &self.0
    }
}

impl From<DependencyKey> for String {
    fn from(key: DependencyKey) -> Self {
        key.0
    }
}

/// Caller-supplied map from dependency key to repository alias.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct SourceAliases(HashMap<String, String>);

impl SourceAliases {
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert an alias under a raw key, returning the previous alias.
    pub fn insert(&mut self, key: impl Into<String>, alias: impl Into<String>) -> Option<String> {
        self.0.insert(key.into(), alias.into())
    }

    /// Insert an alias for the dependency declared at `position`.
    pub fn insert_for(
        &mut self,
        dependency: &Dependency,
        position: usize,
        alias: impl Into<String>,
    ) -> Option<String> {
        self.insert(dependency.key(position), alias)
    }

    pub fn get(&self, key: &DependencyKey) -> Option<&str> {
        self.0.get(key.as_str()).map(String::as_str)
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.0.iter().map(|(k, v)| (k.as_str(), v.as_str()))
    }
}

impl From<HashMap<String, String>> for SourceAliases {
    fn from(map: HashMap<String, String>) -> Self {
        Self(map)
    }
}

impl<K: Into<String>, V: Into<String>> FromIterator<(K, V)> for SourceAliases {
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        Self(iter.into_iter().map(|(k, v)| (k.into(), v.into())).collect())
    }
}
