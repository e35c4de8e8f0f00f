//! OCI registry seam.

use std::collections::HashMap;

use anyhow::anyhow;

/// Lists the tags published for an OCI chart reference.
///
/// Transport, authentication and retries belong to the implementation.
pub trait RegistryClient: Send + Sync {
    /// Tags of `reference` (`host[:port]/path/name`).
    fn tags(&self, reference: &str) -> anyhow::Result<Vec<String>>;
}

/// Registry answering from a fixed set of references.
#[derive(Debug, Clone, Default)]
pub struct MemoryRegistry {
    tags: HashMap<String, Vec<String>>,
}

impl MemoryRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Publish tags for a reference.
    pub fn with_tags<I, S>(mut self, reference: impl Into<String>, tags: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.tags
            .entry(reference.into())
            .or_default()
            .extend(tags.into_iter().map(Into::into));
        self
    }
}

impl RegistryClient for MemoryRegistry {
    fn tags(&self, reference: &str) -> anyhow::Result<Vec<String>> {
        self.tags
            .get(reference)
            .cloned()
            .ok_or_else(|| anyhow!("repository {reference} not found"))
    }
}
