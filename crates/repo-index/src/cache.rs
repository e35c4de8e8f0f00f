//! Cached repository indexes keyed by repository alias.

use std::collections::HashMap;
use std::fmt;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use moka::sync::Cache;
use tracing::debug;

use crate::entry::IndexFile;
use crate::error::IndexError;

/// File name suffix of a cached index: `<alias>-index.yaml`.
pub const CACHE_INDEX_SUFFIX: &str = "-index.yaml";

/// Parsed indexes are kept for 3 minutes
const CACHE_TTL: Duration = Duration::from_secs(3 * 60);

const CACHE_CAPACITY: u64 = 64;

/// Source of cached repository indexes.
///
/// Implementations are read-only from the resolver's point of view and must
/// be shareable across threads.
pub trait CatalogCache: Send + Sync {
    /// Load the index cached for a repository alias.
    fn load(&self, alias: &str) -> Result<Arc<IndexFile>, IndexError>;
}

/// Index cache backed by a repository cache directory.
///
/// Parsed indexes are memoized so repeated resolutions do not re-read and
/// re-parse large index files.
#[derive(Clone)]
pub struct FileCatalogCache {
    root: PathBuf,
    parsed: Cache<String, Arc<IndexFile>>,
}

impl FileCatalogCache {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self {
            root: root.into(),
            parsed: Cache::builder()
                .time_to_live(CACHE_TTL)
                .max_capacity(CACHE_CAPACITY)
                .build(),
        }
    }

    /// Location of the cached index for an alias.
    pub fn index_path(&self, alias: &str) -> PathBuf {
        self.root.join(format!("{alias}{CACHE_INDEX_SUFFIX}"))
    }

    /// Forget the parsed index for an alias so the next load re-reads it.
    pub fn invalidate(&self, alias: &str) {
        self.parsed.invalidate(alias);
    }
}

impl fmt::Debug for FileCatalogCache {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("FileCatalogCache")
            .field("root", &self.root)
            .field("entries", &self.parsed.entry_count())
            .finish()
    }
}

impl CatalogCache for FileCatalogCache {
    fn load(&self, alias: &str) -> Result<Arc<IndexFile>, IndexError> {
        if let Some(cached) = self.parsed.get(alias) {
            debug!("index cache hit for '{}'", alias);
            return Ok(cached);
        }

        let path = self.index_path(alias);
        debug!("index cache miss for '{}', reading {:?}", alias, path);

        let index = Arc::new(IndexFile::load(&path)?);
        self.parsed.insert(alias.to_string(), index.clone());
        Ok(index)
    }
}

impl CatalogCache for HashMap<String, Arc<IndexFile>> {
    fn load(&self, alias: &str) -> Result<Arc<IndexFile>, IndexError> {
        self.get(alias).cloned().ok_or_else(|| IndexError::NotCached {
            alias: alias.to_string(),
        })
    }
}
