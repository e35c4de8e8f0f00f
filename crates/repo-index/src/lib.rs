//! # repo-index
//!
//! Load chart repository index files and answer "which version satisfies
//! this constraint" lookups against them.
//!
//! ## Overview
//!
//! The `repo-index` crate is the catalog side of chart dependency resolution:
//! - **IndexFile**: the parsed `index.yaml` of one chart repository
//! - **Constraint**: exact versions and range expressions (`^`, `~`, `>=`,
//!   `||`, hyphen ranges, wildcards)
//! - **CatalogCache**: the seam through which a resolver obtains the cached
//!   index for a repository alias
//!
//! ## Example
//!
//! ```ignore
//! use repo_index::{CatalogCache, FileCatalogCache};
//!
//! let cache = FileCatalogCache::new("/home/me/.cache/chartlock/repository");
//! let index = cache.load("kubernetes-charts")?;
//!
//! // Highest non-deprecated version satisfying the constraint
//! let version = index.find_version("alpine", ">=0.1.0")?;
//! assert_eq!(version, "0.2.0");
//! ```
//!
//! ## Complexity
//!
//! | Operation | Complexity |
//! |-----------|------------|
//! | `FileCatalogCache::load()` | O(n) + file I/O on a miss, O(1) on a hit |
//! | `find_version()` | O(k) for k entries of the chart |
//! | `Constraint::matches()` | O(c) for c comparators |

mod cache;
mod constraint;
mod entry;
mod error;
mod lookup;

pub use cache::{CatalogCache, FileCatalogCache, CACHE_INDEX_SUFFIX};
pub use constraint::{parse_version, Constraint};
pub use entry::{ChartVersion, IndexFile};
pub use error::IndexError;
pub use lookup::select_highest;
