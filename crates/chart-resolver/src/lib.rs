//! # chart-resolver
//!
//! Resolve a chart's declared dependencies to concrete versions and bind the
//! result to the declaration with a digest.
//!
//! ## Overview
//!
//! The `chart-resolver` crate complements `repo-index`:
//! - **repo-index**: what versions exist (cached repository indexes)
//! - **chart-resolver**: which of them a chart gets (the lock)
//!
//! Every dependency is classified by its repository locator:
//! - empty: a subchart vendored under the chart's `charts/` directory
//! - `file://...`: a chart elsewhere on the local filesystem
//! - anything else: a remote repository, looked up through the alias the
//!   caller assigned to the dependency's `name-position` key
//!
//! ## Example
//!
//! ```ignore
//! use std::sync::Arc;
//! use chart_resolver::{Dependency, MemoryRegistry, Resolver, SourceAliases};
//!
//! let resolver = Resolver::with_repository_cache(
//!     "mychart",
//!     "/home/me/.cache/chartlock/repository",
//!     Arc::new(MemoryRegistry::new()),
//! );
//!
//! let deps = vec![Dependency::new("alpine", "https://charts.example.com", ">=0.1.0")];
//! let mut aliases = SourceAliases::new();
//! aliases.insert_for(&deps[0], 0, "example");
//!
//! let lock = resolver.resolve(&deps, &aliases)?;
//! println!("{} -> {}", lock.digest(), lock.dependencies()[0].version);
//!
//! // Later: is the persisted lock still valid for the declared requirements?
//! assert!(!lock.is_stale(&deps));
//! ```

mod dependency;
mod digest;
mod error;
mod local;
mod metadata;
mod registry;
mod resolver;
mod source;

pub use dependency::{Dependency, DependencyKey, Lock, ResolvedDependency, SourceAliases};
pub use digest::{lock_digest, DIGEST_PREFIX};
pub use error::ResolveError;
pub use local::{clean_path, resolve_local_path, FILE_SCHEME};
pub use metadata::{ChartMetadata, CHART_FILE};
pub use registry::{MemoryRegistry, RegistryClient};
pub use resolver::{Resolver, ARCHIVE_EXTENSION, CHARTS_DIR};
pub use source::Source;

// Re-export the catalog seam so callers need only this crate
pub use repo_index::{CatalogCache, Constraint, FileCatalogCache, IndexFile};
