//! Filesystem locations of local chart dependencies.

use std::io::ErrorKind;
use std::path::{Component, Path, PathBuf};

use tracing::trace;

use crate::error::ResolveError;

/// Prefix of repository locators pointing at the local filesystem.
pub const FILE_SCHEME: &str = "file://";

/// Resolve a local repository locator to an existing path.
///
/// `file://` is stripped if present. Absolute remainders are used as they are;
/// anything else is joined onto `base_path`. The result is cleaned lexically
/// and must exist.
pub fn resolve_local_path(locator: &str, base_path: &Path) -> Result<PathBuf, ResolveError> {
    let trimmed = locator.strip_prefix(FILE_SCHEME).unwrap_or(locator);

    let candidate = if trimmed.starts_with('/') || Path::new(trimmed).is_absolute() {
        PathBuf::from(trimmed)
    } else {
        base_path.join(trimmed)
    };

    ensure_exists(clean_path(&candidate))
}

/// Return `path` if it exists, `LocalPathNotFound` if it does not.
pub(crate) fn ensure_exists(path: PathBuf) -> Result<PathBuf, ResolveError> {
    match std::fs::metadata(&path) {
        Ok(_) => {
            trace!("local chart path {:?} exists", path);
            Ok(dunce::simplified(&path).to_path_buf())
        }
        Err(e) if e.kind() == ErrorKind::NotFound => Err(ResolveError::LocalPathNotFound { path }),
        Err(source) => Err(ResolveError::Io { path, source }),
    }
}

/// Lexically normalize a path: drop `.`, fold `name/..`, collapse separators.
///
/// `..` directly under the root is dropped; leading `..` of a relative path
/// is kept. An empty result is `.`.
pub fn clean_path(path: &Path) -> PathBuf {
    let mut out: Vec<Component> = Vec::new();

    for component in path.components() {
        match component {
            Component::CurDir => {}
            Component::ParentDir => match out.last() {
                Some(Component::Normal(_)) => {
                    out.pop();
                }
                Some(Component::RootDir) | Some(Component::Prefix(_)) => {}
                _ => out.push(component),
            },
            other => out.push(other),
        }
    }

    if out.is_empty() {
        return PathBuf::from(".");
    }
    out.iter().collect()
}
