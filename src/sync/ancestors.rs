//! Remote directory creation before a copy.
//!
//! Object stores and WebDAV shares both refuse to place a file under a
//! directory that does not exist, and `create_dir` needs an existing
//! parent. The resolver walks up from the destination directory until it
//! finds something that exists and returns what is missing.

use std::collections::HashSet;
use tracing::debug;

use crate::error::Result;
use crate::fs::path_utils::{is_remote_root, parent_dir};
use crate::fs::RemoteStore;

/// Missing directories for `dir`, nearest first.
///
/// Stops at the first existing candidate or before the storage root.
/// Existence failures other than not-found propagate.
pub async fn resolve_missing_ancestors(store: &dyn RemoteStore, dir: &str) -> Result<Vec<String>> {
    let mut missing = Vec::new();
    if is_remote_root(dir) {
        return Ok(missing);
    }

    let mut candidate = Some(dir.trim_end_matches('/'));
    while let Some(current) = candidate {
        debug!("Checking {}", store.display_path(current));
        if store.exists(current).await? {
            break;
        }
        missing.push(current.to_string());
        candidate = parent_dir(current);
    }

    Ok(missing)
}

/// Turn a resolver result into the order directories must be created in.
pub fn creation_order(mut missing: Vec<String>) -> Vec<String> {
    missing.reverse();
    missing
}

/// Resolve and create every missing ancestor of `dir`.
///
/// `known` holds directories already confirmed in this pass; it is
/// consulted first and extended with everything created or found.
/// Returns the number of directories created.
pub async fn create_missing_ancestors(
    store: &dyn RemoteStore,
    dir: &str,
    known: &mut HashSet<String>,
) -> Result<usize> {
    let dir = dir.trim_end_matches('/');
    if is_remote_root(dir) || known.contains(dir) {
        return Ok(0);
    }

    let missing = resolve_missing_ancestors(store, dir).await?;
    let created = missing.len();
    for path in creation_order(missing) {
        debug!("Creating directory {}", store.display_path(&path));
        store.create_dir(&path).await?;
    }

    // The whole chain above `dir` now exists
    let mut current = Some(dir);
    while let Some(path) = current {
        if !known.insert(path.to_string()) {
            break;
        }
        current = parent_dir(path);
    }

    Ok(created)
}
