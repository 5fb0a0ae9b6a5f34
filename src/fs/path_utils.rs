// Path helpers shared by both sides of a sync.
// Relative keys always use '/' so local and remote snapshots compare equal
// regardless of the host separator.

use std::path::{Path, PathBuf};

/// Extend a relative key with one more name.
pub fn child_key(parent: &str, name: &str) -> String {
    if parent.is_empty() {
        name.to_string()
    } else {
        format!("{}/{}", parent, name)
    }
}

/// Resolve a snapshot key under a local root.
pub fn local_path(root: &Path, key: &str) -> PathBuf {
    let mut path = root.to_path_buf();
    for segment in key.split('/').filter(|s| !s.is_empty()) {
        path.push(segment);
    }
    path
}

/// Join a relative key onto a remote root.
pub fn join_remote(root: &str, relative: &str) -> String {
    let relative = relative.trim_start_matches('/');
    if relative.is_empty() {
        return root.to_string();
    }

    let base = root.trim_end_matches('/');
    if base.is_empty() {
        if root.starts_with('/') {
            format!("/{}", relative)
        } else {
            relative.to_string()
        }
    } else {
        format!("{}/{}", base, relative)
    }
}

/// True for the storage root: "", "/" or a bare scheme like "disk:".
pub fn is_remote_root(path: &str) -> bool {
    let trimmed = path.trim_end_matches('/');
    trimmed.is_empty() || trimmed.ends_with(':')
}

/// Parent directory of a remote path, or `None` when the parent is the
/// storage root.
pub fn parent_dir(path: &str) -> Option<&str> {
    let trimmed = path.trim_end_matches('/');
    let (parent, _) = trimmed.rsplit_once('/')?;
    if is_remote_root(parent) {
        None
    } else {
        Some(parent)
    }
}
