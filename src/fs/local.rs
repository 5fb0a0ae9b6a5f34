use std::fs;
use std::io;
use std::path::Path;
use tracing::info;

use crate::error::{Result, SyncError};

/// Local filesystem operations used by the applier.
pub struct LocalFs;

impl LocalFs {
    /// Make sure `root` is a usable directory, creating it when missing.
    pub fn prepare_root(root: &Path) -> Result<()> {
        if !root.exists() {
            info!("Creating local root {}", root.display());
            fs::create_dir_all(root)
                .map_err(|e| SyncError::from_io_error(e, "creating", root))?;
        }

        if !root.is_dir() {
            return Err(SyncError::Config(format!(
                "{} is not a directory",
                root.display()
            )));
        }
        Ok(())
    }

    /// Create every missing directory above `path`.
    pub fn create_parent_dirs(path: &Path) -> Result<()> {
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)
                .map_err(|e| SyncError::from_io_error(e, "creating", parent))?;
        }
        Ok(())
    }

    pub fn delete_file(path: &Path) -> Result<()> {
        fs::remove_file(path).map_err(|e| SyncError::from_io_error(e, "deleting", path))
    }

    pub fn exists(path: &Path) -> bool {
        path.symlink_metadata().is_ok()
    }

    /// Fail if `path`, or any directory between `root` and it, is a symlink.
    ///
    /// Writes and deletes under the root must never follow a link out of
    /// the tree. The root itself may be a link.
    pub fn ensure_no_symlink(root: &Path, path: &Path) -> Result<()> {
        let Ok(relative) = path.strip_prefix(root) else {
            return Ok(());
        };

        let mut current = root.to_path_buf();
        for component in relative.components() {
            current.push(component);
            match current.symlink_metadata() {
                Ok(meta) if meta.file_type().is_symlink() => {
                    return Err(SyncError::Io {
                        path: current,
                        operation: "writing",
                        source: io::Error::new(
                            io::ErrorKind::InvalidInput,
                            "refusing to follow a symlink",
                        ),
                    });
                }
                Ok(_) => {}
                Err(err) if err.kind() == io::ErrorKind::NotFound => break,
                Err(err) => return Err(SyncError::from_io_error(err, "inspecting", &current)),
            }
        }
        Ok(())
    }
}
