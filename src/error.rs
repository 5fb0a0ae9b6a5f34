//! Error types for the sync engine.
//!
//! Enumeration and diff errors abort a run before anything is mutated.
//! Apply errors carry enough context to tell which operation failed.

use std::io;
use std::path::{Path, PathBuf};

/// Errors raised while enumerating, diffing or applying a sync.
#[derive(Debug, thiserror::Error)]
pub enum SyncError {
    /// An enumeration root or a referenced path does not exist.
    #[error("path not found: {path}")]
    NotFound { path: String },

    /// The remote store failed for a reason other than "not found".
    #[error("remote storage failed on {path}: {message}")]
    TransportFault { path: String, message: String },

    /// The walk met an entry that is neither a file nor a directory.
    #[error("cannot classify {path} ({kind})")]
    UnknownEntryKind { path: String, kind: String },

    /// A confirmation prompt was declined.
    #[error("aborted by user")]
    UserAborted,

    /// The upload policy forbids replacing an existing destination.
    #[error("destination already exists: {path}")]
    AlreadyExists { path: String },

    /// Local filesystem failure.
    #[error("I/O error while {operation} {}: {source}", path.display())]
    Io {
        path: PathBuf,
        operation: &'static str,
        #[source]
        source: io::Error,
    },

    /// A best-effort pass finished but some operations failed.
    #[error("{failed} of {total} operations failed")]
    PartialFailure { failed: usize, total: usize },

    /// Invalid run configuration.
    #[error("invalid configuration: {0}")]
    Config(String),
}

pub type Result<T, E = SyncError> = std::result::Result<T, E>;

impl SyncError {
    /// Wrap an I/O error, turning `NotFound` into the engine's own variant.
    pub fn from_io_error(err: io::Error, operation: &'static str, path: &Path) -> Self {
        if err.kind() == io::ErrorKind::NotFound {
            return SyncError::NotFound {
                path: path.display().to_string(),
            };
        }
        SyncError::Io {
            path: path.to_path_buf(),
            operation,
            source: err,
        }
    }

    /// Map an OpenDAL error for `path` onto the engine taxonomy.
    pub fn from_storage(err: opendal::Error, path: &str) -> Self {
        match err.kind() {
            opendal::ErrorKind::NotFound => SyncError::NotFound {
                path: path.to_string(),
            },
            _ => SyncError::TransportFault {
                path: path.to_string(),
                message: err.to_string(),
            },
        }
    }

    pub fn is_not_found(&self) -> bool {
        matches!(self, SyncError::NotFound { .. })
    }

    /// Errors that must stop the run regardless of the failure policy.
    pub fn is_fatal(&self) -> bool {
        matches!(self, SyncError::UserAborted)
    }
}
