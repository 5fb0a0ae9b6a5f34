use async_trait::async_trait;
use std::path::Path;

use crate::error::Result;
use crate::fs::types::RemoteEntry;

/// Backend type information for display and identification
#[derive(Debug, Clone, PartialEq)]
pub enum BackendType {
    S3 { bucket: String, region: String },
    Gcs { bucket: String },
    Webdav { endpoint: String },
    Fs { root: String },
    Memory,
}

impl BackendType {
    /// Get a short display name for the backend
    pub fn short_name(&self) -> &'static str {
        match self {
            BackendType::S3 { .. } => "S3",
            BackendType::Gcs { .. } => "GCS",
            BackendType::Webdav { .. } => "WebDAV",
            BackendType::Fs { .. } => "FS",
            BackendType::Memory => "Memory",
        }
    }
}

/// Remote storage collaborator consumed by the sync engine.
///
/// Paths are remote paths as the user wrote them (`/backup/a.txt`);
/// implementations translate them to their own addressing. Every call may
/// fail with `SyncError::NotFound` or `SyncError::TransportFault`.
/// Retrying, authentication and chunking are the implementation's business.
#[async_trait]
pub trait RemoteStore: Send + Sync {
    // ========== Core Operations ==========

    /// List the direct children of a directory.
    async fn list_dir(&self, path: &str) -> Result<Vec<RemoteEntry>>;

    /// Whether a file or directory exists at `path`.
    async fn exists(&self, path: &str) -> Result<bool>;

    /// Create a single directory. Its parent must already exist.
    async fn create_dir(&self, path: &str) -> Result<()>;

    /// Delete a file.
    async fn delete(&self, path: &str) -> Result<()>;

    // ========== File Transfer ==========

    /// Upload a local file, replacing whatever is at `remote_path`.
    async fn upload(&self, local_path: &Path, remote_path: &str) -> Result<()>;

    /// Download a remote file to a local path whose parent exists.
    async fn download(&self, remote_path: &str, local_path: &Path) -> Result<()>;

    /// Read file contents as bytes (used to fingerprint unhashed entries).
    async fn read_bytes(&self, path: &str) -> Result<Vec<u8>>;

    // ========== Backend Info ==========

    /// Get the backend type
    fn backend_type(&self) -> BackendType;

    /// Get display path for a remote location
    fn display_path(&self, path: &str) -> String {
        format!("remote:{}", path)
    }
}
