use async_trait::async_trait;
use opendal::{services, EntryMode, ErrorKind, Operator};
use std::path::Path;
use tracing::debug;

use crate::config::RemoteConfig;
use crate::error::{Result, SyncError};
use crate::fs::backend::{BackendType, RemoteStore};
use crate::fs::types::{EntryKind, RemoteEntry};
use crate::sync::hash::normalize_reported_hash;

/// Remote storage backed by an OpenDAL operator.
pub struct OpendalStore {
    operator: Operator,
    backend: BackendType,
}

impl OpendalStore {
    /// Wrap an already configured operator.
    pub fn new(operator: Operator, backend: BackendType) -> Self {
        Self { operator, backend }
    }

    /// Build the operator described by the `[remote]` config table.
    pub fn from_config(config: &RemoteConfig) -> Result<Self> {
        let storage_err = |err: opendal::Error| SyncError::Config(err.to_string());

        match config {
            RemoteConfig::S3 {
                bucket,
                region,
                endpoint,
                access_key_id,
                secret_access_key,
                root,
            } => {
                let mut builder = services::S3::default().bucket(bucket).region(region);
                if let Some(endpoint) = endpoint {
                    builder = builder.endpoint(endpoint);
                }
                // Without explicit keys OpenDAL falls back to the AWS credential chain
                if let (Some(key), Some(secret)) = (access_key_id, secret_access_key) {
                    builder = builder.access_key_id(key).secret_access_key(secret);
                }
                if let Some(root) = root {
                    builder = builder.root(root);
                }
                let operator = Operator::new(builder).map_err(storage_err)?.finish();
                Ok(Self::new(
                    operator,
                    BackendType::S3 {
                        bucket: bucket.clone(),
                        region: region.clone(),
                    },
                ))
            }
            RemoteConfig::Gcs {
                bucket,
                credential_path,
                root,
            } => {
                let mut builder = services::Gcs::default().bucket(bucket);
                if let Some(path) = credential_path {
                    builder = builder.credential_path(path);
                }
                if let Some(root) = root {
                    builder = builder.root(root);
                }
                let operator = Operator::new(builder).map_err(storage_err)?.finish();
                Ok(Self::new(
                    operator,
                    BackendType::Gcs {
                        bucket: bucket.clone(),
                    },
                ))
            }
            RemoteConfig::Webdav {
                endpoint,
                username,
                password,
                root,
            } => {
                let mut builder = services::Webdav::default().endpoint(endpoint);
                if let Some(username) = username {
                    builder = builder.username(username);
                }
                if let Some(password) = password {
                    builder = builder.password(password);
                }
                if let Some(root) = root {
                    builder = builder.root(root);
                }
                let operator = Operator::new(builder).map_err(storage_err)?.finish();
                Ok(Self::new(
                    operator,
                    BackendType::Webdav {
                        endpoint: endpoint.clone(),
                    },
                ))
            }
            RemoteConfig::Fs { root } => {
                let builder = services::Fs::default().root(root);
                let operator = Operator::new(builder).map_err(storage_err)?.finish();
                Ok(Self::new(operator, BackendType::Fs { root: root.clone() }))
            }
            RemoteConfig::Memory => {
                let operator = Operator::new(services::Memory::default())
                    .map_err(storage_err)?
                    .finish();
                Ok(Self::new(operator, BackendType::Memory))
            }
        }
    }

    /// OpenDAL addresses objects relative to its root, without a leading slash.
    fn object_key(path: &str) -> &str {
        path.trim_start_matches('/')
    }

    fn dir_key(path: &str) -> String {
        let key = Self::object_key(path).trim_end_matches('/');
        if key.is_empty() {
            "/".to_string()
        } else {
            format!("{}/", key)
        }
    }

    async fn stat_exists(&self, key: &str, path: &str) -> Result<bool> {
        match self.operator.stat(key).await {
            Ok(_) => Ok(true),
            Err(err) if err.kind() == ErrorKind::NotFound => Ok(false),
            Err(err) => Err(SyncError::from_storage(err, path)),
        }
    }
}

#[async_trait]
impl RemoteStore for OpendalStore {
    async fn list_dir(&self, path: &str) -> Result<Vec<RemoteEntry>> {
        let dir = Self::dir_key(path);
        let entries = self
            .operator
            .list(&dir)
            .await
            .map_err(|err| SyncError::from_storage(err, path))?;

        // Existing directories list at least their own marker
        if entries.is_empty() && dir != "/" {
            return Err(SyncError::NotFound {
                path: path.to_string(),
            });
        }

        let mut result = Vec::with_capacity(entries.len());
        for entry in entries {
            // Listings include the directory itself
            if entry.path() == dir || entry.name().is_empty() || entry.name() == "/" {
                continue;
            }

            let name = entry.name().trim_end_matches('/').to_string();
            let meta = entry.metadata();
            let kind = match meta.mode() {
                EntryMode::FILE => EntryKind::File,
                EntryMode::DIR => EntryKind::Dir,
                other => EntryKind::Other(format!("{:?}", other)),
            };
            let hash = normalize_reported_hash(meta.content_md5(), meta.etag());

            result.push(RemoteEntry {
                name,
                kind,
                hash,
                size: meta.content_length(),
            });
        }

        debug!("Listed {} entries in {}", result.len(), self.display_path(path));
        Ok(result)
    }

    async fn exists(&self, path: &str) -> Result<bool> {
        let key = Self::object_key(path).trim_end_matches('/');
        if key.is_empty() {
            return Ok(true);
        }
        if self.stat_exists(key, path).await? {
            return Ok(true);
        }
        // Prefix stores answer stat on any "dir/" key, so probe by listing
        match self.operator.list(&Self::dir_key(path)).await {
            Ok(entries) => Ok(!entries.is_empty()),
            Err(err) if err.kind() == ErrorKind::NotFound => Ok(false),
            Err(err) => Err(SyncError::from_storage(err, path)),
        }
    }

    async fn create_dir(&self, path: &str) -> Result<()> {
        self.operator
            .create_dir(&Self::dir_key(path))
            .await
            .map_err(|err| SyncError::from_storage(err, path))
    }

    async fn delete(&self, path: &str) -> Result<()> {
        self.operator
            .delete(Self::object_key(path))
            .await
            .map_err(|err| SyncError::from_storage(err, path))
    }

    async fn upload(&self, local_path: &Path, remote_path: &str) -> Result<()> {
        let content = tokio::fs::read(local_path)
            .await
            .map_err(|err| SyncError::from_io_error(err, "reading", local_path))?;

        self.operator
            .write(Self::object_key(remote_path), content)
            .await
            .map_err(|err| SyncError::from_storage(err, remote_path))?;
        Ok(())
    }

    async fn download(&self, remote_path: &str, local_path: &Path) -> Result<()> {
        let content = self.read_bytes(remote_path).await?;
        tokio::fs::write(local_path, content)
            .await
            .map_err(|err| SyncError::from_io_error(err, "writing", local_path))
    }

    async fn read_bytes(&self, path: &str) -> Result<Vec<u8>> {
        let content = self
            .operator
            .read(Self::object_key(path))
            .await
            .map_err(|err| SyncError::from_storage(err, path))?;
        Ok(content.to_vec())
    }

    fn backend_type(&self) -> BackendType {
        self.backend.clone()
    }

    fn display_path(&self, path: &str) -> String {
        match &self.backend {
            BackendType::S3 { bucket, .. } => {
                format!("s3://{}/{}", bucket, Self::object_key(path))
            }
            BackendType::Gcs { bucket } => {
                format!("gs://{}/{}", bucket, Self::object_key(path))
            }
            _ => format!("{}:{}", self.backend.short_name().to_lowercase(), path),
        }
    }
}
