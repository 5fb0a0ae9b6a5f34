//! Replays two plans against the local tree and the remote store.
//!
//! The local pass runs to completion before the remote pass starts. In
//! each pass copies go first and deletes after, both in plan order.

use serde::Deserialize;
use std::collections::HashSet;
use std::path::{Path, PathBuf};
use tokio::sync::mpsc::Sender;
use tracing::{debug, info, warn};

use crate::error::{Result, SyncError};
use crate::fs::path_utils::{join_remote, local_path, parent_dir};
use crate::fs::{LocalFs, RemoteStore};
use crate::sync::ancestors::create_missing_ancestors;
use crate::sync::confirm::Confirm;
use crate::sync::diff::{SyncKind, SyncOperation, SyncPlan};

/// What a copy does when its destination already exists.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize, clap::ValueEnum)]
#[serde(rename_all = "kebab-case")]
pub enum UploadPolicy {
    /// Replace the destination.
    #[default]
    Overwrite,
    /// Leave the destination alone and count the entry as skipped.
    SkipExisting,
    /// Fail the entry with `AlreadyExists`.
    #[serde(rename = "error")]
    #[value(name = "error")]
    ErrorOnConflict,
}

/// What a failed entry does to the rest of the run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize, clap::ValueEnum)]
#[serde(rename_all = "kebab-case")]
pub enum FailurePolicy {
    /// Stop at the first failure, leaving earlier work in place.
    #[default]
    FailFast,
    /// Log the failure, carry on and report `PartialFailure` at the end.
    Continue,
}

/// Which side a pass writes to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ApplyPass {
    Local,
    Remote,
}

impl ApplyPass {
    fn label(&self) -> &'static str {
        match self {
            ApplyPass::Local => "local",
            ApplyPass::Remote => "remote",
        }
    }
}

/// Progress update sent before each entry and once at the end.
#[derive(Debug, Clone)]
pub struct SyncProgress {
    pub pass: ApplyPass,
    /// `None` on the final update.
    pub kind: Option<SyncKind>,
    pub current_file: String,
    pub files_done: usize,
    pub total_files: usize,
}

impl SyncProgress {
    /// Get progress as a fraction (0.0 - 1.0).
    pub fn percentage(&self) -> f32 {
        if self.total_files == 0 {
            return 1.0;
        }
        self.files_done as f32 / self.total_files as f32
    }

    pub fn is_complete(&self) -> bool {
        self.kind.is_none()
    }
}

/// Counters for one apply run.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ApplyStats {
    pub downloaded: usize,
    pub uploaded: usize,
    pub deleted_local: usize,
    pub deleted_remote: usize,
    pub dirs_created: usize,
    pub skipped: usize,
    pub failed: usize,
}

impl ApplyStats {
    pub fn total_changes(&self) -> usize {
        self.downloaded + self.uploaded + self.deleted_local + self.deleted_remote
    }
}

/// Outcome of one entry that did not fail.
enum Applied {
    Done,
    Skipped,
}

/// Executes sync plans. Holds the per-run directory cache and counters.
pub struct SyncApplier<'a> {
    store: &'a dyn RemoteStore,
    local_root: PathBuf,
    remote_root: String,
    confirm: &'a dyn Confirm,
    upload_policy: UploadPolicy,
    failure_policy: FailurePolicy,
    progress_tx: Option<Sender<SyncProgress>>,
    known_dirs: HashSet<String>,
    stats: ApplyStats,
    files_done: usize,
    total_files: usize,
}

impl<'a> SyncApplier<'a> {
    pub fn new(
        store: &'a dyn RemoteStore,
        local_root: &Path,
        remote_root: &str,
        confirm: &'a dyn Confirm,
    ) -> Self {
        Self {
            store,
            local_root: local_root.to_path_buf(),
            remote_root: remote_root.to_string(),
            confirm,
            upload_policy: UploadPolicy::default(),
            failure_policy: FailurePolicy::default(),
            progress_tx: None,
            known_dirs: HashSet::new(),
            stats: ApplyStats::default(),
            files_done: 0,
            total_files: 0,
        }
    }

    pub fn with_upload_policy(mut self, policy: UploadPolicy) -> Self {
        self.upload_policy = policy;
        self
    }

    pub fn with_failure_policy(mut self, policy: FailurePolicy) -> Self {
        self.failure_policy = policy;
        self
    }

    pub fn with_progress(mut self, progress_tx: Option<Sender<SyncProgress>>) -> Self {
        self.progress_tx = progress_tx;
        self
    }

    pub fn stats(&self) -> &ApplyStats {
        &self.stats
    }

    /// Apply `into_local`, then `into_remote`.
    ///
    /// With `FailFast` the first error is returned as is. With `Continue`
    /// failures are counted and reported as `PartialFailure` once both
    /// passes are done. A declined confirmation always stops the run.
    pub async fn apply(&mut self, into_local: &SyncPlan, into_remote: &SyncPlan) -> Result<ApplyStats> {
        self.total_files = into_local.len() + into_remote.len();
        self.files_done = 0;

        self.run_pass(ApplyPass::Local, into_local).await?;
        self.run_pass(ApplyPass::Remote, into_remote).await?;

        self.send_progress(ApplyPass::Remote, None, String::new()).await;

        if self.stats.failed > 0 {
            return Err(SyncError::PartialFailure {
                failed: self.stats.failed,
                total: self.total_files,
            });
        }
        Ok(self.stats.clone())
    }

    async fn run_pass(&mut self, pass: ApplyPass, plan: &SyncPlan) -> Result<()> {
        if plan.is_empty() {
            return Ok(());
        }
        info!("Applying {} operations to {}", plan.len(), pass.label());

        let (copies, deletes) = plan.partition();
        for operation in copies.into_iter().chain(deletes) {
            self.send_progress(pass, Some(operation.kind), operation.relative_path.clone())
                .await;

            let outcome = match pass {
                ApplyPass::Local => self.apply_local(operation).await,
                ApplyPass::Remote => self.apply_remote(operation).await,
            };
            self.files_done += 1;

            match outcome {
                Ok(Applied::Done) => {}
                Ok(Applied::Skipped) => self.stats.skipped += 1,
                Err(err) if err.is_fatal() || self.failure_policy == FailurePolicy::FailFast => {
                    return Err(err);
                }
                Err(err) => {
                    warn!("{} {} failed: {}", operation, pass.label(), err);
                    self.stats.failed += 1;
                }
            }
        }
        Ok(())
    }

    async fn apply_local(&mut self, operation: &SyncOperation) -> Result<Applied> {
        let destination = local_path(&self.local_root, &operation.relative_path);
        LocalFs::ensure_no_symlink(&self.local_root, &destination)?;

        if operation.kind == SyncKind::Delete {
            let prompt = format!("Delete local file {}?", destination.display());
            if !self.confirm.confirm(&prompt) {
                return Err(SyncError::UserAborted);
            }
            warn!("Deleting local file {}", destination.display());
            LocalFs::delete_file(&destination)?;
            self.stats.deleted_local += 1;
            return Ok(Applied::Done);
        }

        if LocalFs::exists(&destination) {
            match self.upload_policy {
                UploadPolicy::Overwrite => {}
                UploadPolicy::SkipExisting => {
                    debug!("Skipping existing {}", destination.display());
                    return Ok(Applied::Skipped);
                }
                UploadPolicy::ErrorOnConflict => {
                    return Err(SyncError::AlreadyExists {
                        path: destination.display().to_string(),
                    });
                }
            }
        }

        let source = join_remote(&self.remote_root, &operation.relative_path);
        info!(
            "Downloading {} -> {}",
            self.store.display_path(&source),
            destination.display()
        );
        LocalFs::create_parent_dirs(&destination)?;
        self.store.download(&source, &destination).await?;
        self.stats.downloaded += 1;
        Ok(Applied::Done)
    }

    async fn apply_remote(&mut self, operation: &SyncOperation) -> Result<Applied> {
        let destination = join_remote(&self.remote_root, &operation.relative_path);

        if operation.kind == SyncKind::Delete {
            let shown = self.store.display_path(&destination);
            if !self.confirm.confirm(&format!("Delete remote file {}?", shown)) {
                return Err(SyncError::UserAborted);
            }
            warn!("Deleting remote file {}", shown);
            self.store.delete(&destination).await?;
            self.stats.deleted_remote += 1;
            return Ok(Applied::Done);
        }

        if self.upload_policy != UploadPolicy::Overwrite && self.store.exists(&destination).await? {
            if self.upload_policy == UploadPolicy::SkipExisting {
                debug!("Skipping existing {}", self.store.display_path(&destination));
                return Ok(Applied::Skipped);
            }
            return Err(SyncError::AlreadyExists { path: destination });
        }

        if let Some(parent) = parent_dir(&destination) {
            self.stats.dirs_created +=
                create_missing_ancestors(self.store, parent, &mut self.known_dirs).await?;
        }

        let source = local_path(&self.local_root, &operation.relative_path);
        info!(
            "Uploading {} -> {}",
            source.display(),
            self.store.display_path(&destination)
        );
        self.store.upload(&source, &destination).await?;
        self.stats.uploaded += 1;
        Ok(Applied::Done)
    }

    async fn send_progress(&self, pass: ApplyPass, kind: Option<SyncKind>, current_file: String) {
        if let Some(ref tx) = self.progress_tx {
            let _ = tx
                .send(SyncProgress {
                    pass,
                    kind,
                    current_file,
                    files_done: self.files_done,
                    total_files: self.total_files,
                })
                .await;
        }
    }
}
