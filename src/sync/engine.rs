//! Sync engine for local/remote tree synchronization.
//!
//! One run takes two fresh snapshots, turns them into a plan per
//! direction and hands both plans to the applier. Nothing is kept
//! between runs.

use serde::Deserialize;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tokio::sync::mpsc::Sender;
use tracing::{info, warn};

use crate::error::{Result, SyncError};
use crate::fs::{LocalFs, RemoteStore};
use crate::sync::apply::{ApplyStats, FailurePolicy, SyncApplier, SyncProgress, UploadPolicy};
use crate::sync::confirm::Confirm;
use crate::sync::diff::{conflicts, diff, SyncPlan, SyncPolicy};
use crate::sync::enumerate::{enumerate_local, enumerate_remote, Enumerated};
use crate::sync::exclude::ExcludePatterns;
use crate::sync::snapshot::TreeSnapshot;

/// Which side is brought in line with the other.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize, clap::ValueEnum)]
#[serde(rename_all = "lowercase")]
pub enum SyncTarget {
    /// Remote is the origin; the local tree changes.
    #[default]
    Local,
    /// Local is the origin; the remote tree changes.
    Disk,
    /// Files missing on either side are copied over; nothing is deleted
    /// and differing files are only reported.
    Both,
}

/// Inputs of one run. Fixed once the run starts.
#[derive(Debug, Clone)]
pub struct RunOptions {
    pub local_root: PathBuf,
    pub remote_root: String,
    pub target: SyncTarget,
    pub delete_allowed: bool,
    pub dry_run: bool,
    pub upload_policy: UploadPolicy,
    pub failure_policy: FailurePolicy,
    pub excludes: ExcludePatterns,
}

impl RunOptions {
    pub fn new(local_root: impl Into<PathBuf>, remote_root: impl Into<String>) -> Self {
        Self {
            local_root: local_root.into(),
            remote_root: remote_root.into(),
            target: SyncTarget::default(),
            delete_allowed: false,
            dry_run: false,
            upload_policy: UploadPolicy::default(),
            failure_policy: FailurePolicy::default(),
            excludes: ExcludePatterns::new(),
        }
    }
}

/// What a run found and did.
#[derive(Debug, Clone, Default)]
pub struct SyncReport {
    pub local_files: usize,
    pub remote_files: usize,
    /// Entries neither side could classify, as relative paths.
    pub skipped_entries: Vec<String>,
    pub into_local: SyncPlan,
    pub into_remote: SyncPlan,
    /// Paths whose content differs on both sides (`both` target only).
    pub conflicts: Vec<String>,
    pub stats: ApplyStats,
    pub dry_run: bool,
}

impl SyncReport {
    pub fn is_in_sync(&self) -> bool {
        self.into_local.is_empty() && self.into_remote.is_empty() && self.conflicts.is_empty()
    }

    /// `PartialFailure` when a best-effort apply left failed entries behind.
    pub fn check(&self) -> Result<()> {
        if self.stats.failed > 0 {
            return Err(SyncError::PartialFailure {
                failed: self.stats.failed,
                total: self.into_local.len() + self.into_remote.len(),
            });
        }
        Ok(())
    }
}

/// Plans for both directions plus detected conflicts.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PlannedSync {
    pub into_local: SyncPlan,
    pub into_remote: SyncPlan,
    pub conflicts: Vec<String>,
}

/// Build the two plans for a target.
pub fn plan(
    local: &TreeSnapshot,
    remote: &TreeSnapshot,
    target: SyncTarget,
    delete_allowed: bool,
) -> PlannedSync {
    match target {
        SyncTarget::Local => PlannedSync {
            into_local: diff(remote, local, SyncPolicy::mirror(delete_allowed)),
            into_remote: diff(local, remote, SyncPolicy::NONE),
            conflicts: Vec::new(),
        },
        SyncTarget::Disk => PlannedSync {
            into_local: diff(remote, local, SyncPolicy::NONE),
            into_remote: diff(local, remote, SyncPolicy::mirror(delete_allowed)),
            conflicts: Vec::new(),
        },
        SyncTarget::Both => PlannedSync {
            into_local: diff(remote, local, SyncPolicy::add_only()),
            into_remote: diff(local, remote, SyncPolicy::add_only()),
            conflicts: conflicts(local, remote),
        },
    }
}

/// Orchestrates enumeration, planning and apply for one run.
pub struct SyncEngine {
    store: Arc<dyn RemoteStore>,
    confirm: Arc<dyn Confirm>,
    options: RunOptions,
    progress_tx: Option<Sender<SyncProgress>>,
}

impl SyncEngine {
    pub fn new(store: Arc<dyn RemoteStore>, confirm: Arc<dyn Confirm>, options: RunOptions) -> Self {
        Self {
            store,
            confirm,
            options,
            progress_tx: None,
        }
    }

    /// Create a sync engine with progress reporting.
    pub fn with_progress(
        store: Arc<dyn RemoteStore>,
        confirm: Arc<dyn Confirm>,
        options: RunOptions,
        progress_tx: Sender<SyncProgress>,
    ) -> Self {
        let mut engine = Self::new(store, confirm, options);
        engine.progress_tx = Some(progress_tx);
        engine
    }

    /// Perform a sync run.
    ///
    /// A best-effort apply that leaves failures behind still returns the
    /// report; `SyncReport::check` turns it into `PartialFailure`.
    pub async fn run(&self) -> Result<SyncReport> {
        let options = &self.options;
        LocalFs::prepare_root(&options.local_root)?;

        if options.target == SyncTarget::Both && options.delete_allowed {
            warn!("Deletes are never applied with target 'both', ignoring --delete");
        }

        let (local, remote) = self.enumerate().await?;
        let local_snapshot = local.snapshot.without_excluded(&options.excludes);
        let remote_snapshot = remote.snapshot.without_excluded(&options.excludes);
        info!(
            "Found {} local and {} remote files",
            local_snapshot.len(),
            remote_snapshot.len()
        );

        let planned = plan(
            &local_snapshot,
            &remote_snapshot,
            options.target,
            options.delete_allowed,
        );
        self.log_plan(&planned);

        let mut skipped_entries = local.skipped;
        skipped_entries.extend(remote.skipped);

        let mut report = SyncReport {
            local_files: local_snapshot.len(),
            remote_files: remote_snapshot.len(),
            skipped_entries,
            into_local: planned.into_local,
            into_remote: planned.into_remote,
            conflicts: planned.conflicts,
            stats: ApplyStats::default(),
            dry_run: options.dry_run,
        };

        if report.into_local.is_empty() && report.into_remote.is_empty() {
            info!("Nothing to do");
            return Ok(report);
        }
        if options.dry_run {
            info!("Dry run, no changes made");
            return Ok(report);
        }

        let total = report.into_local.len() + report.into_remote.len();
        if !self.confirm.confirm(&format!("Apply {} operations?", total)) {
            return Err(SyncError::UserAborted);
        }

        let mut applier = SyncApplier::new(
            self.store.as_ref(),
            &options.local_root,
            &options.remote_root,
            self.confirm.as_ref(),
        )
        .with_upload_policy(options.upload_policy)
        .with_failure_policy(options.failure_policy)
        .with_progress(self.progress_tx.clone());

        let outcome = applier.apply(&report.into_local, &report.into_remote).await;
        report.stats = applier.stats().clone();
        match outcome {
            Ok(_) => Ok(report),
            Err(SyncError::PartialFailure { failed, total }) => {
                warn!("{} of {} operations failed", failed, total);
                Ok(report)
            }
            Err(err) => Err(err),
        }
    }

    /// Both full enumerations, run concurrently. Either failing fails the run.
    async fn enumerate(&self) -> Result<(Enumerated, Enumerated)> {
        let local_root = self.options.local_root.clone();
        let local = async move {
            let root = local_root.clone();
            tokio::task::spawn_blocking(move || enumerate_local(&root))
                .await
                .map_err(|err| join_error(err, &local_root))?
        };
        let remote = enumerate_remote(self.store.as_ref(), &self.options.remote_root);

        tokio::try_join!(local, remote)
    }

    fn log_plan(&self, planned: &PlannedSync) {
        log_direction("Not in local", &planned.into_local);
        log_direction("Not in remote", &planned.into_remote);
        for path in &planned.conflicts {
            warn!("Conflict: {} differs on both sides, left untouched", path);
        }
    }
}

fn log_direction(header: &str, plan: &SyncPlan) {
    if plan.is_empty() {
        return;
    }
    info!("{}:", header);
    for operation in plan {
        info!("  {}", operation);
    }
}

fn join_error(err: tokio::task::JoinError, root: &Path) -> SyncError {
    SyncError::Io {
        path: root.to_path_buf(),
        operation: "enumerating",
        source: std::io::Error::other(err),
    }
}
