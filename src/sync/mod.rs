//! Synchronization core.
//!
//! Enumerate both trees, diff them into plans, apply the plans.

pub mod ancestors;
pub mod apply;
pub mod confirm;
pub mod diff;
pub mod engine;
pub mod enumerate;
pub mod exclude;
pub mod hash;
pub mod snapshot;

pub use ancestors::{creation_order, resolve_missing_ancestors};
pub use apply::{ApplyPass, ApplyStats, FailurePolicy, SyncApplier, SyncProgress, UploadPolicy};
pub use confirm::{AssumeYes, Confirm, StdinConfirm};
pub use diff::{conflicts, diff, SyncKind, SyncOperation, SyncPlan, SyncPolicy};
pub use engine::{plan, PlannedSync, RunOptions, SyncEngine, SyncReport, SyncTarget};
pub use enumerate::{enumerate_local, enumerate_remote, Enumerated, LocalWalk, RemoteWalk};
pub use exclude::ExcludePatterns;
pub use hash::{hash_bytes, hash_file};
pub use snapshot::{FileRecord, TreeSnapshot};
