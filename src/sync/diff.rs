//! Plan computation between two snapshots.
//!
//! `diff` decides what has to happen to `target` so it matches `origin`
//! under a policy. It never looks at the file system; both snapshots are
//! taken before any plan is built.

use std::fmt;

use crate::sync::snapshot::TreeSnapshot;

/// What a plan entry does to the target side.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SyncKind {
    /// Path missing from the target; copy it over.
    Add,
    /// Path present on both sides with different content; copy it over.
    Change,
    /// Path only present in the target; remove it.
    Delete,
}

impl SyncKind {
    /// Marker used in plan previews.
    pub fn as_one_char(&self) -> char {
        match self {
            SyncKind::Add => '+',
            SyncKind::Change => '*',
            SyncKind::Delete => '-',
        }
    }

    pub fn is_copy(&self) -> bool {
        matches!(self, SyncKind::Add | SyncKind::Change)
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SyncOperation {
    pub kind: SyncKind,
    pub relative_path: String,
}

impl SyncOperation {
    pub fn new(kind: SyncKind, relative_path: impl Into<String>) -> Self {
        Self {
            kind,
            relative_path: relative_path.into(),
        }
    }

    pub fn add(relative_path: impl Into<String>) -> Self {
        Self::new(SyncKind::Add, relative_path)
    }

    pub fn change(relative_path: impl Into<String>) -> Self {
        Self::new(SyncKind::Change, relative_path)
    }

    pub fn delete(relative_path: impl Into<String>) -> Self {
        Self::new(SyncKind::Delete, relative_path)
    }
}

impl fmt::Display for SyncOperation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} {}", self.kind.as_one_char(), self.relative_path)
    }
}

/// Ordered operations for one direction.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SyncPlan {
    operations: Vec<SyncOperation>,
}

impl SyncPlan {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, operation: SyncOperation) {
        self.operations.push(operation);
    }

    pub fn operations(&self) -> &[SyncOperation] {
        &self.operations
    }

    pub fn iter(&self) -> std::slice::Iter<'_, SyncOperation> {
        self.operations.iter()
    }

    pub fn len(&self) -> usize {
        self.operations.len()
    }

    pub fn is_empty(&self) -> bool {
        self.operations.is_empty()
    }

    /// Number of entries of one kind.
    pub fn count(&self, kind: SyncKind) -> usize {
        self.operations.iter().filter(|op| op.kind == kind).count()
    }

    /// Copies first, then deletes, each group keeping plan order.
    pub fn partition(&self) -> (Vec<&SyncOperation>, Vec<&SyncOperation>) {
        self.operations.iter().partition(|op| op.kind.is_copy())
    }
}

impl FromIterator<SyncOperation> for SyncPlan {
    fn from_iter<I: IntoIterator<Item = SyncOperation>>(iter: I) -> Self {
        Self {
            operations: iter.into_iter().collect(),
        }
    }
}

impl<'a> IntoIterator for &'a SyncPlan {
    type Item = &'a SyncOperation;
    type IntoIter = std::slice::Iter<'a, SyncOperation>;

    fn into_iter(self) -> Self::IntoIter {
        self.operations.iter()
    }
}

/// Which kinds of operation a diff may emit.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct SyncPolicy {
    pub can_add: bool,
    pub can_change: bool,
    pub can_delete: bool,
}

impl SyncPolicy {
    /// Emits nothing.
    pub const NONE: SyncPolicy = SyncPolicy {
        can_add: false,
        can_change: false,
        can_delete: false,
    };

    /// Policy for the direction that targets the chosen side.
    pub fn mirror(delete_allowed: bool) -> Self {
        Self {
            can_add: true,
            can_change: true,
            can_delete: delete_allowed,
        }
    }

    pub fn add_only() -> Self {
        Self {
            can_add: true,
            ..Self::NONE
        }
    }
}

/// Compute the operations that bring `target` in line with `origin`.
pub fn diff(origin: &TreeSnapshot, target: &TreeSnapshot, policy: SyncPolicy) -> SyncPlan {
    let mut plan = SyncPlan::new();

    for (path, record) in origin.iter() {
        match target.get(path) {
            None => {
                if policy.can_add {
                    plan.push(SyncOperation::add(path));
                }
            }
            Some(existing) => {
                if policy.can_change
                    && existing.content_fingerprint != record.content_fingerprint
                {
                    plan.push(SyncOperation::change(path));
                }
            }
        }
    }

    if policy.can_delete {
        for (path, _) in target.iter() {
            if !origin.contains(path) {
                plan.push(SyncOperation::delete(path));
            }
        }
    }

    plan
}

/// Paths present on both sides whose content differs.
pub fn conflicts(a: &TreeSnapshot, b: &TreeSnapshot) -> Vec<String> {
    a.iter()
        .filter_map(|(path, record)| {
            let other = b.get(path)?;
            (other.content_fingerprint != record.content_fingerprint).then(|| path.to_string())
        })
        .collect()
}
