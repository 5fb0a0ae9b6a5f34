//! File records and the tree snapshots built from them.

use std::collections::BTreeMap;

use crate::sync::exclude::ExcludePatterns;

/// One regular file found by an enumeration.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FileRecord {
    /// Forward-slash path relative to the enumeration root, no leading slash.
    pub relative_path: String,
    /// Content hash; equal strings mean equal content.
    pub content_fingerprint: String,
}

impl FileRecord {
    pub fn new(relative_path: impl Into<String>, content_fingerprint: impl Into<String>) -> Self {
        Self {
            relative_path: relative_path.into(),
            content_fingerprint: content_fingerprint.into(),
        }
    }
}

/// Every file of one tree at the time it was walked, keyed by relative path.
///
/// Built once per run and never updated afterwards. Iteration is in path
/// order, which keeps generated plans deterministic.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TreeSnapshot {
    records: BTreeMap<String, FileRecord>,
}

impl TreeSnapshot {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get(&self, path: &str) -> Option<&FileRecord> {
        self.records.get(path)
    }

    pub fn contains(&self, path: &str) -> bool {
        self.records.contains_key(path)
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &FileRecord)> {
        self.records.iter().map(|(path, record)| (path.as_str(), record))
    }

    /// A copy of this snapshot without the excluded paths.
    pub fn without_excluded(&self, excludes: &ExcludePatterns) -> Self {
        self.records
            .values()
            .filter(|record| !excludes.is_excluded(&record.relative_path))
            .cloned()
            .collect()
    }
}

impl FromIterator<FileRecord> for TreeSnapshot {
    fn from_iter<I: IntoIterator<Item = FileRecord>>(iter: I) -> Self {
        let records = iter
            .into_iter()
            .map(|record| (record.relative_path.clone(), record))
            .collect();
        Self { records }
    }
}
