//! Exclude pattern matching for sync operations.
//!
//! Excluded paths are dropped from both snapshots before diffing, so they
//! are never copied and never deleted.

use globset::{Glob, GlobSet, GlobSetBuilder};

use crate::error::{Result, SyncError};

/// Patterns applied when `default_excludes` is enabled.
pub const DEFAULT_EXCLUDES: &[&str] = &[
    // Version control
    ".git",
    ".git/**",
    ".svn",
    ".svn/**",
    ".hg",
    ".hg/**",

    // OS-specific
    ".DS_Store",
    "Thumbs.db",
    "desktop.ini",

    // Editor swap files
    "*.swp",
    "*.swo",
    "*~",
];

/// Pattern matching for file exclusion.
#[derive(Debug, Clone)]
pub struct ExcludePatterns {
    /// Compiled glob set for matching.
    glob_set: GlobSet,
    /// Raw pattern strings (for display).
    patterns: Vec<String>,
}

impl Default for ExcludePatterns {
    fn default() -> Self {
        Self::new()
    }
}

impl ExcludePatterns {
    /// Create a new empty exclude pattern set.
    pub fn new() -> Self {
        Self {
            glob_set: GlobSet::empty(),
            patterns: Vec::new(),
        }
    }

    /// Create with default exclude patterns.
    pub fn with_defaults() -> Self {
        Self::from_patterns(DEFAULT_EXCLUDES).unwrap_or_default()
    }

    /// Create from a list of patterns.
    pub fn from_patterns<S: AsRef<str>>(patterns: &[S]) -> Result<Self> {
        let mut builder = GlobSetBuilder::new();
        let mut pattern_list = Vec::new();

        for pattern in patterns {
            let pattern = pattern.as_ref();
            let glob = Glob::new(pattern).map_err(|e| {
                SyncError::Config(format!("bad exclude pattern {:?}: {}", pattern, e))
            })?;
            builder.add(glob);
            pattern_list.push(pattern.to_string());
        }

        let glob_set = builder
            .build()
            .map_err(|e| SyncError::Config(format!("cannot compile exclude patterns: {}", e)))?;

        Ok(Self {
            glob_set,
            patterns: pattern_list,
        })
    }

    /// Check if a path should be excluded.
    pub fn is_excluded(&self, path: &str) -> bool {
        if self.patterns.is_empty() {
            return false;
        }

        // Whole relative path first
        if self.glob_set.is_match(path) {
            return true;
        }

        // Each path component, so "node_modules" also hides its contents
        path.split('/')
            .filter(|segment| !segment.is_empty())
            .any(|segment| self.glob_set.is_match(segment))
    }

    /// Get the list of patterns.
    pub fn patterns(&self) -> &[String] {
        &self.patterns
    }

    pub fn is_empty(&self) -> bool {
        self.patterns.is_empty()
    }

    /// Merge another exclude patterns set into this one.
    pub fn merge(&mut self, other: &ExcludePatterns) -> Result<()> {
        let mut combined = self.patterns.clone();
        for pattern in &other.patterns {
            if !combined.contains(pattern) {
                combined.push(pattern.clone());
            }
        }
        *self = Self::from_patterns(combined.as_slice())?;
        Ok(())
    }
}
