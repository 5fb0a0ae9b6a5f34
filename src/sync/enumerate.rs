//! Tree enumeration for both sides of a sync.
//!
//! Both walkers keep an explicit stack of directories still to read and a
//! queue of files already seen, handing out one `FileRecord` at a time.
//! They are single pass: once exhausted, or after the first fatal error,
//! they yield nothing more. Entries that are neither files nor
//! directories are logged, remembered in `skipped()` and otherwise
//! ignored.

use futures::Stream;
use std::collections::VecDeque;
use std::fs;
use std::path::{Path, PathBuf};
use tracing::{debug, warn};

use crate::error::{Result, SyncError};
use crate::fs::path_utils::{child_key, join_remote, local_path};
use crate::fs::{EntryKind, RemoteStore};
use crate::sync::hash::{hash_bytes, hash_file};
use crate::sync::snapshot::{FileRecord, TreeSnapshot};

/// A materialized enumeration.
#[derive(Debug, Clone, Default)]
pub struct Enumerated {
    pub snapshot: TreeSnapshot,
    /// Relative paths that could not be classified.
    pub skipped: Vec<String>,
}

/// Lazy walk over a local directory tree.
pub struct LocalWalk {
    root: PathBuf,
    pending: Vec<String>,
    ready: VecDeque<(String, PathBuf)>,
    skipped: Vec<String>,
    done: bool,
}

impl LocalWalk {
    /// Start a walk at `root`. Fails with `NotFound` if the root is missing.
    pub fn new(root: &Path) -> Result<Self> {
        let meta = fs::metadata(root).map_err(|e| SyncError::from_io_error(e, "reading", root))?;
        if !meta.is_dir() {
            return Err(SyncError::NotFound {
                path: root.display().to_string(),
            });
        }

        Ok(Self {
            root: root.to_path_buf(),
            pending: vec![String::new()],
            ready: VecDeque::new(),
            skipped: Vec::new(),
            done: false,
        })
    }

    pub fn skipped(&self) -> &[String] {
        &self.skipped
    }

    fn read_dir(&mut self, relative: &str) -> Result<()> {
        let dir = local_path(&self.root, relative);
        debug!("Processing {}", dir.display());

        let read_dir = fs::read_dir(&dir).map_err(|e| SyncError::from_io_error(e, "listing", &dir))?;
        let mut entries = Vec::new();
        for entry in read_dir {
            entries.push(entry.map_err(|e| SyncError::from_io_error(e, "listing", &dir))?);
        }
        entries.sort_by_key(|entry| entry.file_name());

        let mut subdirs = Vec::new();
        for entry in entries {
            let name = match entry.file_name().into_string() {
                Ok(name) => name,
                Err(raw) => {
                    let key = child_key(relative, &raw.to_string_lossy());
                    skip_entry(&mut self.skipped, key, "non-UTF-8 name".to_string());
                    continue;
                }
            };
            let key = child_key(relative, &name);
            let file_type = entry
                .file_type()
                .map_err(|e| SyncError::from_io_error(e, "inspecting", &entry.path()))?;

            if file_type.is_file() {
                self.ready.push_back((key, entry.path()));
            } else if file_type.is_dir() {
                subdirs.push(key);
            } else {
                let kind = if file_type.is_symlink() {
                    "symlink"
                } else {
                    "special file"
                };
                skip_entry(&mut self.skipped, key, kind.to_string());
            }
        }

        // Reversed so the stack pops subdirectories in name order
        self.pending.extend(subdirs.into_iter().rev());
        Ok(())
    }
}

impl Iterator for LocalWalk {
    type Item = Result<FileRecord>;

    fn next(&mut self) -> Option<Self::Item> {
        loop {
            if self.done {
                return None;
            }

            if let Some((key, path)) = self.ready.pop_front() {
                let record = hash_file(&path).map(|hash| FileRecord::new(key, hash));
                if record.is_err() {
                    self.done = true;
                }
                return Some(record);
            }

            let Some(relative) = self.pending.pop() else {
                self.done = true;
                return None;
            };
            if let Err(err) = self.read_dir(&relative) {
                self.done = true;
                return Some(Err(err));
            }
        }
    }
}

/// Lazy walk over a remote directory tree.
pub struct RemoteWalk<'a> {
    store: &'a dyn RemoteStore,
    root: String,
    pending: Vec<String>,
    ready: VecDeque<(String, Option<String>)>,
    skipped: Vec<String>,
    done: bool,
}

impl<'a> RemoteWalk<'a> {
    pub fn new(store: &'a dyn RemoteStore, root: &str) -> Self {
        Self {
            store,
            root: root.to_string(),
            pending: vec![String::new()],
            ready: VecDeque::new(),
            skipped: Vec::new(),
            done: false,
        }
    }

    pub fn skipped(&self) -> &[String] {
        &self.skipped
    }

    /// Produce the next record. The root listing happens on the first call,
    /// so a missing root surfaces as `NotFound` before any record.
    pub async fn next_record(&mut self) -> Option<Result<FileRecord>> {
        loop {
            if self.done {
                return None;
            }

            if let Some((key, reported)) = self.ready.pop_front() {
                let record = match reported {
                    Some(hash) => Ok(FileRecord::new(key, hash)),
                    None => self
                        .fingerprint(&key)
                        .await
                        .map(|hash| FileRecord::new(key, hash)),
                };
                if record.is_err() {
                    self.done = true;
                }
                return Some(record);
            }

            let Some(relative) = self.pending.pop() else {
                self.done = true;
                return None;
            };
            if let Err(err) = self.read_dir(&relative).await {
                self.done = true;
                return Some(Err(err));
            }
        }
    }

    /// Adapt the walk into a `Stream` of records.
    pub fn into_stream(self) -> impl Stream<Item = Result<FileRecord>> + Send + 'a {
        futures::stream::unfold(self, |mut walk| async move {
            let item = walk.next_record().await?;
            Some((item, walk))
        })
    }

    async fn read_dir(&mut self, relative: &str) -> Result<()> {
        let dir = join_remote(&self.root, relative);
        debug!("Processing {}", self.store.display_path(&dir));

        let mut entries = self.store.list_dir(&dir).await?;
        entries.sort_by(|a, b| a.name.cmp(&b.name));

        let mut subdirs = Vec::new();
        for entry in entries {
            let key = child_key(relative, &entry.name);
            match entry.kind {
                EntryKind::File => {
                    debug!("{} ({})", key, entry.format_size());
                    let hash = entry.hash.map(|h| h.to_ascii_lowercase());
                    self.ready.push_back((key, hash));
                }
                EntryKind::Dir => subdirs.push(key),
                EntryKind::Other(kind) => skip_entry(&mut self.skipped, key, kind),
            }
        }

        self.pending.extend(subdirs.into_iter().rev());
        Ok(())
    }

    /// Hash the content of a file whose listing carried no hash.
    async fn fingerprint(&self, key: &str) -> Result<String> {
        let path = join_remote(&self.root, key);
        debug!("No reported hash for {}, fetching content", path);
        let data = self.store.read_bytes(&path).await?;
        Ok(hash_bytes(&data))
    }
}

/// Log an unclassifiable entry and remember it; the walk goes on.
fn skip_entry(skipped: &mut Vec<String>, path: String, kind: String) {
    let err = SyncError::UnknownEntryKind { path, kind };
    warn!("{}, skipping", err);
    if let SyncError::UnknownEntryKind { path, .. } = err {
        skipped.push(path);
    }
}

/// Walk a local tree to completion on the current thread.
pub fn enumerate_local(root: &Path) -> Result<Enumerated> {
    let mut walk = LocalWalk::new(root)?;
    let mut records = Vec::new();
    for record in walk.by_ref() {
        records.push(record?);
    }

    Ok(Enumerated {
        snapshot: records.into_iter().collect(),
        skipped: walk.skipped().to_vec(),
    })
}

/// Walk a remote tree to completion.
pub async fn enumerate_remote(store: &dyn RemoteStore, root: &str) -> Result<Enumerated> {
    let mut walk = RemoteWalk::new(store, root);
    let mut records = Vec::new();
    while let Some(record) = walk.next_record().await {
        records.push(record?);
    }

    Ok(Enumerated {
        snapshot: records.into_iter().collect(),
        skipped: walk.skipped().to_vec(),
    })
}
