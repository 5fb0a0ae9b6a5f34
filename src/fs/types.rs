/// What a remote listing says an item is.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum EntryKind {
    File,
    Dir,
    /// Anything the store reports that is neither; carries the raw kind.
    Other(String),
}

/// One item of a remote directory listing.
#[derive(Debug, Clone)]
pub struct RemoteEntry {
    pub name: String,
    pub kind: EntryKind,
    /// Content hash as reported by the store, if it reports one.
    pub hash: Option<String>,
    pub size: u64,
}

impl RemoteEntry {
    pub fn file(name: impl Into<String>, hash: Option<String>, size: u64) -> Self {
        Self {
            name: name.into(),
            kind: EntryKind::File,
            hash,
            size,
        }
    }

    pub fn dir(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            kind: EntryKind::Dir,
            hash: None,
            size: 0,
        }
    }

    pub fn format_size(&self) -> String {
        if self.kind == EntryKind::Dir {
            return "<DIR>".to_string();
        }

        let size = self.size;
        if size < 1024 {
            format!("{} B", size)
        } else if size < 1024 * 1024 {
            format!("{:.1} KB", size as f64 / 1024.0)
        } else if size < 1024 * 1024 * 1024 {
            format!("{:.1} MB", size as f64 / (1024.0 * 1024.0))
        } else {
            format!("{:.1} GB", size as f64 / (1024.0 * 1024.0 * 1024.0))
        }
    }
}
