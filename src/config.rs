//! Configuration file discovery and merging with command line values.
//!
//! The file is TOML. It selects the remote backend in a `[remote]` table
//! and may carry defaults for run options; command line values win.

use anyhow::{bail, Context, Result};
use serde::Deserialize;
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use tracing::{debug, error, info, warn};

use crate::sync::{ExcludePatterns, FailurePolicy, RunOptions, SyncTarget, UploadPolicy};

pub const CONFIG_FILE_NAME: &str = "treesync.toml";

/// Remote backend selection, the `[remote]` table.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(tag = "kind", rename_all = "lowercase")]
pub enum RemoteConfig {
    S3 {
        bucket: String,
        #[serde(default = "default_region")]
        region: String,
        endpoint: Option<String>,
        access_key_id: Option<String>,
        secret_access_key: Option<String>,
        root: Option<String>,
    },
    Gcs {
        bucket: String,
        credential_path: Option<String>,
        root: Option<String>,
    },
    Webdav {
        endpoint: String,
        username: Option<String>,
        password: Option<String>,
        root: Option<String>,
    },
    Fs {
        root: String,
    },
    Memory,
}

fn default_region() -> String {
    "us-east-1".to_string()
}

/// Contents of a config file.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct FileConfig {
    pub remote: Option<RemoteConfig>,
    pub target: Option<SyncTarget>,
    pub delete: Option<bool>,
    pub upload_policy: Option<UploadPolicy>,
    pub on_error: Option<FailurePolicy>,
    #[serde(default)]
    pub exclude: Vec<String>,
    #[serde(default)]
    pub default_excludes: bool,
    /// Anything else in the file; reported, never used.
    #[serde(flatten)]
    pub unused: BTreeMap<String, toml::Value>,
}

impl FileConfig {
    pub fn parse(content: &str) -> Result<Self> {
        let config: FileConfig = toml::from_str(content).context("Invalid config file")?;
        for field in config.unused.keys() {
            warn!("Field {} in config is unused", field);
        }
        Ok(config)
    }

    pub fn load(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read config {}", path.display()))?;
        Self::parse(&content).with_context(|| format!("Failed to load config {}", path.display()))
    }

    /// Merge command line values over this file's defaults.
    pub fn into_run_options(self, overrides: Overrides) -> Result<RunOptions> {
        let mut excludes = if self.default_excludes || overrides.default_excludes {
            ExcludePatterns::with_defaults()
        } else {
            ExcludePatterns::new()
        };
        let mut patterns = self.exclude;
        patterns.extend(overrides.exclude);
        excludes.merge(&ExcludePatterns::from_patterns(patterns.as_slice())?)?;

        let mut options = RunOptions::new(overrides.local_path, overrides.remote_path);
        options.target = overrides.target.or(self.target).unwrap_or_default();
        options.delete_allowed = overrides.delete || self.delete.unwrap_or(false);
        options.dry_run = overrides.dry_run;
        options.upload_policy = overrides
            .upload_policy
            .or(self.upload_policy)
            .unwrap_or_default();
        options.failure_policy = overrides.on_error.or(self.on_error).unwrap_or_default();
        options.excludes = excludes;
        Ok(options)
    }
}

/// Command line values that take precedence over the file.
#[derive(Debug, Clone, Default)]
pub struct Overrides {
    pub local_path: PathBuf,
    pub remote_path: String,
    pub target: Option<SyncTarget>,
    pub delete: bool,
    pub dry_run: bool,
    pub upload_policy: Option<UploadPolicy>,
    pub on_error: Option<FailurePolicy>,
    pub exclude: Vec<String>,
    pub default_excludes: bool,
}

/// Places searched for a config file when none is given.
pub fn default_config_paths() -> Vec<PathBuf> {
    let mut paths = vec![
        PathBuf::from(".").join(CONFIG_FILE_NAME),
        PathBuf::from(".").join(format!(".{}", CONFIG_FILE_NAME)),
    ];
    if let Some(home) = dirs::home_dir() {
        paths.push(home.join(format!(".{}", CONFIG_FILE_NAME)));
    }
    paths
}

/// Pick the config file to use.
///
/// An explicit path that does not exist is reported and the default
/// locations are tried instead.
pub fn find_config(explicit: Option<&Path>) -> Option<PathBuf> {
    if let Some(path) = explicit {
        if path.exists() {
            info!("Using config {}", path.display());
            return Some(path.to_path_buf());
        }
        error!("Specified config {} does not exist", path.display());
    }

    for path in default_config_paths() {
        if path.exists() {
            info!("Using config {}", path.display());
            return Some(path);
        }
        debug!("Config {} does not exist", path.display());
    }
    None
}

/// Load the discovered config, or an empty one when there is none.
pub fn load_config(explicit: Option<&Path>) -> Result<FileConfig> {
    match find_config(explicit) {
        Some(path) => FileConfig::load(&path),
        None => Ok(FileConfig::default()),
    }
}

/// The remote to use: the command line shortcut if given, else the file's.
pub fn resolve_remote(config: &FileConfig, shortcut: Option<RemoteConfig>) -> Result<RemoteConfig> {
    if let Some(remote) = shortcut {
        return Ok(remote);
    }
    match &config.remote {
        Some(remote) => Ok(remote.clone()),
        None => bail!(
            "No remote configured: add a [remote] table to {} or pass --remote-kind",
            CONFIG_FILE_NAME
        ),
    }
}
