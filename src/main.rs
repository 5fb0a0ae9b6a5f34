use anyhow::{Context, Result};
use clap::{ArgAction, Parser, ValueEnum};
use indicatif::{ProgressBar, ProgressStyle};
use std::path::PathBuf;
use std::sync::Arc;
use tokio::sync::mpsc;
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

use treesync::config::{self, Overrides, RemoteConfig};
use treesync::fs::{OpendalStore, RemoteStore};
use treesync::sync::{
    AssumeYes, Confirm, FailurePolicy, StdinConfirm, SyncEngine, SyncProgress, SyncReport,
    SyncTarget, UploadPolicy,
};

/// Keep a local directory and a remote storage directory in sync.
#[derive(Debug, Parser)]
#[command(name = "treesync", version, about)]
struct Cli {
    /// Config file (default: ./treesync.toml, ./.treesync.toml, ~/.treesync.toml)
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Local directory
    #[arg(short, long)]
    local_path: PathBuf,

    /// Remote directory
    #[arg(short = 'd', long)]
    remote_path: String,

    /// Side that gets changed
    #[arg(short, long, value_enum)]
    target: Option<SyncTarget>,

    /// Remove files from the target that the origin does not have
    #[arg(long)]
    delete: bool,

    /// Print the plans without applying them
    #[arg(long)]
    dry_run: bool,

    /// Answer yes to every confirmation
    #[arg(short, long)]
    yes: bool,

    #[arg(long, value_enum)]
    upload_policy: Option<UploadPolicy>,

    #[arg(long, value_enum)]
    on_error: Option<FailurePolicy>,

    /// Glob of paths to leave alone (repeatable)
    #[arg(long)]
    exclude: Vec<String>,

    /// Also exclude VCS directories and OS junk files
    #[arg(long)]
    default_excludes: bool,

    /// Use a remote without a config file
    #[arg(long, value_enum)]
    remote_kind: Option<RemoteKind>,

    /// More logging (-v debug, -vv trace)
    #[arg(short, long, action = ArgAction::Count)]
    verbose: u8,

    /// Only warnings and errors
    #[arg(short, long, conflicts_with = "verbose")]
    quiet: bool,
}

#[derive(Debug, Clone, Copy, ValueEnum)]
enum RemoteKind {
    /// Remote paths are paths on this machine (mounted shares)
    Fs,
    /// Throwaway in-memory store
    Memory,
}

impl From<RemoteKind> for RemoteConfig {
    fn from(kind: RemoteKind) -> Self {
        match kind {
            RemoteKind::Fs => RemoteConfig::Fs {
                root: "/".to_string(),
            },
            RemoteKind::Memory => RemoteConfig::Memory,
        }
    }
}

fn init_logging(verbose: u8, quiet: bool) {
    let level = match (quiet, verbose) {
        (true, _) => "warn",
        (false, 0) => "info",
        (false, 1) => "debug",
        (false, _) => "trace",
    };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level));
    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_writer(std::io::stderr)
        .try_init();
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    init_logging(cli.verbose, cli.quiet);

    let file_config = config::load_config(cli.config.as_deref())?;
    let remote = config::resolve_remote(&file_config, cli.remote_kind.map(RemoteConfig::from))?;
    let store: Arc<dyn RemoteStore> =
        Arc::new(OpendalStore::from_config(&remote).context("Failed to set up remote storage")?);
    info!(
        "Syncing {} with {} ({})",
        cli.local_path.display(),
        store.display_path(&cli.remote_path),
        store.backend_type().short_name()
    );

    let confirm: Arc<dyn Confirm> = if cli.yes {
        Arc::new(AssumeYes)
    } else {
        Arc::new(StdinConfirm)
    };

    let options = file_config.into_run_options(Overrides {
        local_path: cli.local_path,
        remote_path: cli.remote_path,
        target: cli.target,
        delete: cli.delete,
        dry_run: cli.dry_run,
        upload_policy: cli.upload_policy,
        on_error: cli.on_error,
        exclude: cli.exclude,
        default_excludes: cli.default_excludes,
    })?;

    // Prompts and a live bar would fight over the terminal
    let report = if cli.yes && !cli.quiet {
        let (tx, rx) = mpsc::channel(64);
        let renderer = tokio::spawn(render_progress(rx));
        let engine = SyncEngine::with_progress(store, confirm, options, tx);
        let report = engine.run().await;
        drop(engine);
        let _ = renderer.await;
        report?
    } else {
        SyncEngine::new(store, confirm, options).run().await?
    };

    print_summary(&report);
    report.check()?;
    Ok(())
}

async fn render_progress(mut rx: mpsc::Receiver<SyncProgress>) {
    let pb = ProgressBar::new(0);
    if let Ok(style) = ProgressStyle::default_bar()
        .template("[{elapsed_precise}] [{bar:40.cyan/blue}] {pos}/{len} files ({percent}%) | {msg}")
    {
        pb.set_style(style.progress_chars("=>-"));
    }

    while let Some(progress) = rx.recv().await {
        pb.set_length(progress.total_files as u64);
        pb.set_position(progress.files_done as u64);
        if progress.is_complete() {
            pb.finish_and_clear();
            break;
        }
        if let Some(kind) = progress.kind {
            pb.set_message(format!("{} {}", kind.as_one_char(), progress.current_file));
        }
    }
}

fn print_summary(report: &SyncReport) {
    if !report.skipped_entries.is_empty() {
        warn!("{} entries skipped", report.skipped_entries.len());
    }
    if !report.conflicts.is_empty() {
        warn!("{} conflicting files left untouched", report.conflicts.len());
    }

    if report.dry_run {
        info!(
            "Dry run: {} to local, {} to remote",
            report.into_local.len(),
            report.into_remote.len()
        );
        return;
    }

    let stats = &report.stats;
    info!(
        "Done, {} changes: {} downloaded, {} uploaded, {} deleted locally, {} deleted remotely, {} directories created, {} skipped, {} failed",
        stats.total_changes(),
        stats.downloaded,
        stats.uploaded,
        stats.deleted_local,
        stats.deleted_remote,
        stats.dirs_created,
        stats.skipped,
        stats.failed
    );
}
