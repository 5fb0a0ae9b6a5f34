use tokio::sync::mpsc;

use treesync::sync::{
    ApplyPass, FailurePolicy, SyncApplier, SyncOperation, SyncPlan, UploadPolicy,
};
use treesync::SyncError;

use crate::common::{write_tree, FakeStore, ScriptedConfirm};

fn plan(operations: Vec<SyncOperation>) -> SyncPlan {
    operations.into_iter().collect()
}

#[tokio::test]
async fn test_local_pass_runs_before_remote_pass() {
    let dir = tempfile::tempdir().unwrap();
    write_tree(dir.path(), &[("nested/dir/up.txt", "up")]);
    let store = FakeStore::new().with_file("/r/sub/down.txt", b"down");
    let confirm = ScriptedConfirm::always(true);

    let stats = SyncApplier::new(&store, dir.path(), "/r", &confirm)
        .apply(
            &plan(vec![SyncOperation::add("sub/down.txt")]),
            &plan(vec![SyncOperation::add("nested/dir/up.txt")]),
        )
        .await
        .unwrap();

    assert_eq!(
        store.log(),
        vec![
            "download /r/sub/down.txt",
            "mkdir /r/nested",
            "mkdir /r/nested/dir",
            "upload /r/nested/dir/up.txt",
        ]
    );
    assert_eq!(
        std::fs::read_to_string(dir.path().join("sub/down.txt")).unwrap(),
        "down"
    );
    assert_eq!(stats.downloaded, 1);
    assert_eq!(stats.uploaded, 1);
    assert_eq!(stats.dirs_created, 2);
    assert!(confirm.prompts().is_empty());
}

#[tokio::test]
async fn test_sibling_uploads_probe_once() {
    let dir = tempfile::tempdir().unwrap();
    write_tree(dir.path(), &[("d/a.txt", "a"), ("d/b.txt", "b")]);
    let store = FakeStore::new().with_dir("/r");
    let confirm = ScriptedConfirm::always(true);

    let stats = SyncApplier::new(&store, dir.path(), "/r", &confirm)
        .apply(
            &SyncPlan::new(),
            &plan(vec![SyncOperation::add("d/a.txt"), SyncOperation::add("d/b.txt")]),
        )
        .await
        .unwrap();

    assert_eq!(stats.dirs_created, 1);
    assert_eq!(
        store.log(),
        vec!["mkdir /r/d", "upload /r/d/a.txt", "upload /r/d/b.txt"]
    );
}

#[tokio::test]
async fn test_copies_run_before_deletes() {
    let dir = tempfile::tempdir().unwrap();
    write_tree(dir.path(), &[("new.txt", "n")]);
    let store = FakeStore::new().with_file("/r/old.txt", b"o");
    let confirm = ScriptedConfirm::always(true);

    SyncApplier::new(&store, dir.path(), "/r", &confirm)
        .apply(
            &SyncPlan::new(),
            &plan(vec![SyncOperation::delete("old.txt"), SyncOperation::add("new.txt")]),
        )
        .await
        .unwrap();

    assert_eq!(store.log(), vec!["upload /r/new.txt", "delete /r/old.txt"]);
}

#[tokio::test]
async fn test_declined_delete_aborts_run() {
    let dir = tempfile::tempdir().unwrap();
    let store = FakeStore::new()
        .with_file("/r/a.txt", b"a")
        .with_file("/r/b.txt", b"b");
    let confirm = ScriptedConfirm::always(false);

    let err = SyncApplier::new(&store, dir.path(), "/r", &confirm)
        .with_failure_policy(FailurePolicy::Continue)
        .apply(
            &SyncPlan::new(),
            &plan(vec![SyncOperation::delete("a.txt"), SyncOperation::delete("b.txt")]),
        )
        .await
        .unwrap_err();

    assert!(matches!(err, SyncError::UserAborted));
    assert_eq!(confirm.prompts().len(), 1);
    assert!(store.file("/r/a.txt").is_some());
    assert!(store.file("/r/b.txt").is_some());
    assert!(store.log().is_empty());
}

#[tokio::test]
async fn test_confirmed_local_delete() {
    let dir = tempfile::tempdir().unwrap();
    write_tree(dir.path(), &[("gone.txt", "x"), ("kept.txt", "y")]);
    let store = FakeStore::new().with_dir("/r");
    let confirm = ScriptedConfirm::always(true);

    let stats = SyncApplier::new(&store, dir.path(), "/r", &confirm)
        .apply(&plan(vec![SyncOperation::delete("gone.txt")]), &SyncPlan::new())
        .await
        .unwrap();

    assert_eq!(stats.deleted_local, 1);
    assert!(!dir.path().join("gone.txt").exists());
    assert!(dir.path().join("kept.txt").exists());
    assert_eq!(confirm.prompts().len(), 1);
    assert!(confirm.prompts()[0].contains("gone.txt"));
}

#[tokio::test]
async fn test_skip_existing_leaves_destination() {
    let dir = tempfile::tempdir().unwrap();
    write_tree(dir.path(), &[("a.txt", "local")]);
    let store = FakeStore::new().with_file("/r/a.txt", b"remote");
    let confirm = ScriptedConfirm::always(true);

    let stats = SyncApplier::new(&store, dir.path(), "/r", &confirm)
        .with_upload_policy(UploadPolicy::SkipExisting)
        .apply(
            &plan(vec![SyncOperation::change("a.txt")]),
            &plan(vec![SyncOperation::change("a.txt")]),
        )
        .await
        .unwrap();

    assert_eq!(stats.skipped, 2);
    assert_eq!(std::fs::read_to_string(dir.path().join("a.txt")).unwrap(), "local");
    assert_eq!(store.file("/r/a.txt").unwrap(), b"remote");
    assert!(store.log().is_empty());
}

#[tokio::test]
async fn test_error_on_conflict() {
    let dir = tempfile::tempdir().unwrap();
    write_tree(dir.path(), &[("a.txt", "local")]);
    let store = FakeStore::new().with_file("/r/a.txt", b"remote");
    let confirm = ScriptedConfirm::always(true);

    let err = SyncApplier::new(&store, dir.path(), "/r", &confirm)
        .with_upload_policy(UploadPolicy::ErrorOnConflict)
        .apply(&SyncPlan::new(), &plan(vec![SyncOperation::change("a.txt")]))
        .await
        .unwrap_err();

    match err {
        SyncError::AlreadyExists { path } => assert_eq!(path, "/r/a.txt"),
        other => panic!("unexpected error: {other:?}"),
    }
}

#[tokio::test]
async fn test_fail_fast_stops_at_first_failure() {
    let dir = tempfile::tempdir().unwrap();
    write_tree(dir.path(), &[("a.txt", "a"), ("b.txt", "b")]);
    let store = FakeStore::new().with_dir("/r");
    store.fail_on("/r/a.txt");
    let confirm = ScriptedConfirm::always(true);

    let err = SyncApplier::new(&store, dir.path(), "/r", &confirm)
        .apply(
            &SyncPlan::new(),
            &plan(vec![SyncOperation::add("a.txt"), SyncOperation::add("b.txt")]),
        )
        .await
        .unwrap_err();

    assert!(matches!(err, SyncError::TransportFault { .. }));
    assert!(store.file("/r/b.txt").is_none());
}

#[tokio::test]
async fn test_continue_reports_partial_failure() {
    let dir = tempfile::tempdir().unwrap();
    write_tree(dir.path(), &[("a.txt", "a"), ("b.txt", "b")]);
    let store = FakeStore::new().with_dir("/r");
    store.fail_on("/r/a.txt");
    let confirm = ScriptedConfirm::always(true);

    let mut applier = SyncApplier::new(&store, dir.path(), "/r", &confirm)
        .with_failure_policy(FailurePolicy::Continue);
    let err = applier
        .apply(
            &SyncPlan::new(),
            &plan(vec![SyncOperation::add("a.txt"), SyncOperation::add("b.txt")]),
        )
        .await
        .unwrap_err();

    assert!(matches!(err, SyncError::PartialFailure { failed: 1, total: 2 }));
    assert_eq!(store.file("/r/b.txt").unwrap(), b"b");
    assert_eq!(applier.stats().uploaded, 1);
    assert_eq!(applier.stats().failed, 1);
}

#[tokio::test]
async fn test_progress_updates() {
    let dir = tempfile::tempdir().unwrap();
    write_tree(dir.path(), &[("up.txt", "u")]);
    let store = FakeStore::new().with_file("/r/down.txt", b"d");
    let confirm = ScriptedConfirm::always(true);
    let (tx, mut rx) = mpsc::channel(16);

    SyncApplier::new(&store, dir.path(), "/r", &confirm)
        .with_progress(Some(tx))
        .apply(
            &plan(vec![SyncOperation::add("down.txt")]),
            &plan(vec![SyncOperation::add("up.txt")]),
        )
        .await
        .unwrap();

    let mut updates = Vec::new();
    while let Some(update) = rx.recv().await {
        updates.push(update);
    }
    assert_eq!(updates.len(), 3);
    assert_eq!(updates[0].pass, ApplyPass::Local);
    assert_eq!(updates[0].current_file, "down.txt");
    assert_eq!(updates[1].pass, ApplyPass::Remote);
    assert_eq!(updates[1].files_done, 1);
    assert!(updates[2].is_complete());
    assert_eq!(updates[2].files_done, 2);
}

#[cfg(unix)]
#[tokio::test]
async fn test_download_never_writes_through_symlink() {
    let dir = tempfile::tempdir().unwrap();
    let outside = tempfile::tempdir().unwrap();
    let victim = outside.path().join("victim.txt");
    std::fs::write(&victim, "untouched").unwrap();
    std::os::unix::fs::symlink(&victim, dir.path().join("a.txt")).unwrap();
    std::os::unix::fs::symlink(outside.path(), dir.path().join("linked")).unwrap();

    let store = FakeStore::new()
        .with_file("/r/a.txt", b"remote-content")
        .with_file("/r/linked/victim.txt", b"remote-content");
    let confirm = ScriptedConfirm::always(true);

    let mut applier = SyncApplier::new(&store, dir.path(), "/r", &confirm)
        .with_failure_policy(FailurePolicy::Continue);
    let err = applier
        .apply(
            &plan(vec![
                SyncOperation::add("a.txt"),
                SyncOperation::add("linked/victim.txt"),
            ]),
            &SyncPlan::new(),
        )
        .await
        .unwrap_err();

    assert!(matches!(err, SyncError::PartialFailure { failed: 2, total: 2 }));
    assert_eq!(applier.stats().downloaded, 0);
    assert_eq!(std::fs::read_to_string(&victim).unwrap(), "untouched");
    assert!(store.log().is_empty());
}
