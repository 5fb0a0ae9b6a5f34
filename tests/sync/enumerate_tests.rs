use futures::StreamExt;

use treesync::sync::{enumerate_local, enumerate_remote, hash_bytes, RemoteWalk};

use crate::common::{write_tree, FakeStore};

#[tokio::test]
async fn test_remote_walk_relative_keys() {
    let store = FakeStore::new()
        .with_file("/backup/a.txt", b"a")
        .with_file("/backup/docs/b.txt", b"b")
        .with_file("/backup/docs/deep/c.txt", b"c")
        .with_file("/elsewhere/x.txt", b"x")
        .with_dir("/backup/empty");

    let result = enumerate_remote(&store, "/backup").await.unwrap();
    let paths: Vec<&str> = result.snapshot.iter().map(|(path, _)| path).collect();
    assert_eq!(paths, vec!["a.txt", "docs/b.txt", "docs/deep/c.txt"]);
    assert_eq!(
        result.snapshot.get("docs/b.txt").unwrap().content_fingerprint,
        hash_bytes(b"b")
    );
}

#[tokio::test]
async fn test_unhashed_entries_are_fetched() {
    let store = FakeStore::without_hashes().with_file("/r/a.txt", b"hello");

    let result = enumerate_remote(&store, "/r").await.unwrap();
    assert_eq!(
        result.snapshot.get("a.txt").unwrap().content_fingerprint,
        "5d41402abc4b2a76b9719d911017c592"
    );
}

#[tokio::test]
async fn test_backslash_in_remote_name_is_kept() {
    let store = FakeStore::without_hashes()
        .with_file("/r/a\\b.txt", b"hello")
        .with_file("/r/a/b.txt", b"other");

    let result = enumerate_remote(&store, "/r").await.unwrap();
    let paths: Vec<&str> = result.snapshot.iter().map(|(path, _)| path).collect();
    assert_eq!(paths, vec!["a/b.txt", "a\\b.txt"]);
    assert_eq!(
        result.snapshot.get("a\\b.txt").unwrap().content_fingerprint,
        hash_bytes(b"hello")
    );
}

#[tokio::test]
async fn test_unknown_kind_is_skipped_not_fatal() {
    let store = FakeStore::new()
        .with_file("/r/a.txt", b"a")
        .with_other("/r/link", "symlink")
        .with_file("/r/z.txt", b"z");

    let result = enumerate_remote(&store, "/r").await.unwrap();
    assert_eq!(result.snapshot.len(), 2);
    assert_eq!(result.skipped, vec!["link".to_string()]);
}

#[tokio::test]
async fn test_missing_remote_root_fails_before_records() {
    let store = FakeStore::new().with_file("/other/a.txt", b"a");

    let mut walk = RemoteWalk::new(&store, "/missing");
    let first = walk.next_record().await.unwrap();
    assert!(first.unwrap_err().is_not_found());
    assert!(walk.next_record().await.is_none());
}

#[tokio::test]
async fn test_remote_stream_yields_each_record_once() {
    let store = FakeStore::new()
        .with_file("/r/a.txt", b"a")
        .with_file("/r/sub/b.txt", b"b");

    let records: Vec<_> = RemoteWalk::new(&store, "/r").into_stream().collect().await;
    let paths: Vec<String> = records
        .into_iter()
        .map(|record| record.unwrap().relative_path)
        .collect();
    assert_eq!(paths, vec!["a.txt", "sub/b.txt"]);
}

#[tokio::test]
async fn test_local_and_remote_keys_compare_equal() {
    let dir = tempfile::tempdir().unwrap();
    write_tree(dir.path(), &[("docs/notes/a.txt", "same"), ("b.txt", "b")]);
    let store = FakeStore::new()
        .with_file("/r/docs/notes/a.txt", b"same")
        .with_file("/r/b.txt", b"b");

    let local = enumerate_local(dir.path()).unwrap();
    let remote = enumerate_remote(&store, "/r").await.unwrap();
    assert_eq!(local.snapshot, remote.snapshot);
}
