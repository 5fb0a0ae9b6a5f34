use treesync::sync::{diff, FileRecord, SyncKind, SyncPolicy, TreeSnapshot};

fn snapshot(records: &[(&str, &str)]) -> TreeSnapshot {
    records
        .iter()
        .map(|(path, hash)| FileRecord::new(*path, *hash))
        .collect()
}

#[test]
fn test_plan_never_touches_one_path_twice() {
    let origin = snapshot(&[("a", "1"), ("b", "2"), ("d/e", "3")]);
    let target = snapshot(&[("b", "x"), ("c", "4"), ("d/f", "5")]);

    let plan = diff(&origin, &target, SyncPolicy::mirror(true));
    let mut paths: Vec<&str> = plan.iter().map(|op| op.relative_path.as_str()).collect();
    let before = paths.len();
    paths.sort();
    paths.dedup();
    assert_eq!(paths.len(), before);

    for op in &plan {
        match op.kind {
            SyncKind::Add | SyncKind::Change => assert!(origin.contains(&op.relative_path)),
            SyncKind::Delete => {
                assert!(target.contains(&op.relative_path));
                assert!(!origin.contains(&op.relative_path));
            }
        }
    }
    assert_eq!(plan.count(SyncKind::Add), 2);
    assert_eq!(plan.count(SyncKind::Change), 1);
    assert_eq!(plan.count(SyncKind::Delete), 2);
}

#[test]
fn test_differing_content_kept_without_change_permission() {
    let origin = snapshot(&[("a.txt", "new")]);
    let target = snapshot(&[("a.txt", "old")]);

    assert!(diff(&origin, &target, SyncPolicy::add_only()).is_empty());
}

#[test]
fn test_none_policy_is_empty() {
    let origin = snapshot(&[("a", "1")]);
    let target = snapshot(&[("b", "2")]);
    assert!(diff(&origin, &target, SyncPolicy::NONE).is_empty());
}
