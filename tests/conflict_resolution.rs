mod common;

use chrono::{Local, TimeZone};
use common::*;
use repo_badges_lib::conflict::{backup_name, ConflictResolver};
use repo_badges_lib::git::types::PullOutcome;
use std::sync::Arc;

const STAMP: &str = "2025-01-14 15.30.45";

/// Both clones edit `f.txt`; `other` pushes first, `local` pulls.
fn conflicting_pull(pair: &RemotePair) -> PullOutcome {
    create_file(&pair.local, "f.txt", "base\n");
    commit_all(&pair.local, "Add f");
    run_git(&pair.local, &["push"]);
    run_git(&pair.other, &["pull"]);

    create_file(&pair.other, "f.txt", "incoming\n");
    commit_all(&pair.other, "Their edit");
    run_git(&pair.other, &["push"]);

    create_file(&pair.local, "f.txt", "local\n");
    commit_all(&pair.local, "Our edit");

    git_ops().pull(&pair.local).unwrap()
}

#[test]
fn pull_reports_conflicted_files() {
    let pair = init_remote_pair();
    assert_eq!(
        conflicting_pull(&pair),
        PullOutcome::Conflicts(vec!["f.txt".into()])
    );

    let status = git_ops().status(&pair.local).unwrap();
    assert!(status.files["f.txt"].has_conflict());
}

#[test]
fn keep_both_resolution_end_to_end() {
    let pair = init_remote_pair();
    let PullOutcome::Conflicts(files) = conflicting_pull(&pair) else {
        panic!("expected a conflict");
    };

    let staging = tempfile::tempdir().unwrap();
    let resolver = ConflictResolver::new(Arc::new(git_ops()), Some(staging.path().to_path_buf()));
    let when = Local.with_ymd_and_hms(2025, 1, 14, 15, 30, 45).unwrap();
    let resolutions = resolver.resolve_conflicts(&files, &pair.local, when).unwrap();

    assert_eq!(resolutions.len(), 1);
    assert_eq!(resolutions[0].original_file, "f.txt");
    assert_eq!(resolutions[0].backup_file, backup_name("f.txt", STAMP));
    assert_eq!(resolutions[0].backup_file, format!("f (Conflict {STAMP}).txt"));

    assert_eq!(read(&pair.local.join("f.txt")), "incoming\n");
    assert_eq!(read(&pair.local.join(&resolutions[0].backup_file)), "local\n");
    assert!(!resolutions[0].backup_path.exists());

    let status = git_ops().status(&pair.local).unwrap();
    assert!(status.files.values().all(|f| !f.has_conflict()));
    assert!(status.files[&resolutions[0].backup_file].is_untracked());
    assert_eq!(status.files.len(), 1);

    // The merge was committed.
    let parents = run_git_capture(&pair.local, &["log", "-1", "--format=%p"]);
    assert_eq!(parents.split_whitespace().count(), 2);
}
