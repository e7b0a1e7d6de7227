#![allow(dead_code)]

use std::fs;
use std::path::{Path, PathBuf};
use std::process::Command;
use std::sync::Arc;
use tempfile::TempDir;

use repo_badges_lib::shell::ShellGitExecutor;
use repo_badges_lib::GitOperations;

pub fn git_ops() -> GitOperations {
    GitOperations::new(Arc::new(ShellGitExecutor::new()))
}

pub fn run_git(repo: &Path, args: &[&str]) {
    let output = Command::new("git")
        .arg("-C")
        .arg(repo)
        .args(args)
        .output()
        .expect("git command to run");
    assert!(
        output.status.success(),
        "git {:?} failed: {}",
        args,
        String::from_utf8_lossy(&output.stderr)
    );
}

pub fn run_git_capture(repo: &Path, args: &[&str]) -> String {
    let output = Command::new("git")
        .arg("-C")
        .arg(repo)
        .args(args)
        .output()
        .expect("git command to run");
    assert!(
        output.status.success(),
        "git {:?} failed: {}",
        args,
        String::from_utf8_lossy(&output.stderr)
    );
    String::from_utf8_lossy(&output.stdout).to_string()
}

fn configure(repo: &Path) {
    run_git(repo, &["config", "user.email", "test@example.com"]);
    run_git(repo, &["config", "user.name", "Test User"]);
    run_git(repo, &["config", "commit.gpgsign", "false"]);
    run_git(repo, &["config", "pull.rebase", "false"]);
}

/// Empty repository on branch `main`, without commits.
pub fn init_empty_repo(path: &Path) {
    fs::create_dir_all(path).expect("failed to create repo dir");
    run_git(path, &["init"]);
    run_git(path, &["symbolic-ref", "HEAD", "refs/heads/main"]);
    configure(path);
}

/// Repository with one committed `README.md`.
pub fn init_test_repo() -> (TempDir, PathBuf) {
    let dir = TempDir::new().expect("failed to create temp dir");
    let repo_path = dir.path().join("repo");
    init_empty_repo(&repo_path);
    create_file(&repo_path, "README.md", "# Test Repo\n");
    commit_all(&repo_path, "Initial commit");
    (dir, repo_path)
}

pub fn create_file(repo_path: &Path, name: &str, content: &str) {
    let file_path = repo_path.join(name);
    if let Some(parent) = file_path.parent() {
        fs::create_dir_all(parent).expect("failed to create parent dirs");
    }
    fs::write(&file_path, content).expect("failed to write file");
}

pub fn commit_all(repo_path: &Path, message: &str) {
    run_git(repo_path, &["add", "-A"]);
    run_git(repo_path, &["commit", "-m", message]);
}

/// A bare remote with two clones sharing one initial commit.
pub struct RemotePair {
    pub dir: TempDir,
    pub remote: PathBuf,
    pub local: PathBuf,
    pub other: PathBuf,
}

pub fn init_remote_pair() -> RemotePair {
    let dir = TempDir::new().expect("failed to create temp dir");
    let remote = dir.path().join("remote.git");
    let local = dir.path().join("local");
    let other = dir.path().join("other");

    fs::create_dir_all(&remote).expect("failed to create remote dir");
    run_git(&remote, &["init", "--bare"]);
    run_git(&remote, &["symbolic-ref", "HEAD", "refs/heads/main"]);

    init_empty_repo(&local);
    create_file(&local, "README.md", "# Shared\n");
    commit_all(&local, "Initial commit");
    let remote_str = remote.to_str().expect("remote path");
    run_git(&local, &["remote", "add", "origin", remote_str]);
    run_git(&local, &["push", "-u", "origin", "main"]);

    run_git(dir.path(), &["clone", remote_str, "other"]);
    configure(&other);

    RemotePair {
        dir,
        remote,
        local,
        other,
    }
}

pub fn read(path: &Path) -> String {
    fs::read_to_string(path).expect("failed to read file")
}
