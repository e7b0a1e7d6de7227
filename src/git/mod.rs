pub mod status_parser;
pub mod types;

use std::path::Path;
use std::sync::Arc;
use std::time::Duration;
use tracing::{info, warn};
use url::Url;

use crate::error::GitError;
use crate::shell::{GitExecutor, ShellResult, DEFAULT_TIMEOUT};
use types::{PullOutcome, RepoStatus};

/// Default timeout for network-bound commands (push, pull).
pub const NETWORK_TIMEOUT: Duration = Duration::from_secs(60);

pub(crate) const STATUS_ARGS: &[&str] = &[
    "-c",
    "core.quotePath=false",
    "status",
    "--porcelain=v2",
    "--branch",
    "--untracked-files=all",
];
const CONFLICT_MARKER: &str = "CONFLICT";
const MERGE_CONFLICT_IN: &str = "Merge conflict in ";

/// Named repository actions on top of a [`GitExecutor`].
pub struct GitOperations {
    executor: Arc<dyn GitExecutor>,
    timeout: Duration,
    network_timeout: Duration,
}

impl GitOperations {
    pub fn new(executor: Arc<dyn GitExecutor>) -> Self {
        Self {
            executor,
            timeout: DEFAULT_TIMEOUT,
            network_timeout: NETWORK_TIMEOUT,
        }
    }

    pub fn with_timeouts(mut self, timeout: Duration, network_timeout: Duration) -> Self {
        self.timeout = timeout;
        self.network_timeout = network_timeout;
        self
    }

    pub fn is_git_available(&self) -> bool {
        self.executor.is_available()
    }

    fn run(&self, args: &[&str], repo_path: &Path) -> ShellResult {
        self.executor.execute(args, repo_path, self.timeout)
    }

    /// Lightweight probe used to validate any user-supplied path.
    pub fn is_repository(&self, path: &Path) -> bool {
        path.is_dir() && self.run(&["rev-parse", "--git-dir"], path).success()
    }

    pub fn status(&self, repo_path: &Path) -> Result<RepoStatus, GitError> {
        self.status_with_timeout(repo_path, self.timeout)
    }

    pub fn status_with_timeout(
        &self,
        repo_path: &Path,
        timeout: Duration,
    ) -> Result<RepoStatus, GitError> {
        if !repo_path.exists() {
            return Err(GitError::RepoNotAccessible(repo_path.display().to_string()));
        }

        let result = self.executor.execute(STATUS_ARGS, repo_path, timeout);
        let output = classify(result, GitError::CommandFailed)?;

        let files = status_parser::parse_status(&output);
        let branch = status_parser::parse_branch_info(&output);
        Ok(RepoStatus::new(repo_path, files, branch))
    }

    pub fn stage(&self, file: &str, repo_path: &Path) -> Result<(), GitError> {
        let result = self.run(&["add", "--", file], repo_path);
        classify(result, GitError::CommandFailed).map(drop)
    }

    /// Unstage `file`. Files staged for the first time have nothing to
    /// restore from, so `restore --staged` failing falls back to `rm --cached`.
    pub fn unstage(&self, file: &str, repo_path: &Path) -> Result<(), GitError> {
        let result = self.run(&["restore", "--staged", "--", file], repo_path);
        if result.success() {
            return Ok(());
        }
        if let ShellResult::TimedOut | ShellResult::GitNotFound = result {
            return classify(result, GitError::CommandFailed).map(drop);
        }

        info!(file = %file, "restore --staged failed, removing from index instead");
        let fallback = self.run(&["rm", "--cached", "--", file], repo_path);
        classify(fallback, GitError::CommandFailed).map(drop)
    }

    /// Discard working-tree changes to `file`.
    pub fn revert(&self, file: &str, repo_path: &Path) -> Result<(), GitError> {
        let result = self.run(&["restore", "--", file], repo_path);
        classify(result, GitError::CommandFailed).map(drop)
    }

    pub fn commit(&self, message: &str, repo_path: &Path) -> Result<(), GitError> {
        let result = self.run(&["commit", "-m", message], repo_path);
        classify(result, GitError::CommandFailed).map(drop)
    }

    pub fn commit_file(&self, file: &str, message: &str, repo_path: &Path) -> Result<(), GitError> {
        self.stage(file, repo_path)?;
        self.commit(message, repo_path)
    }

    pub fn commit_all(&self, message: &str, repo_path: &Path) -> Result<(), GitError> {
        let result = self.run(&["add", "-A"], repo_path);
        classify(result, GitError::CommandFailed)?;
        self.commit(message, repo_path)
    }

    pub fn push(&self, repo_path: &Path) -> Result<(), GitError> {
        info!(repo = %repo_path.display(), "Pushing");
        let result = self
            .executor
            .execute(&["push"], repo_path, self.network_timeout);
        classify(result, GitError::PushFailed).map(drop)
    }

    /// Pull from the upstream. Merge conflicts are an expected outcome and
    /// come back as `Ok(PullOutcome::Conflicts)`, not as an error.
    pub fn pull(&self, repo_path: &Path) -> Result<PullOutcome, GitError> {
        info!(repo = %repo_path.display(), "Pulling");
        let before = self.run(&["rev-parse", "HEAD"], repo_path);
        let before_head = before.stdout().trim().to_string();

        let result = self
            .executor
            .execute(&["pull"], repo_path, self.network_timeout);

        match &result {
            ShellResult::TimedOut => return Err(GitError::TimedOut),
            ShellResult::GitNotFound => return Err(GitError::GitNotInstalled),
            ShellResult::Completed(output) if !output.success() => {
                let combined = format!("{}\n{}", output.stdout, output.stderr);
                if combined.contains(CONFLICT_MARKER) {
                    let files = parse_conflict_files(&combined);
                    warn!(repo = %repo_path.display(), files = ?files, "Pull produced conflicts");
                    return Ok(PullOutcome::Conflicts(files));
                }
                return Err(GitError::PullFailed(output.stderr.trim().to_string()));
            }
            ShellResult::Completed(_) => {}
        }

        if before.success() && !before_head.is_empty() {
            let diff = self.run(&["diff", "--name-only", &before_head, "HEAD"], repo_path);
            if diff.success() {
                return Ok(PullOutcome::Success(status_parser::parse_file_list(
                    diff.stdout(),
                )));
            }
        }

        Ok(PullOutcome::Success(Vec::new()))
    }

    /// Check out the incoming ("theirs") side of one conflicted file and stage it.
    pub fn accept_incoming_file(&self, file: &str, repo_path: &Path) -> Result<(), GitError> {
        let checkout = self.run(&["checkout", "--theirs", "--", file], repo_path);
        classify(checkout, GitError::CommandFailed)?;
        let add = self.run(&["add", "--", file], repo_path);
        classify(add, GitError::CommandFailed).map(drop)
    }

    /// Take the incoming side of every file, then complete the merge.
    pub fn accept_incoming(&self, files: &[String], repo_path: &Path) -> Result<(), GitError> {
        for file in files {
            self.accept_incoming_file(file, repo_path)?;
        }

        let result = self.run(&["-c", "core.editor=true", "merge", "--continue"], repo_path);
        if result.success() {
            return Ok(());
        }

        // Older git has no `merge --continue`.
        info!(repo = %repo_path.display(), "merge --continue failed, committing instead");
        let commit = self.run(&["commit", "--no-edit"], repo_path);
        classify(commit, GitError::CommandFailed).map(drop)
    }

    /// Contents of `file` at `revision`, as raw bytes.
    pub fn read_file_at_revision(
        &self,
        revision: &str,
        file: &str,
        repo_path: &Path,
    ) -> Result<Vec<u8>, GitError> {
        let spec = format!("{revision}:{file}");
        match self.run(&["show", &spec], repo_path) {
            ShellResult::Completed(output) if output.success() => Ok(output.stdout_bytes),
            other => classify(other, GitError::CommandFailed).map(|_| Vec::new()),
        }
    }

    /// URL of `remote`, or `None` when no such remote is configured.
    pub fn remote_url(&self, repo_path: &Path, remote: &str) -> Result<Option<String>, GitError> {
        match self.run(&["remote", "get-url", remote], repo_path) {
            ShellResult::Completed(output) if output.success() => {
                let url = output.stdout.trim();
                Ok((!url.is_empty()).then(|| url.to_string()))
            }
            ShellResult::Completed(output) if output.stderr.contains("not a git repository") => {
                Err(GitError::NotARepository)
            }
            ShellResult::Completed(_) => Ok(None),
            ShellResult::TimedOut => Err(GitError::TimedOut),
            ShellResult::GitNotFound => Err(GitError::GitNotInstalled),
        }
    }

    /// Folder name of the repository.
    pub fn repo_name(&self, repo_path: &Path) -> String {
        repo_path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_else(|| repo_path.display().to_string())
    }

    /// Name derived from the `origin` remote, falling back to the folder name.
    pub fn display_name(&self, repo_path: &Path) -> String {
        self.remote_url(repo_path, "origin")
            .ok()
            .flatten()
            .and_then(|url| parse_repo_name(&url))
            .unwrap_or_else(|| self.repo_name(repo_path))
    }
}

/// Map a raw result onto the error taxonomy, returning stdout on success.
/// `failed` builds the error for a non-zero exit from its stderr.
fn classify(result: ShellResult, failed: fn(String) -> GitError) -> Result<String, GitError> {
    match result {
        ShellResult::Completed(output) if output.success() => Ok(output.stdout),
        ShellResult::Completed(output) => {
            if output.stderr.contains("not a git repository") {
                Err(GitError::NotARepository)
            } else {
                Err(failed(output.stderr.trim().to_string()))
            }
        }
        ShellResult::TimedOut => Err(GitError::TimedOut),
        ShellResult::GitNotFound => Err(GitError::GitNotInstalled),
    }
}

/// Extract paths from `CONFLICT (content): Merge conflict in <path>` lines.
fn parse_conflict_files(output: &str) -> Vec<String> {
    output
        .lines()
        .filter_map(|line| {
            let i = line.find(MERGE_CONFLICT_IN)?;
            let path = line[i + MERGE_CONFLICT_IN.len()..].trim();
            (!path.is_empty()).then(|| path.to_string())
        })
        .collect()
}

/// Repository name from a remote URL.
///
/// Handles `user@host:owner/repo.git`, `ssh://` and `http(s)://`/`git://`
/// URLs; a trailing `.git` is dropped.
pub fn parse_repo_name(remote_url: &str) -> Option<String> {
    let trimmed = remote_url.trim();
    if trimmed.is_empty() {
        return None;
    }

    let path = if trimmed.contains("://") {
        let url = Url::parse(trimmed).ok()?;
        url.path().to_string()
    } else {
        // scp-like syntax: the path follows the first colon.
        let (host, path) = trimmed.split_once(':')?;
        if host.is_empty() || host.contains('/') {
            return None;
        }
        path.to_string()
    };

    let last = path.trim_end_matches('/').rsplit('/').next()?;
    let name = last.strip_suffix(".git").unwrap_or(last);
    (!name.is_empty()).then(|| name.to_string())
}
