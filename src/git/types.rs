use chrono::{DateTime, Utc};
use serde::Serialize;
use std::collections::HashMap;
use std::path::PathBuf;

/// One column (index or worktree) of a porcelain status record.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum StatusCode {
    Untracked,
    Modified,
    Added,
    Deleted,
    Renamed,
    Copied,
    Unmerged,
    Ignored,
    Clean,
}

impl StatusCode {
    pub fn from_char(c: char) -> Self {
        match c {
            '?' => StatusCode::Untracked,
            'M' => StatusCode::Modified,
            'A' => StatusCode::Added,
            'D' => StatusCode::Deleted,
            'R' => StatusCode::Renamed,
            'C' => StatusCode::Copied,
            'U' => StatusCode::Unmerged,
            '!' => StatusCode::Ignored,
            _ => StatusCode::Clean,
        }
    }
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct FileStatus {
    pub path: String,
    pub index: StatusCode,
    pub worktree: StatusCode,
}

impl FileStatus {
    pub fn new(path: impl Into<String>, index: StatusCode, worktree: StatusCode) -> Self {
        Self {
            path: path.into(),
            index,
            worktree,
        }
    }

    pub fn is_untracked(&self) -> bool {
        self.index == StatusCode::Untracked && self.worktree == StatusCode::Untracked
    }

    pub fn is_modified(&self) -> bool {
        matches!(
            self.worktree,
            StatusCode::Modified | StatusCode::Added | StatusCode::Deleted
        )
    }

    pub fn is_staged(&self) -> bool {
        matches!(
            self.index,
            StatusCode::Modified
                | StatusCode::Added
                | StatusCode::Deleted
                | StatusCode::Renamed
                | StatusCode::Copied
        )
    }

    pub fn has_conflict(&self) -> bool {
        self.index == StatusCode::Unmerged || self.worktree == StatusCode::Unmerged
    }
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize)]
pub struct BranchInfo {
    pub ahead: u32,
    pub behind: u32,
}

/// A consistent status snapshot of one repository. Replaced wholesale on
/// refresh, never patched.
#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct RepoStatus {
    pub repo_path: PathBuf,
    /// Keyed by repo-relative path.
    pub files: HashMap<String, FileStatus>,
    pub timestamp: DateTime<Utc>,
    pub commits_ahead: u32,
    pub commits_behind: u32,
}

impl RepoStatus {
    pub fn new(repo_path: impl Into<PathBuf>, files: Vec<FileStatus>, branch: BranchInfo) -> Self {
        Self {
            repo_path: repo_path.into(),
            files: files.into_iter().map(|f| (f.path.clone(), f)).collect(),
            timestamp: Utc::now(),
            commits_ahead: branch.ahead,
            commits_behind: branch.behind,
        }
    }

    pub fn status_for(&self, relative_path: &str) -> Option<&FileStatus> {
        self.files.get(relative_path)
    }
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
#[serde(tag = "type", content = "files", rename_all = "snake_case")]
pub enum PullOutcome {
    Success(Vec<String>),
    Conflicts(Vec<String>),
}

/// One "keep both" resolution: `backup_file` is the repo-relative name the
/// local copy ends up under; `backup_path` is where it is staged meanwhile.
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct ConflictResolution {
    pub original_file: String,
    pub backup_file: String,
    pub backup_path: PathBuf,
}
