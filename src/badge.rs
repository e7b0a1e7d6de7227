use serde::Serialize;
use std::cmp::Ordering;

use crate::git::types::{FileStatus, RepoStatus};

/// Severity of a file or directory badge. Directories show the highest
/// priority of any file beneath them.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum BadgePriority {
    /// No snapshot yet.
    Pending,
    Clean,
    Ahead,
    Untracked,
    Staged,
    Modified,
    Conflict,
}

impl BadgePriority {
    pub fn rank(self) -> i8 {
        match self {
            BadgePriority::Pending => -1,
            BadgePriority::Clean => 0,
            BadgePriority::Ahead => 1,
            BadgePriority::Untracked => 2,
            BadgePriority::Staged => 3,
            BadgePriority::Modified => 4,
            BadgePriority::Conflict => 5,
        }
    }

    /// Label shown by the file browser; empty means no badge.
    pub fn label(self) -> &'static str {
        match self {
            BadgePriority::Pending | BadgePriority::Clean => "",
            BadgePriority::Ahead => "Ahead",
            BadgePriority::Untracked => "Untracked",
            BadgePriority::Staged => "Staged",
            BadgePriority::Modified => "Modified",
            BadgePriority::Conflict => "Conflict",
        }
    }
}

impl Ord for BadgePriority {
    fn cmp(&self, other: &Self) -> Ordering {
        self.rank().cmp(&other.rank())
    }
}

impl PartialOrd for BadgePriority {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl From<&FileStatus> for BadgePriority {
    fn from(file: &FileStatus) -> Self {
        if file.has_conflict() {
            BadgePriority::Conflict
        } else if file.is_modified() {
            BadgePriority::Modified
        } else if file.is_staged() {
            BadgePriority::Staged
        } else if file.is_untracked() {
            BadgePriority::Untracked
        } else {
            BadgePriority::Clean
        }
    }
}

/// Highest priority among files at or beneath `relative_dir`. The empty
/// string is the repository root and covers every file.
pub fn directory_priority(relative_dir: &str, status: &RepoStatus) -> BadgePriority {
    let prefix = format!("{relative_dir}/");
    status
        .files
        .values()
        .filter(|f| relative_dir.is_empty() || f.path == relative_dir || f.path.starts_with(&prefix))
        .map(BadgePriority::from)
        .max()
        .unwrap_or(BadgePriority::Clean)
}

/// Priority for a single path, or `Pending` without a snapshot.
pub fn priority_for(
    relative_path: &str,
    status: Option<&RepoStatus>,
    is_directory: bool,
) -> BadgePriority {
    let Some(status) = status else {
        return BadgePriority::Pending;
    };
    if is_directory {
        directory_priority(relative_path, status)
    } else {
        status
            .status_for(relative_path)
            .map(BadgePriority::from)
            .unwrap_or(BadgePriority::Clean)
    }
}

/// Badge label for `relative_path`; `""` means no badge.
pub fn resolve_badge(relative_path: &str, status: Option<&RepoStatus>, is_directory: bool) -> &'static str {
    priority_for(relative_path, status, is_directory).label()
}

/// Whole-repository priority: the worst file, or `Ahead` for a clean tree
/// with unpushed commits.
pub fn repository_priority(status: Option<&RepoStatus>) -> BadgePriority {
    let Some(status) = status else {
        return BadgePriority::Pending;
    };
    match directory_priority("", status) {
        BadgePriority::Clean if status.commits_ahead > 0 => BadgePriority::Ahead,
        priority => priority,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::git::types::{BranchInfo, StatusCode};

    fn file(path: &str, index: StatusCode, worktree: StatusCode) -> FileStatus {
        FileStatus::new(path, index, worktree)
    }

    fn snapshot(files: Vec<FileStatus>, ahead: u32) -> RepoStatus {
        RepoStatus::new("/repo", files, BranchInfo { ahead, behind: 0 })
    }

    #[test]
    fn ordering_is_total_by_rank() {
        use BadgePriority::*;
        let ordered = [Pending, Clean, Ahead, Untracked, Staged, Modified, Conflict];
        for pair in ordered.windows(2) {
            assert!(pair[0] < pair[1], "{:?} < {:?}", pair[0], pair[1]);
        }
        assert_eq!(ordered.iter().max(), Some(&Conflict));
    }

    #[test]
    fn priority_precedence_from_file_status() {
        use StatusCode::*;
        let cases = [
            (file("a", Modified, Unmerged), BadgePriority::Conflict),
            (file("a", Added, Modified), BadgePriority::Modified),
            (file("a", Clean, Deleted), BadgePriority::Modified),
            (file("a", Renamed, Clean), BadgePriority::Staged),
            (file("a", Untracked, Untracked), BadgePriority::Untracked),
            (file("a", Ignored, Ignored), BadgePriority::Clean),
            (file("a", Clean, Clean), BadgePriority::Clean),
        ];
        for (status, expected) in cases {
            assert_eq!(BadgePriority::from(&status), expected, "{status:?}");
        }
    }

    #[test]
    fn no_snapshot_means_no_badge() {
        assert_eq!(resolve_badge("a.txt", None, false), "");
        assert_eq!(resolve_badge("", None, true), "");
        assert_eq!(priority_for("a.txt", None, false), BadgePriority::Pending);
    }

    #[test]
    fn file_lookup() {
        let status = snapshot(
            vec![file("src/main.rs", StatusCode::Clean, StatusCode::Modified)],
            0,
        );
        assert_eq!(resolve_badge("src/main.rs", Some(&status), false), "Modified");
        assert_eq!(resolve_badge("src/other.rs", Some(&status), false), "");
    }

    #[test]
    fn directory_takes_the_worst_file() {
        let status = snapshot(
            vec![
                file("a/x.txt", StatusCode::Clean, StatusCode::Clean),
                file("a/y.txt", StatusCode::Clean, StatusCode::Modified),
                file("a/z.txt", StatusCode::Untracked, StatusCode::Untracked),
            ],
            0,
        );
        assert_eq!(resolve_badge("a", Some(&status), true), "Modified");
    }

    #[test]
    fn directory_prefix_matches_whole_components() {
        let status = snapshot(
            vec![
                file("ab/x.txt", StatusCode::Clean, StatusCode::Modified),
                file("a/deep/y.txt", StatusCode::Added, StatusCode::Clean),
            ],
            0,
        );
        assert_eq!(resolve_badge("a", Some(&status), true), "Staged");
        assert_eq!(resolve_badge("a/deep", Some(&status), true), "Staged");
        assert_eq!(resolve_badge("empty", Some(&status), true), "");
    }

    #[test]
    fn root_directory_covers_everything() {
        let status = snapshot(
            vec![
                file("top.txt", StatusCode::Untracked, StatusCode::Untracked),
                file("d/conflict.txt", StatusCode::Unmerged, StatusCode::Unmerged),
            ],
            0,
        );
        assert_eq!(resolve_badge("", Some(&status), true), "Conflict");
    }

    #[test]
    fn clean_repository_with_unpushed_commits_is_ahead() {
        assert_eq!(repository_priority(None), BadgePriority::Pending);
        assert_eq!(repository_priority(Some(&snapshot(vec![], 0))), BadgePriority::Clean);
        assert_eq!(repository_priority(Some(&snapshot(vec![], 2))), BadgePriority::Ahead);

        let dirty = snapshot(
            vec![file("f", StatusCode::Untracked, StatusCode::Untracked)],
            2,
        );
        assert_eq!(repository_priority(Some(&dirty)), BadgePriority::Untracked);
    }

    #[test]
    fn serializes_snake_case() {
        let json = serde_json::to_value(BadgePriority::Conflict).unwrap();
        assert_eq!(json, serde_json::json!("conflict"));
    }
}
