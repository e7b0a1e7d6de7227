use chrono::{DateTime, Local};
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing::{info, warn};
use uuid::Uuid;

use crate::error::GitError;
use crate::git::types::ConflictResolution;
use crate::git::GitOperations;

/// Timestamp inside backup names. No colons, so it is valid on every filesystem.
pub const TIMESTAMP_FORMAT: &str = "%Y-%m-%d %H.%M.%S";

/// "Keep both" conflict resolution: the incoming version wins at the original
/// path and the local version is saved next to it under a backup name.
pub struct ConflictResolver {
    git: Arc<GitOperations>,
    staging_dir: PathBuf,
}

impl ConflictResolver {
    /// Backups are staged in `staging_dir`, or the OS temp dir when `None`.
    pub fn new(git: Arc<GitOperations>, staging_dir: Option<PathBuf>) -> Self {
        Self {
            git,
            staging_dir: staging_dir.unwrap_or_else(std::env::temp_dir),
        }
    }

    pub fn resolve_conflicts_now(
        &self,
        files: &[String],
        repo_path: &Path,
    ) -> Result<Vec<ConflictResolution>, GitError> {
        self.resolve_conflicts(files, repo_path, Local::now())
    }

    pub fn resolve_conflicts(
        &self,
        files: &[String],
        repo_path: &Path,
        date: DateTime<Local>,
    ) -> Result<Vec<ConflictResolution>, GitError> {
        let timestamp = date.format(TIMESTAMP_FORMAT).to_string();
        info!(repo = %repo_path.display(), files = ?files, "Resolving conflicts");

        let mut resolutions = Vec::new();
        for file in files {
            if !repo_path.join(file).exists() {
                info!(file = %file, "Conflicted file not on disk, nothing to back up");
                continue;
            }
            match self.stage_backup(file, repo_path, &timestamp) {
                Ok(resolution) => resolutions.push(resolution),
                Err(e) => warn!(file = %file, err = %e, "Could not back up local version"),
            }
        }

        if let Err(e) = self.git.accept_incoming(files, repo_path) {
            for resolution in &resolutions {
                let _ = fs::remove_file(&resolution.backup_path);
            }
            return Err(e);
        }

        for resolution in &mut resolutions {
            if let Err(e) = restore(resolution, repo_path, &timestamp) {
                warn!(
                    file = %resolution.backup_file,
                    staged = %resolution.backup_path.display(),
                    err = %e,
                    "Failed to restore local copy"
                );
            }
        }

        Ok(resolutions)
    }

    /// Write the HEAD version of `file` into the staging directory.
    fn stage_backup(
        &self,
        file: &str,
        repo_path: &Path,
        timestamp: &str,
    ) -> Result<ConflictResolution, GitError> {
        let content = self.git.read_file_at_revision("HEAD", file, repo_path)?;

        let backup_path = self.staging_dir.join(Uuid::new_v4().to_string());
        fs::create_dir_all(&self.staging_dir)
            .and_then(|_| fs::write(&backup_path, content))
            .map_err(|e| GitError::CommandFailed(format!("staging backup of {file}: {e}")))?;

        Ok(ConflictResolution {
            original_file: file.to_string(),
            backup_file: backup_name(file, timestamp),
            backup_path,
        })
    }
}

/// Copy the staged backup into the repository. An existing file under the
/// backup name is never overwritten; a counter is added to the name instead.
fn restore(
    resolution: &mut ConflictResolution,
    repo_path: &Path,
    timestamp: &str,
) -> std::io::Result<()> {
    let mut attempt = 1;
    while repo_path.join(&resolution.backup_file).exists() {
        attempt += 1;
        resolution.backup_file =
            backup_name(&resolution.original_file, &format!("{timestamp} {attempt}"));
    }
    if attempt > 1 {
        warn!(file = %resolution.backup_file, "Backup name taken, using a numbered name");
    }

    fs::copy(
        &resolution.backup_path,
        repo_path.join(&resolution.backup_file),
    )?;
    fs::remove_file(&resolution.backup_path)
}

/// `dir/name.ext` -> `dir/name (Conflict <timestamp>).ext`. Only the last
/// extension moves; names without one get no trailing dot.
pub fn backup_name(file: &str, timestamp: &str) -> String {
    let path = Path::new(file);
    let file_name = path
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_else(|| file.to_string());

    let name = match (path.file_stem(), path.extension()) {
        (Some(stem), Some(ext)) if !ext.is_empty() => format!(
            "{} (Conflict {timestamp}).{}",
            stem.to_string_lossy(),
            ext.to_string_lossy()
        ),
        _ => format!("{file_name} (Conflict {timestamp})"),
    };

    match path.parent() {
        Some(parent) if !parent.as_os_str().is_empty() => {
            format!("{}/{name}", parent.to_string_lossy())
        }
        _ => name,
    }
}

/// Text for the dialog shown after a conflicted pull.
pub fn conflict_report(resolutions: &[ConflictResolution]) -> String {
    if resolutions.is_empty() {
        return String::new();
    }
    let mut report = String::from(
        "The incoming version of each conflicted file was kept. Your local copies were saved as:\n",
    );
    for r in resolutions {
        report.push_str(&format!("\n{} -> {}", r.original_file, r.backup_file));
    }
    report
}
