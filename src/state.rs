use chrono::{DateTime, Utc};
use parking_lot::Mutex;
use serde::Serialize;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tokio::runtime::Handle;
use tracing::info;
use uuid::Uuid;

use crate::config::EngineConfig;
use crate::conflict::ConflictResolver;
use crate::error::GitError;
use crate::git::GitOperations;
use crate::notify::{ErrorPresenter, NotificationSender};
use crate::shell::{GitExecutor, ShellGitExecutor};
use crate::status::types::RepoStatusSummary;
use crate::status::StatusManager;

#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct WatchedRepository {
    pub id: Uuid,
    pub path: PathBuf,
    pub display_name: String,
    pub date_added: DateTime<Utc>,
}

/// Everything the engine needs, constructed once and passed around.
pub struct AppState {
    pub git: Arc<GitOperations>,
    pub status: StatusManager,
    pub conflicts: Arc<ConflictResolver>,
    pub errors: Arc<dyn ErrorPresenter>,
    pub notifier: Arc<dyn NotificationSender>,
    pub auto_push: bool,
    repositories: Mutex<Vec<WatchedRepository>>,
}

impl AppState {
    pub fn new(
        config: &EngineConfig,
        runtime: Handle,
        errors: Arc<dyn ErrorPresenter>,
        notifier: Arc<dyn NotificationSender>,
    ) -> Self {
        let executor = match &config.git_binary {
            Some(git) => ShellGitExecutor::with_binary(Some(git.clone())),
            None => ShellGitExecutor::new(),
        };
        Self::with_executor(Arc::new(executor), config, runtime, errors, notifier)
    }

    pub fn with_executor(
        executor: Arc<dyn GitExecutor>,
        config: &EngineConfig,
        runtime: Handle,
        errors: Arc<dyn ErrorPresenter>,
        notifier: Arc<dyn NotificationSender>,
    ) -> Self {
        let git = Arc::new(
            GitOperations::new(executor)
                .with_timeouts(config.command_timeout, config.network_timeout),
        );
        Self {
            status: StatusManager::new(git.clone(), runtime, config.debounce),
            conflicts: Arc::new(ConflictResolver::new(git.clone(), config.staging_dir.clone())),
            git,
            errors,
            notifier,
            auto_push: config.auto_push,
            repositories: Mutex::new(Vec::new()),
        }
    }

    pub fn repositories(&self) -> Vec<WatchedRepository> {
        self.repositories.lock().clone()
    }

    /// Validate and watch `paths`, queueing a first refresh for each new one.
    /// Folders that are not repositories are reported in a single error.
    pub async fn add_repositories(
        &self,
        paths: &[PathBuf],
    ) -> Result<Vec<WatchedRepository>, GitError> {
        let candidates: Vec<PathBuf> = paths
            .iter()
            .map(|p| normalize(p))
            .filter(|p| !self.is_watched(p))
            .collect();

        let git = self.git.clone();
        let checked = tokio::task::spawn_blocking(move || {
            candidates
                .into_iter()
                .map(|path| {
                    let name = git.is_repository(&path).then(|| git.display_name(&path));
                    (path, name)
                })
                .collect::<Vec<_>>()
        })
        .await?;

        let mut added = Vec::new();
        let mut invalid = Vec::new();
        for (path, name) in checked {
            let Some(display_name) = name else {
                invalid.push(folder_name(&path));
                continue;
            };
            if self.is_watched(&path) {
                continue;
            }

            let repo = WatchedRepository {
                id: Uuid::new_v4(),
                display_name,
                path,
                date_added: Utc::now(),
            };
            info!(repo = %repo.path.display(), name = %repo.display_name, "Watching repository");
            self.repositories.lock().push(repo.clone());
            self.status.queue_refresh(&repo.path);
            added.push(repo);
        }

        match invalid.as_slice() {
            [] => {}
            [one] => self.errors.show_error(&format!("'{one}' is not a Git repository.")),
            many => self.errors.show_error(&format!(
                "The following folders are not Git repositories:\n{}",
                many.join("\n")
            )),
        }

        Ok(added)
    }

    /// Stop watching `path` and purge its cached status.
    pub fn remove_repository(&self, path: &Path) -> bool {
        let path = normalize(path);
        let removed = {
            let mut repos = self.repositories.lock();
            let before = repos.len();
            repos.retain(|r| r.path != path);
            repos.len() != before
        };
        if removed {
            self.status.remove_repository(&path);
        }
        removed
    }

    /// The watched repository containing `path`; nested repositories win
    /// over their parents.
    pub fn repository_for(&self, path: &Path) -> Option<WatchedRepository> {
        let path = normalize(path);
        self.repositories
            .lock()
            .iter()
            .filter(|r| path.starts_with(&r.path))
            .max_by_key(|r| r.path.components().count())
            .cloned()
    }

    /// Current badge for `path`, tracking it for future updates.
    pub fn badge_for_path(&self, path: &Path) -> &'static str {
        let Some(repo) = self.repository_for(path) else {
            return "";
        };
        let path = normalize(path);
        self.status.track_path(&path, &repo.path);
        if self.status.get_cached(&repo.path).is_none() {
            self.status.queue_refresh(&repo.path);
        }
        self.status.badge_for(&path, &repo.path)
    }

    pub fn summaries(&self) -> Vec<RepoStatusSummary> {
        self.repositories()
            .iter()
            .map(|r| self.status.summary(&r.path))
            .collect()
    }

    fn is_watched(&self, path: &Path) -> bool {
        self.repositories.lock().iter().any(|r| r.path == path)
    }
}

/// Canonical form of `path`. Missing trailing components are kept as
/// given on top of the canonical form of the nearest existing ancestor.
fn normalize(path: &Path) -> PathBuf {
    if let Ok(canonical) = std::fs::canonicalize(path) {
        return canonical;
    }
    match (path.parent(), path.file_name()) {
        (Some(parent), Some(name)) if !parent.as_os_str().is_empty() => normalize(parent).join(name),
        _ => path.to_path_buf(),
    }
}

fn folder_name(path: &Path) -> String {
    path.file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_else(|| path.display().to_string())
}
