pub mod types;

use parking_lot::Mutex;
use std::collections::{HashMap, HashSet};
use std::path::{Component, Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;
use tokio::runtime::Handle;
use tokio::sync::mpsc::{self, UnboundedReceiver, UnboundedSender};
use tokio::task::AbortHandle;
use tracing::{debug, info, warn};

use crate::badge;
use crate::error::GitError;
use crate::git::types::RepoStatus;
use crate::git::GitOperations;
use types::{RepoStatusSummary, StatusEvent};

/// Window in which repeated refresh requests collapse into one status query.
pub const DEFAULT_DEBOUNCE: Duration = Duration::from_millis(500);

/// Per-repository status cache with debounced background refresh.
///
/// Snapshots are replaced wholesale. A failed refresh keeps the previous
/// snapshot. Results are pushed to subscribers as [`StatusEvent`]s.
#[derive(Clone)]
pub struct StatusManager {
    inner: Arc<Inner>,
}

struct Inner {
    git: Arc<GitOperations>,
    runtime: Handle,
    debounce: Duration,
    state: Mutex<State>,
}

#[derive(Default)]
struct State {
    snapshots: HashMap<PathBuf, Arc<RepoStatus>>,
    /// Repository -> paths whose badges someone asked for.
    tracked: HashMap<PathBuf, HashSet<PathBuf>>,
    pending: HashSet<PathBuf>,
    tasks: HashMap<PathBuf, AbortHandle>,
    /// Bumped on invalidation and removal. A status query started under an
    /// older generation is dropped when it completes.
    generations: HashMap<PathBuf, u64>,
    subscribers: Vec<UnboundedSender<StatusEvent>>,
}

impl State {
    fn generation(&self, repo: &Path) -> u64 {
        self.generations.get(repo).copied().unwrap_or(0)
    }

    fn bump_generation(&mut self, repo: &Path) {
        *self.generations.entry(repo.to_path_buf()).or_insert(0) += 1;
    }
}

impl StatusManager {
    pub fn new(git: Arc<GitOperations>, runtime: Handle, debounce: Duration) -> Self {
        Self {
            inner: Arc::new(Inner {
                git,
                runtime,
                debounce,
                state: Mutex::new(State::default()),
            }),
        }
    }

    pub fn subscribe(&self) -> UnboundedReceiver<StatusEvent> {
        let (tx, rx) = mpsc::unbounded_channel();
        self.inner.state.lock().subscribers.push(tx);
        rx
    }

    pub fn get_cached(&self, repo: &Path) -> Option<Arc<RepoStatus>> {
        self.inner.state.lock().snapshots.get(repo).cloned()
    }

    /// Publish badge updates for `path` after every refresh of `repo`.
    pub fn track_path(&self, path: &Path, repo: &Path) {
        self.inner
            .state
            .lock()
            .tracked
            .entry(repo.to_path_buf())
            .or_default()
            .insert(path.to_path_buf());
    }

    /// Schedule a refresh after the debounce window. No-op while one is
    /// already pending for `repo`.
    pub fn queue_refresh(&self, repo: &Path) {
        let mut state = self.inner.state.lock();
        if !state.pending.insert(repo.to_path_buf()) {
            debug!(repo = %repo.display(), "Refresh already pending");
            return;
        }

        let this = self.clone();
        let target = repo.to_path_buf();
        let task = self.inner.runtime.spawn(async move {
            tokio::time::sleep(this.inner.debounce).await;
            this.refresh(target).await;
        });
        state.tasks.insert(repo.to_path_buf(), task.abort_handle());
    }

    /// Drop the snapshot and schedule a refresh. A query already in flight
    /// for `repo` will not be applied.
    pub fn invalidate(&self, repo: &Path) {
        {
            let mut state = self.inner.state.lock();
            state.snapshots.remove(repo);
            state.bump_generation(repo);
        }
        self.queue_refresh(repo);
    }

    /// Forget everything about `repo` and cancel its scheduled refresh.
    pub fn remove_repository(&self, repo: &Path) {
        let mut state = self.inner.state.lock();
        state.snapshots.remove(repo);
        state.tracked.remove(repo);
        state.pending.remove(repo);
        if let Some(task) = state.tasks.remove(repo) {
            task.abort();
        }
        state.bump_generation(repo);
        info!(repo = %repo.display(), "Repository removed from status cache");
    }

    /// Run a mutating action on the blocking pool, then invalidate `repo`.
    /// The cache is invalidated whether or not the action succeeded.
    pub async fn perform_action<T, F>(&self, repo: &Path, action: F) -> Result<T, GitError>
    where
        F: FnOnce() -> Result<T, GitError> + Send + 'static,
        T: Send + 'static,
    {
        let result = self.inner.runtime.spawn_blocking(action).await;
        self.invalidate(repo);
        result?
    }

    /// Badge label for `path` from the cached snapshot of `repo`.
    pub fn badge_for(&self, path: &Path, repo: &Path) -> &'static str {
        let relative = make_relative_path(path, repo);
        let snapshot = self.get_cached(repo);
        badge::resolve_badge(&relative, snapshot.as_deref(), path.is_dir())
    }

    pub fn summary(&self, repo: &Path) -> RepoStatusSummary {
        summarize(repo, self.get_cached(repo).as_deref())
    }

    async fn refresh(&self, repo: PathBuf) {
        // Requests arriving from here on schedule a new refresh.
        let generation = {
            let mut state = self.inner.state.lock();
            state.pending.remove(&repo);
            state.generation(&repo)
        };

        let git = self.inner.git.clone();
        let path = repo.clone();
        let result = self
            .inner
            .runtime
            .spawn_blocking(move || git.status(&path))
            .await
            .map_err(GitError::from)
            .and_then(|status| status);

        match result {
            Ok(status) => self.apply(repo, generation, status),
            Err(e) => warn!(repo = %repo.display(), err = %e, "Status refresh failed, keeping previous snapshot"),
        }
    }

    fn apply(&self, repo: PathBuf, generation: u64, status: RepoStatus) {
        let status = Arc::new(status);
        let tracked = {
            let mut state = self.inner.state.lock();
            if state.generation(&repo) != generation {
                debug!(repo = %repo.display(), "Discarding status from before invalidation");
                return;
            }
            state.snapshots.insert(repo.clone(), status.clone());
            state.tracked.get(&repo).cloned().unwrap_or_default()
        };

        debug!(repo = %repo.display(), files = status.files.len(), "Status refreshed");

        let mut events: Vec<StatusEvent> = tracked
            .into_iter()
            .map(|path| {
                let relative = make_relative_path(&path, &repo);
                let badge = badge::resolve_badge(&relative, Some(&status), path.is_dir());
                StatusEvent::Badge {
                    path,
                    badge: badge.to_string(),
                }
            })
            .collect();
        events.push(StatusEvent::Summary(summarize(&repo, Some(&status))));

        self.publish(events);
    }

    fn publish(&self, events: Vec<StatusEvent>) {
        let mut state = self.inner.state.lock();
        state
            .subscribers
            .retain(|tx| events.iter().all(|event| tx.send(event.clone()).is_ok()));
    }
}

fn summarize(repo: &Path, status: Option<&RepoStatus>) -> RepoStatusSummary {
    RepoStatusSummary {
        path: repo.to_path_buf(),
        status: badge::repository_priority(status),
        commits_ahead: status.map(|s| s.commits_ahead).unwrap_or(0),
        updated_at: status.map(|s| s.timestamp),
    }
}

/// `file` relative to `repo`, `/`-separated. The repository root maps to
/// `""`; paths outside `repo` are returned unchanged.
pub fn make_relative_path(file: &Path, repo: &Path) -> String {
    match file.strip_prefix(repo) {
        Ok(relative) => relative
            .components()
            .filter_map(|c| match c {
                Component::Normal(part) => Some(part.to_string_lossy()),
                _ => None,
            })
            .collect::<Vec<_>>()
            .join("/"),
        Err(_) => file.to_string_lossy().into_owned(),
    }
}
