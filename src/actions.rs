use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing::{error, info};

use crate::conflict::{conflict_report, ConflictResolver};
use crate::error::GitError;
use crate::git::types::PullOutcome;
use crate::git::GitOperations;
use crate::notify::{ErrorPresenter, NotificationSender};
use crate::state::AppState;
use crate::status;

/// Title for notifications that are not failures.
pub const APP_TITLE: &str = "Repo Badges";

/// What a blocking action needs, detached from `AppState` so it can move
/// onto the blocking pool.
struct ActionContext {
    git: Arc<GitOperations>,
    conflicts: Arc<ConflictResolver>,
    errors: Arc<dyn ErrorPresenter>,
    notifier: Arc<dyn NotificationSender>,
    repo_path: PathBuf,
    repo_name: String,
    auto_push: bool,
}

impl ActionContext {
    fn new(state: &AppState, repo_path: PathBuf, repo_name: String) -> Self {
        Self {
            git: state.git.clone(),
            conflicts: state.conflicts.clone(),
            errors: state.errors.clone(),
            notifier: state.notifier.clone(),
            repo_path,
            repo_name,
            auto_push: state.auto_push,
        }
    }

    fn report<T>(&self, result: Result<T, GitError>) -> Result<T, GitError> {
        result.inspect_err(|e| self.errors.show_error(&e.to_string()))
    }

    fn push_and_notify(&self) -> Result<(), GitError> {
        match self.git.push(&self.repo_path) {
            Ok(()) => {
                self.notifier
                    .send(APP_TITLE, &format!("Pushed to {}", self.repo_name));
                Ok(())
            }
            Err(e) => {
                self.notifier.send("Push Failed", &e.to_string());
                Err(e)
            }
        }
    }
}

/// Owning repository and repo-relative path of `path`.
fn locate(state: &AppState, path: &Path) -> Result<(ActionContext, String), GitError> {
    let Some(repo) = state.repository_for(path) else {
        error!(path = %path.display(), "Path is not inside a watched repository");
        return Err(GitError::NotARepository);
    };
    let file = status::make_relative_path(path, &repo.path);
    Ok((ActionContext::new(state, repo.path, repo.display_name), file))
}

/// Like [`locate`], for actions that take a single file. The repository
/// root itself is rejected.
fn locate_file(state: &AppState, path: &Path) -> Result<(ActionContext, String), GitError> {
    let (ctx, file) = locate(state, path)?;
    if file.is_empty() {
        return Err(GitError::CommandFailed(format!(
            "{} is the repository root, not a file",
            path.display()
        )));
    }
    Ok((ctx, file))
}

type FileOp = fn(&GitOperations, &str, &Path) -> Result<(), GitError>;

async fn file_action(state: &AppState, path: &Path, verb: &str, op: FileOp) -> Result<(), GitError> {
    let (ctx, file) = locate_file(state, path)?;
    info!(repo = %ctx.repo_path.display(), file = %file, action = verb, "Running file action");
    let repo = ctx.repo_path.clone();
    state
        .status
        .perform_action(&repo, move || ctx.report(op(ctx.git.as_ref(), &file, &ctx.repo_path)))
        .await
}

pub async fn stage(state: &AppState, path: &Path) -> Result<(), GitError> {
    file_action(state, path, "Staging", GitOperations::stage).await
}

pub async fn unstage(state: &AppState, path: &Path) -> Result<(), GitError> {
    file_action(state, path, "Unstaging", GitOperations::unstage).await
}

/// Discard local changes to the file at `path`.
pub async fn revert(state: &AppState, path: &Path) -> Result<(), GitError> {
    file_action(state, path, "Reverting", GitOperations::revert).await
}

pub async fn commit_file(state: &AppState, path: &Path, message: &str) -> Result<(), GitError> {
    let (ctx, file) = locate_file(state, path)?;
    let message = checked_message(message)?;
    info!(repo = %ctx.repo_path.display(), file = %file, "Committing file");
    let repo = ctx.repo_path.clone();
    state
        .status
        .perform_action(&repo, move || {
            ctx.report(ctx.git.commit_file(&file, &message, &ctx.repo_path))?;
            if ctx.auto_push {
                ctx.push_and_notify()?;
            }
            Ok(())
        })
        .await
}

/// Stage everything in the repository containing `path`, then commit.
pub async fn commit_all(state: &AppState, path: &Path, message: &str) -> Result<(), GitError> {
    let (ctx, _) = locate(state, path)?;
    let message = checked_message(message)?;
    info!(repo = %ctx.repo_path.display(), "Committing all changes");
    let repo = ctx.repo_path.clone();
    state
        .status
        .perform_action(&repo, move || {
            ctx.report(ctx.git.commit_all(&message, &ctx.repo_path))?;
            if ctx.auto_push {
                ctx.push_and_notify()?;
            }
            Ok(())
        })
        .await
}

pub async fn push(state: &AppState, path: &Path) -> Result<(), GitError> {
    let (ctx, _) = locate(state, path)?;
    let repo = ctx.repo_path.clone();
    state
        .status
        .perform_action(&repo, move || ctx.push_and_notify())
        .await
}

/// Pull, resolving any conflicts by keeping both versions.
pub async fn pull(state: &AppState, path: &Path) -> Result<PullOutcome, GitError> {
    let (ctx, _) = locate(state, path)?;
    let repo = ctx.repo_path.clone();
    state
        .status
        .perform_action(&repo, move || {
            let outcome = ctx.git.pull(&ctx.repo_path).inspect_err(|e| {
                ctx.notifier.send("Pull Failed", &e.to_string());
            })?;

            match &outcome {
                PullOutcome::Conflicts(files) => {
                    let resolutions = ctx
                        .conflicts
                        .resolve_conflicts_now(files, &ctx.repo_path)
                        .inspect_err(|e| {
                            error!(repo = %ctx.repo_path.display(), err = %e, "Conflict resolution failed");
                            ctx.errors
                                .show_error(&format!("Failed to resolve conflicts: {e}"));
                        })?;
                    ctx.notifier
                        .send(&format!("Conflicts in {}", ctx.repo_name), "Local copies saved");
                    ctx.errors
                        .show_info("Conflicts Resolved", &conflict_report(&resolutions));
                }
                PullOutcome::Success(files) if !files.is_empty() => {
                    ctx.notifier.send(
                        APP_TITLE,
                        &format!("Pulled {} updated files from {}", files.len(), ctx.repo_name),
                    );
                }
                PullOutcome::Success(_) => {}
            }
            Ok(outcome)
        })
        .await
}

/// Drop the cached status of the repository containing `path`.
pub fn refresh(state: &AppState, path: &Path) -> Result<(), GitError> {
    let repo = state
        .repository_for(path)
        .ok_or(GitError::NotARepository)?;
    state.status.invalidate(&repo.path);
    Ok(())
}

fn checked_message(message: &str) -> Result<String, GitError> {
    let message = message.trim();
    if message.is_empty() {
        return Err(GitError::CommandFailed("Commit message is empty".into()));
    }
    Ok(message.to_string())
}
