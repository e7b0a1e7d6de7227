use std::collections::HashSet;
use std::path::PathBuf;
use std::process::ExitCode;
use std::sync::Arc;
use std::time::Duration;
use tokio::runtime::Handle;
use tokio::time::{timeout_at, Instant};
use tracing::{error, warn};

use repo_badges_lib::badge::BadgePriority;
use repo_badges_lib::notify::LogPresenter;
use repo_badges_lib::status::types::StatusEvent;
use repo_badges_lib::{init_tracing, AppState, EngineConfig};

#[tokio::main]
async fn main() -> ExitCode {
    init_tracing();

    let paths: Vec<PathBuf> = std::env::args_os().skip(1).map(PathBuf::from).collect();
    if paths.is_empty() {
        eprintln!("usage: repo-badges <repository>...");
        return ExitCode::from(2);
    }

    let config = EngineConfig::from_env();
    let presenter = Arc::new(LogPresenter);
    let state = AppState::new(&config, Handle::current(), presenter.clone(), presenter);
    if !state.git.is_git_available() {
        error!("Git is not installed");
        return ExitCode::FAILURE;
    }

    let mut events = state.status.subscribe();
    let repos = match state.add_repositories(&paths).await {
        Ok(repos) if !repos.is_empty() => repos,
        Ok(_) => return ExitCode::FAILURE,
        Err(e) => {
            error!(err = %e, "Could not add repositories");
            return ExitCode::FAILURE;
        }
    };

    let mut waiting: HashSet<PathBuf> = repos.iter().map(|r| r.path.clone()).collect();
    let deadline = Instant::now() + config.debounce + config.command_timeout + Duration::from_secs(1);
    while !waiting.is_empty() {
        match timeout_at(deadline, events.recv()).await {
            Ok(Some(StatusEvent::Summary(summary))) => {
                waiting.remove(&summary.path);
            }
            Ok(Some(_)) => {}
            Ok(None) | Err(_) => {
                warn!(pending = waiting.len(), "Gave up waiting for status");
                break;
            }
        }
    }

    for repo in &repos {
        let summary = state.status.summary(&repo.path);
        let label = match summary.status {
            BadgePriority::Pending => "Pending",
            BadgePriority::Clean => "Clean",
            other => other.label(),
        };
        println!(
            "{} [{}] {} ({} ahead)",
            repo.display_name,
            repo.path.display(),
            label,
            summary.commits_ahead
        );

        let Some(snapshot) = state.status.get_cached(&repo.path) else {
            continue;
        };
        let mut files: Vec<_> = snapshot
            .files
            .values()
            .map(|f| (f.path.as_str(), BadgePriority::from(f)))
            .filter(|(_, priority)| *priority > BadgePriority::Clean)
            .collect();
        files.sort_unstable();
        for (path, priority) in files {
            println!("  {:<10} {}", priority.label(), path);
        }
    }

    ExitCode::SUCCESS
}
