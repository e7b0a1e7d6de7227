pub mod actions;
pub mod badge;
pub mod config;
pub mod conflict;
pub mod error;
pub mod git;
pub mod notify;
pub mod shell;
pub mod state;
pub mod status;

#[cfg(test)]
mod test_support;

pub use config::EngineConfig;
pub use error::GitError;
pub use git::GitOperations;
pub use state::AppState;
pub use status::StatusManager;

use tracing_subscriber::EnvFilter;

/// Install the global fmt subscriber. `RUST_LOG` overrides the default filter.
pub fn init_tracing() {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new("repo_badges_lib=info")),
        )
        .init();
}
