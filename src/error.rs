use serde::Serialize;

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum GitError {
    #[error("Not a Git repository")]
    NotARepository,

    #[error("Git is not installed. Please install Git from git-scm.com or your package manager")]
    GitNotInstalled,

    #[error("Git command failed: {0}")]
    CommandFailed(String),

    #[error("Push failed: {0}")]
    PushFailed(String),

    #[error("Pull failed: {0}")]
    PullFailed(String),

    #[error("Operation timed out")]
    TimedOut,

    #[error("Repository not accessible: {0}")]
    RepoNotAccessible(String),
}

impl GitError {
    /// Timeouts are worth retrying; everything else needs the user to fix something.
    pub fn is_retryable(&self) -> bool {
        matches!(self, GitError::TimedOut)
    }
}

impl From<tokio::task::JoinError> for GitError {
    fn from(err: tokio::task::JoinError) -> Self {
        GitError::CommandFailed(err.to_string())
    }
}

impl Serialize for GitError {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: serde::Serializer,
    {
        serializer.serialize_str(&self.to_string())
    }
}
