use chrono::{DateTime, Utc};
use serde::Serialize;
use std::path::PathBuf;

use crate::badge::BadgePriority;

/// Published to subscribers after each successful refresh.
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
#[serde(tag = "event", rename_all = "snake_case")]
pub enum StatusEvent {
    /// New badge for a tracked path.
    Badge { path: PathBuf, badge: String },
    /// Once per refresh, for the repository as a whole.
    Summary(RepoStatusSummary),
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct RepoStatusSummary {
    pub path: PathBuf,
    pub status: BadgePriority,
    pub commits_ahead: u32,
    /// Time of the snapshot this summary was computed from.
    pub updated_at: Option<DateTime<Utc>>,
}
