use std::path::PathBuf;
use std::str::FromStr;
use std::time::Duration;
use tracing::warn;

use crate::git::NETWORK_TIMEOUT;
use crate::shell::DEFAULT_TIMEOUT;
use crate::status::DEFAULT_DEBOUNCE;

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct EngineConfig {
    /// Explicit git binary; located automatically when `None`.
    pub git_binary: Option<PathBuf>,
    pub command_timeout: Duration,
    pub network_timeout: Duration,
    pub debounce: Duration,
    /// Push right after a successful commit.
    pub auto_push: bool,
    /// Where conflict backups wait while the merge completes.
    pub staging_dir: Option<PathBuf>,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            git_binary: None,
            command_timeout: DEFAULT_TIMEOUT,
            network_timeout: NETWORK_TIMEOUT,
            debounce: DEFAULT_DEBOUNCE,
            auto_push: true,
            staging_dir: None,
        }
    }
}

impl EngineConfig {
    /// Defaults overlaid with `REPO_BADGES_*` environment variables.
    pub fn from_env() -> Self {
        Self::default().overlay(|key| std::env::var(key).ok())
    }

    fn overlay(mut self, lookup: impl Fn(&str) -> Option<String>) -> Self {
        if let Some(git) = lookup("REPO_BADGES_GIT").filter(|v| !v.is_empty()) {
            self.git_binary = Some(PathBuf::from(git));
        }
        if let Some(secs) = parse::<u64>(&lookup, "REPO_BADGES_TIMEOUT_SECS") {
            self.command_timeout = Duration::from_secs(secs);
        }
        if let Some(secs) = parse::<u64>(&lookup, "REPO_BADGES_NETWORK_TIMEOUT_SECS") {
            self.network_timeout = Duration::from_secs(secs);
        }
        if let Some(ms) = parse::<u64>(&lookup, "REPO_BADGES_DEBOUNCE_MS") {
            self.debounce = Duration::from_millis(ms);
        }
        if let Some(raw) = lookup("REPO_BADGES_AUTO_PUSH") {
            match raw.trim().to_ascii_lowercase().as_str() {
                "1" | "true" | "yes" | "on" => self.auto_push = true,
                "0" | "false" | "no" | "off" => self.auto_push = false,
                _ => warn!(key = "REPO_BADGES_AUTO_PUSH", value = %raw, "Ignoring invalid setting"),
            }
        }
        if let Some(dir) = lookup("REPO_BADGES_STAGING_DIR").filter(|v| !v.is_empty()) {
            self.staging_dir = Some(PathBuf::from(dir));
        }
        self
    }
}

fn parse<T: FromStr>(lookup: &impl Fn(&str) -> Option<String>, key: &str) -> Option<T> {
    let raw = lookup(key)?;
    match raw.trim().parse() {
        Ok(value) => Some(value),
        Err(_) => {
            warn!(key = %key, value = %raw, "Ignoring invalid setting");
            None
        }
    }
}
