use parking_lot::Mutex;
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio::runtime::Handle;

use crate::config::EngineConfig;
use crate::notify::{ErrorPresenter, NotificationSender};
use crate::shell::{GitExecutor, ShellResult};
use crate::state::AppState;

/// Executor double: answers stubbed argument vectors, records every call.
/// Unstubbed commands succeed with empty output.
pub(crate) struct FakeExecutor {
    stubs: Mutex<HashMap<Vec<String>, ShellResult>>,
    calls: Mutex<Vec<Call>>,
    available: AtomicBool,
}

#[derive(Clone, Debug)]
pub(crate) struct Call {
    pub args: Vec<String>,
    pub dir: PathBuf,
    pub timeout: Duration,
}

impl FakeExecutor {
    pub fn new() -> Self {
        Self {
            stubs: Mutex::new(HashMap::new()),
            calls: Mutex::new(Vec::new()),
            available: AtomicBool::new(true),
        }
    }

    pub fn stub(&self, args: &[&str], result: ShellResult) {
        self.stubs.lock().insert(owned(args), result);
    }

    pub fn set_available(&self, available: bool) {
        self.available.store(available, Ordering::SeqCst);
    }

    pub fn calls(&self) -> Vec<Call> {
        self.calls.lock().clone()
    }

    pub fn commands(&self) -> Vec<Vec<String>> {
        self.calls.lock().iter().map(|c| c.args.clone()).collect()
    }

    /// Number of calls whose arguments contain `arg`.
    pub fn count(&self, arg: &str) -> usize {
        self.calls
            .lock()
            .iter()
            .filter(|c| c.args.iter().any(|a| a == arg))
            .count()
    }
}

impl GitExecutor for FakeExecutor {
    fn execute(&self, args: &[&str], dir: &Path, timeout: Duration) -> ShellResult {
        self.calls.lock().push(Call {
            args: owned(args),
            dir: dir.to_path_buf(),
            timeout,
        });
        if !self.is_available() {
            return ShellResult::GitNotFound;
        }
        self.stubs
            .lock()
            .get(&owned(args))
            .cloned()
            .unwrap_or_else(|| ShellResult::ok(""))
    }

    fn is_available(&self) -> bool {
        self.available.load(Ordering::SeqCst)
    }
}

fn owned(args: &[&str]) -> Vec<String> {
    args.iter().map(|a| a.to_string()).collect()
}

/// Collaborator double recording every dialog and notification.
#[derive(Default)]
pub(crate) struct Recorder {
    pub errors: Mutex<Vec<String>>,
    pub infos: Mutex<Vec<(String, String)>>,
    pub notifications: Mutex<Vec<(String, String)>>,
}

impl ErrorPresenter for Recorder {
    fn show_error(&self, message: &str) {
        self.errors.lock().push(message.to_string());
    }

    fn show_info(&self, title: &str, message: &str) {
        self.infos.lock().push((title.to_string(), message.to_string()));
    }
}

impl NotificationSender for Recorder {
    fn send(&self, title: &str, body: &str) {
        self.notifications
            .lock()
            .push((title.to_string(), body.to_string()));
    }
}

/// App state over `fake` with a short debounce, reporting to `recorder`.
pub(crate) fn app_state(fake: &Arc<FakeExecutor>, recorder: &Arc<Recorder>) -> AppState {
    let config = EngineConfig {
        debounce: Duration::from_millis(20),
        ..EngineConfig::default()
    };
    AppState::with_executor(
        fake.clone(),
        &config,
        Handle::current(),
        recorder.clone(),
        recorder.clone(),
    )
}
