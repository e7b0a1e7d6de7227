use std::io::Read;
use std::path::{Path, PathBuf};
use std::process::{Command, ExitStatus, Stdio};
use std::sync::OnceLock;
use std::thread::{self, JoinHandle};
use std::time::{Duration, Instant};
use tracing::{debug, error, info, warn};

static GIT_BINARY: OnceLock<Option<PathBuf>> = OnceLock::new();

/// Default timeout for local git commands.
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(30);

const GIT_CANDIDATES: &[&str] = &["/usr/bin/git", "/usr/local/bin/git", "/opt/homebrew/bin/git"];
const RESOLVE_TIMEOUT: Duration = Duration::from_secs(5);
const POLL_INTERVAL: Duration = Duration::from_millis(10);

/// Captured output of a process that ran to completion.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ShellOutput {
    pub exit_code: i32,
    pub stdout: String,
    pub stderr: String,
    /// Raw stdout, for blobs that must not go through text decoding.
    pub stdout_bytes: Vec<u8>,
}

impl ShellOutput {
    pub fn success(&self) -> bool {
        self.exit_code == 0
    }
}

/// Outcome of one executor invocation. Never an `Err`: timeouts and a
/// missing git binary are values callers classify themselves.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum ShellResult {
    Completed(ShellOutput),
    TimedOut,
    GitNotFound,
}

impl ShellResult {
    pub fn ok(stdout: impl Into<String>) -> Self {
        let stdout = stdout.into();
        ShellResult::Completed(ShellOutput {
            exit_code: 0,
            stdout_bytes: stdout.as_bytes().to_vec(),
            stdout,
            stderr: String::new(),
        })
    }

    pub fn failure(stderr: impl Into<String>, exit_code: i32) -> Self {
        ShellResult::Completed(ShellOutput {
            exit_code,
            stdout: String::new(),
            stderr: stderr.into(),
            stdout_bytes: Vec::new(),
        })
    }

    pub fn from_bytes(exit_code: i32, stdout: Vec<u8>, stderr: Vec<u8>) -> Self {
        ShellResult::Completed(ShellOutput {
            exit_code,
            stdout: String::from_utf8_lossy(&stdout).into_owned(),
            stderr: String::from_utf8_lossy(&stderr).into_owned(),
            stdout_bytes: stdout,
        })
    }

    pub fn success(&self) -> bool {
        matches!(self, ShellResult::Completed(output) if output.success())
    }

    pub fn exit_code(&self) -> i32 {
        match self {
            ShellResult::Completed(output) => output.exit_code,
            ShellResult::TimedOut => -1,
            ShellResult::GitNotFound => -2,
        }
    }

    pub fn stdout(&self) -> &str {
        match self {
            ShellResult::Completed(output) => &output.stdout,
            _ => "",
        }
    }

    pub fn stderr(&self) -> &str {
        match self {
            ShellResult::Completed(output) => &output.stderr,
            ShellResult::TimedOut => "Operation timed out",
            ShellResult::GitNotFound => "Git is not installed",
        }
    }

    pub fn stdout_bytes(&self) -> &[u8] {
        match self {
            ShellResult::Completed(output) => &output.stdout_bytes,
            _ => &[],
        }
    }
}

/// Runs git. Implemented by [`ShellGitExecutor`] and by fakes in tests.
pub trait GitExecutor: Send + Sync {
    fn execute(&self, args: &[&str], dir: &Path, timeout: Duration) -> ShellResult;
    fn is_available(&self) -> bool;
}

pub struct ShellGitExecutor {
    git_path: Option<PathBuf>,
}

impl ShellGitExecutor {
    /// Uses the process-wide git binary, located on first use.
    pub fn new() -> Self {
        Self {
            git_path: git_binary().map(Path::to_path_buf),
        }
    }

    pub fn with_binary(git_path: Option<PathBuf>) -> Self {
        Self { git_path }
    }

    pub fn git_path(&self) -> Option<&Path> {
        self.git_path.as_deref()
    }
}

impl Default for ShellGitExecutor {
    fn default() -> Self {
        Self::new()
    }
}

impl GitExecutor for ShellGitExecutor {
    fn execute(&self, args: &[&str], dir: &Path, timeout: Duration) -> ShellResult {
        let Some(git) = self.git_path.as_deref() else {
            error!("Git not found");
            return ShellResult::GitNotFound;
        };

        debug!(args = ?args, dir = %dir.display(), "Executing git");
        let result = run(git, args, Some(dir), timeout);

        match &result {
            ShellResult::TimedOut => {
                error!(args = ?args, timeout_ms = timeout.as_millis() as u64, "Git command timed out");
            }
            ShellResult::Completed(output) if !output.success() => {
                warn!(
                    args = ?args,
                    exit_code = output.exit_code,
                    stderr = %output.stderr.trim(),
                    "Git command failed"
                );
            }
            _ => {}
        }

        result
    }

    fn is_available(&self) -> bool {
        self.git_path.is_some()
    }
}

/// Returns the git binary, located once per process.
///
/// Well-known install locations are checked first, then the process `PATH`.
/// Apps started from a desktop launcher inherit a minimal `PATH`
/// (`/usr/bin:/bin:/usr/sbin:/sbin`), so as a last resort the user's login
/// shell is asked for its `PATH` and searched as well.
pub fn git_binary() -> Option<&'static Path> {
    GIT_BINARY.get_or_init(locate_git).as_deref()
}

fn locate_git() -> Option<PathBuf> {
    for candidate in GIT_CANDIDATES {
        let path = Path::new(candidate);
        if is_executable(path) {
            info!(path = %path.display(), "Found git");
            return Some(path.to_path_buf());
        }
    }

    if let Ok(path) = which::which("git") {
        info!(path = %path.display(), "Found git on PATH");
        return Some(path);
    }

    if let Some(login) = login_path() {
        let cwd = std::env::current_dir().unwrap_or_else(|_| PathBuf::from("/"));
        if let Ok(path) = which::which_in("git", Some(login), cwd) {
            info!(path = %path.display(), "Found git on login shell PATH");
            return Some(path);
        }
    }

    error!("Git not found in any known location");
    None
}

#[cfg(unix)]
fn is_executable(path: &Path) -> bool {
    use std::os::unix::fs::PermissionsExt;
    path.metadata()
        .map(|m| m.is_file() && m.permissions().mode() & 0o111 != 0)
        .unwrap_or(false)
}

#[cfg(not(unix))]
fn is_executable(path: &Path) -> bool {
    path.is_file()
}

/// Resolve PATH by running the user's login shell with `-lc`.
///
/// `-i` is avoided: it needs a TTY and hangs with prompt
/// plugins such as Powerlevel10k.
fn login_path() -> Option<String> {
    let shell = std::env::var("SHELL").unwrap_or_else(|_| "/bin/sh".to_string());
    let result = run(
        Path::new(&shell),
        &["-lc", r#"printf "BADGES_PATH:%s\n" "$PATH""#],
        None,
        RESOLVE_TIMEOUT,
    );

    if !result.success() {
        warn!(shell = %shell, "Login shell did not report a PATH");
        return None;
    }

    let path = result
        .stdout()
        .lines()
        .find_map(|line| line.strip_prefix("BADGES_PATH:"))
        .filter(|p| !p.is_empty() && !is_minimal_path(p))?;

    info!(path = %path, shell = %shell, "Resolved login shell PATH");
    Some(path.to_string())
}

/// True if the PATH holds only the system directories a launcher provides.
fn is_minimal_path(path: &str) -> bool {
    let entries: Vec<&str> = path.split(':').collect();
    entries
        .iter()
        .all(|e| matches!(*e, "/usr/bin" | "/bin" | "/usr/sbin" | "/sbin"))
        && entries.len() <= 4
}

enum Wait {
    Exited(ExitStatus),
    Expired,
    Failed(String),
}

/// Spawn `program` and collect its output, killing it once `timeout` passes.
fn run(program: &Path, args: &[&str], dir: Option<&Path>, timeout: Duration) -> ShellResult {
    let mut command = Command::new(program);
    command
        .args(args)
        .stdin(Stdio::null())
        .stdout(Stdio::piped())
        .stderr(Stdio::piped());
    if let Some(dir) = dir {
        command.current_dir(dir);
    }

    let mut child = match command.spawn() {
        Ok(child) => child,
        Err(e) => {
            error!(program = %program.display(), err = %e, "Failed to spawn");
            return ShellResult::failure(e.to_string(), -1);
        }
    };

    // Either pipe can fill its OS buffer and stall the child, so both drain
    // on their own threads while this one waits.
    let stdout = drain("stdout", child.stdout.take());
    let stderr = drain("stderr", child.stderr.take());

    let deadline = Instant::now() + timeout;
    let wait = loop {
        match child.try_wait() {
            Ok(Some(status)) => break Wait::Exited(status),
            Ok(None) if Instant::now() >= deadline => {
                let _ = child.kill();
                let _ = child.wait();
                break Wait::Expired;
            }
            Ok(None) => thread::sleep(POLL_INTERVAL),
            Err(e) => {
                warn!(program = %program.display(), err = %e, "Error waiting for process");
                let _ = child.kill();
                let _ = child.wait();
                break Wait::Failed(e.to_string());
            }
        }
    };

    // Join the drains in every case so no reader thread is left blocked.
    let stdout_bytes = collect(stdout);
    let stderr_bytes = collect(stderr);

    match wait {
        Wait::Exited(status) => {
            ShellResult::from_bytes(status.code().unwrap_or(-1), stdout_bytes, stderr_bytes)
        }
        Wait::Expired => ShellResult::TimedOut,
        Wait::Failed(message) => ShellResult::failure(message, -1),
    }
}

fn drain<R: Read + Send + 'static>(name: &str, pipe: Option<R>) -> Option<JoinHandle<Vec<u8>>> {
    let mut pipe = pipe?;
    thread::Builder::new()
        .name(format!("git-{name}-drain"))
        .spawn(move || {
            let mut buf = Vec::new();
            if let Err(e) = pipe.read_to_end(&mut buf) {
                warn!(err = %e, "Failed to drain pipe");
            }
            buf
        })
        .map_err(|e| error!(err = %e, "Failed to spawn drain thread"))
        .ok()
}

fn collect(handle: Option<JoinHandle<Vec<u8>>>) -> Vec<u8> {
    handle
        .and_then(|h| h.join().map_err(|_| error!("Drain thread panicked")).ok())
        .unwrap_or_default()
}
