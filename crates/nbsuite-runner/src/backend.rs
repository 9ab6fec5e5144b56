//! Backend execution - hand a run group to an external test process
//!
//! The backend's own output is passed through untouched; only its exit
//! status is interpreted.

use crate::error::BackendError;
use crate::group::RunGroup;
use nbsuite_config::BackendConfig;
use std::io;
use std::path::PathBuf;
use std::process::{Child, Command, ExitStatus, Stdio};
use std::thread;
use std::time::{Duration, Instant};

/// How often a child is polled while a timeout is armed
const POLL_INTERVAL: Duration = Duration::from_millis(100);

/// How a backend process finished
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BackendStatus {
    /// Whether the backend reported success
    pub success: bool,
    /// Exit code, if the process exited normally
    pub exit_code: Option<i32>,
}

impl BackendStatus {
    /// A successful run
    pub fn passed() -> Self {
        Self {
            success: true,
            exit_code: Some(0),
        }
    }

    /// A run that exited with `code`
    pub fn exited(code: i32) -> Self {
        Self {
            success: code == 0,
            exit_code: Some(code),
        }
    }
}

impl From<ExitStatus> for BackendStatus {
    fn from(status: ExitStatus) -> Self {
        Self {
            success: status.success(),
            exit_code: status.code(),
        }
    }
}

/// An external test executor
pub trait Backend {
    /// Executes every artifact of `group` in a single invocation.
    ///
    /// Errors only when the backend could not run at all; failing tests are
    /// reported through the returned status.
    fn invoke(&self, group: &RunGroup) -> Result<BackendStatus, BackendError>;
}

/// Runs a program with the group's artifact paths appended to its arguments
#[derive(Debug, Clone)]
pub struct CommandBackend {
    /// Backend name, used in errors
    name: String,
    /// Executable to spawn
    program: String,
    /// Arguments placed before the artifact paths
    args: Vec<String>,
    /// Working directory for the child
    current_dir: Option<PathBuf>,
    /// Wall-clock limit for one invocation
    timeout: Option<Duration>,
    /// Send the child's stdout to our stderr
    stdout_to_stderr: bool,
}

impl CommandBackend {
    /// Create a backend running `program`
    pub fn new(name: impl Into<String>, program: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            program: program.into(),
            args: Vec::new(),
            current_dir: None,
            timeout: None,
            stdout_to_stderr: false,
        }
    }

    /// Build from configuration
    pub fn from_config(name: impl Into<String>, config: &BackendConfig) -> Self {
        Self::new(name, config.program.clone())
            .with_args(config.args.iter().cloned())
            .with_timeout(config.timeout_secs.map(Duration::from_secs))
    }

    /// Set leading arguments
    pub fn with_args<I, S>(mut self, args: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.args = args.into_iter().map(Into::into).collect();
        self
    }

    /// Set the child's working directory
    pub fn with_current_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.current_dir = Some(dir.into());
        self
    }

    /// Set the timeout; a hung backend becomes an invocation error
    pub fn with_timeout(mut self, timeout: Option<Duration>) -> Self {
        self.timeout = timeout;
        self
    }

    /// Keep stdout free for machine-readable output
    pub fn with_stdout_to_stderr(mut self, enabled: bool) -> Self {
        self.stdout_to_stderr = enabled;
        self
    }

    /// Backend name
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Command line for a group, for display
    pub fn command_line(&self, group: &RunGroup) -> Vec<String> {
        std::iter::once(self.program.clone())
            .chain(self.args.iter().cloned())
            .chain(group.paths().map(|p| p.display().to_string()))
            .collect()
    }

    fn command(&self, group: &RunGroup) -> Command {
        let mut command = Command::new(&self.program);
        command
            .args(&self.args)
            .args(group.paths())
            .env("NBSUITE_GROUP", &group.name)
            .stdin(Stdio::null());

        if let Some(dir) = &self.current_dir {
            command.current_dir(dir);
        }
        if self.stdout_to_stderr {
            command.stdout(Stdio::from(io::stderr()));
        }
        #[cfg(unix)]
        {
            use std::os::unix::process::CommandExt;
            // Own process group so a timeout also reaches kernels the backend
            // started. Without a timeout the backend stays in the terminal's
            // group and receives Ctrl+C directly.
            if self.timeout.is_some() {
                command.process_group(0);
            }
        }
        command
    }

    fn wait(&self, child: &mut Child) -> io::Result<Option<ExitStatus>> {
        let Some(timeout) = self.timeout else {
            return child.wait().map(Some);
        };

        // A deadline past what Instant can represent never arrives
        let Some(deadline) = Instant::now().checked_add(timeout) else {
            return child.wait().map(Some);
        };
        loop {
            if let Some(status) = child.try_wait()? {
                return Ok(Some(status));
            }
            if Instant::now() >= deadline {
                return Ok(None);
            }
            thread::sleep(POLL_INTERVAL);
        }
    }
}

impl Backend for CommandBackend {
    fn invoke(&self, group: &RunGroup) -> Result<BackendStatus, BackendError> {
        tracing::info!(
            group = %group.name,
            backend = %self.name,
            program = %self.program,
            artifacts = group.len(),
            "invoking backend"
        );

        let mut child = self.command(group).spawn().map_err(|e| {
            BackendError::invocation(
                &group.name,
                &self.name,
                format!("failed to start '{}': {}", self.program, e),
            )
        })?;

        let status = self.wait(&mut child).map_err(|e| {
            BackendError::invocation(
                &group.name,
                &self.name,
                format!("failed waiting for '{}': {}", self.program, e),
            )
        })?;

        match status {
            Some(status) => {
                tracing::debug!(group = %group.name, status = %status, "backend finished");
                Ok(status.into())
            }
            None => {
                // Reap the child so a hung backend does not outlive the run
                kill_tree(&mut child);
                let _ = child.wait();
                let timeout = self.timeout.unwrap_or_default();
                tracing::warn!(group = %group.name, ?timeout, "backend timed out");
                Err(BackendError::invocation(
                    &group.name,
                    &self.name,
                    format!("timed out after {}s", timeout.as_secs()),
                ))
            }
        }
    }
}

/// Kill the backend and every process in its group
#[cfg(unix)]
fn kill_tree(child: &mut Child) {
    if let Ok(pgid) = libc::pid_t::try_from(child.id()) {
        // SAFETY: kill has no memory-safety preconditions
        if unsafe { libc::kill(-pgid, libc::SIGKILL) } == 0 {
            return;
        }
    }
    let _ = child.kill();
}

#[cfg(not(unix))]
fn kill_tree(child: &mut Child) {
    let _ = child.kill();
}
