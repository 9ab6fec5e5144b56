/// Suite runner error types
use std::path::PathBuf;
use thiserror::Error;

/// Fatal errors raised while locating artifacts.
///
/// Any of these aborts the run before a backend is invoked.
#[derive(Debug, Error)]
pub enum DiscoveryError {
    #[error("Root directory for group '{group}' not found: {path}")]
    RootNotFound { group: String, path: PathBuf },

    #[error("Root for group '{group}' is not a directory: {path}")]
    NotADirectory { group: String, path: PathBuf },

    #[error("Cannot read root directory for group '{group}' at {path}: {error}")]
    Unreadable {
        group: String,
        path: PathBuf,
        error: std::io::Error,
    },

    #[error("Artifact for group '{group}' not found: {path}")]
    ArtifactNotFound { group: String, path: PathBuf },
}

/// Per-group backend failures. Never fatal to the rest of the suite.
#[derive(Debug, Clone, Error)]
pub enum BackendError {
    #[error("Backend '{backend}' could not run group '{group}': {reason}")]
    Invocation {
        group: String,
        backend: String,
        reason: String,
    },

    #[error("Group '{group}' failed: backend '{backend}' {}", describe_exit(.exit_code))]
    TestFailure {
        group: String,
        backend: String,
        exit_code: Option<i32>,
    },
}

/// Coarse classification of a [`BackendError`]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FailureKind {
    /// The backend could not be started or did not finish
    Invocation,
    /// The backend ran and reported failing tests
    TestFailure,
}

impl FailureKind {
    /// Stable identifier used in reports
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Invocation => "invocation",
            Self::TestFailure => "test-failure",
        }
    }
}

impl DiscoveryError {
    /// Create an unreadable-root error
    pub fn unreadable(group: impl Into<String>, path: impl Into<PathBuf>, error: std::io::Error) -> Self {
        Self::Unreadable {
            group: group.into(),
            path: path.into(),
            error,
        }
    }
}

impl BackendError {
    /// Create an invocation error
    pub fn invocation(
        group: impl Into<String>,
        backend: impl Into<String>,
        reason: impl ToString,
    ) -> Self {
        Self::Invocation {
            group: group.into(),
            backend: backend.into(),
            reason: reason.to_string(),
        }
    }

    /// Which class of failure this is
    pub fn kind(&self) -> FailureKind {
        match self {
            Self::Invocation { .. } => FailureKind::Invocation,
            Self::TestFailure { .. } => FailureKind::TestFailure,
        }
    }

    /// Exit code reported by the backend, if it ran to completion
    pub fn exit_code(&self) -> Option<i32> {
        match self {
            Self::TestFailure { exit_code, .. } => *exit_code,
            Self::Invocation { .. } => None,
        }
    }
}

fn describe_exit(code: &Option<i32>) -> String {
    match code {
        Some(code) => format!("exited with code {}", code),
        None => "was terminated by a signal".to_string(),
    }
}
