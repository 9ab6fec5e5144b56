//! Artifacts - test files handed to a backend

use std::borrow::Cow;
use std::ffi::OsStr;
use std::path::{Path, PathBuf};

/// A discovered test file
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct Artifact {
    path: PathBuf,
    group: String,
}

impl Artifact {
    /// Create an artifact belonging to `group`
    pub fn new(path: impl Into<PathBuf>, group: impl Into<String>) -> Self {
        Self {
            path: path.into(),
            group: group.into(),
        }
    }

    /// Path as discovered (root-relative roots yield relative paths)
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Name of the run group this artifact was discovered for
    pub fn group(&self) -> &str {
        &self.group
    }

    /// Final path component, used for exclusion matching
    pub fn file_name(&self) -> Option<&OsStr> {
        self.path.file_name()
    }

    /// Final path component for display
    pub fn name(&self) -> Cow<'_, str> {
        self.file_name()
            .map(OsStr::to_string_lossy)
            .unwrap_or_else(|| self.path.to_string_lossy())
    }
}

/// File-extension filter used during discovery
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ArtifactPattern {
    extension: String,
}

impl ArtifactPattern {
    /// Match files with this extension (given without the leading dot)
    pub fn extension(extension: impl Into<String>) -> Self {
        let extension = extension.into();
        let extension = extension
            .strip_prefix('.')
            .map(str::to_string)
            .unwrap_or(extension);
        Self { extension }
    }

    /// Jupyter notebooks
    pub fn notebooks() -> Self {
        Self::extension("ipynb")
    }

    /// Check a path against the pattern (case-sensitive)
    pub fn matches(&self, path: &Path) -> bool {
        path.extension() == Some(OsStr::new(&self.extension))
    }

    /// The extension without a leading dot
    pub fn as_str(&self) -> &str {
        &self.extension
    }
}
