//! Test discovery - find artifacts under a root directory

use crate::artifact::{Artifact, ArtifactPattern};
use crate::error::DiscoveryError;
use std::ffi::OsStr;
use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use walkdir::WalkDir;

/// Directory walk settings
#[derive(Debug, Clone)]
pub struct DiscoveryOptions {
    /// Directory names that are never descended into
    pub ignore_dirs: Vec<String>,
    /// Follow symbolic links
    pub follow_links: bool,
}

impl Default for DiscoveryOptions {
    fn default() -> Self {
        Self {
            ignore_dirs: vec![".ipynb_checkpoints".to_string()],
            follow_links: true,
        }
    }
}

/// An entry the walk could not read
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SkippedEntry {
    /// Path of the entry, when walkdir knows it
    pub path: Option<PathBuf>,
    /// What went wrong
    pub error: String,
}

/// Lazy sequence of artifacts under one root.
///
/// Entries are visited in file-name order, so two walks over an unchanged
/// tree yield the same sequence. Entries that fail mid-walk are recorded in
/// [`Discovery::skipped`] rather than ending the walk.
pub struct Discovery {
    walker: walkdir::IntoIter,
    pattern: ArtifactPattern,
    group: String,
    ignore_dirs: Vec<String>,
    skipped: Vec<SkippedEntry>,
}

/// Walk `root` for files matching `pattern`, with default options
pub fn discover(
    root: &Path,
    pattern: &ArtifactPattern,
    group: &str,
) -> Result<Discovery, DiscoveryError> {
    Discovery::new(root, pattern, group, &DiscoveryOptions::default())
}

impl Discovery {
    /// Start a walk. The root is checked eagerly; nothing is read beyond it
    /// until the sequence is consumed.
    pub fn new(
        root: &Path,
        pattern: &ArtifactPattern,
        group: &str,
        options: &DiscoveryOptions,
    ) -> Result<Self, DiscoveryError> {
        check_root(root, group)?;

        tracing::debug!(
            group,
            root = %root.display(),
            pattern = pattern.as_str(),
            "discovering artifacts"
        );

        let walker = WalkDir::new(root)
            .follow_links(options.follow_links)
            .sort_by_file_name()
            .into_iter();

        Ok(Self {
            walker,
            pattern: pattern.clone(),
            group: group.to_string(),
            ignore_dirs: options.ignore_dirs.clone(),
            skipped: Vec::new(),
        })
    }

    /// Entries that could not be read so far
    pub fn skipped(&self) -> &[SkippedEntry] {
        &self.skipped
    }

    fn is_ignored_dir(&self, name: &OsStr) -> bool {
        self.ignore_dirs.iter().any(|dir| OsStr::new(dir) == name)
    }
}

impl Iterator for Discovery {
    type Item = Artifact;

    fn next(&mut self) -> Option<Artifact> {
        loop {
            match self.walker.next()? {
                Ok(entry) => {
                    if entry.file_type().is_dir() {
                        if entry.depth() > 0 && self.is_ignored_dir(entry.file_name()) {
                            tracing::trace!(path = %entry.path().display(), "skipping ignored directory");
                            self.walker.skip_current_dir();
                        }
                        continue;
                    }

                    if self.pattern.matches(entry.path()) {
                        return Some(Artifact::new(entry.into_path(), self.group.as_str()));
                    }
                }
                Err(err) => {
                    let path = err.path().map(Path::to_path_buf);
                    tracing::warn!(
                        group = %self.group,
                        path = ?path,
                        error = %err,
                        "skipping unreadable entry"
                    );
                    self.skipped.push(SkippedEntry {
                        path,
                        error: err.to_string(),
                    });
                }
            }
        }
    }
}

fn check_root(root: &Path, group: &str) -> Result<(), DiscoveryError> {
    let metadata = fs::metadata(root).map_err(|e| {
        if e.kind() == io::ErrorKind::NotFound {
            DiscoveryError::RootNotFound {
                group: group.to_string(),
                path: root.to_path_buf(),
            }
        } else {
            DiscoveryError::unreadable(group, root, e)
        }
    })?;

    if !metadata.is_dir() {
        return Err(DiscoveryError::NotADirectory {
            group: group.to_string(),
            path: root.to_path_buf(),
        });
    }

    fs::read_dir(root).map_err(|e| DiscoveryError::unreadable(group, root, e))?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use std::collections::BTreeSet;
    use tempfile::tempdir;

    fn touch(root: &Path, rel: &str) {
        let path = root.join(rel);
        fs::create_dir_all(path.parent().unwrap()).unwrap();
        fs::write(path, "{}").unwrap();
    }

    fn names(artifacts: &[Artifact]) -> Vec<String> {
        artifacts.iter().map(|a| a.name().into_owned()).collect()
    }

    #[test]
    fn test_discover_recurses_and_filters() {
        let dir = tempdir().unwrap();
        touch(dir.path(), "intro.ipynb");
        touch(dir.path(), "advanced/spectra.ipynb");
        touch(dir.path(), "advanced/helpers.py");
        touch(dir.path(), "README.md");

        let artifacts: Vec<_> = discover(dir.path(), &ArtifactPattern::notebooks(), "docs")
            .unwrap()
            .collect();

        assert_eq!(names(&artifacts), vec!["spectra.ipynb", "intro.ipynb"]);
        assert!(artifacts.iter().all(|a| a.group() == "docs"));
    }

    #[test]
    fn test_discover_skips_checkpoints() {
        let dir = tempdir().unwrap();
        touch(dir.path(), "intro.ipynb");
        touch(dir.path(), ".ipynb_checkpoints/intro-checkpoint.ipynb");

        let artifacts: Vec<_> = discover(dir.path(), &ArtifactPattern::notebooks(), "docs")
            .unwrap()
            .collect();

        assert_eq!(names(&artifacts), vec!["intro.ipynb"]);
    }

    #[test]
    fn test_discover_custom_ignore_dirs() {
        let dir = tempdir().unwrap();
        touch(dir.path(), "keep/a.ipynb");
        touch(dir.path(), "scratch/b.ipynb");
        touch(dir.path(), ".ipynb_checkpoints/c.ipynb");

        let options = DiscoveryOptions {
            ignore_dirs: vec!["scratch".to_string()],
            follow_links: false,
        };
        let artifacts: Vec<_> =
            Discovery::new(dir.path(), &ArtifactPattern::notebooks(), "g", &options)
                .unwrap()
                .collect();

        assert_eq!(names(&artifacts), vec!["c.ipynb", "a.ipynb"]);
    }

    #[test]
    fn test_ignored_name_at_root_is_still_walked() {
        let dir = tempdir().unwrap();
        let root = dir.path().join(".ipynb_checkpoints");
        touch(&root, "a.ipynb");

        let count = discover(&root, &ArtifactPattern::notebooks(), "g")
            .unwrap()
            .count();
        assert_eq!(count, 1);
    }

    #[test]
    fn test_discover_is_repeatable_on_static_tree() {
        let dir = tempdir().unwrap();
        for rel in ["b.ipynb", "a/c.ipynb", "a/d.ipynb", "z/y/x.ipynb"] {
            touch(dir.path(), rel);
        }

        let first: BTreeSet<_> = discover(dir.path(), &ArtifactPattern::notebooks(), "g")
            .unwrap()
            .collect();
        let second: BTreeSet<_> = discover(dir.path(), &ArtifactPattern::notebooks(), "g")
            .unwrap()
            .collect();

        assert_eq!(first.len(), 4);
        assert_eq!(first, second);
    }

    #[test]
    fn test_discover_observes_live_filesystem() {
        let dir = tempdir().unwrap();
        touch(dir.path(), "a.ipynb");

        let before = discover(dir.path(), &ArtifactPattern::notebooks(), "g")
            .unwrap()
            .count();
        touch(dir.path(), "b.ipynb");
        let after = discover(dir.path(), &ArtifactPattern::notebooks(), "g")
            .unwrap()
            .count();

        assert_eq!((before, after), (1, 2));
    }

    #[test]
    fn test_discover_empty_root() {
        let dir = tempdir().unwrap();
        let mut discovery = discover(dir.path(), &ArtifactPattern::notebooks(), "g").unwrap();
        assert!(discovery.next().is_none());
        assert!(discovery.skipped().is_empty());
    }

    #[test]
    fn test_missing_root() {
        let dir = tempdir().unwrap();
        let missing = dir.path().join("nope");

        let err = discover(&missing, &ArtifactPattern::notebooks(), "docs")
            .err()
            .unwrap();
        assert!(matches!(err, DiscoveryError::RootNotFound { ref group, .. } if group == "docs"));
    }

    #[test]
    fn test_root_is_file() {
        let dir = tempdir().unwrap();
        touch(dir.path(), "file.ipynb");

        let err = discover(
            &dir.path().join("file.ipynb"),
            &ArtifactPattern::notebooks(),
            "docs",
        )
        .err()
        .unwrap();
        assert!(matches!(err, DiscoveryError::NotADirectory { .. }));
    }

    #[cfg(unix)]
    #[test]
    fn test_broken_symlink_is_recorded_not_fatal() {
        let dir = tempdir().unwrap();
        touch(dir.path(), "a.ipynb");
        std::os::unix::fs::symlink(dir.path().join("gone"), dir.path().join("b.ipynb")).unwrap();

        let mut discovery = discover(dir.path(), &ArtifactPattern::notebooks(), "g").unwrap();
        let artifacts: Vec<_> = discovery.by_ref().collect();

        assert_eq!(names(&artifacts), vec!["a.ipynb"]);
        assert_eq!(discovery.skipped().len(), 1);
    }
}
