//! Run groups - discovery plus exclusion, resolved before anything runs

use crate::artifact::{Artifact, ArtifactPattern};
use crate::discovery::{Discovery, DiscoveryOptions};
use crate::error::DiscoveryError;
use crate::exclusion::{exclude, ExclusionMismatchWarning, ExclusionRule};
use std::fmt;
use std::path::{Path, PathBuf};

/// Artifacts submitted together to one backend invocation
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RunGroup {
    /// Group name
    pub name: String,
    /// Name of the backend that runs the group
    pub backend: String,
    /// Artifacts in discovery order
    pub artifacts: Vec<Artifact>,
}

impl RunGroup {
    /// Create a group
    pub fn new(name: impl Into<String>, backend: impl Into<String>, artifacts: Vec<Artifact>) -> Self {
        Self {
            name: name.into(),
            backend: backend.into(),
            artifacts,
        }
    }

    /// Check if the group has no artifacts
    pub fn is_empty(&self) -> bool {
        self.artifacts.is_empty()
    }

    /// Number of artifacts
    pub fn len(&self) -> usize {
        self.artifacts.len()
    }

    /// Artifact paths in order
    pub fn paths(&self) -> impl Iterator<Item = &Path> {
        self.artifacts.iter().map(Artifact::path)
    }
}

/// Where a group's artifacts come from
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ArtifactSource {
    /// Walk a root directory
    Discover {
        root: PathBuf,
        pattern: ArtifactPattern,
    },
    /// A fixed list of files, each of which must exist
    Paths(Vec<PathBuf>),
}

/// Static description of a group
#[derive(Debug, Clone)]
pub struct GroupDefinition {
    /// Group name
    pub name: String,
    /// Backend name
    pub backend: String,
    /// Artifact source
    pub source: ArtifactSource,
    /// Rules applied on this run
    pub rules: Vec<ExclusionRule>,
    /// Rules configured but switched off (disabled, or gated to another platform)
    pub inactive_rules: Vec<ExclusionRule>,
}

/// A rule together with what it removed
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AppliedExclusion {
    pub rule: ExclusionRule,
    pub removed: Vec<Artifact>,
}

/// Non-fatal findings from planning
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PlanWarning {
    /// An active exclusion removed nothing
    ExclusionMismatch(ExclusionMismatchWarning),
    /// A directory entry could not be read during discovery
    SkippedEntry {
        group: String,
        path: Option<PathBuf>,
        error: String,
    },
}

impl fmt::Display for PlanWarning {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::ExclusionMismatch(warning) => fmt::Display::fmt(warning, f),
            Self::SkippedEntry { group, path, error } => match path {
                Some(path) => write!(
                    f,
                    "skipped unreadable entry {} in group '{}': {}",
                    path.display(),
                    group,
                    error
                ),
                None => write!(f, "skipped unreadable entry in group '{}': {}", group, error),
            },
        }
    }
}

/// A group ready to run
#[derive(Debug, Clone)]
pub struct GroupPlan {
    /// The artifacts that will be handed to the backend
    pub group: RunGroup,
    /// What each active rule removed
    pub exclusions: Vec<AppliedExclusion>,
    /// Rules that were not applied
    pub inactive_rules: Vec<ExclusionRule>,
    /// Non-fatal findings
    pub warnings: Vec<PlanWarning>,
}

impl GroupDefinition {
    /// Create a group with no exclusions
    pub fn new(name: impl Into<String>, backend: impl Into<String>, source: ArtifactSource) -> Self {
        Self {
            name: name.into(),
            backend: backend.into(),
            source,
            rules: Vec::new(),
            inactive_rules: Vec::new(),
        }
    }

    /// Add an active rule
    pub fn with_rule(mut self, rule: ExclusionRule) -> Self {
        self.rules.push(rule);
        self
    }

    /// Discover the group's artifacts and apply its rules
    pub fn plan(&self, options: &DiscoveryOptions) -> Result<GroupPlan, DiscoveryError> {
        let mut warnings = Vec::new();

        let mut artifacts = match &self.source {
            ArtifactSource::Discover { root, pattern } => {
                let mut discovery = Discovery::new(root, pattern, &self.name, options)?;
                let found: Vec<Artifact> = discovery.by_ref().collect();
                warnings.extend(discovery.skipped().iter().map(|entry| {
                    PlanWarning::SkippedEntry {
                        group: self.name.clone(),
                        path: entry.path.clone(),
                        error: entry.error.clone(),
                    }
                }));
                found
            }
            ArtifactSource::Paths(paths) => self.explicit_artifacts(paths)?,
        };

        let mut exclusions = Vec::with_capacity(self.rules.len());
        for rule in &self.rules {
            let result = exclude(artifacts, rule);
            if result.is_effective() {
                tracing::info!(
                    group = %self.name,
                    rule = %rule.name,
                    removed = result.removed.len(),
                    "excluded artifacts"
                );
            } else {
                let warning = ExclusionMismatchWarning {
                    group: self.name.clone(),
                    name: rule.name.clone(),
                };
                tracing::warn!("{}", warning);
                warnings.push(PlanWarning::ExclusionMismatch(warning));
            }
            artifacts = result.kept;
            exclusions.push(AppliedExclusion {
                rule: rule.clone(),
                removed: result.removed,
            });
        }

        tracing::debug!(group = %self.name, artifacts = artifacts.len(), "group planned");

        Ok(GroupPlan {
            group: RunGroup::new(self.name.clone(), self.backend.clone(), artifacts),
            exclusions,
            inactive_rules: self.inactive_rules.clone(),
            warnings,
        })
    }

    fn explicit_artifacts(&self, paths: &[PathBuf]) -> Result<Vec<Artifact>, DiscoveryError> {
        paths
            .iter()
            .map(|path| {
                if path.is_file() {
                    Ok(Artifact::new(path.clone(), self.name.clone()))
                } else {
                    Err(DiscoveryError::ArtifactNotFound {
                        group: self.name.clone(),
                        path: path.clone(),
                    })
                }
            })
            .collect()
    }
}

impl GroupPlan {
    /// Total number of artifacts removed by exclusions
    pub fn excluded_count(&self) -> usize {
        self.exclusions.iter().map(|e| e.removed.len()).sum()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use std::fs;
    use tempfile::tempdir;

    fn touch(root: &Path, rel: &str) -> PathBuf {
        let path = root.join(rel);
        fs::create_dir_all(path.parent().unwrap()).unwrap();
        fs::write(&path, "{}").unwrap();
        path
    }

    fn notebooks(root: &Path) -> ArtifactSource {
        ArtifactSource::Discover {
            root: root.to_path_buf(),
            pattern: ArtifactPattern::notebooks(),
        }
    }

    #[test]
    fn test_plan_applies_exclusion() {
        let dir = tempdir().unwrap();
        touch(dir.path(), "A.ipynb");
        touch(dir.path(), "B.ipynb");
        touch(dir.path(), "tutorial_dev_spectral_libraries.ipynb");

        let definition = GroupDefinition::new("docs notebooks", "nbmake", notebooks(dir.path())).with_rule(
            ExclusionRule::new("tutorial_dev_spectral_libraries.ipynb"),
        );
        let plan = definition.plan(&DiscoveryOptions::default()).unwrap();

        let names: Vec<_> = plan.group.artifacts.iter().map(|a| a.name().into_owned()).collect();
        assert_eq!(names, vec!["A.ipynb", "B.ipynb"]);
        assert_eq!(plan.excluded_count(), 1);
        assert!(plan.warnings.is_empty());
    }

    #[test]
    fn test_plan_warns_on_stale_exclusion() {
        let dir = tempdir().unwrap();
        touch(dir.path(), "A.ipynb");

        let definition = GroupDefinition::new("docs notebooks", "nbmake", notebooks(dir.path()))
            .with_rule(ExclusionRule::new("renamed.ipynb"));
        let plan = definition.plan(&DiscoveryOptions::default()).unwrap();

        assert_eq!(plan.group.len(), 1);
        assert_eq!(
            plan.warnings,
            vec![PlanWarning::ExclusionMismatch(ExclusionMismatchWarning {
                group: "docs notebooks".to_string(),
                name: "renamed.ipynb".to_string(),
            })]
        );
    }

    #[test]
    fn test_plan_empty_root() {
        let dir = tempdir().unwrap();
        let plan = GroupDefinition::new("test notebooks", "nbmake", notebooks(dir.path()))
            .plan(&DiscoveryOptions::default())
            .unwrap();
        assert!(plan.group.is_empty());
        assert!(plan.warnings.is_empty());
    }

    #[test]
    fn test_plan_explicit_paths() {
        let dir = tempdir().unwrap();
        let module = touch(dir.path(), "tests/test_utils.py");

        let plan = GroupDefinition::new(
            "standalone module",
            "pytest",
            ArtifactSource::Paths(vec![module.clone()]),
        )
        .plan(&DiscoveryOptions::default())
        .unwrap();

        assert_eq!(plan.group.paths().collect::<Vec<_>>(), vec![module.as_path()]);
    }

    #[test]
    fn test_plan_missing_explicit_path() {
        let dir = tempdir().unwrap();
        let err = GroupDefinition::new(
            "standalone module",
            "pytest",
            ArtifactSource::Paths(vec![dir.path().join("tests/test_utils.py")]),
        )
        .plan(&DiscoveryOptions::default())
        .unwrap_err();

        assert!(matches!(err, DiscoveryError::ArtifactNotFound { .. }));
    }

    #[test]
    fn test_plan_missing_root_is_error() {
        let dir = tempdir().unwrap();
        let result = GroupDefinition::new("docs", "nbmake", notebooks(&dir.path().join("docs")))
            .plan(&DiscoveryOptions::default());
        assert!(matches!(result, Err(DiscoveryError::RootNotFound { .. })));
    }

    #[test]
    fn test_inactive_rules_are_carried_not_applied() {
        let dir = tempdir().unwrap();
        touch(dir.path(), "test_isoforms.ipynb");

        let mut definition = GroupDefinition::new("test notebooks", "nbmake", notebooks(dir.path()));
        definition.inactive_rules.push(ExclusionRule::new("test_isoforms.ipynb"));
        let plan = definition.plan(&DiscoveryOptions::default()).unwrap();

        assert_eq!(plan.group.len(), 1);
        assert_eq!(plan.inactive_rules.len(), 1);
        assert!(plan.warnings.is_empty());
    }

    #[test]
    fn test_skipped_entry_warning_display() {
        let warning = PlanWarning::SkippedEntry {
            group: "g".to_string(),
            path: None,
            error: "permission denied".to_string(),
        };
        assert_eq!(
            warning.to_string(),
            "skipped unreadable entry in group 'g': permission denied"
        );
    }
}
