//! Exclusion rules - remove known-bad artifacts from a group

use crate::artifact::Artifact;
use nbsuite_config::ExclusionConfig;
use std::ffi::OsStr;
use std::fmt;

/// Removes artifacts whose file name equals `name` exactly.
///
/// No globbing, no substring matching, no case folding: `a.ipynb` never
/// removes `data.ipynb` or `A.ipynb`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExclusionRule {
    /// File name to remove
    pub name: String,
    /// Why the artifact is excluded
    pub reason: Option<String>,
}

impl ExclusionRule {
    /// Create a rule without a recorded reason
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            reason: None,
        }
    }

    /// Attach a reason
    pub fn with_reason(mut self, reason: impl Into<String>) -> Self {
        self.reason = Some(reason.into());
        self
    }

    /// Whether the rule removes `artifact`
    pub fn matches(&self, artifact: &Artifact) -> bool {
        artifact.file_name() == Some(OsStr::new(&self.name))
    }
}

impl From<&ExclusionConfig> for ExclusionRule {
    fn from(config: &ExclusionConfig) -> Self {
        Self {
            name: config.name.clone(),
            reason: config.reason.clone(),
        }
    }
}

/// Result of applying one rule
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Exclusion {
    /// Artifacts that survived, in their original order
    pub kept: Vec<Artifact>,
    /// Artifacts the rule removed
    pub removed: Vec<Artifact>,
}

impl Exclusion {
    /// Whether the rule removed anything
    pub fn is_effective(&self) -> bool {
        !self.removed.is_empty()
    }
}

/// Split `artifacts` into those `rule` keeps and those it removes
pub fn exclude<I>(artifacts: I, rule: &ExclusionRule) -> Exclusion
where
    I: IntoIterator<Item = Artifact>,
{
    let (removed, kept) = artifacts.into_iter().partition(|a| rule.matches(a));
    Exclusion { kept, removed }
}

/// An active exclusion matched no artifact, so the configuration is probably
/// stale (the notebook was renamed or deleted).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExclusionMismatchWarning {
    /// Group the rule belongs to
    pub group: String,
    /// The rule's file name
    pub name: String,
}

impl fmt::Display for ExclusionMismatchWarning {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "exclusion '{}' in group '{}' matched no artifacts",
            self.name, self.group
        )
    }
}
