//! Suite Configuration (nbsuite.toml)
//!
//! Describes which run groups exist, where their artifacts come from, which
//! backend executes them, and which artifacts are excluded.

use crate::{ConfigError, ConfigResult};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashSet};
use std::path::{Path, PathBuf};

/// Operating system names accepted in `platforms` lists.
///
/// These are the values of `std::env::consts::OS`.
pub const KNOWN_PLATFORMS: &[&str] = &[
    "linux",
    "macos",
    "windows",
    "freebsd",
    "netbsd",
    "openbsd",
    "dragonfly",
    "solaris",
    "illumos",
    "android",
    "ios",
];

/// Pattern used when a discovered group does not name one
pub const DEFAULT_PATTERN: &str = "ipynb";

/// Suite configuration from nbsuite.toml
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Default)]
#[serde(deny_unknown_fields)]
pub struct SuiteConfig {
    /// Directory walk settings
    #[serde(skip_serializing_if = "Option::is_none")]
    pub discovery: Option<DiscoveryConfig>,

    /// Named test backends
    #[serde(default)]
    #[serde(skip_serializing_if = "BTreeMap::is_empty")]
    pub backends: BTreeMap<String, BackendConfig>,

    /// Run groups, executed in declaration order
    #[serde(default, rename = "group")]
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub groups: Vec<GroupConfig>,
}

/// Directory walk settings
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Default)]
#[serde(deny_unknown_fields)]
pub struct DiscoveryConfig {
    /// Directory names never descended into (default: [".ipynb_checkpoints"])
    #[serde(skip_serializing_if = "Option::is_none")]
    pub ignore_dirs: Option<Vec<String>>,

    /// Follow symbolic links while walking (default: true)
    #[serde(skip_serializing_if = "Option::is_none")]
    pub follow_links: Option<bool>,
}

/// An external test executor
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(deny_unknown_fields)]
pub struct BackendConfig {
    /// Executable to spawn
    pub program: String,

    /// Arguments placed before the artifact paths
    #[serde(default)]
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub args: Vec<String>,

    /// Wall-clock limit for one invocation
    #[serde(skip_serializing_if = "Option::is_none")]
    pub timeout_secs: Option<u64>,
}

/// A run group
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(deny_unknown_fields)]
pub struct GroupConfig {
    /// Group name, unique within the suite
    pub name: String,

    /// Name of the backend in `[backends]`
    pub backend: String,

    /// Root directory to discover artifacts under
    #[serde(skip_serializing_if = "Option::is_none")]
    pub root: Option<PathBuf>,

    /// File extension filter for discovery (default: "ipynb")
    #[serde(skip_serializing_if = "Option::is_none")]
    pub pattern: Option<String>,

    /// Explicit artifact paths, used instead of `root`
    #[serde(default)]
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub paths: Vec<PathBuf>,

    /// Exclusion rules applied after discovery
    #[serde(default)]
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub exclude: Vec<ExclusionConfig>,
}

/// Where a group's artifacts come from
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum GroupSource {
    /// Walk `root` for files with extension `pattern`
    Discover { root: PathBuf, pattern: String },
    /// Use exactly these paths
    Paths(Vec<PathBuf>),
}

/// An exact-name exclusion
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(deny_unknown_fields)]
pub struct ExclusionConfig {
    /// File name to exclude (compared exactly, case-sensitive)
    pub name: String,

    /// Why the artifact is excluded
    #[serde(skip_serializing_if = "Option::is_none")]
    pub reason: Option<String>,

    /// Whether the rule is applied at all (default: true)
    #[serde(default = "default_enabled")]
    pub enabled: bool,

    /// Restrict the rule to these operating systems (empty = everywhere)
    #[serde(default)]
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub platforms: Vec<String>,
}

fn default_enabled() -> bool {
    true
}

impl SuiteConfig {
    /// The suite used when no nbsuite.toml exists.
    ///
    /// Runs the documentation notebooks, the test notebooks, and the
    /// standalone pytest module.
    pub fn builtin() -> Self {
        let mut backends = BTreeMap::new();
        backends.insert(
            "nbmake".to_string(),
            BackendConfig {
                program: "python".to_string(),
                args: vec!["-m".into(), "pytest".into(), "--nbmake".into()],
                timeout_secs: None,
            },
        );
        backends.insert(
            "pytest".to_string(),
            BackendConfig {
                program: "python".to_string(),
                args: vec!["-m".into(), "pytest".into()],
                timeout_secs: None,
            },
        );

        Self {
            discovery: Some(DiscoveryConfig {
                ignore_dirs: Some(vec![".ipynb_checkpoints".to_string()]),
                follow_links: Some(true),
            }),
            backends,
            groups: vec![
                GroupConfig {
                    name: "docs notebooks".to_string(),
                    backend: "nbmake".to_string(),
                    root: Some(PathBuf::from("docs/tutorials")),
                    pattern: Some(DEFAULT_PATTERN.to_string()),
                    paths: Vec::new(),
                    exclude: vec![ExclusionConfig {
                        name: "tutorial_dev_spectral_libraries.ipynb".to_string(),
                        reason: Some("tutorial is known not to run".to_string()),
                        enabled: true,
                        platforms: Vec::new(),
                    }],
                },
                GroupConfig {
                    name: "test notebooks".to_string(),
                    backend: "nbmake".to_string(),
                    root: Some(PathBuf::from("nbdev_nbs")),
                    pattern: Some(DEFAULT_PATTERN.to_string()),
                    paths: Vec::new(),
                    exclude: vec![ExclusionConfig {
                        name: "test_isoforms.ipynb".to_string(),
                        reason: Some(
                            "multiprocessing in this notebook can hang on some Windows 10 builds"
                                .to_string(),
                        ),
                        enabled: false,
                        platforms: vec!["windows".to_string()],
                    }],
                },
                GroupConfig {
                    name: "standalone module".to_string(),
                    backend: "pytest".to_string(),
                    root: None,
                    pattern: None,
                    paths: vec![PathBuf::from("tests/test_utils.py")],
                    exclude: Vec::new(),
                },
            ],
        }
    }

    /// Load suite configuration from a file
    pub fn load_from_file(path: &Path) -> ConfigResult<Self> {
        let content = std::fs::read_to_string(path).map_err(|e| {
            if e.kind() == std::io::ErrorKind::NotFound {
                ConfigError::NotFound(path.to_path_buf())
            } else {
                ConfigError::IoError(e)
            }
        })?;

        let config: Self = toml::from_str(&content).map_err(|e| ConfigError::TomlParseError {
            file: path.to_path_buf(),
            error: e,
        })?;

        config.validate()?;
        Ok(config)
    }

    /// Render as TOML
    pub fn to_toml(&self) -> ConfigResult<String> {
        Ok(toml::to_string_pretty(self)?)
    }

    /// Validate the suite configuration
    pub fn validate(&self) -> ConfigResult<()> {
        for (name, backend) in &self.backends {
            validate_backend(name, backend)?;
        }

        let mut seen = HashSet::new();
        for group in &self.groups {
            if group.name.trim().is_empty() {
                return Err(ConfigError::InvalidValue {
                    field: "group.name".to_string(),
                    reason: "name cannot be empty".to_string(),
                });
            }
            if !seen.insert(group.name.as_str()) {
                return Err(ConfigError::DuplicateGroup(group.name.clone()));
            }
            group.validate()?;
        }

        Ok(())
    }

    /// Check that every group's backend is defined.
    ///
    /// Run separately from [`SuiteConfig::validate`] because backends may
    /// come from the global config.
    pub fn validate_backend_refs(&self) -> ConfigResult<()> {
        for group in &self.groups {
            if !self.backends.contains_key(&group.backend) {
                return Err(ConfigError::UnknownBackend {
                    group: group.name.clone(),
                    backend: group.backend.clone(),
                });
            }
        }
        Ok(())
    }

    /// Directory names skipped during discovery
    pub fn ignore_dirs(&self) -> Vec<String> {
        self.discovery
            .as_ref()
            .and_then(|d| d.ignore_dirs.clone())
            .unwrap_or_else(|| vec![".ipynb_checkpoints".to_string()])
    }

    /// Whether discovery follows symbolic links
    pub fn follow_links(&self) -> bool {
        self.discovery
            .as_ref()
            .and_then(|d| d.follow_links)
            .unwrap_or(true)
    }

    /// Find a group by name
    pub fn group(&self, name: &str) -> Option<&GroupConfig> {
        self.groups.iter().find(|g| g.name == name)
    }

    /// Add backends that this config does not define itself
    pub fn inherit_backends(&mut self, backends: &BTreeMap<String, BackendConfig>) {
        for (name, backend) in backends {
            self.backends
                .entry(name.clone())
                .or_insert_with(|| backend.clone());
        }
    }

    /// Toggle every exclusion named `name`; returns how many rules changed
    pub fn set_exclusion_enabled(&mut self, name: &str, enabled: bool) -> usize {
        let mut touched = 0;
        for rule in self.groups.iter_mut().flat_map(|g| g.exclude.iter_mut()) {
            if rule.name == name {
                rule.enabled = enabled;
                touched += 1;
            }
        }
        touched
    }
}

impl GroupConfig {
    /// Where this group's artifacts come from
    pub fn source(&self) -> GroupSource {
        match &self.root {
            Some(root) => GroupSource::Discover {
                root: root.clone(),
                pattern: self
                    .pattern
                    .clone()
                    .unwrap_or_else(|| DEFAULT_PATTERN.to_string()),
            },
            None => GroupSource::Paths(self.paths.clone()),
        }
    }

    fn validate(&self) -> ConfigResult<()> {
        let field = |f: &str| format!("group '{}'.{}", self.name, f);

        match (&self.root, self.paths.is_empty()) {
            (Some(_), false) => {
                return Err(ConfigError::InvalidValue {
                    field: field("root"),
                    reason: "'root' and 'paths' are mutually exclusive".to_string(),
                });
            }
            (None, true) => {
                return Err(ConfigError::InvalidValue {
                    field: field("root"),
                    reason: "one of 'root' or 'paths' is required".to_string(),
                });
            }
            _ => {}
        }

        if self.root.is_none() && self.pattern.is_some() {
            return Err(ConfigError::InvalidValue {
                field: field("pattern"),
                reason: "'pattern' only applies to groups with a 'root'".to_string(),
            });
        }

        if let Some(pattern) = &self.pattern {
            if pattern.is_empty() || pattern.starts_with('.') || pattern.contains(['/', '\\']) {
                return Err(ConfigError::InvalidValue {
                    field: field("pattern"),
                    reason: format!("expected a bare extension like 'ipynb', got '{}'", pattern),
                });
            }
        }

        for rule in &self.exclude {
            rule.validate(&self.name)?;
        }

        Ok(())
    }
}

impl ExclusionConfig {
    /// Whether the rule applies when running on `os`
    pub fn is_active_on(&self, os: &str) -> bool {
        self.enabled && (self.platforms.is_empty() || self.platforms.iter().any(|p| p == os))
    }

    fn validate(&self, group: &str) -> ConfigResult<()> {
        let field = format!("group '{}'.exclude", group);

        if self.name.is_empty() {
            return Err(ConfigError::InvalidValue {
                field,
                reason: "exclusion name cannot be empty".to_string(),
            });
        }
        // Names are compared against file names, so a path can never match.
        if self.name.contains(['/', '\\']) {
            return Err(ConfigError::InvalidValue {
                field,
                reason: format!("'{}' must be a file name, not a path", self.name),
            });
        }
        for platform in &self.platforms {
            if !KNOWN_PLATFORMS.contains(&platform.as_str()) {
                return Err(ConfigError::InvalidValue {
                    field,
                    reason: format!("unknown platform '{}'", platform),
                });
            }
        }
        Ok(())
    }
}

pub(crate) fn validate_backend(name: &str, backend: &BackendConfig) -> ConfigResult<()> {
    if name.is_empty() {
        return Err(ConfigError::InvalidValue {
            field: "backends".to_string(),
            reason: "backend name cannot be empty".to_string(),
        });
    }
    if backend.program.trim().is_empty() {
        return Err(ConfigError::InvalidValue {
            field: format!("backends.{}.program", name),
            reason: "program cannot be empty".to_string(),
        });
    }
    if backend.timeout_secs == Some(0) {
        return Err(ConfigError::InvalidValue {
            field: format!("backends.{}.timeout_secs", name),
            reason: "timeout must be greater than zero".to_string(),
        });
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use rstest::rstest;

    #[test]
    fn test_builtin_is_valid() {
        let config = SuiteConfig::builtin();
        assert!(config.validate().is_ok());
        assert!(config.validate_backend_refs().is_ok());
        assert_eq!(config.groups.len(), 3);
    }

    #[test]
    fn test_builtin_windows_exclusion_disabled() {
        let config = SuiteConfig::builtin();
        let rule = &config.group("test notebooks").unwrap().exclude[0];
        assert!(!rule.enabled);
        assert!(!rule.is_active_on("windows"));
        assert!(!rule.is_active_on("linux"));
    }

    #[test]
    fn test_builtin_roundtrips_through_toml() {
        let config = SuiteConfig::builtin();
        let text = config.to_toml().unwrap();
        let parsed: SuiteConfig = toml::from_str(&text).unwrap();
        assert_eq!(parsed, config);
    }

    #[test]
    fn test_parse_minimal_suite() {
        let toml = r#"
[backends.pytest]
program = "python"
args = ["-m", "pytest"]

[[group]]
name = "unit"
backend = "pytest"
paths = ["tests/test_a.py"]
"#;
        let config: SuiteConfig = toml::from_str(toml).unwrap();
        assert!(config.validate().is_ok());
        assert_eq!(
            config.groups[0].source(),
            GroupSource::Paths(vec![PathBuf::from("tests/test_a.py")])
        );
    }

    #[test]
    fn test_pattern_defaults_to_notebooks() {
        let group = GroupConfig {
            name: "nb".to_string(),
            backend: "nbmake".to_string(),
            root: Some(PathBuf::from("nbs")),
            pattern: None,
            paths: Vec::new(),
            exclude: Vec::new(),
        };
        assert_eq!(
            group.source(),
            GroupSource::Discover {
                root: PathBuf::from("nbs"),
                pattern: "ipynb".to_string(),
            }
        );
    }

    #[test]
    fn test_unknown_field_rejected() {
        let toml = r#"
[[group]]
name = "nb"
backend = "nbmake"
root = "nbs"
colour = "blue"
"#;
        assert!(toml::from_str::<SuiteConfig>(toml).is_err());
    }

    #[test]
    fn test_exclusion_enabled_by_default() {
        let toml = r#"
name = "broken.ipynb"
"#;
        let rule: ExclusionConfig = toml::from_str(toml).unwrap();
        assert!(rule.enabled);
        assert!(rule.is_active_on("linux"));
    }

    #[rstest]
    #[case(vec![], "linux", true)]
    #[case(vec!["windows"], "windows", true)]
    #[case(vec!["windows"], "linux", false)]
    #[case(vec!["windows", "macos"], "macos", true)]
    fn test_platform_gate(#[case] platforms: Vec<&str>, #[case] os: &str, #[case] active: bool) {
        let rule = ExclusionConfig {
            name: "x.ipynb".to_string(),
            reason: None,
            enabled: true,
            platforms: platforms.into_iter().map(String::from).collect(),
        };
        assert_eq!(rule.is_active_on(os), active);
    }

    #[test]
    fn test_duplicate_group_rejected() {
        let mut config = SuiteConfig::builtin();
        let dup = config.groups[0].clone();
        config.groups.push(dup);
        assert!(matches!(
            config.validate(),
            Err(ConfigError::DuplicateGroup(name)) if name == "docs notebooks"
        ));
    }

    #[test]
    fn test_root_and_paths_exclusive() {
        let mut config = SuiteConfig::builtin();
        config.groups[0].paths.push(PathBuf::from("extra.ipynb"));
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_group_without_source_rejected() {
        let mut config = SuiteConfig::builtin();
        config.groups[2].paths.clear();
        assert!(config.validate().is_err());
    }

    #[rstest]
    #[case(".ipynb")]
    #[case("")]
    #[case("nbs/x")]
    fn test_invalid_pattern(#[case] pattern: &str) {
        let mut config = SuiteConfig::builtin();
        config.groups[0].pattern = Some(pattern.to_string());
        assert!(config.validate().is_err());
    }

    #[rstest]
    #[case("")]
    #[case("docs/tutorials/broken.ipynb")]
    fn test_invalid_exclusion_name(#[case] name: &str) {
        let mut config = SuiteConfig::builtin();
        config.groups[0].exclude[0].name = name.to_string();
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_unknown_platform_rejected() {
        let mut config = SuiteConfig::builtin();
        config.groups[1].exclude[0].platforms = vec!["win10".to_string()];
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_zero_timeout_rejected() {
        let mut config = SuiteConfig::builtin();
        config.backends.get_mut("pytest").unwrap().timeout_secs = Some(0);
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_unknown_backend_reference() {
        let mut config = SuiteConfig::builtin();
        config.groups[0].backend = "jupyter".to_string();
        assert!(config.validate().is_ok());
        assert!(matches!(
            config.validate_backend_refs(),
            Err(ConfigError::UnknownBackend { backend, .. }) if backend == "jupyter"
        ));
    }

    #[test]
    fn test_inherit_backends_keeps_own_definitions() {
        let mut config = SuiteConfig::builtin();
        let mut inherited = BTreeMap::new();
        inherited.insert(
            "pytest".to_string(),
            BackendConfig {
                program: "/opt/venv/bin/python".to_string(),
                args: Vec::new(),
                timeout_secs: None,
            },
        );
        inherited.insert(
            "jupyter".to_string(),
            BackendConfig {
                program: "jupyter".to_string(),
                args: vec!["nbconvert".to_string()],
                timeout_secs: None,
            },
        );

        config.inherit_backends(&inherited);

        assert_eq!(config.backends["pytest"].program, "python");
        assert_eq!(config.backends["jupyter"].program, "jupyter");
    }

    #[test]
    fn test_set_exclusion_enabled() {
        let mut config = SuiteConfig::builtin();
        assert_eq!(config.set_exclusion_enabled("test_isoforms.ipynb", true), 1);
        assert!(config.group("test notebooks").unwrap().exclude[0].enabled);
        assert_eq!(config.set_exclusion_enabled("missing.ipynb", true), 0);
    }

    #[test]
    fn test_discovery_defaults() {
        let config = SuiteConfig::default();
        assert_eq!(config.ignore_dirs(), vec![".ipynb_checkpoints".to_string()]);
        assert!(config.follow_links());
    }
}
