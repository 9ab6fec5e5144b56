//! Global Configuration (~/.nbsuite/config.toml)
//!
//! Handles user-level configuration: personal backend definitions (for
//! example a virtualenv interpreter) and output preferences.

use crate::suite::{validate_backend, BackendConfig};
use crate::{ConfigError, ConfigResult};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

/// Global user configuration from ~/.nbsuite/config.toml
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Default)]
#[serde(deny_unknown_fields)]
pub struct GlobalConfig {
    /// Backends available to every suite; a suite's own definition wins
    #[serde(default)]
    #[serde(skip_serializing_if = "BTreeMap::is_empty")]
    pub backends: BTreeMap<String, BackendConfig>,

    /// Output preferences
    #[serde(skip_serializing_if = "Option::is_none")]
    pub output: Option<OutputConfig>,
}

/// Output preferences
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Default)]
#[serde(deny_unknown_fields)]
pub struct OutputConfig {
    /// Colored terminal output (default: true)
    #[serde(skip_serializing_if = "Option::is_none")]
    pub color: Option<bool>,

    /// JSON report instead of terminal output (default: false)
    #[serde(skip_serializing_if = "Option::is_none")]
    pub json: Option<bool>,
}

impl GlobalConfig {
    /// Load global configuration from a file
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

    /// Validate the global configuration
    pub fn validate(&self) -> ConfigResult<()> {
        for (name, backend) in &self.backends {
            validate_backend(name, backend)?;
        }
        Ok(())
    }

    /// Get the global config file path (~/.nbsuite/config.toml)
    pub fn global_config_path() -> ConfigResult<PathBuf> {
        let home = dirs::home_dir().ok_or(ConfigError::HomeNotFound)?;
        Ok(home.join(".nbsuite").join("config.toml"))
    }

    /// Preferred color setting, if any
    pub fn color(&self) -> Option<bool> {
        self.output.as_ref().and_then(|o| o.color)
    }

    /// Preferred JSON setting, if any
    pub fn json(&self) -> Option<bool> {
        self.output.as_ref().and_then(|o| o.json)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_global_config() {
        let toml = r#"
[backends.pytest]
program = "/home/me/.venvs/lab/bin/python"
args = ["-m", "pytest", "-q"]

[output]
color = false
"#;

        let config: GlobalConfig = toml::from_str(toml).unwrap();
        assert!(config.validate().is_ok());
        assert_eq!(config.color(), Some(false));
        assert_eq!(config.json(), None);
        assert_eq!(config.backends["pytest"].args.len(), 3);
    }

    #[test]
    fn test_empty_program_rejected() {
        let toml = r#"
[backends.pytest]
program = " "
"#;
        let config: GlobalConfig = toml::from_str(toml).unwrap();
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_zero_timeout_rejected() {
        let toml = r#"
[backends.sh]
program = "sh"
timeout_secs = 0
"#;
        let config: GlobalConfig = toml::from_str(toml).unwrap();
        let err = config.validate().unwrap_err();
        assert!(err.to_string().contains("timeout_secs"));
    }

    #[test]
    fn test_empty_backend_name_rejected() {
        let toml = r#"
[backends.""]
program = "sh"
"#;
        let config: GlobalConfig = toml::from_str(toml).unwrap();
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_empty_global_config() {
        let config: GlobalConfig = toml::from_str("").unwrap();
        assert_eq!(config, GlobalConfig::default());
    }
}
