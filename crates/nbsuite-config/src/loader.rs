//! Configuration Loader
//!
//! Handles loading and merging configuration from multiple sources with proper precedence.

use crate::global::GlobalConfig;
use crate::suite::SuiteConfig;
use crate::{ConfigError, ConfigResult, SUITE_FILE_NAME};
use std::env;
use std::path::{Path, PathBuf};

/// Configuration loader
///
/// Loads configuration from multiple sources and merges them with proper precedence:
/// 1. Built-in suite (when no nbsuite.toml is found) - lowest priority
/// 2. Global config (~/.nbsuite/config.toml) - contributes backends
/// 3. Suite config (./nbsuite.toml) - overrides global backends of the same name
/// 4. Environment variables (NBSUITE_*) - overrides both
/// 5. CLI flags - highest priority (handled by caller)
pub struct ConfigLoader {
    /// Cached global config path
    global_config_path: Option<PathBuf>,
}

/// Merged configuration result
#[derive(Debug, Clone)]
pub struct Config {
    /// Suite configuration with global backends and env overrides applied
    pub suite: SuiteConfig,

    /// Global configuration
    pub global: GlobalConfig,

    /// Directory containing nbsuite.toml, if one was found
    pub project_root: Option<PathBuf>,

    /// Directory relative paths are resolved against
    pub base_dir: PathBuf,
}

impl ConfigLoader {
    /// Create a new configuration loader
    pub fn new() -> Self {
        Self {
            global_config_path: None,
        }
    }

    /// Use a specific global config file instead of ~/.nbsuite/config.toml
    pub fn with_global_config_path(mut self, path: impl Into<PathBuf>) -> Self {
        self.global_config_path = Some(path.into());
        self
    }

    /// Load configuration starting from the given directory
    ///
    /// Walks up the directory tree to find nbsuite.toml. Without one, the
    /// built-in suite is used with `start_dir` as its base directory.
    pub fn load_from_directory(&mut self, start_dir: &Path) -> ConfigResult<Config> {
        let (project_root, suite) = self.find_suite_config(start_dir)?;
        let base_dir = project_root
            .clone()
            .unwrap_or_else(|| start_dir.to_path_buf());
        self.finish(suite, project_root, base_dir)
    }

    /// Load configuration from a specific suite config file
    pub fn load_from_file(&mut self, config_path: &Path) -> ConfigResult<Config> {
        let suite = SuiteConfig::load_from_file(config_path)?;
        let project_root = config_path
            .parent()
            .map(|p| if p.as_os_str().is_empty() { Path::new(".") } else { p })
            .map(Path::to_path_buf);
        let base_dir = project_root.clone().unwrap_or_else(|| PathBuf::from("."));
        self.finish(suite, project_root, base_dir)
    }

    fn finish(
        &mut self,
        mut suite: SuiteConfig,
        project_root: Option<PathBuf>,
        base_dir: PathBuf,
    ) -> ConfigResult<Config> {
        let global = self.load_global_config()?;
        suite.inherit_backends(&global.backends);

        let suite = self.apply_env_overrides(suite)?;
        suite.validate_backend_refs()?;

        Ok(Config {
            suite,
            global,
            project_root,
            base_dir,
        })
    }

    /// Find suite configuration by walking up directory tree
    ///
    /// Returns (project_root, suite_config); the built-in suite if not found
    fn find_suite_config(&self, start_dir: &Path) -> ConfigResult<(Option<PathBuf>, SuiteConfig)> {
        let mut current = start_dir.to_path_buf();

        loop {
            let config_path = current.join(SUITE_FILE_NAME);

            if config_path.exists() {
                let suite = SuiteConfig::load_from_file(&config_path)?;
                return Ok((Some(current), suite));
            }

            match current.parent() {
                Some(parent) => current = parent.to_path_buf(),
                None => return Ok((None, SuiteConfig::builtin())),
            }
        }
    }

    /// Load global configuration from ~/.nbsuite/config.toml
    fn load_global_config(&mut self) -> ConfigResult<GlobalConfig> {
        if self.global_config_path.is_none() {
            self.global_config_path = match env::var_os("NBSUITE_GLOBAL_CONFIG") {
                Some(path) => Some(PathBuf::from(path)),
                // No home directory means no global config, not an error
                None => GlobalConfig::global_config_path().ok(),
            };
        }

        match &self.global_config_path {
            // Global config is optional - if it doesn't exist, return default
            Some(path) if path.exists() => GlobalConfig::load_from_file(path),
            _ => Ok(GlobalConfig::default()),
        }
    }

    /// Apply environment variable overrides to the suite config
    ///
    /// - NBSUITE_BACKEND_PROGRAM: program for every backend
    /// - NBSUITE_TIMEOUT_SECS: timeout for every backend
    /// - NBSUITE_ENABLE_EXCLUSIONS / NBSUITE_DISABLE_EXCLUSIONS: comma-separated names
    fn apply_env_overrides(&self, mut config: SuiteConfig) -> ConfigResult<SuiteConfig> {
        if let Ok(program) = env::var("NBSUITE_BACKEND_PROGRAM") {
            if program.trim().is_empty() {
                return Err(ConfigError::InvalidValue {
                    field: "NBSUITE_BACKEND_PROGRAM".to_string(),
                    reason: "program cannot be empty".to_string(),
                });
            }
            for backend in config.backends.values_mut() {
                backend.program = program.clone();
            }
        }

        if let Ok(timeout) = env::var("NBSUITE_TIMEOUT_SECS") {
            let secs = match timeout.trim().parse::<u64>() {
                Ok(secs) if secs > 0 => secs,
                _ => {
                    return Err(ConfigError::InvalidValue {
                        field: "NBSUITE_TIMEOUT_SECS".to_string(),
                        reason: format!("expected a positive number of seconds, got '{}'", timeout),
                    })
                }
            };
            for backend in config.backends.values_mut() {
                backend.timeout_secs = Some(secs);
            }
        }

        for (var, enabled) in [
            ("NBSUITE_ENABLE_EXCLUSIONS", true),
            ("NBSUITE_DISABLE_EXCLUSIONS", false),
        ] {
            if let Ok(names) = env::var(var) {
                for name in split_list(&names) {
                    if config.set_exclusion_enabled(name, enabled) == 0 {
                        return Err(ConfigError::InvalidValue {
                            field: var.to_string(),
                            reason: format!("no exclusion named '{}'", name),
                        });
                    }
                }
            }
        }

        Ok(config)
    }
}

impl Default for ConfigLoader {
    fn default() -> Self {
        Self::new()
    }
}

fn split_list(value: &str) -> impl Iterator<Item = &str> {
    value.split(',').map(str::trim).filter(|s| !s.is_empty())
}

impl Config {
    /// Resolve a configured path against the base directory
    pub fn resolve(&self, path: &Path) -> PathBuf {
        if path.is_absolute() {
            path.to_path_buf()
        } else {
            self.base_dir.join(path)
        }
    }

    /// Get the project root directory
    pub fn project_root(&self) -> Option<&Path> {
        self.project_root.as_deref()
    }

    /// Check if an nbsuite.toml was found
    pub fn is_project(&self) -> bool {
        self.project_root.is_some()
    }
}
