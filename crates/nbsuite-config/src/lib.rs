//! nbsuite Configuration System
//!
//! Provides configuration management for notebook test suites including:
//! - Suite configuration (nbsuite.toml)
//! - Global user configuration (~/.nbsuite/config.toml)
//! - Built-in defaults used when no nbsuite.toml exists
//! - Configuration precedence and merging
//!
//! # Configuration Hierarchy
//!
//! Configuration is loaded and merged in the following order (later overrides earlier):
//! 1. Built-in defaults (only when no nbsuite.toml is found)
//! 2. Global config (~/.nbsuite/config.toml)
//! 3. Suite config (./nbsuite.toml)
//! 4. Environment variables (NBSUITE_*)
//! 5. CLI flags
//!
//! # Example
//!
//! ```no_run
//! use nbsuite_config::ConfigLoader;
//! use std::path::Path;
//!
//! let mut loader = ConfigLoader::new();
//! let config = loader.load_from_directory(Path::new(".")).unwrap();
//! for group in &config.suite.groups {
//!     println!("{}", group.name);
//! }
//! ```

pub mod global;
pub mod loader;
pub mod suite;

use std::path::PathBuf;
use thiserror::Error;

/// File name searched for when locating a suite root
pub const SUITE_FILE_NAME: &str = "nbsuite.toml";

/// Configuration errors
#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("Configuration file not found: {0}")]
    NotFound(PathBuf),

    #[error("Failed to read configuration file: {0}")]
    IoError(#[from] std::io::Error),

    #[error("Invalid TOML syntax in {file}: {error}")]
    TomlParseError {
        file: PathBuf,
        error: toml::de::Error,
    },

    #[error("Failed to serialize configuration: {0}")]
    TomlSerializeError(#[from] toml::ser::Error),

    #[error("Invalid value for '{field}': {reason}")]
    InvalidValue { field: String, reason: String },

    #[error("Duplicate group name '{0}'")]
    DuplicateGroup(String),

    #[error("Group '{group}' references unknown backend '{backend}'")]
    UnknownBackend { group: String, backend: String },

    #[error("Home directory not found")]
    HomeNotFound,
}

/// Result type for configuration operations
pub type ConfigResult<T> = Result<T, ConfigError>;

// Re-export main types
pub use global::GlobalConfig;
pub use loader::{Config, ConfigLoader};
pub use suite::{
    BackendConfig, DiscoveryConfig, ExclusionConfig, GroupConfig, GroupSource, SuiteConfig,
};
