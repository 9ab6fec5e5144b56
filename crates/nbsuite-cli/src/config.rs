//! CLI configuration via environment variables
//!
//! Suite settings live in nbsuite.toml; the variables read here only shape
//! how the binary itself behaves.

use std::env;

/// CLI configuration loaded from environment variables
#[derive(Debug, Clone, Default)]
pub struct Config {
    /// Disable colored output (NO_COLOR=1)
    pub no_color: bool,
    /// Log filter directives (NBSUITE_LOG=debug)
    pub log_filter: Option<String>,
}

impl Config {
    /// Load configuration from environment variables
    pub fn from_env() -> Self {
        Self {
            no_color: env::var_os("NO_COLOR").is_some_and(|v| !v.is_empty()),
            log_filter: env::var("NBSUITE_LOG")
                .ok()
                .filter(|v| !v.trim().is_empty()),
        }
    }
}
