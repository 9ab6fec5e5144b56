pub mod init;
pub mod list;
pub mod run;

use anyhow::{Context, Result};
use nbsuite_config::{Config, ConfigLoader};
use std::path::{Path, PathBuf};

/// Flags shared by every command
#[derive(Debug, Clone)]
pub struct CommonArgs {
    /// Directory to start looking for nbsuite.toml
    pub dir: PathBuf,
    /// Explicit suite file
    pub config: Option<PathBuf>,
    /// Output in JSON format
    pub json: bool,
    /// Disable colored output
    pub no_color: bool,
    /// Verbose output
    pub verbose: bool,
}

impl Default for CommonArgs {
    fn default() -> Self {
        Self {
            dir: PathBuf::from("."),
            config: None,
            json: false,
            no_color: false,
            verbose: false,
        }
    }
}

impl CommonArgs {
    /// Load the suite configuration and fold in the user's output defaults
    pub fn load(&mut self) -> Result<Config> {
        let mut loader = ConfigLoader::new();
        let config = match &self.config {
            Some(path) => loader
                .load_from_file(path)
                .with_context(|| format!("Failed to load suite config {}", path.display()))?,
            None => {
                let start = self.start_dir()?;
                loader.load_from_directory(&start).with_context(|| {
                    format!("Failed to load configuration from {}", start.display())
                })?
            }
        };

        match config.project_root() {
            Some(root) => tracing::debug!(root = %root.display(), "using nbsuite.toml"),
            None => tracing::debug!(base = %config.base_dir.display(), "using built-in suite"),
        }

        if config.global.json() == Some(true) {
            self.json = true;
        }
        if config.global.color() == Some(false) && !self.no_color {
            self.no_color = true;
            colored::control::set_override(false);
        }

        Ok(config)
    }

    /// `dir` made absolute so the upward search can leave the working directory
    fn start_dir(&self) -> Result<PathBuf> {
        if self.dir.is_absolute() {
            return Ok(self.dir.clone());
        }
        let cwd = std::env::current_dir().context("Failed to get current directory")?;
        Ok(if self.dir == Path::new(".") {
            cwd
        } else {
            cwd.join(&self.dir)
        })
    }
}
