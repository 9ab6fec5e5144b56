//! Init command - write the built-in suite to nbsuite.toml

use super::CommonArgs;
use anyhow::{bail, Context, Result};
use colored::*;
use nbsuite_config::{SuiteConfig, SUITE_FILE_NAME};
use nbsuite_runner::exit;
use std::fs;
use std::path::{Path, PathBuf};

const HEADER: &str = "\
# nbsuite test suite
#
# Groups run in order; a failing group does not stop later ones.
# Exclusions match file names exactly.
";

/// Write nbsuite.toml into `args.dir`
pub fn run(args: CommonArgs, force: bool) -> Result<i32> {
    let path = write_suite_file(&args.dir, force)?;

    if args.json {
        println!(
            "{}",
            serde_json::json!({ "created": path.display().to_string() })
        );
    } else {
        println!("{} {}", "Created".green().bold(), path.display());
    }
    Ok(exit::SUCCESS)
}

fn write_suite_file(dir: &Path, force: bool) -> Result<PathBuf> {
    let path = dir.join(SUITE_FILE_NAME);
    if path.exists() && !force {
        bail!(
            "{} already exists (use --force to overwrite)",
            path.display()
        );
    }

    let body = SuiteConfig::builtin()
        .to_toml()
        .context("Failed to serialize the built-in suite")?;
    fs::write(&path, format!("{}\n{}", HEADER, body))
        .with_context(|| format!("Failed to write {}", path.display()))?;

    tracing::info!(path = %path.display(), "wrote suite file");
    Ok(path)
}
