use clap::{CommandFactory, Parser, Subcommand};
use clap_complete::{generate, Shell};
use colored::Colorize;
use nbsuite_runner::exit;
use std::io;
use std::path::PathBuf;

mod commands;
mod config;
mod logging;
mod report;

/// Notebook test suite runner.
///
/// Discovers notebooks and test modules, drops known-bad ones by exact file
/// name, and hands each group to its backend (pytest or nbmake) in a single
/// invocation. Every group runs even when an earlier one fails.
///
/// Without an nbsuite.toml the built-in suite is used: docs/tutorials and
/// nbdev_nbs through `python -m pytest --nbmake`, then tests/test_utils.py
/// through `python -m pytest`.
///
/// EXIT CODES:
///     0    every group passed or had nothing to run
///     1    at least one group failed
///     2    configuration or discovery error; nothing ran
///
/// EXAMPLES:
///     nbsuite                         Run the suite
///     nbsuite list                    Show what would run
///     nbsuite --dir ../alphabase      Run another checkout
///     nbsuite --json > report.json    Machine-readable report
///     nbsuite init                    Write nbsuite.toml with the defaults
///
/// ENVIRONMENT VARIABLES:
///     NBSUITE_JSON                  Set to '1' for JSON output by default
///     NBSUITE_NO_COLOR, NO_COLOR    Set to disable colored output
///     NBSUITE_LOG                   Log filter, e.g. 'debug' or 'nbsuite_runner=trace'
///     NBSUITE_GLOBAL_CONFIG         Path of the user config file
///     NBSUITE_BACKEND_PROGRAM       Program used by every backend
///     NBSUITE_TIMEOUT_SECS          Timeout applied to every backend
///     NBSUITE_ENABLE_EXCLUSIONS     Comma-separated exclusions to switch on
///     NBSUITE_DISABLE_EXCLUSIONS    Comma-separated exclusions to switch off
#[derive(Parser)]
#[command(name = "nbsuite")]
#[command(version)]
#[command(propagate_version = true)]
struct Cli {
    #[command(subcommand)]
    command: Option<Commands>,

    #[command(flatten)]
    global: GlobalArgs,
}

#[derive(clap::Args, Debug, Clone)]
struct GlobalArgs {
    /// Directory to start looking for nbsuite.toml
    #[arg(long, short = 'C', global = true, default_value = ".")]
    dir: PathBuf,
    /// Use this suite file instead of searching for nbsuite.toml
    #[arg(long, short = 'c', global = true)]
    config: Option<PathBuf>,
    /// Output in JSON format
    #[arg(long, global = true, env = "NBSUITE_JSON")]
    json: bool,
    /// Disable colored output
    #[arg(long, global = true, env = "NBSUITE_NO_COLOR")]
    no_color: bool,
    /// Show artifact names and log progress
    #[arg(long, short = 'v', global = true)]
    verbose: bool,
}

#[derive(Subcommand)]
enum Commands {
    /// Run every group (the default)
    ///
    /// Discovers all groups first; a missing root aborts before any backend
    /// starts. Groups then run one after another.
    ///
    /// EXAMPLES:
    ///     nbsuite run                     Run the suite
    ///     nbsuite run --verbose           List each group's artifacts
    #[command(visible_alias = "r")]
    Run,

    /// Show each group's artifacts and exclusions without running anything
    ///
    /// EXAMPLES:
    ///     nbsuite list                    Plain listing
    ///     nbsuite list --json             Listing as JSON
    #[command(visible_alias = "ls")]
    List,

    /// Write the built-in suite to nbsuite.toml
    ///
    /// EXAMPLES:
    ///     nbsuite init                    Create nbsuite.toml here
    ///     nbsuite init --force            Overwrite an existing file
    Init {
        /// Overwrite an existing nbsuite.toml
        #[arg(long, short = 'f')]
        force: bool,
    },

    /// Generate shell completions
    ///
    /// Outputs shell completion scripts for bash, zsh, fish, or powershell.
    ///
    /// EXAMPLES:
    ///     nbsuite completions bash > ~/.local/share/bash-completion/completions/nbsuite
    ///     nbsuite completions zsh > ~/.zfunc/_nbsuite
    Completions {
        /// Shell to generate completions for
        #[arg(value_enum)]
        shell: Shell,
    },
}

fn main() {
    let cli = Cli::parse();
    let cli_config = config::Config::from_env();

    logging::init(cli_config.log_filter.as_deref(), cli.global.verbose);

    let no_color = cli.global.no_color || cli_config.no_color;
    if no_color {
        colored::control::set_override(false);
    }

    let args = commands::CommonArgs {
        dir: cli.global.dir,
        config: cli.global.config,
        json: cli.global.json,
        no_color,
        verbose: cli.global.verbose,
    };

    let result = match cli.command.unwrap_or(Commands::Run) {
        Commands::Run => commands::run::run(args),
        Commands::List => commands::list::run(args),
        Commands::Init { force } => commands::init::run(args, force),
        Commands::Completions { shell } => {
            let mut cmd = Cli::command();
            let name = cmd.get_name().to_string();
            generate(shell, &mut cmd, name, &mut io::stdout());
            Ok(exit::SUCCESS)
        }
    };

    match result {
        Ok(code) => std::process::exit(code),
        Err(err) => {
            eprintln!("{} {:#}", "error:".red().bold(), err);
            std::process::exit(exit::FATAL);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_no_subcommand_runs() {
        let cli = Cli::parse_from(["nbsuite"]);
        assert!(cli.command.is_none());
        assert_eq!(cli.global.dir, PathBuf::from("."));
    }

    #[test]
    fn test_global_flags_after_subcommand() {
        let cli = Cli::parse_from(["nbsuite", "list", "--dir", "repo", "--no-color", "-v"]);
        assert!(matches!(cli.command, Some(Commands::List)));
        assert_eq!(cli.global.dir, PathBuf::from("repo"));
        assert!(cli.global.no_color);
        assert!(cli.global.verbose);
    }

    #[test]
    fn test_alias_r_for_run() {
        let cli = Cli::parse_from(["nbsuite", "r"]);
        assert!(matches!(cli.command, Some(Commands::Run)));
    }

    #[test]
    fn test_alias_ls_for_list() {
        let cli = Cli::parse_from(["nbsuite", "ls"]);
        assert!(matches!(cli.command, Some(Commands::List)));
    }

    #[test]
    fn test_init_force() {
        let cli = Cli::parse_from(["nbsuite", "init", "--force"]);
        assert!(matches!(cli.command, Some(Commands::Init { force: true })));
    }

    #[test]
    fn test_config_flag() {
        let cli = Cli::parse_from(["nbsuite", "--config", "ci/nbsuite.toml"]);
        assert_eq!(cli.global.config, Some(PathBuf::from("ci/nbsuite.toml")));
    }

    #[test]
    fn test_completions_bash() {
        let cli = Cli::parse_from(["nbsuite", "completions", "bash"]);
        match cli.command {
            Some(Commands::Completions { shell }) => assert_eq!(shell, Shell::Bash),
            _ => panic!("Expected Completions command"),
        }
    }

    #[test]
    fn test_completions_zsh() {
        let cli = Cli::parse_from(["nbsuite", "completions", "zsh"]);
        match cli.command {
            Some(Commands::Completions { shell }) => assert_eq!(shell, Shell::Zsh),
            _ => panic!("Expected Completions command"),
        }
    }

    #[test]
    fn test_cli_definition_is_valid() {
        Cli::command().debug_assert();
    }
}
