//! Suite runner for notebook-based test suites
//!
//! Discovers test artifacts under configured roots, removes known-bad
//! artifacts by exact file name, and hands each run group to an external
//! test backend. Groups run one after another; a failing group never stops
//! the groups after it.
//!
//! ```no_run
//! use nbsuite_config::ConfigLoader;
//! use nbsuite_runner::Suite;
//! use std::path::Path;
//!
//! let config = ConfigLoader::new().load_from_directory(Path::new(".")).unwrap();
//! let suite = Suite::from_config(&config);
//! let plans = suite.plan().unwrap();
//! let report = suite.run(plans);
//! std::process::exit(report.exit_code());
//! ```

pub mod artifact;
pub mod backend;
pub mod discovery;
pub mod error;
pub mod exclusion;
pub mod group;
pub mod runner;
pub mod suite;

pub use artifact::{Artifact, ArtifactPattern};
pub use backend::{Backend, BackendStatus, CommandBackend};
pub use discovery::{discover, Discovery, DiscoveryOptions, SkippedEntry};
pub use error::{BackendError, DiscoveryError, FailureKind};
pub use exclusion::{exclude, Exclusion, ExclusionMismatchWarning, ExclusionRule};
pub use group::{
    AppliedExclusion, ArtifactSource, GroupDefinition, GroupPlan, PlanWarning, RunGroup,
};
pub use runner::{run, RunEvent, RunOutcome, RunResult, SuiteReport, SuiteRunner};
pub use suite::Suite;

/// Process exit codes
pub mod exit {
    /// Every group passed or was empty
    pub const SUCCESS: i32 = 0;
    /// At least one group failed to start or reported failing tests
    pub const TEST_FAILURE: i32 = 1;
    /// Configuration or discovery failed before anything ran
    pub const FATAL: i32 = 2;
}
