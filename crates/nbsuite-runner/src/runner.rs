//! Suite runner - execute run groups and aggregate their outcomes

use crate::backend::Backend;
use crate::error::BackendError;
use crate::exit;
use crate::group::{GroupPlan, PlanWarning, RunGroup};
use std::collections::BTreeMap;
use std::time::{Duration, Instant};

/// Result of running a single group
#[derive(Debug, Clone)]
pub enum RunOutcome {
    /// Backend ran and reported success
    Passed,
    /// Group had no artifacts; backend was not invoked
    Skipped,
    /// Backend could not run or reported failing tests
    Failed(BackendError),
}

impl RunOutcome {
    /// Check if this outcome is a failure
    pub fn is_fail(&self) -> bool {
        matches!(self, RunOutcome::Failed(_))
    }

    /// Stable identifier used in reports
    pub fn as_str(&self) -> &'static str {
        match self {
            RunOutcome::Passed => "passed",
            RunOutcome::Skipped => "skipped",
            RunOutcome::Failed(_) => "failed",
        }
    }
}

/// A completed group run
#[derive(Debug, Clone)]
pub struct RunResult {
    /// Group name
    pub group: String,
    /// Backend name
    pub backend: String,
    /// Number of artifacts submitted
    pub artifacts: usize,
    /// What happened
    pub outcome: RunOutcome,
    /// Wall-clock time spent in the backend
    pub duration: Duration,
}

/// Progress notifications emitted while a suite runs
#[derive(Debug)]
pub enum RunEvent<'a> {
    /// A group is about to be handed to its backend
    Started(&'a RunGroup),
    /// A group finished
    Finished(&'a RunResult),
}

/// Run one group.
///
/// An empty group is a no-op: the backend is not invoked and the outcome
/// is [`RunOutcome::Skipped`].
pub fn run(group: &RunGroup, backend: &dyn Backend) -> RunResult {
    if group.is_empty() {
        return skipped(group);
    }

    let start = Instant::now();
    let outcome = match backend.invoke(group) {
        Ok(status) if status.success => RunOutcome::Passed,
        Ok(status) => RunOutcome::Failed(BackendError::TestFailure {
            group: group.name.clone(),
            backend: group.backend.clone(),
            exit_code: status.exit_code,
        }),
        Err(err) => RunOutcome::Failed(err),
    };

    RunResult::new(group, outcome, start.elapsed())
}

fn skipped(group: &RunGroup) -> RunResult {
    tracing::info!(group = %group.name, "no artifacts, skipping backend");
    RunResult::new(group, RunOutcome::Skipped, Duration::ZERO)
}

impl RunResult {
    fn new(group: &RunGroup, outcome: RunOutcome, duration: Duration) -> Self {
        Self {
            group: group.name.clone(),
            backend: group.backend.clone(),
            artifacts: group.len(),
            outcome,
            duration,
        }
    }
}

/// Aggregated results of a suite run
#[derive(Debug, Clone, Default)]
pub struct SuiteReport {
    /// Per-group results in execution order
    pub results: Vec<RunResult>,
    /// Non-fatal findings collected during planning
    pub warnings: Vec<PlanWarning>,
}

impl SuiteReport {
    /// Number of groups that passed
    pub fn passed(&self) -> usize {
        self.count(|o| matches!(o, RunOutcome::Passed))
    }

    /// Number of groups that failed
    pub fn failed(&self) -> usize {
        self.count(RunOutcome::is_fail)
    }

    /// Number of groups skipped for having no artifacts
    pub fn skipped(&self) -> usize {
        self.count(|o| matches!(o, RunOutcome::Skipped))
    }

    /// Results of failed groups
    pub fn failures(&self) -> impl Iterator<Item = &RunResult> {
        self.results.iter().filter(|r| r.outcome.is_fail())
    }

    /// Check if every group passed or was skipped
    pub fn is_success(&self) -> bool {
        self.failed() == 0
    }

    /// Total time spent in backends
    pub fn duration(&self) -> Duration {
        self.results.iter().map(|r| r.duration).sum()
    }

    /// Process exit code: non-zero if any group failed
    pub fn exit_code(&self) -> i32 {
        if self.is_success() {
            exit::SUCCESS
        } else {
            exit::TEST_FAILURE
        }
    }

    fn count(&self, pred: impl Fn(&RunOutcome) -> bool) -> usize {
        self.results.iter().filter(|r| pred(&r.outcome)).count()
    }
}

/// Runs groups through named backends
#[derive(Default)]
pub struct SuiteRunner {
    backends: BTreeMap<String, Box<dyn Backend>>,
}

impl SuiteRunner {
    /// Create a runner with no backends
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a backend under `name`, replacing any previous one
    pub fn register(&mut self, name: impl Into<String>, backend: Box<dyn Backend>) {
        self.backends.insert(name.into(), backend);
    }

    /// Builder form of [`SuiteRunner::register`]
    pub fn with_backend(mut self, name: impl Into<String>, backend: impl Backend + 'static) -> Self {
        self.register(name, Box::new(backend));
        self
    }

    /// Run every planned group in order.
    ///
    /// A failing group never prevents later groups from running.
    pub fn run_all<F>(&self, plans: Vec<GroupPlan>, mut observer: F) -> SuiteReport
    where
        F: FnMut(RunEvent<'_>),
    {
        let mut report = SuiteReport::default();

        for plan in plans {
            report.warnings.extend(plan.warnings);
            let group = plan.group;

            observer(RunEvent::Started(&group));
            let result = match self.backends.get(&group.backend) {
                Some(backend) => run(&group, backend.as_ref()),
                None if group.is_empty() => skipped(&group),
                None => RunResult::new(
                    &group,
                    RunOutcome::Failed(BackendError::invocation(
                        &group.name,
                        &group.backend,
                        "no such backend is registered",
                    )),
                    Duration::ZERO,
                ),
            };

            if let RunOutcome::Failed(err) = &result.outcome {
                tracing::info!(group = %result.group, error = %err, "group failed");
            }
            observer(RunEvent::Finished(&result));
            report.results.push(result);
        }

        report
    }
}
