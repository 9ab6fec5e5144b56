//! Suite reporter - display group results

use colored::*;
use nbsuite_runner::{
    GroupPlan, PlanWarning, RunEvent, RunGroup, RunOutcome, RunResult, SuiteReport,
};
use serde_json::{json, Value};
use std::collections::BTreeMap;

/// Reporter for terminal output
pub struct Reporter {
    /// Show each group's artifacts before it runs
    verbose: bool,
}

impl Reporter {
    /// Create a new reporter
    pub fn new(verbose: bool) -> Self {
        Self { verbose }
    }

    /// Handle a progress event from the runner
    pub fn event(&self, event: RunEvent<'_>) {
        match event {
            RunEvent::Started(group) => self.print_started(group),
            RunEvent::Finished(result) => self.print_result(result),
        }
    }

    fn print_started(&self, group: &RunGroup) {
        if group.is_empty() {
            return;
        }
        println!(
            "{} {} ({} artifact{}, {})",
            "==>".cyan().bold(),
            group.name.bold(),
            group.len(),
            plural(group.len()),
            group.backend
        );
        if self.verbose {
            for path in group.paths() {
                println!("    {}", path.display().to_string().dimmed());
            }
        }
    }

    fn print_result(&self, result: &RunResult) {
        match &result.outcome {
            RunOutcome::Passed => println!(
                "{} {} ({:.2?})",
                "PASS".green().bold(),
                result.group,
                result.duration
            ),
            RunOutcome::Skipped => println!(
                "{} {} (no artifacts)",
                "SKIP".yellow().bold(),
                result.group
            ),
            RunOutcome::Failed(_) => println!(
                "{} {} ({:.2?})",
                "FAIL".red().bold(),
                result.group,
                result.duration
            ),
        }
    }

    /// Print summary, warnings and failures
    pub fn report(&self, report: &SuiteReport) {
        println!();
        self.print_summary(report);
        self.print_warnings(&report.warnings);
        self.print_failures(report);
    }

    fn print_summary(&self, report: &SuiteReport) {
        println!("{}", "─".repeat(50));

        let status = if report.is_success() {
            "PASSED".green().bold()
        } else {
            "FAILED".red().bold()
        };
        let failed = report.failed();

        println!(
            "Suite result: {} | {} groups, {} passed, {} failed, {} skipped",
            status,
            report.results.len().to_string().bold(),
            report.passed().to_string().green().bold(),
            if failed > 0 {
                failed.to_string().red().bold()
            } else {
                failed.to_string().normal()
            },
            report.skipped()
        );
        println!("Time: {:.2?}", report.duration());
    }

    fn print_warnings(&self, warnings: &[PlanWarning]) {
        if warnings.is_empty() {
            return;
        }

        println!();
        println!("{}", "Warnings:".yellow().bold());
        for warning in warnings {
            println!("  {} {}", "●".yellow(), warning);
        }
    }

    fn print_failures(&self, report: &SuiteReport) {
        let failures: Vec<_> = report.failures().collect();
        if failures.is_empty() {
            return;
        }

        println!();
        println!("{}", "Failures:".red().bold());
        for result in failures {
            if let RunOutcome::Failed(err) = &result.outcome {
                println!("  {} {}", "●".red(), result.group.bold());
                println!("    {}", err.to_string().dimmed());
            }
        }
    }
}

/// Names each group's exclusions removed, taken before the plans are consumed
pub fn excluded_names(plans: &[GroupPlan]) -> BTreeMap<String, Vec<String>> {
    plans
        .iter()
        .map(|plan| {
            let names = plan
                .exclusions
                .iter()
                .flat_map(|e| e.removed.iter())
                .map(|a| a.path().display().to_string())
                .collect();
            (plan.group.name.clone(), names)
        })
        .collect()
}

/// JSON document for a finished run
pub fn report_json(report: &SuiteReport, excluded: &BTreeMap<String, Vec<String>>) -> Value {
    let groups: Vec<_> = report
        .results
        .iter()
        .map(|r| {
            let (kind, exit_code, message) = match &r.outcome {
                RunOutcome::Failed(err) => (
                    Some(err.kind().as_str()),
                    err.exit_code(),
                    Some(err.to_string()),
                ),
                _ => (None, None, None),
            };
            json!({
                "name": r.group,
                "backend": r.backend,
                "artifacts": r.artifacts,
                "excluded": excluded.get(&r.group).cloned().unwrap_or_default(),
                "outcome": r.outcome.as_str(),
                "failure": kind,
                "exit_code": exit_code,
                "message": message,
                "duration_ms": r.duration.as_millis(),
            })
        })
        .collect();

    json!({
        "timestamp": chrono::Utc::now().to_rfc3339(),
        "success": report.is_success(),
        "exit_code": report.exit_code(),
        "groups": groups,
        "passed": report.passed(),
        "failed": report.failed(),
        "skipped": report.skipped(),
        "warnings": warning_strings(&report.warnings),
        "duration_ms": report.duration().as_millis(),
    })
}

/// Warnings rendered for JSON output
pub fn warning_strings(warnings: &[PlanWarning]) -> Vec<String> {
    warnings.iter().map(ToString::to_string).collect()
}

pub fn plural(n: usize) -> &'static str {
    if n == 1 {
        ""
    } else {
        "s"
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use nbsuite_runner::{
        AppliedExclusion, Artifact, BackendError, ExclusionMismatchWarning, ExclusionRule,
    };
    use std::time::Duration;

    fn result(group: &str, outcome: RunOutcome) -> RunResult {
        RunResult {
            group: group.to_string(),
            backend: "nbmake".to_string(),
            artifacts: 2,
            outcome,
            duration: Duration::from_millis(1500),
        }
    }

    fn mixed_report() -> SuiteReport {
        SuiteReport {
            results: vec![
                result(
                    "docs notebooks",
                    RunOutcome::Failed(BackendError::TestFailure {
                        group: "docs notebooks".to_string(),
                        backend: "nbmake".to_string(),
                        exit_code: Some(1),
                    }),
                ),
                result("test notebooks", RunOutcome::Skipped),
                result("standalone module", RunOutcome::Passed),
            ],
            warnings: vec![PlanWarning::ExclusionMismatch(ExclusionMismatchWarning {
                group: "docs notebooks".to_string(),
                name: "old.ipynb".to_string(),
            })],
        }
    }

    #[test]
    fn test_reporter_does_not_panic() {
        let reporter = Reporter::new(true);
        let report = mixed_report();
        for r in &report.results {
            reporter.event(RunEvent::Finished(r));
        }
        reporter.report(&report);
        reporter.report(&SuiteReport::default());
    }

    #[test]
    fn test_report_json() {
        let mut excluded = BTreeMap::new();
        excluded.insert(
            "docs notebooks".to_string(),
            vec!["docs/tutorials/tutorial_dev_spectral_libraries.ipynb".to_string()],
        );

        let value = report_json(&mixed_report(), &excluded);

        assert_eq!(value["success"], false);
        assert_eq!(value["exit_code"], 1);
        assert_eq!(value["passed"], 1);
        assert_eq!(value["failed"], 1);
        assert_eq!(value["skipped"], 1);

        let docs = &value["groups"][0];
        assert_eq!(docs["outcome"], "failed");
        assert_eq!(docs["failure"], "test-failure");
        assert_eq!(docs["exit_code"], 1);
        assert_eq!(docs["excluded"][0], "docs/tutorials/tutorial_dev_spectral_libraries.ipynb");
        assert_eq!(docs["duration_ms"], 1500);

        let module = &value["groups"][2];
        assert_eq!(module["outcome"], "passed");
        assert!(module["failure"].is_null());
        assert_eq!(module["excluded"], json!([]));

        assert_eq!(
            value["warnings"][0],
            "exclusion 'old.ipynb' in group 'docs notebooks' matched no artifacts"
        );
        assert!(chrono::DateTime::parse_from_rfc3339(value["timestamp"].as_str().unwrap()).is_ok());
    }

    #[test]
    fn test_excluded_names() {
        let removed = Artifact::new("docs/tutorials/skip.ipynb", "docs notebooks");
        let plans = vec![GroupPlan {
            group: RunGroup::new("docs notebooks", "nbmake", Vec::new()),
            exclusions: vec![AppliedExclusion {
                rule: ExclusionRule::new("skip.ipynb"),
                removed: vec![removed],
            }],
            inactive_rules: Vec::new(),
            warnings: Vec::new(),
        }];

        let names = excluded_names(&plans);
        assert_eq!(names["docs notebooks"], vec!["docs/tutorials/skip.ipynb"]);
    }

    #[test]
    fn test_plural() {
        assert_eq!(plural(1), "");
        assert_eq!(plural(0), "s");
        assert_eq!(plural(3), "s");
    }
}
