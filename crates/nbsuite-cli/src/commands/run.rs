//! Run command - execute the suite

use super::CommonArgs;
use crate::report::{self, Reporter};
use anyhow::Result;
use colored::*;
use nbsuite_runner::Suite;

/// Run the suite and return the process exit code
pub fn run(mut args: CommonArgs) -> Result<i32> {
    let config = args.load()?;

    // Keep stdout for the JSON document
    let suite = Suite::from_config(&config).with_stdout_to_stderr(args.json);

    // Discover everything before the first backend starts
    let plans = suite.plan()?;
    let excluded = report::excluded_names(&plans);

    if args.json {
        let report = suite.run(plans);
        println!("{}", report::report_json(&report, &excluded));
        return Ok(report.exit_code());
    }

    let artifacts: usize = plans.iter().map(|p| p.group.len()).sum();
    let skipped: usize = plans.iter().map(|p| p.excluded_count()).sum();
    println!(
        "Running {} group{} ({} artifact{}, {} excluded)",
        plans.len().to_string().bold(),
        report::plural(plans.len()),
        artifacts,
        report::plural(artifacts),
        skipped
    );
    println!();

    let reporter = Reporter::new(args.verbose);
    let report = suite.run_with(plans, |event| reporter.event(event));
    reporter.report(&report);

    Ok(report.exit_code())
}
