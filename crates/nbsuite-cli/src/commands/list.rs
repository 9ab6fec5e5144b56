//! List command - show what a run would do without invoking any backend

use super::CommonArgs;
use crate::report;
use anyhow::Result;
use nbsuite_runner::{exit, GroupPlan, Suite};
use serde_json::json;

/// Print every group's planned artifacts
pub fn run(mut args: CommonArgs) -> Result<i32> {
    let config = args.load()?;
    let suite = Suite::from_config(&config);
    let plans = suite.plan()?;

    if args.json {
        println!("{}", listing_json(&suite, &plans));
    } else {
        print!("{}", render(&suite, &plans));
    }

    Ok(exit::SUCCESS)
}

/// Plain-text listing
pub fn render(suite: &Suite, plans: &[GroupPlan]) -> String {
    let mut lines = Vec::new();

    for plan in plans {
        let group = &plan.group;
        lines.push(format!("{} [{}]", group.name, group.backend));

        if let Some(backend) = suite.backend(&group.backend) {
            let command = backend.command_line(&nbsuite_runner::RunGroup::new(
                group.name.clone(),
                group.backend.clone(),
                Vec::new(),
            ));
            lines.push(format!("  command: {} <artifacts>", command.join(" ")));
        }

        if group.is_empty() {
            lines.push("  (no artifacts, backend will not run)".to_string());
        }
        lines.extend(group.paths().map(|path| format!("  + {}", path.display())));

        for applied in &plan.exclusions {
            for removed in &applied.removed {
                lines.push(match &applied.rule.reason {
                    Some(reason) => format!("  - {} ({})", removed.path().display(), reason),
                    None => format!("  - {}", removed.path().display()),
                });
            }
        }

        lines.extend(
            plan.inactive_rules
                .iter()
                .map(|rule| format!("  ~ {} (inactive)", rule.name)),
        );
        lines.extend(plan.warnings.iter().map(|warning| format!("  ! {}", warning)));
    }

    lines.into_iter().map(|line| line + "\n").collect()
}

fn listing_json(suite: &Suite, plans: &[GroupPlan]) -> serde_json::Value {
    let groups: Vec<_> = plans
        .iter()
        .map(|plan| {
            let group = &plan.group;
            let command = suite
                .backend(&group.backend)
                .map(|b| b.command_line(group));
            json!({
                "name": group.name,
                "backend": group.backend,
                "command": command,
                "artifacts": group.paths().map(|p| p.display().to_string()).collect::<Vec<_>>(),
                "excluded": plan.exclusions.iter().map(|e| json!({
                    "name": e.rule.name,
                    "reason": e.rule.reason,
                    "removed": e.removed.iter().map(|a| a.path().display().to_string()).collect::<Vec<_>>(),
                })).collect::<Vec<_>>(),
                "inactive": plan.inactive_rules.iter().map(|r| r.name.clone()).collect::<Vec<_>>(),
                "warnings": report::warning_strings(&plan.warnings),
            })
        })
        .collect();

    json!({ "groups": groups })
}
