//! `canopy merge` command - Merge one branch into another.

use std::path::Path;

use anyhow::{Result, bail};
use canopy_core::{GitContext, MergeReport, RepositoryOperations};
use canopy_git::MergeOutcome;
use colored::Colorize;

use crate::output;

/// Run the merge command.
pub async fn run(
    ctx: &GitContext,
    base: &str,
    compare: &str,
    dry_run: bool,
    json: bool,
) -> Result<()> {
    let root = super::worktree_root(Path::new(".")).await?;
    let report = RepositoryOperations::new(ctx)
        .merge(&root, base, compare, dry_run)
        .await?;

    if json {
        println!("{}", serde_json::to_string_pretty(&report)?);
        return Ok(());
    }

    print_report(&report, base, compare, dry_run)
}

fn print_report(report: &MergeReport, base: &str, compare: &str, dry_run: bool) -> Result<()> {
    if report.needs_identity() {
        output::warn(&format!(
            "Missing {} - merged with the placeholder identity",
            report.missing_configs.join(", ")
        ));
    }

    let prefix = if dry_run { "Would merge" } else { "Merged" };
    match &report.outcome {
        MergeOutcome::UpToDate => {
            output::info(&format!("{} is already up to date with {compare}", base.bold()));
        }
        MergeOutcome::FastForward(oid) => output::success(&format!(
            "{prefix} {compare} into {} (fast-forward to {})",
            base.bold(),
            short(&oid.to_string()).dimmed()
        )),
        MergeOutcome::Merged(oid) => {
            let suffix = oid.map_or_else(String::new, |oid| {
                format!(" as {}", short(&oid.to_string()).dimmed())
            });
            output::success(&format!("{prefix} {compare} into {}{suffix}", base.bold()));
        }
        MergeOutcome::Conflicted(paths) => {
            output::error(&format!("Merging {compare} into {base} conflicts in:"));
            for path in paths {
                output::detail(&format!("  {}", path.red()));
            }
            bail!("Merge aborted, nothing was written");
        }
    }
    Ok(())
}

fn short(oid: &str) -> &str {
    oid.get(..7).unwrap_or(oid)
}
