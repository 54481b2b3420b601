//! `canopy worktree` command - List, add, remove and prune worktrees.

use std::path::Path;

use anyhow::{Context, Result, bail};
use canopy_core::{GitContext, Removal, Worktree, WorktreeManager};
use colored::Colorize;

use super::WorktreeCommand;
use crate::output;

/// Run the worktree command.
pub async fn run(ctx: &GitContext, command: WorktreeCommand) -> Result<()> {
    let manager = WorktreeManager::new(ctx);
    let cwd = Path::new(".");

    match command {
        WorktreeCommand::List { json } => {
            let worktrees = manager
                .list(cwd)
                .await?
                .context("Not inside a git repository")?;
            if json {
                println!("{}", serde_json::to_string_pretty(&worktrees)?);
            } else {
                print_list(&worktrees);
            }
        }
        WorktreeCommand::Add { path, target } => {
            let root = super::main_root(cwd).await?;
            let worktree = manager
                .add(&root, &path, &target)
                .await
                .with_context(|| format!("Failed to add worktree at {}", path.display()))?;
            output::success(&format!(
                "Created worktree {} at {}",
                worktree.id.bold(),
                worktree.path.display()
            ));
        }
        WorktreeCommand::Remove { path, force } => {
            let worktree = find(&manager, &path).await?;
            match manager.remove(&worktree, force).await? {
                Removal::Removed => {
                    output::success(&format!("Removed worktree {}", worktree.path.display()));
                }
                Removal::SkippedMain => bail!("Refusing to remove the main worktree"),
                Removal::SkippedDirty => {
                    bail!("Worktree has uncommitted changes - use --force to remove anyway")
                }
            }
        }
        WorktreeCommand::Prune => {
            let pruned = manager.prune(cwd).await?;
            if pruned.is_empty() {
                output::info("Nothing to prune");
            }
            for id in pruned {
                output::success(&format!("Pruned {id}"));
            }
        }
    }

    Ok(())
}

/// Find the listed worktree whose root is `path`.
async fn find(manager: &WorktreeManager<'_>, path: &Path) -> Result<Worktree> {
    let target = canopy_core::paths::get_root(path)
        .await
        .with_context(|| format!("{} is not a worktree", path.display()))?;
    let worktrees = manager
        .list(&target)
        .await?
        .context("Not inside a git repository")?;

    worktrees
        .into_iter()
        .find(|w| w.path == target)
        .with_context(|| format!("{} is not a worktree", path.display()))
}

fn print_list(worktrees: &[Worktree]) {
    for worktree in worktrees {
        let name = output::branch_name(worktree.ref_name.as_deref());
        let rev = worktree
            .rev
            .as_deref()
            .map_or_else(String::new, |rev| rev.chars().take(7).collect());
        let marker = if worktree.main { " (main)".dimmed().to_string() } else { String::new() };
        output::essential(&format!(
            "{:<50} {} {}{}",
            worktree.path.display(),
            rev.dimmed(),
            name,
            marker
        ));
    }
}
