//! `canopy branch` command - Show, create or delete branches.

use std::path::Path;

use anyhow::Result;
use canopy_core::{CurrentBranchOptions, GitContext, RepositoryOperations};
use colored::Colorize;

use crate::output;

/// Run the branch command.
pub async fn run(
    ctx: &GitContext,
    name: Option<&str>,
    delete: bool,
    start: Option<&str>,
) -> Result<()> {
    let ops = RepositoryOperations::new(ctx);
    let root = super::worktree_root(Path::new(".")).await?;

    match (name, delete) {
        (None, _) => {
            let current = ops.current_branch(&CurrentBranchOptions::new(&root)).await?;
            match current {
                Some(branch) => output::essential(&branch),
                None => output::warn("HEAD is detached"),
            }
        }
        (Some(name), true) => {
            ops.delete_branch(&root, name).await?;
            output::success(&format!("Deleted branch {}", name.bold()));
        }
        (Some(name), false) => {
            let oid = ops.create_branch(&root, name, start).await?;
            let short = oid.to_string();
            output::success(&format!(
                "Created branch {} at {}",
                name.bold(),
                short.get(..7).unwrap_or(&short).dimmed()
            ));
        }
    }

    Ok(())
}
