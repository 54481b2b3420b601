//! `canopy root`, `canopy paths` and `canopy branch-root` commands - Locate
//! repository metadata.

use std::path::Path;

use anyhow::{Context, Result};
use canopy_core::paths;

use crate::output;

/// Print the working tree root containing `path`.
pub async fn run_root(path: &Path) -> Result<()> {
    let root = paths::get_root(path)
        .await
        .context("Not inside a git repository")?;
    output::essential(&root.display().to_string());
    Ok(())
}

/// Print every metadata location for `path`.
pub async fn run_paths(path: &Path, json: bool) -> Result<()> {
    let resolved = paths::get_worktree_paths(path)
        .await?
        .context("Not inside a git repository")?;

    if json {
        println!("{}", serde_json::to_string_pretty(&resolved)?);
        return Ok(());
    }

    let rows = [
        ("dir", Some(&resolved.dir)),
        ("gitdir", Some(&resolved.gitdir)),
        ("worktrees", resolved.worktrees.as_ref()),
        ("worktree_dir", resolved.worktree_dir.as_ref()),
        ("worktree_gitdir", resolved.worktree_gitdir.as_ref()),
        ("worktree_link", resolved.worktree_link.as_ref()),
    ];
    for (label, value) in rows {
        if let Some(value) = value {
            output::essential(&format!("{label:<16} {}", value.display()));
        }
    }
    Ok(())
}

/// Print the worktree with `branch` checked out.
pub async fn run_branch_root(root: &Path, branch: &str) -> Result<()> {
    match paths::get_branch_root(root, branch).await? {
        Some(path) => output::essential(&path.display().to_string()),
        None => output::warn(&format!("Branch '{branch}' is not checked out in any worktree")),
    }
    Ok(())
}
