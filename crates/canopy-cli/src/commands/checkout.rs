//! `canopy checkout` command - Switch branches or restore files.

use std::path::Path;

use anyhow::Result;
use canopy_core::{CheckoutOptions, GitContext, RepositoryOperations};

use super::CheckoutArgs;
use crate::output;

/// Run the checkout command.
pub async fn run(ctx: &GitContext, args: CheckoutArgs) -> Result<()> {
    let root = super::worktree_root(Path::new(".")).await?;

    let options = CheckoutOptions {
        dir: root,
        gitdir: None,
        ref_name: args.ref_name.clone(),
        filepaths: args.paths,
        remote: args.remote,
        no_checkout: args.no_checkout,
        no_update_head: args.no_update_head.then_some(true),
        dry_run: args.dry_run,
        force: args.force,
    };
    RepositoryOperations::new(ctx).checkout(&options).await?;

    let target = args.ref_name.as_deref().unwrap_or("HEAD");
    if options.dry_run {
        output::info(&format!("Checkout of {target} would succeed"));
    } else if !options.filepaths.is_empty() {
        output::success(&format!(
            "Restored {} path(s) from {target}",
            options.filepaths.len()
        ));
    } else {
        output::success(&format!("Checked out {target}"));
    }
    Ok(())
}
