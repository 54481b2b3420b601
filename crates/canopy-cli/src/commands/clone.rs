//! `canopy clone` command - Clone a repository.

use std::sync::Arc;

use anyhow::{Context, Result};
use canopy_core::{CloneOptions, CloneSource, GitContext, RepositoryOperations};
use colored::Colorize;

use super::CloneArgs;
use crate::output;

/// Run the clone command.
pub async fn run(ctx: &GitContext, args: CloneArgs) -> Result<()> {
    output::info(&format!("Cloning {}", args.url.bold()));

    let options = CloneOptions {
        ref_name: args.branch,
        single_branch: args.single_branch,
        no_checkout: args.no_checkout,
        no_tags: args.no_tags,
        depth: args.depth,
        on_progress: Some(Arc::new(|phase: &str, loaded: usize, total: usize| {
            if total > 0 && loaded == total {
                output::detail(&format!("  {phase}: {loaded}/{total}"));
            }
        })),
        ..CloneOptions::new(CloneSource::Url(&args.url), &args.dir)
    };

    let path = RepositoryOperations::new(ctx)
        .clone(&options)
        .await
        .with_context(|| format!("Failed to clone {}", args.url))?;

    output::success(&format!("Cloned into {}", path.display()));
    Ok(())
}
