//! `canopy commit` command - Record staged changes.

use std::path::Path;

use anyhow::{Context, Result};
use canopy_core::{Author, CommitOptions, GitContext, RepositoryOperations};
use colored::Colorize;

use super::CommitArgs;
use crate::output;

/// Run the commit command.
pub async fn run(ctx: &GitContext, args: CommitArgs) -> Result<()> {
    let root = super::worktree_root(Path::new(".")).await?;

    let author = args.author.as_deref().map(parse_author).transpose()?;
    let options = CommitOptions {
        author,
        signing_key: args.sign,
        dry_run: args.dry_run,
        no_update_branch: args.no_update_branch,
        ref_name: args.ref_name,
        ..CommitOptions::new(root, args.message)
    };

    let oid = RepositoryOperations::new(ctx).commit(&options).await?;
    let oid = oid.to_string();

    if options.dry_run || options.no_update_branch {
        output::info(&format!("Wrote commit {} (no ref moved)", oid.dimmed()));
    } else {
        output::success(&format!("Committed {}", oid.get(..7).unwrap_or(&oid).bold()));
    }
    output::essential(&oid);
    Ok(())
}

/// Parse `Name <email>`.
fn parse_author(value: &str) -> Result<Author> {
    let (name, rest) = value
        .split_once('<')
        .context("Author must look like 'Name <email>'")?;
    let email = rest
        .strip_suffix('>')
        .context("Author must look like 'Name <email>'")?;

    Ok(Author {
        name: Some(name.trim().to_string()),
        email: Some(email.trim().to_string()),
        ..Author::default()
    })
}
