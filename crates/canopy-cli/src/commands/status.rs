//! `canopy status` command - Display changed files in a worktree.

use std::path::Path;

use anyhow::{Context, Result};
use canopy_core::{GitContext, StatusEngine, WorktreeStatus};
use canopy_git::MatrixRow;
use colored::Colorize;
use serde::Serialize;

use crate::output;

/// Run the status command.
pub async fn run(ctx: &GitContext, path: &Path, matrix: bool, json: bool) -> Result<()> {
    let engine = StatusEngine::new(ctx);

    if matrix {
        let rows = engine
            .status_matrix(path)
            .await?
            .context("Not inside a git repository")?;
        if json {
            let rows: Vec<MatrixJson<'_>> = rows.iter().map(MatrixJson::from).collect();
            println!("{}", serde_json::to_string_pretty(&rows)?);
        } else {
            for row in &rows {
                output::essential(&format!(
                    "{} {} {} {}",
                    row.head, row.workdir, row.stage, row.path
                ));
            }
        }
        return Ok(());
    }

    let status = engine
        .worktree_status(path, None, false)
        .await?
        .context("Not inside a git repository")?;

    if json {
        println!("{}", serde_json::to_string_pretty(&status)?);
    } else {
        print_status(&status);
    }

    Ok(())
}

fn print_status(status: &WorktreeStatus) {
    output::detail(&format!(
        "{} {}  {}",
        output::branch_status(status.status),
        output::branch_name(status.ref_name.as_deref()),
        status.root.display().to_string().dimmed()
    ));

    if status.entries.is_empty() {
        output::info("Nothing to commit, working tree clean");
        return;
    }

    for (path, file_status) in &status.entries {
        output::essential(&format!(
            "  {:<22} {path}",
            output::file_status(*file_status)
        ));
    }
}

#[derive(Serialize)]
struct MatrixJson<'a> {
    path: &'a str,
    head: u8,
    workdir: u8,
    stage: u8,
}

impl<'a> From<&'a MatrixRow> for MatrixJson<'a> {
    fn from(row: &'a MatrixRow) -> Self {
        Self {
            path: &row.path,
            head: row.head,
            workdir: row.workdir,
            stage: row.stage,
        }
    }
}
