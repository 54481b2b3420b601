//! Canopy CLI - inspect and drive git worktrees, status and config.

use clap::Parser;

mod commands;
mod logging;
mod output;

use commands::{Cli, Commands};

#[tokio::main]
async fn main() {
    let cli = Cli::parse();
    logging::init(cli.verbose, cli.log_json);
    output::set_quiet(cli.quiet);

    let result = match commands::load_context(cli.config.as_deref(), cli.global_config.clone()) {
        Ok(ctx) => {
            let ctx = &ctx;
            match cli.command {
                Commands::Root { path } => commands::paths::run_root(&path).await,
                Commands::Paths { path, json } => commands::paths::run_paths(&path, json).await,
                Commands::BranchRoot { root, branch } => {
                    commands::paths::run_branch_root(&root, &branch).await
                }
                Commands::Worktree { command } => commands::worktree::run(ctx, command).await,
                Commands::Status { path, matrix, json } => {
                    commands::status::run(ctx, &path, matrix, json).await
                }
                Commands::Config { command } => commands::config::run(ctx, command).await,
                Commands::Branch {
                    name,
                    delete,
                    start,
                } => commands::branch::run(ctx, name.as_deref(), delete, start.as_deref()).await,
                Commands::Checkout(args) => commands::checkout::run(ctx, args).await,
                Commands::Commit(args) => commands::commit::run(ctx, args).await,
                Commands::Merge {
                    base,
                    compare,
                    dry_run,
                    json,
                } => commands::merge::run(ctx, &base, &compare, dry_run, json).await,
                Commands::Clone(args) => commands::clone::run(ctx, args).await,
                Commands::LsRemote {
                    url,
                    prefix,
                    symrefs,
                    json,
                } => commands::remote::run(ctx, &url, prefix.as_deref(), symrefs, json).await,
                Commands::Snapshot { path } => commands::snapshot::run(ctx, &path).await,
            }
        }
        Err(e) => Err(e),
    };

    if let Err(e) = result {
        output::error(&format!("{e:#}"));
        std::process::exit(1);
    }
}
