//! Command definitions and dispatch.

use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use canopy_core::{GitContext, Settings};
use clap::{Args, Parser, Subcommand};
use tracing::debug;

pub mod branch;
pub mod checkout;
pub mod clone;
pub mod commit;
pub mod config;
pub mod merge;
pub mod paths;
pub mod remote;
pub mod snapshot;
pub mod status;
pub mod worktree;

/// Canopy - inspect and drive git worktrees, status and config.
#[derive(Parser)]
#[command(name = "canopy")]
#[command(author, version, about, long_about = None)]
#[command(propagate_version = true)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,

    /// Settings file (default: `<config dir>/canopy/canopy.toml`).
    #[arg(long, global = true, value_name = "FILE")]
    pub config: Option<PathBuf>,

    /// Global git config file (default: `~/.gitconfig`).
    #[arg(long, global = true, value_name = "FILE")]
    pub global_config: Option<PathBuf>,

    /// Increase log verbosity (-v debug, -vv trace).
    #[arg(short, long, global = true, action = clap::ArgAction::Count)]
    pub verbose: u8,

    /// Suppress informational output.
    #[arg(short, long, global = true)]
    pub quiet: bool,

    /// Emit logs as JSON lines.
    #[arg(long, global = true)]
    pub log_json: bool,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Print the working tree root containing a path.
    Root {
        #[arg(default_value = ".")]
        path: PathBuf,
    },

    /// Show the repository metadata locations for a path.
    Paths {
        #[arg(default_value = ".")]
        path: PathBuf,

        /// Output as JSON.
        #[arg(long)]
        json: bool,
    },

    /// Print the worktree that has a branch checked out.
    BranchRoot {
        /// Any path inside the repository.
        root: PathBuf,

        branch: String,
    },

    /// Manage linked worktrees.
    Worktree {
        #[command(subcommand)]
        command: WorktreeCommand,
    },

    /// Show changed files in the current worktree.
    #[command(alias = "st")]
    Status {
        #[arg(default_value = ".")]
        path: PathBuf,

        /// Show HEAD/workdir/stage rows instead of status labels.
        #[arg(long)]
        matrix: bool,

        /// Output as JSON.
        #[arg(long)]
        json: bool,
    },

    /// Read and write git config values.
    Config {
        #[command(subcommand)]
        command: ConfigCommand,
    },

    /// Show, create or delete branches.
    Branch {
        /// Branch to create (or delete with `-d`).
        name: Option<String>,

        /// Delete the branch.
        #[arg(short, long, requires = "name")]
        delete: bool,

        /// Start point for a new branch (default: HEAD).
        #[arg(long, conflicts_with = "delete")]
        start: Option<String>,
    },

    /// Switch branches or restore files.
    #[command(alias = "co")]
    Checkout(CheckoutArgs),

    /// Record staged changes.
    Commit(CommitArgs),

    /// Merge one branch into another.
    Merge {
        /// Branch receiving the merge.
        base: String,

        /// Branch being merged.
        compare: String,

        /// Report the outcome without writing anything.
        #[arg(long)]
        dry_run: bool,

        /// Output as JSON.
        #[arg(long)]
        json: bool,
    },

    /// Clone a repository.
    Clone(CloneArgs),

    /// List refs advertised by a remote.
    LsRemote {
        url: String,

        /// Only refs starting with this prefix.
        #[arg(long)]
        prefix: Option<String>,

        /// Show symbolic ref targets.
        #[arg(long)]
        symrefs: bool,

        /// Output as JSON.
        #[arg(long)]
        json: bool,
    },

    /// Print repository, branch and file records as JSON.
    Snapshot {
        #[arg(default_value = ".")]
        path: PathBuf,
    },
}

#[derive(Subcommand)]
pub enum WorktreeCommand {
    /// List the main and linked worktrees.
    #[command(alias = "ls")]
    List {
        /// Output as JSON.
        #[arg(long)]
        json: bool,
    },

    /// Create a linked worktree.
    Add {
        /// Directory for the new worktree.
        path: PathBuf,

        /// Branch, remote branch or revision to check out.
        target: String,
    },

    /// Remove a linked worktree and its branch.
    #[command(alias = "rm")]
    Remove {
        path: PathBuf,

        /// Remove even with uncommitted changes.
        #[arg(short, long)]
        force: bool,
    },

    /// Delete admin data for worktrees whose directory is gone.
    Prune,
}

#[derive(Subcommand)]
pub enum ConfigCommand {
    /// Print a config value.
    Get {
        key: String,

        #[command(flatten)]
        scope: ScopeArgs,

        /// Show which file the value came from.
        #[arg(long)]
        show_origin: bool,
    },

    /// Set a config value.
    Set {
        key: String,
        value: String,

        /// Write to the global config instead of the repository's.
        #[arg(long)]
        global: bool,
    },

    /// Remove a config value.
    Unset {
        key: String,

        /// Remove from the global config instead of the repository's.
        #[arg(long)]
        global: bool,
    },
}

#[derive(Args)]
pub struct ScopeArgs {
    /// Only read the repository config.
    #[arg(long, conflicts_with = "global")]
    pub local: bool,

    /// Only read the global config.
    #[arg(long)]
    pub global: bool,
}

#[derive(Args)]
pub struct CheckoutArgs {
    /// Branch or revision (default: HEAD).
    pub ref_name: Option<String>,

    /// Remote used to find branches that only exist upstream.
    #[arg(long)]
    pub remote: Option<String>,

    /// Overwrite local changes.
    #[arg(short, long)]
    pub force: bool,

    /// Move HEAD without touching files.
    #[arg(long)]
    pub no_checkout: bool,

    /// Update files without moving HEAD.
    #[arg(long)]
    pub no_update_head: bool,

    /// Report what would change.
    #[arg(long)]
    pub dry_run: bool,

    /// Restore only these paths.
    #[arg(last = true)]
    pub paths: Vec<String>,
}

#[derive(Args)]
pub struct CommitArgs {
    /// Commit message.
    #[arg(short, long)]
    pub message: String,

    /// Sign with this GPG key.
    #[arg(long, value_name = "KEY")]
    pub sign: Option<String>,

    /// Branch to commit to (default: HEAD).
    #[arg(long = "ref", value_name = "BRANCH")]
    pub ref_name: Option<String>,

    /// Write the commit object without moving any ref.
    #[arg(long)]
    pub dry_run: bool,

    /// Leave the branch pointing at its old commit.
    #[arg(long)]
    pub no_update_branch: bool,

    /// Author as `Name <email>`.
    #[arg(long)]
    pub author: Option<String>,
}

#[derive(Args)]
pub struct CloneArgs {
    /// Remote URL.
    pub url: String,

    /// Target directory.
    pub dir: PathBuf,

    /// Branch to check out.
    #[arg(short, long)]
    pub branch: Option<String>,

    /// Only fetch the checked-out branch.
    #[arg(long)]
    pub single_branch: bool,

    /// Don't check out files after cloning.
    #[arg(long)]
    pub no_checkout: bool,

    /// Don't fetch tags.
    #[arg(long)]
    pub no_tags: bool,

    /// Shallow clone with this many commits.
    #[arg(long)]
    pub depth: Option<u32>,
}

/// Load settings and build the context every command runs against.
pub fn load_context(config: Option<&Path>, global_config: Option<PathBuf>) -> Result<GitContext> {
    let settings = match config {
        Some(path) => Settings::load(path)
            .with_context(|| format!("Failed to load settings from {}", path.display()))?,
        None => match Settings::default_path() {
            Some(path) => Settings::load(&path)
                .with_context(|| format!("Failed to load settings from {}", path.display()))?,
            None => Settings::default(),
        },
    };

    let mut ctx = GitContext::new(settings);
    if let Some(path) = global_config {
        debug!(path = %path.display(), "using global config override");
        ctx = ctx.with_global_config(path);
    }
    Ok(ctx)
}

/// Main worktree root for `path`, failing outside a repository.
pub async fn main_root(path: &Path) -> Result<PathBuf> {
    let paths = canopy_core::paths::get_worktree_paths(path)
        .await?
        .context("Not inside a git repository")?;
    Ok(paths.dir)
}

/// Root of the worktree (main or linked) containing `path`.
pub async fn worktree_root(path: &Path) -> Result<PathBuf> {
    canopy_core::paths::get_root(path)
        .await
        .context("Not inside a git repository")
}
