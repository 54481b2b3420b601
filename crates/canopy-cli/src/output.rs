//! Terminal output formatting utilities.

use std::sync::atomic::{AtomicBool, Ordering};

use canopy_core::BranchStatus;
use canopy_git::GitStatus;
use colored::Colorize;

static QUIET_MODE: AtomicBool = AtomicBool::new(false);

/// Set quiet mode globally. Call once at startup.
pub fn set_quiet(quiet: bool) {
    QUIET_MODE.store(quiet, Ordering::Relaxed);
}

fn is_quiet() -> bool {
    QUIET_MODE.load(Ordering::Relaxed)
}

/// Print a success message (suppressed in quiet mode).
pub fn success(msg: &str) {
    if !is_quiet() {
        println!("{} {}", "✓".green(), msg);
    }
}

/// Print an error message (always prints to stderr).
pub fn error(msg: &str) {
    eprintln!("{} {}", "✗".red(), msg);
}

/// Print a warning message (always prints to stderr).
pub fn warn(msg: &str) {
    eprintln!("{} {}", "!".yellow(), msg);
}

/// Print an info message (suppressed in quiet mode).
pub fn info(msg: &str) {
    if !is_quiet() {
        println!("{} {}", "→".blue(), msg);
    }
}

/// Print a detail line without prefix (suppressed in quiet mode).
pub fn detail(msg: &str) {
    if !is_quiet() {
        println!("{msg}");
    }
}

/// Print essential machine-readable output (always prints).
///
/// Use for results that should be available for piping, like paths.
pub fn essential(msg: &str) {
    println!("{msg}");
}

/// Colored label for a path status.
#[must_use]
pub fn file_status(status: GitStatus) -> String {
    let label = status.as_str();
    match status {
        GitStatus::Unmodified | GitStatus::Ignored => label.dimmed().to_string(),
        GitStatus::Unmerged => label.red().bold().to_string(),
        GitStatus::Absent | GitStatus::UnstagedAdded => label.cyan().to_string(),
        s if s.is_unstaged() => label.yellow().to_string(),
        _ => label.green().to_string(),
    }
}

/// Colored dot for a worktree aggregate.
#[must_use]
pub fn branch_status(status: BranchStatus) -> String {
    match status {
        BranchStatus::Clean => "●".green().to_string(),
        BranchStatus::Uncommitted => "●".yellow().to_string(),
        BranchStatus::Unmerged => "●".red().to_string(),
    }
}

/// Branch name, or a dimmed placeholder when detached.
#[must_use]
pub fn branch_name(name: Option<&str>) -> String {
    name.map_or_else(
        || "(detached)".dimmed().to_string(),
        |name| name.cyan().bold().to_string(),
    )
}
