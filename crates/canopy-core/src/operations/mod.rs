//! Repository operations with main/linked worktree semantics.
//!
//! Every operation takes the directory it acts on explicitly and resolves the
//! repository from there, so the same calls work from a main working tree, a
//! linked worktree or a subdirectory of either.

mod branch;
mod checkout;
mod clone;
mod commit;
mod merge;
mod remote;
mod snapshot;

use std::path::Path;

use canopy_git::Repository;

use crate::context::GitContext;
use crate::error::Result;

pub use branch::CurrentBranchOptions;
pub use checkout::CheckoutOptions;
pub use clone::{CloneOptions, CloneSource};
pub use commit::{Author, CommitOptions};
pub use merge::MergeReport;

/// Clone, checkout, commit, merge and branch operations.
pub struct RepositoryOperations<'a> {
    ctx: &'a GitContext,
}

impl<'a> RepositoryOperations<'a> {
    #[must_use]
    pub const fn new(ctx: &'a GitContext) -> Self {
        Self { ctx }
    }
}

/// Open the repository for `dir`, or exactly `gitdir` when one is given.
fn open_repo(dir: &Path, gitdir: Option<&Path>) -> Result<Repository> {
    Ok(match gitdir {
        Some(gitdir) => Repository::open_exact(gitdir)?,
        None => Repository::open(dir)?,
    })
}
