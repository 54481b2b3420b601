//! # canopy-core
//!
//! Core library for Canopy. Resolves repository metadata from any path
//! (linked worktrees included), manages worktrees, computes file and
//! directory status, reads and writes git config, and runs repository
//! operations with main/linked worktree semantics.
//!
//! Every component borrows a [`GitContext`] carrying settings and the
//! collaborators (ignore rules, authentication) supplied by the caller.

pub mod config;
pub mod context;
pub mod descriptor;
pub mod error;
mod fs;
pub mod operations;
pub mod paths;
pub mod settings;
pub mod status;
pub mod traits;
pub mod worktree;

#[cfg(test)]
mod test_support;

pub use config::{ConfigQuery, ConfigStore, GitConfigEntry, Identity, Scope};
pub use context::GitContext;
pub use descriptor::{
    BranchRecord, Credentials, EntityUpdate, OAuthProvider, RepositoryDescriptor, RepositoryRecord,
};
pub use error::{Error, Result};
pub use operations::{
    Author, CheckoutOptions, CloneOptions, CloneSource, CommitOptions, CurrentBranchOptions,
    MergeReport, RepositoryOperations,
};
pub use paths::{Entry, Head, WorktreePaths};
pub use settings::Settings;
pub use status::{BranchStatus, StatusEngine, WorktreeStatus};
pub use traits::{AuthHandler, GitIgnoreRules, IgnoreRules, ProgressHandler};
pub use worktree::{Removal, Worktree, WorktreeManager};
