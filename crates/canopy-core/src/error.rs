//! Error types for canopy-core.

use std::path::PathBuf;

/// Result type alias using [`Error`].
pub type Result<T> = std::result::Result<T, Error>;

/// Errors that can occur in canopy-core operations.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// Not inside a Git repository.
    #[error("not a git repository (or any parent up to mount point)")]
    NotARepository,

    /// A `.git` file or worktree admin file can't be followed.
    #[error("broken worktree link at {}: {reason}", path.display())]
    WorktreeLink {
        /// The file that failed to resolve.
        path: PathBuf,
        /// What was wrong with it.
        reason: String,
    },

    /// The branch is already checked out in another worktree.
    #[error("branch '{branch}' is already checked out at {}", path.display())]
    BranchAlreadyCheckedOut { branch: String, path: PathBuf },

    /// Target directory for a new worktree is not empty.
    #[error("'{}' already exists and is not an empty directory", .0.display())]
    WorktreePathExists(PathBuf),

    /// A local copy would land inside the tree being copied.
    #[error("cannot copy {} into itself at {}", src.display(), dst.display())]
    CopyIntoSource { src: PathBuf, dst: PathBuf },

    /// Name doesn't resolve to a branch, remote branch or commit.
    #[error("invalid reference: {0}")]
    InvalidRef(String),

    /// A network operation was requested for a repository without a URL.
    #[error("repository '{0}' has no remote url")]
    NoRemote(String),

    /// `user.name` / `user.email` are not configured.
    #[error("missing git identity - set user.name and user.email")]
    MissingIdentity,

    /// The external signing program failed.
    #[error("failed to sign commit: {0}")]
    Signing(String),

    /// Settings file parsing error.
    #[error("failed to parse {}: {message}", file.display())]
    SettingsParse { file: PathBuf, message: String },

    /// IO error.
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),

    /// Git operation error.
    #[error("git error: {0}")]
    Git(#[from] canopy_git::Error),

    /// A blocking transfer task panicked or was cancelled.
    #[error("background task failed: {0}")]
    Join(#[from] tokio::task::JoinError),
}

impl From<git2::Error> for Error {
    fn from(err: git2::Error) -> Self {
        Self::Git(canopy_git::Error::Git2(err))
    }
}
