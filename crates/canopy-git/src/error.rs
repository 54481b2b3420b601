//! Error types for canopy-git.

/// Result type alias using [`Error`].
pub type Result<T> = std::result::Result<T, Error>;

/// Errors that can occur during git operations.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// Not inside a git repository.
    #[error("not a git repository")]
    NotARepository,

    /// Branch not found.
    #[error("branch not found: {0}")]
    BranchNotFound(String),

    /// Reference or revision not found.
    #[error("reference not found: {0}")]
    RefNotFound(String),

    /// HEAD is detached (not on a branch).
    #[error("HEAD is detached - checkout a branch first")]
    DetachedHead,

    /// Merge produced conflicts.
    #[error("merge conflict in: {0:?}")]
    MergeConflict(Vec<String>),

    /// Working directory is dirty.
    #[error("working directory has uncommitted changes")]
    DirtyWorkingDirectory,

    /// Network transport failed (clone, ls-remote).
    #[error("network error: {0}")]
    Network(String),

    /// Underlying git2 error.
    #[error("git error: {0}")]
    Git2(#[from] git2::Error),
}

impl Error {
    /// Classify a git2 error raised during a transfer.
    ///
    /// Transport-level failures become [`Error::Network`] so callers can
    /// decide on a retry policy without inspecting libgit2 classes.
    pub(crate) fn from_transfer(err: git2::Error) -> Self {
        match err.class() {
            git2::ErrorClass::Net
            | git2::ErrorClass::Http
            | git2::ErrorClass::Ssh
            | git2::ErrorClass::Ssl
            | git2::ErrorClass::Callback => Self::Network(err.message().to_string()),
            _ => Self::Git2(err),
        }
    }

    /// Whether this error means the requested object simply doesn't exist.
    #[must_use]
    pub fn is_not_found(&self) -> bool {
        match self {
            Self::BranchNotFound(_) | Self::RefNotFound(_) => true,
            Self::Git2(e) => e.code() == git2::ErrorCode::NotFound,
            _ => false,
        }
    }
}
