//! Collaborator interfaces consumed by the core.
//!
//! The surrounding application supplies ignore rules, authentication and
//! progress reporting through these traits; defaults are provided so a
//! [`GitContext`](crate::GitContext) works without any of them.

use std::path::Path;
use std::sync::Arc;

use canopy_git::{Credential, Repository, TransferHooks};
use tracing::debug;

/// Answers "does this path match an ignore pattern?" for a repository.
pub trait IgnoreRules: Send + Sync {
    /// `relative` is `/`-separated and relative to `root`.
    fn is_ignored(&self, root: &Path, relative: &str) -> bool;
}

/// Ignore rules read by libgit2 (`.gitignore`, `info/exclude`,
/// `core.excludesFile`).
#[derive(Debug, Clone, Copy, Default)]
pub struct GitIgnoreRules;

impl IgnoreRules for GitIgnoreRules {
    fn is_ignored(&self, root: &Path, relative: &str) -> bool {
        Repository::open_exact(root)
            .and_then(|repo| repo.is_path_ignored(relative))
            .unwrap_or_else(|e| {
                debug!(root = %root.display(), relative, error = %e, "ignore lookup failed");
                false
            })
    }
}

/// Authentication hooks for network operations.
pub trait AuthHandler: Send + Sync {
    /// Supply a credential for `url`.
    fn on_auth(&self, _url: &str) -> Option<Credential> {
        None
    }

    /// The server rejected `credential`.
    fn on_auth_failure(&self, _url: &str, _credential: &Credential) {}

    /// The operation authenticated successfully.
    fn on_auth_success(&self, _url: &str) {}
}

/// Progress reporting for long-running transfers.
pub trait ProgressHandler: Send + Sync {
    fn on_progress(&self, phase: &str, loaded: usize, total: usize);
}

impl<F> ProgressHandler for F
where
    F: Fn(&str, usize, usize) + Send + Sync,
{
    fn on_progress(&self, phase: &str, loaded: usize, total: usize) {
        self(phase, loaded, total);
    }
}

/// Bridges the application's handlers to the transfer layer.
///
/// The auth handler is asked first; `fallback` (from a repository
/// descriptor) is used when it has nothing to offer.
#[derive(Clone, Default)]
pub(crate) struct CallbackHooks {
    pub auth: Option<Arc<dyn AuthHandler>>,
    pub progress: Option<Arc<dyn ProgressHandler>>,
    pub fallback: Option<Credential>,
}

impl TransferHooks for CallbackHooks {
    fn progress(&self, phase: &str, loaded: usize, total: usize) {
        if let Some(progress) = &self.progress {
            progress.on_progress(phase, loaded, total);
        }
    }

    fn credential(&self, url: &str) -> Option<Credential> {
        self.auth
            .as_ref()
            .and_then(|auth| auth.on_auth(url))
            .or_else(|| self.fallback.clone())
    }

    fn rejected(&self, url: &str, credential: &Credential) {
        if let Some(auth) = &self.auth {
            auth.on_auth_failure(url, credential);
        }
    }

    fn accepted(&self, url: &str) {
        if let Some(auth) = &self.auth {
            auth.on_auth_success(url);
        }
    }
}
