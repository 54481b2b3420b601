use std::path::PathBuf;

use canopy_git::CheckoutRequest;
use tracing::{debug, info};

use super::{RepositoryOperations, open_repo};
use crate::error::{Error, Result};
use crate::paths;

/// Options for [`RepositoryOperations::checkout`].
#[derive(Debug, Clone, Default)]
pub struct CheckoutOptions {
    pub dir: PathBuf,
    pub gitdir: Option<PathBuf>,
    /// Branch or revision; `None` refreshes the working tree from HEAD.
    pub ref_name: Option<String>,
    /// Limit the checkout to these paths.
    pub filepaths: Vec<String>,
    /// Remote to create a tracking branch from (default `origin`).
    pub remote: Option<String>,
    /// Move HEAD without touching the working tree.
    pub no_checkout: bool,
    /// Leave HEAD alone. Defaults to `true` only when `ref_name` is `None`.
    pub no_update_head: Option<bool>,
    /// Validate without writing anything.
    pub dry_run: bool,
    /// Overwrite local changes.
    pub force: bool,
}

impl CheckoutOptions {
    #[must_use]
    pub fn new(dir: impl Into<PathBuf>, ref_name: impl Into<String>) -> Self {
        Self {
            dir: dir.into(),
            ref_name: Some(ref_name.into()),
            ..Self::default()
        }
    }
}

impl RepositoryOperations<'_> {
    /// Update HEAD and/or the working tree to `options.ref_name`.
    ///
    /// Checking out the branch that is already current is a no-op unless
    /// `filepaths` asks for specific files to be restored. With `no_checkout`,
    /// a revision that isn't a local branch detaches HEAD at its commit.
    ///
    /// # Errors
    /// Returns `BranchAlreadyCheckedOut` if the branch is active in another
    /// worktree, or error if the ref doesn't resolve or files conflict.
    pub async fn checkout(&self, options: &CheckoutOptions) -> Result<()> {
        let repo = open_repo(&options.dir, options.gitdir.as_deref())?;
        let no_update_head = options
            .no_update_head
            .unwrap_or(options.ref_name.is_none());

        let Some(name) = options.ref_name.as_deref() else {
            if !options.no_checkout {
                repo.checkout_head(options.force, &options.filepaths, options.dry_run)?;
                debug!(dir = %options.dir.display(), "refreshed working tree from HEAD");
            }
            return Ok(());
        };

        if options.filepaths.is_empty() && repo.current_branch()?.as_deref() == Some(name) {
            debug!(branch = name, "already on branch");
            return Ok(());
        }

        let mut from_remote = false;
        if !repo.branch_exists(name) {
            let remote = options.remote.as_deref().unwrap_or("origin");
            let upstream = format!("{remote}/{name}");
            if repo
                .resolve_ref(&format!("refs/remotes/{upstream}"))?
                .is_some()
            {
                from_remote = true;
                if options.dry_run {
                    debug!(branch = name, upstream, "would create tracking branch");
                } else {
                    repo.create_tracking_branch(name, &upstream)?;
                    info!(branch = name, upstream, "created tracking branch");
                }
            }
        }

        let moves_head = !no_update_head && repo.branch_exists(name);
        if moves_head {
            let here = paths::get_worktree_paths(&options.dir)
                .await?
                .ok_or(Error::NotARepository)?;
            if let Some(path) = paths::get_branch_root(&here.dir, name).await? {
                if path != here.working_root() {
                    return Err(Error::BranchAlreadyCheckedOut {
                        branch: name.to_string(),
                        path,
                    });
                }
            }
        }

        if options.no_checkout {
            if moves_head {
                if !options.dry_run {
                    repo.set_head_branch(name)?;
                }
            } else if !no_update_head && !from_remote {
                let oid = repo.resolve_commit(name)?;
                if !options.dry_run {
                    repo.set_head_detached(oid)?;
                    info!(%oid, target = name, "detached HEAD");
                }
            }
            return Ok(());
        }

        repo.checkout(&CheckoutRequest {
            target: name,
            paths: &options.filepaths,
            force: options.force,
            update_head: !no_update_head,
            dry_run: options.dry_run,
        })?;
        if !options.dry_run {
            info!(dir = %options.dir.display(), target = name, "checked out");
        }
        Ok(())
    }
}
