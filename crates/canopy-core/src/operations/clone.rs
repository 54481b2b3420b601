use std::path::{Path, PathBuf};
use std::sync::Arc;

use canopy_git::{CheckoutRequest, CloneRequest, Repository};
use tokio::fs;
use tracing::{debug, info};

use super::RepositoryOperations;
use crate::descriptor::{Credentials, RepositoryDescriptor};
use crate::error::{Error, Result};
use crate::paths::{self, Head};
use crate::traits::{CallbackHooks, ProgressHandler};

/// Where a clone comes from.
#[derive(Debug, Clone, Copy)]
pub enum CloneSource<'d> {
    /// A remote URL (or local path understood by libgit2).
    Url(&'d str),
    /// A repository already known to the application.
    Repository(&'d RepositoryDescriptor),
}

/// Options for [`RepositoryOperations::clone`].
#[derive(Clone)]
pub struct CloneOptions<'d> {
    pub source: CloneSource<'d>,
    pub dir: PathBuf,
    /// Branch to check out; defaults to the remote HEAD (URL) or the
    /// source's current branch (repository).
    pub ref_name: Option<String>,
    pub single_branch: bool,
    pub no_checkout: bool,
    pub no_tags: bool,
    /// Shallow clone depth; `0` or `None` fetches full history.
    pub depth: Option<u32>,
    /// Extra names skipped by a local copy, on top of the settings' list.
    pub exclude: Vec<String>,
    pub on_progress: Option<Arc<dyn ProgressHandler>>,
}

impl<'d> CloneOptions<'d> {
    #[must_use]
    pub fn new(source: CloneSource<'d>, dir: impl Into<PathBuf>) -> Self {
        Self {
            source,
            dir: dir.into(),
            ref_name: None,
            single_branch: false,
            no_checkout: false,
            no_tags: false,
            depth: None,
            exclude: Vec::new(),
            on_progress: None,
        }
    }
}

impl RepositoryOperations<'_> {
    /// Clone into `options.dir` and return the new working tree root.
    ///
    /// A known repository whose target branch has no remote counterpart is
    /// copied from disk instead, since a protocol clone can't see it.
    ///
    /// # Errors
    /// Returns `WorktreePathExists` if `dir` is not empty, `CopyIntoSource`
    /// if a local copy targets a directory inside the source, `NoRemote` if a
    /// network clone is needed but the repository has no URL, `Network` for
    /// transport failures.
    pub async fn clone(&self, options: &CloneOptions<'_>) -> Result<PathBuf> {
        let (url, fallback) = match options.source {
            CloneSource::Url(url) => (url.to_string(), None),
            CloneSource::Repository(descriptor) => {
                let target = match &options.ref_name {
                    Some(name) => Some(name.clone()),
                    None => source_branch(&descriptor.root).await?,
                };
                let local_only = target
                    .as_deref()
                    .is_none_or(|branch| !descriptor.has_remote_branch(branch));
                if local_only {
                    return self.copy_clone(descriptor, target.as_deref(), options).await;
                }
                let url = descriptor
                    .url
                    .clone()
                    .ok_or_else(|| Error::NoRemote(descriptor.name.clone()))?;
                let credential = descriptor.credentials.as_ref().map(Credentials::to_transfer);
                (url, credential)
            }
        };

        let dir = empty_target(&options.dir).await?;
        let request = CloneRequest {
            url,
            dir: dir.clone(),
            branch: options.ref_name.clone(),
            single_branch: options.single_branch,
            no_checkout: options.no_checkout,
            no_tags: options.no_tags,
            depth: options.depth,
        };
        let hooks = CallbackHooks {
            auth: self.ctx.auth(),
            progress: options.on_progress.clone(),
            fallback,
        };

        let repo =
            tokio::task::spawn_blocking(move || Repository::clone_from(&request, &hooks)).await??;
        Ok(repo.workdir().map_or(dir, Path::to_path_buf))
    }

    async fn copy_clone(
        &self,
        descriptor: &RepositoryDescriptor,
        branch: Option<&str>,
        options: &CloneOptions<'_>,
    ) -> Result<PathBuf> {
        let source = paths::get_worktree_paths(&descriptor.root)
            .await?
            .ok_or(Error::NotARepository)?;
        let dir = empty_target(&options.dir).await?;
        if dir.starts_with(&source.dir) {
            return Err(Error::CopyIntoSource {
                src: source.dir,
                dst: dir,
            });
        }

        let mut exclude = self.ctx.settings().clone.exclude.clone();
        for name in &options.exclude {
            if !exclude.contains(name) {
                exclude.push(name.clone());
            }
        }

        debug!(from = %source.dir.display(), to = %dir.display(), "copying repository");
        let copied = crate::fs::copy_dir(&source.dir, &dir, &exclude).await?;
        if let Some(progress) = &options.on_progress {
            progress.on_progress("Copying files", copied, copied);
        }

        let repo = Repository::open_exact(&dir)?;
        if let Some(branch) = branch {
            if repo.current_branch()?.as_deref() != Some(branch) {
                if options.no_checkout {
                    repo.set_head_branch(branch)?;
                } else {
                    repo.checkout(&CheckoutRequest {
                        target: branch,
                        paths: &[],
                        force: false,
                        update_head: true,
                        dry_run: false,
                    })?;
                }
                debug!(branch, "switched copied repository");
            }
        }

        info!(repo = %descriptor.name, dir = %dir.display(), files = copied, "cloned from local copy");
        Ok(dir)
    }
}

/// Branch checked out where `root` points (main or linked worktree).
async fn source_branch(root: &Path) -> Result<Option<String>> {
    let Some(paths) = paths::get_worktree_paths(root).await? else {
        return Err(Error::NotARepository);
    };
    Ok(paths::read_head(paths.admin_dir())
        .await?
        .as_ref()
        .and_then(Head::branch)
        .map(String::from))
}

/// Absolute form of `dir`, which must be missing or an empty directory.
async fn empty_target(dir: &Path) -> Result<PathBuf> {
    let dir = paths::resolve_existing(dir).await?;
    if let Ok(mut entries) = fs::read_dir(&dir).await {
        if entries.next_entry().await?.is_some() {
            return Err(Error::WorktreePathExists(dir));
        }
    } else if fs::symlink_metadata(&dir).await.is_ok() {
        return Err(Error::WorktreePathExists(dir));
    }
    Ok(dir)
}
