//! Repository wrapper providing high-level git operations.

use std::path::Path;

use git2::build::CheckoutBuilder;
use git2::{BranchType, ErrorCode, ObjectType, Oid, RepositoryState, Signature};
use tracing::debug;

use crate::error::{Error, Result};

/// Parameters for checking out a ref into the working tree.
#[derive(Debug, Clone, Copy)]
pub struct CheckoutRequest<'a> {
    /// Branch name or revision to check out.
    pub target: &'a str,
    /// Restrict the checkout to these paths (empty means everything).
    pub paths: &'a [String],
    /// Overwrite local modifications.
    pub force: bool,
    /// Move HEAD to the target after updating files.
    pub update_head: bool,
    /// Compute the checkout without touching the working tree.
    pub dry_run: bool,
}

/// High-level wrapper around a git repository.
pub struct Repository {
    pub(crate) inner: git2::Repository,
}

impl Repository {
    /// Open the repository containing `path`, searching parent directories.
    ///
    /// # Errors
    /// Returns error if no repository found at path or any parent.
    pub fn open(path: impl AsRef<Path>) -> Result<Self> {
        let inner = git2::Repository::discover(path).map_err(|e| {
            if e.code() == ErrorCode::NotFound {
                Error::NotARepository
            } else {
                Error::Git2(e)
            }
        })?;
        Ok(Self { inner })
    }

    /// Open the repository at exactly `path` (a working directory, a `.git`
    /// directory, or a linked worktree's administrative directory).
    ///
    /// # Errors
    /// Returns error if `path` is not a repository.
    pub fn open_exact(path: impl AsRef<Path>) -> Result<Self> {
        let inner = git2::Repository::open(path).map_err(|e| {
            if e.code() == ErrorCode::NotFound {
                Error::NotARepository
            } else {
                Error::Git2(e)
            }
        })?;
        Ok(Self { inner })
    }

    /// Create a new repository with a working directory at `path`.
    ///
    /// # Errors
    /// Returns error if initialization fails.
    pub fn init(path: impl AsRef<Path>) -> Result<Self> {
        let inner = git2::Repository::init(path)?;
        Ok(Self { inner })
    }

    /// Get the path to the working directory, `None` for bare repositories.
    #[must_use]
    pub fn workdir(&self) -> Option<&Path> {
        self.inner.workdir()
    }

    /// Get the path to this worktree's administrative directory.
    #[must_use]
    pub fn git_dir(&self) -> &Path {
        self.inner.path()
    }

    /// Whether this is a bare repository.
    #[must_use]
    pub fn is_bare(&self) -> bool {
        self.inner.is_bare()
    }

    /// Whether this repository was opened through a linked worktree.
    #[must_use]
    pub fn is_worktree(&self) -> bool {
        self.inner.is_worktree()
    }

    /// Get the current repository state.
    #[must_use]
    pub fn state(&self) -> RepositoryState {
        self.inner.state()
    }

    /// Check if there's a merge in progress.
    #[must_use]
    pub fn is_merging(&self) -> bool {
        self.state() == RepositoryState::Merge
    }

    // === Branch operations ===

    /// Get the short name of the branch HEAD points at.
    ///
    /// Unborn branches (no commits yet) still report their name.
    /// Returns `None` when HEAD is detached.
    ///
    /// # Errors
    /// Returns error if HEAD cannot be read.
    pub fn current_branch(&self) -> Result<Option<String>> {
        let head = match self.inner.find_reference("HEAD") {
            Ok(head) => head,
            Err(e) if e.code() == ErrorCode::NotFound => return Ok(None),
            Err(e) => return Err(e.into()),
        };

        Ok(head
            .symbolic_target()
            .and_then(|target| target.strip_prefix("refs/heads/"))
            .map(String::from))
    }

    /// Check if HEAD is detached.
    ///
    /// # Errors
    /// Returns error if HEAD cannot be read.
    pub fn head_detached(&self) -> Result<bool> {
        Ok(self.inner.head_detached()?)
    }

    /// Get the commit HEAD resolves to, `None` on an unborn branch.
    ///
    /// # Errors
    /// Returns error if HEAD is corrupt.
    pub fn head_oid(&self) -> Result<Option<Oid>> {
        match self.inner.head() {
            Ok(head) => Ok(head.target()),
            Err(e) if matches!(e.code(), ErrorCode::UnbornBranch | ErrorCode::NotFound) => {
                Ok(None)
            }
            Err(e) => Err(e.into()),
        }
    }

    /// Get the commit SHA for a branch.
    ///
    /// # Errors
    /// Returns error if branch doesn't exist.
    pub fn branch_commit(&self, branch_name: &str) -> Result<Oid> {
        let branch = self
            .inner
            .find_branch(branch_name, BranchType::Local)
            .map_err(|_| Error::BranchNotFound(branch_name.into()))?;

        branch
            .get()
            .target()
            .ok_or_else(|| Error::BranchNotFound(branch_name.into()))
    }

    /// Check if a local branch exists.
    #[must_use]
    pub fn branch_exists(&self, name: &str) -> bool {
        self.inner.find_branch(name, BranchType::Local).is_ok()
    }

    /// List all local branches.
    ///
    /// # Errors
    /// Returns error if branch listing fails.
    pub fn list_branches(&self) -> Result<Vec<String>> {
        self.branch_names(BranchType::Local)
    }

    /// List remote-tracking branches as `<remote>/<branch>`, skipping
    /// symbolic `<remote>/HEAD` entries.
    ///
    /// # Errors
    /// Returns error if branch listing fails.
    pub fn list_remote_branches(&self) -> Result<Vec<String>> {
        let names = self.branch_names(BranchType::Remote)?;
        Ok(names
            .into_iter()
            .filter(|name| !name.ends_with("/HEAD"))
            .collect())
    }

    fn branch_names(&self, kind: BranchType) -> Result<Vec<String>> {
        let branches = self.inner.branches(Some(kind))?;

        let names: Vec<String> = branches
            .filter_map(std::result::Result::ok)
            .filter_map(|(b, _)| b.name().ok().flatten().map(String::from))
            .collect();

        Ok(names)
    }

    /// Find a remote-tracking branch whose name (after the remote prefix)
    /// equals `name`. Returns the full `<remote>/<branch>` name.
    ///
    /// # Errors
    /// Returns error if branch listing fails.
    pub fn find_remote_branch(&self, name: &str) -> Result<Option<String>> {
        Ok(self
            .list_remote_branches()?
            .into_iter()
            .find(|candidate| {
                candidate
                    .split_once('/')
                    .is_some_and(|(_, branch)| branch == name)
            }))
    }

    /// Create a new branch at `start` (a revision), or at HEAD when `None`.
    ///
    /// # Errors
    /// Returns error if the start point can't be resolved or the branch exists.
    pub fn create_branch(&self, name: &str, start: Option<&str>) -> Result<Oid> {
        let start_oid = match start {
            Some(rev) => self.resolve_commit(rev)?,
            None => self
                .head_oid()?
                .ok_or_else(|| Error::RefNotFound("HEAD".into()))?,
        };
        let commit = self.inner.find_commit(start_oid)?;
        self.inner.branch(name, &commit, false)?;
        debug!(branch = name, commit = %start_oid, "created branch");

        Ok(start_oid)
    }

    /// Create local branch `name` from remote-tracking branch `upstream`
    /// (`<remote>/<branch>`) and configure it as the upstream.
    ///
    /// # Errors
    /// Returns error if the remote branch doesn't exist.
    pub fn create_tracking_branch(&self, name: &str, upstream: &str) -> Result<Oid> {
        let remote = self
            .inner
            .find_branch(upstream, BranchType::Remote)
            .map_err(|_| Error::BranchNotFound(upstream.into()))?;
        let commit = remote.get().peel_to_commit()?;
        let mut branch = self.inner.branch(name, &commit, false)?;
        branch.set_upstream(Some(upstream))?;
        debug!(branch = name, upstream, "created tracking branch");

        Ok(commit.id())
    }

    /// Delete the `refs/heads/<name>` reference.
    ///
    /// Does not consult worktree registrations; callers enforce the
    /// checked-out-elsewhere rule.
    ///
    /// # Errors
    /// Returns `BranchNotFound` if the ref doesn't exist.
    pub fn delete_branch(&self, name: &str) -> Result<()> {
        let refname = format!("refs/heads/{name}");
        let mut reference = self
            .inner
            .find_reference(&refname)
            .map_err(|_| Error::BranchNotFound(name.into()))?;
        reference.delete()?;
        debug!(branch = name, "deleted branch");
        Ok(())
    }

    // === Ref resolution ===

    /// Resolve any revision (branch, tag, SHA, `HEAD~1`) to a commit id.
    ///
    /// # Errors
    /// Returns `RefNotFound` if the revision doesn't name a commit.
    pub fn resolve_commit(&self, rev: &str) -> Result<Oid> {
        let object = self
            .inner
            .revparse_single(rev)
            .map_err(|_| Error::RefNotFound(rev.into()))?;
        let commit = object
            .peel_to_commit()
            .map_err(|_| Error::RefNotFound(rev.into()))?;
        Ok(commit.id())
    }

    /// Resolve a full refname (e.g. `refs/heads/main`) to its target.
    ///
    /// # Errors
    /// Returns error if the ref store can't be read.
    pub fn resolve_ref(&self, refname: &str) -> Result<Option<Oid>> {
        match self.inner.refname_to_id(refname) {
            Ok(oid) => Ok(Some(oid)),
            Err(e) if e.code() == ErrorCode::NotFound => Ok(None),
            Err(e) => Err(e.into()),
        }
    }

    /// Point HEAD at `refs/heads/<name>` without touching the working tree.
    ///
    /// # Errors
    /// Returns error if HEAD cannot be written.
    pub fn set_head_branch(&self, name: &str) -> Result<()> {
        self.inner.set_head(&format!("refs/heads/{name}"))?;
        Ok(())
    }

    /// Detach HEAD at `oid` without touching the working tree.
    ///
    /// # Errors
    /// Returns error if `oid` isn't a commit in this repository.
    pub fn set_head_detached(&self, oid: Oid) -> Result<()> {
        self.inner.set_head_detached(oid)?;
        Ok(())
    }

    // === Checkout ===

    /// Check out a branch or revision.
    ///
    /// Local branches are preferred over other revisions with the same name;
    /// any other revision leaves HEAD detached when `update_head` is set.
    ///
    /// # Errors
    /// Returns error if the target can't be resolved or checkout conflicts.
    pub fn checkout(&self, request: &CheckoutRequest<'_>) -> Result<()> {
        let branch_ref = format!("refs/heads/{}", request.target);
        let local = self.inner.find_reference(&branch_ref).ok();

        let object = match &local {
            Some(reference) => reference.peel(ObjectType::Commit)?,
            None => self
                .inner
                .revparse_single(request.target)
                .map_err(|_| Error::RefNotFound(request.target.into()))?
                .peel(ObjectType::Commit)?,
        };

        let mut builder = checkout_builder(request.force, request.paths, request.dry_run);
        self.inner.checkout_tree(&object, Some(&mut builder))?;

        if request.update_head && !request.dry_run {
            if local.is_some() {
                self.inner.set_head(&branch_ref)?;
            } else {
                self.inner.set_head_detached(object.id())?;
            }
        }

        Ok(())
    }

    /// Refresh the working tree from HEAD without moving it.
    ///
    /// # Errors
    /// Returns error if checkout fails.
    pub fn checkout_head(&self, force: bool, paths: &[String], dry_run: bool) -> Result<()> {
        let mut builder = checkout_builder(force, paths, dry_run);
        self.inner.checkout_head(Some(&mut builder))?;
        Ok(())
    }

    // === Signature ===

    /// Get the default signature for commits from the repository config.
    ///
    /// # Errors
    /// Returns error if git config doesn't have user.name/email.
    pub fn signature(&self) -> Result<Signature<'_>> {
        Ok(self.inner.signature()?)
    }

    /// Build a signature with an explicit timestamp and offset (minutes).
    ///
    /// # Errors
    /// Returns error if name or email contain invalid characters.
    pub fn signature_at(
        name: &str,
        email: &str,
        seconds: i64,
        offset_minutes: i32,
    ) -> Result<Signature<'static>> {
        let time = git2::Time::new(seconds, offset_minutes);
        Ok(Signature::new(name, email, &time)?)
    }

    // === Low-level access ===

    /// Get a reference to the underlying git2 repository.
    ///
    /// Use sparingly - prefer high-level methods.
    #[must_use]
    pub const fn inner(&self) -> &git2::Repository {
        &self.inner
    }
}

fn checkout_builder<'cb>(force: bool, paths: &[String], dry_run: bool) -> CheckoutBuilder<'cb> {
    let mut builder = CheckoutBuilder::new();
    if force {
        builder.force();
    } else {
        builder.safe();
    }
    for path in paths {
        builder.path(path.as_str());
    }
    if dry_run {
        builder.dry_run();
    }
    builder
}

impl std::fmt::Debug for Repository {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Repository")
            .field("path", &self.git_dir())
            .finish()
    }
}
