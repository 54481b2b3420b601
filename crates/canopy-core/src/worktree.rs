//! Linked worktree management.
//!
//! Admin files are written directly in the layout `git worktree` uses:
//!
//! ```text
//! <gitdir>/worktrees/<name>/HEAD       ref: refs/heads/<branch>  |  <sha>
//! <gitdir>/worktrees/<name>/ORIG_HEAD  <sha>
//! <gitdir>/worktrees/<name>/commondir  ../..
//! <gitdir>/worktrees/<name>/gitdir     <workdir>/.git
//! <workdir>/.git                       gitdir: <gitdir>/worktrees/<name>
//! ```

use std::io::ErrorKind;
use std::path::{Path, PathBuf};

use canopy_git::Repository;
use serde::Serialize;
use tokio::fs;
use tracing::{debug, info, warn};

use crate::context::GitContext;
use crate::error::{Error, Result};
use crate::paths::{self, Head};
use crate::status::StatusEngine;

/// A main or linked worktree.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Worktree {
    /// Admin dir name for linked worktrees, directory name for the main one.
    pub id: String,
    /// Working tree root.
    pub path: PathBuf,
    /// `<gitdir>/worktrees/<id>`; `None` for the main worktree.
    pub admin_dir: Option<PathBuf>,
    pub bare: bool,
    pub detached: bool,
    pub main: bool,
    /// Checked-out branch (short name).
    #[serde(rename = "ref")]
    pub ref_name: Option<String>,
    /// Commit HEAD resolves to.
    pub rev: Option<String>,
}

/// Outcome of [`WorktreeManager::remove`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Removal {
    /// Working tree, admin dir and branch ref were deleted.
    Removed,
    /// The main worktree is never removed.
    SkippedMain,
    /// Uncommitted changes and no `force`; nothing was touched.
    SkippedDirty,
}

/// What `add` will check out.
enum Target {
    /// `upstream` is set when the local branch still has to be created from it.
    Branch {
        name: String,
        oid: String,
        upstream: Option<String>,
    },
    Detached { oid: String },
}

/// Creates, lists and removes worktrees.
pub struct WorktreeManager<'a> {
    ctx: &'a GitContext,
}

impl<'a> WorktreeManager<'a> {
    #[must_use]
    pub const fn new(ctx: &'a GitContext) -> Self {
        Self { ctx }
    }

    /// Create a linked worktree at `workdir` checked out to `target`
    /// (branch, remote-tracking branch name, or revision).
    ///
    /// A branch that only exists on a remote is created locally once the
    /// target directory has been validated. A failure after that point may
    /// leave partial admin files behind.
    ///
    /// # Errors
    /// Returns `BranchAlreadyCheckedOut` if the branch is active in another
    /// worktree, `WorktreePathExists` if `workdir` is not empty, and
    /// `InvalidRef` if `target` doesn't resolve.
    pub async fn add(&self, root: &Path, workdir: &Path, target: &str) -> Result<Worktree> {
        let paths = paths::get_worktree_paths(root)
            .await?
            .ok_or(Error::NotARepository)?;
        let repo = Repository::open_exact(&paths.dir)?;
        let target = resolve_target(&repo, target)?;

        if let Target::Branch { name, .. } = &target {
            if let Some(path) = paths::get_branch_root(&paths.dir, name).await? {
                return Err(Error::BranchAlreadyCheckedOut {
                    branch: name.clone(),
                    path,
                });
            }
        }

        let workdir = prepare_workdir(workdir).await?;
        if let Target::Branch {
            name,
            upstream: Some(upstream),
            ..
        } = &target
        {
            repo.create_tracking_branch(name, upstream)?;
            debug!(branch = %name, upstream = %upstream, "created branch from remote");
        }
        let worktrees = paths.gitdir.join("worktrees");
        let id = unique_name(&worktrees, &self.admin_name(&target)).await;
        let admin = worktrees.join(&id);
        fs::create_dir_all(&admin).await?;

        let (head, oid) = match &target {
            Target::Branch { name, oid, .. } => (format!("ref: refs/heads/{name}\n"), oid.clone()),
            Target::Detached { oid } => (format!("{oid}\n"), oid.clone()),
        };
        fs::write(admin.join("HEAD"), head).await?;
        fs::write(admin.join("ORIG_HEAD"), format!("{oid}\n")).await?;
        fs::write(admin.join("commondir"), "../..\n").await?;
        fs::write(
            admin.join("gitdir"),
            format!("{}\n", workdir.join(".git").display()),
        )
        .await?;
        fs::write(
            workdir.join(".git"),
            format!("gitdir: {}\n", admin.display()),
        )
        .await?;

        let linked = Repository::open_exact(&workdir)?;
        linked.checkout_head(true, &[], false)?;

        let (ref_name, detached) = match target {
            Target::Branch { name, .. } => (Some(name), false),
            Target::Detached { .. } => (None, true),
        };
        info!(worktree = %id, path = %workdir.display(), branch = ?ref_name, "added worktree");

        Ok(Worktree {
            id,
            path: workdir,
            admin_dir: Some(admin),
            bare: false,
            detached,
            main: false,
            ref_name,
            rev: Some(oid),
        })
    }

    fn admin_name(&self, target: &Target) -> String {
        match target {
            Target::Branch { name, .. } => name.replace(['/', '\\', ':'], "-"),
            Target::Detached { oid } => {
                let len = self.ctx.settings().worktree.sha_abbrev.clamp(4, oid.len());
                oid[..len].to_string()
            }
        }
    }

    /// Enumerate the main worktree followed by linked worktrees (sorted by
    /// admin dir name).
    ///
    /// Returns `None` when `path` is not inside a repository.
    ///
    /// # Errors
    /// Returns error if admin files can't be read.
    pub async fn list(&self, path: &Path) -> Result<Option<Vec<Worktree>>> {
        let Some(paths) = paths::get_worktree_paths(path).await? else {
            return Ok(None);
        };
        let repo = Repository::open_exact(&paths.gitdir)?;

        let main_head = paths::read_head(&paths.gitdir).await?;
        let mut worktrees = vec![Worktree {
            id: paths
                .dir
                .file_name()
                .map(|n| n.to_string_lossy().into_owned())
                .unwrap_or_default(),
            path: paths.dir.clone(),
            admin_dir: None,
            bare: repo.is_bare(),
            detached: matches!(main_head, Some(Head::Detached(_))),
            main: true,
            rev: resolve_rev(&repo, main_head.as_ref())?,
            ref_name: main_head.as_ref().and_then(Head::branch).map(String::from),
        }];

        for (id, admin) in paths::admin_dirs(&paths.gitdir.join("worktrees")).await? {
            let Some(workdir) = paths::admin_worktree_dir(&admin).await? else {
                warn!(worktree = %id, "admin dir without gitdir file");
                continue;
            };
            let head = paths::read_head(&admin).await?;
            worktrees.push(Worktree {
                id,
                path: workdir,
                bare: false,
                detached: matches!(head, Some(Head::Detached(_))),
                main: false,
                rev: resolve_rev(&repo, head.as_ref())?,
                ref_name: head.as_ref().and_then(Head::branch).map(String::from),
                admin_dir: Some(admin),
            });
        }

        Ok(Some(worktrees))
    }

    /// Remove a linked worktree: its working directory, its admin dir and
    /// the `refs/heads/<ref>` branch.
    ///
    /// The branch is deleted whenever removal proceeds, forced or not.
    ///
    /// # Errors
    /// Returns error if any deletion fails; nothing is rolled back.
    pub async fn remove(&self, worktree: &Worktree, force: bool) -> Result<Removal> {
        if worktree.main {
            debug!(path = %worktree.path.display(), "refusing to remove main worktree");
            return Ok(Removal::SkippedMain);
        }

        let dirty = StatusEngine::new(self.ctx).is_dirty(&worktree.path).await?;
        if dirty && !force {
            info!(path = %worktree.path.display(), "worktree has changes, not removing");
            return Ok(Removal::SkippedDirty);
        }

        let paths = paths::get_worktree_paths(&worktree.path)
            .await?
            .ok_or(Error::NotARepository)?;
        let admin = match (&worktree.admin_dir, &paths.worktree_gitdir) {
            (Some(admin), _) | (None, Some(admin)) => admin.clone(),
            (None, None) => return Err(Error::NotARepository),
        };

        remove_dir_if_exists(&worktree.path).await?;
        remove_dir_if_exists(&admin).await?;

        if let Some(branch) = &worktree.ref_name {
            let repo = Repository::open_exact(&paths.gitdir)?;
            match repo.delete_branch(branch) {
                Ok(()) => {}
                Err(e) if e.is_not_found() => debug!(branch, "branch already gone"),
                Err(e) => return Err(e.into()),
            }
        }
        info!(path = %worktree.path.display(), "removed worktree");

        Ok(Removal::Removed)
    }

    /// Delete admin dirs whose working tree no longer exists. Returns the
    /// pruned names.
    ///
    /// # Errors
    /// Returns error if an admin dir can't be read or deleted.
    pub async fn prune(&self, path: &Path) -> Result<Vec<String>> {
        let paths = paths::get_worktree_paths(path)
            .await?
            .ok_or(Error::NotARepository)?;

        let mut pruned = Vec::new();
        for (id, admin) in paths::admin_dirs(&paths.gitdir.join("worktrees")).await? {
            let alive = match paths::admin_worktree_dir(&admin).await? {
                Some(workdir) => fs::metadata(workdir.join(".git")).await.is_ok(),
                None => false,
            };
            if !alive {
                fs::remove_dir_all(&admin).await?;
                info!(worktree = %id, "pruned stale worktree");
                pruned.push(id);
            }
        }
        Ok(pruned)
    }
}

fn resolve_target(repo: &Repository, target: &str) -> Result<Target> {
    if let Ok(oid) = repo.branch_commit(target) {
        return Ok(Target::Branch {
            name: target.to_string(),
            oid: oid.to_string(),
            upstream: None,
        });
    }

    if let Some(upstream) = repo.find_remote_branch(target)? {
        let oid = repo.resolve_commit(&format!("refs/remotes/{upstream}"))?;
        return Ok(Target::Branch {
            name: target.to_string(),
            oid: oid.to_string(),
            upstream: Some(upstream),
        });
    }

    let oid = repo
        .resolve_commit(target)
        .map_err(|_| Error::InvalidRef(target.to_string()))?;
    Ok(Target::Detached {
        oid: oid.to_string(),
    })
}

fn resolve_rev(repo: &Repository, head: Option<&Head>) -> Result<Option<String>> {
    Ok(match head {
        Some(Head::Detached(oid)) => Some(oid.clone()),
        Some(Head::Branch(name)) => repo
            .resolve_ref(&format!("refs/heads/{name}"))?
            .map(|oid| oid.to_string()),
        None => None,
    })
}

/// Make `workdir` absolute and ensure it is an empty directory.
async fn prepare_workdir(workdir: &Path) -> Result<PathBuf> {
    let resolved = paths::resolve_existing(workdir).await?;
    match fs::read_dir(&resolved).await {
        Ok(mut entries) => {
            if entries.next_entry().await?.is_some() {
                return Err(Error::WorktreePathExists(resolved));
            }
        }
        Err(e) if e.kind() == ErrorKind::NotFound => fs::create_dir_all(&resolved).await?,
        Err(e) if e.kind() == ErrorKind::NotADirectory => {
            return Err(Error::WorktreePathExists(resolved));
        }
        Err(e) => return Err(e.into()),
    }
    Ok(fs::canonicalize(&resolved).await?)
}

/// `base`, or `base1`, `base2`, ... if taken.
async fn unique_name(worktrees: &Path, base: &str) -> String {
    let mut name = base.to_string();
    let mut suffix = 1;
    while fs::symlink_metadata(worktrees.join(&name)).await.is_ok() {
        name = format!("{base}{suffix}");
        suffix += 1;
    }
    name
}

async fn remove_dir_if_exists(path: &Path) -> Result<()> {
    match fs::remove_dir_all(path).await {
        Ok(()) => Ok(()),
        Err(e) if e.kind() == ErrorKind::NotFound => Ok(()),
        Err(e) => Err(e.into()),
    }
}
