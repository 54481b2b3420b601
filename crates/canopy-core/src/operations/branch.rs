//! Current branch lookup and branch create/delete.

use std::path::{Path, PathBuf};

use canopy_git::{Oid, Repository};
use tokio::fs;
use tracing::{debug, info};

use super::{RepositoryOperations, open_repo};
use crate::error::{Error, Result};
use crate::paths::{self, Head};

/// Options for [`RepositoryOperations::current_branch`].
#[derive(Debug, Clone, Default)]
pub struct CurrentBranchOptions {
    pub dir: PathBuf,
    /// Repository dir; defaults to `<dir>/.git`.
    pub gitdir: Option<PathBuf>,
    /// Return `refs/heads/<name>` instead of the short name.
    pub fullname: bool,
    /// Only report the branch if its ref resolves (not unborn).
    pub test: bool,
}

impl CurrentBranchOptions {
    #[must_use]
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self {
            dir: dir.into(),
            ..Self::default()
        }
    }
}

impl RepositoryOperations<'_> {
    /// Branch checked out in the worktree at `options.dir`; `None` when
    /// detached.
    ///
    /// When `dir` is a linked worktree its own admin dir is consulted, even if
    /// `gitdir` names the main repository.
    ///
    /// # Errors
    /// Returns `WorktreeLink` if the `.git` link can't be followed.
    pub async fn current_branch(&self, options: &CurrentBranchOptions) -> Result<Option<String>> {
        let marker = options.dir.join(".git");
        let admin = match fs::metadata(&marker).await {
            Ok(meta) if meta.is_file() => {
                let admin = paths::follow_link(&marker).await?;
                debug!(admin = %admin.display(), "redirecting to linked worktree");
                admin
            }
            _ => options.gitdir.clone().unwrap_or(marker),
        };

        let Some(Head::Branch(name)) = paths::read_head(&admin).await? else {
            return Ok(None);
        };
        let fullname = if name.starts_with("refs/") {
            name.clone()
        } else {
            format!("refs/heads/{name}")
        };

        if options.test {
            let repo = Repository::open_exact(&admin)?;
            if repo.resolve_ref(&fullname)?.is_none() {
                debug!(branch = %name, "current branch has no commits");
                return Ok(None);
            }
        }

        Ok(Some(if options.fullname { fullname } else { name }))
    }

    /// Create branch `name` at `start`, or at HEAD.
    ///
    /// # Errors
    /// Returns `InvalidRef` for a malformed name, or error if `start` doesn't
    /// resolve or the branch already exists.
    pub async fn create_branch(&self, dir: &Path, name: &str, start: Option<&str>) -> Result<Oid> {
        if !git2::Branch::name_is_valid(name)? {
            return Err(Error::InvalidRef(name.to_string()));
        }
        let repo = open_repo(dir, None)?;
        let oid = repo.create_branch(name, start)?;
        info!(branch = name, commit = %oid, "created branch");
        Ok(oid)
    }

    /// Delete local branch `name`.
    ///
    /// # Errors
    /// Returns `BranchAlreadyCheckedOut` if any worktree has the branch
    /// checked out, or `BranchNotFound`.
    pub async fn delete_branch(&self, dir: &Path, name: &str) -> Result<()> {
        if let Some(path) = paths::get_branch_root(dir, name).await? {
            return Err(Error::BranchAlreadyCheckedOut {
                branch: name.to_string(),
                path,
            });
        }
        let repo = open_repo(dir, None)?;
        repo.delete_branch(name)?;
        info!(branch = name, "deleted branch");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::context::GitContext;
    use crate::test_support::{branch_exists, create_branch, init_repo};
    use crate::worktree::WorktreeManager;
    use std::fs as stdfs;

    #[tokio::test]
    async fn test_current_branch_main() {
        let (_temp, root) = init_repo();
        let ctx = GitContext::default();
        let ops = RepositoryOperations::new(&ctx);

        let short = ops
            .current_branch(&CurrentBranchOptions::new(&root))
            .await
            .unwrap();
        assert_eq!(short.as_deref(), Some("master"));

        let full = ops
            .current_branch(&CurrentBranchOptions {
                fullname: true,
                test: true,
                ..CurrentBranchOptions::new(&root)
            })
            .await
            .unwrap();
        assert_eq!(full.as_deref(), Some("refs/heads/master"));
    }

    #[tokio::test]
    async fn test_current_branch_redirects_linked_worktree() {
        let (_temp, root) = init_repo();
        create_branch(&root, "foo");
        let ctx = GitContext::default();
        let worktree = WorktreeManager::new(&ctx)
            .add(&root, &root.parent().unwrap().join("foo"), "foo")
            .await
            .unwrap();
        let ops = RepositoryOperations::new(&ctx);

        // gitdir names the main repository, but the link marker wins.
        let options = CurrentBranchOptions {
            gitdir: Some(root.join(".git")),
            test: true,
            ..CurrentBranchOptions::new(&worktree.path)
        };
        assert_eq!(ops.current_branch(&options).await.unwrap().as_deref(), Some("foo"));
    }

    #[tokio::test]
    async fn test_current_branch_unborn_and_detached() {
        let (_temp, root) = init_repo();
        let ctx = GitContext::default();
        let ops = RepositoryOperations::new(&ctx);

        stdfs::write(root.join(".git/HEAD"), "ref: refs/heads/empty\n").unwrap();
        let options = CurrentBranchOptions::new(&root);
        assert_eq!(ops.current_branch(&options).await.unwrap().as_deref(), Some("empty"));
        let tested = CurrentBranchOptions {
            test: true,
            ..options.clone()
        };
        assert_eq!(ops.current_branch(&tested).await.unwrap(), None);

        let oid = git2::Repository::open(&root)
            .unwrap()
            .refname_to_id("refs/heads/master")
            .unwrap();
        stdfs::write(root.join(".git/HEAD"), format!("{oid}\n")).unwrap();
        assert_eq!(ops.current_branch(&options).await.unwrap(), None);
    }

    #[tokio::test]
    async fn test_create_and_delete_branch() {
        let (_temp, root) = init_repo();
        let ctx = GitContext::default();
        let ops = RepositoryOperations::new(&ctx);

        ops.create_branch(&root, "feature/x", None).await.unwrap();
        assert!(branch_exists(&root, "feature/x"));

        let err = ops.create_branch(&root, "bad..name", None).await.unwrap_err();
        assert!(matches!(err, Error::InvalidRef(_)));

        ops.delete_branch(&root, "feature/x").await.unwrap();
        assert!(!branch_exists(&root, "feature/x"));
    }

    #[tokio::test]
    async fn test_delete_checked_out_branch_refused() {
        let (_temp, root) = init_repo();
        create_branch(&root, "foo");
        let ctx = GitContext::default();
        WorktreeManager::new(&ctx)
            .add(&root, &root.parent().unwrap().join("foo"), "foo")
            .await
            .unwrap();
        let ops = RepositoryOperations::new(&ctx);

        let err = ops.delete_branch(&root, "master").await.unwrap_err();
        assert!(matches!(err, Error::BranchAlreadyCheckedOut { ref path, .. } if *path == root));

        let err = ops.delete_branch(&root, "foo").await.unwrap_err();
        assert!(matches!(err, Error::BranchAlreadyCheckedOut { .. }));
        assert!(branch_exists(&root, "foo"));
    }
}
