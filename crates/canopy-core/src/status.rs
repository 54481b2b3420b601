//! Normalized status for files, directories and whole worktrees.

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use canopy_git::{GitStatus, MatrixRow, Repository, process_status_code};
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::context::GitContext;
use crate::error::Result;
use crate::paths::{self, Entry};

/// Aggregate state of a worktree.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum BranchStatus {
    /// No changes.
    Clean,
    /// Uncommitted or unstaged changes.
    Uncommitted,
    /// At least one path has merge conflicts.
    Unmerged,
}

impl BranchStatus {
    /// The per-path status a directory reports for this aggregate.
    #[must_use]
    pub const fn as_file_status(self) -> GitStatus {
        match self {
            Self::Clean => GitStatus::Unmodified,
            Self::Uncommitted => GitStatus::Modified,
            Self::Unmerged => GitStatus::Unmerged,
        }
    }
}

/// Changed entries of one worktree.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct WorktreeStatus {
    /// Checked-out branch; `None` when detached.
    #[serde(rename = "ref")]
    pub ref_name: Option<String>,
    pub root: PathBuf,
    pub status: BranchStatus,
    pub bare: bool,
    /// Changed paths (relative to `root`) and their status.
    pub entries: BTreeMap<String, GitStatus>,
}

/// Computes status through libgit2 and the context's ignore rules.
pub struct StatusEngine<'a> {
    ctx: &'a GitContext,
}

impl<'a> StatusEngine<'a> {
    #[must_use]
    pub const fn new(ctx: &'a GitContext) -> Self {
        Self { ctx }
    }

    /// HEAD/workdir/stage rows for every file under `path`.
    ///
    /// Returns `None` when `path` is not under version control.
    ///
    /// # Errors
    /// Returns error if the repository can't be read.
    pub async fn status_matrix(&self, path: impl AsRef<Path>) -> Result<Option<Vec<MatrixRow>>> {
        let Some((root, relative)) = locate(path.as_ref()).await? else {
            return Ok(None);
        };
        let repo = Repository::open_exact(&root)?;
        Ok(Some(repo.status_matrix(Some(&relative))?))
    }

    /// Status of a file, or `Modified`/`Unmodified` for a directory
    /// depending on whether any staged content differs from HEAD.
    ///
    /// # Errors
    /// Returns error if the repository can't be read.
    pub async fn get_status(&self, path: impl AsRef<Path>) -> Result<Option<GitStatus>> {
        let path = path.as_ref();
        match paths::describe_entry(path).await {
            Entry::Directory(dir) => Ok(self.status_matrix(&dir).await?.map(|rows| {
                if rows.iter().any(|row| row.head != row.stage) {
                    GitStatus::Modified
                } else {
                    GitStatus::Unmodified
                }
            })),
            Entry::File(file) | Entry::Virtual(file) => {
                let Some((root, relative)) = locate(&file).await? else {
                    return Ok(None);
                };
                let repo = Repository::open_exact(&root)?;
                Ok(Some(repo.file_status(&relative)?))
            }
        }
    }

    /// Changed entries of the worktree containing `dir`, limited to
    /// `pathspec` (relative to the worktree root).
    ///
    /// Paths matched by the ignore rules are left out unless `ignored` is
    /// set, in which case they are reported as `Ignored`. The aggregate is
    /// `Clean` only when no entries are reported.
    ///
    /// # Errors
    /// Returns error if the repository can't be read.
    pub async fn worktree_status(
        &self,
        dir: impl AsRef<Path>,
        pathspec: Option<&str>,
        ignored: bool,
    ) -> Result<Option<WorktreeStatus>> {
        let Some(root) = paths::get_root(dir).await else {
            return Ok(None);
        };
        let repo = Repository::open_exact(&root)?;
        let rules = self.ctx.ignore_rules();

        let entries: BTreeMap<String, GitStatus> = repo
            .statuses(pathspec, ignored)?
            .into_iter()
            .filter_map(|entry| {
                let status = if rules.is_ignored(&root, &entry.path) {
                    GitStatus::Ignored
                } else {
                    process_status_code(&entry.code())
                };
                (ignored || status != GitStatus::Ignored).then_some((entry.path, status))
            })
            .collect();

        let status = aggregate(entries.values().copied());
        debug!(root = %root.display(), ?status, changed = entries.len(), "worktree status");

        Ok(Some(WorktreeStatus {
            ref_name: repo.current_branch()?,
            bare: repo.is_bare(),
            root,
            status,
            entries,
        }))
    }

    /// Status of a single path, honouring ignore rules first.
    ///
    /// # Errors
    /// Returns error if the repository can't be read.
    pub async fn file_status(&self, path: impl AsRef<Path>) -> Result<Option<GitStatus>> {
        let path = path.as_ref();
        let Some((root, relative)) = locate(path).await? else {
            return Ok(None);
        };
        if !relative.is_empty() && self.ctx.ignore_rules().is_ignored(&root, &relative) {
            return Ok(Some(GitStatus::Ignored));
        }

        let pathspec = (!relative.is_empty()).then_some(relative.as_str());
        let Some(status) = self.worktree_status(&root, pathspec, false).await? else {
            return Ok(None);
        };

        Ok(Some(match paths::describe_entry(path).await {
            Entry::Directory(_) => status.status.as_file_status(),
            Entry::File(_) | Entry::Virtual(_) => status
                .entries
                .get(&relative)
                .copied()
                .unwrap_or(GitStatus::Unmodified),
        }))
    }

    /// Whether the worktree containing `path` has changes (ignored files
    /// excluded). Paths outside a repository are never dirty.
    ///
    /// # Errors
    /// Returns error if the repository can't be read.
    pub async fn is_dirty(&self, path: impl AsRef<Path>) -> Result<bool> {
        Ok(self
            .worktree_status(path, None, false)
            .await?
            .is_some_and(|status| status.status != BranchStatus::Clean))
    }
}

fn aggregate(statuses: impl Iterator<Item = GitStatus>) -> BranchStatus {
    let mut result = BranchStatus::Clean;
    for status in statuses {
        if status == GitStatus::Unmerged {
            return BranchStatus::Unmerged;
        }
        result = BranchStatus::Uncommitted;
    }
    result
}

/// Worktree root and `/`-separated path of `path` relative to it.
async fn locate(path: &Path) -> Result<Option<(PathBuf, String)>> {
    let resolved = paths::resolve_existing(path).await?;
    let Some(root) = paths::get_root(&resolved).await else {
        return Ok(None);
    };
    Ok(paths::relative_to(&root, &resolved).map(|relative| (root, relative)))
}
