//! Working tree status: per-path flags, cleanliness, and the status matrix.

use std::collections::{BTreeMap, BTreeSet};
use std::path::Path;

use git2::{ErrorCode, ObjectType, Oid, Status, StatusOptions, TreeWalkMode, TreeWalkResult};

use crate::Repository;
use crate::error::{Error, Result};
use crate::porcelain::{GitStatus, porcelain_code, process_status_code};

/// Bits of `IndexEntry::flags` holding the merge stage.
const INDEX_STAGE_MASK: u16 = 0x3000;

/// A changed path and its raw libgit2 status flags.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StatusEntry {
    /// Path relative to the working directory, `/`-separated.
    pub path: String,
    /// libgit2 status flags.
    pub status: Status,
}

impl StatusEntry {
    /// The porcelain `XY` code for this entry.
    #[must_use]
    pub fn code(&self) -> String {
        porcelain_code(self.status)
    }
}

/// One row of the status matrix.
///
/// - `head`: 0 absent, 1 present
/// - `workdir`: 0 absent, 1 identical to HEAD, 2 differs from HEAD
/// - `stage`: 0 absent, 1 identical to HEAD, 2 identical to workdir, 3 neither
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MatrixRow {
    pub path: String,
    pub head: u8,
    pub workdir: u8,
    pub stage: u8,
}

impl Repository {
    /// List changed paths, optionally limited to `pathspec`.
    ///
    /// Untracked files are always included; ignored files only when
    /// `include_ignored` is set.
    ///
    /// # Errors
    /// Returns error if the status walk fails.
    pub fn statuses(&self, pathspec: Option<&str>, include_ignored: bool) -> Result<Vec<StatusEntry>> {
        let mut options = StatusOptions::new();
        options
            .include_untracked(true)
            .recurse_untracked_dirs(true)
            .include_ignored(include_ignored)
            .recurse_ignored_dirs(include_ignored);
        if let Some(spec) = pathspec.filter(|s| !is_whole_tree(s)) {
            options.pathspec(spec);
        }

        let statuses = self.inner.statuses(Some(&mut options))?;
        Ok(statuses
            .iter()
            .filter_map(|entry| {
                entry.path().map(|path| StatusEntry {
                    path: path.to_string(),
                    status: entry.status(),
                })
            })
            .collect())
    }

    /// Normalized status of a single file, relative to the working directory.
    ///
    /// # Errors
    /// Returns error if the path is ambiguous or the status lookup fails.
    pub fn file_status(&self, relative: &str) -> Result<GitStatus> {
        match self.inner.status_file(Path::new(relative)) {
            Ok(status) if status.is_empty() => Ok(GitStatus::Unmodified),
            Ok(status) => Ok(process_status_code(&porcelain_code(status))),
            Err(e) if e.code() == ErrorCode::NotFound => Ok(GitStatus::Absent),
            Err(e) => Err(e.into()),
        }
    }

    /// Whether `relative` matches an ignore rule.
    ///
    /// # Errors
    /// Returns error if ignore rules can't be loaded.
    pub fn is_path_ignored(&self, relative: &str) -> Result<bool> {
        Ok(self.inner.is_path_ignored(relative)?)
    }

    /// Check if the working directory is clean (ignored files don't count).
    ///
    /// # Errors
    /// Returns error if status check fails.
    pub fn is_clean(&self) -> Result<bool> {
        Ok(self.statuses(None, false)?.is_empty())
    }

    /// Ensure working directory is clean, returning error if not.
    ///
    /// # Errors
    /// Returns `DirtyWorkingDirectory` if there are uncommitted changes.
    pub fn require_clean(&self) -> Result<()> {
        if self.is_clean()? {
            Ok(())
        } else {
            Err(Error::DirtyWorkingDirectory)
        }
    }

    /// Compare HEAD, index and working tree for every path known to any of
    /// them (ignored files excluded), limited to `pathspec`.
    ///
    /// # Errors
    /// Returns error for bare repositories or if objects can't be read.
    pub fn status_matrix(&self, pathspec: Option<&str>) -> Result<Vec<MatrixRow>> {
        let workdir = self.workdir().ok_or(Error::NotARepository)?.to_path_buf();
        let head = self.head_blobs()?;
        let index = self.index_blobs()?;

        let mut paths: BTreeSet<String> = head.keys().chain(index.keys()).cloned().collect();
        paths.extend(
            self.statuses(pathspec, false)?
                .into_iter()
                .filter(|entry| entry.status.is_wt_new())
                .map(|entry| entry.path),
        );

        paths
            .into_iter()
            .filter(|path| within(path, pathspec))
            .map(|path| {
                let head_oid = head.get(&path).copied();
                let stage_oid = index.get(&path).copied();
                let work_oid = hash_workdir_file(&workdir.join(&path))?;

                let workdir_code = match work_oid {
                    None => 0,
                    Some(oid) if Some(oid) == head_oid => 1,
                    Some(_) => 2,
                };
                let stage_code = match stage_oid {
                    None => 0,
                    Some(oid) if Some(oid) == head_oid => 1,
                    Some(oid) if Some(oid) == work_oid => 2,
                    Some(_) => 3,
                };

                Ok(MatrixRow {
                    head: u8::from(head_oid.is_some()),
                    workdir: workdir_code,
                    stage: stage_code,
                    path,
                })
            })
            .collect()
    }

    fn head_blobs(&self) -> Result<BTreeMap<String, Oid>> {
        let mut blobs = BTreeMap::new();
        let Some(head) = self.head_oid()? else {
            return Ok(blobs);
        };

        let tree = self.inner.find_commit(head)?.tree()?;
        tree.walk(TreeWalkMode::PreOrder, |root, entry| {
            if entry.kind() == Some(ObjectType::Blob) {
                if let Some(name) = entry.name() {
                    blobs.insert(format!("{root}{name}"), entry.id());
                }
            }
            TreeWalkResult::Ok
        })?;

        Ok(blobs)
    }

    fn index_blobs(&self) -> Result<BTreeMap<String, Oid>> {
        let index = self.inner.index()?;
        Ok(index
            .iter()
            .filter(|entry| entry.flags & INDEX_STAGE_MASK == 0)
            .map(|entry| (String::from_utf8_lossy(&entry.path).into_owned(), entry.id))
            .collect())
    }
}

fn is_whole_tree(spec: &str) -> bool {
    spec.is_empty() || spec == "."
}

fn within(path: &str, pathspec: Option<&str>) -> bool {
    let Some(spec) = pathspec.map(|s| s.trim_end_matches('/')) else {
        return true;
    };
    if is_whole_tree(spec) {
        return true;
    }
    path == spec
        || path
            .strip_prefix(spec)
            .is_some_and(|rest| rest.starts_with('/'))
}

/// Blob id of a working tree file, `None` if it isn't a file or symlink.
fn hash_workdir_file(path: &Path) -> Result<Option<Oid>> {
    let metadata = match std::fs::symlink_metadata(path) {
        Ok(metadata) => metadata,
        Err(_) => return Ok(None),
    };

    if metadata.file_type().is_symlink() {
        let target = std::fs::read_link(path)
            .map_err(|e| git2::Error::from_str(&e.to_string()))?;
        let bytes = target.to_string_lossy();
        Ok(Some(Oid::hash_object(ObjectType::Blob, bytes.as_bytes())?))
    } else if metadata.is_file() {
        Ok(Some(Oid::hash_file(ObjectType::Blob, path)?))
    } else {
        Ok(None)
    }
}
