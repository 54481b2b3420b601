//! Commit creation (plain and signed) and branch merging.

use std::collections::BTreeSet;
use std::fmt;

use git2::build::CheckoutBuilder;
use git2::{IndexAddOption, Oid, Signature};
use tracing::{debug, info};

use crate::Repository;
use crate::error::{Error, Result};

/// Inputs for a new commit object.
#[derive(Clone)]
pub struct CommitRequest<'a> {
    pub message: &'a str,
    pub author: Signature<'static>,
    pub committer: Signature<'static>,
    /// Ref to advance (`HEAD`, a branch name, or a full refname).
    /// `None` writes the object without moving anything.
    pub update_ref: Option<&'a str>,
    /// Explicit parents; defaults to HEAD (none on an unborn branch).
    pub parents: Option<Vec<Oid>>,
    /// Explicit tree; defaults to the tree of the current index.
    pub tree: Option<Oid>,
}

impl fmt::Debug for CommitRequest<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CommitRequest")
            .field("message", &self.message)
            .field("author", &self.author.to_string())
            .field("committer", &self.committer.to_string())
            .field("update_ref", &self.update_ref)
            .field("parents", &self.parents)
            .field("tree", &self.tree)
            .finish()
    }
}

/// Result of merging one branch into another.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MergeOutcome {
    /// `base` already contains `compare`.
    UpToDate,
    /// `base` was (or would be) moved forward to this commit.
    FastForward(Oid),
    /// A merge commit was created; `None` for dry runs.
    Merged(Option<Oid>),
    /// The merge stopped on conflicts in these paths. Nothing was written.
    Conflicted(Vec<String>),
}

impl Repository {
    /// Stage every change in the working tree, including deletions.
    ///
    /// # Errors
    /// Returns error if the index can't be updated.
    pub fn stage_all(&self) -> Result<()> {
        let mut index = self.inner.index()?;
        index.add_all(["*"], IndexAddOption::DEFAULT, None)?;
        index.update_all(["*"], None)?;
        index.write()?;
        Ok(())
    }

    /// Check if the index differs from HEAD.
    ///
    /// # Errors
    /// Returns error if the status walk fails.
    pub fn has_staged_changes(&self) -> Result<bool> {
        Ok(self.statuses(None, false)?.iter().any(|entry| {
            let s = entry.status;
            s.is_index_new()
                || s.is_index_modified()
                || s.is_index_deleted()
                || s.is_index_renamed()
                || s.is_index_typechange()
        }))
    }

    /// Create a commit object and optionally advance a ref to it.
    ///
    /// # Errors
    /// Returns error if the tree or parents can't be found.
    pub fn commit(&self, request: &CommitRequest<'_>) -> Result<Oid> {
        let tree = self.commit_tree(request.tree)?;
        let parents = self.commit_parents(request.parents.as_deref())?;
        let parent_refs: Vec<&git2::Commit<'_>> = parents.iter().collect();

        let oid = self.inner.commit(
            None,
            &request.author,
            &request.committer,
            request.message,
            &tree,
            &parent_refs,
        )?;

        if let Some(refname) = request.update_ref {
            self.update_ref(refname, oid, request.message)?;
        }
        info!(commit = %oid, "created commit");

        Ok(oid)
    }

    /// Render the commit object that [`Repository::commit`] would write, for
    /// signing by an external tool.
    ///
    /// # Errors
    /// Returns error if the tree or parents can't be found.
    pub fn commit_buffer(&self, request: &CommitRequest<'_>) -> Result<String> {
        let tree = self.commit_tree(request.tree)?;
        let parents = self.commit_parents(request.parents.as_deref())?;
        let parent_refs: Vec<&git2::Commit<'_>> = parents.iter().collect();

        let buffer = self.inner.commit_create_buffer(
            &request.author,
            &request.committer,
            request.message,
            &tree,
            &parent_refs,
        )?;

        buffer
            .as_str()
            .map(String::from)
            .ok_or_else(|| Error::Git2(git2::Error::from_str("commit buffer is not UTF-8")))
    }

    /// Write a signed commit from a buffer produced by
    /// [`Repository::commit_buffer`] and optionally advance a ref to it.
    ///
    /// # Errors
    /// Returns error if the object can't be written.
    pub fn commit_signed(
        &self,
        buffer: &str,
        signature: &str,
        update_ref: Option<&str>,
    ) -> Result<Oid> {
        let oid = self.inner.commit_signed(buffer, signature, Some("gpgsig"))?;
        if let Some(refname) = update_ref {
            let summary = buffer.split("\n\n").nth(1).unwrap_or_default();
            self.update_ref(refname, oid, summary)?;
        }
        info!(commit = %oid, "created signed commit");
        Ok(oid)
    }

    /// Point `refname` at `oid`. `HEAD` follows its symbolic target, so a
    /// commit on an unborn branch creates that branch.
    ///
    /// # Errors
    /// Returns error if the ref can't be written.
    pub fn update_ref(&self, refname: &str, oid: Oid, message: &str) -> Result<()> {
        let target = if refname == "HEAD" {
            self.inner
                .find_reference("HEAD")
                .ok()
                .and_then(|head| head.symbolic_target().map(String::from))
                .unwrap_or_else(|| "HEAD".to_string())
        } else if refname.starts_with("refs/") {
            refname.to_string()
        } else {
            format!("refs/heads/{refname}")
        };

        let summary = message.lines().next().unwrap_or_default();
        self.inner
            .reference(&target, oid, true, &format!("commit: {summary}"))?;
        debug!(reference = %target, commit = %oid, "updated ref");
        Ok(())
    }

    fn commit_tree(&self, tree: Option<Oid>) -> Result<git2::Tree<'_>> {
        let oid = match tree {
            Some(oid) => oid,
            None => self.inner.index()?.write_tree()?,
        };
        Ok(self.inner.find_tree(oid)?)
    }

    fn commit_parents(&self, parents: Option<&[Oid]>) -> Result<Vec<git2::Commit<'_>>> {
        let oids: Vec<Oid> = match parents {
            Some(explicit) => explicit.to_vec(),
            None => self.head_oid()?.into_iter().collect(),
        };
        oids.into_iter()
            .map(|oid| self.inner.find_commit(oid).map_err(Error::from))
            .collect()
    }

    // === Merge ===

    /// Merge `compare` (any revision) into local branch `base`.
    ///
    /// Fast-forwards when possible, otherwise creates a two-parent merge
    /// commit signed by `signature`. The working tree is only updated when
    /// `base` is the branch checked out in this repository. Dry runs never
    /// move refs or touch files.
    ///
    /// # Errors
    /// Returns `BranchNotFound`/`RefNotFound` if either side is missing.
    pub fn merge_branches(
        &self,
        base: &str,
        compare: &str,
        signature: &Signature<'_>,
        dry_run: bool,
    ) -> Result<MergeOutcome> {
        let base_oid = self.branch_commit(base)?;
        let compare_oid = self
            .branch_commit(compare)
            .or_else(|_| self.resolve_commit(compare))?;

        if base_oid == compare_oid || self.inner.graph_descendant_of(base_oid, compare_oid)? {
            return Ok(MergeOutcome::UpToDate);
        }

        let on_base = self.current_branch()?.as_deref() == Some(base);

        if self.inner.graph_descendant_of(compare_oid, base_oid)? {
            if !dry_run {
                let message = format!("merge {compare}: Fast-forward");
                self.advance_branch(base, compare_oid, on_base, &message)?;
            }
            return Ok(MergeOutcome::FastForward(compare_oid));
        }

        let ours = self.inner.find_commit(base_oid)?;
        let theirs = self.inner.find_commit(compare_oid)?;
        let mut index = self.inner.merge_commits(&ours, &theirs, None)?;

        if index.has_conflicts() {
            let paths: BTreeSet<String> = index
                .conflicts()?
                .filter_map(std::result::Result::ok)
                .filter_map(|conflict| conflict.our.or(conflict.their).or(conflict.ancestor))
                .map(|entry| String::from_utf8_lossy(&entry.path).into_owned())
                .collect();
            return Ok(MergeOutcome::Conflicted(paths.into_iter().collect()));
        }

        if dry_run {
            return Ok(MergeOutcome::Merged(None));
        }

        let tree_oid = index.write_tree_to(&self.inner)?;
        let tree = self.inner.find_tree(tree_oid)?;
        let message = format!("Merge branch '{compare}' into {base}");
        let oid = self
            .inner
            .commit(None, signature, signature, &message, &tree, &[&ours, &theirs])?;
        self.advance_branch(base, oid, on_base, &message)?;
        info!(base, compare, commit = %oid, "merged");

        Ok(MergeOutcome::Merged(Some(oid)))
    }

    fn advance_branch(&self, branch: &str, target: Oid, on_branch: bool, message: &str) -> Result<()> {
        if on_branch {
            let object = self.inner.find_object(target, None)?;
            let mut builder = CheckoutBuilder::new();
            builder.safe();
            self.inner.checkout_tree(&object, Some(&mut builder))?;
        }
        self.inner
            .reference(&format!("refs/heads/{branch}"), target, true, message)?;
        Ok(())
    }
}
