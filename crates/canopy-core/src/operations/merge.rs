use std::path::Path;

use canopy_git::{MergeOutcome, Repository, Signature};
use serde::Serialize;
use tracing::{info, warn};

use super::RepositoryOperations;
use crate::config::ConfigStore;
use crate::error::{Error, Result};
use crate::paths;

/// Outcome of [`RepositoryOperations::merge`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MergeReport {
    pub outcome: MergeOutcome,
    /// Identity keys that were unset and replaced by the placeholder.
    pub missing_configs: Vec<String>,
}

impl MergeReport {
    /// Whether the caller should ask for an identity before a real merge.
    #[must_use]
    pub fn needs_identity(&self) -> bool {
        !self.missing_configs.is_empty()
    }
}

#[derive(Serialize)]
struct ReportJson<'a> {
    result: &'static str,
    #[serde(skip_serializing_if = "Option::is_none")]
    oid: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    conflicts: Option<&'a [String]>,
    #[serde(skip_serializing_if = "Option::is_none")]
    missing_configs: Option<&'a [String]>,
}

impl Serialize for MergeReport {
    fn serialize<S: serde::Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        let (result, oid, conflicts): (&str, Option<String>, &[String]) = match &self.outcome {
            MergeOutcome::UpToDate => ("up_to_date", None, &[]),
            MergeOutcome::FastForward(oid) => ("fast_forward", Some(oid.to_string()), &[]),
            MergeOutcome::Merged(oid) => ("merged", oid.map(|oid| oid.to_string()), &[]),
            MergeOutcome::Conflicted(paths) => ("conflicted", None, paths),
        };
        ReportJson {
            result,
            oid,
            conflicts: non_empty(conflicts),
            missing_configs: non_empty(&self.missing_configs),
        }
        .serialize(serializer)
    }
}

fn non_empty(list: &[String]) -> Option<&[String]> {
    (!list.is_empty()).then_some(list)
}

impl RepositoryOperations<'_> {
    /// Merge `compare` into branch `base`.
    ///
    /// The merge runs in whichever worktree has `base` checked out, so that
    /// worktree's files follow the branch. Unset `user.name`/`user.email` are
    /// replaced by the placeholder identity from settings and reported in
    /// `missing_configs`.
    ///
    /// # Errors
    /// Returns error if either branch is missing or the merge can't be written.
    pub async fn merge(
        &self,
        dir: &Path,
        base: &str,
        compare: &str,
        dry_run: bool,
    ) -> Result<MergeReport> {
        let paths = paths::get_worktree_paths(dir)
            .await?
            .ok_or(Error::NotARepository)?;
        let root = paths::get_branch_root(&paths.dir, base)
            .await?
            .unwrap_or_else(|| paths.dir.clone());
        let repo = Repository::open_exact(&root)?;

        let identity = ConfigStore::new(self.ctx).identity(&root).await?;
        let missing_configs = identity.missing_keys();
        if !missing_configs.is_empty() {
            warn!(missing = ?missing_configs, "merging with placeholder identity");
        }
        let placeholder = &self.ctx.settings().identity;
        let name = identity
            .name
            .unwrap_or_else(|| placeholder.placeholder_name.clone());
        let email = identity
            .email
            .unwrap_or_else(|| placeholder.placeholder_email.clone());
        let signature = Signature::now(&name, &email)?;

        let outcome = repo.merge_branches(base, compare, &signature, dry_run)?;
        info!(base, compare, dry_run, ?outcome, "merge finished");

        Ok(MergeReport {
            outcome,
            missing_configs,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::context::GitContext;
    use crate::test_support::{commit_file, create_branch, init_repo};
    use crate::worktree::WorktreeManager;

    fn tip(root: &Path, branch: &str) -> canopy_git::Oid {
        git2::Repository::open(root)
            .unwrap()
            .refname_to_id(&format!("refs/heads/{branch}"))
            .unwrap()
    }

    /// `feature` one commit ahead of `master`, checked out in a linked
    /// worktree next to the main one.
    async fn feature_ahead(ctx: &GitContext, root: &Path) -> std::path::PathBuf {
        create_branch(root, "feature");
        let worktree = WorktreeManager::new(ctx)
            .add(root, &root.parent().unwrap().join("feature"), "feature")
            .await
            .unwrap();
        commit_file(&worktree.path, "feature.txt", "feature\n");
        worktree.path
    }

    #[tokio::test]
    async fn test_fast_forward_updates_main_worktree() {
        let (temp, root) = init_repo();
        let ctx = GitContext::default().with_global_config(temp.path().join("none"));
        let linked = feature_ahead(&ctx, &root).await;
        let ops = RepositoryOperations::new(&ctx);

        let report = ops.merge(&linked, "master", "feature", false).await.unwrap();

        assert_eq!(report.outcome, MergeOutcome::FastForward(tip(&root, "feature")));
        assert!(!report.needs_identity());
        assert_eq!(tip(&root, "master"), tip(&root, "feature"));
        assert!(root.join("feature.txt").exists());
    }

    #[tokio::test]
    async fn test_dry_run_touches_nothing() {
        let (temp, root) = init_repo();
        let ctx = GitContext::default().with_global_config(temp.path().join("none"));
        let _linked = feature_ahead(&ctx, &root).await;
        let before = tip(&root, "master");
        let ops = RepositoryOperations::new(&ctx);

        let report = ops.merge(&root, "master", "feature", true).await.unwrap();

        assert!(matches!(report.outcome, MergeOutcome::FastForward(_)));
        assert_eq!(tip(&root, "master"), before);
        assert!(!root.join("feature.txt").exists());
    }

    #[tokio::test]
    async fn test_missing_identity_uses_placeholder() {
        let (temp, root) = init_repo();
        {
            let repo = git2::Repository::open(&root).unwrap();
            let mut config = repo
                .config()
                .unwrap()
                .open_level(git2::ConfigLevel::Local)
                .unwrap();
            config.remove("user.name").unwrap();
            config.remove("user.email").unwrap();
        }
        let ctx = GitContext::default().with_global_config(temp.path().join("none"));
        create_branch(&root, "side");
        commit_file(&root, "main.txt", "main\n");
        {
            let repo = git2::Repository::open(&root).unwrap();
            repo.set_head("refs/heads/side").unwrap();
            repo.checkout_head(Some(git2::build::CheckoutBuilder::new().force()))
                .unwrap();
        }
        commit_file(&root, "side.txt", "side\n");
        {
            let repo = git2::Repository::open(&root).unwrap();
            repo.set_head("refs/heads/master").unwrap();
            repo.checkout_head(Some(git2::build::CheckoutBuilder::new().force()))
                .unwrap();
        }
        let ops = RepositoryOperations::new(&ctx);

        let report = ops.merge(&root, "master", "side", false).await.unwrap();

        assert_eq!(
            report.missing_configs,
            vec!["user.name".to_string(), "user.email".to_string()]
        );
        let MergeOutcome::Merged(Some(oid)) = report.outcome else {
            panic!("expected merge commit, got {:?}", report.outcome);
        };
        let repo = git2::Repository::open(&root).unwrap();
        let commit = repo.find_commit(oid).unwrap();
        assert_eq!(commit.author().name(), Some("Mr. Test"));
        assert_eq!(commit.author().email(), Some("mrtest@example.com"));
        assert_eq!(commit.parent_count(), 2);
        assert!(root.join("side.txt").exists());
    }

    #[test]
    fn test_report_json() {
        let report = MergeReport {
            outcome: MergeOutcome::Conflicted(vec!["README.md".into()]),
            missing_configs: vec!["user.email".into()],
        };
        let json = serde_json::to_value(&report).unwrap();
        assert_eq!(json["result"], "conflicted");
        assert_eq!(json["conflicts"][0], "README.md");
        assert_eq!(json["missing_configs"][0], "user.email");
        assert!(json.get("oid").is_none());

        let up = serde_json::to_value(MergeReport {
            outcome: MergeOutcome::UpToDate,
            missing_configs: Vec::new(),
        })
        .unwrap();
        assert_eq!(up, serde_json::json!({ "result": "up_to_date" }));
    }
}
