use std::collections::BTreeSet;

use canopy_git::{Oid, Repository};
use chrono::{DateTime, Utc};
use tracing::debug;

use super::RepositoryOperations;
use crate::descriptor::{BranchRecord, EntityUpdate, RepositoryDescriptor, RepositoryRecord};
use crate::error::{Error, Result};
use crate::status::{BranchStatus, StatusEngine};
use crate::worktree::WorktreeManager;

impl RepositoryOperations<'_> {
    /// Current state of a repository as records for the state store.
    ///
    /// Emits one `Repository` record, then per worktree a `Branch` record
    /// followed by a `FileStatus` for each changed path, then one `Commit`
    /// per distinct worktree head.
    ///
    /// # Errors
    /// Returns `NotARepository` if the descriptor's root isn't a repository.
    pub async fn repository_snapshot(
        &self,
        descriptor: &RepositoryDescriptor,
    ) -> Result<Vec<EntityUpdate>> {
        let worktrees = WorktreeManager::new(self.ctx)
            .list(&descriptor.root)
            .await?
            .ok_or(Error::NotARepository)?;
        let main = worktrees
            .iter()
            .find(|w| w.main)
            .ok_or(Error::NotARepository)?;
        let repo = Repository::open_exact(&main.path)?;

        let mut updates = vec![EntityUpdate::Repository(RepositoryRecord {
            id: descriptor.id.clone(),
            name: descriptor.name.clone(),
            root: main.path.clone(),
            local_branches: repo.list_branches()?,
            remote_branches: repo.list_remote_branches()?,
        })];

        let engine = StatusEngine::new(self.ctx);
        let mut heads = BTreeSet::new();
        for worktree in &worktrees {
            let status = engine.worktree_status(&worktree.path, None, false).await?;
            updates.push(EntityUpdate::Branch(BranchRecord {
                repo: descriptor.id.clone(),
                name: worktree.ref_name.clone(),
                root: worktree.path.clone(),
                head: worktree.rev.clone(),
                status: status.as_ref().map_or(BranchStatus::Clean, |s| s.status),
                bare: worktree.bare,
                linked: !worktree.main,
            }));
            if let Some(status) = status {
                updates.extend(status.entries.into_iter().map(|(path, status)| {
                    EntityUpdate::FileStatus {
                        path: worktree.path.join(path),
                        status,
                    }
                }));
            }
            heads.extend(worktree.rev.clone());
        }

        for rev in heads {
            let Ok(oid) = Oid::from_str(&rev) else {
                continue;
            };
            let commit = repo.inner().find_commit(oid)?;
            updates.push(EntityUpdate::Commit {
                repo: descriptor.id.clone(),
                oid: rev,
                summary: commit.summary().unwrap_or_default().to_string(),
                time: DateTime::<Utc>::from_timestamp(commit.time().seconds(), 0)
                    .unwrap_or_default(),
            });
        }

        debug!(repo = %descriptor.id, updates = updates.len(), "built snapshot");
        Ok(updates)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::context::GitContext;
    use crate::test_support::{create_branch, init_repo};
    use canopy_git::GitStatus;
    use std::fs;

    fn descriptor(root: &std::path::Path) -> RepositoryDescriptor {
        RepositoryDescriptor {
            id: "r1".into(),
            name: "baseRepo".into(),
            root: root.to_path_buf(),
            url: None,
            cors_proxy: None,
            local_branches: Vec::new(),
            remote_branches: Vec::new(),
            oauth: None,
            credentials: None,
        }
    }

    #[tokio::test]
    async fn test_snapshot_records_worktrees_and_changes() {
        let (_temp, root) = init_repo();
        create_branch(&root, "foo");
        let ctx = GitContext::default();
        let linked = WorktreeManager::new(&ctx)
            .add(&root, &root.parent().unwrap().join("foo"), "foo")
            .await
            .unwrap();
        fs::write(linked.path.join("new.txt"), "new\n").unwrap();
        let ops = RepositoryOperations::new(&ctx);

        let updates = ops.repository_snapshot(&descriptor(&root)).await.unwrap();

        let EntityUpdate::Repository(record) = &updates[0] else {
            panic!("first update should be the repository");
        };
        let mut local = record.local_branches.clone();
        local.sort();
        assert_eq!(local, vec!["foo".to_string(), "master".to_string()]);

        let branches: Vec<&BranchRecord> = updates
            .iter()
            .filter_map(|u| match u {
                EntityUpdate::Branch(b) => Some(b),
                _ => None,
            })
            .collect();
        assert_eq!(branches.len(), 2);
        assert_eq!(branches[0].name.as_deref(), Some("master"));
        assert_eq!(branches[0].status, BranchStatus::Clean);
        assert!(!branches[0].linked);
        assert_eq!(branches[1].name.as_deref(), Some("foo"));
        assert_eq!(branches[1].status, BranchStatus::Uncommitted);
        assert!(branches[1].linked);

        assert!(updates.contains(&EntityUpdate::FileStatus {
            path: linked.path.join("new.txt"),
            status: GitStatus::Absent,
        }));

        // master and foo share a head commit.
        let commits = updates
            .iter()
            .filter(|u| matches!(u, EntityUpdate::Commit { .. }))
            .count();
        assert_eq!(commits, 1);
    }

    #[tokio::test]
    async fn test_snapshot_outside_repository() {
        let temp = tempfile::TempDir::new().unwrap();
        let ctx = GitContext::default();
        let ops = RepositoryOperations::new(&ctx);

        let err = ops
            .repository_snapshot(&descriptor(temp.path()))
            .await
            .unwrap_err();
        assert!(matches!(err, Error::NotARepository));
    }
}
