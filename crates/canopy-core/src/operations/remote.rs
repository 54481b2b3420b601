use canopy_git::{Credential, RemoteInfo, Repository, ServerRef};
use tracing::debug;

use super::RepositoryOperations;
use crate::error::Result;
use crate::traits::CallbackHooks;

impl RepositoryOperations<'_> {
    /// Refs and default branch advertised by `url`.
    ///
    /// `credential` is offered when the context's auth handler has none.
    ///
    /// # Errors
    /// Returns `Network` if the server can't be reached or rejects auth.
    pub async fn get_remote_info(
        &self,
        url: &str,
        credential: Option<Credential>,
    ) -> Result<RemoteInfo> {
        let hooks = CallbackHooks {
            auth: self.ctx.auth(),
            progress: None,
            fallback: credential,
        };
        let url = url.to_string();
        let info =
            tokio::task::spawn_blocking(move || Repository::list_remote(&url, &hooks)).await??;
        debug!(refs = info.refs.len(), default_branch = ?info.default_branch, "listed remote");
        Ok(info)
    }

    /// Refs advertised by `url` whose names start with `prefix`.
    ///
    /// Symbolic targets are only reported when `symrefs` is set.
    ///
    /// # Errors
    /// Returns `Network` if the server can't be reached or rejects auth.
    pub async fn list_server_refs(
        &self,
        url: &str,
        prefix: Option<&str>,
        symrefs: bool,
        credential: Option<Credential>,
    ) -> Result<Vec<ServerRef>> {
        let info = self.get_remote_info(url, credential).await?;
        Ok(info
            .refs
            .into_iter()
            .filter(|r| prefix.is_none_or(|prefix| r.name.starts_with(prefix)))
            .map(|r| ServerRef {
                symref_target: r.symref_target.filter(|_| symrefs),
                ..r
            })
            .collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::context::GitContext;
    use crate::test_support::{create_branch, init_repo};

    fn path_url(path: &std::path::Path) -> String {
        path.to_str().unwrap().to_string()
    }

    #[tokio::test]
    async fn test_get_remote_info_local_repo() {
        let (_temp, root) = init_repo();
        create_branch(&root, "feature");
        let ctx = GitContext::default();
        let ops = RepositoryOperations::new(&ctx);

        let info = ops.get_remote_info(&path_url(&root), None).await.unwrap();

        assert_eq!(info.default_branch.as_deref(), Some("refs/heads/master"));
        let names: Vec<&str> = info.refs.iter().map(|r| r.name.as_str()).collect();
        assert!(names.contains(&"refs/heads/feature"));
        assert!(names.contains(&"refs/heads/master"));
    }

    #[tokio::test]
    async fn test_list_server_refs_filters() {
        let (_temp, root) = init_repo();
        create_branch(&root, "feature");
        {
            let repo = git2::Repository::open(&root).unwrap();
            let head = repo.head().unwrap().peel_to_commit().unwrap();
            repo.tag_lightweight("v1.0", head.as_object(), false).unwrap();
        }
        let ctx = GitContext::default();
        let ops = RepositoryOperations::new(&ctx);
        let url = path_url(&root);

        let heads = ops
            .list_server_refs(&url, Some("refs/heads/"), false, None)
            .await
            .unwrap();
        assert_eq!(heads.len(), 2);
        assert!(heads.iter().all(|r| r.symref_target.is_none()));

        let tags = ops
            .list_server_refs(&url, Some("refs/tags/"), false, None)
            .await
            .unwrap();
        assert_eq!(tags.len(), 1);
        assert_eq!(tags[0].name, "refs/tags/v1.0");

        let all = ops.list_server_refs(&url, None, true, None).await.unwrap();
        let head = all.iter().find(|r| r.name == "HEAD").unwrap();
        assert_eq!(head.symref_target.as_deref(), Some("refs/heads/master"));
    }

    #[tokio::test]
    async fn test_unreachable_remote_is_error() {
        let temp = tempfile::TempDir::new().unwrap();
        let ctx = GitContext::default();
        let ops = RepositoryOperations::new(&ctx);

        let result = ops
            .get_remote_info(&path_url(&temp.path().join("missing")), None)
            .await;
        assert!(result.is_err());
    }
}
