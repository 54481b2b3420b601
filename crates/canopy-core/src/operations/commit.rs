use std::path::PathBuf;
use std::process::Stdio;

use canopy_git::{CommitRequest, Oid, Repository, Signature};
use chrono::{Local, Offset};
use tokio::io::AsyncWriteExt;
use tokio::process::Command;
use tracing::{debug, info};

use super::{RepositoryOperations, open_repo};
use crate::config::ConfigStore;
use crate::error::{Error, Result};

/// Identity for a commit. Missing fields fall back to `user.name`,
/// `user.email`, the current time and the local UTC offset.
#[derive(Debug, Clone, Default)]
pub struct Author {
    pub name: Option<String>,
    pub email: Option<String>,
    /// Seconds since the epoch.
    pub timestamp: Option<i64>,
    /// Minutes east of UTC.
    pub timezone_offset: Option<i32>,
}

/// Options for [`RepositoryOperations::commit`].
#[derive(Debug, Clone, Default)]
pub struct CommitOptions {
    pub dir: PathBuf,
    pub gitdir: Option<PathBuf>,
    pub message: String,
    pub author: Option<Author>,
    /// Defaults to the resolved author.
    pub committer: Option<Author>,
    /// GPG key id; the commit is signed when set.
    pub signing_key: Option<String>,
    /// Write the commit object but move no ref.
    pub dry_run: bool,
    /// Write the commit object without advancing the branch.
    pub no_update_branch: bool,
    /// Branch to commit on instead of HEAD.
    pub ref_name: Option<String>,
    /// Parent revisions; defaults to the tip of the target branch.
    pub parent: Option<Vec<String>>,
    /// Tree id; defaults to the current index.
    pub tree: Option<String>,
}

impl CommitOptions {
    #[must_use]
    pub fn new(dir: impl Into<PathBuf>, message: impl Into<String>) -> Self {
        Self {
            dir: dir.into(),
            message: message.into(),
            ..Self::default()
        }
    }
}

impl RepositoryOperations<'_> {
    /// Record the index (or `options.tree`) as a new commit and return its id.
    ///
    /// # Errors
    /// Returns `MissingIdentity` when no author name/email can be found,
    /// `InvalidRef` for unresolvable parents or trees, `Signing` if gpg fails.
    pub async fn commit(&self, options: &CommitOptions) -> Result<Oid> {
        let repo = open_repo(&options.dir, options.gitdir.as_deref())?;
        let author = self
            .resolve_author(options, options.author.as_ref(), None)
            .await?;
        let committer = match &options.committer {
            Some(committer) => {
                self.resolve_author(options, Some(committer), Some(&author))
                    .await?
            }
            None => author.clone(),
        };

        let target = options.ref_name.as_deref().unwrap_or("HEAD");
        let parents = match &options.parent {
            Some(revs) => Some(
                revs.iter()
                    .map(|rev| {
                        repo.resolve_commit(rev)
                            .map_err(|_| Error::InvalidRef(rev.clone()))
                    })
                    .collect::<Result<Vec<_>>>()?,
            ),
            None => match options.ref_name.as_deref() {
                Some(name) => Some(branch_tip(&repo, name)?.into_iter().collect()),
                None => None,
            },
        };
        let tree = options
            .tree
            .as_deref()
            .map(|tree| Oid::from_str(tree).map_err(|_| Error::InvalidRef(tree.to_string())))
            .transpose()?;

        let request = CommitRequest {
            message: &options.message,
            author: author.to_signature()?,
            committer: committer.to_signature()?,
            update_ref: (!options.dry_run && !options.no_update_branch).then_some(target),
            parents,
            tree,
        };

        let oid = match &options.signing_key {
            Some(key) => {
                let buffer = repo.commit_buffer(&request)?;
                let signature = gpg_sign(&buffer, key).await?;
                repo.commit_signed(&buffer, &signature, request.update_ref)?
            }
            None => repo.commit(&request)?,
        };

        if request.update_ref.is_none() {
            debug!(commit = %oid, "commit written without moving any ref");
        } else {
            info!(commit = %oid, target, "committed");
        }
        Ok(oid)
    }

    async fn resolve_author(
        &self,
        options: &CommitOptions,
        given: Option<&Author>,
        fallback: Option<&ResolvedAuthor>,
    ) -> Result<ResolvedAuthor> {
        let given = given.cloned().unwrap_or_default();
        let (name, email) = match (given.name, given.email, fallback) {
            (Some(name), Some(email), _) => (name, email),
            (name, email, Some(fallback)) => (
                name.unwrap_or_else(|| fallback.name.clone()),
                email.unwrap_or_else(|| fallback.email.clone()),
            ),
            (name, email, None) => {
                let identity = ConfigStore::new(self.ctx).identity(&options.dir).await?;
                (
                    name.or(identity.name).ok_or(Error::MissingIdentity)?,
                    email.or(identity.email).ok_or(Error::MissingIdentity)?,
                )
            }
        };

        let now = Local::now();
        Ok(ResolvedAuthor {
            name,
            email,
            timestamp: given.timestamp.unwrap_or_else(|| now.timestamp()),
            offset_minutes: given
                .timezone_offset
                .unwrap_or_else(|| now.offset().fix().local_minus_utc() / 60),
        })
    }
}

#[derive(Debug, Clone)]
struct ResolvedAuthor {
    name: String,
    email: String,
    timestamp: i64,
    offset_minutes: i32,
}

impl ResolvedAuthor {
    fn to_signature(&self) -> Result<Signature<'static>> {
        Ok(Repository::signature_at(
            &self.name,
            &self.email,
            self.timestamp,
            self.offset_minutes,
        )?)
    }
}

/// Tip of branch `name`; `None` when the branch doesn't exist yet.
fn branch_tip(repo: &Repository, name: &str) -> Result<Option<Oid>> {
    let refname = if name.starts_with("refs/") || name == "HEAD" {
        name.to_string()
    } else {
        format!("refs/heads/{name}")
    };
    Ok(repo.resolve_ref(&refname)?)
}

/// Detached ASCII-armored signature of `buffer` made with `gpg`.
async fn gpg_sign(buffer: &str, key: &str) -> Result<String> {
    let mut child = Command::new("gpg")
        .args(["--status-fd=2", "--detach-sign", "--armor", "--local-user", key])
        .stdin(Stdio::piped())
        .stdout(Stdio::piped())
        .stderr(Stdio::piped())
        .spawn()
        .map_err(|e| Error::Signing(format!("failed to run gpg: {e}")))?;

    if let Some(mut stdin) = child.stdin.take() {
        stdin.write_all(buffer.as_bytes()).await?;
    }
    let output = child.wait_with_output().await?;

    if !output.status.success() {
        let stderr = String::from_utf8_lossy(&output.stderr);
        return Err(Error::Signing(stderr.trim().to_string()));
    }
    String::from_utf8(output.stdout).map_err(|e| Error::Signing(e.to_string()))
}
