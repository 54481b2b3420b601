//! Network transfers: clone and ls-remote with progress and credential hooks.

use std::cell::{Cell, RefCell};
use std::fmt;
use std::path::PathBuf;

use git2::build::{CheckoutBuilder, RepoBuilder};
use git2::{AutotagOption, Cred, CredentialType, Direction, FetchOptions, RemoteCallbacks};
use tracing::{debug, info, warn};

use crate::Repository;
use crate::error::{Error, Result};

/// Give up after this many credential requests for one transfer.
const MAX_CREDENTIAL_ATTEMPTS: u32 = 3;

/// A resolved credential for one network operation.
#[derive(Clone, PartialEq, Eq)]
pub enum Credential {
    /// Username and password (or token) over HTTPS.
    UserPass { username: String, password: String },
    /// Key held by the running SSH agent.
    SshAgent { username: String },
    /// Let libgit2 negotiate (NTLM/Kerberos).
    Default,
}

impl fmt::Debug for Credential {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::UserPass { username, .. } => f
                .debug_struct("UserPass")
                .field("username", username)
                .field("password", &"[REDACTED]")
                .finish(),
            Self::SshAgent { username } => f
                .debug_struct("SshAgent")
                .field("username", username)
                .finish(),
            Self::Default => f.write_str("Default"),
        }
    }
}

/// Callbacks invoked while a transfer runs. All methods default to no-ops.
pub trait TransferHooks: Send + Sync {
    /// Progress within `phase` ("Receiving objects", "Resolving deltas",
    /// "Checking out files").
    fn progress(&self, _phase: &str, _loaded: usize, _total: usize) {}

    /// Supply a credential for `url`. `None` falls back to libgit2 defaults.
    fn credential(&self, _url: &str) -> Option<Credential> {
        None
    }

    /// The server refused a previously supplied credential.
    fn rejected(&self, _url: &str, _credential: &Credential) {}

    /// The transfer succeeded using a supplied credential.
    fn accepted(&self, _url: &str) {}
}

/// Hooks that do nothing.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoHooks;

impl TransferHooks for NoHooks {}

/// Options for a network clone.
#[derive(Debug, Clone, Default)]
pub struct CloneRequest {
    pub url: String,
    pub dir: PathBuf,
    /// Branch to check out instead of the remote HEAD.
    pub branch: Option<String>,
    /// Only fetch `branch`.
    pub single_branch: bool,
    /// Leave the working tree empty.
    pub no_checkout: bool,
    /// Don't fetch tags.
    pub no_tags: bool,
    /// Shallow fetch depth; `None` or `0` fetches full history.
    pub depth: Option<u32>,
}

/// One ref advertised by a server.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ServerRef {
    pub name: String,
    pub oid: String,
    /// Target of a symbolic ref (`HEAD -> refs/heads/main`).
    pub symref_target: Option<String>,
}

/// What a server advertises about itself.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RemoteInfo {
    /// Full refname the remote HEAD points at.
    pub default_branch: Option<String>,
    pub refs: Vec<ServerRef>,
}

/// Tracks credential requests across libgit2's retry loop.
struct CredentialState<'h> {
    hooks: &'h dyn TransferHooks,
    attempts: Cell<u32>,
    last: RefCell<Option<Credential>>,
}

impl<'h> CredentialState<'h> {
    fn new(hooks: &'h dyn TransferHooks) -> Self {
        Self {
            hooks,
            attempts: Cell::new(0),
            last: RefCell::new(None),
        }
    }

    fn supply(
        &self,
        url: &str,
        username_from_url: Option<&str>,
        allowed: CredentialType,
    ) -> std::result::Result<Cred, git2::Error> {
        let attempt = self.attempts.get() + 1;
        self.attempts.set(attempt);

        if let Some(previous) = self.last.borrow().as_ref() {
            warn!(url, attempt, "credential rejected");
            self.hooks.rejected(url, previous);
        }
        if attempt > MAX_CREDENTIAL_ATTEMPTS {
            return Err(git2::Error::from_str("authentication failed"));
        }

        let credential = self.hooks.credential(url);
        let cred = match &credential {
            Some(Credential::UserPass { username, password }) => {
                Cred::userpass_plaintext(username, password)
            }
            Some(Credential::SshAgent { username }) => Cred::ssh_key_from_agent(username),
            Some(Credential::Default) => Cred::default(),
            None if allowed.contains(CredentialType::SSH_KEY) => {
                Cred::ssh_key_from_agent(username_from_url.unwrap_or("git"))
            }
            None if allowed.contains(CredentialType::DEFAULT) => Cred::default(),
            None => Err(git2::Error::from_str("no credential available")),
        };
        *self.last.borrow_mut() = credential;
        cred
    }

    fn finish(&self, url: &str) {
        if self.last.borrow().is_some() {
            self.hooks.accepted(url);
        }
    }
}

fn callbacks<'a>(state: &'a CredentialState<'a>, hooks: &'a dyn TransferHooks) -> RemoteCallbacks<'a> {
    let mut callbacks = RemoteCallbacks::new();
    callbacks.credentials(move |url, username, allowed| state.supply(url, username, allowed));
    callbacks.transfer_progress(move |stats| {
        if stats.received_objects() < stats.total_objects() {
            hooks.progress("Receiving objects", stats.received_objects(), stats.total_objects());
        } else {
            hooks.progress("Resolving deltas", stats.indexed_deltas(), stats.total_deltas());
        }
        true
    });
    callbacks
}

impl Repository {
    /// Clone `request.url` into `request.dir`.
    ///
    /// # Errors
    /// Returns `Network` for transport failures, `Git2` for anything else.
    pub fn clone_from(request: &CloneRequest, hooks: &dyn TransferHooks) -> Result<Self> {
        let state = CredentialState::new(hooks);

        let mut fetch = FetchOptions::new();
        fetch.remote_callbacks(callbacks(&state, hooks));
        if request.no_tags {
            fetch.download_tags(AutotagOption::None);
        }
        if let Some(depth) = request.depth.filter(|d| *d > 0) {
            fetch.depth(i32::try_from(depth).unwrap_or(i32::MAX));
        }

        let mut checkout = CheckoutBuilder::new();
        if request.no_checkout {
            checkout.dry_run();
        }
        checkout.progress(|_, loaded, total| hooks.progress("Checking out files", loaded, total));

        let mut builder = RepoBuilder::new();
        builder.fetch_options(fetch).with_checkout(checkout);
        if let Some(branch) = request.branch.as_deref() {
            builder.branch(branch);
            if request.single_branch {
                let branch = branch.to_string();
                builder.remote_create(move |repo, name, url| {
                    let refspec = format!("+refs/heads/{branch}:refs/remotes/{name}/{branch}");
                    repo.remote_with_fetch(name, url, &refspec)
                });
            }
        }

        debug!(url = %request.url, dir = %request.dir.display(), "cloning");
        let inner = builder
            .clone(&request.url, &request.dir)
            .map_err(Error::from_transfer)?;
        state.finish(&request.url);
        info!(url = %request.url, dir = %request.dir.display(), "cloned");

        Ok(Self { inner })
    }

    /// List the refs a remote advertises, without a local repository.
    ///
    /// # Errors
    /// Returns `Network` if the server can't be reached or refuses auth.
    pub fn list_remote(url: &str, hooks: &dyn TransferHooks) -> Result<RemoteInfo> {
        let state = CredentialState::new(hooks);
        let mut remote = git2::Remote::create_detached(url)?;
        let connection = remote
            .connect_auth(Direction::Fetch, Some(callbacks(&state, hooks)), None)
            .map_err(Error::from_transfer)?;

        let refs: Vec<ServerRef> = connection
            .list()?
            .iter()
            .map(|head| ServerRef {
                name: head.name().to_string(),
                oid: head.oid().to_string(),
                symref_target: head.symref_target().map(String::from),
            })
            .collect();

        let default_branch = connection
            .default_branch()
            .ok()
            .and_then(|buf| buf.as_str().map(String::from))
            .or_else(|| {
                refs.iter()
                    .find(|r| r.name == "HEAD")
                    .and_then(|r| r.symref_target.clone())
            });
        drop(connection);
        state.finish(url);

        Ok(RemoteInfo {
            default_branch,
            refs,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::repository::tests::init_test_repo;
    use std::path::Path;
    use std::sync::Mutex;
    use tempfile::TempDir;

    fn path_url(path: &Path) -> String {
        path.to_str().unwrap().to_string()
    }

    #[derive(Default)]
    struct Recorder {
        phases: Mutex<Vec<String>>,
    }

    impl TransferHooks for Recorder {
        fn progress(&self, phase: &str, _loaded: usize, _total: usize) {
            self.phases.lock().unwrap().push(phase.to_string());
        }
    }

    #[test]
    fn test_credential_debug_redacts_password() {
        let cred = Credential::UserPass {
            username: "alice".into(),
            password: "hunter2".into(),
        };
        let debug = format!("{cred:?}");
        assert!(debug.contains("alice"));
        assert!(!debug.contains("hunter2"));
    }

    #[test]
    fn test_credential_attempts_are_capped() {
        struct Always;
        impl TransferHooks for Always {
            fn credential(&self, _url: &str) -> Option<Credential> {
                Some(Credential::UserPass {
                    username: "u".into(),
                    password: "p".into(),
                })
            }
        }

        let hooks = Always;
        let state = CredentialState::new(&hooks);
        for _ in 0..MAX_CREDENTIAL_ATTEMPTS {
            assert!(state.supply("https://x", None, CredentialType::USER_PASS_PLAINTEXT).is_ok());
        }
        assert!(state.supply("https://x", None, CredentialType::USER_PASS_PLAINTEXT).is_err());
    }

    #[test]
    fn test_clone_local_path() {
        let (source, repo) = init_test_repo();
        let branch = repo.current_branch().unwrap().unwrap();
        let target = TempDir::new().unwrap();
        let dir = target.path().join("copy");

        let recorder = Recorder::default();
        let cloned = Repository::clone_from(
            &CloneRequest {
                url: path_url(source.path()),
                dir: dir.clone(),
                ..CloneRequest::default()
            },
            &recorder,
        )
        .unwrap();

        assert_eq!(cloned.current_branch().unwrap(), Some(branch));
        assert!(dir.join("README.md").exists());
        assert!(
            recorder
                .phases
                .lock()
                .unwrap()
                .iter()
                .any(|p| p == "Checking out files")
        );
    }

    #[test]
    fn test_clone_no_checkout_leaves_tree_empty() {
        let (source, _repo) = init_test_repo();
        let target = TempDir::new().unwrap();
        let dir = target.path().join("bare-ish");

        Repository::clone_from(
            &CloneRequest {
                url: path_url(source.path()),
                dir: dir.clone(),
                no_checkout: true,
                ..CloneRequest::default()
            },
            &NoHooks,
        )
        .unwrap();

        assert!(dir.join(".git").is_dir());
        assert!(!dir.join("README.md").exists());
    }

    #[test]
    fn test_list_remote_local_path() {
        let (source, repo) = init_test_repo();
        let branch = repo.current_branch().unwrap().unwrap();
        let refname = format!("refs/heads/{branch}");

        let info = Repository::list_remote(&path_url(source.path()), &NoHooks).unwrap();
        assert!(info.refs.iter().any(|r| r.name == refname));
        assert_eq!(info.default_branch.as_deref(), Some(refname.as_str()));
    }
}
