//! Records exchanged with the application's state store.
//!
//! [`RepositoryDescriptor`] comes in from the store; [`EntityUpdate`] goes
//! back out describing what the store should persist.

use std::path::PathBuf;

use canopy_git::GitStatus;
use chrono::{DateTime, Utc};
use secrecy::{ExposeSecret, SecretString};
use serde::{Deserialize, Serialize};

use crate::status::BranchStatus;

/// OAuth provider a repository authenticates against.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OAuthProvider {
    Github,
    Gitlab,
    Bitbucket,
}

/// Resolved credentials for a repository's remote.
#[derive(Debug, Deserialize)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum Credentials {
    /// Personal access / OAuth token.
    Token { token: SecretString },
    /// Username and password.
    Password {
        username: String,
        password: SecretString,
    },
}

impl Credentials {
    /// Convert to the transfer-layer credential.
    #[must_use]
    pub fn to_transfer(&self) -> canopy_git::Credential {
        match self {
            Self::Token { token } => canopy_git::Credential::UserPass {
                username: "x-access-token".into(),
                password: token.expose_secret().to_string(),
            },
            Self::Password { username, password } => canopy_git::Credential::UserPass {
                username: username.clone(),
                password: password.expose_secret().to_string(),
            },
        }
    }
}

/// A repository as known to the state store.
#[derive(Debug, Serialize, Deserialize)]
pub struct RepositoryDescriptor {
    pub id: String,
    pub name: String,
    /// Working tree root on disk.
    pub root: PathBuf,
    /// Remote URL, if the repository has one.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub url: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub cors_proxy: Option<String>,
    #[serde(default)]
    pub local_branches: Vec<String>,
    /// Remote-tracking branch names, with or without the remote prefix.
    #[serde(default)]
    pub remote_branches: Vec<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub oauth: Option<OAuthProvider>,
    #[serde(default, skip_serializing)]
    pub credentials: Option<Credentials>,
}

impl RepositoryDescriptor {
    /// Whether `branch` exists on the remote side.
    #[must_use]
    pub fn has_remote_branch(&self, branch: &str) -> bool {
        self.remote_branches.iter().any(|remote| {
            remote == branch
                || remote
                    .split_once('/')
                    .is_some_and(|(_, name)| name == branch)
        })
    }
}

/// Repository-level record.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RepositoryRecord {
    pub id: String,
    pub name: String,
    pub root: PathBuf,
    pub local_branches: Vec<String>,
    pub remote_branches: Vec<String>,
}

/// A branch checked out in some worktree.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BranchRecord {
    pub repo: String,
    /// Branch name, `None` for a detached worktree.
    pub name: Option<String>,
    pub root: PathBuf,
    pub head: Option<String>,
    pub status: BranchStatus,
    pub bare: bool,
    pub linked: bool,
}

/// State the store should persist after an operation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum EntityUpdate {
    Repository(RepositoryRecord),
    Branch(BranchRecord),
    FileStatus {
        path: PathBuf,
        status: GitStatus,
    },
    Commit {
        repo: String,
        oid: String,
        summary: String,
        time: DateTime<Utc>,
    },
}

#[cfg(test)]
mod tests {
    use super::*;

    fn descriptor(json: &str) -> RepositoryDescriptor {
        serde_json::from_str(json).unwrap()
    }

    #[test]
    fn test_descriptor_defaults() {
        let desc = descriptor(r#"{"id":"1","name":"canopy","root":"/tmp/canopy"}"#);
        assert!(desc.url.is_none());
        assert!(desc.local_branches.is_empty());
        assert!(desc.credentials.is_none());
    }

    #[test]
    fn test_has_remote_branch_with_or_without_prefix() {
        let desc = descriptor(
            r#"{"id":"1","name":"r","root":"/r","remote_branches":["origin/main","dev"]}"#,
        );
        assert!(desc.has_remote_branch("main"));
        assert!(desc.has_remote_branch("dev"));
        assert!(!desc.has_remote_branch("feature"));
    }

    #[test]
    fn test_credentials_never_serialized_or_printed() {
        let desc = descriptor(
            r#"{"id":"1","name":"r","root":"/r","oauth":"github",
                "credentials":{"type":"token","token":"ghp_secret"}}"#,
        );
        assert_eq!(desc.oauth, Some(OAuthProvider::Github));

        let debug = format!("{desc:?}");
        assert!(!debug.contains("ghp_secret"));
        let json = serde_json::to_string(&desc).unwrap();
        assert!(!json.contains("ghp_secret"));
        assert!(!json.contains("credentials"));

        let canopy_git::Credential::UserPass { password, .. } =
            desc.credentials.unwrap().to_transfer()
        else {
            panic!("expected user/pass");
        };
        assert_eq!(password, "ghp_secret");
    }

    #[test]
    fn test_entity_update_is_tagged() {
        let update = EntityUpdate::FileStatus {
            path: PathBuf::from("src/lib.rs"),
            status: GitStatus::UnstagedModified,
        };
        let json = serde_json::to_value(&update).unwrap();
        assert_eq!(json["kind"], "file_status");
        assert_eq!(json["status"], "*modified");
    }
}
