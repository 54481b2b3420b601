//! Reading and writing git config across local and global scope.
//!
//! Each scope is a single INI file opened on its own, so lookups never fall
//! through to system or XDG files the way `git config` would.

use std::io::ErrorKind;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use tokio::fs;
use tracing::{debug, info, warn};

use crate::context::GitContext;
use crate::error::Result;
use crate::paths;

/// Where a config value was found.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Scope {
    Local,
    Global,
    /// Not found in any searched scope.
    None,
}

/// A resolved config lookup.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct GitConfigEntry {
    pub scope: Scope,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub value: Option<String>,
    /// File the value came from, when requested.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub origin: Option<PathBuf>,
}

impl GitConfigEntry {
    const fn missing() -> Self {
        Self {
            scope: Scope::None,
            value: None,
            origin: None,
        }
    }
}

/// Which scopes a lookup searches.
#[derive(Debug, Clone, Copy)]
pub struct ConfigQuery<'k> {
    /// Dotted key, e.g. `user.name`.
    pub key: &'k str,
    pub local: bool,
    pub global: bool,
    pub show_origin: bool,
}

impl<'k> ConfigQuery<'k> {
    /// Search local then global, without origin.
    #[must_use]
    pub const fn new(key: &'k str) -> Self {
        Self {
            key,
            local: true,
            global: true,
            show_origin: false,
        }
    }
}

/// Configured commit identity; either half may be missing.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Identity {
    pub name: Option<String>,
    pub email: Option<String>,
}

impl Identity {
    /// Keys that had no value, in `git config` spelling.
    #[must_use]
    pub fn missing_keys(&self) -> Vec<String> {
        let mut missing = Vec::new();
        if self.name.is_none() {
            missing.push("user.name".to_string());
        }
        if self.email.is_none() {
            missing.push("user.email".to_string());
        }
        missing
    }
}

/// Git config access scoped to a repository and the context's global file.
pub struct ConfigStore<'a> {
    ctx: &'a GitContext,
}

impl<'a> ConfigStore<'a> {
    #[must_use]
    pub const fn new(ctx: &'a GitContext) -> Self {
        Self { ctx }
    }

    /// Path of the local config for the repository containing `dir`.
    /// Linked worktrees resolve to the main repository's file.
    ///
    /// # Errors
    /// Returns error if worktree links can't be followed.
    pub async fn local_path(&self, dir: impl AsRef<Path>) -> Result<Option<PathBuf>> {
        Ok(paths::get_worktree_paths(dir)
            .await?
            .map(|paths| paths.gitdir.join("config")))
    }

    async fn scope_path(&self, dir: &Path, scope: Scope) -> Result<Option<PathBuf>> {
        Ok(match scope {
            Scope::Local => self.local_path(dir).await?,
            Scope::Global => self.ctx.global_config().map(Path::to_path_buf),
            Scope::None => None,
        })
    }

    /// Look up `query.key`, local scope first.
    ///
    /// # Errors
    /// Returns error if worktree links can't be followed.
    pub async fn get_config(
        &self,
        dir: impl AsRef<Path>,
        query: &ConfigQuery<'_>,
    ) -> Result<GitConfigEntry> {
        let dir = dir.as_ref();
        let scopes = [(Scope::Local, query.local), (Scope::Global, query.global)];

        for (scope, enabled) in scopes {
            if !enabled {
                continue;
            }
            let Some(file) = self.scope_path(dir, scope).await? else {
                continue;
            };
            if let Some(value) = read_value(&file, query.key).await {
                debug!(key = query.key, ?scope, "config value found");
                return Ok(GitConfigEntry {
                    scope,
                    value: Some(value),
                    origin: query.show_origin.then_some(file),
                });
            }
        }

        Ok(GitConfigEntry::missing())
    }

    /// Set `key` in `scope`, or delete it when `value` is `None`.
    ///
    /// Returns the new file contents, or `None` if the scope's file can't be
    /// resolved, doesn't exist, or can't be parsed.
    ///
    /// # Errors
    /// Returns error if the file can't be written.
    pub async fn set_config(
        &self,
        dir: impl AsRef<Path>,
        scope: Scope,
        key: &str,
        value: Option<&str>,
    ) -> Result<Option<String>> {
        let Some(file) = self.scope_path(dir.as_ref(), scope).await? else {
            return Ok(None);
        };
        if fs::metadata(&file).await.is_err() {
            debug!(file = %file.display(), "config file does not exist");
            return Ok(None);
        }

        let mut config = match git2::Config::open(&file) {
            Ok(config) => config,
            Err(e) => {
                warn!(file = %file.display(), error = %e, "unparsable config file");
                return Ok(None);
            }
        };

        match value {
            Some(value) => config.set_str(key, value)?,
            None => match config.remove(key) {
                Ok(()) => {}
                Err(e) if e.code() == git2::ErrorCode::NotFound => {
                    debug!(key, "config key already absent");
                }
                Err(e) => return Err(e.into()),
            },
        }
        drop(config);
        info!(file = %file.display(), key, removed = value.is_none(), "updated config");

        Ok(Some(fs::read_to_string(&file).await?))
    }

    /// `user.name` and `user.email`, each resolved local-then-global.
    ///
    /// # Errors
    /// Returns error if worktree links can't be followed.
    pub async fn identity(&self, dir: impl AsRef<Path>) -> Result<Identity> {
        let dir = dir.as_ref();
        Ok(Identity {
            name: self.get_config(dir, &ConfigQuery::new("user.name")).await?.value,
            email: self.get_config(dir, &ConfigQuery::new("user.email")).await?.value,
        })
    }
}

/// Read one key from one file. Missing files, unparsable files and missing
/// keys all yield `None`.
async fn read_value(file: &Path, key: &str) -> Option<String> {
    match fs::metadata(file).await {
        Ok(_) => {}
        Err(e) if e.kind() == ErrorKind::NotFound => return None,
        Err(e) => {
            warn!(file = %file.display(), error = %e, "config file unreadable");
            return None;
        }
    }

    let config = match git2::Config::open(file) {
        Ok(config) => config,
        Err(e) => {
            warn!(file = %file.display(), error = %e, "unparsable config file");
            return None;
        }
    };
    config.get_string(key).ok()
}
