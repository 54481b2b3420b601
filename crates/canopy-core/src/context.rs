//! Explicit context handed to every component.

use std::fmt;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use crate::settings::Settings;
use crate::traits::{AuthHandler, GitIgnoreRules, IgnoreRules};

/// Settings plus the collaborators the core calls out to.
#[derive(Clone)]
pub struct GitContext {
    settings: Settings,
    global_config: Option<PathBuf>,
    ignore_rules: Arc<dyn IgnoreRules>,
    auth: Option<Arc<dyn AuthHandler>>,
}

impl GitContext {
    /// Build a context from settings. The global config defaults to
    /// `settings.git.global_config`, then `~/.gitconfig`.
    #[must_use]
    pub fn new(settings: Settings) -> Self {
        let global_config = settings
            .git
            .global_config
            .clone()
            .or_else(|| dirs::home_dir().map(|home| home.join(".gitconfig")));

        Self {
            settings,
            global_config,
            ignore_rules: Arc::new(GitIgnoreRules),
            auth: None,
        }
    }

    /// Use a specific global config file.
    #[must_use]
    pub fn with_global_config(mut self, path: impl Into<PathBuf>) -> Self {
        self.global_config = Some(path.into());
        self
    }

    /// Replace the ignore-rule engine.
    #[must_use]
    pub fn with_ignore_rules(mut self, rules: Arc<dyn IgnoreRules>) -> Self {
        self.ignore_rules = rules;
        self
    }

    /// Install authentication hooks for network operations.
    #[must_use]
    pub fn with_auth(mut self, auth: Arc<dyn AuthHandler>) -> Self {
        self.auth = Some(auth);
        self
    }

    #[must_use]
    pub const fn settings(&self) -> &Settings {
        &self.settings
    }

    /// Path of the global git config file, if one could be determined.
    #[must_use]
    pub fn global_config(&self) -> Option<&Path> {
        self.global_config.as_deref()
    }

    #[must_use]
    pub fn ignore_rules(&self) -> &dyn IgnoreRules {
        self.ignore_rules.as_ref()
    }

    #[must_use]
    pub fn auth(&self) -> Option<Arc<dyn AuthHandler>> {
        self.auth.clone()
    }
}

impl Default for GitContext {
    fn default() -> Self {
        Self::new(Settings::default())
    }
}

impl fmt::Debug for GitContext {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("GitContext")
            .field("settings", &self.settings)
            .field("global_config", &self.global_config)
            .field("auth", &self.auth.is_some())
            .finish_non_exhaustive()
    }
}
