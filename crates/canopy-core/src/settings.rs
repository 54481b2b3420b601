//! Application settings loaded from `canopy.toml`.

use std::fs;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};

/// Canopy settings.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
pub struct Settings {
    /// Local-copy clone behaviour.
    #[serde(default)]
    pub clone: CloneSettings,

    /// Identity used when `user.name` / `user.email` are missing.
    #[serde(default)]
    pub identity: IdentitySettings,

    /// Linked worktree naming.
    #[serde(default)]
    pub worktree: WorktreeSettings,

    /// Git file locations.
    #[serde(default)]
    pub git: GitSettings,
}

impl Settings {
    /// Default location: `<config dir>/canopy/canopy.toml`.
    #[must_use]
    pub fn default_path() -> Option<PathBuf> {
        dirs::config_dir().map(|dir| dir.join("canopy").join("canopy.toml"))
    }

    /// Load settings from a TOML file. A missing file yields defaults.
    ///
    /// # Errors
    /// Returns error if the file can't be read or parsed.
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        if !path.exists() {
            return Ok(Self::default());
        }

        let content = fs::read_to_string(path)?;
        toml::from_str(&content).map_err(|e| Error::SettingsParse {
            file: path.to_path_buf(),
            message: e.message().to_string(),
        })
    }

    /// Save settings to a TOML file, creating parent directories.
    ///
    /// # Errors
    /// Returns error if serialization or write fails.
    pub fn save(&self, path: impl AsRef<Path>) -> Result<()> {
        let path = path.as_ref();
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)?;
        }
        let content =
            toml::to_string_pretty(self).map_err(|e| std::io::Error::other(e.to_string()))?;
        fs::write(path, content)?;
        Ok(())
    }
}

/// Settings for cloning from a local repository.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct CloneSettings {
    /// Directory names skipped when copying a working tree.
    #[serde(default = "default_exclude")]
    pub exclude: Vec<String>,
}

impl Default for CloneSettings {
    fn default() -> Self {
        Self {
            exclude: default_exclude(),
        }
    }
}

fn default_exclude() -> Vec<String> {
    vec!["node_modules".into()]
}

/// Placeholder identity for merges without configured user info.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct IdentitySettings {
    #[serde(default = "default_placeholder_name")]
    pub placeholder_name: String,

    #[serde(default = "default_placeholder_email")]
    pub placeholder_email: String,
}

impl Default for IdentitySettings {
    fn default() -> Self {
        Self {
            placeholder_name: default_placeholder_name(),
            placeholder_email: default_placeholder_email(),
        }
    }
}

fn default_placeholder_name() -> String {
    "Mr. Test".into()
}

fn default_placeholder_email() -> String {
    "mrtest@example.com".into()
}

/// Linked worktree settings.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct WorktreeSettings {
    /// Length of the SHA prefix naming detached worktrees.
    #[serde(default = "default_sha_abbrev")]
    pub sha_abbrev: usize,
}

impl Default for WorktreeSettings {
    fn default() -> Self {
        Self {
            sha_abbrev: default_sha_abbrev(),
        }
    }
}

const fn default_sha_abbrev() -> usize {
    7
}

/// Git file locations.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
pub struct GitSettings {
    /// Override for the global config file (default `~/.gitconfig`).
    #[serde(skip_serializing_if = "Option::is_none")]
    pub global_config: Option<PathBuf>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_default_settings() {
        let settings = Settings::default();
        assert_eq!(settings.clone.exclude, vec!["node_modules".to_string()]);
        assert_eq!(settings.identity.placeholder_name, "Mr. Test");
        assert_eq!(settings.identity.placeholder_email, "mrtest@example.com");
        assert_eq!(settings.worktree.sha_abbrev, 7);
        assert!(settings.git.global_config.is_none());
    }

    #[test]
    fn test_settings_roundtrip() {
        let temp = TempDir::new().unwrap();
        let path = temp.path().join("nested").join("canopy.toml");

        let settings = Settings {
            clone: CloneSettings {
                exclude: vec!["target".into(), "node_modules".into()],
            },
            git: GitSettings {
                global_config: Some(PathBuf::from("/etc/custom.gitconfig")),
            },
            ..Settings::default()
        };

        settings.save(&path).unwrap();
        assert_eq!(Settings::load(&path).unwrap(), settings);
    }

    #[test]
    fn test_partial_file_fills_defaults() {
        let temp = TempDir::new().unwrap();
        let path = temp.path().join("canopy.toml");
        fs::write(&path, "[worktree]\nsha_abbrev = 10\n").unwrap();

        let settings = Settings::load(&path).unwrap();
        assert_eq!(settings.worktree.sha_abbrev, 10);
        assert_eq!(settings.clone.exclude, vec!["node_modules".to_string()]);
    }

    #[test]
    fn test_missing_settings_returns_default() {
        let settings = Settings::load("/nonexistent/path/canopy.toml").unwrap();
        assert_eq!(settings, Settings::default());
    }

    #[test]
    fn test_invalid_settings_reports_file() {
        let temp = TempDir::new().unwrap();
        let path = temp.path().join("canopy.toml");
        fs::write(&path, "[clone\nexclude = 3").unwrap();

        assert!(matches!(
            Settings::load(&path),
            Err(Error::SettingsParse { file, .. }) if file == path
        ));
    }
}
