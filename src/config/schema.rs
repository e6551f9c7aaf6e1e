//! config::schema
//!
//! Configuration schema types.
//!
//! # Project Config
//!
//! One `[projects.<id>]` table per translation repository served by this
//! process. Every field is required; a project with a missing field fails
//! validation at load time rather than at first use.
//!
//! # Process Config
//!
//! The `[github]` table carries the hosting-API surface: API token, target
//! owner, and target repository. The token may also be supplied via the
//! `LOCSYNC_GITHUB_TOKEN` environment variable, which takes precedence over
//! the file so tokens can stay out of checked-in configuration.

use std::collections::BTreeMap;
use std::path::PathBuf;

use serde::{Deserialize, Serialize};

use super::ConfigError;

/// Per-project configuration: one translation repository.
///
/// # Example
///
/// ```toml
/// [projects.webapp]
/// repo_path = "/var/lib/locsync/webapp"
/// clone_url = "git@github.com:acme/webapp.git"
/// base_branch = "main"
/// translations_path = "/var/lib/locsync/webapp/src/locale"
/// ```
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(deny_unknown_fields)]
pub struct ProjectConfig {
    /// Local working-tree directory for this repository. Unique per project;
    /// the registry keys its cache on this path.
    pub repo_path: PathBuf,

    /// URL the repository is cloned from when `repo_path` does not exist.
    pub clone_url: String,

    /// The stable branch workflows read from and propose changes against.
    pub base_branch: String,

    /// Absolute directory the per-language files are written into.
    pub translations_path: PathBuf,
}

impl ProjectConfig {
    /// Validate the configuration values.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError::InvalidValue` if any value is empty or the
    /// translations directory is not absolute.
    pub fn validate(&self, id: &str) -> Result<(), ConfigError> {
        if self.repo_path.as_os_str().is_empty() {
            return Err(ConfigError::InvalidValue(format!(
                "project '{}': repo_path must not be empty",
                id
            )));
        }
        if self.clone_url.is_empty() {
            return Err(ConfigError::InvalidValue(format!(
                "project '{}': clone_url must not be empty",
                id
            )));
        }
        if self.base_branch.is_empty() {
            return Err(ConfigError::InvalidValue(format!(
                "project '{}': base_branch must not be empty",
                id
            )));
        }
        if !self.translations_path.is_absolute() {
            return Err(ConfigError::InvalidValue(format!(
                "project '{}': translations_path must be absolute, got '{}'",
                id,
                self.translations_path.display()
            )));
        }
        Ok(())
    }
}

/// Process-level hosting-API configuration.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
#[serde(default, deny_unknown_fields)]
pub struct GithubConfig {
    /// API token. Optional in the file; may come from the environment.
    pub token: Option<String>,

    /// Repository owner (user or organization) pull requests target.
    pub owner: Option<String>,

    /// Repository name pull requests target.
    pub repo: Option<String>,

    /// API base URL override (GitHub Enterprise).
    pub api_base: Option<String>,
}

/// Top-level configuration file schema.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
#[serde(default, deny_unknown_fields)]
pub struct SettingsFile {
    /// Hosting-API settings.
    pub github: GithubConfig,

    /// Projects keyed by logical project id.
    pub projects: BTreeMap<String, ProjectConfig>,
}
