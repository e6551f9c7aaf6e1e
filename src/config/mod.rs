//! config
//!
//! Configuration loading and validation.
//!
//! # Overview
//!
//! Locsync is configured by a single TOML file naming the projects it
//! serves plus the process-level GitHub settings. Missing required settings
//! are a load-time fatal error, not a runtime error: a `Settings` value
//! that loaded successfully is complete.
//!
//! # Locations
//!
//! The file path is supplied by the embedding process. `Settings::load`
//! reads and validates it; `Settings::from_file` parses an already-read
//! schema (used by tests and embedders that assemble configuration
//! themselves).
//!
//! # Secrets
//!
//! The GitHub token is resolved from `LOCSYNC_GITHUB_TOKEN` first, then
//! from the `[github]` table. A missing token is fatal at load time.

pub mod schema;

pub use schema::{GithubConfig, ProjectConfig, SettingsFile};

use std::fs;
use std::path::{Path, PathBuf};

use thiserror::Error;

/// Environment variable consulted for the GitHub API token.
pub const TOKEN_ENV_VAR: &str = "LOCSYNC_GITHUB_TOKEN";

/// Errors from configuration operations.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read config file '{}': {source}", path.display())]
    ReadError {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("failed to parse config file '{}': {message}", path.display())]
    ParseError { path: PathBuf, message: String },

    #[error("missing required setting: {0}")]
    MissingValue(String),

    #[error("invalid config value: {0}")]
    InvalidValue(String),

    #[error("unknown project: {0}")]
    UnknownProject(String),
}

/// Validated process configuration.
///
/// Construction validates every project and resolves the process-level
/// GitHub surface, so accessors return complete values without `Option`.
#[derive(Debug, Clone)]
pub struct Settings {
    github_token: String,
    github_owner: String,
    github_repo: String,
    api_base: Option<String>,
    file: SettingsFile,
}

impl Settings {
    /// Load and validate settings from a TOML file.
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let contents = fs::read_to_string(path).map_err(|source| ConfigError::ReadError {
            path: path.to_path_buf(),
            source,
        })?;
        let file: SettingsFile =
            toml::from_str(&contents).map_err(|e| ConfigError::ParseError {
                path: path.to_path_buf(),
                message: e.to_string(),
            })?;
        Self::from_file(file)
    }

    /// Validate an already-parsed settings file.
    pub fn from_file(file: SettingsFile) -> Result<Self, ConfigError> {
        for (id, project) in &file.projects {
            project.validate(id)?;
        }

        let github_token = std::env::var(TOKEN_ENV_VAR)
            .ok()
            .filter(|t| !t.is_empty())
            .or_else(|| file.github.token.clone())
            .ok_or_else(|| {
                ConfigError::MissingValue(format!("github.token (or {})", TOKEN_ENV_VAR))
            })?;
        let github_owner = file
            .github
            .owner
            .clone()
            .ok_or_else(|| ConfigError::MissingValue("github.owner".to_string()))?;
        let github_repo = file
            .github
            .repo
            .clone()
            .ok_or_else(|| ConfigError::MissingValue("github.repo".to_string()))?;

        Ok(Self {
            github_token,
            github_owner,
            github_repo,
            api_base: file.github.api_base.clone(),
            file,
        })
    }

    /// Look up a project by its logical id.
    pub fn project(&self, id: &str) -> Result<&ProjectConfig, ConfigError> {
        self.file
            .projects
            .get(id)
            .ok_or_else(|| ConfigError::UnknownProject(id.to_string()))
    }

    /// All configured projects, keyed by id.
    pub fn projects(&self) -> impl Iterator<Item = (&str, &ProjectConfig)> {
        self.file.projects.iter().map(|(k, v)| (k.as_str(), v))
    }

    /// GitHub API token.
    pub fn github_token(&self) -> &str {
        &self.github_token
    }

    /// Owner of the repository pull requests target.
    pub fn github_owner(&self) -> &str {
        &self.github_owner
    }

    /// Name of the repository pull requests target.
    pub fn github_repo(&self) -> &str {
        &self.github_repo
    }

    /// API base URL override, if configured.
    pub fn api_base(&self) -> Option<&str> {
        self.api_base.as_deref()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::BTreeMap;

    fn file_with_token() -> SettingsFile {
        let mut projects = BTreeMap::new();
        projects.insert(
            "webapp".to_string(),
            ProjectConfig {
                repo_path: PathBuf::from("/tmp/locsync/webapp"),
                clone_url: "git@github.com:acme/webapp.git".to_string(),
                base_branch: "main".to_string(),
                translations_path: PathBuf::from("/tmp/locsync/webapp/locale"),
            },
        );
        SettingsFile {
            github: GithubConfig {
                token: Some("ghp_test".to_string()),
                owner: Some("acme".to_string()),
                repo: Some("webapp".to_string()),
                api_base: None,
            },
            projects,
        }
    }

    #[test]
    fn complete_settings_load() {
        let settings = Settings::from_file(file_with_token()).unwrap();
        assert_eq!(settings.github_owner(), "acme");
        assert_eq!(settings.github_repo(), "webapp");
        assert_eq!(settings.project("webapp").unwrap().base_branch, "main");
    }

    #[test]
    fn missing_owner_is_fatal() {
        let mut file = file_with_token();
        file.github.owner = None;
        let err = Settings::from_file(file).unwrap_err();
        assert!(matches!(err, ConfigError::MissingValue(_)));
        assert!(err.to_string().contains("github.owner"));
    }

    #[test]
    fn missing_token_is_fatal() {
        let mut file = file_with_token();
        file.github.token = None;
        // Only meaningful when the env var is not set in the test environment.
        if std::env::var(TOKEN_ENV_VAR).is_err() {
            let err = Settings::from_file(file).unwrap_err();
            assert!(matches!(err, ConfigError::MissingValue(_)));
        }
    }

    #[test]
    fn unknown_project_is_an_error() {
        let settings = Settings::from_file(file_with_token()).unwrap();
        let err = settings.project("nope").unwrap_err();
        assert!(matches!(err, ConfigError::UnknownProject(_)));
    }

    #[test]
    fn invalid_project_rejected_at_load() {
        let mut file = file_with_token();
        file.projects.get_mut("webapp").unwrap().clone_url = String::new();
        let err = Settings::from_file(file).unwrap_err();
        assert!(matches!(err, ConfigError::InvalidValue(_)));
    }
}
