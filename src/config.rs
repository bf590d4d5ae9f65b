//! Runtime configuration and repository identifiers.
//!
//! Settings that belong to the environment (credentials, API endpoint, log
//! format) are loaded with `envy`, optionally seeded from a `.env` file.
//! Per-run choices (repository, output path, filters) come from the CLI.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use thiserror::Error;

pub const DEFAULT_API_URL: &str = "https://api.github.com";

/// A unique identifier for a GitHub repository.
#[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct RepoId {
    /// The owner of the repository (e.g., "facebook").
    pub owner: String,
    /// The name of the repository (e.g., "react").
    pub repo: String,
}

impl RepoId {
    pub fn new(owner: impl Into<String>, repo: impl Into<String>) -> Self {
        Self {
            owner: owner.into(),
            repo: repo.into(),
        }
    }

    /// Browser URL of the repository on github.com.
    pub fn html_url(&self) -> String {
        format!("https://github.com/{}/{}", self.owner, self.repo)
    }
}

impl fmt::Display for RepoId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}", self.owner, self.repo)
    }
}

#[derive(Debug, Error, PartialEq, Eq)]
#[error("invalid repository '{0}', expected owner/name")]
pub struct RepoIdError(pub String);

impl FromStr for RepoId {
    type Err = RepoIdError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let parts: Vec<&str> = s.trim().split('/').collect();
        match parts.as_slice() {
            [owner, repo] if !owner.trim().is_empty() && !repo.trim().is_empty() => {
                Ok(RepoId::new(owner.trim(), repo.trim()))
            }
            _ => Err(RepoIdError(s.to_string())),
        }
    }
}

/// Output style of the log stream.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LogFormat {
    #[default]
    Pretty,
    Json,
}

/// Application configuration loaded from environment variables.
#[derive(Clone, Debug, Deserialize)]
pub struct AppConfig {
    /// GitHub personal access token, sent as a bearer token.
    pub github_token: Option<String>,

    /// Base URL of the REST API. Defaults to the public github.com API.
    #[serde(default = "default_api_url")]
    pub github_api_url: String,

    #[serde(default)]
    pub log_format: LogFormat,
}

fn default_api_url() -> String {
    DEFAULT_API_URL.to_string()
}

impl AppConfig {
    pub fn from_env() -> Result<Self, envy::Error> {
        envy::from_env()
    }

    /// Returns the API base without a trailing slash.
    pub fn api_base(&self) -> &str {
        self.github_api_url.trim_end_matches('/')
    }
}
