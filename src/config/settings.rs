//! Persisted settings: GitHub coordinates, trunk branch, default reviewers.

use crate::errors::Result;
use serde::{Deserialize, Serialize};
use std::path::Path;

/// GitHub repository coordinates and credentials.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GitHubConfig {
    #[serde(default = "default_api_url")]
    pub api_url: String,
    #[serde(default)]
    pub owner: String,
    #[serde(default)]
    pub repo: String,
    /// Personal access token; falls back to `GITHUB_TOKEN` when unset.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub token: Option<String>,
}

fn default_api_url() -> String {
    "https://api.github.com".to_string()
}

impl Default for GitHubConfig {
    fn default() -> Self {
        Self {
            api_url: default_api_url(),
            owner: String::new(),
            repo: String::new(),
            token: None,
        }
    }
}

impl GitHubConfig {
    pub fn resolved_token(&self) -> Option<String> {
        self.token
            .clone()
            .or_else(|| std::env::var("GITHUB_TOKEN").ok())
    }

    /// Fill empty owner/repo from the `origin` remote URL.
    pub fn fill_from_remote_url(&mut self, remote_url: &str) {
        if !self.owner.is_empty() && !self.repo.is_empty() {
            return;
        }
        if let Some((owner, repo)) = parse_remote_url(remote_url) {
            if self.owner.is_empty() {
                self.owner = owner;
            }
            if self.repo.is_empty() {
                self.repo = repo;
            }
        }
    }
}

/// Tool-wide settings, persisted as one JSON file.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Settings {
    #[serde(default)]
    pub github: GitHubConfig,
    /// Conventional root branch PRs ultimately target.
    #[serde(default = "default_trunk")]
    pub trunk: String,
    #[serde(default)]
    pub default_reviewers: Vec<String>,
}

fn default_trunk() -> String {
    "main".to_string()
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            github: GitHubConfig::default(),
            trunk: default_trunk(),
            default_reviewers: Vec::new(),
        }
    }
}

impl Settings {
    /// Load settings, defaulting when the file is missing or unreadable.
    pub fn load(path: &Path) -> Self {
        let Ok(contents) = std::fs::read_to_string(path) else {
            return Self::default();
        };
        match serde_json::from_str(&contents) {
            Ok(settings) => settings,
            Err(e) => {
                tracing::warn!(
                    "Settings file {} is unreadable ({e}); using defaults",
                    path.display()
                );
                Self::default()
            }
        }
    }

    pub fn save(&self, path: &Path) -> Result<()> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        std::fs::write(path, serde_json::to_string_pretty(self)?)?;
        Ok(())
    }
}

/// Extract `(owner, repo)` from an https or scp-style git remote URL.
pub fn parse_remote_url(remote_url: &str) -> Option<(String, String)> {
    let path = if let Ok(parsed) = url::Url::parse(remote_url) {
        parsed.path().to_string()
    } else if let Some((_, path)) = remote_url.split_once(':') {
        // scp-style: git@github.com:owner/repo.git
        path.to_string()
    } else {
        return None;
    };

    let mut segments = path.trim_matches('/').splitn(2, '/');
    let owner = segments.next()?.to_string();
    let repo = segments
        .next()?
        .trim_end_matches('/')
        .trim_end_matches(".git")
        .to_string();
    if owner.is_empty() || repo.is_empty() {
        return None;
    }
    Some((owner, repo))
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_parse_https_remote() {
        assert_eq!(
            parse_remote_url("https://github.com/octo/stack.git"),
            Some(("octo".to_string(), "stack".to_string()))
        );
        assert_eq!(
            parse_remote_url("https://github.com/octo/stack"),
            Some(("octo".to_string(), "stack".to_string()))
        );
    }

    #[test]
    fn test_parse_scp_remote() {
        assert_eq!(
            parse_remote_url("git@github.com:octo/stack.git"),
            Some(("octo".to_string(), "stack".to_string()))
        );
    }

    #[test]
    fn test_parse_invalid_remote() {
        assert_eq!(parse_remote_url("not-a-remote"), None);
        assert_eq!(parse_remote_url("git@github.com:only-owner"), None);
    }

    #[test]
    fn test_settings_round_trip_and_defaults() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("config.json");

        // Missing file loads defaults
        let settings = Settings::load(&path);
        assert_eq!(settings.trunk, "main");

        let mut settings = Settings::default();
        settings.trunk = "develop".to_string();
        settings.github.owner = "octo".to_string();
        settings.save(&path).unwrap();

        let reloaded = Settings::load(&path);
        assert_eq!(reloaded.trunk, "develop");
        assert_eq!(reloaded.github.owner, "octo");
        assert_eq!(reloaded.github.api_url, "https://api.github.com");
    }

    #[test]
    fn test_fill_from_remote_does_not_clobber() {
        let mut config = GitHubConfig {
            owner: "configured".to_string(),
            ..GitHubConfig::default()
        };
        config.fill_from_remote_url("git@github.com:octo/stack.git");
        assert_eq!(config.owner, "configured");
        assert_eq!(config.repo, "stack");
    }
}
