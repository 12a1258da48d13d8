//! Code-review host integration.
//!
//! [`PlatformHost`] is the seam between the stack workflows and the review
//! host: the orchestrator and commands only talk to the trait, so tests run
//! against an in-process fake and the GitHub client stays a thin wrapper.

pub mod client;

pub use client::GitHubClient;

use crate::errors::Result;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};

/// How a pull request gets merged.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MergeMethod {
    Merge,
    Squash,
    Rebase,
}

impl std::str::FromStr for MergeMethod {
    type Err = crate::errors::FlapjackError;

    fn from_str(s: &str) -> Result<Self> {
        match s {
            "merge" => Ok(MergeMethod::Merge),
            "squash" => Ok(MergeMethod::Squash),
            "rebase" => Ok(MergeMethod::Rebase),
            other => Err(crate::errors::FlapjackError::validation(format!(
                "Unknown merge method '{other}' (expected merge, squash, or rebase)"
            ))),
        }
    }
}

/// Request payload for opening a pull request.
#[derive(Debug, Clone, Default)]
pub struct CreatePullRequest {
    pub title: String,
    pub body: String,
    pub head: String,
    pub base: String,
    pub reviewers: Vec<String>,
    pub draft: bool,
}

/// The slice of a pull request the workflows care about.
#[derive(Debug, Clone)]
pub struct PullRequest {
    pub number: u64,
    pub url: String,
    pub head: String,
    pub base: String,
    pub title: String,
}

/// Aggregate CI status for a branch's head commit.
#[derive(Debug, Clone, Default)]
pub struct ChecksStatus {
    pub passed: bool,
    pub failed: Vec<String>,
}

/// Review-host operations consumed by the stack workflows.
#[async_trait]
pub trait PlatformHost: Send + Sync {
    /// Whether `branch` has an open pull request.
    async fn has_open_pr(&self, branch: &str) -> Result<bool>;

    /// URL of the open pull request for `branch`, if any.
    async fn pr_url(&self, branch: &str) -> Result<Option<String>>;

    /// Open a pull request.
    async fn create_pr(&self, request: &CreatePullRequest) -> Result<PullRequest>;

    /// Re-target the open pull request for `branch` at `new_base`.
    async fn update_pr_base(&self, branch: &str, new_base: &str) -> Result<()>;

    /// Merge the open pull request for `branch`.
    async fn merge_pr(&self, branch: &str, method: MergeMethod) -> Result<()>;

    /// CI check status for `branch`'s head commit.
    async fn checks_status(&self, branch: &str) -> Result<ChecksStatus>;
}
