//! Bottom-up stacked pull-request orchestration.
//!
//! PRs are created oldest-first: each PR's base branch must already exist
//! on the remote before a child PR can target it. When a branch on the path
//! cannot be submitted (push declined or failed, creation declined, host
//! error), everything further up the path is blocked without being
//! attempted, the same cascading-skip shape as update propagation.

use crate::errors::Result;
use crate::github::{CreatePullRequest, PlatformHost};
use crate::stack::graph::Stacks;

/// Why a branch on the submit path was not submitted.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SkipReason {
    /// The branch is not on the remote and the push was declined or failed.
    NotPushed,
    /// The user declined PR creation for this branch.
    Declined,
    /// A branch below this one on the path was skipped or failed.
    BlockedByParent,
}

/// Terminal state of one branch on the submit path.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SubmitStatus {
    Created { url: String },
    AlreadyExists { url: Option<String> },
    Skipped(SkipReason),
    Failed { error: String },
}

/// Per-branch outcomes of one submit pass, in bottom-up path order.
#[derive(Debug, Default)]
pub struct SubmitReport {
    results: Vec<(String, SubmitStatus)>,
}

impl SubmitReport {
    fn record(&mut self, branch: &str, status: SubmitStatus) {
        self.results.push((branch.to_string(), status));
    }

    pub fn status_of(&self, branch: &str) -> Option<&SubmitStatus> {
        self.results
            .iter()
            .find(|(b, _)| b == branch)
            .map(|(_, s)| s)
    }

    pub fn created(&self) -> Vec<String> {
        self.results
            .iter()
            .filter(|(_, s)| matches!(s, SubmitStatus::Created { .. }))
            .map(|(b, _)| b.clone())
            .collect()
    }

    pub fn skipped(&self) -> Vec<String> {
        self.results
            .iter()
            .filter(|(_, s)| matches!(s, SubmitStatus::Skipped(_) | SubmitStatus::Failed { .. }))
            .map(|(b, _)| b.clone())
            .collect()
    }

    pub fn iter(&self) -> impl Iterator<Item = &(String, SubmitStatus)> {
        self.results.iter()
    }

    pub fn is_empty(&self) -> bool {
        self.results.is_empty()
    }
}

/// Caller's answer to "this branch isn't on the remote yet".
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PushDecision {
    /// The branch is on the remote (already was, or was just pushed).
    Pushed,
    /// The user declined the push.
    Declined,
    /// The push was attempted and failed.
    Failed,
}

/// PR content supplied per branch (normally from interactive prompts).
#[derive(Debug, Clone, Default)]
pub struct PrDetails {
    pub title: String,
    pub body: String,
    pub reviewers: Vec<String>,
    pub draft: bool,
}

/// Walk parent pointers upward from `branch` and return the deepest branch
/// that still needs a PR: the walk stops when the parent is empty, the
/// trunk, untracked, or already has an open pull request.
pub async fn find_oldest_unsubmitted(
    stacks: &Stacks,
    host: &dyn PlatformHost,
    branch: &str,
    trunk: &str,
) -> Result<String> {
    let mut current = branch.to_string();
    loop {
        let parent = stacks.parent_of(&current);
        if parent.is_empty() || parent == trunk || !stacks.contains(&parent) {
            return Ok(current);
        }
        if host.has_open_pr(&parent).await? {
            // Parent is already submitted, so this is the bottom-most branch
            // still missing a PR.
            return Ok(current);
        }
        current = parent;
    }
}

/// Bottom-up path `[from, ..., to]` following parent pointers from `to`.
/// Empty when `from` is not an ancestor of (or equal to) `to`.
pub fn branch_path(stacks: &Stacks, from: &str, to: &str) -> Vec<String> {
    let mut path = Vec::new();
    let mut current = to.to_string();
    loop {
        path.push(current.clone());
        if current == from {
            path.reverse();
            return path;
        }
        let parent = stacks.parent_of(&current);
        if parent.is_empty() {
            // Never reached `from`: the branches are not on one chain.
            return Vec::new();
        }
        current = parent;
    }
}

/// Drive PR creation along `path` (bottom-up order, oldest first).
///
/// Per branch: the trunk is never submitted; `ensure_pushed` resolves
/// remote presence (prompt-or-push, or a fake in tests); an existing PR is
/// reported, never recreated; otherwise `details` supplies title/body
/// (`None` meaning the user declined) and the PR is created against the
/// tracked parent, falling back to the trunk for rootless branches.
///
/// Zero host or push calls are made for branches blocked by an earlier
/// skip.
pub async fn submit_stack<P, D>(
    stacks: &Stacks,
    host: &dyn PlatformHost,
    path: &[String],
    trunk: &str,
    mut ensure_pushed: P,
    mut details: D,
) -> Result<SubmitReport>
where
    P: FnMut(&str) -> Result<PushDecision>,
    D: FnMut(&str, &str) -> Result<Option<PrDetails>>,
{
    let mut report = SubmitReport::default();
    let mut blocked = false;

    for branch in path {
        if branch == trunk {
            continue;
        }
        if blocked {
            report.record(branch, SubmitStatus::Skipped(SkipReason::BlockedByParent));
            continue;
        }

        match ensure_pushed(branch)? {
            PushDecision::Pushed => {}
            PushDecision::Declined | PushDecision::Failed => {
                tracing::warn!("Branch '{branch}' is not pushed; blocking the rest of the stack");
                report.record(branch, SubmitStatus::Skipped(SkipReason::NotPushed));
                blocked = true;
                continue;
            }
        }

        if host.has_open_pr(branch).await? {
            let url = host.pr_url(branch).await?;
            report.record(branch, SubmitStatus::AlreadyExists { url });
            continue;
        }

        let base = match stacks.parent_of(branch) {
            parent if parent.is_empty() => trunk.to_string(),
            parent => parent,
        };

        let Some(pr) = details(branch, &base)? else {
            report.record(branch, SubmitStatus::Skipped(SkipReason::Declined));
            blocked = true;
            continue;
        };

        let request = CreatePullRequest {
            title: pr.title,
            body: pr.body,
            head: branch.clone(),
            base,
            reviewers: pr.reviewers,
            draft: pr.draft,
        };
        match host.create_pr(&request).await {
            Ok(created) => {
                tracing::info!("Created PR #{} for '{branch}'", created.number);
                report.record(branch, SubmitStatus::Created { url: created.url });
            }
            Err(e) => {
                // Host failures never corrupt local stack state; record and
                // block the rest of the chain.
                report.record(
                    branch,
                    SubmitStatus::Failed {
                        error: e.to_string(),
                    },
                );
                blocked = true;
            }
        }
    }

    Ok(report)
}
