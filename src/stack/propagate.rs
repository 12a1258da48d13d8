//! Conflict-aware propagation of a change through a branch's descendants.
//!
//! Given the topologically ordered subtree below a branch whose tip moved,
//! apply a per-branch operation (normally "rebase onto the new parent tip")
//! to every descendant, tracking success and conflict per branch. Once a
//! branch fails, its entire subtree is skipped without attempting further
//! work (the cascading-skip rule).

use crate::errors::Result;
use crate::git::{GitRepository, RebaseOutcome};
use crate::stack::graph::Stacks;
use std::collections::HashSet;

/// What happens after a conflict.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConflictPolicy {
    /// Abort the failed rebase and keep going with sibling subtrees.
    AbortAndContinue,
    /// Stop the whole propagation, leaving the conflicted rebase in place
    /// for the user to resolve by hand.
    Halt,
}

/// Result of one per-branch operation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StepOutcome {
    Updated,
    Conflict,
}

/// Terminal state of a branch after a propagation pass.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BranchStatus {
    Updated,
    Conflict,
    /// Never attempted: an ancestor conflicted, or propagation halted.
    Skipped,
}

/// Per-branch outcomes of one propagation pass, in traversal order.
#[derive(Debug, Default)]
pub struct PropagationReport {
    statuses: Vec<(String, BranchStatus)>,
}

impl PropagationReport {
    fn record(&mut self, branch: &str, status: BranchStatus) {
        self.statuses.push((branch.to_string(), status));
    }

    /// Branches successfully processed, in traversal order.
    pub fn updated(&self) -> Vec<String> {
        self.statuses
            .iter()
            .filter(|(_, s)| *s == BranchStatus::Updated)
            .map(|(b, _)| b.clone())
            .collect()
    }

    /// Branches that conflicted or were skipped, in traversal order.
    pub fn conflicted(&self) -> Vec<String> {
        self.statuses
            .iter()
            .filter(|(_, s)| *s != BranchStatus::Updated)
            .map(|(b, _)| b.clone())
            .collect()
    }

    pub fn status_of(&self, branch: &str) -> Option<BranchStatus> {
        self.statuses
            .iter()
            .find(|(b, _)| b == branch)
            .map(|(_, s)| *s)
    }

    pub fn is_clean(&self) -> bool {
        self.statuses
            .iter()
            .all(|(_, s)| *s == BranchStatus::Updated)
    }

    pub fn iter(&self) -> impl Iterator<Item = &(String, BranchStatus)> {
        self.statuses.iter()
    }
}

/// Run `op` over `order`: `(branch, parent)` pairs in parent-before-child
/// order, as produced by [`Stacks::descendants_with_parents`].
///
/// The `failed` set accumulates every branch that ended in CONFLICT or
/// SKIPPED; a branch whose parent is in the set is skipped outright, so a
/// subtree's failure propagates in one pass without re-walking ancestors.
/// Conflicts are never retried: the report tells the caller exactly which
/// branches succeeded, conflicted, and were skipped.
pub fn propagate<F>(
    order: &[(String, String)],
    policy: ConflictPolicy,
    mut op: F,
) -> Result<PropagationReport>
where
    F: FnMut(&str, &str) -> Result<StepOutcome>,
{
    let mut report = PropagationReport::default();
    let mut failed: HashSet<String> = HashSet::new();

    let mut halted_at = None;
    for (i, (branch, parent)) in order.iter().enumerate() {
        if failed.contains(parent) {
            tracing::debug!("Skipping '{branch}': parent '{parent}' failed earlier");
            report.record(branch, BranchStatus::Skipped);
            failed.insert(branch.clone());
            continue;
        }

        match op(branch, parent)? {
            StepOutcome::Updated => report.record(branch, BranchStatus::Updated),
            StepOutcome::Conflict => {
                report.record(branch, BranchStatus::Conflict);
                failed.insert(branch.clone());
                if policy == ConflictPolicy::Halt {
                    halted_at = Some(i);
                    break;
                }
            }
        }
    }

    // A halt leaves the rest of the traversal unattempted; report it all as
    // skipped so the summary still covers every branch.
    if let Some(i) = halted_at {
        for (branch, _) in &order[i + 1..] {
            report.record(branch, BranchStatus::Skipped);
        }
    }

    Ok(report)
}

/// The standard per-branch operation: check the branch out and rebase it
/// onto its parent's new tip.
///
/// A branch with a recorded worktree is rebased in place in that worktree.
/// Before touching it, the worktree's checked-out branch is verified to
/// match; any mismatch fails closed and counts as a failure for that branch.
pub fn rebase_step<'a>(
    git: &'a GitRepository,
    stacks: &'a Stacks,
    policy: ConflictPolicy,
) -> impl FnMut(&str, &str) -> Result<StepOutcome> + 'a {
    move |branch, parent| rebase_branch(git, stacks, branch, parent, policy)
}

/// Rebase one branch onto `parent`, in its recorded worktree when it has
/// one. Every caller that rebases a tracked branch goes through here, so
/// the worktree guard cannot be bypassed.
pub fn rebase_branch(
    git: &GitRepository,
    stacks: &Stacks,
    branch: &str,
    parent: &str,
    policy: ConflictPolicy,
) -> Result<StepOutcome> {
    let worktree = stacks.worktree_of(branch);

    let rebase_dir = match &worktree {
        Some(path) => {
            match git.worktree_head(path) {
                Ok(head) if head == branch => {}
                Ok(head) => {
                    tracing::warn!(
                        "Worktree {} has '{head}' checked out, expected '{branch}'; not touching it",
                        path.display()
                    );
                    return Ok(StepOutcome::Conflict);
                }
                Err(e) => {
                    tracing::warn!(
                        "Cannot inspect worktree {}: {e}; not touching it",
                        path.display()
                    );
                    return Ok(StepOutcome::Conflict);
                }
            }
            Some(path.as_path())
        }
        None => {
            if git.checkout_branch(branch).is_err() {
                tracing::warn!("Failed to checkout '{branch}' for rebase");
                return Ok(StepOutcome::Conflict);
            }
            None
        }
    };

    match git.rebase_onto(parent, rebase_dir)? {
        RebaseOutcome::Clean => Ok(StepOutcome::Updated),
        RebaseOutcome::Conflict => {
            if policy == ConflictPolicy::AbortAndContinue {
                git.abort_rebase(rebase_dir)?;
            }
            Ok(StepOutcome::Conflict)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn chain(pairs: &[(&str, &str)]) -> Vec<(String, String)> {
        pairs
            .iter()
            .map(|(b, p)| (b.to_string(), p.to_string()))
            .collect()
    }

    #[test]
    fn test_all_clean() {
        let order = chain(&[("a", "main"), ("b", "a"), ("c", "b")]);
        let report = propagate(&order, ConflictPolicy::AbortAndContinue, |_, _| {
            Ok(StepOutcome::Updated)
        })
        .unwrap();

        assert_eq!(report.updated(), vec!["a", "b", "c"]);
        assert!(report.conflicted().is_empty());
        assert!(report.is_clean());
    }

    #[test]
    fn test_cascading_skip_never_attempts_subtree() {
        // Chain a -> b -> c with a forced conflict at b: c must be skipped
        // without the operation ever running on it.
        let order = chain(&[("a", "main"), ("b", "a"), ("c", "b")]);
        let mut attempted = Vec::new();
        let report = propagate(&order, ConflictPolicy::AbortAndContinue, |branch, _| {
            attempted.push(branch.to_string());
            Ok(if branch == "b" {
                StepOutcome::Conflict
            } else {
                StepOutcome::Updated
            })
        })
        .unwrap();

        assert_eq!(attempted, vec!["a", "b"]);
        assert_eq!(report.updated(), vec!["a"]);
        assert_eq!(report.conflicted(), vec!["b", "c"]);
        assert_eq!(report.status_of("b"), Some(BranchStatus::Conflict));
        assert_eq!(report.status_of("c"), Some(BranchStatus::Skipped));
    }

    #[test]
    fn test_conflict_continues_past_siblings() {
        // x conflicts; its child is skipped but the sibling subtree still runs.
        let order = chain(&[("x", "main"), ("x-child", "x"), ("y", "main"), ("y-child", "y")]);
        let report = propagate(&order, ConflictPolicy::AbortAndContinue, |branch, _| {
            Ok(if branch == "x" {
                StepOutcome::Conflict
            } else {
                StepOutcome::Updated
            })
        })
        .unwrap();

        assert_eq!(report.updated(), vec!["y", "y-child"]);
        assert_eq!(report.conflicted(), vec!["x", "x-child"]);
    }

    #[test]
    fn test_halt_policy_stops_everything() {
        let order = chain(&[("x", "main"), ("y", "main"), ("y-child", "y")]);
        let mut attempted = Vec::new();
        let report = propagate(&order, ConflictPolicy::Halt, |branch, _| {
            attempted.push(branch.to_string());
            Ok(if branch == "x" {
                StepOutcome::Conflict
            } else {
                StepOutcome::Updated
            })
        })
        .unwrap();

        // Siblings after the halt are never attempted but still reported.
        assert_eq!(attempted, vec!["x"]);
        assert_eq!(report.updated(), Vec::<String>::new());
        assert_eq!(report.conflicted(), vec!["x", "y", "y-child"]);
        assert_eq!(report.status_of("x"), Some(BranchStatus::Conflict));
        assert_eq!(report.status_of("y"), Some(BranchStatus::Skipped));
    }

    #[test]
    fn test_deep_skip_cascade() {
        let order = chain(&[("a", "main"), ("b", "a"), ("c", "b"), ("d", "c")]);
        let report = propagate(&order, ConflictPolicy::AbortAndContinue, |branch, _| {
            Ok(if branch == "a" {
                StepOutcome::Conflict
            } else {
                StepOutcome::Updated
            })
        })
        .unwrap();

        assert_eq!(report.conflicted(), vec!["a", "b", "c", "d"]);
        assert_eq!(report.status_of("d"), Some(BranchStatus::Skipped));
    }

    #[test]
    fn test_operation_error_propagates() {
        let order = chain(&[("a", "main")]);
        let result = propagate(&order, ConflictPolicy::Halt, |_, _| {
            Err(crate::errors::FlapjackError::branch("boom"))
        });
        assert!(result.is_err());
    }
}
