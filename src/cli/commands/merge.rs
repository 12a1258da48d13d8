//! `fj merge`: merge a branch's pull request, splice its children onto the
//! parent, and clean up the local branch.

use super::common;
use crate::cli::{output, prompt};
use crate::errors::{FlapjackError, Result};
use crate::github::{MergeMethod, PlatformHost};
use crate::stack::ConflictPolicy;

pub async fn run(
    branch: Option<String>,
    method: MergeMethod,
    no_delete_branch: bool,
    no_update_children: bool,
) -> Result<()> {
    let git = common::open_repo()?;
    let mut stacks = common::open_stacks(&git)?;
    let settings = common::load_settings_for(&git)?;
    let host = common::github_host(&settings)?;
    let branch = common::resolve_branch(&git, branch)?;
    let trunk = settings.trunk.clone();

    let Some(url) = host.pr_url(&branch).await? else {
        return Err(FlapjackError::remote(format!(
            "No open pull request for '{branch}'"
        )));
    };

    let checks = host.checks_status(&branch).await?;
    if !checks.passed {
        if checks.failed.is_empty() {
            output::warning(&format!("Checks on '{branch}' have not passed yet"));
        } else {
            output::warning(&format!(
                "Failing checks on '{branch}': {}",
                checks.failed.join(", ")
            ));
        }
        if !prompt::confirm("Merge anyway?")? {
            return Err(FlapjackError::cancelled("Merge aborted"));
        }
    }

    if !prompt::confirm(&format!("Merge {url}?"))? {
        return Err(FlapjackError::cancelled("Merge aborted"));
    }

    let bar = output::spinner("Merging pull request...");
    host.merge_pr(&branch, method).await?;
    bar.finish_and_clear();
    output::success(&format!("Merged {}", output::branch(&branch)));

    // Children fall back to the merged branch's parent, or the trunk when
    // it was a stack root.
    let new_parent = match stacks.parent_of(&branch) {
        parent if parent.is_empty() => trunk.clone(),
        parent => parent,
    };
    let children = stacks.children_of(&branch);

    // Bring the merge commit down before rebasing anything onto the trunk.
    git.checkout_branch(&trunk)?;
    git.fetch()?;
    git.pull(&trunk)?;

    stacks.remove_branch(&branch)?;

    if !no_delete_branch {
        git.delete_local_branch(&branch)?;
        // The host usually prunes the head ref on merge; a leftover is
        // worth cleaning, a failure here is not worth stopping for.
        if git.is_pushed_to_remote(&branch).unwrap_or(false) {
            if let Err(e) = git.delete_remote_branch(&branch) {
                tracing::debug!("Could not delete remote branch '{branch}': {e}");
            }
        }
        output::info(&format!("Deleted branch '{branch}'"));
    }

    if no_update_children || children.is_empty() {
        return Ok(());
    }

    // Open PRs of the children still target the merged branch; point them
    // at the new parent so they stay reviewable.
    for child in &children {
        if host.has_open_pr(child).await? {
            match host.update_pr_base(child, &new_parent).await {
                Ok(()) => output::info(&format!(
                    "Retargeted the PR for '{child}' at '{new_parent}'"
                )),
                Err(e) => output::warning(&format!(
                    "Could not retarget the PR for '{child}': {e}"
                )),
            }
        }
    }

    output::info(&format!(
        "Rebasing former children onto {}: {}",
        output::branch(&new_parent),
        children.join(", ")
    ));
    let report =
        common::propagate_rebases(&git, &stacks, &new_parent, ConflictPolicy::AbortAndContinue)?;
    common::push_updated_branches(&git, &report.updated());
    common::return_to_branch(&git, &trunk, None)?;
    common::report_propagation(&report)
}
