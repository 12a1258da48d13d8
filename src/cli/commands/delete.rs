//! `fj delete`: remove a branch, rebasing its children onto its parent
//! first so no work is orphaned.

use super::common;
use crate::cli::output;
use crate::errors::{FlapjackError, Result};
use crate::stack::{rebase_branch, ConflictPolicy, StepOutcome};

pub async fn run(branch: String) -> Result<()> {
    let git = common::open_repo()?;
    let mut stacks = common::open_stacks(&git)?;
    let branch = common::resolve_branch(&git, Some(branch))?;
    let original = git.current_branch()?;

    if branch == original {
        return Err(FlapjackError::validation(format!(
            "Cannot delete the current branch '{branch}'; check out another branch first"
        )));
    }

    let parent = stacks.parent_of(&branch);
    let children = stacks.children_of(&branch);

    if !parent.is_empty() && !git.branch_exists(&parent) {
        return Err(FlapjackError::branch(format!(
            "Parent branch '{parent}' of '{branch}' no longer exists"
        )));
    }

    // Move each child's commits onto the grandparent before the metadata
    // changes, so a conflict halts everything with the records intact.
    // The guarded step refuses a worktree whose checked-out branch is not
    // the one being rebased.
    if !parent.is_empty() {
        for child in &children {
            output::info(&format!(
                "Rebasing {} onto {}...",
                output::branch(child),
                output::branch(&parent)
            ));
            match rebase_branch(&git, &stacks, child, &parent, ConflictPolicy::Halt)? {
                StepOutcome::Updated => {}
                StepOutcome::Conflict => {
                    output::warning(
                        "Resolve the conflict, run 'git rebase --continue', then run delete again",
                    );
                    return Err(FlapjackError::conflict(format!(
                        "Could not rebase '{child}' onto '{parent}'"
                    )));
                }
            }
        }
    }

    common::return_to_branch(&git, &original, parent_or(&parent))?;

    // Relinks all children and drops the record in one store write.
    stacks.remove_branch(&branch)?;
    git.delete_local_branch(&branch)?;

    if !children.is_empty() {
        output::info(&format!(
            "Children now stacked on '{}': {}",
            if parent.is_empty() { "(root)" } else { &parent },
            children.join(", ")
        ));
    }
    output::success(&format!("Deleted {}", output::branch(&branch)));
    Ok(())
}

fn parent_or(parent: &str) -> Option<&str> {
    if parent.is_empty() {
        None
    } else {
        Some(parent)
    }
}
