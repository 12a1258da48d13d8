//! `fj sync`: pull the trunk and rebase every tracked stack onto it.
//!
//! Conflicting branches are rolled back (`git rebase --abort`) and skipped
//! along with their descendants; unrelated stacks keep syncing.

use super::common;
use crate::cli::{output, prompt};
use crate::errors::{FlapjackError, Result};
use crate::stack::ConflictPolicy;

pub async fn run(trunk: Option<String>, no_push: bool) -> Result<()> {
    let git = common::open_repo()?;
    let mut stacks = common::open_stacks(&git)?;
    let settings = common::load_settings()?;
    let trunk = trunk.unwrap_or(settings.trunk);
    let original = git.current_branch()?;

    if !git.branch_exists(&trunk) {
        return Err(FlapjackError::branch(format!(
            "Trunk branch '{trunk}' does not exist"
        )));
    }

    let bar = output::spinner(&format!("Fetching and pulling '{trunk}'..."));
    git.fetch()?;
    git.checkout_branch(&trunk)?;
    if let Err(e) = git.pull(&trunk) {
        bar.finish_and_clear();
        common::return_to_branch(&git, &original, Some(&trunk))?;
        return Err(e);
    }
    bar.finish_and_clear();
    output::success(&format!("{} is up to date", output::branch(&trunk)));

    let deleted = delete_merged_children(&git, &mut stacks, &trunk)?;

    let report = common::propagate_rebases(&git, &stacks, &trunk, ConflictPolicy::AbortAndContinue)?;

    if !no_push {
        common::push_updated_branches(&git, &report.updated());
    }

    if deleted.contains(&original) {
        common::return_to_branch(&git, &trunk, None)?;
    } else {
        common::return_to_branch(&git, &original, Some(&trunk))?;
    }

    common::report_propagation(&report)
}

/// Offer to delete direct children of the trunk whose commits have all
/// landed on it. Their own children are relinked to the trunk.
fn delete_merged_children(
    git: &crate::git::GitRepository,
    stacks: &mut crate::stack::Stacks,
    trunk: &str,
) -> Result<Vec<String>> {
    let merged = git.merged_into(trunk)?;
    let mut deleted = Vec::new();

    for branch in merged {
        if stacks.parent_of(&branch) != trunk {
            continue;
        }
        if !prompt::confirm(&format!("'{branch}' is merged into '{trunk}'. Delete it?"))? {
            continue;
        }
        git.delete_local_branch(&branch)?;
        stacks.remove_branch(&branch)?;
        output::success(&format!("Deleted merged branch {}", output::branch(&branch)));
        deleted.push(branch);
    }
    Ok(deleted)
}
