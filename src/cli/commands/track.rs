//! `fj track`: bring an existing git branch under stack management.

use super::common;
use crate::cli::{output, prompt};
use crate::errors::{FlapjackError, Result};

fn promote(candidates: &mut Vec<String>, name: &str) {
    if let Some(pos) = candidates.iter().position(|c| c == name) {
        let entry = candidates.remove(pos);
        candidates.insert(0, entry);
    }
}

pub async fn run(branch: Option<String>) -> Result<()> {
    let git = common::open_repo()?;
    let mut stacks = common::open_stacks(&git)?;
    let settings = common::load_settings()?;
    let branch = common::resolve_branch(&git, branch)?;

    if stacks.contains(&branch) {
        output::info(&format!(
            "Branch '{branch}' is already tracked (parent: {})",
            stacks.parent_of(&branch)
        ));
        return Ok(());
    }

    // Branches the new one was actually cut from come first; within each
    // group the trunk leads.
    let (mut candidates, mut unrelated): (Vec<String>, Vec<String>) = git
        .list_branches()?
        .into_iter()
        .filter(|name| name != &branch)
        .partition(|name| git.is_ancestor(name, &branch));
    promote(&mut candidates, &settings.trunk);
    promote(&mut unrelated, &settings.trunk);
    candidates.extend(unrelated);

    let parent = prompt::select(&format!("Parent branch for '{branch}'"), &candidates)?
        .ok_or_else(|| {
            FlapjackError::branch("No other branches exist to use as a parent".to_string())
        })?;

    stacks.add_branch(&branch, &parent)?;

    // Record where the branch is checked out if it lives in a worktree, so
    // later rebases happen in place there.
    if let Some(path) = git.worktree_for_branch(&branch)? {
        stacks.set_worktree(&branch, Some(path.clone()))?;
        output::info(&format!(
            "Branch '{branch}' is checked out in worktree {}",
            path.display()
        ));
    }

    output::success(&format!(
        "Tracking {} under {}",
        output::branch(&branch),
        output::branch(&parent)
    ));
    Ok(())
}
