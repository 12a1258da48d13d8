//! `fj switch`: check out a tracked branch, picking interactively when no
//! name is given.

use super::common;
use crate::cli::{output, prompt};
use crate::errors::{FlapjackError, Result};
use crate::git::GitRepository;
use crate::stack::Stacks;

pub async fn run(branch: Option<String>) -> Result<()> {
    let git = common::open_repo()?;
    let stacks = common::open_stacks(&git)?;

    let branch = match branch {
        Some(name) => common::resolve_branch(&git, Some(name))?,
        None => {
            let tracked = stacks.all_branches();
            prompt::select("Switch to", &tracked)?.ok_or_else(|| {
                FlapjackError::branch("No tracked branches to switch to".to_string())
            })?
        }
    };

    checkout(&git, &stacks, &branch)
}

/// Checkout that respects worktrees: a branch checked out elsewhere is
/// reported, not moved.
pub(crate) fn checkout(git: &GitRepository, stacks: &Stacks, branch: &str) -> Result<()> {
    if let Some(path) = stacks.worktree_of(branch) {
        output::info(&format!(
            "'{branch}' is checked out in worktree {}",
            path.display()
        ));
        return Ok(());
    }
    git.checkout_branch(branch)?;
    output::success(&format!("Switched to {}", output::branch(branch)));
    Ok(())
}
