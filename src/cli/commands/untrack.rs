//! `fj untrack`: drop a branch from stack metadata without touching git.
//! Its children are relinked to their grandparent.

use super::common;
use crate::cli::output;
use crate::errors::Result;

pub async fn run(branch: Option<String>) -> Result<()> {
    let git = common::open_repo()?;
    let mut stacks = common::open_stacks(&git)?;
    let branch = common::resolve_branch(&git, branch)?;

    let children = stacks.children_of(&branch);
    let parent = stacks.parent_of(&branch);

    if stacks.remove_branch(&branch)? {
        if !children.is_empty() {
            output::info(&format!(
                "Relinked {} to '{}'",
                children.join(", "),
                if parent.is_empty() { "(root)" } else { &parent }
            ));
        }
        output::success(&format!("Stopped tracking {}", output::branch(&branch)));
    } else {
        output::info(&format!("Branch '{branch}' was not tracked"));
    }
    Ok(())
}
