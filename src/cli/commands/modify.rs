//! `fj modify`: stage changes on the current branch, amend or commit them,
//! and rebase the descendants onto the new tip.

use super::common;
use crate::cli::{output, prompt};
use crate::errors::Result;
use crate::stack::ConflictPolicy;

pub async fn run(message: Option<String>, no_push: bool) -> Result<()> {
    let git = common::open_repo()?;
    let stacks = common::open_stacks(&git)?;
    let branch = git.current_branch()?;

    let changed = git.changed_files()?;
    if !changed.is_empty() {
        let picked = prompt::multi_select("Files to stage", &changed)?;
        git.stage(&picked)?;
    }
    if !git.has_staged_changes()? {
        output::info("No staged changes to commit");
        return Ok(());
    }

    // Amending is only safe when the branch tip is its own commit; a tip
    // still shared with the parent would rewrite the parent's history.
    let parent = stacks.parent_of(&branch);
    let can_amend = parent.is_empty() || !git.is_ancestor(&branch, &parent);

    let amend = if can_amend && message.is_none() {
        let choices = vec![
            "Amend the previous commit".to_string(),
            "Create a new commit".to_string(),
        ];
        prompt::select("How should the changes be committed?", &choices)?
            .is_some_and(|c| c.starts_with("Amend"))
    } else {
        false
    };

    if amend {
        git.amend_commit()?;
        output::success(&format!("Amended the tip of {}", output::branch(&branch)));
    } else {
        let message = match message {
            Some(m) => m,
            None => prompt::input("Commit message", "")?,
        };
        git.commit(&message)?;
        output::success(&format!("Committed to {}", output::branch(&branch)));
    }

    if stacks.all_descendants(&branch).is_empty() {
        return Ok(());
    }

    let report = common::propagate_rebases(&git, &stacks, &branch, ConflictPolicy::Halt)?;
    if !no_push {
        common::push_updated_branches(&git, &report.updated());
    }
    if report.is_clean() {
        common::return_to_branch(&git, &branch, None)?;
    } else {
        output::warning(
            "Resolve the conflict, run 'git rebase --continue', then re-run 'fj update'",
        );
    }
    common::report_propagation(&report)
}
