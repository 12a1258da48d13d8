//! `fj update`: rebase every descendant of a branch after it changed.
//!
//! Uses the halting conflict policy: the first conflict stops the run with
//! the repository left mid-rebase, so the user can resolve it and run
//! `fj update` again from the conflicted branch.

use super::common;
use crate::cli::{output, prompt};
use crate::errors::Result;
use crate::stack::ConflictPolicy;

pub async fn run(branch: Option<String>, no_push: bool) -> Result<()> {
    let git = common::open_repo()?;
    let stacks = common::open_stacks(&git)?;
    let branch = common::resolve_branch(&git, branch)?;
    let original = git.current_branch()?;

    let affected = stacks.all_descendants(&branch);
    if affected.is_empty() {
        output::info(&format!("No branches are stacked on '{branch}'"));
        return Ok(());
    }

    output::info(&format!(
        "Branches to update: {}",
        affected
            .iter()
            .map(|b| output::branch(b))
            .collect::<Vec<_>>()
            .join(", ")
    ));
    if !prompt::confirm("Proceed?")? {
        output::info("Update cancelled");
        return Ok(());
    }

    let report = common::propagate_rebases(&git, &stacks, &branch, ConflictPolicy::Halt)?;

    if !no_push {
        common::push_updated_branches(&git, &report.updated());
    }

    if report.is_clean() {
        common::return_to_branch(&git, &original, None)?;
        common::report_propagation(&report)
    } else {
        // A conflict leaves git mid-rebase on the failing branch; do not
        // move HEAD away from it.
        output::warning(
            "Resolve the conflict, run 'git rebase --continue', then re-run 'fj update'",
        );
        common::report_propagation(&report)
    }
}
