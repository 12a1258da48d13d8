//! Plumbing shared by the workflow commands: opening the repository and
//! stack view, resolving branch arguments, and the rebase/push routines
//! that `update`, `sync`, and `merge` all run.

use crate::cli::output;
use crate::config;
use crate::config::settings::Settings;
use crate::errors::{FlapjackError, Result};
use crate::git::GitRepository;
use crate::github::GitHubClient;
use crate::stack::{
    propagate, rebase_step, BranchStatus, ConflictPolicy, JsonFileStore, PropagationReport, Stacks,
};

pub(crate) fn open_repo() -> Result<GitRepository> {
    GitRepository::discover()
}

pub(crate) fn open_stacks(git: &GitRepository) -> Result<Stacks> {
    let store = JsonFileStore::new(config::stack_file_path()?);
    Stacks::open(Box::new(store), git.repo_id())
}

pub(crate) fn load_settings() -> Result<Settings> {
    let path = config::settings_path()?;
    let settings = Settings::load(&path);
    // First run: write the defaults out so there is a file to edit.
    if !path.exists() {
        settings.save(&path)?;
    }
    Ok(settings)
}

/// Settings with the GitHub owner/repo filled in from `origin` when the
/// config file left them blank.
pub(crate) fn load_settings_for(git: &GitRepository) -> Result<Settings> {
    let mut settings = load_settings()?;
    if let Some(url) = git.remote_url() {
        settings.github.fill_from_remote_url(&url);
    }
    Ok(settings)
}

pub(crate) fn github_host(settings: &Settings) -> Result<GitHubClient> {
    GitHubClient::new(&settings.github)
}

/// Resolve an optional branch argument to a concrete existing branch,
/// defaulting to the current one.
pub(crate) fn resolve_branch(git: &GitRepository, branch: Option<String>) -> Result<String> {
    let name = match branch {
        Some(name) => name,
        None => git.current_branch()?,
    };
    if !git.branch_exists(&name) {
        return Err(FlapjackError::branch(format!(
            "Branch '{name}' does not exist"
        )));
    }
    Ok(name)
}

/// Check the original branch back out after a multi-branch operation.
/// Falls back to `fallback` when the original is gone (deleted mid-run).
pub(crate) fn return_to_branch(
    git: &GitRepository,
    target: &str,
    fallback: Option<&str>,
) -> Result<()> {
    let destination = if git.branch_exists(target) {
        target
    } else {
        match fallback {
            Some(name) => name,
            None => return Ok(()),
        }
    };
    if git.current_branch()? != destination {
        git.checkout_branch(destination)?;
    }
    Ok(())
}

/// Rebase the whole subtree below `root` onto its moved ancestors and
/// print per-branch progress. The order comes from the stack graph, so a
/// parent is always rebased before its children.
pub(crate) fn propagate_rebases(
    git: &GitRepository,
    stacks: &Stacks,
    root: &str,
    policy: ConflictPolicy,
) -> Result<PropagationReport> {
    let order = stacks.descendants_with_parents(root);
    let mut step = rebase_step(git, stacks, policy);
    propagate(&order, policy, |branch, parent| {
        output::info(&format!(
            "Updating {} onto {}...",
            output::branch(branch),
            output::branch(parent)
        ));
        step(branch, parent)
    })
}

/// Push every updated branch that already lives on the remote, using
/// `--force-with-lease` since the rebase rewrote its history. Returns the
/// branches actually pushed.
pub(crate) fn push_updated_branches(git: &GitRepository, branches: &[String]) -> Vec<String> {
    let mut pushed = Vec::new();
    for branch in branches {
        match git.is_pushed_to_remote(branch) {
            Ok(true) => match git.push(branch, true) {
                Ok(()) => {
                    output::success(&format!("Pushed {}", output::branch(branch)));
                    pushed.push(branch.clone());
                }
                Err(e) => output::warning(&format!("Failed to push '{branch}': {e}")),
            },
            Ok(false) => {
                tracing::debug!("Branch '{branch}' has no remote counterpart; not pushing");
            }
            Err(e) => output::warning(&format!("Could not check remote for '{branch}': {e}")),
        }
    }
    pushed
}

/// Print the per-branch summary of a propagation run. Returns an error
/// when any branch conflicted or was skipped, so scripted callers see a
/// non-zero exit.
pub(crate) fn report_propagation(report: &PropagationReport) -> Result<()> {
    if report.iter().next().is_none() {
        return Ok(());
    }
    for (branch, status) in report.iter() {
        match status {
            BranchStatus::Updated => {
                output::success(&format!("{} updated", output::branch(branch)))
            }
            BranchStatus::Conflict => {
                output::error(&format!("{} hit a rebase conflict", output::branch(branch)))
            }
            BranchStatus::Skipped => output::warning(&format!(
                "{} skipped (an ancestor failed)",
                output::branch(branch)
            )),
        }
    }

    let conflicted = report.conflicted();
    if conflicted.is_empty() {
        Ok(())
    } else {
        Err(FlapjackError::conflict(format!(
            "{} branch(es) were not updated: {}",
            conflicted.len(),
            conflicted.join(", ")
        )))
    }
}
