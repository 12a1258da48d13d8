//! `fj pr`: create pull requests for a branch and every ancestor that
//! still needs one, oldest first, so each PR targets its parent.

use super::common;
use crate::cli::{output, prompt};
use crate::errors::{FlapjackError, Result};
use crate::git::GitRepository;
use crate::stack::{
    branch_path, find_oldest_unsubmitted, submit_stack, PrDetails, PushDecision, SkipReason,
    SubmitReport, SubmitStatus,
};

pub async fn run(branch: Option<String>, web: bool) -> Result<()> {
    let git = common::open_repo()?;
    let stacks = common::open_stacks(&git)?;
    let settings = common::load_settings_for(&git)?;
    let host = common::github_host(&settings)?;
    let branch = common::resolve_branch(&git, branch)?;
    let trunk = settings.trunk.clone();

    if !stacks.contains(&branch) {
        return Err(FlapjackError::branch(format!(
            "Branch '{branch}' is not tracked; run 'fj track' first"
        )));
    }

    let oldest = find_oldest_unsubmitted(&stacks, &host, &branch, &trunk).await?;
    let path = branch_path(&stacks, &oldest, &branch);
    if path.is_empty() {
        return Err(FlapjackError::branch(format!(
            "Could not walk the stack from '{oldest}' to '{branch}'"
        )));
    }

    output::info(&format!(
        "Submitting: {}",
        path.iter()
            .map(|b| output::branch(b))
            .collect::<Vec<_>>()
            .join(" → ")
    ));

    let reviewers = settings.default_reviewers.clone();
    let report = submit_stack(
        &stacks,
        &host,
        &path,
        &trunk,
        |name| ensure_pushed(&git, name),
        |name, base| collect_details(&git, name, base, &reviewers),
    )
    .await?;

    print_report(&report, web)
}

/// Make sure `branch` exists on the remote, offering to push it.
fn ensure_pushed(git: &GitRepository, branch: &str) -> Result<PushDecision> {
    if git.is_pushed_to_remote(branch)? {
        return Ok(PushDecision::Pushed);
    }
    if !prompt::confirm(&format!("'{branch}' is not on the remote. Push it now?"))? {
        return Ok(PushDecision::Declined);
    }
    match git.push(branch, false) {
        Ok(()) => Ok(PushDecision::Pushed),
        Err(e) => {
            output::warning(&format!("Failed to push '{branch}': {e}"));
            Ok(PushDecision::Failed)
        }
    }
}

/// Prompt for title and body; `None` when the user declines the summary.
fn collect_details(
    git: &GitRepository,
    branch: &str,
    base: &str,
    reviewers: &[String],
) -> Result<Option<PrDetails>> {
    let default_title = git
        .last_commit_summary(branch)
        .unwrap_or_else(|| branch.to_string());
    let title = prompt::input(&format!("Title for '{branch}'"), &default_title)?;
    let body = prompt::input("Description", "Part of a stacked series.")?;

    output::info(&format!(
        "About to open a PR: {} → {}",
        output::branch(branch),
        output::branch(base)
    ));
    if !prompt::confirm("Create it?")? {
        return Ok(None);
    }
    Ok(Some(PrDetails {
        title,
        body,
        reviewers: reviewers.to_vec(),
        draft: false,
    }))
}

fn print_report(report: &SubmitReport, web: bool) -> Result<()> {
    if report.is_empty() {
        output::info("Nothing to submit");
        return Ok(());
    }

    let mut failed = false;
    let mut first_url: Option<String> = None;

    for (branch, status) in report.iter() {
        match status {
            SubmitStatus::Created { url } => {
                output::success(&format!("{}: created {url}", output::branch(branch)));
                first_url.get_or_insert_with(|| url.clone());
            }
            SubmitStatus::AlreadyExists { url } => {
                let note = url.as_deref().unwrap_or("(no URL)");
                output::info(&format!("{}: already open at {note}", output::branch(branch)));
                if let Some(url) = url {
                    first_url.get_or_insert_with(|| url.clone());
                }
            }
            SubmitStatus::Skipped(reason) => {
                let why = match reason {
                    SkipReason::NotPushed => "not pushed to the remote",
                    SkipReason::Declined => "creation declined",
                    SkipReason::BlockedByParent => "an earlier branch was skipped",
                };
                output::warning(&format!("{}: skipped ({why})", output::branch(branch)));
            }
            SubmitStatus::Failed { error } => {
                output::error(&format!("{}: {error}", output::branch(branch)));
                failed = true;
            }
        }
    }

    let skipped = report.skipped();
    if !skipped.is_empty() {
        output::warning(&format!(
            "{} branch(es) not submitted: {}",
            skipped.len(),
            skipped.join(", ")
        ));
    }

    if web {
        if let Some(url) = first_url {
            if let Err(e) = open::that(&url) {
                output::warning(&format!("Could not open browser: {e}"));
            }
        }
    }

    if failed {
        Err(FlapjackError::remote(
            "Some pull requests could not be created".to_string(),
        ))
    } else {
        Ok(())
    }
}
