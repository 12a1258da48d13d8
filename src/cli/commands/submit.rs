//! `fj submit`: push one branch and report its pull request, offering to
//! create one when none is open.

use super::common;
use crate::cli::{output, prompt};
use crate::errors::Result;
use crate::github::{CreatePullRequest, PlatformHost};

pub async fn run(branch: Option<String>, web: bool) -> Result<()> {
    let git = common::open_repo()?;
    let stacks = common::open_stacks(&git)?;
    let settings = common::load_settings_for(&git)?;
    let host = common::github_host(&settings)?;
    let branch = common::resolve_branch(&git, branch)?;

    if git.has_unpushed_changes(&branch)? {
        // An amended head diverges from the remote, so the push needs a
        // (leased) force.
        let force = git.is_pushed_to_remote(&branch)? && git.last_commit_amended();
        let bar = output::spinner(&format!("Pushing '{branch}'..."));
        git.push(&branch, force)?;
        bar.finish_and_clear();
        output::success(&format!("Pushed {}", output::branch(&branch)));
    } else {
        output::info(&format!("'{branch}' is up to date with the remote"));
    }

    if let Some(url) = host.pr_url(&branch).await? {
        output::info(&format!("Pull request: {url}"));
        open_in_browser(web, &url);
        return Ok(());
    }

    if !prompt::confirm(&format!("No open PR for '{branch}'. Create one?"))? {
        return Ok(());
    }

    let base = match stacks.parent_of(&branch) {
        parent if parent.is_empty() => settings.trunk.clone(),
        parent => parent,
    };
    let default_title = git
        .last_commit_summary(&branch)
        .unwrap_or_else(|| branch.clone());
    let title = prompt::input("Title", &default_title)?;
    let body = prompt::input("Description", "")?;

    let pr = host
        .create_pr(&CreatePullRequest {
            title,
            body,
            head: branch.clone(),
            base,
            reviewers: settings.default_reviewers.clone(),
            draft: false,
        })
        .await?;

    output::success(&format!("Created pull request #{}: {}", pr.number, pr.url));
    open_in_browser(web, &pr.url);
    Ok(())
}

fn open_in_browser(web: bool, url: &str) {
    if web {
        if let Err(e) = open::that(url) {
            output::warning(&format!("Could not open browser: {e}"));
        }
    }
}
