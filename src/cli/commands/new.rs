//! `fj new`: create a branch and record it as a child of its base.

use super::common;
use crate::cli::{output, prompt};
use crate::errors::{FlapjackError, Result};

pub async fn run(branch: Option<String>, base: Option<String>) -> Result<()> {
    let git = common::open_repo()?;
    let mut stacks = common::open_stacks(&git)?;

    let base = match base {
        Some(name) => common::resolve_branch(&git, Some(name))?,
        None => git.current_branch()?,
    };

    let branch = match branch {
        Some(name) => {
            prompt::validate_branch_name(&name).map_err(FlapjackError::validation)?;
            name
        }
        None => prompt::input_branch_name("Name for the new branch", "")?,
    };

    if git.branch_exists(&branch) {
        return Err(FlapjackError::validation(format!(
            "Branch '{branch}' already exists"
        )));
    }

    git.create_branch(&branch, &base)?;
    stacks.add_branch(&branch, &base)?;

    output::success(&format!(
        "Created {} on top of {}",
        output::branch(&branch),
        output::branch(&base)
    ));
    Ok(())
}
