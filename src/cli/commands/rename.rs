//! `fj rename`: rename a branch in git and in the stack records, keeping
//! children pointed at the new name.

use super::common;
use crate::cli::{output, prompt};
use crate::errors::{FlapjackError, Result};

pub async fn run(old_name: Option<String>, new_name: Option<String>) -> Result<()> {
    let git = common::open_repo()?;
    let mut stacks = common::open_stacks(&git)?;
    let old = common::resolve_branch(&git, old_name)?;

    let new = match new_name {
        Some(name) => {
            prompt::validate_branch_name(&name).map_err(FlapjackError::validation)?;
            name
        }
        None => prompt::input_branch_name(&format!("New name for '{old}'"), "")?,
    };

    if git.branch_exists(&new) {
        return Err(FlapjackError::validation(format!(
            "Branch '{new}' already exists"
        )));
    }

    let was_pushed = git.is_pushed_to_remote(&old).unwrap_or(false);

    git.rename_branch(&old, &new)?;
    if !stacks.rename_branch(&old, &new)? {
        output::info(&format!("Branch '{old}' was not tracked; only git was updated"));
    }

    // The remote still has the old ref; offer to swap it for the new one.
    if was_pushed
        && prompt::confirm(&format!(
            "'{old}' exists on the remote. Push '{new}' and delete the old remote branch?"
        ))?
    {
        git.push(&new, false)?;
        git.delete_remote_branch(&old)?;
        output::success(&format!("Remote now has {}", output::branch(&new)));
    }

    output::success(&format!(
        "Renamed {} to {}",
        output::branch(&old),
        output::branch(&new)
    ));
    Ok(())
}
