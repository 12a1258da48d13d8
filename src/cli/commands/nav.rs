//! `fj up` / `fj down`: walk one step along the current stack.

use super::{common, switch};
use crate::cli::{output, prompt};
use crate::errors::Result;

pub async fn up() -> Result<()> {
    let git = common::open_repo()?;
    let stacks = common::open_stacks(&git)?;
    let current = git.current_branch()?;

    let parent = stacks.parent_of(&current);
    if parent.is_empty() {
        output::info(&format!("'{current}' has no parent in the stack"));
        return Ok(());
    }
    switch::checkout(&git, &stacks, &parent)
}

pub async fn down() -> Result<()> {
    let git = common::open_repo()?;
    let stacks = common::open_stacks(&git)?;
    let current = git.current_branch()?;

    let children = stacks.children_of(&current);
    let child = match children.as_slice() {
        [] => {
            output::info(&format!("'{current}' has no children in the stack"));
            return Ok(());
        }
        [only] => only.clone(),
        _ => match prompt::select("Which child?", &children)? {
            Some(choice) => choice,
            None => return Ok(()),
        },
    };
    switch::checkout(&git, &stacks, &child)
}
