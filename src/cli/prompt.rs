//! Interactive prompts.
//!
//! Every wrapper maps an interrupted or aborted prompt to
//! [`FlapjackError::Cancelled`], so a Ctrl-C at any prompt boundary
//! short-circuits the workflow cleanly instead of surfacing as an I/O error.

use crate::errors::{FlapjackError, Result};
use dialoguer::theme::ColorfulTheme;
use dialoguer::{Confirm, Input, MultiSelect, Select};

fn cancelled() -> FlapjackError {
    FlapjackError::cancelled("Prompt interrupted")
}

/// Yes/no confirmation, defaulting to yes.
pub fn confirm(prompt: &str) -> Result<bool> {
    Confirm::with_theme(&ColorfulTheme::default())
        .with_prompt(prompt)
        .default(true)
        .interact()
        .map_err(|_| cancelled())
}

/// Free-text input with a default value.
pub fn input(prompt: &str, default: &str) -> Result<String> {
    Input::with_theme(&ColorfulTheme::default())
        .with_prompt(prompt)
        .default(default.to_string())
        .allow_empty(true)
        .interact_text()
        .map_err(|_| cancelled())
}

/// Branch-name input with validation.
pub fn input_branch_name(prompt: &str, default: &str) -> Result<String> {
    Input::with_theme(&ColorfulTheme::default())
        .with_prompt(prompt)
        .default(default.to_string())
        .validate_with(|name: &String| validate_branch_name(name))
        .interact_text()
        .map_err(|_| cancelled())
}

/// Pick any subset of `options`, all pre-selected.
pub fn multi_select(prompt: &str, options: &[String]) -> Result<Vec<String>> {
    if options.is_empty() {
        return Ok(Vec::new());
    }
    let defaults = vec![true; options.len()];
    let picks = MultiSelect::with_theme(&ColorfulTheme::default())
        .with_prompt(prompt)
        .items(options)
        .defaults(&defaults)
        .interact()
        .map_err(|_| cancelled())?;
    Ok(picks.into_iter().map(|i| options[i].clone()).collect())
}

/// Pick one of `options`; `None` when the list is empty.
pub fn select(prompt: &str, options: &[String]) -> Result<Option<String>> {
    if options.is_empty() {
        return Ok(None);
    }
    let index = Select::with_theme(&ColorfulTheme::default())
        .with_prompt(prompt)
        .items(options)
        .default(0)
        .interact()
        .map_err(|_| cancelled())?;
    Ok(options.get(index).cloned())
}

pub fn validate_branch_name(name: &str) -> std::result::Result<(), String> {
    if name.is_empty() {
        return Err("Branch name cannot be empty".to_string());
    }
    if name.contains(' ') {
        return Err("Branch name cannot contain spaces".to_string());
    }
    if name.contains("..") {
        return Err("Branch name cannot contain '..'".to_string());
    }
    Ok(())
}
