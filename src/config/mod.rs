pub mod settings;

pub use settings::{GitHubConfig, Settings};

use crate::errors::{FlapjackError, Result};
use std::path::PathBuf;

/// The flapjack configuration directory (`~/.flapjack/`).
pub fn get_config_dir() -> Result<PathBuf> {
    let home_dir =
        dirs::home_dir().ok_or_else(|| FlapjackError::config("Could not find home directory"))?;
    Ok(home_dir.join(".flapjack"))
}

/// Path of the persisted stack file shared by all repositories.
pub fn stack_file_path() -> Result<PathBuf> {
    Ok(get_config_dir()?.join("stacks.json"))
}

/// Path of the settings file.
pub fn settings_path() -> Result<PathBuf> {
    Ok(get_config_dir()?.join("config.json"))
}
