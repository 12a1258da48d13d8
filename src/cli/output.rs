//! Console output helpers: consistent styling for the command layer.

use console::style;
use indicatif::{ProgressBar, ProgressStyle};
use std::time::Duration;

pub fn info(message: &str) {
    println!("{}", message);
}

pub fn success(message: &str) {
    println!("{} {}", style("✓").green().bold(), message);
}

pub fn warning(message: &str) {
    eprintln!("{} {}", style("!").yellow().bold(), message);
}

pub fn error(message: &str) {
    eprintln!("{} {}", style("✗").red().bold(), message);
}

/// Branch names rendered the same way everywhere.
pub fn branch(name: &str) -> String {
    style(name).cyan().to_string()
}

/// Spinner for a blocking git or network call.
pub fn spinner(message: &str) -> ProgressBar {
    let bar = ProgressBar::new_spinner();
    bar.set_style(
        ProgressStyle::with_template("{spinner} {msg}")
            .expect("static spinner template"),
    );
    bar.set_message(message.to_string());
    bar.enable_steady_tick(Duration::from_millis(100));
    bar
}
