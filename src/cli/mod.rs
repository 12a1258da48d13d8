//! Command-line interface.
//!
//! Everything is dispatched from [`Cli::run`]; the individual workflow
//! commands live under [`commands`]. Unknown subcommands fall through to
//! plain `git`, so `fj status` or `fj commit -m ...` behave as expected.

pub mod commands;
pub mod output;
pub mod prompt;

use clap::{Parser, Subcommand};
use tracing_subscriber::EnvFilter;

use crate::errors::Result;
use crate::github::MergeMethod;

#[derive(Parser)]
#[command(
    name = "fj",
    about = "Stacked branch manager for git",
    version,
    arg_required_else_help = true
)]
pub struct Cli {
    /// Enable verbose (debug) logging
    #[arg(long, short, global = true)]
    pub verbose: bool,

    /// Disable colored output
    #[arg(long, global = true)]
    pub no_color: bool,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Create a new branch stacked on top of the current (or given) branch
    New {
        /// Name of the branch to create
        branch: Option<String>,
        /// Branch to stack on top of (defaults to the current branch)
        #[arg(long)]
        base: Option<String>,
    },

    /// Show the stack containing a branch as a tree
    #[command(alias = "ls")]
    List {
        /// Branch whose stack to show (defaults to the current branch)
        branch: Option<String>,
    },

    /// Start tracking an existing branch in a stack
    Track {
        /// Branch to track (defaults to the current branch)
        branch: Option<String>,
    },

    /// Stop tracking a branch without touching git
    Untrack {
        /// Branch to untrack (defaults to the current branch)
        branch: Option<String>,
    },

    /// Rebase all descendants of a branch after it changed
    Update {
        /// Branch whose children to update (defaults to the current branch)
        branch: Option<String>,
        /// Skip pushing updated branches to the remote
        #[arg(long)]
        no_push: bool,
    },

    /// Pull the trunk branch and rebase every tracked stack onto it
    Sync {
        /// Trunk branch to sync from (defaults to the configured trunk)
        #[arg(long)]
        trunk: Option<String>,
        /// Skip pushing updated branches to the remote
        #[arg(long)]
        no_push: bool,
    },

    /// Delete a branch and splice its children onto its parent
    Delete {
        /// Branch to delete
        branch: String,
    },

    /// Rename a branch, updating stack records for it and its children
    Rename {
        /// Branch to rename (defaults to the current branch)
        old_name: Option<String>,
        /// New name for the branch
        new_name: Option<String>,
    },

    /// Create pull requests for a branch and any unsubmitted ancestors
    Pr {
        /// Branch to submit (defaults to the current branch)
        branch: Option<String>,
        /// Open created pull requests in the browser
        #[arg(long)]
        web: bool,
    },

    /// Push a branch and report (or create) its pull request
    Submit {
        /// Branch to submit (defaults to the current branch)
        branch: Option<String>,
        /// Open the pull request in the browser
        #[arg(long)]
        web: bool,
    },

    /// Stage and commit (or amend) on the current branch, then update its
    /// descendants
    Modify {
        /// Commit message; implies a new commit rather than an amend
        #[arg(long, short)]
        message: Option<String>,
        /// Skip pushing updated branches to the remote
        #[arg(long)]
        no_push: bool,
    },

    /// Merge a branch's pull request and fold its children onto the parent
    Merge {
        /// Branch whose pull request to merge (defaults to the current branch)
        branch: Option<String>,
        /// Merge method to use
        #[arg(long, default_value = "squash")]
        method: MergeMethod,
        /// Keep the local branch after merging
        #[arg(long)]
        no_delete_branch: bool,
        /// Do not rebase child branches onto the new parent
        #[arg(long)]
        no_update_children: bool,
    },

    /// Check out a tracked branch, picking from a list when none is given
    #[command(alias = "co")]
    Switch {
        /// Branch to check out
        branch: Option<String>,
    },

    /// Check out the parent of the current branch
    Up,

    /// Check out a child of the current branch
    Down,

    /// Any other subcommand is passed through to git unchanged
    #[command(external_subcommand)]
    Git(Vec<String>),
}

impl Cli {
    pub async fn run(self) -> Result<()> {
        setup_logging(self.verbose);
        if self.no_color {
            console::set_colors_enabled(false);
        }

        match self.command {
            Commands::New { branch, base } => commands::new::run(branch, base).await,
            Commands::List { branch } => commands::list::run(branch).await,
            Commands::Track { branch } => commands::track::run(branch).await,
            Commands::Untrack { branch } => commands::untrack::run(branch).await,
            Commands::Update { branch, no_push } => commands::update::run(branch, no_push).await,
            Commands::Sync { trunk, no_push } => commands::sync::run(trunk, no_push).await,
            Commands::Delete { branch } => commands::delete::run(branch).await,
            Commands::Rename { old_name, new_name } => {
                commands::rename::run(old_name, new_name).await
            }
            Commands::Pr { branch, web } => commands::pr::run(branch, web).await,
            Commands::Submit { branch, web } => commands::submit::run(branch, web).await,
            Commands::Modify { message, no_push } => commands::modify::run(message, no_push).await,
            Commands::Merge {
                branch,
                method,
                no_delete_branch,
                no_update_children,
            } => commands::merge::run(branch, method, no_delete_branch, no_update_children).await,
            Commands::Switch { branch } => commands::switch::run(branch).await,
            Commands::Up => commands::nav::up().await,
            Commands::Down => commands::nav::down().await,
            Commands::Git(args) => passthrough_git(&args),
        }
    }
}

fn setup_logging(verbose: bool) {
    let filter = if verbose {
        EnvFilter::new("flapjack=debug")
    } else {
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("flapjack=warn"))
    };

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_writer(std::io::stderr)
        .init();
}

/// Run an unrecognized subcommand as a plain git command, inheriting stdio,
/// and exit with git's status code.
fn passthrough_git(args: &[String]) -> Result<()> {
    let status = std::process::Command::new("git")
        .args(args)
        .status()
        .map_err(|e| crate::errors::FlapjackError::remote(format!("Failed to run git: {e}")))?;
    std::process::exit(status.code().unwrap_or(1));
}
