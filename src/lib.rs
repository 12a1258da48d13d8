//! flapjack: a stacked-branch workflow manager for git.
//!
//! Branches are tracked in a parent/child graph persisted per repository.
//! The [`stack`] module owns the graph and the engines that walk it (rebase
//! propagation, stacked PR submission); [`git`] wraps the local repository;
//! [`github`] talks to the hosting platform; [`cli`] is the `fj` binary's
//! command surface.

pub mod cli;
pub mod config;
pub mod errors;
pub mod git;
pub mod github;
pub mod stack;

pub use errors::{FlapjackError, Result};
