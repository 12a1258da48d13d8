//! Workflow command implementations, one module per subcommand.

pub(crate) mod common;

pub mod delete;
pub mod list;
pub mod merge;
pub mod modify;
pub mod nav;
pub mod new;
pub mod pr;
pub mod rename;
pub mod submit;
pub mod switch;
pub mod sync;
pub mod track;
pub mod untrack;
pub mod update;
