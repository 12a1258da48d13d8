pub mod repository;

pub use repository::{GitRepository, RebaseOutcome};
