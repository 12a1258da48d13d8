//! Stack dependency model: persistent parent/child graph of branches and
//! the engines that keep it consistent across rebases, renames, deletions,
//! and stacked-PR submission.

pub mod graph;
pub mod propagate;
pub mod store;
pub mod submit;

pub use graph::Stacks;
pub use propagate::{
    propagate, rebase_branch, rebase_step, BranchStatus, ConflictPolicy, PropagationReport,
    StepOutcome,
};
pub use store::{BranchRecord, InMemoryStore, JsonFileStore, RepoStack, StackData, StackStore};
pub use submit::{
    branch_path, find_oldest_unsubmitted, submit_stack, PrDetails, PushDecision, SkipReason,
    SubmitReport, SubmitStatus,
};
