//! The stack dependency graph: queries and invariant-preserving mutations.
//!
//! A [`Stacks`] value is a per-repository view over the persisted store.
//! Queries are pure reads; every mutation re-validates invariants (no
//! cycles, no duplicate names) before writing and persists on success.
//! All stack metadata changes in the codebase go through this type.

use crate::errors::{FlapjackError, Result};
use crate::stack::store::{BranchRecord, RepoStack, StackData, StackStore};
use std::collections::{HashSet, VecDeque};
use std::path::PathBuf;

/// Per-repository stack view bound to a backing store.
///
/// When the repository identity cannot be resolved the view is an empty
/// no-op stack: queries return nothing and mutations change nothing.
pub struct Stacks {
    store: Box<dyn StackStore>,
    repo_id: Option<String>,
    data: StackData,
}

impl Stacks {
    /// Load the store and bind to `repo_id`. A corrupt or missing backing
    /// file comes back as an empty mapping (the store logs the warning).
    pub fn open(store: Box<dyn StackStore>, repo_id: Option<String>) -> Result<Self> {
        let data = store.load()?;
        if repo_id.is_none() {
            tracing::warn!("Repository identity unresolved; stack operations are no-ops");
        }
        Ok(Self {
            store,
            repo_id,
            data,
        })
    }

    fn branches(&self) -> Option<&RepoStack> {
        self.repo_id.as_ref().and_then(|id| self.data.get(id))
    }

    fn branches_mut(&mut self) -> Option<&mut RepoStack> {
        let id = self.repo_id.clone()?;
        Some(self.data.entry(id).or_default())
    }

    fn persist(&self) -> Result<()> {
        self.store.save(&self.data)
    }

    // ------------------------------------------------------------------
    // Queries
    // ------------------------------------------------------------------

    /// Parent of `branch`, or empty when the branch is a root or untracked.
    pub fn parent_of(&self, branch: &str) -> String {
        self.branches()
            .and_then(|b| b.get(branch))
            .map(|r| r.parent.clone())
            .unwrap_or_default()
    }

    /// Branches whose recorded parent is `branch`, in name order.
    pub fn children_of(&self, branch: &str) -> Vec<String> {
        self.branches()
            .map(|b| {
                b.iter()
                    .filter(|(_, record)| record.parent == branch)
                    .map(|(name, _)| name.clone())
                    .collect()
            })
            .unwrap_or_default()
    }

    /// The full subtree below `branch` (excluding `branch` itself) in
    /// breadth-first order, so a parent always precedes its children.
    pub fn all_descendants(&self, branch: &str) -> Vec<String> {
        self.descendants_with_parents(branch)
            .into_iter()
            .map(|(name, _)| name)
            .collect()
    }

    /// Like [`all_descendants`], paired with each node's immediate parent.
    /// This is the traversal the update propagator consumes: the topological
    /// order guarantees a parent is processed (or marked failed) before any
    /// of its children come up.
    ///
    /// [`all_descendants`]: Stacks::all_descendants
    pub fn descendants_with_parents(&self, branch: &str) -> Vec<(String, String)> {
        let mut out = Vec::new();
        let mut seen: HashSet<String> = HashSet::new();
        let mut queue: VecDeque<String> = VecDeque::new();
        queue.push_back(branch.to_string());
        seen.insert(branch.to_string());

        while let Some(current) = queue.pop_front() {
            for child in self.children_of(&current) {
                // The no-cycle invariant makes revisits impossible in a
                // well-formed stack; the seen set bounds the walk anyway.
                if seen.insert(child.clone()) {
                    out.push((child.clone(), current.clone()));
                    queue.push_back(child);
                }
            }
        }

        out
    }

    /// Chain from `branch` up to its stack root, inclusive of `branch`.
    /// Empty when `branch` is untracked.
    pub fn lineage(&self, branch: &str) -> Vec<String> {
        if !self.contains(branch) {
            return Vec::new();
        }

        let mut out = Vec::new();
        let mut seen: HashSet<String> = HashSet::new();
        let mut current = branch.to_string();
        loop {
            if !seen.insert(current.clone()) {
                tracing::warn!("Cycle detected in stack lineage at '{current}'");
                break;
            }
            out.push(current.clone());
            let parent = self.parent_of(&current);
            if parent.is_empty() || !self.contains(&parent) {
                if !parent.is_empty() {
                    // Untracked parent (e.g. the trunk) terminates the walk
                    // but still belongs to the lineage.
                    out.push(parent);
                }
                break;
            }
            current = parent;
        }
        out
    }

    /// Follow parent pointers until a branch with no parent is reached.
    pub fn stack_root(&self, branch: &str) -> String {
        self.lineage(branch)
            .last()
            .cloned()
            .unwrap_or_else(|| branch.to_string())
    }

    /// First branch present in both lineages, or `None` when the branches
    /// share no recorded ancestor.
    pub fn common_ancestor(&self, a: &str, b: &str) -> Option<String> {
        let lineage_b: HashSet<String> = self.lineage(b).into_iter().collect();
        self.lineage(a).into_iter().find(|name| lineage_b.contains(name))
    }

    /// Whether `branch` is tracked in this repository's stack.
    pub fn contains(&self, branch: &str) -> bool {
        self.branches().is_some_and(|b| b.contains_key(branch))
    }

    /// All tracked branch names, in name order.
    pub fn all_branches(&self) -> Vec<String> {
        self.branches()
            .map(|b| b.keys().cloned().collect())
            .unwrap_or_default()
    }

    /// Recorded worktree path for `branch`, if any.
    pub fn worktree_of(&self, branch: &str) -> Option<PathBuf> {
        self.branches()
            .and_then(|b| b.get(branch))
            .and_then(|r| r.worktree.clone())
    }

    // ------------------------------------------------------------------
    // Mutations
    // ------------------------------------------------------------------

    /// Track `branch` under `parent` (insert or overwrite).
    ///
    /// Rejects the write when `branch` is already an ancestor of `parent`,
    /// which would close a cycle.
    pub fn add_branch(&mut self, branch: &str, parent: &str) -> Result<()> {
        if branch == parent {
            return Err(FlapjackError::validation(format!(
                "Branch '{branch}' cannot be its own parent"
            )));
        }
        if self.lineage(parent).iter().any(|b| b == branch) {
            return Err(FlapjackError::validation(format!(
                "Adding '{branch}' under '{parent}' would create a cycle"
            )));
        }

        if let Some(branches) = self.branches_mut() {
            branches.insert(branch.to_string(), BranchRecord::new(parent));
            self.persist()?;
            tracing::debug!("Tracked branch '{branch}' with parent '{parent}'");
        }
        Ok(())
    }

    /// Record that `branch` is checked out in an auxiliary worktree.
    pub fn set_worktree(&mut self, branch: &str, worktree: Option<PathBuf>) -> Result<bool> {
        let Some(branches) = self.branches_mut() else {
            return Ok(false);
        };
        let Some(record) = branches.get_mut(branch) else {
            return Ok(false);
        };
        record.worktree = worktree;
        self.persist()?;
        Ok(true)
    }

    /// Untrack `branch`, re-linking every child to the removed branch's
    /// parent. Returns `false` (no-op) when the branch is untracked.
    ///
    /// Children are re-linked before the record is deleted and the store is
    /// saved exactly once, so no save can observe orphaned parent pointers.
    pub fn remove_branch(&mut self, branch: &str) -> Result<bool> {
        let Some(branches) = self.branches_mut() else {
            return Ok(false);
        };
        let Some(record) = branches.get(branch) else {
            return Ok(false);
        };
        let parent = record.parent.clone();

        for (_, child) in branches.iter_mut() {
            if child.parent == branch {
                child.parent = parent.clone();
            }
        }
        branches.remove(branch);

        self.persist()?;
        tracing::debug!("Removed branch '{branch}'; children re-linked to '{parent}'");
        Ok(true)
    }

    /// Rename `old` to `new`, rewriting children's parent pointers.
    ///
    /// Errors when `new` is already tracked. Returns `false` when `old` is
    /// untracked: nothing to relink, the caller still renames the git branch.
    pub fn rename_branch(&mut self, old: &str, new: &str) -> Result<bool> {
        if self.contains(new) {
            return Err(FlapjackError::validation(format!(
                "Branch '{new}' is already tracked"
            )));
        }
        let Some(branches) = self.branches_mut() else {
            return Ok(false);
        };
        let Some(record) = branches.remove(old) else {
            return Ok(false);
        };

        branches.insert(new.to_string(), record);
        for (_, child) in branches.iter_mut() {
            if child.parent == old {
                child.parent = new.to_string();
            }
        }

        self.persist()?;
        tracing::debug!("Renamed branch '{old}' to '{new}' in the stack");
        Ok(true)
    }

    /// Re-point `branch` at `new_parent`. Rejects self-parenting and any
    /// assignment that would make `branch` its own ancestor. Returns `false`
    /// when `branch` is untracked.
    pub fn change_parent(&mut self, branch: &str, new_parent: &str) -> Result<bool> {
        if branch == new_parent {
            return Err(FlapjackError::validation(format!(
                "Branch '{branch}' cannot be its own parent"
            )));
        }
        if self.lineage(new_parent).iter().any(|b| b == branch) {
            return Err(FlapjackError::validation(format!(
                "Making '{new_parent}' the parent of '{branch}' would create a cycle"
            )));
        }

        let Some(branches) = self.branches_mut() else {
            return Ok(false);
        };
        let Some(record) = branches.get_mut(branch) else {
            return Ok(false);
        };
        record.parent = new_parent.to_string();
        self.persist()?;
        tracing::debug!("Re-parented '{branch}' onto '{new_parent}'");
        Ok(true)
    }
}
