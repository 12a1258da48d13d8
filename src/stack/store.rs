//! Persistent backing store for stack metadata.
//!
//! One JSON file holds the stacks of every repository on the machine, keyed
//! by repository identity:
//!
//! ```json
//! { "my-repo": { "feature": { "parent": "main" } } }
//! ```
//!
//! Persistence is whole-read / whole-write with no locking: two concurrent
//! invocations against the same repository can race and lose updates. That
//! single-writer assumption is inherited and documented, not worked around.

use crate::errors::Result;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

/// A single tracked branch: its parent edge plus optional worktree location.
///
/// An empty `parent` marks a stack root. The parent need not itself be
/// tracked; pointing at an untracked branch (typically the trunk) is valid.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct BranchRecord {
    #[serde(default)]
    pub parent: String,
    /// Set when the branch is checked out in an auxiliary worktree rather
    /// than the main working tree.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub worktree: Option<PathBuf>,
}

impl BranchRecord {
    pub fn new(parent: impl Into<String>) -> Self {
        Self {
            parent: parent.into(),
            worktree: None,
        }
    }

    pub fn with_worktree(parent: impl Into<String>, worktree: PathBuf) -> Self {
        Self {
            parent: parent.into(),
            worktree: Some(worktree),
        }
    }
}

/// Branch records for one repository, keyed by branch name.
pub type RepoStack = BTreeMap<String, BranchRecord>;

/// Everything the store persists: repository identity -> branch records.
pub type StackData = BTreeMap<String, RepoStack>;

/// Load/save interface for the persisted mapping.
///
/// The trait is the whole surface so tests can swap in [`InMemoryStore`]
/// instead of patching paths or globals.
pub trait StackStore {
    /// Read the full mapping. Missing backing data is an empty mapping,
    /// not an error.
    fn load(&self) -> Result<StackData>;

    /// Persist the full mapping atomically enough for a single writer.
    fn save(&self, data: &StackData) -> Result<()>;
}

/// Production store: one JSON file, by default `~/.flapjack/stacks.json`.
pub struct JsonFileStore {
    path: PathBuf,
}

impl JsonFileStore {
    pub fn new(path: PathBuf) -> Self {
        Self { path }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl StackStore for JsonFileStore {
    fn load(&self) -> Result<StackData> {
        if !self.path.exists() {
            return Ok(StackData::new());
        }

        let contents = std::fs::read_to_string(&self.path)?;
        match serde_json::from_str(&contents) {
            Ok(data) => Ok(data),
            Err(e) => {
                // A corrupt file degrades to "nothing tracked" so the tool
                // stays usable; it is rewritten on the next mutation.
                tracing::warn!(
                    "Stack file {} is unreadable ({}); treating as empty",
                    self.path.display(),
                    e
                );
                Ok(StackData::new())
            }
        }
    }

    fn save(&self, data: &StackData) -> Result<()> {
        if let Some(parent) = self.path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let json = serde_json::to_string_pretty(data)?;
        std::fs::write(&self.path, json)?;
        Ok(())
    }
}

/// In-memory store for tests and dry runs.
#[derive(Default)]
pub struct InMemoryStore {
    data: std::sync::Mutex<StackData>,
}

impl InMemoryStore {
    pub fn new(data: StackData) -> Self {
        Self {
            data: std::sync::Mutex::new(data),
        }
    }
}

impl StackStore for InMemoryStore {
    fn load(&self) -> Result<StackData> {
        Ok(self.data.lock().expect("store poisoned").clone())
    }

    fn save(&self, data: &StackData) -> Result<()> {
        *self.data.lock().expect("store poisoned") = data.clone();
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn sample_data() -> StackData {
        let mut repo = RepoStack::new();
        repo.insert("feature".to_string(), BranchRecord::new("main"));
        repo.insert("sub".to_string(), BranchRecord::new("feature"));

        let mut data = StackData::new();
        data.insert("my-repo".to_string(), repo);
        data
    }

    #[test]
    fn test_missing_file_loads_empty() {
        let dir = TempDir::new().unwrap();
        let store = JsonFileStore::new(dir.path().join("stacks.json"));
        assert!(store.load().unwrap().is_empty());
    }

    #[test]
    fn test_save_load_round_trip() {
        let dir = TempDir::new().unwrap();
        let store = JsonFileStore::new(dir.path().join("stacks.json"));

        let data = sample_data();
        store.save(&data).unwrap();
        assert_eq!(store.load().unwrap(), data);

        // Saving what was just loaded is idempotent
        store.save(&store.load().unwrap()).unwrap();
        assert_eq!(store.load().unwrap(), data);
    }

    #[test]
    fn test_corrupt_file_degrades_to_empty() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("stacks.json");
        std::fs::write(&path, "{not json at all").unwrap();

        let store = JsonFileStore::new(path);
        assert!(store.load().unwrap().is_empty());
    }

    #[test]
    fn test_save_preserves_other_repositories() {
        let dir = TempDir::new().unwrap();
        let store = JsonFileStore::new(dir.path().join("stacks.json"));
        store.save(&sample_data()).unwrap();

        // Read-modify-write: another repo's entry is added without touching
        // the existing one.
        let mut data = store.load().unwrap();
        let mut other = RepoStack::new();
        other.insert("topic".to_string(), BranchRecord::new("trunk"));
        data.insert("other-repo".to_string(), other);
        store.save(&data).unwrap();

        let reloaded = store.load().unwrap();
        assert_eq!(reloaded.len(), 2);
        assert_eq!(reloaded["my-repo"]["feature"].parent, "main");
        assert_eq!(reloaded["other-repo"]["topic"].parent, "trunk");
    }

    #[test]
    fn test_worktree_field_round_trips_and_is_omitted_when_absent() {
        let mut repo = RepoStack::new();
        repo.insert(
            "wt-branch".to_string(),
            BranchRecord::with_worktree("main", PathBuf::from("/tmp/wt")),
        );
        repo.insert("plain".to_string(), BranchRecord::new("main"));
        let mut data = StackData::new();
        data.insert("repo".to_string(), repo);

        let json = serde_json::to_string(&data).unwrap();
        assert!(json.contains("\"worktree\""));
        assert!(!json.contains("\"plain\":{\"parent\":\"main\",\"worktree\""));

        let back: StackData = serde_json::from_str(&json).unwrap();
        assert_eq!(back, data);
    }
}
