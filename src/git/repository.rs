//! Thin wrapper around the local git repository.
//!
//! git2 handles discovery and branch bookkeeping; operations whose porcelain
//! behavior is the contract (rebase, push, fetch, remote queries, worktree
//! listing) shell out to `git` and surface the tool's own error text.

use crate::errors::{FlapjackError, Result};
use git2::Repository;
use std::path::{Path, PathBuf};
use std::process::Command;

/// Result of a rebase attempt.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RebaseOutcome {
    Clean,
    Conflict,
}

/// Wrapper around a git repository with the operations the stack needs.
pub struct GitRepository {
    repo: Repository,
    path: PathBuf,
}

impl GitRepository {
    /// Open the repository containing `path`.
    pub fn open(path: &Path) -> Result<Self> {
        let repo = Repository::discover(path)
            .map_err(|e| FlapjackError::config(format!("Not a git repository: {e}")))?;

        let workdir = repo
            .workdir()
            .ok_or_else(|| FlapjackError::config("Repository has no working directory"))?
            .to_path_buf();

        Ok(Self {
            repo,
            path: workdir,
        })
    }

    /// Open the repository containing the current directory.
    pub fn discover() -> Result<Self> {
        let cwd = std::env::current_dir()?;
        Self::open(&cwd)
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Repository identity: basename of the worktree root. Lossy by design
    /// (two repositories with the same folder name collide); workflows
    /// depend on the current behavior.
    pub fn repo_id(&self) -> Option<String> {
        self.path
            .file_name()
            .map(|name| name.to_string_lossy().into_owned())
    }

    /// Name of the currently checked-out branch.
    pub fn current_branch(&self) -> Result<String> {
        let head = self
            .repo
            .head()
            .map_err(|e| FlapjackError::branch(format!("Could not get HEAD: {e}")))?;

        head.shorthand()
            .map(|name| name.to_string())
            .ok_or_else(|| FlapjackError::branch("HEAD is detached"))
    }

    pub fn branch_exists(&self, name: &str) -> bool {
        self.repo.find_branch(name, git2::BranchType::Local).is_ok()
    }

    /// All local branch names.
    pub fn list_branches(&self) -> Result<Vec<String>> {
        let mut names = Vec::new();
        for entry in self.repo.branches(Some(git2::BranchType::Local))? {
            let (branch, _) = entry?;
            if let Some(name) = branch.name()? {
                names.push(name.to_string());
            }
        }
        names.sort();
        Ok(names)
    }

    /// Create `name` at `base`'s tip and switch to it.
    pub fn create_branch(&self, name: &str, base: &str) -> Result<()> {
        let target = self
            .repo
            .revparse_single(base)
            .map_err(|e| FlapjackError::branch(format!("Could not find base '{base}': {e}")))?
            .peel_to_commit()
            .map_err(|e| FlapjackError::branch(format!("Base '{base}' is not a commit: {e}")))?;

        self.repo
            .branch(name, &target, false)
            .map_err(|e| FlapjackError::branch(format!("Could not create branch '{name}': {e}")))?;

        tracing::info!("Created branch '{name}' from '{base}'");
        self.checkout_branch(name)
    }

    /// Switch the main working tree to `name`.
    pub fn checkout_branch(&self, name: &str) -> Result<()> {
        let branch = self
            .repo
            .find_branch(name, git2::BranchType::Local)
            .map_err(|e| FlapjackError::branch(format!("Could not find branch '{name}': {e}")))?;

        let tree = branch.get().peel_to_tree().map_err(|e| {
            FlapjackError::branch(format!("Could not get tree for branch '{name}': {e}"))
        })?;

        self.repo
            .checkout_tree(tree.as_object(), None)
            .map_err(|e| {
                FlapjackError::branch(format!("Could not checkout branch '{name}': {e}"))
            })?;

        self.repo
            .set_head(&format!("refs/heads/{name}"))
            .map_err(|e| {
                FlapjackError::branch(format!("Could not update HEAD to '{name}': {e}"))
            })?;

        tracing::debug!("Switched to branch '{name}'");
        Ok(())
    }

    /// Force-delete the local branch.
    pub fn delete_local_branch(&self, name: &str) -> Result<()> {
        let mut branch = self
            .repo
            .find_branch(name, git2::BranchType::Local)
            .map_err(|e| FlapjackError::branch(format!("Could not find branch '{name}': {e}")))?;
        branch
            .delete()
            .map_err(|e| FlapjackError::branch(format!("Could not delete branch '{name}': {e}")))?;
        tracing::info!("Deleted local branch '{name}'");
        Ok(())
    }

    /// Local branches whose tips are reachable from `base` (i.e. merged).
    pub fn merged_into(&self, base: &str) -> Result<Vec<String>> {
        let base_oid = self
            .repo
            .revparse_single(base)
            .map_err(|e| FlapjackError::branch(format!("Could not find '{base}': {e}")))?
            .peel_to_commit()?
            .id();

        let mut merged = Vec::new();
        for name in self.list_branches()? {
            if name == base {
                continue;
            }
            let oid = self
                .repo
                .revparse_single(&name)?
                .peel_to_commit()?
                .id();
            if oid == base_oid || self.repo.graph_descendant_of(base_oid, oid)? {
                merged.push(name);
            }
        }
        Ok(merged)
    }

    /// Whether `ancestor`'s tip is reachable from `descendant`'s tip.
    pub fn is_ancestor(&self, ancestor: &str, descendant: &str) -> bool {
        let oid = |name: &str| {
            self.repo
                .revparse_single(name)
                .and_then(|obj| obj.peel_to_commit())
                .map(|c| c.id())
        };
        match (oid(ancestor), oid(descendant)) {
            (Ok(a), Ok(d)) => {
                a == d || self.repo.graph_descendant_of(d, a).unwrap_or(false)
            }
            _ => false,
        }
    }

    /// URL of the `origin` remote, if configured.
    pub fn remote_url(&self) -> Option<String> {
        self.repo
            .find_remote("origin")
            .ok()
            .and_then(|remote| remote.url().map(|url| url.to_string()))
    }

    /// Rename a local branch; the underlying ref move, not the stack record.
    pub fn rename_branch(&self, old: &str, new: &str) -> Result<()> {
        let mut branch = self
            .repo
            .find_branch(old, git2::BranchType::Local)
            .map_err(|e| FlapjackError::branch(format!("Could not find branch '{old}': {e}")))?;
        branch
            .rename(new, false)
            .map_err(|e| FlapjackError::branch(format!("Could not rename '{old}' to '{new}': {e}")))?;
        tracing::info!("Renamed branch '{old}' to '{new}'");
        Ok(())
    }

    /// Subject line of the latest commit on `branch`, for default PR titles.
    pub fn last_commit_summary(&self, branch: &str) -> Option<String> {
        self.repo
            .revparse_single(branch)
            .ok()?
            .peel_to_commit()
            .ok()?
            .summary()
            .map(|s| s.to_string())
    }

    // ------------------------------------------------------------------
    // Subprocess operations
    // ------------------------------------------------------------------

    fn git_output(&self, args: &[&str], dir: Option<&Path>) -> Result<std::process::Output> {
        let cwd = dir.unwrap_or(&self.path);
        tracing::debug!("git {} (in {})", args.join(" "), cwd.display());
        Command::new("git")
            .args(args)
            .current_dir(cwd)
            .output()
            .map_err(FlapjackError::Io)
    }

    /// Run git and require success, surfacing stderr on failure.
    fn run_git(&self, args: &[&str], dir: Option<&Path>) -> Result<String> {
        let output = self.git_output(args, dir)?;
        if output.status.success() {
            Ok(String::from_utf8_lossy(&output.stdout).trim().to_string())
        } else {
            Err(FlapjackError::remote(format!(
                "git {} failed: {}",
                args.first().copied().unwrap_or_default(),
                String::from_utf8_lossy(&output.stderr).trim()
            )))
        }
    }

    /// Rebase the checked-out branch of `dir` (the main working tree when
    /// `None`) onto `onto`. A non-zero exit is a conflict, not an error.
    pub fn rebase_onto(&self, onto: &str, dir: Option<&Path>) -> Result<RebaseOutcome> {
        let output = self.git_output(&["rebase", "--autostash", onto], dir)?;
        if output.status.success() {
            Ok(RebaseOutcome::Clean)
        } else {
            tracing::debug!(
                "Rebase onto '{onto}' stopped: {}",
                String::from_utf8_lossy(&output.stderr).trim()
            );
            Ok(RebaseOutcome::Conflict)
        }
    }

    /// Abort an in-progress rebase.
    pub fn abort_rebase(&self, dir: Option<&Path>) -> Result<()> {
        self.run_git(&["rebase", "--abort"], dir)?;
        Ok(())
    }

    /// Paths with uncommitted changes: staged, unstaged, or untracked.
    pub fn changed_files(&self) -> Result<Vec<String>> {
        let out = self.run_git(&["status", "--porcelain"], None)?;
        let mut files: Vec<String> = out
            .lines()
            .filter_map(|line| line.get(3..))
            // Renames come through as "old -> new"; the new side is the
            // one that can be staged.
            .map(|path| path.split(" -> ").last().unwrap_or(path).to_string())
            .filter(|path| !path.is_empty())
            .collect();
        files.sort();
        files.dedup();
        Ok(files)
    }

    pub fn stage(&self, paths: &[String]) -> Result<()> {
        if paths.is_empty() {
            return Ok(());
        }
        let mut args = vec!["add", "--"];
        args.extend(paths.iter().map(String::as_str));
        self.run_git(&args, None)?;
        Ok(())
    }

    /// Whether the index differs from HEAD.
    pub fn has_staged_changes(&self) -> Result<bool> {
        let output = self.git_output(&["diff", "--cached", "--quiet"], None)?;
        Ok(!output.status.success())
    }

    pub fn commit(&self, message: &str) -> Result<()> {
        self.run_git(&["commit", "-m", message], None)?;
        Ok(())
    }

    /// Fold the staged changes into the previous commit, keeping its message.
    pub fn amend_commit(&self) -> Result<()> {
        self.run_git(&["commit", "--amend", "--no-edit"], None)?;
        Ok(())
    }

    /// Push `branch` to origin, setting upstream.
    pub fn push(&self, branch: &str, force_with_lease: bool) -> Result<()> {
        let mut args = vec!["push", "-u"];
        if force_with_lease {
            args.push("--force-with-lease");
        }
        args.push("origin");
        args.push(branch);
        self.run_git(&args, None)?;
        tracing::info!("Pushed '{branch}' to origin");
        Ok(())
    }

    pub fn fetch(&self) -> Result<()> {
        self.run_git(&["fetch", "origin"], None)?;
        Ok(())
    }

    pub fn pull(&self, branch: &str) -> Result<()> {
        self.run_git(&["pull", "origin", branch], None)?;
        Ok(())
    }

    /// Delete `branch` on origin.
    pub fn delete_remote_branch(&self, branch: &str) -> Result<()> {
        self.run_git(&["push", "origin", "--delete", branch], None)?;
        tracing::info!("Deleted remote branch '{branch}'");
        Ok(())
    }

    /// Whether `branch` exists on origin.
    pub fn is_pushed_to_remote(&self, branch: &str) -> Result<bool> {
        let out = self.run_git(&["ls-remote", "--heads", "origin", branch], None)?;
        Ok(!out.is_empty())
    }

    /// Whether `branch` has local commits its remote counterpart lacks.
    /// A branch missing from the remote trivially has unpushed changes.
    pub fn has_unpushed_changes(&self, branch: &str) -> Result<bool> {
        if !self.is_pushed_to_remote(branch)? {
            return Ok(true);
        }
        let spec = format!("origin/{branch}...{branch}");
        let out = self.run_git(&["rev-list", "--left-right", "--count", &spec], None)?;
        // "<behind>\t<ahead>"
        let ahead = out
            .split_whitespace()
            .nth(1)
            .and_then(|n| n.parse::<u64>().ok())
            .unwrap_or(0);
        Ok(ahead > 0)
    }

    /// Whether the last reflog entry was an amend.
    pub fn last_commit_amended(&self) -> bool {
        self.run_git(&["reflog", "-1"], None)
            .map(|entry| entry.to_lowercase().contains("amend"))
            .unwrap_or(false)
    }

    /// Auxiliary worktree where `branch` is checked out, if any.
    pub fn worktree_for_branch(&self, branch: &str) -> Result<Option<PathBuf>> {
        let out = self.run_git(&["worktree", "list", "--porcelain"], None)?;
        for (path, checked_out) in parse_worktree_list(&out) {
            if checked_out.as_deref() == Some(branch) && path != self.path_trimmed() {
                return Ok(Some(path));
            }
        }
        Ok(None)
    }

    /// Branch checked out in the worktree at `path`.
    pub fn worktree_head(&self, path: &Path) -> Result<String> {
        self.run_git(&["symbolic-ref", "--short", "HEAD"], Some(path))
    }

    fn path_trimmed(&self) -> PathBuf {
        // Workdirs from git2 carry a trailing separator; porcelain paths don't.
        PathBuf::from(self.path.to_string_lossy().trim_end_matches('/'))
    }
}

/// Parse `git worktree list --porcelain` into (path, checked-out branch).
fn parse_worktree_list(output: &str) -> Vec<(PathBuf, Option<String>)> {
    let mut entries = Vec::new();
    let mut current: Option<(PathBuf, Option<String>)> = None;

    for line in output.lines() {
        if let Some(path) = line.strip_prefix("worktree ") {
            if let Some(entry) = current.take() {
                entries.push(entry);
            }
            current = Some((PathBuf::from(path), None));
        } else if let Some(branch) = line.strip_prefix("branch ") {
            if let Some((_, checked_out)) = current.as_mut() {
                *checked_out = Some(
                    branch
                        .strip_prefix("refs/heads/")
                        .unwrap_or(branch)
                        .to_string(),
                );
            }
        }
    }
    if let Some(entry) = current {
        entries.push(entry);
    }
    entries
}

#[cfg(test)]
mod tests {
    use super::*;
    use git2::Signature;
    use tempfile::TempDir;

    fn init_repo() -> (TempDir, GitRepository) {
        let dir = TempDir::new().unwrap();
        let repo = Repository::init(dir.path()).unwrap();
        let mut config = repo.config().unwrap();
        config.set_str("user.name", "Test User").unwrap();
        config.set_str("user.email", "test@example.com").unwrap();

        let signature = Signature::now("Test User", "test@example.com").unwrap();
        let tree_id = {
            let mut index = repo.index().unwrap();
            index.write_tree().unwrap()
        };
        let tree = repo.find_tree(tree_id).unwrap();
        repo.commit(Some("HEAD"), &signature, &signature, "Initial commit", &tree, &[])
            .unwrap();

        let git = GitRepository::open(dir.path()).unwrap();
        (dir, git)
    }

    #[test]
    fn test_repo_id_is_directory_basename() {
        let (dir, git) = init_repo();
        let expected = dir
            .path()
            .canonicalize()
            .unwrap()
            .file_name()
            .unwrap()
            .to_string_lossy()
            .into_owned();
        assert_eq!(git.repo_id(), Some(expected));
    }

    #[test]
    fn test_create_checkout_delete_branch() {
        let (_dir, git) = init_repo();
        let default = git.current_branch().unwrap();

        git.create_branch("feature", &default).unwrap();
        assert!(git.branch_exists("feature"));
        assert_eq!(git.current_branch().unwrap(), "feature");

        git.checkout_branch(&default).unwrap();
        git.delete_local_branch("feature").unwrap();
        assert!(!git.branch_exists("feature"));
    }

    #[test]
    fn test_merged_into_detects_same_tip() {
        let (_dir, git) = init_repo();
        let default = git.current_branch().unwrap();

        // A branch at the same commit counts as merged.
        git.create_branch("feature", &default).unwrap();
        git.checkout_branch(&default).unwrap();
        let merged = git.merged_into(&default).unwrap();
        assert_eq!(merged, vec!["feature"]);
    }

    #[test]
    fn test_last_commit_summary() {
        let (_dir, git) = init_repo();
        let default = git.current_branch().unwrap();
        assert_eq!(
            git.last_commit_summary(&default),
            Some("Initial commit".to_string())
        );
        assert_eq!(git.last_commit_summary("missing"), None);
    }

    #[test]
    fn test_stage_commit_and_amend() {
        let (dir, git) = init_repo();
        let branch = git.current_branch().unwrap();

        std::fs::write(dir.path().join("new.txt"), "one\n").unwrap();
        assert_eq!(git.changed_files().unwrap(), vec!["new.txt"]);

        git.stage(&["new.txt".to_string()]).unwrap();
        assert!(git.has_staged_changes().unwrap());

        git.commit("Add new file").unwrap();
        assert!(!git.has_staged_changes().unwrap());
        assert_eq!(
            git.last_commit_summary(&branch),
            Some("Add new file".to_string())
        );

        std::fs::write(dir.path().join("new.txt"), "two\n").unwrap();
        git.stage(&["new.txt".to_string()]).unwrap();
        git.amend_commit().unwrap();

        // Still one commit with the original message, now flagged as amended.
        assert_eq!(
            git.last_commit_summary(&branch),
            Some("Add new file".to_string())
        );
        assert!(git.last_commit_amended());
        assert!(git.changed_files().unwrap().is_empty());
    }

    #[test]
    fn test_parse_worktree_list() {
        let porcelain = "worktree /repo\n\
                         HEAD 1111111111111111111111111111111111111111\n\
                         branch refs/heads/main\n\
                         \n\
                         worktree /repo-wt\n\
                         HEAD 2222222222222222222222222222222222222222\n\
                         branch refs/heads/feature\n\
                         \n\
                         worktree /repo-detached\n\
                         HEAD 3333333333333333333333333333333333333333\n\
                         detached\n";

        let entries = parse_worktree_list(porcelain);
        assert_eq!(entries.len(), 3);
        assert_eq!(entries[0].0, PathBuf::from("/repo"));
        assert_eq!(entries[0].1.as_deref(), Some("main"));
        assert_eq!(entries[1].1.as_deref(), Some("feature"));
        assert_eq!(entries[2].1, None);
    }
}
