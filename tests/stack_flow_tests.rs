//! End-to-end stack workflows against real git repositories.
//!
//! These tests build throwaway repositories with git2, track branches in an
//! in-memory store, and drive the same engine code the CLI commands use.
//! The rebase steps shell out to the real `git` binary.

use std::collections::HashMap;
use std::path::Path;
use std::sync::Mutex;

use async_trait::async_trait;
use tempfile::TempDir;

use flapjack::errors::Result;
use flapjack::git::GitRepository;
use flapjack::github::{
    ChecksStatus, CreatePullRequest, MergeMethod, PlatformHost, PullRequest,
};
use flapjack::stack::{
    branch_path, find_oldest_unsubmitted, propagate, rebase_branch, rebase_step, submit_stack,
    BranchStatus, ConflictPolicy, InMemoryStore, PushDecision, SkipReason, StackData, Stacks,
    StepOutcome, SubmitStatus,
};

// ----------------------------------------------------------------------
// Fixtures
// ----------------------------------------------------------------------

fn fixture() -> (TempDir, GitRepository) {
    let dir = TempDir::new().unwrap();
    let repo = git2::Repository::init(dir.path()).unwrap();
    let mut config = repo.config().unwrap();
    config.set_str("user.name", "Test User").unwrap();
    config.set_str("user.email", "test@example.com").unwrap();

    commit_file(&repo, "README.md", "# test\n", "Initial commit");

    // Normalize the default branch name to main.
    let head = repo.head().unwrap().peel_to_commit().unwrap();
    repo.branch("main", &head, true).unwrap();
    repo.set_head("refs/heads/main").unwrap();

    let git = GitRepository::open(dir.path()).unwrap();
    (dir, git)
}

fn commit_file(repo: &git2::Repository, name: &str, content: &str, message: &str) -> git2::Oid {
    let workdir = repo.workdir().unwrap();
    std::fs::write(workdir.join(name), content).unwrap();

    let mut index = repo.index().unwrap();
    // Checkouts happen through a second handle; reload before staging.
    index.read(true).unwrap();
    index.add_path(Path::new(name)).unwrap();
    index.write().unwrap();
    let tree_id = index.write_tree().unwrap();
    let tree = repo.find_tree(tree_id).unwrap();
    let sig = repo.signature().unwrap();
    let parent = repo.head().ok().and_then(|h| h.peel_to_commit().ok());
    let parents: Vec<&git2::Commit> = parent.iter().collect();
    repo.commit(Some("HEAD"), &sig, &sig, message, &tree, &parents)
        .unwrap()
}

fn open_stacks(git: &GitRepository) -> Stacks {
    let store = Box::new(InMemoryStore::new(StackData::default()));
    Stacks::open(store, git.repo_id()).unwrap()
}

fn read_file(dir: &TempDir, name: &str) -> String {
    std::fs::read_to_string(dir.path().join(name)).unwrap()
}

fn mid_rebase(dir: &TempDir) -> bool {
    dir.path().join(".git/rebase-merge").exists() || dir.path().join(".git/rebase-apply").exists()
}

// ----------------------------------------------------------------------
// Deleting a branch relinks its children
// ----------------------------------------------------------------------

#[test]
fn test_delete_relinks_children_to_grandparent() {
    let (_dir, git) = fixture();
    let mut stacks = open_stacks(&git);

    git.create_branch("feature", "main").unwrap();
    git.create_branch("sub", "feature").unwrap();
    stacks.add_branch("feature", "main").unwrap();
    stacks.add_branch("sub", "feature").unwrap();

    git.checkout_branch("main").unwrap();
    assert!(stacks.remove_branch("feature").unwrap());
    git.delete_local_branch("feature").unwrap();

    assert_eq!(stacks.parent_of("sub"), "main");
    assert_eq!(stacks.children_of("main"), vec!["sub"]);
    assert!(!stacks.contains("feature"));
    assert!(!git.branch_exists("feature"));
    assert!(git.branch_exists("sub"));
}

// ----------------------------------------------------------------------
// Conflict propagation over real rebases
// ----------------------------------------------------------------------

/// Builds main <- a <- b <- c where b edits a line that main also edits,
/// so rebasing b conflicts while a rebases cleanly.
fn conflict_fixture() -> (TempDir, GitRepository, Stacks) {
    let (dir, git) = fixture();
    let repo = git2::Repository::open(dir.path()).unwrap();
    let mut stacks = open_stacks(&git);

    commit_file(&repo, "shared.txt", "original\n", "Add shared file");

    git.create_branch("a", "main").unwrap();
    commit_file(&repo, "a.txt", "a\n", "Work on a");

    git.create_branch("b", "a").unwrap();
    commit_file(&repo, "shared.txt", "from-b\n", "Edit shared on b");

    git.create_branch("c", "b").unwrap();
    commit_file(&repo, "c.txt", "c\n", "Work on c");

    git.checkout_branch("main").unwrap();
    commit_file(&repo, "shared.txt", "from-main\n", "Edit shared on main");

    stacks.add_branch("a", "main").unwrap();
    stacks.add_branch("b", "a").unwrap();
    stacks.add_branch("c", "b").unwrap();
    (dir, git, stacks)
}

#[test]
fn test_conflict_skips_subtree_and_leaves_repo_clean() {
    let (dir, git, stacks) = conflict_fixture();

    let order = stacks.descendants_with_parents("main");
    let policy = ConflictPolicy::AbortAndContinue;
    let report = propagate(&order, policy, rebase_step(&git, &stacks, policy)).unwrap();

    assert_eq!(report.status_of("a"), Some(BranchStatus::Updated));
    assert_eq!(report.status_of("b"), Some(BranchStatus::Conflict));
    assert_eq!(report.status_of("c"), Some(BranchStatus::Skipped));
    assert_eq!(report.updated(), vec!["a"]);
    assert_eq!(report.conflicted(), vec!["b", "c"]);

    // The conflicted rebase was rolled back.
    assert!(!mid_rebase(&dir));

    // a really got main's change.
    git.checkout_branch("a").unwrap();
    assert_eq!(read_file(&dir, "shared.txt"), "from-main\n");

    // b was restored to its pre-rebase state.
    git.checkout_branch("b").unwrap();
    assert_eq!(read_file(&dir, "shared.txt"), "from-b\n");
}

#[test]
fn test_halt_policy_stops_at_first_conflict() {
    let (dir, git, stacks) = conflict_fixture();

    let order = stacks.descendants_with_parents("main");
    let policy = ConflictPolicy::Halt;
    let report = propagate(&order, policy, rebase_step(&git, &stacks, policy)).unwrap();

    assert_eq!(report.status_of("a"), Some(BranchStatus::Updated));
    assert_eq!(report.status_of("b"), Some(BranchStatus::Conflict));
    assert_eq!(report.status_of("c"), Some(BranchStatus::Skipped));

    // The repository is left mid-rebase for the user to resolve.
    assert!(mid_rebase(&dir));
    git.abort_rebase(None).unwrap();
}

// ----------------------------------------------------------------------
// Worktree branches fail closed when the worktree moved on
// ----------------------------------------------------------------------

fn run_git_in(dir: &Path, args: &[&str]) {
    let status = std::process::Command::new("git")
        .args(args)
        .current_dir(dir)
        .status()
        .unwrap();
    assert!(status.success(), "git {args:?} failed in {}", dir.display());
}

/// main <- feature <- sub, with feature recorded as living in an auxiliary
/// worktree whose checkout has since been switched to another branch.
fn stale_worktree_fixture() -> (TempDir, TempDir, GitRepository, Stacks) {
    let (dir, git) = fixture();
    let repo = git2::Repository::open(dir.path()).unwrap();
    let mut stacks = open_stacks(&git);

    git.create_branch("feature", "main").unwrap();
    commit_file(&repo, "f.txt", "f\n", "Work on feature");
    git.create_branch("sub", "feature").unwrap();
    commit_file(&repo, "s.txt", "s\n", "Work on sub");

    git.checkout_branch("main").unwrap();
    commit_file(&repo, "m.txt", "m\n", "Move main forward");

    let wt_root = TempDir::new().unwrap();
    let wt_path = wt_root.path().join("feature-wt");
    run_git_in(
        dir.path(),
        &["worktree", "add", wt_path.to_str().unwrap(), "feature"],
    );
    // The user wandered off to another branch inside the worktree.
    run_git_in(&wt_path, &["switch", "-c", "other"]);

    stacks.add_branch("feature", "main").unwrap();
    stacks.add_branch("sub", "feature").unwrap();
    stacks.set_worktree("feature", Some(wt_path)).unwrap();

    (dir, wt_root, git, stacks)
}

fn branch_tip(dir: &TempDir, branch: &str) -> git2::Oid {
    let repo = git2::Repository::open(dir.path()).unwrap();
    let oid = repo.revparse_single(branch).unwrap().id();
    oid
}

#[test]
fn test_propagate_skips_worktree_branch_checked_out_elsewhere() {
    let (dir, wt_root, git, stacks) = stale_worktree_fixture();
    let wt_path = wt_root.path().join("feature-wt");
    let tip_before = branch_tip(&dir, "feature");

    let order = stacks.descendants_with_parents("main");
    let policy = ConflictPolicy::AbortAndContinue;
    let report = propagate(&order, policy, rebase_step(&git, &stacks, policy)).unwrap();

    assert_eq!(report.status_of("feature"), Some(BranchStatus::Conflict));
    assert_eq!(report.status_of("sub"), Some(BranchStatus::Skipped));

    // Nothing was rebased: the worktree still sits on the stray branch and
    // feature's tip never moved.
    assert_eq!(git.worktree_head(&wt_path).unwrap(), "other");
    assert_eq!(branch_tip(&dir, "feature"), tip_before);
    assert!(!mid_rebase(&dir));
}

#[test]
fn test_single_rebase_refuses_stale_worktree() {
    let (dir, wt_root, git, stacks) = stale_worktree_fixture();
    let wt_path = wt_root.path().join("feature-wt");
    let tip_before = branch_tip(&dir, "feature");

    let outcome =
        rebase_branch(&git, &stacks, "feature", "main", ConflictPolicy::Halt).unwrap();

    assert_eq!(outcome, StepOutcome::Conflict);
    assert_eq!(git.worktree_head(&wt_path).unwrap(), "other");
    assert_eq!(branch_tip(&dir, "feature"), tip_before);
    assert!(!mid_rebase(&dir));
}

// ----------------------------------------------------------------------
// Stacked PR submission
// ----------------------------------------------------------------------

struct FakeHost {
    open_prs: Mutex<HashMap<String, String>>,
    create_calls: Mutex<Vec<String>>,
}

impl FakeHost {
    fn new() -> Self {
        Self {
            open_prs: Mutex::new(HashMap::new()),
            create_calls: Mutex::new(Vec::new()),
        }
    }

    fn with_pr(self, branch: &str, url: &str) -> Self {
        self.open_prs
            .lock()
            .unwrap()
            .insert(branch.to_string(), url.to_string());
        self
    }
}

#[async_trait]
impl PlatformHost for FakeHost {
    async fn has_open_pr(&self, branch: &str) -> Result<bool> {
        Ok(self.open_prs.lock().unwrap().contains_key(branch))
    }

    async fn pr_url(&self, branch: &str) -> Result<Option<String>> {
        Ok(self.open_prs.lock().unwrap().get(branch).cloned())
    }

    async fn create_pr(&self, request: &CreatePullRequest) -> Result<PullRequest> {
        self.create_calls.lock().unwrap().push(request.head.clone());
        let url = format!("https://example.com/pr/{}", request.head);
        self.open_prs
            .lock()
            .unwrap()
            .insert(request.head.clone(), url.clone());
        Ok(PullRequest {
            number: 1,
            url,
            head: request.head.clone(),
            base: request.base.clone(),
            title: request.title.clone(),
        })
    }

    async fn update_pr_base(&self, _branch: &str, _new_base: &str) -> Result<()> {
        Ok(())
    }

    async fn merge_pr(&self, _branch: &str, _method: MergeMethod) -> Result<()> {
        Ok(())
    }

    async fn checks_status(&self, _branch: &str) -> Result<ChecksStatus> {
        Ok(ChecksStatus {
            passed: true,
            failed: Vec::new(),
        })
    }
}

fn tracked_chain(pairs: &[(&str, &str)]) -> Stacks {
    let store = Box::new(InMemoryStore::new(StackData::default()));
    let mut stacks = Stacks::open(store, Some("repo".to_string())).unwrap();
    for (branch, parent) in pairs {
        stacks.add_branch(branch, parent).unwrap();
    }
    stacks
}

#[tokio::test]
async fn test_declined_push_blocks_whole_stack_without_host_calls() {
    let stacks = tracked_chain(&[("base", "main"), ("feature", "base")]);
    let host = FakeHost::new();

    let oldest = find_oldest_unsubmitted(&stacks, &host, "feature", "main")
        .await
        .unwrap();
    assert_eq!(oldest, "base");
    let path = branch_path(&stacks, &oldest, "feature");
    assert_eq!(path, vec!["base", "feature"]);

    let mut details_calls = 0;
    let report = submit_stack(
        &stacks,
        &host,
        &path,
        "main",
        |_| Ok(PushDecision::Declined),
        |_, _| {
            details_calls += 1;
            Ok(None)
        },
    )
    .await
    .unwrap();

    assert_eq!(
        report.status_of("base"),
        Some(&SubmitStatus::Skipped(SkipReason::NotPushed))
    );
    assert_eq!(
        report.status_of("feature"),
        Some(&SubmitStatus::Skipped(SkipReason::BlockedByParent))
    );
    assert_eq!(details_calls, 0);
    assert!(host.create_calls.lock().unwrap().is_empty());
}

#[tokio::test]
async fn test_stack_submits_oldest_first_and_keeps_existing_pr() {
    let stacks = tracked_chain(&[("base", "main"), ("middle", "base"), ("top", "middle")]);
    let host = FakeHost::new().with_pr("base", "https://example.com/pr/base");

    let oldest = find_oldest_unsubmitted(&stacks, &host, "top", "main")
        .await
        .unwrap();
    assert_eq!(oldest, "middle");

    let path = branch_path(&stacks, &oldest, "top");
    let report = submit_stack(
        &stacks,
        &host,
        &path,
        "main",
        |_| Ok(PushDecision::Pushed),
        |branch, _| {
            Ok(Some(flapjack::stack::PrDetails {
                title: format!("[{branch}]"),
                body: String::new(),
                reviewers: Vec::new(),
                draft: false,
            }))
        },
    )
    .await
    .unwrap();

    assert!(matches!(
        report.status_of("middle"),
        Some(SubmitStatus::Created { .. })
    ));
    assert!(matches!(
        report.status_of("top"),
        Some(SubmitStatus::Created { .. })
    ));
    // Parent PRs are created before their children's.
    assert_eq!(*host.create_calls.lock().unwrap(), vec!["middle", "top"]);
}

// ----------------------------------------------------------------------
// Rename keeps the graph coherent
// ----------------------------------------------------------------------

#[test]
fn test_rename_updates_git_and_children() {
    let (_dir, git) = fixture();
    let mut stacks = open_stacks(&git);

    git.create_branch("feature", "main").unwrap();
    git.create_branch("sub", "feature").unwrap();
    stacks.add_branch("feature", "main").unwrap();
    stacks.add_branch("sub", "feature").unwrap();

    git.checkout_branch("main").unwrap();
    git.rename_branch("feature", "feature-v2").unwrap();
    assert!(stacks.rename_branch("feature", "feature-v2").unwrap());

    assert!(git.branch_exists("feature-v2"));
    assert!(!git.branch_exists("feature"));
    assert_eq!(stacks.parent_of("sub"), "feature-v2");
    assert_eq!(stacks.parent_of("feature-v2"), "main");
}
