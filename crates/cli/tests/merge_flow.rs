//! Reconciliation flow integration tests
//!
//! Each test runs against a real git repository in a temp directory, with
//! the project checkout in a subdirectory so feature worktrees land inside
//! the temp directory as siblings.

use std::path::{Path, PathBuf};

use tempfile::TempDir;

use agent_runner::{AgentState, StatusRecord, StatusStore};
use git_worktree::WorktreeManager;
use hive_cli::commands::merge::{run, MergeOutcome};

async fn git(repo: &Path, args: &[&str]) {
    let output = tokio::process::Command::new("git")
        .args(args)
        .current_dir(repo)
        .output()
        .await
        .unwrap();
    assert!(
        output.status.success(),
        "git {:?} failed: {}",
        args,
        String::from_utf8_lossy(&output.stderr)
    );
}

async fn commit_file(repo: &Path, name: &str, content: &str, message: &str) {
    tokio::fs::write(repo.join(name), content).await.unwrap();
    git(repo, &["add", "."]).await;
    git(repo, &["commit", "-m", message]).await;
}

async fn branch_exists(repo: &Path, branch: &str) -> bool {
    tokio::process::Command::new("git")
        .args(["rev-parse", "--verify", &format!("refs/heads/{}", branch)])
        .current_dir(repo)
        .output()
        .await
        .unwrap()
        .status
        .success()
}

async fn init_project() -> (TempDir, PathBuf) {
    let dir = TempDir::new().unwrap();
    let root = dir.path().join("project");
    tokio::fs::create_dir(&root).await.unwrap();

    git(&root, &["init"]).await;
    git(&root, &["config", "user.email", "test@test.com"]).await;
    git(&root, &["config", "user.name", "Test"]).await;
    commit_file(&root, "base.txt", "base", "Initial commit").await;

    (dir, root)
}

async fn write_status(project_root: &Path, agent: &str, state: AgentState) -> PathBuf {
    let store = StatusStore::new(project_root);
    tokio::fs::create_dir_all(store.logs_dir()).await.unwrap();

    let mut record = StatusRecord::running(agent);
    record.status = state;
    let content = serde_json::to_string_pretty(&record).unwrap();

    let path = store.status_path(agent);
    tokio::fs::write(&path, content).await.unwrap();
    path
}

#[tokio::test]
async fn merge_success_cleans_up_everything() {
    let (_dir, root) = init_project().await;
    let manager = WorktreeManager::new(&root).await.unwrap();

    let worktree = manager.create("login").await.unwrap();
    commit_file(&worktree.path, "feature.txt", "work", "Add feature").await;
    let status_path = write_status(&root, "login", AgentState::Complete).await;

    let outcome = run(&root, "login", true).await.unwrap();

    assert_eq!(outcome, MergeOutcome::Merged);
    assert!(root.join("feature.txt").exists());
    assert!(!worktree.path.exists());
    assert!(!status_path.exists());
    assert!(!branch_exists(&root, "feat-login").await);
}

#[tokio::test]
async fn merge_conflict_preserves_workspace() {
    let (_dir, root) = init_project().await;
    let manager = WorktreeManager::new(&root).await.unwrap();

    let worktree = manager.create("login").await.unwrap();
    commit_file(&root, "base.txt", "main edit", "Edit on main").await;
    commit_file(&worktree.path, "base.txt", "agent edit", "Edit on feature").await;
    let status_path = write_status(&root, "login", AgentState::Complete).await;

    let outcome = run(&root, "login", true).await.unwrap();

    assert_eq!(outcome, MergeOutcome::Conflicted);
    assert!(worktree.path.exists());
    assert!(status_path.exists());
    assert!(branch_exists(&root, "feat-login").await);
}

#[tokio::test]
async fn merge_without_cleanup_keeps_workspace() {
    let (_dir, root) = init_project().await;
    let manager = WorktreeManager::new(&root).await.unwrap();

    let worktree = manager.create("login").await.unwrap();
    commit_file(&worktree.path, "feature.txt", "work", "Add feature").await;
    let status_path = write_status(&root, "login", AgentState::Complete).await;

    let outcome = run(&root, "login", false).await.unwrap();

    assert_eq!(outcome, MergeOutcome::Merged);
    assert!(root.join("feature.txt").exists());
    assert!(worktree.path.exists());
    assert!(status_path.exists());
    assert!(branch_exists(&root, "feat-login").await);
}

#[tokio::test]
async fn merge_without_commits_still_closes_out() {
    let (_dir, root) = init_project().await;
    let manager = WorktreeManager::new(&root).await.unwrap();

    let worktree = manager.create("idle").await.unwrap();

    let outcome = run(&root, "idle", true).await.unwrap();

    assert_eq!(outcome, MergeOutcome::Merged);
    assert!(!worktree.path.exists());
    assert!(!branch_exists(&root, "feat-idle").await);
}
