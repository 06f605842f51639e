//! Git command execution utilities

use std::path::Path;
use std::process::Stdio;
use tokio::process::Command;
use tracing::{debug, trace};

use crate::error::{Result, WorktreeError};

/// Output from a git command
#[derive(Debug)]
pub struct GitOutput {
    pub stdout: String,
    pub stderr: String,
    pub success: bool,
}

/// Execute a git command in the specified directory
pub async fn git_command(repo_path: &Path, args: &[&str]) -> Result<GitOutput> {
    debug!("Running git {:?} in {:?}", args, repo_path);

    let output = Command::new("git")
        .args(args)
        .current_dir(repo_path)
        .stdout(Stdio::piped())
        .stderr(Stdio::piped())
        .output()
        .await
        .map_err(|e| WorktreeError::git_failed_with_source("Failed to execute git command", e))?;

    let stdout = String::from_utf8_lossy(&output.stdout).to_string();
    let stderr = String::from_utf8_lossy(&output.stderr).to_string();

    trace!("git stdout: {}", stdout);
    if !stderr.is_empty() {
        trace!("git stderr: {}", stderr);
    }

    Ok(GitOutput {
        stdout,
        stderr,
        success: output.status.success(),
    })
}

/// Execute a git command and return error if it fails
pub async fn git_command_checked(repo_path: &Path, args: &[&str]) -> Result<String> {
    let output = git_command(repo_path, args).await?;

    if !output.success {
        return Err(WorktreeError::git_failed(format!(
            "git {} failed: {}",
            args.join(" "),
            output.stderr.trim()
        )));
    }

    Ok(output.stdout)
}

/// Check if a path is inside a git repository
pub async fn is_git_repository(path: &Path) -> Result<bool> {
    let output = git_command(path, &["rev-parse", "--git-dir"]).await?;
    Ok(output.success)
}

/// Check if a branch exists
pub async fn branch_exists(repo_path: &Path, branch: &str) -> Result<bool> {
    let output = git_command(
        repo_path,
        &["rev-parse", "--verify", &format!("refs/heads/{}", branch)],
    )
    .await?;
    Ok(output.success)
}

/// Create a new branch at the current HEAD
pub async fn create_branch(repo_path: &Path, branch: &str) -> Result<()> {
    git_command_checked(repo_path, &["branch", branch]).await?;
    Ok(())
}

/// Force-delete a branch
pub async fn delete_branch(repo_path: &Path, branch: &str) -> Result<()> {
    git_command_checked(repo_path, &["branch", "-D", branch]).await?;
    Ok(())
}
