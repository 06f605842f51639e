//! Worktree lifecycle management

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use tracing::{debug, info, warn};

use crate::commands::{
    branch_exists, create_branch, delete_branch, git_command, git_command_checked,
    is_git_repository,
};
use crate::error::{Result, WorktreeError};

/// Descriptor for an isolated feature worktree
///
/// The path and branch are pure functions of the project root and feature
/// name, so re-deriving a descriptor always addresses the same workspace.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Worktree {
    /// Absolute path to the worktree
    pub path: PathBuf,
    /// Branch name associated with this worktree
    pub branch: String,
    /// Feature name the worktree was created for
    pub feature: String,
}

/// Configuration for WorktreeManager
#[derive(Debug, Clone)]
pub struct WorktreeConfig {
    /// Prefix for feature branch names
    pub branch_prefix: String,
    /// Environment files copied into a fresh worktree when present
    pub config_files: Vec<String>,
    /// Schema directory copied into a fresh worktree when present
    pub schema_dir: String,
}

impl Default for WorktreeConfig {
    fn default() -> Self {
        Self {
            branch_prefix: "feat-".to_string(),
            config_files: vec![
                ".env".to_string(),
                ".env.local".to_string(),
                ".env.development.local".to_string(),
                ".env.production.local".to_string(),
            ],
            schema_dir: "prisma".to_string(),
        }
    }
}

/// Ordered fallback strategies for worktree removal
#[derive(Debug, Clone, Copy)]
enum RemovalStrategy {
    /// `git worktree remove --force`
    Structured,
    /// Delete the directory, then prune stale worktree metadata
    Forced,
}

/// Manages feature worktrees next to the main checkout
///
/// Worktrees live as siblings of the project directory, named
/// `<project>-<branch>`. Concurrent `create`/`remove` calls for the same
/// feature name from separate processes are not synchronized; callers must
/// serialize them.
#[derive(Debug)]
pub struct WorktreeManager {
    /// Path to the main checkout
    project_root: PathBuf,
    /// Configuration
    config: WorktreeConfig,
}

impl WorktreeManager {
    /// Create a new WorktreeManager rooted at the given checkout
    pub async fn new(project_root: impl Into<PathBuf>) -> Result<Self> {
        Self::with_config(project_root, WorktreeConfig::default()).await
    }

    /// Create a new WorktreeManager with custom configuration
    pub async fn with_config(
        project_root: impl Into<PathBuf>,
        config: WorktreeConfig,
    ) -> Result<Self> {
        let project_root = project_root.into();

        if !is_git_repository(&project_root).await? {
            return Err(WorktreeError::NotAGitRepository {
                path: project_root.clone(),
            });
        }

        Ok(Self {
            project_root,
            config,
        })
    }

    /// Get the project root path
    pub fn project_root(&self) -> &Path {
        &self.project_root
    }

    /// Derive the descriptor for a feature without touching the filesystem
    pub fn descriptor(&self, feature: &str) -> Result<Worktree> {
        let parent = self
            .project_root
            .parent()
            .ok_or_else(|| WorktreeError::InvalidProjectRoot {
                path: self.project_root.clone(),
            })?;
        let project_name = self
            .project_root
            .file_name()
            .and_then(|n| n.to_str())
            .ok_or_else(|| WorktreeError::InvalidProjectRoot {
                path: self.project_root.clone(),
            })?;

        let branch = format!("{}{}", self.config.branch_prefix, feature);
        let path = parent.join(format!("{}-{}", project_name, branch));

        Ok(Worktree {
            path,
            branch,
            feature: feature.to_string(),
        })
    }

    /// Create an isolated worktree for a feature
    ///
    /// Idempotent: if the derived path already exists the descriptor is
    /// returned unchanged. Otherwise the feature branch is created when
    /// absent, the worktree is checked out, and environment/schema files are
    /// copied in best-effort.
    pub async fn create(&self, feature: &str) -> Result<Worktree> {
        let worktree = self.descriptor(feature)?;

        if worktree.path.exists() {
            info!("Worktree already exists at {:?}", worktree.path);
            return Ok(worktree);
        }

        if !branch_exists(&self.project_root, &worktree.branch).await? {
            debug!("Creating branch {}", worktree.branch);
            create_branch(&self.project_root, &worktree.branch).await?;
        }

        info!("Creating worktree at {:?}", worktree.path);
        git_command_checked(
            &self.project_root,
            &[
                "worktree",
                "add",
                worktree.path.to_str().unwrap(),
                &worktree.branch,
            ],
        )
        .await?;

        self.copy_workspace_seed(&worktree.path).await;

        Ok(worktree)
    }

    /// Remove a feature worktree, best-effort
    ///
    /// Removal strategies are tried in order until one succeeds; if all fail
    /// an advisory warning names the path for manual deletion. When
    /// `delete_branch_flag` is set the branch is force-deleted, tolerating
    /// branches that no longer exist or hold unmerged history.
    pub async fn remove(&self, feature: &str, delete_branch_flag: bool) -> Result<()> {
        let worktree = self.descriptor(feature)?;

        if worktree.path.exists() {
            info!("Removing worktree at {:?}", worktree.path);

            let mut removed = false;
            for strategy in [RemovalStrategy::Structured, RemovalStrategy::Forced] {
                match self.try_remove(&worktree.path, strategy).await {
                    Ok(()) => {
                        removed = true;
                        break;
                    }
                    Err(e) => debug!("{:?} removal of {:?} failed: {}", strategy, worktree.path, e),
                }
            }

            if !removed {
                warn!(
                    "Could not remove worktree at {:?}; it may be open elsewhere. Delete it manually.",
                    worktree.path
                );
            }
        }

        if delete_branch_flag {
            match delete_branch(&self.project_root, &worktree.branch).await {
                Ok(()) => debug!("Deleted branch {}", worktree.branch),
                Err(e) => debug!("Leaving branch {} in place: {}", worktree.branch, e),
            }
        }

        Ok(())
    }

    async fn try_remove(&self, path: &Path, strategy: RemovalStrategy) -> Result<()> {
        match strategy {
            RemovalStrategy::Structured => {
                git_command_checked(
                    &self.project_root,
                    &["worktree", "remove", path.to_str().unwrap(), "--force"],
                )
                .await?;
            }
            RemovalStrategy::Forced => {
                tokio::fs::remove_dir_all(path).await?;
                git_command_checked(&self.project_root, &["worktree", "prune"]).await?;
            }
        }
        Ok(())
    }

    /// Merge a feature branch into the current branch
    ///
    /// Returns `Ok(false)` on conflict or merge failure, leaving the
    /// repository in its conflicted state for manual resolution. `Err` is
    /// reserved for git being unavailable.
    pub async fn merge(&self, feature: &str) -> Result<bool> {
        let worktree = self.descriptor(feature)?;

        info!("Merging {} into the current branch", worktree.branch);
        let output = git_command(
            &self.project_root,
            &["merge", &worktree.branch, "--no-edit"],
        )
        .await?;

        if !output.success {
            warn!(
                "Merge of {} failed: {}",
                worktree.branch,
                output.stderr.trim()
            );
        }

        Ok(output.success)
    }

    /// Check whether a feature branch has commits not reachable from HEAD
    ///
    /// Returns `Ok(false)` when the branch does not exist or the query
    /// fails.
    pub async fn has_pending_commits(&self, feature: &str) -> Result<bool> {
        let worktree = self.descriptor(feature)?;

        let range = format!("HEAD..{}", worktree.branch);
        let output = git_command(&self.project_root, &["log", &range, "--oneline"]).await?;

        Ok(output.success && !output.stdout.trim().is_empty())
    }

    /// Copy environment files and the schema directory into a fresh worktree
    ///
    /// Missing sources are skipped; copy failures are advisory only.
    async fn copy_workspace_seed(&self, dest: &Path) {
        for name in &self.config.config_files {
            let src = self.project_root.join(name);
            if !src.exists() {
                continue;
            }
            match tokio::fs::copy(&src, dest.join(name)).await {
                Ok(_) => debug!("Copied {} into worktree", name),
                Err(e) => warn!("Failed to copy {} into worktree: {}", name, e),
            }
        }

        let schema_src = self.project_root.join(&self.config.schema_dir);
        if schema_src.is_dir() {
            match copy_dir_recursive(&schema_src, &dest.join(&self.config.schema_dir)).await {
                Ok(()) => debug!("Copied {}/ into worktree", self.config.schema_dir),
                Err(e) => warn!(
                    "Failed to copy {}/ into worktree: {}",
                    self.config.schema_dir, e
                ),
            }
        }
    }
}

/// Copy a directory tree without following into already-copied subtrees
async fn copy_dir_recursive(src: &Path, dest: &Path) -> std::io::Result<()> {
    let mut pending = vec![(src.to_path_buf(), dest.to_path_buf())];

    while let Some((from, to)) = pending.pop() {
        tokio::fs::create_dir_all(&to).await?;
        let mut entries = tokio::fs::read_dir(&from).await?;
        while let Some(entry) = entries.next_entry().await? {
            let target = to.join(entry.file_name());
            if entry.file_type().await?.is_dir() {
                pending.push((entry.path(), target));
            } else {
                tokio::fs::copy(entry.path(), target).await?;
            }
        }
    }

    Ok(())
}
