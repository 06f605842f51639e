//! Merge command - reconcile a completed feature branch
//!
//! Merges `feat-<feature>` into the current branch and, on success, tears
//! down the worktree, branch, and status record. A conflicted merge leaves
//! everything in place for manual resolution.

use std::path::Path;

use agent_runner::StatusStore;
use git_worktree::WorktreeManager;

/// Terminal states of the reconciliation flow
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MergeOutcome {
    /// Merge landed; cleanup ran if requested
    Merged,
    /// Merge failed; repository left conflicted, nothing cleaned up
    Conflicted,
}

/// Run the reconciliation flow for one feature
pub async fn run(
    project_root: &Path,
    feature: &str,
    cleanup: bool,
) -> anyhow::Result<MergeOutcome> {
    let manager = WorktreeManager::new(project_root).await?;

    if !manager.has_pending_commits(feature).await? {
        println!(
            "Warning: no new commits on feat-{}; merging anyway.",
            feature
        );
    }

    if !manager.merge(feature).await? {
        eprintln!();
        eprintln!(
            "Merge of feat-{} failed. Resolve the conflicts, stage the files, then run:",
            feature
        );
        eprintln!("    git merge --continue");
        eprintln!("The worktree and branch are untouched.");
        return Ok(MergeOutcome::Conflicted);
    }

    if cleanup {
        manager.remove(feature, true).await?;
        let store = StatusStore::new(project_root);
        if store.remove(feature).await? {
            println!("Removed status record for {}.", feature);
        }
    }

    println!("Feature {} merged successfully.", feature);
    Ok(MergeOutcome::Merged)
}
