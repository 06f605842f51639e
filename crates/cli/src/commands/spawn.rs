//! Spawn command - start an agent on a task

use std::path::Path;

use anyhow::Context;

use agent_runner::{AgentLauncher, ApprovalMode, SpawnMode, SpawnOptions};
use git_worktree::WorktreeManager;
use hive_core::agent::AgentLibrary;

/// Arguments for the spawn command
pub struct SpawnArgs {
    pub agent: String,
    pub task: String,
    pub worktree: Option<String>,
    pub mode: String,
    pub use_terminal: bool,
}

/// Load a personality, optionally carve out a worktree, and launch the agent
pub async fn run(project_root: &Path, args: SpawnArgs) -> anyhow::Result<()> {
    let approval_mode = ApprovalMode::from_str(&args.mode)?;

    let library = AgentLibrary::discover(project_root)?;
    let agent = library.load(&args.agent).await?;
    println!("Loaded agent: {}", agent.name);

    let prompt = agent.build_prompt(&args.task);

    let mut work_dir = project_root.to_path_buf();
    let mut feature_name = None;
    if let Some(feature) = &args.worktree {
        let manager = WorktreeManager::new(project_root).await?;
        let worktree = manager
            .create(feature)
            .await
            .context("Failed to create worktree")?;
        println!("Worktree ready at {}", worktree.path.display());
        work_dir = worktree.path;
        feature_name = Some(worktree.feature);
    }

    let launcher = AgentLauncher::new(project_root);
    let handle = launcher
        .spawn(
            &prompt,
            SpawnOptions {
                work_dir,
                approval_mode,
                use_terminal: args.use_terminal,
                feature_name,
            },
        )
        .await
        .context("Failed to spawn agent")?;

    match handle.mode {
        SpawnMode::Terminal => println!("Agent spawned in a new terminal."),
        SpawnMode::Background => println!("Agent spawned in the background."),
    }
    println!("  Log:    {}", handle.log_path.display());
    println!("  Status: {}", handle.status_path.display());
    println!();
    println!("Monitor progress with `hive status --watch`.");
    if let Some(feature) = &args.worktree {
        println!("When the agent is done, merge with `hive merge {}`.", feature);
    }

    Ok(())
}
