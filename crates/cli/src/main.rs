//! hive CLI - main entry point

use clap::{Parser, Subcommand};
use tracing_subscriber::EnvFilter;

use hive_cli::commands;
use hive_cli::commands::merge::MergeOutcome;
use hive_cli::commands::spawn::SpawnArgs;

/// hive - orchestrate autonomous coding agents in isolated git worktrees
#[derive(Parser, Debug)]
#[command(name = "hive")]
#[command(author, version, about, long_about = None)]
struct Args {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Spawn an agent to work on a task
    Spawn {
        /// Agent personality slug (e.g. builder, reviewer)
        agent: String,
        /// Task description or prompt
        task: String,
        /// Create an isolated git worktree for this task
        #[arg(short, long)]
        worktree: Option<String>,
        /// Approval mode: yolo, auto_edit, or default
        #[arg(short, long, default_value = "yolo")]
        mode: String,
        /// Run in the background instead of a new terminal window
        #[arg(long)]
        no_terminal: bool,
    },
    /// Check status of spawned agents
    Status {
        /// Continuously monitor until no agent is running
        #[arg(short, long)]
        watch: bool,
        /// Poll interval in seconds for watch mode
        #[arg(short, long, default_value_t = 3)]
        interval: u64,
        /// Give up watching after this many seconds
        #[arg(long)]
        timeout: Option<u64>,
    },
    /// Merge a completed feature branch and clean up
    Merge {
        /// Feature/worktree name to merge
        feature: String,
        /// Keep the worktree and status record after merging
        #[arg(long)]
        no_cleanup: bool,
    },
    /// List available agent personalities
    List,
}

#[tokio::main]
async fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .init();

    let args = Args::parse();

    let project_root = match std::env::current_dir() {
        Ok(path) => path,
        Err(e) => {
            eprintln!("Error: cannot determine working directory: {}", e);
            std::process::exit(1);
        }
    };

    let result = match args.command {
        Command::Spawn {
            agent,
            task,
            worktree,
            mode,
            no_terminal,
        } => {
            commands::spawn::run(
                &project_root,
                SpawnArgs {
                    agent,
                    task,
                    worktree,
                    mode,
                    use_terminal: !no_terminal,
                },
            )
            .await
        }
        Command::Status {
            watch,
            interval,
            timeout,
        } => commands::status::run(&project_root, watch, interval, timeout).await,
        Command::Merge {
            feature,
            no_cleanup,
        } => match commands::merge::run(&project_root, &feature, !no_cleanup).await {
            // The conflict guidance is already printed; just fail the exit code
            Ok(MergeOutcome::Conflicted) => std::process::exit(1),
            Ok(MergeOutcome::Merged) => Ok(()),
            Err(e) => Err(e),
        },
        Command::List => commands::list::run(&project_root).await,
    };

    if let Err(e) = result {
        eprintln!("Error: {:#}", e);
        std::process::exit(1);
    }
}
