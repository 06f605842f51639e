//! Status command - render or watch agent status records

use std::path::Path;
use std::time::Duration;

use agent_runner::{render, StatusStore};

/// Print the current status once, or poll until no agent is running
pub async fn run(
    project_root: &Path,
    watch: bool,
    interval: u64,
    timeout: Option<u64>,
) -> anyhow::Result<()> {
    let store = StatusStore::new(project_root);

    if !watch {
        let records = store.list().await?;
        println!("{}", render(&records));
        return Ok(());
    }

    let interval = Duration::from_secs(interval.max(1));
    let timeout = timeout.map(Duration::from_secs);

    store
        .await_convergence(interval, timeout, |records| {
            println!("{}", render(records));
            println!("Press Ctrl+C to stop watching.");
        })
        .await?;

    println!("All agents settled.");
    Ok(())
}
