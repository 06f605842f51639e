//! List command - show available agent personalities

use std::path::Path;

use hive_core::agent::AgentLibrary;

pub async fn run(project_root: &Path) -> anyhow::Result<()> {
    let library = AgentLibrary::discover(project_root)?;
    let agents = library.list().await?;

    if agents.is_empty() {
        println!(
            "No agent personalities found in {}.",
            library.dir().display()
        );
        return Ok(());
    }

    println!("Available agents:");
    for agent in agents {
        println!("  {} - {}", agent.slug, agent.name);
    }
    Ok(())
}
