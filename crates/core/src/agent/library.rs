//! File-based agent personality loading
//!
//! Personalities live as `<slug>.yaml` files under `docs/agents` in the
//! project. Files may hold the config at the top level or wrapped in a
//! `customModes` array; both shapes load the same way.

use std::path::{Path, PathBuf};
use tracing::warn;

use super::model::{AgentConfig, AgentSummary};
use crate::{Error, Result};

/// Directory holding agent personality files, relative to the project root
pub const AGENTS_DIR: &str = "docs/agents";

/// Loads agent personalities from a project's agents directory
#[derive(Debug, Clone)]
pub struct AgentLibrary {
    /// Directory containing the personality files
    dir: PathBuf,
}

impl AgentLibrary {
    /// Locate the agents directory under a project root
    ///
    /// Missing directory is fatal to the caller; there is nothing useful to
    /// spawn without a personality.
    pub fn discover(project_root: impl AsRef<Path>) -> Result<Self> {
        let dir = project_root.as_ref().join(AGENTS_DIR);
        if !dir.is_dir() {
            return Err(Error::AgentsDirMissing(
                project_root.as_ref().display().to_string(),
            ));
        }
        Ok(Self { dir })
    }

    /// Get the agents directory path
    pub fn dir(&self) -> &Path {
        &self.dir
    }

    /// Load one personality by slug
    pub async fn load(&self, slug: &str) -> Result<AgentConfig> {
        let path = self.dir.join(format!("{}.yaml", slug));
        if !path.exists() {
            return Err(Error::AgentNotFound(slug.to_string()));
        }

        let content = tokio::fs::read_to_string(&path).await?;
        parse_agent(slug, &content)
    }

    /// List all personalities, sorted by slug
    ///
    /// Files that fail to parse are skipped with a warning so one bad file
    /// never hides the rest.
    pub async fn list(&self) -> Result<Vec<AgentSummary>> {
        let mut agents = Vec::new();
        let mut entries = tokio::fs::read_dir(&self.dir).await?;

        while let Some(entry) = entries.next_entry().await? {
            let name = entry.file_name().to_string_lossy().to_string();
            let Some(slug) = name.strip_suffix(".yaml") else {
                continue;
            };

            let content = match tokio::fs::read_to_string(entry.path()).await {
                Ok(content) => content,
                Err(e) => {
                    warn!("Skipping unreadable agent file {}: {}", name, e);
                    continue;
                }
            };

            match parse_agent(slug, &content) {
                Ok(config) => agents.push(AgentSummary {
                    slug: config.slug,
                    name: config.name,
                }),
                Err(e) => warn!("Skipping invalid agent file {}: {}", name, e),
            }
        }

        agents.sort_by(|a, b| a.slug.cmp(&b.slug));
        Ok(agents)
    }
}

/// Parse a personality file, tolerating the `customModes` wrapper
fn parse_agent(slug: &str, content: &str) -> Result<AgentConfig> {
    let value: serde_yaml::Value =
        serde_yaml::from_str(content).map_err(|e| Error::InvalidAgent(format!("{}: {}", slug, e)))?;

    let node = match value.get("customModes").and_then(|modes| modes.get(0)) {
        Some(mode) => mode.clone(),
        None => value,
    };

    let mut config: AgentConfig = serde_yaml::from_value(node)
        .map_err(|e| Error::InvalidAgent(format!("{}: {}", slug, e)))?;

    if config.slug.is_empty() {
        config.slug = slug.to_string();
    }
    if config.name.is_empty() {
        config.name = config.slug.clone();
    }

    Ok(config)
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    async fn library_with_agents() -> (AgentLibrary, TempDir) {
        let dir = TempDir::new().unwrap();
        let agents_dir = dir.path().join(AGENTS_DIR);
        tokio::fs::create_dir_all(&agents_dir).await.unwrap();

        tokio::fs::write(
            agents_dir.join("builder.yaml"),
            "slug: builder\nname: Builder\nroleDefinition: You build features.\n",
        )
        .await
        .unwrap();
        tokio::fs::write(
            agents_dir.join("reviewer.yaml"),
            "customModes:\n  - slug: reviewer\n    name: Reviewer\n    customInstructions: Be strict.\n",
        )
        .await
        .unwrap();
        tokio::fs::write(agents_dir.join("broken.yaml"), "slug: [unclosed\n")
            .await
            .unwrap();

        let library = AgentLibrary::discover(dir.path()).unwrap();
        (library, dir)
    }

    #[tokio::test]
    async fn test_discover_requires_agents_dir() {
        let dir = TempDir::new().unwrap();
        let result = AgentLibrary::discover(dir.path());
        assert!(matches!(result, Err(Error::AgentsDirMissing(_))));
    }

    #[tokio::test]
    async fn test_load_flat_file() {
        let (library, _dir) = library_with_agents().await;

        let agent = library.load("builder").await.unwrap();
        assert_eq!(agent.slug, "builder");
        assert_eq!(agent.name, "Builder");
        assert_eq!(agent.role_definition, "You build features.");
    }

    #[tokio::test]
    async fn test_load_custom_modes_wrapper() {
        let (library, _dir) = library_with_agents().await;

        let agent = library.load("reviewer").await.unwrap();
        assert_eq!(agent.slug, "reviewer");
        assert_eq!(agent.custom_instructions, "Be strict.");
    }

    #[tokio::test]
    async fn test_load_missing_agent() {
        let (library, _dir) = library_with_agents().await;

        let result = library.load("nonexistent").await;
        assert!(matches!(result, Err(Error::AgentNotFound(_))));
    }

    #[tokio::test]
    async fn test_list_skips_invalid_files() {
        let (library, _dir) = library_with_agents().await;

        let agents = library.list().await.unwrap();
        let slugs: Vec<_> = agents.iter().map(|a| a.slug.as_str()).collect();
        assert_eq!(slugs, vec!["builder", "reviewer"]);
    }
}
