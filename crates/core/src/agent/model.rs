//! Agent personality model

use serde::Deserialize;

/// A YAML-defined agent personality
///
/// Every field is optional in the file; absent fields default to empty
/// strings, and the slug falls back to the file name at load time.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct AgentConfig {
    /// Stable identifier, also the file name
    pub slug: String,
    /// Human-readable name
    pub name: String,
    /// Short description
    pub description: String,
    /// Role text placed at the top of the rendered prompt
    pub role_definition: String,
    /// Guidance on when this personality applies
    pub when_to_use: String,
    /// Additional instructions appended after the role
    pub custom_instructions: String,
}

/// Slug/name pair for listings
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AgentSummary {
    pub slug: String,
    pub name: String,
}

impl AgentConfig {
    /// Render the full prompt handed to the downstream tool
    pub fn build_prompt(&self, task: &str) -> String {
        format!(
            "# {name}\n\n\
             {role}\n\n\
             ---\n\n\
             {instructions}\n\n\
             ---\n\n\
             ## YOUR TASK\n\n\
             {task}\n\n\
             ---\n\n\
             ## EXECUTION MODE\n\n\
             You are running as an autonomous CLI agent.\n\
             - Work through the task without waiting for confirmation\n\
             - Commit your changes when done\n\
             - Use clear commit messages\n\n\
             START NOW.\n",
            name = self.name,
            role = self.role_definition,
            instructions = self.custom_instructions,
            task = task,
        )
    }
}
