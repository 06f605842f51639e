//! Agent personality configuration

mod library;
mod model;

pub use library::{AgentLibrary, AGENTS_DIR};
pub use model::{AgentConfig, AgentSummary};
