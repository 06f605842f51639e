//! Error types for the core library

use thiserror::Error;

#[derive(Error, Debug)]
pub enum Error {
    #[error("No agents directory found under {0}; create docs/agents with at least one personality file")]
    AgentsDirMissing(String),

    #[error("Agent not found: {0}")]
    AgentNotFound(String),

    #[error("Invalid agent definition: {0}")]
    InvalidAgent(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}
