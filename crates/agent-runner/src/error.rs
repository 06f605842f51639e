//! Error types for agent-runner

use thiserror::Error;

/// Result type alias for launcher and status operations
pub type Result<T> = std::result::Result<T, RunnerError>;

/// Errors that can occur while launching agents or reading status
#[derive(Debug, Error)]
pub enum RunnerError {
    /// Failed to start the agent process
    #[error("Failed to spawn agent process: {message}")]
    SpawnFailed {
        message: String,
        #[source]
        source: Option<std::io::Error>,
    },

    /// Unknown approval mode string
    #[error("Invalid approval mode: {mode}")]
    InvalidApprovalMode { mode: String },

    /// Status watch exceeded its deadline with agents still running
    #[error("Agents still running after {seconds} seconds")]
    ConvergenceTimeout { seconds: u64 },

    /// IO error
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Serialization error
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

impl RunnerError {
    /// Create a SpawnFailed error
    pub fn spawn_failed(message: impl Into<String>) -> Self {
        Self::SpawnFailed {
            message: message.into(),
            source: None,
        }
    }

    /// Create a SpawnFailed error with source
    pub fn spawn_failed_with_source(message: impl Into<String>, source: std::io::Error) -> Self {
        Self::SpawnFailed {
            message: message.into(),
            source: Some(source),
        }
    }
}
