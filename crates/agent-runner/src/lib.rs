//! Agent runner - detached agent processes and their status side channel
//!
//! This crate launches downstream agent tools as detached background
//! processes and aggregates the per-agent JSON status records they report
//! through the filesystem.

mod error;
mod launcher;
mod status;

pub use error::{Result, RunnerError};
pub use launcher::{
    AgentLauncher, ApprovalMode, LauncherConfig, SpawnHandle, SpawnMode, SpawnOptions,
};
pub use status::{render, AgentState, StatusRecord, StatusStore, LOGS_DIR_NAME};
