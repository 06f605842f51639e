//! Core library for hive
//!
//! This crate contains the agent personality configuration:
//! YAML-defined role/prompt templates, consumed as opaque text
//! by the process launcher.

pub mod agent;
pub mod error;

pub use error::Error;
pub type Result<T> = std::result::Result<T, Error>;
