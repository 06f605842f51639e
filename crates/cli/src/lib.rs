//! Command implementations behind the `hive` binary

pub mod commands;
