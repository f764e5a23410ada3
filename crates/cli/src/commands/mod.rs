//! Subcommand implementations

pub mod history;
pub mod plan;
pub mod status;
