//! Subcommand implementations

pub mod fetch;
pub mod range;
