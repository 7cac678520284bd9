//! Subcommand implementations.

pub mod migrate;
pub mod secret;
pub mod token;
