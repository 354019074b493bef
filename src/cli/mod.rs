//! Command-line helpers
//!
//! Provides sub-command registration with alias names on top of clap.

pub mod aliases;

pub use aliases::AliasedSubcommands;
