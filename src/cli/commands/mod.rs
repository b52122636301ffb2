//! Subcommand implementations.

pub mod convert;
pub mod keys;
