//! `unfuddle_jira` - Unfuddle backup to JIRA CSV migration
//!
//! This crate provides the core functionality for the `u2j` CLI tool, which
//! turns an Unfuddle account backup into a CSV file for the JIRA importer and
//! moves attachment files into the layout the importer expects.
//!
//! # Architecture
//!
//! The crate is organized into the following modules:
//!
//! - [`source`] - XML reading, shape normalization and loading
//! - [`model`] - Typed backup records (projects, milestones, tickets, ...)
//! - [`migrate`] - Link deduplication and issue number allocation
//! - [`export`] - CSV rows and the atomic CSV writer
//! - [`attachments`] - Attachment relocation into per-issue directories
//! - [`format`] - Cell formatting and markup conversion
//! - [`config`] - Configuration management
//! - [`cli`] - Command-line interface using clap
//! - [`error`] - Error types and handling
//! - [`logging`] - Tracing setup

#![forbid(unsafe_code)]
#![warn(clippy::pedantic, clippy::nursery)]
#![allow(clippy::module_name_repetitions)]

pub mod attachments;
pub mod cli;
pub mod config;
pub mod error;
pub mod export;
pub mod format;
pub mod logging;
pub mod migrate;
pub mod model;
pub mod source;

pub use error::{MigrateError, Result};
