//! Diagnostics for a migration run.
//!
//! Stderr carries human-readable events filtered by `-v`/`-q` (or `RUST_LOG`).
//! The optional log file is a JSON record of every run appended one after the
//! other, and always captures debug events (each renumbered ticket, renamed
//! milestone and moved attachment) regardless of the console level.

use std::fs::{self, File, OpenOptions};
use std::io::IsTerminal;
use std::path::Path;
use std::sync::{Mutex, Once};

use anyhow::{Context, Result};
use tracing_subscriber::{EnvFilter, Layer, fmt, prelude::*};

const CRATE_TARGET: &str = "unfuddle_jira";

/// Install the global subscriber for the CLI.
///
/// # Errors
///
/// Returns an error if a filter directive is invalid, the log file cannot be
/// opened, or a subscriber is already installed.
pub fn init_logging(verbosity: u8, quiet: bool, log_file: Option<&Path>) -> Result<()> {
    let console = fmt::layer()
        .with_writer(std::io::stderr)
        .with_target(verbosity > 1)
        .without_time()
        .with_ansi(std::io::stderr().is_terminal())
        .with_filter(console_filter(verbosity, quiet)?);

    let file = match log_file {
        Some(path) => {
            let file = open_log_file(path)?;
            let layer = fmt::layer()
                .with_writer(Mutex::new(file))
                .with_ansi(false)
                .json()
                .with_current_span(false)
                .with_filter(EnvFilter::try_new(file_directive())?);
            Some(layer)
        }
        None => None,
    };

    tracing_subscriber::registry()
        .with(console)
        .with(file)
        .try_init()
        .context("installing log subscriber")?;
    Ok(())
}

/// `RUST_LOG` when set, otherwise a crate-level filter from the CLI flags.
fn console_filter(verbosity: u8, quiet: bool) -> Result<EnvFilter> {
    match EnvFilter::try_from_default_env() {
        Ok(filter) => Ok(filter),
        Err(_) => Ok(EnvFilter::try_new(console_directive(verbosity, quiet))?),
    }
}

fn console_directive(verbosity: u8, quiet: bool) -> String {
    let level = match (quiet, verbosity) {
        (true, _) => return "error".to_string(),
        (false, 0) => "info",
        (false, 1) => "debug",
        (false, _) => "trace",
    };
    format!("{CRATE_TARGET}={level}")
}

fn file_directive() -> String {
    format!("warn,{CRATE_TARGET}=debug")
}

/// Open `path` for appending, creating missing parent directories.
///
/// # Errors
///
/// Returns an error if the directory or file cannot be created.
pub fn open_log_file(path: &Path) -> Result<File> {
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        fs::create_dir_all(parent)
            .with_context(|| format!("creating log directory {}", parent.display()))?;
    }
    OpenOptions::new()
        .create(true)
        .append(true)
        .open(path)
        .with_context(|| format!("opening log file {}", path.display()))
}

/// Route crate events to the test harness output.
pub fn init_test_logging() {
    static INIT: Once = Once::new();

    INIT.call_once(|| {
        tracing_subscriber::fmt()
            .with_env_filter(format!("{CRATE_TARGET}=debug"))
            .with_test_writer()
            .try_init()
            .ok();
    });
}
