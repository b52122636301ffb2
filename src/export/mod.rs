//! CSV export for the JIRA importer.
//!
//! Produces one row per milestone (as an `Epic`) followed by one row per
//! ticket (as a `Story`), all padded to the same width:
//!
//! | Block | Width |
//! |-------|-------|
//! | fixed columns | [`LEADING_COLUMNS`] |
//! | custom fields | titled custom field slots of the project (0-3) |
//! | `associated-ticket-number` | most links on any ticket |
//! | `comment` | most comment cells on any ticket |
//!
//! Every ticket starts its comment block with a provenance comment and, when
//! it was resolved with a description, a `Resolution:` comment, because JIRA
//! has no field for either.

mod rows;

pub use rows::{RowBuilder, RowSet};

use crate::config::MigrationConfig;
use crate::error::{MigrateError, Result};
use crate::migrate::IdentifierAssignment;
use crate::model::Document;
use serde::Serialize;
use sha2::{Digest, Sha256};
use std::fs::{self, File};
use std::io::{self, Write};
use std::path::{Path, PathBuf};
use tracing::info;

/// Fixed leading columns of every row.
pub const LEADING_COLUMNS: [&str; 16] = [
    "unfuddle-number",
    "jira-issue-key",
    "issue-type",
    "title",
    "status",
    "assignee",
    "reporter",
    "resolution",
    "severity",
    "created-at",
    "updated-at",
    "due-on",
    "resolved-at",
    "epic-name",
    "epic-link",
    "description",
];

/// Outcome of writing the CSV file.
#[derive(Debug, Clone, Serialize)]
pub struct ExportResult {
    pub output_path: String,
    pub milestones: usize,
    pub tickets: usize,
    pub columns: usize,
    /// Custom field cells that echo the raw option id.
    pub custom_field_fallbacks: usize,
    /// SHA-256 of the written file.
    pub content_hash: String,
}

/// Build all rows and write them to `output_path`.
///
/// # Errors
///
/// Returns an error if the file cannot be written.
pub fn export_csv(
    doc: &Document,
    assignment: &IdentifierAssignment,
    config: &MigrationConfig,
    output_path: &Path,
) -> Result<ExportResult> {
    let rows = RowBuilder::new(doc, assignment, config).build();
    write_csv(&rows, output_path)
}

/// Serialize rows as CSV text.
///
/// # Errors
///
/// Returns an error if a row does not match the header width.
pub fn to_csv_bytes(rows: &RowSet) -> Result<Vec<u8>> {
    let mut writer = csv::WriterBuilder::new().from_writer(Vec::new());
    writer.write_record(&rows.header)?;
    for row in rows.milestone_rows.iter().chain(&rows.ticket_rows) {
        writer.write_record(row)?;
    }
    writer
        .into_inner()
        .map_err(|e| MigrateError::Io(e.into_error()))
}

/// Write rows to `output_path` atomically (temp file, then rename).
///
/// # Errors
///
/// Returns an error if the output directory or file cannot be written.
pub fn write_csv(rows: &RowSet, output_path: &Path) -> Result<ExportResult> {
    let bytes = to_csv_bytes(rows)?;

    let parent_dir = output_path.parent().unwrap_or_else(|| Path::new(""));
    fs::create_dir_all(parent_dir)?;

    let temp_path = temp_path_for(output_path)?;
    info!(path = %output_path.display(), "Writing header, milestones, tickets and comments");
    let written =
        write_synced(&temp_path, &bytes).and_then(|()| fs::rename(&temp_path, output_path));
    if let Err(err) = written {
        let _ = fs::remove_file(&temp_path);
        return Err(err.into());
    }

    let content_hash = format!("{:x}", Sha256::digest(&bytes));

    Ok(ExportResult {
        output_path: output_path.to_string_lossy().to_string(),
        milestones: rows.milestone_rows.len(),
        tickets: rows.ticket_rows.len(),
        columns: rows.header.len(),
        custom_field_fallbacks: rows.custom_field_fallbacks,
        content_hash,
    })
}

fn write_synced(path: &Path, bytes: &[u8]) -> io::Result<()> {
    let mut file = File::create(path)?;
    file.write_all(bytes)?;
    file.sync_all()
}

/// Sibling `<name>.tmp` path used while a file is being written.
pub(crate) fn temp_path_for(output_path: &Path) -> Result<PathBuf> {
    let file_name = output_path.file_name().ok_or_else(|| {
        MigrateError::Config(format!("Invalid output path: {}", output_path.display()))
    })?;
    let mut temp_name = file_name.to_os_string();
    temp_name.push(".tmp");
    Ok(output_path.with_file_name(temp_name))
}
