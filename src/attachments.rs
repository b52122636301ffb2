//! Attachment relocation.
//!
//! Attachment files in the backup are named by attachment id only. The JIRA
//! importer expects them grouped per issue:
//!
//! ```text
//! <output root>/<project key>/<issue key>/<attachment id>_<filename>
//! ```
//!
//! A destination that already exists is skipped, so a second run after a
//! completed one moves nothing. A missing source file aborts the run.

use crate::config::MigrationConfig;
use crate::error::{MigrateError, Result};
use crate::export::temp_path_for;
use crate::migrate::IdentifierAssignment;
use crate::model::{Attachment, Document};
use serde::Serialize;
use std::fs::{self, File};
use std::io::{self, ErrorKind};
use std::path::{Path, PathBuf};
use tracing::{debug, info};

/// What happened (or would happen) to one attachment.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum MoveOutcome {
    Moved,
    /// Destination already present; nothing was touched.
    Skipped,
    /// Dry run: the move would happen.
    Planned,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct AttachmentMove {
    pub attachment_id: String,
    pub issue_key: String,
    pub source: PathBuf,
    pub destination: PathBuf,
    pub outcome: MoveOutcome,
}

/// Summary of a relocation pass.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct RelocationReport {
    pub moved: usize,
    pub skipped: usize,
    pub planned: usize,
    pub moves: Vec<AttachmentMove>,
}

impl RelocationReport {
    fn record(&mut self, entry: AttachmentMove) {
        match entry.outcome {
            MoveOutcome::Moved => self.moved += 1,
            MoveOutcome::Skipped => self.skipped += 1,
            MoveOutcome::Planned => self.planned += 1,
        }
        self.moves.push(entry);
    }
}

/// Move every ticket and comment attachment into its issue directory.
///
/// With `dry_run` the filesystem is only inspected, never changed.
///
/// # Errors
///
/// Returns [`MigrateError::MissingSource`] if an attachment that still has to
/// be moved is not in the attachments directory, or an I/O error if a
/// directory cannot be created or a file cannot be moved.
pub fn relocate_attachments(
    doc: &Document,
    assignment: &IdentifierAssignment,
    config: &MigrationConfig,
    dry_run: bool,
) -> Result<RelocationReport> {
    let project_root = config.attachments_output_dir.join(&config.project_key);
    let mut report = RelocationReport::default();

    info!(
        source = %config.attachments_dir.display(),
        destination = %project_root.display(),
        dry_run,
        "Relocating attachments"
    );

    for ticket in &doc.project.tickets {
        let Some(number) = assignment.ticket(ticket.number) else {
            return Err(MigrateError::validation(
                "ticket number",
                format!("{} has no assigned issue key", ticket.number),
            ));
        };
        let issue_key = config.issue_key(number);
        let issue_dir = project_root.join(&issue_key);

        for attachment in ticket.all_attachments() {
            let source = config.attachments_dir.join(checked_id(&attachment.id)?);
            let destination = issue_dir.join(destination_name(attachment));
            let outcome = relocate_one(&attachment.id, &source, &destination, dry_run)?;
            report.record(AttachmentMove {
                attachment_id: attachment.id.clone(),
                issue_key: issue_key.clone(),
                source,
                destination,
                outcome,
            });
        }
    }

    info!(
        moved = report.moved,
        skipped = report.skipped,
        planned = report.planned,
        "Attachments relocated"
    );
    Ok(report)
}

/// Attachment ids name files directly inside the attachments directory, so
/// they must be a single plain path component.
fn checked_id(id: &str) -> Result<&str> {
    if id.is_empty() || id == "." || id == ".." || id.contains(['/', '\\']) {
        return Err(MigrateError::validation(
            "attachment id",
            format!("{id:?} is not a plain file name"),
        ));
    }
    Ok(id)
}

/// File name inside the issue directory: `<id>_<filename>`, or `<id>` when the
/// attachment has no file name.
///
/// Path separators in the file name are replaced with `_`.
#[must_use]
pub fn destination_name(attachment: &Attachment) -> String {
    match attachment.filename.as_deref().map(str::trim) {
        Some(name) if !name.is_empty() => {
            let safe: String = name
                .chars()
                .map(|c| if matches!(c, '/' | '\\') { '_' } else { c })
                .collect();
            format!("{}_{safe}", attachment.id)
        }
        _ => attachment.id.clone(),
    }
}

fn relocate_one(id: &str, source: &Path, destination: &Path, dry_run: bool) -> Result<MoveOutcome> {
    if destination.exists() {
        info!(path = %destination.display(), "Attachment already relocated, skipping");
        return Ok(MoveOutcome::Skipped);
    }
    if !source.is_file() {
        return Err(MigrateError::MissingSource {
            id: id.to_string(),
            path: source.to_path_buf(),
        });
    }
    if dry_run {
        debug!(from = %source.display(), to = %destination.display(), "Would move attachment");
        return Ok(MoveOutcome::Planned);
    }

    if let Some(parent) = destination.parent() {
        fs::create_dir_all(parent)?;
    }
    move_file(source, destination)?;
    debug!(from = %source.display(), to = %destination.display(), "Moved attachment");
    Ok(MoveOutcome::Moved)
}

/// Rename, falling back to copy and remove across filesystems.
fn move_file(source: &Path, destination: &Path) -> Result<()> {
    match fs::rename(source, destination) {
        Ok(()) => Ok(()),
        Err(err) if err.kind() == ErrorKind::CrossesDevices => {
            copy_then_rename(source, destination)?;
            fs::remove_file(source)?;
            Ok(())
        }
        Err(err) => Err(err.into()),
    }
}

/// Copy into a sibling temp file, sync it, then rename it over `destination`.
///
/// On failure the temp file is removed and `destination` is left untouched.
fn copy_then_rename(source: &Path, destination: &Path) -> Result<()> {
    let temp_path = temp_path_for(destination)?;
    let copied = copy_synced(source, &temp_path)
        .and_then(|()| fs::rename(&temp_path, destination));
    if let Err(err) = copied {
        let _ = fs::remove_file(&temp_path);
        return Err(err.into());
    }
    Ok(())
}

fn copy_synced(source: &Path, temp_path: &Path) -> io::Result<()> {
    let mut reader = File::open(source)?;
    let mut writer = File::create(temp_path)?;
    io::copy(&mut reader, &mut writer)?;
    writer.sync_all()
}
