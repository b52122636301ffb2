//! Keys command implementation.
//!
//! Shows the issue key each milestone and ticket will receive, without
//! writing anything.

use crate::cli::KeysArgs;
use crate::config::MigrationConfig;
use crate::error::Result;
use crate::migrate::{IdentifierAssignment, Migration, RecordKey};
use serde::Serialize;

#[derive(Debug, Serialize)]
pub struct KeyEntry {
    #[serde(flatten)]
    pub record: RecordKey,
    pub issue_key: String,
    pub preserved: bool,
}

/// Execute the keys command.
///
/// # Errors
///
/// Returns an error if the backup cannot be loaded.
pub fn execute(args: &KeysArgs, config: &MigrationConfig) -> Result<()> {
    let migration = Migration::prepare(config)?;
    let entries = key_entries(&migration.assignment, config);

    if args.json {
        println!("{}", serde_json::to_string_pretty(&entries)?);
        return Ok(());
    }

    for entry in &entries {
        let source = match &entry.record {
            RecordKey::Milestone(id) => format!("milestone {id}"),
            RecordKey::Ticket(number) => format!("ticket #{number}"),
        };
        let note = if entry.preserved { "" } else { " (renumbered)" };
        println!("{:<16} {source}{note}", entry.issue_key);
    }
    Ok(())
}

/// Assignment entries in allocation order.
#[must_use]
pub fn key_entries(assignment: &IdentifierAssignment, config: &MigrationConfig) -> Vec<KeyEntry> {
    assignment
        .allocations()
        .iter()
        .map(|allocation| KeyEntry {
            record: allocation.record.clone(),
            issue_key: config.issue_key(allocation.number),
            preserved: allocation.preserved,
        })
        .collect()
}
