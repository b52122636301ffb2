//! Identifier reconciliation.
//!
//! - [`ids`] - target issue numbers for tickets and milestones
//! - [`links`] - one-directional ticket associations

pub mod ids;
pub mod links;

pub use ids::{Allocation, FreeNumbers, IdentifierAssignment, RecordKey, allocate};
pub use links::{DedupeReport, dedupe_links};

use crate::config::MigrationConfig;
use crate::error::Result;
use crate::model::Document;
use crate::source::{LoadOptions, load_document};
use tracing::info;

/// A loaded backup together with its identifier assignment.
///
/// Both are fixed once built; export and relocation only read them.
#[derive(Debug, Clone)]
pub struct Migration {
    pub document: Document,
    pub assignment: IdentifierAssignment,
}

impl Migration {
    /// Load the configured backup file and allocate issue numbers.
    ///
    /// # Errors
    ///
    /// Returns an error if the backup cannot be read, parsed or validated.
    pub fn prepare(config: &MigrationConfig) -> Result<Self> {
        let options = LoadOptions {
            project_id: config.project_id.clone(),
        };
        let document = load_document(&config.backup_file, &options)?;
        Ok(Self::from_document(document, config))
    }

    #[must_use]
    pub fn from_document(document: Document, config: &MigrationConfig) -> Self {
        let assignment = allocate(
            &document.project.tickets,
            &document.project.milestones,
            config.issue_number_offset,
        );
        info!(
            records = assignment.len(),
            offset = config.issue_number_offset,
            "Allocated issue numbers"
        );
        Self {
            document,
            assignment,
        }
    }
}
