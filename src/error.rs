//! Error types for `unfuddle_jira`.
//!
//! Tolerated conditions (odd input shapes, unknown custom field options,
//! attachments that were already relocated) never surface here; everything in
//! [`MigrateError`] aborts the run.

use std::path::PathBuf;
use thiserror::Error;

/// All errors that stop a migration run.
#[derive(Debug, Error)]
pub enum MigrateError {
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),

    #[error("invalid backup XML: {0}")]
    Xml(#[from] roxmltree::Error),

    #[error("unexpected backup structure: {0}")]
    Json(#[from] serde_json::Error),

    #[error("invalid config file: {0}")]
    Yaml(#[from] serde_yaml::Error),

    #[error("csv error: {0}")]
    Csv(#[from] csv::Error),

    #[error("configuration error: {0}")]
    Config(String),

    #[error("invalid {field}: {reason}")]
    Validation { field: String, reason: String },

    #[error("attachment {id} not found at {}", path.display())]
    MissingSource { id: String, path: PathBuf },
}

impl MigrateError {
    /// Shorthand for a [`MigrateError::Validation`] error.
    pub fn validation(field: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::Validation {
            field: field.into(),
            reason: reason.into(),
        }
    }
}

/// Result alias used across the crate.
pub type Result<T> = std::result::Result<T, MigrateError>;
