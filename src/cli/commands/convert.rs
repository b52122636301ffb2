//! Convert command implementation.
//!
//! Writes the CSV file, then relocates attachments with the same issue keys.

use crate::attachments::{RelocationReport, relocate_attachments};
use crate::cli::ConvertArgs;
use crate::config::MigrationConfig;
use crate::error::Result;
use crate::export::{ExportResult, export_csv};
use crate::migrate::Migration;
use serde::Serialize;
use tracing::info;

/// Everything a `convert` run did.
#[derive(Debug, Serialize)]
pub struct ConvertSummary {
    pub project_key: String,
    pub export: ExportResult,
    /// `None` when attachments were skipped.
    pub attachments: Option<RelocationReport>,
    pub dry_run: bool,
}

/// Execute the convert command.
///
/// # Errors
///
/// Returns an error if the backup cannot be loaded, the CSV cannot be
/// written, or an attachment cannot be relocated.
pub fn execute(args: &ConvertArgs, config: &MigrationConfig) -> Result<()> {
    let summary = convert(args, config)?;

    if args.json {
        println!("{}", serde_json::to_string_pretty(&summary)?);
    } else {
        print_summary(&summary);
    }
    Ok(())
}

/// Run the conversion without printing anything.
///
/// # Errors
///
/// See [`execute`].
pub fn convert(args: &ConvertArgs, config: &MigrationConfig) -> Result<ConvertSummary> {
    let migration = Migration::prepare(config)?;

    let export = export_csv(
        &migration.document,
        &migration.assignment,
        config,
        &config.output_file,
    )?;
    info!(
        path = %export.output_path,
        rows = export.milestones + export.tickets,
        "CSV written"
    );

    let attachments = if args.skip_attachments {
        info!("Skipping attachments");
        None
    } else {
        Some(relocate_attachments(
            &migration.document,
            &migration.assignment,
            config,
            args.dry_run,
        )?)
    };

    Ok(ConvertSummary {
        project_key: config.project_key.clone(),
        export,
        attachments,
        dry_run: args.dry_run,
    })
}

fn print_summary(summary: &ConvertSummary) {
    let export = &summary.export;
    println!(
        "Wrote {}: {} epic{}, {} stor{}, {} columns",
        export.output_path,
        export.milestones,
        if export.milestones == 1 { "" } else { "s" },
        export.tickets,
        if export.tickets == 1 { "y" } else { "ies" },
        export.columns
    );
    if export.custom_field_fallbacks > 0 {
        println!(
            "  {} custom field value(s) not found; raw ids written",
            export.custom_field_fallbacks
        );
    }

    match &summary.attachments {
        None => println!("Attachments: skipped"),
        Some(report) if summary.dry_run => {
            println!(
                "Attachments (dry run): {} to move, {} already in place",
                report.planned, report.skipped
            );
            for entry in &report.moves {
                println!(
                    "  {} -> {}",
                    entry.source.display(),
                    entry.destination.display()
                );
            }
        }
        Some(report) => println!(
            "Attachments: {} moved, {} already in place",
            report.moved, report.skipped
        ),
    }
}
