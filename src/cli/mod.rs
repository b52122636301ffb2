//! Command line interface.

pub mod commands;

use crate::config::{self, CliOverrides, parse_user_mapping};
use crate::logging::init_logging;
use anyhow::Context;
use clap::{ArgAction, Args, Parser, Subcommand};
use std::path::PathBuf;

#[derive(Parser, Debug)]
#[command(name = "u2j", version)]
#[command(about = "Convert an Unfuddle backup into a JIRA CSV import")]
#[command(
    long_about = "Convert an Unfuddle backup into a JIRA CSV import.\n\n\
    Milestones become epics, tickets become stories, and attachment files are\n\
    moved into one directory per issue key for the JIRA importer."
)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,

    /// Increase logging verbosity (-v debug, -vv trace)
    #[arg(short, long, action = ArgAction::Count, global = true)]
    pub verbose: u8,

    /// Only log errors
    #[arg(short, long, global = true)]
    pub quiet: bool,

    /// Append debug-level JSON logs to this file
    #[arg(long, global = true, value_name = "PATH")]
    pub log_file: Option<PathBuf>,

    /// Config file (default: u2j.yaml in the working directory, if present)
    #[arg(long, global = true, env = "U2J_CONFIG", value_name = "PATH")]
    pub config: Option<PathBuf>,

    #[command(flatten)]
    pub overrides: OverrideArgs,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Write the CSV file and relocate attachments
    Convert(ConvertArgs),

    /// Print the issue key assigned to every milestone and ticket
    Keys(KeysArgs),
}

#[derive(Args, Debug, Default)]
pub struct ConvertArgs {
    /// Plan attachment moves without touching any attachment file
    #[arg(long)]
    pub dry_run: bool,

    /// Only write the CSV file
    #[arg(long, conflicts_with = "dry_run")]
    pub skip_attachments: bool,

    /// Print the run summary as JSON
    #[arg(long)]
    pub json: bool,
}

#[derive(Args, Debug, Default)]
pub struct KeysArgs {
    /// Print the assignment as JSON
    #[arg(long)]
    pub json: bool,
}

/// Flags that override config file and environment values.
#[derive(Args, Debug, Default)]
pub struct OverrideArgs {
    /// JIRA project key used in issue keys
    #[arg(long, global = true, value_name = "KEY")]
    pub project_key: Option<String>,

    /// Ticket numbers at or below this are renumbered
    #[arg(long, global = true, value_name = "N")]
    pub issue_number_offset: Option<u64>,

    /// Author of the comments added during migration
    #[arg(long, global = true, value_name = "USER")]
    pub import_user: Option<String>,

    /// Unfuddle backup XML file
    #[arg(long, global = true, value_name = "PATH")]
    pub backup_file: Option<PathBuf>,

    /// Directory of attachment files named by attachment id
    #[arg(long, global = true, value_name = "DIR")]
    pub attachments_dir: Option<PathBuf>,

    /// Root of the per-issue attachment tree (default: --attachments-dir)
    #[arg(long, global = true, value_name = "DIR")]
    pub attachments_output_dir: Option<PathBuf>,

    /// CSV file to write
    #[arg(long, global = true, value_name = "PATH")]
    pub output_file: Option<PathBuf>,

    /// Id of the project to migrate (default: first project in the backup)
    #[arg(long, global = true, value_name = "ID")]
    pub project_id: Option<String>,

    /// Map an Unfuddle user name to a JIRA user name (repeatable)
    #[arg(long = "user-mapping", global = true, value_name = "NAME=USER", value_parser = parse_user_mapping)]
    pub user_mappings: Vec<(String, String)>,
}

impl OverrideArgs {
    #[must_use]
    pub fn to_overrides(&self) -> CliOverrides {
        CliOverrides {
            project_key: self.project_key.clone(),
            issue_number_offset: self.issue_number_offset,
            import_user: self.import_user.clone(),
            backup_file: self.backup_file.clone(),
            attachments_dir: self.attachments_dir.clone(),
            attachments_output_dir: self.attachments_output_dir.clone(),
            output_file: self.output_file.clone(),
            project_id: self.project_id.clone(),
            user_mappings: self.user_mappings.clone(),
        }
    }
}

/// Initialize logging, resolve configuration and run the chosen command.
///
/// # Errors
///
/// Returns an error if logging or configuration cannot be set up, or the
/// command fails.
pub fn run(cli: Cli) -> anyhow::Result<()> {
    init_logging(cli.verbose, cli.quiet, cli.log_file.as_deref())?;

    let config = config::load_config(cli.config.as_deref(), &cli.overrides.to_overrides())
        .context("failed to load configuration")?;

    match &cli.command {
        Commands::Convert(args) => commands::convert::execute(args, &config)?,
        Commands::Keys(args) => commands::keys::execute(args, &config)?,
    }
    Ok(())
}
