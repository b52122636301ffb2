//! Loading an Unfuddle backup into the typed model.
//!
//! Loading is a single pass, finished before anything else looks at the data:
//!
//! 1. XML text to nested tree ([`xml`])
//! 2. Shape normalization of every collection field ([`shape`])
//! 3. Typed deserialization into [`crate::model`]
//! 4. Validation (unique ticket numbers and milestone ids), ticket ordering,
//!    duplicate milestone renaming and link deduplication

pub mod shape;
pub mod xml;

use crate::error::{MigrateError, Result};
use crate::migrate::links::dedupe_links;
use crate::model::{Document, Milestone, Person, Project, epic_name};
use serde::Deserialize;
use serde_json::Value;
use std::collections::{HashMap, HashSet};
use std::fs;
use std::path::Path;
use tracing::info;

pub use shape::{normalize_field, normalize_to_list, singularize};

/// Options for turning a backup into a [`Document`].
#[derive(Debug, Clone, Default)]
pub struct LoadOptions {
    /// Project to migrate; the first project of the backup when `None`.
    pub project_id: Option<String>,
}

#[derive(Debug, Deserialize)]
struct Account {
    #[serde(default)]
    subdomain: Option<String>,
    #[serde(default)]
    people: Vec<Person>,
    #[serde(default)]
    projects: Vec<Project>,
}

/// Read and load a backup file.
///
/// # Errors
///
/// Returns an error if the file cannot be read, is not well-formed XML, has
/// records of the wrong type, or fails validation.
pub fn load_document(path: &Path, options: &LoadOptions) -> Result<Document> {
    info!(path = %path.display(), "Parsing backup XML (this may take a while)");
    let text = fs::read_to_string(path)?;
    document_from_xml(&text, options)
}

/// Load a backup from XML text.
///
/// # Errors
///
/// See [`load_document`].
pub fn document_from_xml(text: &str, options: &LoadOptions) -> Result<Document> {
    let tree = xml::parse_tree(text)?;
    document_from_tree(tree, options)
}

/// Load a backup from an already parsed tree (`{ "account": {...} }`).
///
/// # Errors
///
/// See [`load_document`].
pub fn document_from_tree(tree: Value, options: &LoadOptions) -> Result<Document> {
    let mut account = match tree {
        Value::Object(mut root) => root.remove("account").unwrap_or(Value::Object(root)),
        other => other,
    };
    normalize_account(&mut account);

    let account: Account = serde_json::from_value(account)?;
    let subdomain = account.subdomain.map(|s| s.trim().to_string());
    let mut project = select_project(account.projects, options.project_id.as_deref())?;

    validate_unique_ids(&project)?;

    info!(count = project.milestones.len(), "Parsing milestones");
    rename_duplicate_milestones(&mut project.milestones);

    info!(count = project.tickets.len(), "Parsing tickets");
    project.tickets.sort_by_key(|ticket| ticket.number);
    dedupe_links(&mut project.tickets);

    Ok(Document {
        subdomain,
        people: account.people,
        project,
    })
}

/// Apply shape normalization to every collection field of the account tree.
pub fn normalize_account(account: &mut Value) {
    normalize_field(account, "projects", None);
    normalize_field(account, "people", None);

    let Some(projects) = account.get_mut("projects").and_then(Value::as_array_mut) else {
        return;
    };
    for project in projects {
        for key in ["custom_field_values", "milestones", "tickets", "severities"] {
            normalize_field(project, key, None);
        }
        let Some(tickets) = project.get_mut("tickets").and_then(Value::as_array_mut) else {
            continue;
        };
        for ticket in tickets {
            normalize_field(ticket, "comments", None);
            normalize_field(ticket, "attachments", None);
            normalize_field(ticket, "associated_tickets", Some("ticket"));

            if let Some(comments) = ticket.get_mut("comments").and_then(Value::as_array_mut) {
                for comment in comments {
                    normalize_field(comment, "attachments", None);
                }
            }
        }
    }
}

fn select_project(projects: Vec<Project>, project_id: Option<&str>) -> Result<Project> {
    match project_id {
        None => projects
            .into_iter()
            .next()
            .ok_or_else(|| MigrateError::validation("backup", "contains no projects")),
        Some(wanted) => {
            let available: Vec<String> = projects.iter().filter_map(|p| p.id.clone()).collect();
            projects
                .into_iter()
                .find(|project| project.id.as_deref() == Some(wanted))
                .ok_or_else(|| {
                    MigrateError::validation(
                        "project-id",
                        format!(
                            "no project with id {wanted} (available: {})",
                            available.join(", ")
                        ),
                    )
                })
        }
    }
}

fn validate_unique_ids(project: &Project) -> Result<()> {
    let mut numbers = HashSet::new();
    for ticket in &project.tickets {
        if !numbers.insert(ticket.number) {
            return Err(MigrateError::validation(
                "ticket number",
                format!("{} appears more than once", ticket.number),
            ));
        }
    }

    let mut ids = HashSet::new();
    for milestone in &project.milestones {
        if !ids.insert(milestone.id.as_str()) {
            return Err(MigrateError::validation(
                "milestone id",
                format!("{} appears more than once", milestone.id),
            ));
        }
    }
    Ok(())
}

/// Append `-1`, `-2`, ... to milestones whose epic names collide.
///
/// Indices follow the stored order of the colliding milestones. An index whose
/// epic name is already taken (by another milestone, or by an earlier rename)
/// is skipped, so epic names are unique afterwards. Milestones without a title
/// are left alone.
pub fn rename_duplicate_milestones(milestones: &mut [Milestone]) {
    let mut groups: HashMap<String, Vec<usize>> = HashMap::new();
    for (index, milestone) in milestones.iter().enumerate() {
        if milestone.title.is_some() {
            groups.entry(milestone.epic_name()).or_default().push(index);
        }
    }
    let mut taken: HashSet<String> = groups.keys().cloned().collect();

    let mut duplicates: Vec<Vec<usize>> = groups
        .into_values()
        .filter(|indices| indices.len() > 1)
        .collect();
    duplicates.sort_by_key(|indices| indices[0]);

    for indices in duplicates {
        let mut n = 0;
        for index in indices {
            let Some(title) = milestones[index].title.as_mut() else {
                continue;
            };
            let renamed = loop {
                n += 1;
                let candidate = format!("{title}-{n}");
                if taken.insert(epic_name(&candidate)) {
                    break candidate;
                }
            };
            info!(from = %title, to = %renamed, "Renamed duplicate milestone");
            *title = renamed;
        }
    }
}
