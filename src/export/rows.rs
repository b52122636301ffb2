//! Row construction for milestones and tickets.

use super::LEADING_COLUMNS;
use crate::config::MigrationConfig;
use crate::format::{comment_cell, convert_markdown, convert_optional, due_timestamp, escape_delimiter};
use crate::migrate::{IdentifierAssignment, RecordKey};
use crate::model::{CustomFieldSlot, Document, Milestone, Ticket};
use std::collections::HashMap;
use tracing::{debug, warn};

type Row = Vec<String>;

/// Header plus padded rows, ready to be written.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RowSet {
    pub header: Row,
    pub milestone_rows: Vec<Row>,
    pub ticket_rows: Vec<Row>,
    /// Custom field cells that fell back to the raw option id.
    pub custom_field_fallbacks: usize,
}

/// Builds export rows from a loaded document and its identifier assignment.
pub struct RowBuilder<'a> {
    doc: &'a Document,
    assignment: &'a IdentifierAssignment,
    config: &'a MigrationConfig,
    people: HashMap<&'a str, String>,
    severities: HashMap<&'a str, &'a str>,
    milestones: HashMap<&'a str, &'a Milestone>,
    custom_fields: Vec<CustomFieldSlot>,
    max_links: usize,
    max_comments: usize,
    fallbacks: usize,
}

impl<'a> RowBuilder<'a> {
    #[must_use]
    pub fn new(
        doc: &'a Document,
        assignment: &'a IdentifierAssignment,
        config: &'a MigrationConfig,
    ) -> Self {
        let project = &doc.project;
        let people = doc
            .people
            .iter()
            .filter_map(|person| {
                person
                    .display_name(&config.user_mappings)
                    .map(|name| (person.id.as_str(), name))
            })
            .collect();
        let severities = project
            .severities
            .iter()
            .filter_map(|s| s.name.as_deref().map(|name| (s.id.as_str(), name)))
            .collect();
        let milestones = project
            .milestones
            .iter()
            .map(|m| (m.id.as_str(), m))
            .collect();

        let max_links = project
            .tickets
            .iter()
            .map(|t| t.associated_tickets.len())
            .max()
            .unwrap_or(0);
        let max_comments = project
            .tickets
            .iter()
            .map(comment_count)
            .max()
            .unwrap_or(0);

        Self {
            doc,
            assignment,
            config,
            people,
            severities,
            milestones,
            custom_fields: project.custom_field_slots(),
            max_links,
            max_comments,
            fallbacks: 0,
        }
    }

    /// Total number of columns in every row.
    #[must_use]
    pub fn width(&self) -> usize {
        LEADING_COLUMNS.len() + self.custom_fields.len() + self.max_links + self.max_comments
    }

    #[must_use]
    pub fn header(&self) -> Row {
        let mut header: Row = LEADING_COLUMNS.iter().map(ToString::to_string).collect();
        header.extend(self.custom_fields.iter().map(|slot| slot.title.clone()));
        header.extend(std::iter::repeat_n(
            "associated-ticket-number".to_string(),
            self.max_links,
        ));
        header.extend(std::iter::repeat_n("comment".to_string(), self.max_comments));
        header
    }

    /// Build the header and every row.
    #[must_use]
    pub fn build(mut self) -> RowSet {
        let doc = self.doc;
        let header = self.header();
        let milestone_rows = doc
            .project
            .milestones
            .iter()
            .map(|milestone| self.milestone_row(milestone))
            .collect();
        let ticket_rows = doc
            .project
            .tickets
            .iter()
            .map(|ticket| self.ticket_row(ticket))
            .collect();
        RowSet {
            header,
            milestone_rows,
            ticket_rows,
            custom_field_fallbacks: self.fallbacks,
        }
    }

    #[must_use]
    pub fn milestone_row(&self, milestone: &Milestone) -> Row {
        let mut row = vec![
            String::new(),
            self.issue_key(&RecordKey::milestone(milestone)),
            "Epic".to_string(),
            text(milestone.title.as_deref()),
            if milestone.is_closed() { "closed" } else { "new" }.to_string(),
            self.person(milestone.person_responsible_id.as_deref()),
            String::new(),
            String::new(),
            String::new(),
            text(milestone.created_at.as_deref()),
            text(milestone.updated_at.as_deref()),
            due_timestamp(milestone.due_on.as_deref()),
            String::new(),
            milestone.epic_name(),
            String::new(),
            convert_optional(milestone.description.as_deref()),
        ];
        row.resize(self.width(), String::new());
        row
    }

    pub fn ticket_row(&mut self, ticket: &Ticket) -> Row {
        let resolved = ticket.resolution.is_some();
        let mut row = vec![
            ticket.number.to_string(),
            self.issue_key(&RecordKey::ticket(ticket)),
            "Story".to_string(),
            text(ticket.summary.as_deref()),
            text(ticket.status.as_deref()),
            self.person(ticket.assignee_id.as_deref()),
            self.person(ticket.reporter_id.as_deref()),
            text(ticket.resolution.as_deref()),
            self.severity(ticket.severity_id.as_deref()),
            text(ticket.created_at.as_deref()),
            text(ticket.updated_at.as_deref()),
            due_timestamp(ticket.due_on.as_deref()),
            if resolved {
                text(ticket.updated_at.as_deref())
            } else {
                String::new()
            },
            String::new(),
            self.epic_link(ticket),
            convert_optional(ticket.description.as_deref()),
        ];

        let slots: Vec<u8> = self.custom_fields.iter().map(|slot| slot.number).collect();
        for slot in slots {
            let cell = self.custom_field_value(slot, ticket.custom_field_value_id(slot));
            row.push(cell);
        }

        let mut links: Row = ticket.linked_numbers().map(|n| n.to_string()).collect();
        links.resize(self.max_links, String::new());
        row.extend(links);

        let mut comments = self.ticket_comments(ticket);
        comments.resize(self.max_comments, String::new());
        row.extend(comments);

        row
    }

    /// Comment cells of a ticket: provenance, optional resolution, then the
    /// ticket's own comments in order.
    #[must_use]
    pub fn ticket_comments(&self, ticket: &Ticket) -> Vec<String> {
        let import_user = Some(self.config.import_user.as_str());
        let updated_at = ticket.updated_at.as_deref();

        let mut cells = vec![comment_cell(
            updated_at,
            import_user,
            &format!(
                "Migrated from Unfuddle #{}: {}",
                ticket.number,
                self.source_url(ticket.number)
            ),
        )];

        if let (Some(_), Some(description)) = (&ticket.resolution, &ticket.resolution_description)
        {
            cells.push(comment_cell(
                updated_at,
                import_user,
                &format!("Resolution: {}", escape_delimiter(description)),
            ));
        }

        cells.extend(ticket.comments.iter().map(|comment| {
            let author = self.person(comment.author_id.as_deref());
            let body = escape_delimiter(&convert_markdown(comment.body.as_deref().unwrap_or_default()));
            comment_cell(comment.created_at.as_deref(), Some(&author), &body)
        }));

        cells
    }

    /// URL of a ticket in the source tracker.
    #[must_use]
    pub fn source_url(&self, number: u64) -> String {
        let host = self
            .doc
            .subdomain
            .as_deref()
            .filter(|s| !s.is_empty())
            .map_or_else(|| "unfuddle.com".to_string(), |s| format!("{s}.unfuddle.com"));
        let project_id = self.doc.project.id.as_deref().unwrap_or_default();
        format!("https://{host}/a#/projects/{project_id}/tickets/by_number/{number}")
    }

    /// Option value for a custom field cell, echoing the raw id on a miss.
    pub fn custom_field_value(&mut self, slot: u8, value_id: Option<&str>) -> String {
        let Some(value_id) = value_id else {
            return String::new();
        };
        let slot_text = slot.to_string();
        let found = self.doc.project.custom_field_values.iter().find(|option| {
            option.id == value_id && option.field_number.as_deref() == Some(slot_text.as_str())
        });
        match found.and_then(|option| option.value.clone()) {
            Some(value) => value,
            None => {
                self.fallbacks += 1;
                debug!(slot, value_id, "Custom field option not found, using raw id");
                value_id.to_string()
            }
        }
    }

    fn issue_key(&self, record: &RecordKey) -> String {
        // Every record in the document is allocated before rows are built.
        self.assignment
            .get(record)
            .map(|number| self.config.issue_key(number))
            .unwrap_or_default()
    }

    fn person(&self, id: Option<&str>) -> String {
        id.and_then(|id| self.people.get(id))
            .cloned()
            .unwrap_or_default()
    }

    fn severity(&self, id: Option<&str>) -> String {
        id.and_then(|id| self.severities.get(id))
            .map(ToString::to_string)
            .unwrap_or_default()
    }

    fn epic_link(&self, ticket: &Ticket) -> String {
        let Some(milestone_id) = ticket.milestone_id.as_deref() else {
            return String::new();
        };
        match self.milestones.get(milestone_id) {
            Some(milestone) => milestone.epic_name(),
            None => {
                warn!(
                    ticket = ticket.number,
                    milestone = milestone_id,
                    "Ticket refers to an unknown milestone"
                );
                String::new()
            }
        }
    }
}

/// Number of comment cells a ticket produces.
fn comment_count(ticket: &Ticket) -> usize {
    let resolution = usize::from(ticket.resolution.is_some() && ticket.resolution_description.is_some());
    1 + resolution + ticket.comments.len()
}

fn text(value: Option<&str>) -> String {
    value.unwrap_or_default().to_string()
}
