//! Typed records of an Unfuddle backup.
//!
//! These types are deserialized from the nested tree produced by
//! [`crate::source`] *after* shape normalization, so every collection field is
//! a plain `Vec` and downstream code never checks for alternative shapes.
//! Scalars in the backup are all text; blank text is read as absent.

use once_cell::sync::Lazy;
use regex::Regex;
use serde::{Deserialize, Deserializer};
use serde_json::Value;
use std::collections::HashMap;

static WHITESPACE_RUN: Lazy<Regex> = Lazy::new(|| Regex::new(r"\s+").expect("valid regex"));
static NON_NAME_CHARS: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"[^A-Za-z0-9_-]").expect("valid regex"));

/// The whole parsed export: the selected project plus account-level data.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Document {
    pub subdomain: Option<String>,
    pub people: Vec<Person>,
    pub project: Project,
}

/// A user account in the backup.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct Person {
    #[serde(deserialize_with = "required_id")]
    pub id: String,
    #[serde(default, deserialize_with = "opt_text")]
    pub username: Option<String>,
    #[serde(default, deserialize_with = "opt_text")]
    pub first_name: Option<String>,
}

impl Person {
    /// Name used in the target system, after applying `user_mappings`.
    ///
    /// Falls back to `term_<first name>` for accounts without a username.
    #[must_use]
    pub fn display_name(&self, user_mappings: &HashMap<String, String>) -> Option<String> {
        let name = match (&self.username, &self.first_name) {
            (Some(username), _) => username.trim().to_string(),
            (None, Some(first)) => format!("term_{}", first.trim().to_lowercase()),
            (None, None) => return None,
        };
        Some(user_mappings.get(&name).cloned().unwrap_or(name))
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct Severity {
    #[serde(deserialize_with = "required_id")]
    pub id: String,
    #[serde(default, deserialize_with = "opt_text")]
    pub name: Option<String>,
}

/// One selectable option of a project custom field.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct CustomFieldValue {
    #[serde(deserialize_with = "required_id")]
    pub id: String,
    #[serde(default, deserialize_with = "opt_id")]
    pub field_number: Option<String>,
    #[serde(default, deserialize_with = "opt_text")]
    pub value: Option<String>,
}

/// A configured custom field slot (1..=3) with its column title.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CustomFieldSlot {
    pub number: u8,
    pub title: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct Project {
    #[serde(default, deserialize_with = "opt_id")]
    pub id: Option<String>,
    #[serde(default, deserialize_with = "opt_text")]
    pub title: Option<String>,
    #[serde(default, deserialize_with = "opt_text")]
    pub ticket_field1_title: Option<String>,
    #[serde(default, deserialize_with = "opt_text")]
    pub ticket_field2_title: Option<String>,
    #[serde(default, deserialize_with = "opt_text")]
    pub ticket_field3_title: Option<String>,
    #[serde(default)]
    pub custom_field_values: Vec<CustomFieldValue>,
    #[serde(default)]
    pub severities: Vec<Severity>,
    #[serde(default)]
    pub milestones: Vec<Milestone>,
    #[serde(default)]
    pub tickets: Vec<Ticket>,
}

impl Project {
    /// Custom field slots that carry a title, in slot order.
    #[must_use]
    pub fn custom_field_slots(&self) -> Vec<CustomFieldSlot> {
        [
            &self.ticket_field1_title,
            &self.ticket_field2_title,
            &self.ticket_field3_title,
        ]
        .into_iter()
        .zip(1u8..)
        .filter_map(|(title, number)| {
            title.as_ref().map(|title| CustomFieldSlot {
                number,
                title: title.clone(),
            })
        })
        .collect()
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct Milestone {
    #[serde(deserialize_with = "required_id")]
    pub id: String,
    #[serde(default, deserialize_with = "opt_text")]
    pub title: Option<String>,
    #[serde(default, deserialize_with = "opt_text")]
    pub description: Option<String>,
    #[serde(default, deserialize_with = "opt_text")]
    pub created_at: Option<String>,
    #[serde(default, deserialize_with = "opt_text")]
    pub updated_at: Option<String>,
    #[serde(default, deserialize_with = "opt_text")]
    pub due_on: Option<String>,
    #[serde(default, deserialize_with = "flag")]
    pub completed: bool,
    #[serde(default, deserialize_with = "flag")]
    pub archived: bool,
    #[serde(default, deserialize_with = "opt_id")]
    pub person_responsible_id: Option<String>,
}

impl Milestone {
    /// Normalized name used for the epic name and epic link columns.
    ///
    /// Empty when the milestone has no title.
    #[must_use]
    pub fn epic_name(&self) -> String {
        self.title.as_deref().map(epic_name).unwrap_or_default()
    }

    #[must_use]
    pub const fn is_closed(&self) -> bool {
        self.completed || self.archived
    }
}

/// Collapse whitespace runs to `-` and strip anything outside `[A-Za-z0-9_-]`.
#[must_use]
pub fn epic_name(title: &str) -> String {
    let dashed = WHITESPACE_RUN.replace_all(title, "-");
    NON_NAME_CHARS.replace_all(&dashed, "").into_owned()
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct Ticket {
    #[serde(deserialize_with = "ticket_number")]
    pub number: u64,
    #[serde(default, deserialize_with = "opt_text")]
    pub summary: Option<String>,
    #[serde(default, deserialize_with = "opt_text")]
    pub description: Option<String>,
    #[serde(default, deserialize_with = "opt_text")]
    pub status: Option<String>,
    #[serde(default, deserialize_with = "opt_text")]
    pub resolution: Option<String>,
    #[serde(default, deserialize_with = "opt_text")]
    pub resolution_description: Option<String>,
    #[serde(default, deserialize_with = "opt_id")]
    pub severity_id: Option<String>,
    #[serde(default, deserialize_with = "opt_id")]
    pub assignee_id: Option<String>,
    #[serde(default, deserialize_with = "opt_id")]
    pub reporter_id: Option<String>,
    #[serde(default, deserialize_with = "opt_text")]
    pub created_at: Option<String>,
    #[serde(default, deserialize_with = "opt_text")]
    pub updated_at: Option<String>,
    #[serde(default, deserialize_with = "opt_text")]
    pub due_on: Option<String>,
    #[serde(default, deserialize_with = "opt_id")]
    pub milestone_id: Option<String>,
    #[serde(default, deserialize_with = "opt_id")]
    pub field1_value_id: Option<String>,
    #[serde(default, deserialize_with = "opt_id")]
    pub field2_value_id: Option<String>,
    #[serde(default, deserialize_with = "opt_id")]
    pub field3_value_id: Option<String>,
    #[serde(default)]
    pub comments: Vec<Comment>,
    #[serde(default)]
    pub attachments: Vec<Attachment>,
    #[serde(default)]
    pub associated_tickets: Vec<AssociatedTicketRef>,
}

impl Ticket {
    /// Stored option id for custom field `slot` (1..=3).
    #[must_use]
    pub fn custom_field_value_id(&self, slot: u8) -> Option<&str> {
        match slot {
            1 => self.field1_value_id.as_deref(),
            2 => self.field2_value_id.as_deref(),
            3 => self.field3_value_id.as_deref(),
            _ => None,
        }
    }

    /// Attachments of the ticket followed by those of its comments, in order.
    pub fn all_attachments(&self) -> impl Iterator<Item = &Attachment> {
        self.attachments
            .iter()
            .chain(self.comments.iter().flat_map(|c| c.attachments.iter()))
    }

    /// Ticket numbers this ticket links to.
    pub fn linked_numbers(&self) -> impl Iterator<Item = u64> + '_ {
        self.associated_tickets.iter().map(|link| link.number)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct Comment {
    #[serde(default, deserialize_with = "opt_text")]
    pub created_at: Option<String>,
    #[serde(default, deserialize_with = "opt_id")]
    pub author_id: Option<String>,
    #[serde(default, deserialize_with = "opt_text")]
    pub body: Option<String>,
    #[serde(default)]
    pub attachments: Vec<Attachment>,
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct Attachment {
    #[serde(deserialize_with = "required_id")]
    pub id: String,
    #[serde(default, deserialize_with = "opt_text")]
    pub filename: Option<String>,
}

/// Reference from one ticket to another, by ticket number.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Deserialize)]
pub struct AssociatedTicketRef {
    #[serde(deserialize_with = "ticket_number")]
    pub number: u64,
}

fn scalar_text(value: Value) -> Option<String> {
    match value {
        Value::String(s) if !s.trim().is_empty() => Some(s),
        Value::Number(n) => Some(n.to_string()),
        Value::Bool(b) => Some(b.to_string()),
        _ => None,
    }
}

fn opt_text<'de, D>(deserializer: D) -> Result<Option<String>, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(scalar_text(Value::deserialize(deserializer)?))
}

fn opt_id<'de, D>(deserializer: D) -> Result<Option<String>, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(scalar_text(Value::deserialize(deserializer)?).map(|s| s.trim().to_string()))
}

fn required_id<'de, D>(deserializer: D) -> Result<String, D::Error>
where
    D: Deserializer<'de>,
{
    opt_id(deserializer)?.ok_or_else(|| serde::de::Error::custom("missing id"))
}

fn ticket_number<'de, D>(deserializer: D) -> Result<u64, D::Error>
where
    D: Deserializer<'de>,
{
    let raw = opt_id(deserializer)?
        .ok_or_else(|| serde::de::Error::custom("missing ticket number"))?;
    raw.parse::<u64>()
        .map_err(|_| serde::de::Error::custom(format!("ticket number {raw:?} is not a non-negative integer")))
}

fn flag<'de, D>(deserializer: D) -> Result<bool, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(matches!(
        opt_id(deserializer)?.as_deref(),
        Some("true" | "1")
    ))
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn epic_name_collapses_whitespace_and_strips_symbols() {
        assert_eq!(epic_name("Release  2.0 (beta)"), "Release-20-beta");
        assert_eq!(epic_name("  spaced\tout "), "-spaced-out-");
        assert_eq!(epic_name("snake_case-ok"), "snake_case-ok");
    }

    #[test]
    fn milestone_without_title_has_empty_epic_name() {
        let milestone: Milestone = serde_json::from_value(json!({"id": "1"})).unwrap();
        assert_eq!(milestone.epic_name(), "");
    }

    #[test]
    fn display_name_prefers_username_then_first_name() {
        let mappings = HashMap::new();
        let with_username: Person =
            serde_json::from_value(json!({"id": "1", "username": "jdoe", "first_name": "John"}))
                .unwrap();
        assert_eq!(with_username.display_name(&mappings).as_deref(), Some("jdoe"));

        let without: Person =
            serde_json::from_value(json!({"id": "2", "first_name": "Mary"})).unwrap();
        assert_eq!(without.display_name(&mappings).as_deref(), Some("term_mary"));

        let anonymous: Person = serde_json::from_value(json!({"id": "3"})).unwrap();
        assert_eq!(anonymous.display_name(&mappings), None);
    }

    #[test]
    fn display_name_applies_user_mappings() {
        let mappings = HashMap::from([("jdoe".to_string(), "john.doe".to_string())]);
        let person: Person =
            serde_json::from_value(json!({"id": "1", "username": "jdoe"})).unwrap();
        assert_eq!(person.display_name(&mappings).as_deref(), Some("john.doe"));
    }

    #[test]
    fn blank_text_reads_as_absent() {
        let ticket: Ticket = serde_json::from_value(json!({
            "number": " 12 ",
            "resolution": "  \n",
            "summary": "Crash on save",
        }))
        .unwrap();
        assert_eq!(ticket.number, 12);
        assert_eq!(ticket.resolution, None);
        assert_eq!(ticket.summary.as_deref(), Some("Crash on save"));
    }

    #[test]
    fn ticket_number_must_be_numeric() {
        let err = serde_json::from_value::<Ticket>(json!({"number": "abc"})).unwrap_err();
        assert!(err.to_string().contains("not a non-negative integer"));
    }

    #[test]
    fn milestone_flags_parse_text_booleans() {
        let milestone: Milestone =
            serde_json::from_value(json!({"id": "4", "completed": "true", "archived": "false"}))
                .unwrap();
        assert!(milestone.completed);
        assert!(!milestone.archived);
        assert!(milestone.is_closed());
    }

    #[test]
    fn custom_field_slots_skip_untitled() {
        let project: Project = serde_json::from_value(json!({
            "ticket_field1_title": "Component",
            "ticket_field3_title": "Browser",
        }))
        .unwrap();
        let slots = project.custom_field_slots();
        assert_eq!(
            slots,
            vec![
                CustomFieldSlot { number: 1, title: "Component".to_string() },
                CustomFieldSlot { number: 3, title: "Browser".to_string() },
            ]
        );
    }

    #[test]
    fn all_attachments_includes_comment_attachments() {
        let ticket: Ticket = serde_json::from_value(json!({
            "number": "1",
            "attachments": [{"id": "10", "filename": "a.png"}],
            "comments": [{"body": "see", "attachments": [{"id": "11", "filename": "b.png"}]}],
        }))
        .unwrap();
        let ids: Vec<&str> = ticket.all_attachments().map(|a| a.id.as_str()).collect();
        assert_eq!(ids, vec!["10", "11"]);
    }
}
