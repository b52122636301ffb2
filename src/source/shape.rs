//! Shape normalization for collection fields.
//!
//! Converting XML into nested records loses cardinality information: a
//! collection field may come through as
//!
//! - nothing at all, or a whitespace string (no items),
//! - a wrapper `{ "attachment": {...} }` (one item),
//! - a wrapper `{ "attachment": [{...}, {...}] }` (several items),
//! - an array (typed arrays, or an already unwrapped list).
//!
//! [`normalize_to_list`] rewrites any of these into a JSON array of records in
//! place. Shapes that fit none of the above degrade to an empty list.

use serde_json::{Map, Value};
use tracing::debug;

/// Singular element name used by the backup for a collection key.
#[must_use]
pub fn singularize(key: &str) -> String {
    if key == "people" {
        return "person".to_string();
    }
    if let Some(stem) = key.strip_suffix("ies") {
        return format!("{stem}y");
    }
    key.strip_suffix('s').unwrap_or(key).to_string()
}

/// Force `container[key]` into an array of records, unwrapping `nested_key`.
///
/// When `nested_key` is `None` the singular form of `key` is used, so
/// `attachments` unwraps `attachment` and `people` unwraps `person`.
pub fn normalize_to_list(container: &mut Map<String, Value>, key: &str, nested_key: Option<&str>) {
    let nested_key = nested_key.map_or_else(|| singularize(key), str::to_string);
    let raw = container.remove(key).unwrap_or(Value::Null);
    let items = to_list(raw, &nested_key, key);
    container.insert(key.to_string(), Value::Array(items));
}

/// Like [`normalize_to_list`] but for a container that is itself a `Value`.
///
/// Non-object containers are left untouched.
pub fn normalize_field(container: &mut Value, key: &str, nested_key: Option<&str>) {
    if let Value::Object(map) = container {
        normalize_to_list(map, key, nested_key);
    }
}

fn to_list(raw: Value, nested_key: &str, key: &str) -> Vec<Value> {
    match raw {
        Value::Null => Vec::new(),
        Value::String(text) => {
            if !text.trim().is_empty() {
                debug!(field = key, "Discarding text found where a list was expected");
            }
            Vec::new()
        }
        Value::Object(mut map) => match map.remove(nested_key) {
            Some(inner) => unwrap_inner(inner, key),
            None if map.is_empty() => Vec::new(),
            None => vec![Value::Object(map)],
        },
        Value::Array(items) => items
            .into_iter()
            .flat_map(|item| match item {
                Value::Object(mut map) if map.len() == 1 && map.contains_key(nested_key) => {
                    map.remove(nested_key)
                        .map_or_else(Vec::new, |inner| unwrap_inner(inner, key))
                }
                Value::Object(map) => vec![Value::Object(map)],
                other => {
                    debug!(field = key, value = %other, "Dropping non-record list item");
                    Vec::new()
                }
            })
            .collect(),
        other => {
            debug!(field = key, value = %other, "Unexpected shape for list field");
            Vec::new()
        }
    }
}

fn unwrap_inner(inner: Value, key: &str) -> Vec<Value> {
    match inner {
        Value::Object(record) => vec![Value::Object(record)],
        Value::Array(records) => records
            .into_iter()
            .filter(|record| {
                let keep = record.is_object();
                if !keep {
                    debug!(field = key, value = %record, "Dropping non-record list item");
                }
                keep
            })
            .collect(),
        Value::Null => Vec::new(),
        other => {
            debug!(field = key, value = %other, "Unexpected wrapped value for list field");
            Vec::new()
        }
    }
}
