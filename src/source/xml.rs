//! XML backup to nested key/value tree.
//!
//! Follows the Rails `Hash.from_xml` conventions the Unfuddle backup was
//! written for: tag names become keys (dashes turned into underscores),
//! repeated sibling tags collapse into an array, `type="array"` elements are
//! arrays, empty or `nil="true"` elements are null and text is kept verbatim.
//! Because of that last rule an "empty" collection with only whitespace inside
//! comes through as a whitespace string; [`super::shape`] deals with it.

use crate::error::Result;
use roxmltree::{Document, Node};
use serde_json::{Map, Value};
use std::collections::HashSet;

/// Parse backup XML text into a tree rooted at the document element.
///
/// Returns a single-key object `{ <root tag>: <root value> }`.
///
/// # Errors
///
/// Returns an error if the text is not well-formed XML.
pub fn parse_tree(text: &str) -> Result<Value> {
    // Form feeds are not legal XML 1.0 characters but do show up in old backups.
    let cleaned = text.replace('\u{c}', " ");
    let doc = Document::parse(&cleaned)?;
    let root = doc.root_element();

    let mut map = Map::new();
    map.insert(key_for(root), element_value(root));
    Ok(Value::Object(map))
}

fn key_for(node: Node<'_, '_>) -> String {
    node.tag_name().name().replace('-', "_")
}

fn element_value(node: Node<'_, '_>) -> Value {
    if node.attribute("nil") == Some("true") {
        return Value::Null;
    }

    let mut children = node.children().filter(Node::is_element).peekable();

    if node.attribute("type") == Some("array") {
        return Value::Array(children.map(element_value).collect());
    }

    if children.peek().is_none() {
        let text: String = node
            .children()
            .filter(Node::is_text)
            .filter_map(|child| child.text())
            .collect();
        return if text.is_empty() {
            Value::Null
        } else {
            Value::String(text)
        };
    }

    let mut map = Map::new();
    let mut repeated = HashSet::new();
    for child in children {
        let key = key_for(child);
        let value = element_value(child);
        match map.get_mut(&key) {
            Some(Value::Array(items)) if repeated.contains(&key) => items.push(value),
            Some(existing) => {
                let first = existing.take();
                *existing = Value::Array(vec![first, value]);
                repeated.insert(key);
            }
            None => {
                map.insert(key, value);
            }
        }
    }
    Value::Object(map)
}
