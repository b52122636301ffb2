//! Markdown to JIRA wiki markup.
//!
//! Only the constructs Unfuddle users commonly wrote are rewritten: fenced
//! code blocks (with and without a language), inline code and links. All other
//! text passes through untouched.

use once_cell::sync::Lazy;
use regex::Regex;

static FENCED_WITH_LANGUAGE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?s)```([a-z]+)(.*?)```").expect("valid regex"));
static FENCED: Lazy<Regex> = Lazy::new(|| Regex::new(r"(?s)```(.*?)```").expect("valid regex"));
static INLINE_CODE: Lazy<Regex> = Lazy::new(|| Regex::new(r"`([^`]+?)`").expect("valid regex"));
static LINK: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?s)\[(.+?)\]\s*\(([^)]+)\)").expect("valid regex"));

/// Convert markdown text to JIRA markup.
#[must_use]
pub fn convert_markdown(text: &str) -> String {
    let text = FENCED_WITH_LANGUAGE.replace_all(text, "{code:${1}}${2}{code}");
    let text = FENCED.replace_all(&text, "{code}${1}{code}");
    let text = INLINE_CODE.replace_all(&text, "{{${1}}}");
    LINK.replace_all(&text, "[${1}|${2}]").into_owned()
}

/// [`convert_markdown`] for optional fields.
#[must_use]
pub fn convert_optional(text: Option<&str>) -> String {
    text.map(convert_markdown).unwrap_or_default()
}
