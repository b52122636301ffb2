//! Text formatting for exported cells.
//!
//! - [`markup`] - markdown to JIRA wiki markup
//! - [`cells`] - timestamps and comment cells

pub mod cells;
pub mod markup;

pub use cells::{COMMENT_DELIMITER, comment_cell, due_timestamp, escape_delimiter};
pub use markup::{convert_markdown, convert_optional};
