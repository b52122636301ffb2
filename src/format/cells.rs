//! Cell level formatting shared by milestone and ticket rows.

use chrono::NaiveDate;
use tracing::warn;

/// Separator between the timestamp, author and body of a comment cell.
pub const COMMENT_DELIMITER: char = ';';

/// Replace the comment delimiter so a body cannot add fields to its cell.
#[must_use]
pub fn escape_delimiter(text: &str) -> String {
    text.replace(COMMENT_DELIMITER, ".")
}

/// Join a comment cell as `timestamp;author;body`.
///
/// The body is expected to be escaped already.
#[must_use]
pub fn comment_cell(timestamp: Option<&str>, author: Option<&str>, body: &str) -> String {
    [timestamp.unwrap_or_default(), author.unwrap_or_default(), body].join(";")
}

/// Widen a `YYYY-MM-DD` due date to midnight UTC (`YYYY-MM-DDT00:00:00Z`).
///
/// Dates that do not parse are passed on with the same suffix appended, which
/// is what the importer would have received from the unvalidated backup.
#[must_use]
pub fn due_timestamp(date: Option<&str>) -> String {
    let Some(date) = date.map(str::trim).filter(|d| !d.is_empty()) else {
        return String::new();
    };
    match NaiveDate::parse_from_str(date, "%Y-%m-%d") {
        Ok(day) => day.format("%Y-%m-%dT00:00:00Z").to_string(),
        Err(err) => {
            warn!(date, %err, "Due date is not YYYY-MM-DD");
            format!("{date}T00:00:00Z")
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn due_dates_are_widened_to_midnight_utc() {
        assert_eq!(due_timestamp(Some("2014-03-09")), "2014-03-09T00:00:00Z");
        assert_eq!(due_timestamp(Some(" 2014-03-09\n")), "2014-03-09T00:00:00Z");
        assert_eq!(due_timestamp(None), "");
        assert_eq!(due_timestamp(Some("  ")), "");
    }

    #[test]
    fn unparsable_due_date_keeps_text() {
        assert_eq!(due_timestamp(Some("next week")), "next weekT00:00:00Z");
    }

    #[test]
    fn comment_cell_joins_fields() {
        assert_eq!(
            comment_cell(Some("2014-01-01T10:00:00Z"), Some("ann"), "hello"),
            "2014-01-01T10:00:00Z;ann;hello"
        );
        assert_eq!(comment_cell(None, None, "x"), ";;x");
    }

    #[test]
    fn delimiter_is_replaced() {
        assert_eq!(escape_delimiter("a;b;c"), "a.b.c");
    }
}
