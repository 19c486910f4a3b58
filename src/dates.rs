//! Date fields

use chrono::format::{Item, StrftimeItems};
use chrono::{DateTime, NaiveDate, Utc};
use std::fmt::Write;

/// Parse an upstream timestamp (RFC 3339, or a bare `YYYY-MM-DD` date)
pub fn parse_timestamp(raw: &str) -> Option<DateTime<Utc>> {
    if let Ok(parsed) = DateTime::parse_from_rfc3339(raw) {
        return Some(parsed.with_timezone(&Utc));
    }
    NaiveDate::parse_from_str(raw, "%Y-%m-%d")
        .ok()
        .and_then(|date| date.and_hms_opt(0, 0, 0))
        .map(|naive| naive.and_utc())
}

/// Resolve a date field.
///
/// Without a `format` the upstream string is returned untouched. With one,
/// the timestamp is rendered using `strftime` syntax; unparsable timestamps and
/// invalid format strings resolve to `None`.
pub fn format_date(raw: Option<&str>, format: Option<&str>) -> Option<String> {
    let raw = raw.filter(|raw| !raw.is_empty())?;
    let Some(format) = format else {
        return Some(raw.to_string());
    };

    if StrftimeItems::new(format).any(|item| matches!(item, Item::Error)) {
        return None;
    }

    let timestamp = parse_timestamp(raw)?;
    let mut out = String::new();
    write!(out, "{}", timestamp.format(format)).ok()?;
    Some(out)
}
