// Timestamp parsing and human readable relative dates for display code
use chrono::{DateTime, FixedOffset, Utc};
use tracing::warn;

use crate::error::{GoodreadsError, Result};

// Legacy format still emitted by the service, e.g. "Wed Jan 01 00:00:00 +0000 2020"
pub const LEGACY_DATE_FORMAT: &str = "%a %b %d %H:%M:%S %z %Y";

// "2 Jan 2020"
pub const SHORT_DATE_FORMAT: &str = "%-d %b %Y";

/// Parses a service timestamp.
///
/// RFC 3339 is attempted first and the legacy format second; the first
/// successful parse wins.
pub fn parse_timestamp(s: &str) -> Result<DateTime<FixedOffset>> {
    let s = s.trim();
    DateTime::parse_from_rfc3339(s)
        .or_else(|_| DateTime::parse_from_str(s, LEGACY_DATE_FORMAT))
        .map_err(|e| GoodreadsError::UnparseableDate(format!("{:?}: {}", s, e)))
}

/// Describes how long ago `s` was, relative to the current time.
///
/// Returns an empty string when `s` cannot be parsed.
pub fn relative_label(s: &str) -> String {
    relative_label_at(s, Utc::now())
}

pub fn relative_label_at(s: &str, now: DateTime<Utc>) -> String {
    match parse_timestamp(s) {
        Ok(date) => label_for_elapsed(now.signed_duration_since(date.with_timezone(&Utc))),
        Err(e) => {
            warn!("Cannot compute relative date: {}", e);
            String::new()
        }
    }
}

fn label_for_elapsed(elapsed: chrono::Duration) -> String {
    let days = elapsed.num_days();
    if days > 1 {
        return format!("{} days ago", days);
    } else if days == 1 {
        return "1 day ago".to_string();
    }

    let hours = elapsed.num_hours();
    if hours > 1 {
        return format!("{} hours ago", hours);
    }

    // Future timestamps land here with negative minutes
    let minutes = elapsed.num_minutes();
    if minutes > 2 {
        format!("{} minutes ago", minutes)
    } else {
        "Just now".to_string()
    }
}

/// Formats `s` as "<day> <Mon> <year>" in its own offset, or "" when unparseable.
pub fn short_date(s: &str) -> String {
    match parse_timestamp(s) {
        Ok(date) => date.format(SHORT_DATE_FORMAT).to_string(),
        Err(e) => {
            warn!("Cannot format short date: {}", e);
            String::new()
        }
    }
}
