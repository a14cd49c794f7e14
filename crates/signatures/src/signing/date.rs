use chrono::{DateTime, SecondsFormat, Utc};

use crate::error::SignatureError;

/// Renders an instant the way it appears in the `Date` header and the
/// canonical string: `YYYY-MM-DDTHH:MM:SS.sssZ`.
pub fn format_date(date: &DateTime<Utc>) -> String {
    date.to_rfc3339_opts(SecondsFormat::Millis, true)
}

/// Parses a `Date` header value.
///
/// RFC 3339 is what signers emit; RFC 2822 / IMF-fixdate is accepted as well
/// since it is the classic HTTP form. Anything else is rejected.
pub fn parse_date(value: &str) -> Result<DateTime<Utc>, SignatureError> {
    let value = value.trim();
    DateTime::parse_from_rfc3339(value)
        .or_else(|_| DateTime::parse_from_rfc2822(value))
        .map(|date| date.with_timezone(&Utc))
        .map_err(|_| SignatureError::MalformedDate(value.to_string()))
}
