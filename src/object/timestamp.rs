//! Timestamp encoding shared by all stored objects

use chrono::{DateTime, NaiveDateTime, SubsecRound, Utc};

use crate::{Error, Result};

/// Wire format of object timestamps (UTC, microsecond precision).
pub const TIMESTAMP_FORMAT: &str = "%Y-%m-%dT%H:%M:%S%.6f";

/// Current time truncated to the precision stored on the wire, so that a
/// freshly created object equals its own deserialized form.
#[must_use]
pub fn now() -> DateTime<Utc> {
    Utc::now().trunc_subsecs(6)
}

/// Format a timestamp for storage.
#[must_use]
pub fn format_timestamp(timestamp: &DateTime<Utc>) -> String {
    timestamp.format(TIMESTAMP_FORMAT).to_string()
}

/// Parse a stored timestamp.
///
/// # Errors
///
/// Returns `MalformedRecord` if the text is not in [`TIMESTAMP_FORMAT`].
pub fn parse_timestamp(text: &str) -> Result<DateTime<Utc>> {
    NaiveDateTime::parse_from_str(text, "%Y-%m-%dT%H:%M:%S%.f")
        .map(|naive| naive.and_utc())
        .map_err(|e| Error::MalformedRecord(format!("invalid timestamp '{text}': {e}")))
}
