//! Human-readable timestamp formatting for run tags.
//!
//! All formatting is UTC so that tags written on different hosts compare
//! lexicographically.

use chrono::{DateTime, TimeZone, Utc};

/// Second-precision layout, e.g. `2024-03-01 12:30:05`.
const SECONDS_FORMAT: &str = "%Y-%m-%d %H:%M:%S";

/// Millisecond-precision layout, e.g. `2024-03-01 12:30:05.042`.
const MILLIS_FORMAT: &str = "%Y-%m-%d %H:%M:%S%.3f";

/// Format a timestamp with second precision.
#[must_use]
pub fn fmt_ts_seconds(ts: DateTime<Utc>) -> String {
    ts.format(SECONDS_FORMAT).to_string()
}

/// Format milliseconds since the Unix epoch with millisecond precision.
///
/// Out-of-range values fall back to the raw number.
#[must_use]
pub fn fmt_ts_millis(epoch_ms: i64) -> String {
    Utc.timestamp_millis_opt(epoch_ms)
        .single()
        .map_or_else(|| epoch_ms.to_string(), |ts| ts.format(MILLIS_FORMAT).to_string())
}
