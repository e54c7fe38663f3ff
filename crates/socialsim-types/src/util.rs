use chrono::{SecondsFormat, Utc};

/// Current UTC timestamp as an RFC 3339 string with microsecond precision.
///
/// All persisted timestamps use this format so lexicographic comparison
/// matches chronological order.
pub fn now_timestamp() -> String {
    Utc::now().to_rfc3339_opts(SecondsFormat::Micros, true)
}

/// Compact UTC timestamp suitable for embedding in identifiers
pub fn compact_timestamp() -> String {
    Utc::now().format("%Y%m%dT%H%M%SZ").to_string()
}
