use std::time::Duration;

use chrono::{DateTime, NaiveDate, NaiveDateTime, SecondsFormat, Utc};

use crate::AdapterError;

/// Default timestamp format (`2019-02-11T15:20:09.514626`).
pub const DEFAULT_TS_FORMAT: &str = "%Y-%m-%dT%H:%M:%S%.f";

/// Resolve a dot-notation path in a `serde_json::Value`.
///
/// Supports nested field access via dot separation:
/// - `"ts"` → `value["ts"]`
/// - `"meta.ts"` → `value["meta"]["ts"]`
///
/// Returns `None` if any segment is missing.
pub fn resolve_path<'a>(value: &'a serde_json::Value, path: &str) -> Option<&'a serde_json::Value> {
    let mut current = value;
    for segment in path.split('.') {
        current = current.get(segment)?;
    }
    Some(current)
}

/// Zero Unix time. Marks "no usable timestamp"; never a playback anchor.
pub fn default_timestamp() -> DateTime<Utc> {
    DateTime::<Utc>::default()
}

pub fn is_default_timestamp(ts: &DateTime<Utc>) -> bool {
    *ts == default_timestamp()
}

/// Parse a textual timestamp with a chrono format string.
///
/// Offset-aware formats are normalized to UTC, naive values are taken as
/// UTC, and RFC 3339 is accepted as a fallback when the format does not
/// match (so `...514626Z` parses under the default format).
pub fn parse_timestamp(raw: &str, format: &str) -> Result<DateTime<Utc>, AdapterError> {
    let raw = raw.trim();
    if let Ok(ts) = DateTime::parse_from_str(raw, format) {
        return Ok(ts.with_timezone(&Utc));
    }
    let naive_err = match NaiveDateTime::parse_from_str(raw, format) {
        Ok(naive) => return Ok(naive.and_utc()),
        Err(e) => e,
    };
    if let Some(midnight) = NaiveDate::parse_from_str(raw, format)
        .ok()
        .and_then(|date| date.and_hms_opt(0, 0, 0))
    {
        return Ok(midnight.and_utc());
    }
    DateTime::parse_from_rfc3339(raw)
        .map(|ts| ts.with_timezone(&Utc))
        .map_err(|_| AdapterError::format_err(format!("timestamp {raw:?} does not match {format:?}: {naive_err}")))
}

/// RFC 3339 with microseconds, `Z` suffix.
pub fn format_timestamp(ts: &DateTime<Utc>) -> String {
    ts.to_rfc3339_opts(SecondsFormat::Micros, true)
}

pub fn from_unix_micros(us: i64) -> Option<DateTime<Utc>> {
    DateTime::from_timestamp(us.div_euclid(1_000_000), (us.rem_euclid(1_000_000) * 1_000) as u32)
}

pub fn from_unix_millis(ms: i64) -> Option<DateTime<Utc>> {
    DateTime::from_timestamp(ms.div_euclid(1_000), (ms.rem_euclid(1_000) * 1_000_000) as u32)
}

pub fn from_unix_nanos(ns: i64) -> Option<DateTime<Utc>> {
    DateTime::from_timestamp(ns.div_euclid(1_000_000_000), ns.rem_euclid(1_000_000_000) as u32)
}

pub fn ms_to_duration(ms: u64) -> Duration {
    Duration::from_millis(ms)
}
