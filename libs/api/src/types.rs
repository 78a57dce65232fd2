use chrono::{DateTime, Utc};

use crate::util::{is_default_timestamp, parse_timestamp, DEFAULT_TS_FORMAT};
use crate::AdapterError;

// ════════════════════════════════════════════════════════════════
//  Record
// ════════════════════════════════════════════════════════════════

/// One unit read from a dataset: opaque payload bytes plus the instant the
/// event originally happened, if the source knows it.
///
/// Immutable once read. The payload is moved into the dispatch that sends
/// it; a record has no identity beyond its position in one playback run.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Record {
    /// Original event time, normalized to UTC.
    pub ts: Option<DateTime<Utc>>,
    pub payload: Vec<u8>,
}

impl Record {
    pub fn new(ts: DateTime<Utc>, payload: impl Into<Vec<u8>>) -> Self {
        Self { ts: Some(ts), payload: payload.into() }
    }

    /// Record without a timestamp (sources read without a timestamp column).
    pub fn untimed(payload: impl Into<Vec<u8>>) -> Self {
        Self { ts: None, payload: payload.into() }
    }

    /// Timestamp usable as a timeline reference: present and not the
    /// zero-time sentinel.
    pub fn anchor(&self) -> Option<DateTime<Utc>> {
        self.ts.filter(|ts| !is_default_timestamp(ts))
    }
}

// ════════════════════════════════════════════════════════════════
//  TimestampField
// ════════════════════════════════════════════════════════════════

/// Where a source finds the event time and how to read it.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct TimestampField {
    /// Column (CSV), dot path (JSON) or field name (Avro).
    pub column: String,
    /// chrono format for textual timestamps.
    pub format: String,
}

impl TimestampField {
    pub fn new(column: impl Into<String>) -> Self {
        Self { column: column.into(), format: DEFAULT_TS_FORMAT.to_string() }
    }

    pub fn with_format(mut self, format: impl Into<String>) -> Self {
        self.format = format.into();
        self
    }

    pub fn parse(&self, raw: &str) -> Result<DateTime<Utc>, AdapterError> {
        parse_timestamp(raw, &self.format)
    }
}
