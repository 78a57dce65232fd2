use std::fs::File;
use std::io::{BufReader, Read};
use std::path::Path;

use apache_avro::types::Value;
use apache_avro::{Reader, Schema};
use chrono::{DateTime, Utc};
use playback_api::util::{from_unix_micros, from_unix_millis, from_unix_nanos};
use playback_api::{AdapterError, Record, RecordSource, TimestampField};

/// Avro object container file source.
///
/// Each datum is re-encoded with the file's writer schema (single-object
/// binary, no header) and replayed as the payload.
pub struct AvroSource {
    reader: Reader<'static, Box<dyn Read + Send>>,
    schema: Schema,
    ts: Option<TimestampField>,
    position: u64,
}

impl AvroSource {
    pub fn open(path: impl AsRef<Path>, ts: Option<TimestampField>) -> Result<Self, AdapterError> {
        let path = path.as_ref();
        let file = File::open(path)
            .map_err(|e| AdapterError::io(format!("cannot open {}: {e}", path.display())))?;
        let source = Self::from_reader(BufReader::new(file), ts)?;
        tracing::info!(path = %path.display(), "loading avro file");
        Ok(source)
    }

    pub fn from_reader(reader: impl Read + Send + 'static, ts: Option<TimestampField>) -> Result<Self, AdapterError> {
        let boxed: Box<dyn Read + Send> = Box::new(reader);
        let reader = Reader::new(boxed).map_err(|e| AdapterError::format_err(format!("avro header: {e}")))?;
        let schema = reader.writer_schema().clone();
        Ok(Self { reader, schema, ts, position: 0 })
    }

    pub fn schema(&self) -> &Schema {
        &self.schema
    }
}

impl RecordSource for AvroSource {
    fn next_record(&mut self) -> Result<Option<Record>, AdapterError> {
        let Some(value) = self.reader.next() else {
            return Ok(None);
        };
        self.position += 1;
        let value = value.map_err(|e| AdapterError::format_err(format!("datum {}: {e}", self.position)))?;

        let ts = match &self.ts {
            Some(field) => Some(
                extract_timestamp(&value, field).map_err(|e| e.at(format!("datum {}", self.position)))?,
            ),
            None => None,
        };

        let payload = apache_avro::to_avro_datum(&self.schema, value)
            .map_err(|e| AdapterError::format_err(format!("datum {}: avro encode: {e}", self.position)))?;
        Ok(Some(Record { ts, payload }))
    }
}

// ═══════════════════════════════════════════════════════════════
//  Timestamp extraction
// ═══════════════════════════════════════════════════════════════

/// Find `field.column` (dot path through nested records) and read it as a
/// point in time.
fn extract_timestamp(value: &Value, field: &TimestampField) -> Result<DateTime<Utc>, AdapterError> {
    let mut current = value;
    for segment in field.column.split('.') {
        current = record_field(current, segment)
            .ok_or_else(|| AdapterError::format_err(format!("invalid timestamp column {:?}", field.column)))?;
    }

    let ts = match unwrap_union(current) {
        Value::Long(us) | Value::TimestampMicros(us) | Value::LocalTimestampMicros(us) => from_unix_micros(*us),
        Value::TimestampMillis(ms) | Value::LocalTimestampMillis(ms) => from_unix_millis(*ms),
        Value::TimestampNanos(ns) | Value::LocalTimestampNanos(ns) => from_unix_nanos(*ns),
        Value::String(raw) => return field.parse(raw),
        other => return Err(AdapterError::format_err(format!("unexpected timestamp field {other:?}"))),
    };
    ts.ok_or_else(|| AdapterError::format_err(format!("timestamp in {:?} out of range", field.column)))
}

fn record_field<'a>(value: &'a Value, name: &str) -> Option<&'a Value> {
    match unwrap_union(value) {
        Value::Record(fields) => fields.iter().find(|(k, _)| k == name).map(|(_, v)| v),
        _ => None,
    }
}

fn unwrap_union(value: &Value) -> &Value {
    match value {
        Value::Union(_, inner) => unwrap_union(inner),
        other => other,
    }
}
