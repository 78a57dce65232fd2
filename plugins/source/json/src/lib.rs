use std::fs::File;
use std::io::{BufRead, BufReader};
use std::path::Path;

use playback_api::util::resolve_path;
use playback_api::{AdapterError, Record, RecordSource, TimestampField};

/// Newline-delimited JSON source: every non-blank line is one record and is
/// passed through byte for byte as the payload.
pub struct JsonSource {
    reader: Box<dyn BufRead + Send>,
    ts: Option<TimestampField>,
    line_no: u64,
    buf: String,
}

impl JsonSource {
    pub fn open(path: impl AsRef<Path>, ts: Option<TimestampField>) -> Result<Self, AdapterError> {
        let path = path.as_ref();
        let file = File::open(path)
            .map_err(|e| AdapterError::io(format!("cannot open {}: {e}", path.display())))?;
        tracing::info!(path = %path.display(), "loading json file");
        Ok(Self::from_reader(BufReader::new(file), ts))
    }

    pub fn from_reader(reader: impl BufRead + Send + 'static, ts: Option<TimestampField>) -> Self {
        Self { reader: Box::new(reader), ts, line_no: 0, buf: String::new() }
    }

    fn extract_timestamp(&self, line: &str, field: &TimestampField) -> Result<Record, AdapterError> {
        let value: serde_json::Value = serde_json::from_str(line)
            .map_err(|e| AdapterError::format_err(format!("line {}: {e}", self.line_no)))?;
        let raw = resolve_path(&value, &field.column).ok_or_else(|| {
            AdapterError::format_err(format!("line {}: invalid timestamp column {:?}", self.line_no, field.column))
        })?;
        let raw = raw.as_str().ok_or_else(|| {
            AdapterError::format_err(format!("line {}: unexpected timestamp field {raw}", self.line_no))
        })?;
        let ts = field.parse(raw).map_err(|e| e.at(format!("line {}", self.line_no)))?;
        Ok(Record::new(ts, line.as_bytes()))
    }
}

impl RecordSource for JsonSource {
    fn next_record(&mut self) -> Result<Option<Record>, AdapterError> {
        loop {
            self.buf.clear();
            if self.reader.read_line(&mut self.buf)? == 0 {
                return Ok(None);
            }
            self.line_no += 1;

            let line = self.buf.trim_end_matches(['\r', '\n']);
            if line.trim().is_empty() {
                continue;
            }

            return match &self.ts {
                Some(field) => self.extract_timestamp(line, field).map(Some),
                None => Ok(Some(Record::untimed(line.as_bytes()))),
            };
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::{Cursor, Write};

    use playback_api::{format_timestamp, ErrorKind};

    const FOO: &str = r#"{"ts":"2019-02-11T15:20:09.514626","val":"foo"}"#;

    fn source(data: &str, column: Option<&str>) -> JsonSource {
        JsonSource::from_reader(Cursor::new(data.to_string()), column.map(TimestampField::new))
    }

    #[test]
    fn reads_lines_with_timestamps() {
        let data = format!("{FOO}\n\n{{\"ts\":\"2019-02-11T15:20:10\",\"val\":\"bar\"}}\r\n");
        let mut src = source(&data, Some("ts"));

        let first = src.next_record().unwrap().unwrap();
        assert_eq!(first.payload, FOO.as_bytes());
        assert_eq!(format_timestamp(&first.ts.unwrap()), "2019-02-11T15:20:09.514626Z");

        let second = src.next_record().unwrap().unwrap();
        assert_eq!(second.payload, br#"{"ts":"2019-02-11T15:20:10","val":"bar"}"#);
        assert!(src.next_record().unwrap().is_none());
    }

    #[test]
    fn nested_timestamp_path() {
        let mut src = source(r#"{"meta":{"at":"2019-02-11T15:20:09Z"}}"#, Some("meta.at"));
        let rec = src.next_record().unwrap().unwrap();
        assert_eq!(format_timestamp(&rec.ts.unwrap()), "2019-02-11T15:20:09.000000Z");
    }

    #[test]
    fn without_column_lines_are_untimed() {
        let mut src = source("not even json\n", None);
        let rec = src.next_record().unwrap().unwrap();
        assert_eq!(rec.ts, None);
        assert_eq!(rec.payload, b"not even json");
    }

    #[test]
    fn missing_or_non_string_timestamp_is_format_error() {
        let mut src = source(r#"{"val":"foo"}"#, Some("ts"));
        assert_eq!(src.next_record().unwrap_err().kind(), ErrorKind::Format);

        let mut src = source(r#"{"ts":12}"#, Some("ts"));
        assert_eq!(src.next_record().unwrap_err().kind(), ErrorKind::Format);

        let mut src = source("{broken", Some("ts"));
        let err = src.next_record().unwrap_err();
        assert!(err.message().starts_with("line 1"), "{err}");
    }

    #[test]
    fn opens_files() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, "{FOO}").unwrap();

        let mut src = JsonSource::open(file.path(), Some(TimestampField::new("ts"))).unwrap();
        assert!(src.next_record().unwrap().is_some());
        assert!(src.next_record().unwrap().is_none());

        let err = JsonSource::open("/definitely/not/here.json", None).err().unwrap();
        assert_eq!(err.kind(), ErrorKind::Io);
    }
}
