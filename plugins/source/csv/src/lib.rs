//! CSV source: the first line names the columns, each following row is
//! replayed as a JSON object mapping column name to the raw string value.

mod parser;

use std::collections::BTreeMap;
use std::fs::File;
use std::io::{BufRead, BufReader};
use std::path::Path;

use playback_api::{AdapterError, Record, RecordSource, TimestampField};

use crate::parser::{ends_in_quote, parse_delimiter, parse_fields};

/// Dialect knobs, `[csv]` in the config file.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct CsvOptions {
    pub delimiter: char,
    pub quoting: bool,
}

impl Default for CsvOptions {
    fn default() -> Self {
        Self { delimiter: ',', quoting: true }
    }
}

impl CsvOptions {
    /// Build from the textual form used in config (`","`, `";"`, `"\t"`).
    pub fn parse(delimiter: &str, quoting: bool) -> Result<Self, AdapterError> {
        Ok(Self { delimiter: parse_delimiter(delimiter)?, quoting })
    }
}

pub struct CsvSource {
    reader: Box<dyn BufRead + Send>,
    options: CsvOptions,
    header: Vec<String>,
    /// Index of the timestamp column in `header`.
    ts_index: Option<(usize, TimestampField)>,
    line_no: u64,
    /// First physical line of the record last returned by `next_row`.
    row_line: u64,
    buf: String,
}

impl CsvSource {
    pub fn open(
        path: impl AsRef<Path>,
        ts: Option<TimestampField>,
        options: CsvOptions,
    ) -> Result<Self, AdapterError> {
        let path = path.as_ref();
        let file = File::open(path)
            .map_err(|e| AdapterError::io(format!("cannot open {}: {e}", path.display())))?;
        let source = Self::from_reader(BufReader::new(file), ts, options)?;
        tracing::info!(path = %path.display(), columns = source.header.len(), "loading csv file");
        Ok(source)
    }

    /// Reads the header eagerly; an input without one is rejected here.
    pub fn from_reader(
        reader: impl BufRead + Send + 'static,
        ts: Option<TimestampField>,
        options: CsvOptions,
    ) -> Result<Self, AdapterError> {
        let mut source = Self {
            reader: Box::new(reader),
            options,
            header: Vec::new(),
            ts_index: None,
            line_no: 0,
            row_line: 0,
            buf: String::new(),
        };

        source.header = source
            .next_row()?
            .ok_or_else(|| AdapterError::format_err("CSV: missing header line"))?;

        if let Some(field) = ts {
            let idx = source.header.iter().position(|h| *h == field.column).ok_or_else(|| {
                AdapterError::config(format!("CSV: timestamp column {:?} not in header", field.column))
            })?;
            source.ts_index = Some((idx, field));
        }
        Ok(source)
    }

    pub fn header(&self) -> &[String] {
        &self.header
    }

    /// Next non-blank record split into fields. A quoted field may span
    /// several physical lines; its line breaks are kept as `\n`.
    fn next_row(&mut self) -> Result<Option<Vec<String>>, AdapterError> {
        loop {
            self.buf.clear();
            if !self.read_physical_line()? {
                return Ok(None);
            }
            self.row_line = self.line_no;
            if self.buf.trim().is_empty() {
                continue;
            }

            while self.options.quoting && ends_in_quote(&self.buf, self.options.delimiter) {
                if !self.read_physical_line()? {
                    return Err(AdapterError::format_err(format!(
                        "line {}: unterminated quoted field",
                        self.row_line
                    )));
                }
            }

            let line = self.buf.trim_end_matches(['\r', '\n']);
            return Ok(Some(parse_fields(line, self.options.delimiter, self.options.quoting)));
        }
    }

    /// Append one line to `buf` with its break normalized to `\n`.
    fn read_physical_line(&mut self) -> Result<bool, AdapterError> {
        if self.reader.read_line(&mut self.buf)? == 0 {
            return Ok(false);
        }
        self.line_no += 1;
        if self.buf.ends_with("\r\n") {
            self.buf.truncate(self.buf.len() - 2);
            self.buf.push('\n');
        }
        Ok(true)
    }
}

impl RecordSource for CsvSource {
    fn next_record(&mut self) -> Result<Option<Record>, AdapterError> {
        let Some(row) = self.next_row()? else {
            return Ok(None);
        };
        if row.len() != self.header.len() {
            return Err(AdapterError::format_err(format!(
                "line {}: expected {} fields, got {}",
                self.row_line,
                self.header.len(),
                row.len()
            )));
        }

        let object: BTreeMap<&str, &str> =
            self.header.iter().map(String::as_str).zip(row.iter().map(String::as_str)).collect();
        let payload = serde_json::to_vec(&object)?;

        match &self.ts_index {
            Some((idx, field)) => {
                let ts = field
                    .parse(&row[*idx])
                    .map_err(|e| e.at(format!("line {}", self.row_line)))?;
                Ok(Some(Record::new(ts, payload)))
            }
            None => Ok(Some(Record::untimed(payload))),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::{Cursor, Write};

    use playback_api::{format_timestamp, ErrorKind};

    fn source(data: &str, column: Option<&str>) -> Result<CsvSource, AdapterError> {
        CsvSource::from_reader(
            Cursor::new(data.to_string()),
            column.map(TimestampField::new),
            CsvOptions::default(),
        )
    }

    #[test]
    fn rows_become_sorted_json_objects() {
        let mut src = source("val,ts\nfoo,2019-02-11T15:20:09.514626\n\n\"a,b\",2019-02-11T15:20:10\r\n", Some("ts"))
            .unwrap();
        assert_eq!(src.header(), ["val", "ts"]);

        let first = src.next_record().unwrap().unwrap();
        assert_eq!(first.payload, br#"{"ts":"2019-02-11T15:20:09.514626","val":"foo"}"#);
        assert_eq!(format_timestamp(&first.ts.unwrap()), "2019-02-11T15:20:09.514626Z");

        let second = src.next_record().unwrap().unwrap();
        assert_eq!(second.payload, br#"{"ts":"2019-02-11T15:20:10","val":"a,b"}"#);
        assert!(src.next_record().unwrap().is_none());
    }

    #[test]
    fn quoted_field_spans_lines() {
        let data = "ts,val\n2019-02-11T15:20:09,\"line one\r\nline two\"\n2019-02-11T15:20:10,bar\n";
        let mut src = source(data, Some("ts")).unwrap();

        let first = src.next_record().unwrap().unwrap();
        assert_eq!(first.payload, br#"{"ts":"2019-02-11T15:20:09","val":"line one\nline two"}"#);

        let second = src.next_record().unwrap().unwrap();
        assert_eq!(second.payload, br#"{"ts":"2019-02-11T15:20:10","val":"bar"}"#);
        assert!(src.next_record().unwrap().is_none());
    }

    #[test]
    fn errors_point_at_first_line_of_record() {
        let mut src = source("a,b\n\"x\ny\",1,2\n", None).unwrap();
        let err = src.next_record().unwrap_err();
        assert!(err.message().starts_with("line 2:"), "{err}");

        let mut src = source("a,b\n1,\"never closed\n\n", None).unwrap();
        let err = src.next_record().unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Format);
        assert_eq!(err.message(), "line 2: unterminated quoted field");
    }

    #[test]
    fn untimed_without_column() {
        let mut src = source("a\n1\n", None).unwrap();
        let rec = src.next_record().unwrap().unwrap();
        assert_eq!(rec.ts, None);
        assert_eq!(rec.payload, br#"{"a":"1"}"#);
    }

    #[test]
    fn custom_delimiter() {
        let options = CsvOptions::parse("\\t", false).unwrap();
        let mut src = CsvSource::from_reader(Cursor::new("a\tb\n\"1\"\t2\n"), None, options).unwrap();
        let rec = src.next_record().unwrap().unwrap();
        assert_eq!(rec.payload, br#"{"a":"\"1\"","b":"2"}"#);
    }

    #[test]
    fn empty_input_and_unknown_column_rejected() {
        assert_eq!(source("", None).err().unwrap().kind(), ErrorKind::Format);
        assert_eq!(source("\n\n", None).err().unwrap().kind(), ErrorKind::Format);
        assert_eq!(source("a,b\n", Some("ts")).err().unwrap().kind(), ErrorKind::Config);
    }

    #[test]
    fn ragged_row_and_bad_timestamp_are_format_errors() {
        let mut src = source("a,b\n1,2,3\n", None).unwrap();
        let err = src.next_record().unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Format);
        assert!(err.message().starts_with("line 2"), "{err}");

        let mut src = source("ts\nyesterday\n", Some("ts")).unwrap();
        assert_eq!(src.next_record().unwrap_err().kind(), ErrorKind::Format);
    }

    #[test]
    fn opens_files() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, "ts,val\n2019-02-11T15:20:09.514626,foo").unwrap();

        let mut src = CsvSource::open(file.path(), Some(TimestampField::new("ts")), CsvOptions::default()).unwrap();
        assert!(src.next_record().unwrap().is_some());
        assert!(src.next_record().unwrap().is_none());

        let err = CsvSource::open("/definitely/not/here.csv", None, CsvOptions::default()).err().unwrap();
        assert_eq!(err.kind(), ErrorKind::Io);
    }
}
