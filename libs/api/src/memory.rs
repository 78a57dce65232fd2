use std::collections::VecDeque;

use crate::{AdapterError, Record, RecordSource};

/// In-memory record source. Yields the queued records in order, then
/// end-of-stream (or the configured failure).
#[derive(Debug, Default)]
pub struct MemorySource {
    records: VecDeque<Record>,
    failure: Option<AdapterError>,
}

impl MemorySource {
    pub fn new(records: impl IntoIterator<Item = Record>) -> Self {
        Self { records: records.into_iter().collect(), failure: None }
    }

    /// Report `err` instead of end-of-stream once the records run out.
    pub fn fail_with(mut self, err: AdapterError) -> Self {
        self.failure = Some(err);
        self
    }

    pub fn remaining(&self) -> usize {
        self.records.len()
    }
}

impl RecordSource for MemorySource {
    fn next_record(&mut self) -> Result<Option<Record>, AdapterError> {
        match self.records.pop_front() {
            Some(record) => Ok(Some(record)),
            None => match self.failure.take() {
                Some(err) => Err(err),
                None => Ok(None),
            },
        }
    }
}
