use std::future::Future;
use std::pin::Pin;

mod error;
mod memory;
mod types;
pub mod util;

pub use error::{AdapterError, ErrorKind};
pub use memory::MemorySource;
pub use types::{Record, TimestampField};
pub use util::{default_timestamp, format_timestamp, parse_timestamp, DEFAULT_TS_FORMAT};

// ════════════════════════════════════════════════════════════════
//  Source Adapter
// ════════════════════════════════════════════════════════════════

/// Pull side of a playback: yields records one at a time.
///
/// - `Ok(Some(record))`: next record.
/// - `Ok(None)`: end of stream, playback finishes normally.
/// - `Err(_)`: read error, fatal to the run.
///
/// Only the scheduler's read loop touches a source, never dispatch tasks.
///
/// `next_record` is synchronous and runs on the scheduler's task. Blocking
/// briefly on local file reads is fine; waiting on the network is not.
pub trait RecordSource: Send {
    fn next_record(&mut self) -> Result<Option<Record>, AdapterError>;
}

impl<S: RecordSource + ?Sized> RecordSource for Box<S> {
    fn next_record(&mut self) -> Result<Option<Record>, AdapterError> {
        (**self).next_record()
    }
}

// ════════════════════════════════════════════════════════════════
//  Dispatch Sink
// ════════════════════════════════════════════════════════════════

/// Push side of a playback: sends one payload downstream.
///
/// Fire-and-forget from the scheduler's point of view. The sink owns its
/// timeout and failure reporting (logging); nothing is propagated back.
/// `tag` identifies the record in logs: an ordinal or original timestamp.
pub trait Dispatch: Send + Sync {
    fn dispatch<'a>(&'a self, tag: &'a str, payload: &'a [u8])
        -> Pin<Box<dyn Future<Output = ()> + Send + 'a>>;
}
