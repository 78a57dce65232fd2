use std::future::Future;
use std::io::Write;
use std::pin::Pin;
use std::sync::Mutex;
use std::sync::atomic::{AtomicU64, Ordering};

use playback_api::Dispatch;

/// Writes every payload as one line to a writer, stdout unless told
/// otherwise. Lines from concurrent dispatches never interleave.
pub struct StdoutSink {
    out: Mutex<Box<dyn Write + Send>>,
    written: AtomicU64,
}

impl Default for StdoutSink {
    fn default() -> Self {
        Self::new()
    }
}

impl StdoutSink {
    pub fn new() -> Self {
        Self::with_writer(std::io::stdout())
    }

    pub fn with_writer(out: impl Write + Send + 'static) -> Self {
        Self { out: Mutex::new(Box::new(out)), written: AtomicU64::new(0) }
    }

    /// Payloads written so far.
    pub fn written(&self) -> u64 {
        self.written.load(Ordering::Relaxed)
    }

    fn write_line(&self, payload: &[u8]) -> std::io::Result<()> {
        let mut out = self
            .out
            .lock()
            .map_err(|_| std::io::Error::other("stdout sink writer poisoned"))?;
        out.write_all(payload)?;
        out.write_all(b"\n")?;
        out.flush()
    }
}

impl Dispatch for StdoutSink {
    fn dispatch<'a>(&'a self, tag: &'a str, payload: &'a [u8])
        -> Pin<Box<dyn Future<Output = ()> + Send + 'a>>
    {
        Box::pin(async move {
            match self.write_line(payload) {
                Ok(()) => {
                    let id = self.written.fetch_add(1, Ordering::Relaxed) + 1;
                    tracing::info!(id, tag, "published message");
                }
                Err(e) => tracing::error!(tag, error = %e, "failed to write message"),
            }
        })
    }
}
