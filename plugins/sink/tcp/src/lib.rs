//! Newline-framed TCP sink.
//!
//! One connection, opened on the first dispatch and shared by all
//! dispatches of a run. A failed or timed out publish drops the
//! connection; the next dispatch reconnects. The failed payload itself is
//! not retried.

use std::future::Future;
use std::pin::Pin;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;

use playback_api::{AdapterError, Dispatch};
use tokio::io::AsyncWriteExt;
use tokio::net::TcpStream;
use tokio::sync::Mutex;
use tokio::time::timeout;

pub struct TcpSink {
    addr: String,
    timeout: Duration,
    conn: Mutex<Option<TcpStream>>,
    published: AtomicU64,
}

impl TcpSink {
    /// `timeout` bounds each dispatch end to end.
    pub fn new(addr: impl Into<String>, timeout: Duration) -> Self {
        Self { addr: addr.into(), timeout, conn: Mutex::new(None), published: AtomicU64::new(0) }
    }

    pub fn addr(&self) -> &str {
        &self.addr
    }

    /// Messages delivered so far.
    pub fn published(&self) -> u64 {
        self.published.load(Ordering::Relaxed)
    }

    async fn connect(&self) -> Result<TcpStream, AdapterError> {
        let stream = TcpStream::connect(&self.addr)
            .await
            .map_err(|e| AdapterError::io(format!("connect to {}: {e}", self.addr)))?;
        stream.set_nodelay(true)?;
        tracing::info!(addr = %self.addr, "tcp sink connected");
        Ok(stream)
    }

    /// One deadline covers waiting for the connection, connecting and
    /// writing, so a stuck peer costs each dispatch at most `timeout`.
    async fn publish(&self, payload: &[u8]) -> Result<u64, AdapterError> {
        timeout(self.timeout, self.send(payload))
            .await
            .map_err(|_| AdapterError::io(format!("publish to {} timed out after {:?}", self.addr, self.timeout)))?
    }

    async fn send(&self, payload: &[u8]) -> Result<u64, AdapterError> {
        let mut frame = Vec::with_capacity(payload.len() + 1);
        encode_line(payload, &mut frame);

        let mut conn = self.conn.lock().await;
        // Owned while writing: if this future is dropped mid-frame the
        // half-written stream goes with it and the slot stays empty.
        let mut stream = match conn.take() {
            Some(stream) => stream,
            None => self.connect().await?,
        };
        stream
            .write_all(&frame)
            .await
            .map_err(|e| AdapterError::io(format!("write to {}: {e}", self.addr)))?;
        *conn = Some(stream);

        Ok(self.published.fetch_add(1, Ordering::Relaxed) + 1)
    }
}

impl Dispatch for TcpSink {
    fn dispatch<'a>(&'a self, tag: &'a str, payload: &'a [u8])
        -> Pin<Box<dyn Future<Output = ()> + Send + 'a>>
    {
        Box::pin(async move {
            match self.publish(payload).await {
                Ok(id) => tracing::info!(id, tag, "published message"),
                Err(e) => tracing::error!(tag, addr = %self.addr, error = %e, "failed to publish message"),
            }
        })
    }
}

/// Payload followed by `\n`.
fn encode_line(data: &[u8], buf: &mut Vec<u8>) {
    buf.extend_from_slice(data);
    buf.push(b'\n');
}
