use std::sync::Arc;
use std::time::Duration;

use chrono::{DateTime, TimeDelta, Utc};
use tokio::time::Instant;

use playback_api::{default_timestamp, format_timestamp, Dispatch, Record, RecordSource};

use crate::jitter::{jittered, Jitter};
use crate::{CompletionTracker, Mode, PlaybackError};

// ═══════════════════════════════════════════════════════════════
//  Report
// ═══════════════════════════════════════════════════════════════

/// Summary of a finished playback session.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PlaybackReport {
    pub mode: Mode,
    /// Dispatch tasks launched (one per record pulled).
    pub dispatched: u64,
    /// Dispatch tasks that ran to completion.
    pub completed: u64,
    /// Relative mode: how many times the read loop waited for the window.
    pub window_advances: u64,
    pub elapsed: Duration,
}

// ═══════════════════════════════════════════════════════════════
//  Scheduler
// ═══════════════════════════════════════════════════════════════

/// Drives one record source into one dispatch sink under a pacing `Mode`.
///
/// Records are pulled by a single sequential loop; each one is handed to the
/// sink as a separate task, so a slow sink never holds back the next pull.
/// `play` returns after the source is exhausted (or fails) and every
/// launched dispatch has finished.
pub struct Scheduler {
    mode: Mode,
    jitter: Jitter,
}

impl Scheduler {
    pub fn new(mode: Mode) -> Self {
        Self { mode, jitter: Jitter::default() }
    }

    /// Replace the time-seeded jitter (deterministic runs, tests).
    pub fn with_jitter(mut self, jitter: Jitter) -> Self {
        self.jitter = jitter;
        self
    }

    pub fn mode(&self) -> Mode {
        self.mode
    }

    /// Run one playback session to the end of `source`.
    ///
    /// A read error stops pulling at once; dispatches already launched are
    /// still awaited before the error is returned. A relative mode whose
    /// window cannot advance is rejected before the first pull.
    pub async fn play<S>(
        &mut self,
        source: &mut S,
        sink: Arc<dyn Dispatch>,
    ) -> Result<PlaybackReport, PlaybackError>
    where
        S: RecordSource + ?Sized,
    {
        self.mode.validate()?;
        let mut session = Session::start(sink);

        let outcome = match self.mode {
            Mode::Instant => self.play_instant(&mut session, source).await,
            Mode::Paced { delay, max_jitter_ms } => {
                self.play_paced(&mut session, source, delay, max_jitter_ms).await
            }
            Mode::Relative { lookahead, max_jitter_ms } => {
                self.play_relative(&mut session, source, lookahead, max_jitter_ms).await
            }
        };

        tracing::debug!(outstanding = session.tracker.outstanding(), "waiting for dispatches");
        session.tracker.drain().await;

        let report = PlaybackReport {
            mode: self.mode,
            dispatched: session.tracker.launched(),
            completed: session.tracker.completed(),
            window_advances: session.window_advances,
            elapsed: session.clock.elapsed(),
        };
        tracing::info!(
            mode = %report.mode,
            dispatched = report.dispatched,
            completed = report.completed,
            window_advances = report.window_advances,
            elapsed_s = format_args!("{:.3}", report.elapsed.as_secs_f64()),
            "session finished"
        );

        outcome.map(|()| report)
    }

    async fn play_instant<S>(&mut self, session: &mut Session, source: &mut S) -> Result<(), PlaybackError>
    where
        S: RecordSource + ?Sized,
    {
        while let Some(record) = session.pull(source)? {
            session.launch(session.pulled.to_string(), record.payload);
        }
        Ok(())
    }

    async fn play_paced<S>(
        &mut self,
        session: &mut Session,
        source: &mut S,
        delay: Duration,
        max_jitter_ms: u64,
    ) -> Result<(), PlaybackError>
    where
        S: RecordSource + ?Sized,
    {
        tracing::info!(
            delay_ms = delay.as_millis() as u64,
            max_jitter_ms,
            "base delay between messages"
        );

        while let Some(record) = session.pull(source)? {
            session.launch(session.pulled.to_string(), record.payload);

            let wait = jittered(delay, self.jitter.sample(max_jitter_ms));
            tokio::time::sleep(wait).await;
        }
        Ok(())
    }

    async fn play_relative<S>(
        &mut self,
        session: &mut Session,
        source: &mut S,
        lookahead: Duration,
        max_jitter_ms: u64,
    ) -> Result<(), PlaybackError>
    where
        S: RecordSource + ?Sized,
    {
        tracing::info!(
            lookahead_ms = lookahead.as_millis() as u64,
            max_jitter_ms,
            "lookahead window"
        );

        let lookahead = TimeDelta::from_std(lookahead).unwrap_or_else(|_| TimeDelta::zero());
        let mut boundary = shift(session.clock.now(), lookahead);
        // Maps original time onto "now"; fixed by the first real timestamp.
        let mut delta: Option<TimeDelta> = None;

        while let Some(record) = session.pull(source)? {
            if delta.is_none() {
                if let Some(first) = record.anchor() {
                    let d = session.clock.now() - first;
                    tracing::info!(
                        first_timestamp = %format_timestamp(&first),
                        delta_s = d.num_seconds(),
                        "timeline anchored"
                    );
                    delta = Some(d);
                }
            }

            let original = record.ts.unwrap_or_else(default_timestamp);
            let adjusted = shift(original, delta.unwrap_or_else(TimeDelta::zero));

            while adjusted > boundary {
                let offset = self.jitter.sample(max_jitter_ms);
                session.clock.sleep_until(shift(boundary, offset)).await;
                boundary = shift(session.clock.now(), lookahead);
                session.window_advances += 1;
                tracing::debug!(boundary = %format_timestamp(&boundary), "window advanced");
            }

            let tag = match record.ts {
                Some(ts) => format_timestamp(&ts),
                None => session.pulled.to_string(),
            };
            session.launch(tag, record.payload);
        }
        Ok(())
    }
}

// ═══════════════════════════════════════════════════════════════
//  Session
// ═══════════════════════════════════════════════════════════════

/// Run-scoped state of one `play` call.
struct Session {
    sink: Arc<dyn Dispatch>,
    tracker: CompletionTracker,
    clock: SessionClock,
    /// Records successfully pulled so far; the ordinal of the last one.
    pulled: u64,
    window_advances: u64,
}

impl Session {
    fn start(sink: Arc<dyn Dispatch>) -> Self {
        Self {
            sink,
            tracker: CompletionTracker::new(),
            clock: SessionClock::start(),
            pulled: 0,
            window_advances: 0,
        }
    }

    fn pull<S>(&mut self, source: &mut S) -> Result<Option<Record>, PlaybackError>
    where
        S: RecordSource + ?Sized,
    {
        match source.next_record() {
            Ok(Some(record)) => {
                self.pulled += 1;
                Ok(Some(record))
            }
            Ok(None) => {
                tracing::debug!(records = self.pulled, "end of stream");
                Ok(None)
            }
            Err(source) => {
                let position = self.pulled + 1;
                tracing::error!(position, kind = %source.kind(), error = %source, "read error, stopping playback");
                Err(PlaybackError::Read { position, source })
            }
        }
    }

    /// Fire-and-forget: hand `payload` to the sink on its own task.
    fn launch(&self, tag: String, payload: Vec<u8>) {
        let sink = self.sink.clone();
        self.tracker.launch(async move {
            sink.dispatch(&tag, &payload).await;
        });
    }
}

/// Wall clock for one session, advanced by the runtime's monotonic clock so
/// that window arithmetic and sleeps agree (including under a paused
/// test clock).
struct SessionClock {
    wall: DateTime<Utc>,
    mono: Instant,
}

impl SessionClock {
    fn start() -> Self {
        Self { wall: Utc::now(), mono: Instant::now() }
    }

    fn now(&self) -> DateTime<Utc> {
        shift(self.wall, TimeDelta::from_std(self.mono.elapsed()).unwrap_or_else(|_| TimeDelta::zero()))
    }

    fn elapsed(&self) -> Duration {
        self.mono.elapsed()
    }

    async fn sleep_until(&self, at: DateTime<Utc>) {
        let wait = (at - self.now()).to_std().unwrap_or_default();
        tokio::time::sleep(wait).await;
    }
}

/// `at + by`, clamped to the representable range.
fn shift(at: DateTime<Utc>, by: TimeDelta) -> DateTime<Utc> {
    at.checked_add_signed(by).unwrap_or(if by < TimeDelta::zero() {
        DateTime::<Utc>::MIN_UTC
    } else {
        DateTime::<Utc>::MAX_UTC
    })
}
