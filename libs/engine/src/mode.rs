use std::time::Duration;

use crate::PlaybackError;

/// Pacing strategy of a playback session.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Mode {
    /// Pull and dispatch as fast as the source allows.
    Instant,
    /// Wait `delay ± jitter` between consecutive pulls.
    Paced { delay: Duration, max_jitter_ms: u64 },
    /// Reproduce the original spacing of record timestamps, released one
    /// lookahead window at a time. The lookahead must be positive and
    /// `max_jitter_ms` below it, otherwise window waits collapse to zero.
    Relative { lookahead: Duration, max_jitter_ms: u64 },
}

impl Mode {
    pub fn name(&self) -> &'static str {
        match self {
            Mode::Instant => "instant",
            Mode::Paced { .. } => "paced",
            Mode::Relative { .. } => "relative",
        }
    }

    /// Reject parameters under which the read loop would spin.
    pub fn validate(&self) -> Result<(), PlaybackError> {
        let Mode::Relative { lookahead, max_jitter_ms } = *self else {
            return Ok(());
        };
        let reason = if lookahead.is_zero() {
            "lookahead window must be positive".to_string()
        } else if Duration::from_millis(max_jitter_ms) >= lookahead {
            format!("jitter ({max_jitter_ms} ms) must be smaller than the window ({} ms)", lookahead.as_millis())
        } else {
            return Ok(());
        };
        Err(PlaybackError::InvalidMode { mode: *self, reason })
    }
}

impl std::fmt::Display for Mode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.name())
    }
}
