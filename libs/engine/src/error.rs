use playback_api::AdapterError;

use crate::Mode;

#[derive(Debug, thiserror::Error)]
pub enum PlaybackError {
    /// Pacing parameters that cannot make progress; nothing was pulled.
    #[error("invalid {mode} mode: {reason}")]
    InvalidMode { mode: Mode, reason: String },

    /// The source failed to produce record number `position` (1-based).
    #[error("read error at record {position}: {source}")]
    Read { position: u64, source: AdapterError },
}
