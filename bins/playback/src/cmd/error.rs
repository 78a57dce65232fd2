use playback_api::{AdapterError, ErrorKind};
use playback_engine::PlaybackError;

#[derive(Debug, thiserror::Error)]
pub enum CliError {
    #[error("{0}")]
    Config(String),

    #[error("{0}")]
    Adapter(#[from] AdapterError),

    #[error("{0}")]
    Playback(#[from] PlaybackError),
}

impl CliError {
    /// 2 for bad settings, 1 for failures while running.
    pub fn exit_code(&self) -> i32 {
        match self {
            CliError::Config(_) => 2,
            CliError::Adapter(e) if e.kind() == ErrorKind::Config => 2,
            CliError::Playback(PlaybackError::InvalidMode { .. }) => 2,
            _ => 1,
        }
    }
}
