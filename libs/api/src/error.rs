use std::fmt;

/// Which side of the run is at fault. The binary maps `Config` to a
/// usage exit status; the engine records the kind on every read error.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    /// Flags or config do not fit the input (unknown column, bad delimiter).
    Config,
    /// The file or the peer failed.
    Io,
    /// The input itself is malformed.
    Format,
}

impl fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            ErrorKind::Config => "config",
            ErrorKind::Io => "io",
            ErrorKind::Format => "format",
        })
    }
}

/// Error raised by sources while opening or reading, and by sinks while
/// publishing (where it is only logged).
#[derive(Clone, Debug, thiserror::Error)]
#[error("{message}")]
pub struct AdapterError {
    kind: ErrorKind,
    message: String,
}

impl AdapterError {
    pub fn config(msg: impl Into<String>) -> Self {
        Self { kind: ErrorKind::Config, message: msg.into() }
    }

    pub fn io(msg: impl Into<String>) -> Self {
        Self { kind: ErrorKind::Io, message: msg.into() }
    }

    pub fn format_err(msg: impl Into<String>) -> Self {
        Self { kind: ErrorKind::Format, message: msg.into() }
    }

    /// Prefix the message with a location (`line 4`, `datum 2`), keeping the kind.
    pub fn at(self, location: impl fmt::Display) -> Self {
        Self { kind: self.kind, message: format!("{location}: {}", self.message) }
    }

    pub fn kind(&self) -> ErrorKind {
        self.kind
    }

    pub fn message(&self) -> &str {
        &self.message
    }
}

impl From<std::io::Error> for AdapterError {
    fn from(e: std::io::Error) -> Self {
        Self::io(e.to_string())
    }
}

impl From<serde_json::Error> for AdapterError {
    fn from(e: serde_json::Error) -> Self {
        Self::format_err(e.to_string())
    }
}
