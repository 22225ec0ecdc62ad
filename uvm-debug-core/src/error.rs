use thiserror::Error;

/// Errors surfaced by the Command Bridge.
///
/// Every variant is recoverable: the bridge never panics or exits the host
/// simulator because of one of these.
#[derive(Debug, Error)]
pub enum BridgeError {
    /// No interpreter is attached, so commands cannot be run.
    #[error("tcl integration is not supported in this simulator")]
    UnsupportedBackend,

    /// The line (or composed command) does not fit the line buffer.
    #[error("input of {len} bytes does not fit a {capacity} byte line buffer")]
    InputOverflow { capacity: usize, len: usize },

    /// The input channel closed before a line was available.
    #[error("end of input")]
    EndOfInput,

    /// Local console I/O failed.
    #[error("console i/o failed: {0}")]
    Io(#[from] std::io::Error),

    /// The simulator's own command primitive reported a failure.
    #[error("simulator console error: {0}")]
    Console(String),
}

/// Errors from the named-command table.
#[derive(Debug, Error)]
pub enum RegistryError {
    #[error("command '{0}' is already registered")]
    Duplicate(String),

    #[error("no command registered under '{0}'")]
    Unknown(String),

    #[error("command bridge lock poisoned")]
    LockPoisoned,
}

pub type BridgeResult<T> = Result<T, BridgeError>;
