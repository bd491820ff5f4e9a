//! Transport-level errors.

use capkit_core::error::CapError;
use thiserror::Error;

/// Errors raised by a transport while framing or moving bytes.
#[derive(Error, Debug)]
pub enum TransportError {
    /// The transport is no longer connected.
    #[error("transport is not connected")]
    NotConnected,

    /// A frame exceeded the configured size cap.
    #[error("frame too large: {size} bytes (max {max})")]
    FrameTooLarge {
        /// The size of the offending frame.
        size: usize,
        /// The configured maximum.
        max: usize,
    },

    /// A frame was not valid JSON or not a recognized message shape.
    #[error("malformed frame: {0}")]
    Malformed(#[from] serde_json::Error),

    /// An underlying I/O failure.
    #[error("i/o error: {0}")]
    Io(#[from] std::io::Error),
}

impl TransportError {
    /// Whether the error invalidates the whole connection.
    ///
    /// A malformed frame is recoverable — the session survives and the
    /// client gets a structured error. I/O failures and oversized frames
    /// are not.
    #[must_use]
    pub const fn is_recoverable(&self) -> bool {
        matches!(self, Self::Malformed(_))
    }
}

impl From<TransportError> for CapError {
    fn from(err: TransportError) -> Self {
        Self::Transport {
            message: err.to_string(),
            source: Some(Box::new(err)),
        }
    }
}
