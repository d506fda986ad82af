//! Error types for mxfcheck-klv.

use thiserror::Error;

/// Packet reading errors.
#[derive(Debug, Error)]
#[must_use]
pub enum KlvError {
    #[error("empty data stream")]
    EmptyStream,

    #[error("byte stream ended mid packet, was expecting at least {expected} more bytes")]
    TruncatedStream { expected: usize },

    #[error("BER long form length of {0} bytes exceeds the 8 byte maximum")]
    InvalidBerLength(u8),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

/// Result type alias for packet operations.
pub type Result<T> = std::result::Result<T, KlvError>;
