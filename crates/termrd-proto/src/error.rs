//! Error types for the termrd wire protocol.
//!
//! This module defines errors raised while framing byte streams and while
//! decoding license payloads.

use thiserror::Error;

/// Convenience type alias for Results using [`ProtocolError`].
pub type Result<T, E = ProtocolError> = std::result::Result<T, E>;

/// Top-level protocol errors.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum ProtocolError {
    /// I/O error during reading or writing.
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),

    /// Invalid UTF-8 bytes in a message.
    #[error("invalid UTF-8 in message at byte {byte_pos}: {details}")]
    InvalidUtf8 {
        /// Byte position where UTF-8 validation failed.
        byte_pos: usize,
        /// Detailed error message from the UTF-8 decoder.
        details: String,
    },

    /// A message exceeded the maximum allowed length before its delimiter.
    #[error("message too long: {actual} characters (limit: {limit})")]
    MessageTooLong {
        /// Characters buffered when the limit was crossed.
        actual: usize,
        /// Maximum allowed length.
        limit: usize,
    },

    /// An outgoing payload contains one of the framing delimiters.
    #[error("payload contains framing delimiter {delimiter:#04x}")]
    DelimiterInPayload {
        /// The offending delimiter byte.
        delimiter: u8,
    },

    /// The framing configuration is unusable.
    #[error("invalid framing configuration: {0}")]
    InvalidFraming(String),

    /// A base64 payload could not be decoded.
    #[error("invalid base64 payload: {0}")]
    InvalidBase64(#[from] base64::DecodeError),
}

impl ProtocolError {
    /// Whether the connection can keep reading after this error.
    ///
    /// Only I/O failures leave the stream unusable; framing violations discard
    /// the offending bytes.
    pub fn is_recoverable(&self) -> bool {
        !matches!(self, Self::Io(_))
    }
}
