//! Delimited message framing (framing contract v1).
//!
//! A transport carries raw command text as a byte stream. Each request is
//! terminated by the message delimiter; a batch of requests is closed by the
//! batch delimiter:
//!
//! ```text
//! test -v <US> ping <US> <RS>      two requests, one batch
//! test -v <RS>                     one request, one batch
//! <US>                             one empty request (reported as missing command)
//! ```
//!
//! `<US>` is `0x1F` and `<RS>` is `0x1E` unless configured otherwise.
//!
//! Both directions use the same delimiters. Requests are limited to
//! `max_message_length` characters; response messages (one JSON output
//! each) to `max_response_length`. A request codec is built with
//! [`FrameCodec::with_config`], a response codec with
//! [`FrameCodec::responses`]. Each codec enforces its limit on encode and
//! decode alike.

use bytes::{Buf, BufMut, BytesMut};
use tokio_util::codec::{Decoder, Encoder};

use crate::error::{self, ProtocolError};

/// Version of the framing contract implemented by [`FrameCodec`].
pub const FRAMING_VERSION: u8 = 1;

/// Default message delimiter (ASCII unit separator).
pub const DEFAULT_MESSAGE_DELIMITER: u8 = 0x1F;

/// Default batch delimiter (ASCII record separator).
pub const DEFAULT_BATCH_DELIMITER: u8 = 0x1E;

/// Default maximum message length, in characters.
pub const DEFAULT_MAX_MESSAGE_LENGTH: usize = 1024;

/// Default maximum response message length, in characters.
pub const DEFAULT_MAX_RESPONSE_LENGTH: usize = 65_536;

/// Framing parameters shared by both ends of a connection.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FramingConfig {
    /// Byte terminating a single message.
    pub message_delimiter: u8,
    /// Byte closing a batch.
    pub batch_delimiter: u8,
    /// Maximum request message length in characters.
    pub max_message_length: usize,
    /// Maximum response message length in characters.
    pub max_response_length: usize,
}

impl Default for FramingConfig {
    fn default() -> Self {
        Self {
            message_delimiter: DEFAULT_MESSAGE_DELIMITER,
            batch_delimiter: DEFAULT_BATCH_DELIMITER,
            max_message_length: DEFAULT_MAX_MESSAGE_LENGTH,
            max_response_length: DEFAULT_MAX_RESPONSE_LENGTH,
        }
    }
}

impl FramingConfig {
    /// Check that the configuration can frame a stream unambiguously.
    pub fn validate(&self) -> error::Result<()> {
        if self.message_delimiter == self.batch_delimiter {
            return Err(ProtocolError::InvalidFraming(format!(
                "message and batch delimiters are both {:#04x}",
                self.message_delimiter
            )));
        }
        if self.max_message_length == 0 {
            return Err(ProtocolError::InvalidFraming(
                "max_message_length must be greater than zero".to_string(),
            ));
        }
        if self.max_response_length < self.max_message_length {
            return Err(ProtocolError::InvalidFraming(format!(
                "max_response_length ({}) is below max_message_length ({})",
                self.max_response_length, self.max_message_length
            )));
        }
        Ok(())
    }
}

/// A unit produced by the framer.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Frame {
    /// One raw request payload.
    Message(String),
    /// The batch delimiter: every message since the previous boundary forms one batch.
    EndOfBatch,
}

/// Codec splitting a byte stream into [`Frame`]s.
#[derive(Debug)]
pub struct FrameCodec {
    config: FramingConfig,
    /// Message length limit of this direction
    limit: usize,
    /// Index of next byte to check for a delimiter
    next_index: usize,
    /// Characters counted in `src[..next_index]`
    pending_chars: usize,
    /// Skipping the rest of a rejected message
    discarding: bool,
}

impl FrameCodec {
    /// Create a request codec with the default v1 framing parameters.
    pub fn new() -> Self {
        Self::build(FramingConfig::default(), DEFAULT_MAX_MESSAGE_LENGTH)
    }

    /// Create a request codec with custom framing parameters.
    pub fn with_config(config: FramingConfig) -> error::Result<Self> {
        config.validate()?;
        Ok(Self::build(config, config.max_message_length))
    }

    /// Create a response codec, limited to `max_response_length`.
    pub fn responses(config: FramingConfig) -> error::Result<Self> {
        config.validate()?;
        Ok(Self::build(config, config.max_response_length))
    }

    fn build(config: FramingConfig, limit: usize) -> Self {
        Self {
            config,
            limit,
            next_index: 0,
            pending_chars: 0,
            discarding: false,
        }
    }

    /// The framing parameters in use.
    pub fn config(&self) -> &FramingConfig {
        &self.config
    }

    /// Longest message, in characters, this codec accepts.
    pub fn max_length(&self) -> usize {
        self.limit
    }

    /// Encode a whole batch: every message followed by the batch delimiter.
    pub fn encode_batch<I, S>(&mut self, messages: I, dst: &mut BytesMut) -> error::Result<()>
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        for message in messages {
            self.encode(Frame::Message(message.into()), dst)?;
        }
        self.encode(Frame::EndOfBatch, dst)
    }

    fn reset(&mut self) {
        self.next_index = 0;
        self.pending_chars = 0;
    }

    fn is_delimiter(&self, b: u8) -> bool {
        b == self.config.message_delimiter || b == self.config.batch_delimiter
    }

    fn check_length(&self, chars: usize) -> error::Result<()> {
        if chars > self.limit {
            return Err(ProtocolError::MessageTooLong {
                actual: chars,
                limit: self.limit,
            });
        }
        Ok(())
    }

    fn message_from(&self, body: &[u8], chars: usize) -> error::Result<Frame> {
        self.check_length(chars)?;
        let text = std::str::from_utf8(body).map_err(|e| ProtocolError::InvalidUtf8 {
            byte_pos: e.valid_up_to(),
            details: e.to_string(),
        })?;
        Ok(Frame::Message(text.to_string()))
    }
}

impl Default for FrameCodec {
    fn default() -> Self {
        Self::new()
    }
}

/// Number of UTF-8 scalar values in `bytes`, assuming well-formed input.
///
/// Counts every byte that is not a continuation byte, so it can be applied
/// incrementally to a partially received message.
#[inline]
fn char_count(bytes: &[u8]) -> usize {
    bytes.iter().filter(|b| (**b & 0xC0) != 0x80).count()
}

impl Decoder for FrameCodec {
    type Item = Frame;
    type Error = ProtocolError;

    fn decode(&mut self, src: &mut BytesMut) -> error::Result<Option<Frame>> {
        if self.discarding {
            let Some(pos) = src.iter().position(|b| self.is_delimiter(*b)) else {
                src.clear();
                return Ok(None);
            };
            // A batch delimiter still closes the batch
            let skip = if src[pos] == self.config.message_delimiter { pos + 1 } else { pos };
            src.advance(skip);
            self.discarding = false;
            self.reset();
        }

        let start = self.next_index.min(src.len());
        let Some(offset) = src[start..].iter().position(|b| self.is_delimiter(*b)) else {
            // No delimiter yet - remember where we stopped
            self.pending_chars += char_count(&src[start..]);
            self.next_index = src.len();

            // Reject a partial message as soon as it is over the limit
            if let Err(e) = self.check_length(self.pending_chars) {
                src.clear();
                self.reset();
                self.discarding = true;
                return Err(e);
            }
            return Ok(None);
        };

        let pos = start + offset;
        let chars = self.pending_chars + char_count(&src[start..pos]);
        self.reset();

        if src[pos] == self.config.message_delimiter {
            let line = src.split_to(pos + 1);
            return self.message_from(&line[..pos], chars).map(Some);
        }

        // Batch delimiter: flush pending bytes as the final message first,
        // the delimiter itself is consumed on the next call.
        if pos == 0 {
            src.advance(1);
            return Ok(Some(Frame::EndOfBatch));
        }
        let body = src.split_to(pos);
        self.message_from(&body, chars).map(Some)
    }

    fn decode_eof(&mut self, src: &mut BytesMut) -> error::Result<Option<Frame>> {
        if let Some(frame) = self.decode(src)? {
            return Ok(Some(frame));
        }
        if !src.is_empty() {
            tracing::debug!(
                bytes = src.len(),
                "discarding partial message at end of stream"
            );
            src.clear();
        }
        self.reset();
        self.discarding = false;
        Ok(None)
    }
}

impl Encoder<Frame> for FrameCodec {
    type Error = ProtocolError;

    fn encode(&mut self, frame: Frame, dst: &mut BytesMut) -> error::Result<()> {
        match frame {
            Frame::Message(text) => {
                if let Some(b) = text.bytes().find(|b| self.is_delimiter(*b)) {
                    return Err(ProtocolError::DelimiterInPayload { delimiter: b });
                }
                self.check_length(text.chars().count())?;
                dst.reserve(text.len() + 1);
                dst.put_slice(text.as_bytes());
                dst.put_u8(self.config.message_delimiter);
            }
            Frame::EndOfBatch => dst.put_u8(self.config.batch_delimiter),
        }
        Ok(())
    }
}
