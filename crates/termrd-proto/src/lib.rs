//! # termrd-proto
//!
//! Wire-level building blocks shared by the termrd command router and its
//! remote clients.
//!
//! ## Features
//!
//! - Versioned message framing (delimited requests grouped into batches)
//! - Request, result and correlated-output types with stable JSON shapes
//! - Stable string error codes for the transport boundary
//! - Base64 codec for license payloads
//! - Optional Tokio `Decoder`/`Encoder` integration
//!
//! ## Quick Start
//!
//! ```rust
//! use termrd_proto::{CommandResult, CorrelatedOutput, ErrorCode, TerminalRequest};
//!
//! let request = TerminalRequest::new("1", "test --version").with_sender("cli-7", "10.0.0.7:5100");
//! let result = CommandResult::failure("1", ErrorCode::InvalidLicense, "no license");
//! let output = CorrelatedOutput::new(&request, result);
//!
//! assert_eq!(output.request_id, "1");
//! assert_eq!(output.sender_id.as_deref(), Some("cli-7"));
//! ```

#![deny(clippy::all)]
#![warn(missing_docs)]

pub mod code;
pub mod error;
#[cfg(feature = "tokio")]
pub mod framing;
pub mod identifiers;
pub mod license;
pub mod request;
pub mod result;

pub use self::code::ErrorCode;
pub use self::error::ProtocolError;
#[cfg(feature = "tokio")]
pub use self::framing::{
    Frame, FrameCodec, FramingConfig, DEFAULT_BATCH_DELIMITER,
    DEFAULT_MAX_MESSAGE_LENGTH, DEFAULT_MAX_RESPONSE_LENGTH, DEFAULT_MESSAGE_DELIMITER,
    FRAMING_VERSION,
};
pub use self::identifiers::{DEMO_APPLICATION_ID, SENDER_ENDPOINT_TOKEN, SENDER_ID_TOKEN};
pub use self::license::{decode_license, decode_license_bytes, encode_license, encode_license_bytes};
pub use self::request::{TerminalInputOutput, TerminalRequest};
pub use self::result::{CommandResult, CorrelatedOutput, ErrorDescriptor};
