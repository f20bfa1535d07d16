//! Base64 codec for license payloads.
//!
//! License keys travel as standard (padded) base64 so they survive config
//! files, environment variables and terminals unchanged.

use base64::{engine::general_purpose::STANDARD as BASE64, Engine as _};

use crate::error::{self, ProtocolError};

/// Encode raw license bytes.
pub fn encode_license_bytes(raw: &[u8]) -> String {
    BASE64.encode(raw)
}

/// Encode a license string.
pub fn encode_license(raw: &str) -> String {
    encode_license_bytes(raw.as_bytes())
}

/// Decode a base64 license payload into raw bytes.
///
/// Surrounding whitespace (trailing newlines in key files) is ignored.
pub fn decode_license_bytes(encoded: &str) -> error::Result<Vec<u8>> {
    Ok(BASE64.decode(encoded.trim())?)
}

/// Decode a base64 license payload into a UTF-8 string.
pub fn decode_license(encoded: &str) -> error::Result<String> {
    let bytes = decode_license_bytes(encoded)?;
    String::from_utf8(bytes).map_err(|e| ProtocolError::InvalidUtf8 {
        byte_pos: e.utf8_error().valid_up_to(),
        details: e.utf8_error().to_string(),
    })
}
