//! Default value functions for configuration.
//!
//! Separated into its own module for clarity and reuse.

use std::net::SocketAddr;

use termrd_proto::{
    DEFAULT_BATCH_DELIMITER, DEFAULT_MAX_MESSAGE_LENGTH, DEFAULT_MAX_RESPONSE_LENGTH,
    DEFAULT_MESSAGE_DELIMITER, DEMO_APPLICATION_ID,
};

// =============================================================================
// Server Defaults
// =============================================================================

pub fn default_server_name() -> String {
    "termrd".to_string()
}

pub fn default_application_id() -> String {
    DEMO_APPLICATION_ID.to_string()
}

// =============================================================================
// Listener Defaults
// =============================================================================

pub fn default_listen_address() -> SocketAddr {
    SocketAddr::from(([127, 0, 0, 1], 7300))
}

pub fn default_max_remote_clients() -> usize {
    32
}

// =============================================================================
// Framing Defaults
// =============================================================================

pub fn default_message_delimiter() -> u8 {
    DEFAULT_MESSAGE_DELIMITER
}

pub fn default_batch_delimiter() -> u8 {
    DEFAULT_BATCH_DELIMITER
}

pub fn default_max_message_length() -> usize {
    DEFAULT_MAX_MESSAGE_LENGTH
}

pub fn default_max_response_length() -> usize {
    DEFAULT_MAX_RESPONSE_LENGTH
}

// =============================================================================
// Parser Defaults
// =============================================================================

pub fn default_option_prefix() -> String {
    "--".to_string()
}

pub fn default_alias_prefix() -> String {
    "-".to_string()
}

pub fn default_separator() -> char {
    ' '
}

pub fn default_value_separator() -> char {
    '='
}

// =============================================================================
// Router Defaults
// =============================================================================

/// Router timeout in milliseconds; `-1` disables it.
pub fn default_timeout_ms() -> i64 {
    25_000
}

pub fn default_workers() -> usize {
    1
}

pub fn default_queue_capacity() -> usize {
    1024
}

// =============================================================================
// License Defaults
// =============================================================================

pub fn default_revalidate_secs() -> u64 {
    300
}
