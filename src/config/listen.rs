//! Network listener configuration.

use serde::Deserialize;
use std::net::SocketAddr;

use super::defaults::{default_listen_address, default_max_remote_clients};

/// Remote terminal listener configuration.
#[derive(Debug, Clone, Deserialize)]
pub struct ListenConfig {
    /// Address to bind to (e.g., "0.0.0.0:7300").
    #[serde(default = "default_listen_address")]
    pub address: SocketAddr,
    /// Maximum concurrent remote clients across plaintext and TLS listeners.
    #[serde(default = "default_max_remote_clients")]
    pub max_remote_clients: usize,
}

impl Default for ListenConfig {
    fn default() -> Self {
        Self {
            address: default_listen_address(),
            max_remote_clients: default_max_remote_clients(),
        }
    }
}

/// TLS listener configuration.
#[derive(Debug, Clone, Deserialize)]
pub struct TlsConfig {
    /// Address to bind to for TLS (e.g., "0.0.0.0:7301").
    pub address: SocketAddr,
    /// Path to certificate file (PEM format).
    pub cert_path: String,
    /// Path to private key file (PEM format).
    pub key_path: String,
}
