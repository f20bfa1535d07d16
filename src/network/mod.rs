//! Remote terminal transport: TCP/TLS listener and per-connection framing.

mod connection;
mod gateway;
mod sender;

pub use connection::Connection;
pub use gateway::Gateway;
pub use sender::SenderIdGenerator;
