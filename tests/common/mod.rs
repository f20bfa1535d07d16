//! Integration test common infrastructure.
//!
//! Provides an in-process daemon bound to ephemeral ports and clients for
//! the framed TCP transport and the HTTP boundary.

pub mod client;
pub mod server;

#[allow(unused_imports)]
pub use client::{HttpClient, TestClient};
#[allow(unused_imports)]
pub use server::TestServer;
