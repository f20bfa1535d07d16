//! termrd - Terminal Routing Daemon
//!
//! Accepts raw command text over TCP/TLS, HTTP and a local console, frames it
//! into batches, queues it, and drives each request through license check,
//! parse, check and run before returning results correlated to their
//! originating request and sender.
//!
//! ```text
//! transport ─▶ FrameCodec ─▶ RequestQueue ─▶ Router ─▶ Correlator ─▶ transport
//! ```

pub mod commands;
pub mod config;
pub mod console;
pub mod correlator;
pub mod dispatcher;
pub mod error;
pub mod handlers;
pub mod http;
pub mod license;
pub mod metrics;
pub mod network;
pub mod parser;
pub mod queue;
pub mod router;
pub mod server;
pub mod telemetry;

pub use error::{QueueError, RouteError, RouteResult};
pub use server::{Daemon, Pipeline};
