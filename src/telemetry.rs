//! Telemetry utilities for request timing and span construction.

use std::time::Instant;

/// Guard for timing request routing and recording metrics.
///
/// Records latency under the current label when dropped.
pub struct CommandTimer {
    command: String,
    start: Instant,
}

impl CommandTimer {
    /// Start timing a request; the label is refined once the command is known.
    pub fn new(command: impl Into<String>) -> Self {
        Self {
            command: command.into(),
            start: Instant::now(),
        }
    }

    /// Relabel with the resolved command id.
    pub fn set_command(&mut self, command: impl Into<String>) {
        self.command = command.into();
    }

    pub fn elapsed(&self) -> std::time::Duration {
        self.start.elapsed()
    }
}

impl Drop for CommandTimer {
    fn drop(&mut self) {
        let duration = self.start.elapsed().as_secs_f64();
        crate::metrics::record_request(&self.command, duration);
    }
}

/// Standardized span constructors.
pub mod spans {
    use tracing::{Span, info_span};

    /// Create a span for a remote client connection.
    pub fn connection(sender_id: &str, peer: &str) -> Span {
        info_span!("connection", sender_id = %sender_id, peer = %peer)
    }

    /// Create a span for one routed request.
    pub fn request(request_id: &str, sender_id: Option<&str>) -> Span {
        if let Some(sender_id) = sender_id {
            info_span!("request", request_id = %request_id, sender_id = %sender_id)
        } else {
            info_span!("request", request_id = %request_id)
        }
    }
}
