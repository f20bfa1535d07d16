//! Prometheus metrics collection for termrd.
//!
//! Exposed in text format at `GET /metrics`:
//!
//! - `termrd_requests_total{command}` - Routed requests by resolved command
//! - `termrd_request_duration_seconds{command}` - Routing latency histogram
//! - `termrd_request_errors_total{code}` - Failed requests by error code
//! - `termrd_queue_depth` - Requests waiting in the queue (gauge)
//! - `termrd_queue_rejected_total` - Requests refused by backpressure
//! - `termrd_connections_active` - Connected remote clients (gauge)
//! - `termrd_batches_total` - Batches submitted

use prometheus::{
    Encoder, HistogramOpts, HistogramVec, IntCounter, IntCounterVec, IntGauge, Opts, Registry,
    TextEncoder,
};
use std::sync::OnceLock;

/// Global Prometheus registry for all metrics.
pub static REGISTRY: OnceLock<Registry> = OnceLock::new();

pub fn registry() -> &'static Registry {
    REGISTRY.get_or_init(Registry::new)
}

// ========================================================================
// Counters (monotonic increasing)
// ========================================================================

/// Requests routed, by resolved command id.
pub static REQUESTS: OnceLock<IntCounterVec> = OnceLock::new();

/// Failed requests by error code.
pub static REQUEST_ERRORS: OnceLock<IntCounterVec> = OnceLock::new();

/// Requests refused because the queue was full or closed.
pub static QUEUE_REJECTED: OnceLock<IntCounter> = OnceLock::new();

/// Batches submitted by any transport.
pub static BATCHES: OnceLock<IntCounter> = OnceLock::new();

// ========================================================================
// Gauges (can increase/decrease)
// ========================================================================

/// Requests currently buffered in the queue.
pub static QUEUE_DEPTH: OnceLock<IntGauge> = OnceLock::new();

/// Currently connected remote clients.
pub static CONNECTIONS_ACTIVE: OnceLock<IntGauge> = OnceLock::new();

// ========================================================================
// Histograms
// ========================================================================

/// Routing latency by command.
pub static REQUEST_LATENCY: OnceLock<HistogramVec> = OnceLock::new();

/// Initialize the Prometheus metrics registry.
///
/// Should be called once at startup; recording before `init` is a no-op.
pub fn init() {
    let r = registry();

    // Helper macro to register metric
    macro_rules! register {
        ($metric:ident, $init:expr) => {
            match $init {
                Ok(m) => {
                    if let Err(e) = r.register(Box::new(m.clone())) {
                        tracing::warn!(error = %e, concat!("Failed to register metric ", stringify!($metric)));
                    }
                    let _ = $metric.set(m);
                }
                Err(e) => {
                    tracing::warn!(error = %e, concat!("Failed to create metric ", stringify!($metric)));
                }
            }
        };
    }

    register!(REQUESTS, IntCounterVec::new(Opts::new("termrd_requests_total", "Requests routed by command"), &["command"]));
    register!(REQUEST_ERRORS, IntCounterVec::new(Opts::new("termrd_request_errors_total", "Failed requests by error code"), &["code"]));
    register!(QUEUE_REJECTED, IntCounter::new("termrd_queue_rejected_total", "Requests refused by queue backpressure"));
    register!(BATCHES, IntCounter::new("termrd_batches_total", "Batches submitted"));
    register!(QUEUE_DEPTH, IntGauge::new("termrd_queue_depth", "Requests waiting in the queue"));
    register!(CONNECTIONS_ACTIVE, IntGauge::new("termrd_connections_active", "Connected remote clients"));
    register!(REQUEST_LATENCY, HistogramVec::new(
        HistogramOpts::new("termrd_request_duration_seconds", "Routing latency by command")
            .buckets(vec![0.0001, 0.0005, 0.001, 0.005, 0.01, 0.05, 0.1, 0.5, 1.0, 5.0, 25.0]),
        &["command"]));
}

/// Gather all metrics and encode them in Prometheus text format.
pub fn gather_metrics() -> String {
    let encoder = TextEncoder::new();
    let metric_families = registry().gather();
    let mut buffer = vec![];
    if let Err(e) = encoder.encode(&metric_families, &mut buffer) {
        tracing::error!(error = %e, "Failed to encode Prometheus metrics");
        return String::new();
    }
    match String::from_utf8(buffer) {
        Ok(s) => s,
        Err(e) => {
            tracing::error!(error = %e, "Prometheus metrics were not valid UTF-8");
            String::new()
        }
    }
}

// ============================================================================
// Helper functions for metric updates
// ============================================================================

/// Record a routed request with latency.
#[inline]
pub fn record_request(command: &str, duration_secs: f64) {
    if let Some(c) = REQUESTS.get() {
        c.with_label_values(&[command]).inc();
    }
    if let Some(h) = REQUEST_LATENCY.get() {
        h.with_label_values(&[command]).observe(duration_secs);
    }
}

/// Record a failed request.
#[inline]
pub fn record_request_error(code: &str) {
    if let Some(c) = REQUEST_ERRORS.get() {
        c.with_label_values(&[code]).inc();
    }
}

#[inline]
pub fn record_queue_rejected() {
    if let Some(c) = QUEUE_REJECTED.get() {
        c.inc();
    }
}

#[inline]
pub fn record_batch() {
    if let Some(c) = BATCHES.get() {
        c.inc();
    }
}

#[inline]
pub fn set_queue_depth(depth: usize) {
    if let Some(g) = QUEUE_DEPTH.get() {
        g.set(i64::try_from(depth).unwrap_or(i64::MAX));
    }
}

#[inline]
pub fn connection_opened() {
    if let Some(g) = CONNECTIONS_ACTIVE.get() {
        g.inc();
    }
}

#[inline]
pub fn connection_closed() {
    if let Some(g) = CONNECTIONS_ACTIVE.get() {
        g.dec();
    }
}
