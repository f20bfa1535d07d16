//! HTTP boundary.
//!
//! - `POST /terminal` routes a [`TerminalInputOutput`] and returns it with
//!   `results[i]` populated for `requests[i]`. A `raw` longer than the
//!   framing message limit fails with `invalid_request` without being queued
//! - `GET /metrics` serves Prometheus text
//! - `GET /health` reports liveness and license state

use std::sync::Arc;

use axum::extract::State;
use axum::routing::{get, post};
use axum::{Json, Router};
use serde_json::{Value, json};
use termrd_proto::{CommandResult, ProtocolError, TerminalInputOutput};
use tokio::net::TcpListener;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info};

use crate::dispatcher::Dispatcher;
use crate::error::RouteError;
use crate::handlers::builtin::VERSION;
use crate::license::LicenseGate;

/// Shared state of the HTTP handlers.
#[derive(Clone)]
pub struct HttpState {
    pub server_name: String,
    pub dispatcher: Arc<Dispatcher>,
    pub gate: Arc<LicenseGate>,
    /// Longest accepted `raw`, in characters.
    pub max_message_length: usize,
    pub shutdown: CancellationToken,
}

/// Build the HTTP routes.
pub fn routes(state: HttpState) -> Router {
    Router::new()
        .route("/terminal", post(terminal_handler))
        .route("/metrics", get(metrics_handler))
        .route("/health", get(health_handler))
        .with_state(state)
}

/// Handler for POST /terminal.
///
/// Requests in one envelope form one batch. Dropping the connection cancels
/// the batch's in-flight requests.
async fn terminal_handler(
    State(state): State<HttpState>,
    Json(input): Json<TerminalInputOutput>,
) -> Json<TerminalInputOutput> {
    debug!(size = input.requests.len(), "HTTP batch received");
    let cancel = state.shutdown.child_token();
    let _guard = cancel.clone().drop_guard();

    let limit = state.max_message_length;
    let mut results: Vec<Option<CommandResult>> = vec![None; input.requests.len()];
    let mut accepted = Vec::with_capacity(input.requests.len());
    for (index, request) in input.requests.iter().enumerate() {
        let chars = request.raw.chars().count();
        if chars > limit {
            let error = ProtocolError::MessageTooLong { actual: chars, limit };
            debug!(request_id = %request.id, error = %error, "HTTP request rejected");
            results[index] = Some(RouteError::InvalidRequest(error.to_string()).to_result(&request.id));
        } else {
            accepted.push(index);
        }
    }

    let batch = accepted.iter().map(|&i| input.requests[i].clone()).collect();
    let outputs = state.dispatcher.submit_batch(batch, &cancel).await;

    // Outputs come back in input order; a mismatched id leaves a hole
    for (index, output) in accepted.into_iter().zip(outputs) {
        if output.request_id == input.requests[index].id {
            results[index] = Some(output.result);
        }
    }

    Json(TerminalInputOutput {
        requests: input.requests,
        results,
    })
}

/// Handler for GET /metrics - returns Prometheus metrics in text format.
async fn metrics_handler() -> String {
    crate::metrics::gather_metrics()
}

/// Handler for GET /health.
async fn health_handler(State(state): State<HttpState>) -> Json<Value> {
    let licensed = state.gate.current_license().await.is_some();
    Json(json!({
        "status": "ok",
        "name": state.server_name,
        "version": VERSION,
        "licensed": licensed,
        "queued": state.dispatcher.queue().len(),
        "in_flight": state.dispatcher.correlator().in_flight(),
    }))
}

/// Serve the HTTP boundary on `listener` until `shutdown` fires.
pub async fn run_http_server(listener: TcpListener, state: HttpState) {
    let shutdown = state.shutdown.clone();
    match listener.local_addr() {
        Ok(addr) => info!(%addr, "HTTP server listening"),
        Err(e) => error!(error = %e, "HTTP listener has no local address"),
    }

    let app = routes(state);
    let graceful = async move { shutdown.cancelled().await };
    if let Err(e) = axum::serve(listener, app).with_graceful_shutdown(graceful).await {
        error!(error = %e, "HTTP server error");
    }
    info!("HTTP server stopped");
}
