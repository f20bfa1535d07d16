//! Routing lifecycle events.

use std::time::Duration;

use async_trait::async_trait;
use termrd_proto::{CommandResult, TerminalRequest};
use tracing::{debug, info, warn};

use super::state::RouteState;
use crate::error::RouteResult;
use crate::handlers::RunOutput;
use crate::parser::ParsedCommand;

/// What the router knew when a request finished.
#[derive(Debug)]
pub struct RouteSummary<'a> {
    pub request: &'a TerminalRequest,
    /// Present once parsing succeeded.
    pub command: Option<&'a ParsedCommand>,
    pub result: &'a CommandResult,
    /// Last stage completed successfully.
    pub reached: RouteState,
    /// `Completed` or `Failed`.
    pub state: RouteState,
    pub elapsed: Duration,
}

/// Hooks awaited inline, in order, for every routed request.
///
/// `before_route` and `after_route` fire exactly once per request. The
/// check and run hooks fire only for requests that parsed.
#[async_trait]
pub trait RouteEvents: Send + Sync {
    async fn before_route(&self, _request: &TerminalRequest) {}

    async fn before_check(&self, _command: &ParsedCommand) {}

    async fn after_check(&self, _command: &ParsedCommand, _outcome: &RouteResult<()>) {}

    async fn before_run(&self, _command: &ParsedCommand) {}

    async fn after_run(&self, _command: &ParsedCommand, _outcome: &RouteResult<RunOutput>) {}

    async fn after_route(&self, _summary: &RouteSummary<'_>) {}
}

/// Events that do nothing.
#[derive(Debug, Default, Clone, Copy)]
pub struct NoopEvents;

impl RouteEvents for NoopEvents {}

/// Default events: structured log lines.
#[derive(Debug, Default, Clone, Copy)]
pub struct TracingEvents;

#[async_trait]
impl RouteEvents for TracingEvents {
    async fn before_route(&self, request: &TerminalRequest) {
        debug!(
            request_id = %request.id,
            sender_id = request.sender_id.as_deref().unwrap_or("-"),
            "routing request"
        );
    }

    async fn after_check(&self, command: &ParsedCommand, outcome: &RouteResult<()>) {
        if let Err(e) = outcome {
            debug!(
                request_id = %command.request.id,
                command = %command.descriptor.id,
                code = %e.error_code(),
                error = %e,
                "check failed"
            );
        }
    }

    async fn after_route(&self, summary: &RouteSummary<'_>) {
        let command = summary.command.map(|c| c.descriptor.id.as_str()).unwrap_or("-");
        let elapsed_ms = summary.elapsed.as_secs_f64() * 1000.0;
        match summary.result.error_code() {
            None => info!(
                request_id = %summary.request.id,
                command,
                elapsed_ms,
                "request completed"
            ),
            Some(code) => warn!(
                request_id = %summary.request.id,
                command,
                %code,
                reached = %summary.reached,
                elapsed_ms,
                "request failed"
            ),
        }
    }
}
