//! Command router.
//!
//! Drives one request through license check, parse, check and run, and
//! always produces a [`CommandResult`] tagged with the request id:
//!
//! 1. `before_route`
//! 2. no license: fail with `invalid_license` without parsing
//! 3. parse
//! 4. `before_check`, value checks, command checker, `after_check`
//! 5. `before_run`, runner, `after_run`
//! 6. `after_route`, exactly once
//!
//! Steps 4 and 5 race the request's cancellation token and the router
//! timeout; either firing fails the request with `request_canceled`.
//! A panic anywhere along the way fails the request with `server_error`.

pub mod events;
pub mod state;

pub use events::{NoopEvents, RouteEvents, RouteSummary, TracingEvents};
pub use state::RouteState;

use std::any::Any;
use std::future::Future;
use std::panic::AssertUnwindSafe;
use std::sync::Arc;
use std::time::Duration;

use futures_util::FutureExt;
use termrd_proto::{CommandResult, ErrorCode, TerminalRequest};
use tokio::time::Instant;
use tokio_util::sync::CancellationToken;
use tracing::{Instrument, error};

use crate::error::{RouteError, RouteResult};
use crate::handlers::{Binding, Checker, Registry, RunContext, RunOutput, ValueChecker};
use crate::license::LicenseGate;
use crate::parser::{Parse, ParsedCommand};
use crate::telemetry::{CommandTimer, spans};

/// Default router timeout.
pub const DEFAULT_TIMEOUT: Duration = Duration::from_millis(25_000);

/// Routes requests to their commands.
pub struct Router {
    gate: Arc<LicenseGate>,
    parser: Arc<dyn Parse>,
    registry: Arc<Registry>,
    events: Arc<dyn RouteEvents>,
    timeout: Option<Duration>,
}

/// Progress carried across the pipeline for the final summary.
struct Progress {
    reached: RouteState,
    command: Option<ParsedCommand>,
}

impl Router {
    pub fn new(gate: Arc<LicenseGate>, parser: Arc<dyn Parse>, registry: Arc<Registry>) -> Self {
        Self {
            gate,
            parser,
            registry,
            events: Arc::new(TracingEvents),
            timeout: Some(DEFAULT_TIMEOUT),
        }
    }

    pub fn with_events(mut self, events: Arc<dyn RouteEvents>) -> Self {
        self.events = events;
        self
    }

    /// `None` disables the timeout.
    pub fn with_timeout(mut self, timeout: Option<Duration>) -> Self {
        self.timeout = timeout;
        self
    }

    pub fn registry(&self) -> &Arc<Registry> {
        &self.registry
    }

    pub fn gate(&self) -> &Arc<LicenseGate> {
        &self.gate
    }

    /// Route one request. Never fails: errors become failed results.
    pub async fn route(&self, request: &TerminalRequest, cancel: &CancellationToken) -> CommandResult {
        let span = spans::request(&request.id, request.sender_id.as_deref());
        AssertUnwindSafe(self.route_inner(request, cancel))
            .catch_unwind()
            .instrument(span)
            .await
            .unwrap_or_else(|panic| {
                error!(request_id = %request.id, panic = %panic_message(&*panic), "routing panicked");
                crate::metrics::record_request_error(ErrorCode::ServerError.as_str());
                RouteError::ServerError("request failed unexpectedly".to_string()).to_result(&request.id)
            })
    }

    async fn route_inner(&self, request: &TerminalRequest, cancel: &CancellationToken) -> CommandResult {
        let mut timer = CommandTimer::new("-");
        self.events.before_route(request).await;

        let mut progress = Progress {
            reached: RouteState::Received,
            command: None,
        };
        let outcome = self.pipeline(request, cancel, &mut progress).await;

        let (result, state) = match outcome {
            Ok(payload) => (
                CommandResult::success(&request.id, payload),
                progress.reached.advance(RouteState::Completed),
            ),
            Err(e) => {
                crate::metrics::record_request_error(e.error_code().as_str());
                (
                    e.to_result(&request.id),
                    progress.reached.advance(RouteState::Failed(e.error_code())),
                )
            }
        };

        if let Some(command) = &progress.command {
            timer.set_command(&command.descriptor.id);
        }
        let summary = RouteSummary {
            request,
            command: progress.command.as_ref(),
            result: &result,
            reached: progress.reached,
            state,
            elapsed: timer.elapsed(),
        };
        self.events.after_route(&summary).await;
        result
    }

    async fn pipeline(
        &self,
        request: &TerminalRequest,
        cancel: &CancellationToken,
        progress: &mut Progress,
    ) -> RouteResult<RunOutput> {
        let Some(license) = self.gate.current_license().await else {
            return Err(RouteError::InvalidLicense);
        };
        progress.reached = progress.reached.advance(RouteState::LicenseChecked);

        let command: &ParsedCommand = progress.command.insert(self.parser.parse(request)?);
        progress.reached = progress.reached.advance(RouteState::Parsed);

        let command_id = command.descriptor.id.as_str();
        self.registry.record_use(command_id);
        let Some(binding) = self.registry.binding(command_id) else {
            return Err(RouteError::ServerError(format!(
                "no runner bound to command '{command_id}'"
            )));
        };

        // Timeout cancels this token so runners observe it too
        let token = cancel.child_token();
        let deadline = self.timeout.map(|t| Instant::now() + t);
        let ctx = RunContext {
            request,
            command,
            license: &license,
            cancel: &token,
            commands: self.registry.store(),
        };

        self.events.before_check(command).await;
        let checks = AssertUnwindSafe(check(&ctx, binding))
            .catch_unwind()
            .map(|outcome| outcome.unwrap_or_else(|panic| Err(panicked(command_id, "checker", panic))));
        let checked = self.guarded(&token, deadline, checks).await;
        self.events.after_check(command, &checked).await;
        checked?;
        progress.reached = progress.reached.advance(RouteState::Checked);

        self.events.before_run(command).await;
        let run = AssertUnwindSafe(binding.runner.run(&ctx))
            .catch_unwind()
            .map(|outcome| outcome.unwrap_or_else(|panic| Err(panicked(command_id, "runner", panic))));
        let ran = self.guarded(&token, deadline, run).await;
        self.events.after_run(command, &ran).await;
        let output = ran?;
        progress.reached = progress.reached.advance(RouteState::Executed);

        Ok(output)
    }

    async fn guarded<T>(
        &self,
        token: &CancellationToken,
        deadline: Option<Instant>,
        work: impl Future<Output = RouteResult<T>>,
    ) -> RouteResult<T> {
        let timeout = async {
            match deadline {
                Some(deadline) => tokio::time::sleep_until(deadline).await,
                None => std::future::pending().await,
            }
        };

        tokio::select! {
            biased;
            _ = token.cancelled() => Err(RouteError::RequestCanceled),
            _ = timeout => {
                token.cancel();
                let millis = self.timeout.map(|t| t.as_millis() as u64).unwrap_or_default();
                Err(RouteError::RequestTimedOut(millis))
            }
            outcome = work => outcome,
        }
    }
}

async fn check(ctx: &RunContext<'_>, binding: &Binding) -> RouteResult<()> {
    ValueChecker.check(ctx).await?;
    if let Some(checker) = &binding.checker {
        checker.check(ctx).await?;
    }
    Ok(())
}

fn panic_message(panic: &(dyn Any + Send)) -> String {
    panic
        .downcast_ref::<&str>()
        .map(|s| s.to_string())
        .or_else(|| panic.downcast_ref::<String>().cloned())
        .unwrap_or_else(|| "unknown panic".to_string())
}

fn panicked(command_id: &str, stage: &str, panic: Box<dyn Any + Send>) -> RouteError {
    error!(command = %command_id, stage, panic = %panic_message(&*panic), "command panicked");
    RouteError::ServerError(format!("command '{command_id}' failed unexpectedly"))
}

impl std::fmt::Debug for Router {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Router")
            .field("gate", &self.gate)
            .field("registry", &self.registry)
            .field("timeout", &self.timeout)
            .finish()
    }
}
