//! Runner and checker traits.
//!
//! A command is bound to exactly one [`Runner`] and at most one [`Checker`].
//! Checkers run after the built-in value checks and before the runner; a
//! checker error fails the request without running it.

use async_trait::async_trait;
use serde_json::Value;

use super::context::RunContext;
use crate::error::RouteResult;

/// Payload of a successful run.
pub type RunOutput = Option<Value>;

/// Executes a parsed command.
#[async_trait]
pub trait Runner: Send + Sync {
    async fn run(&self, ctx: &RunContext<'_>) -> RouteResult<RunOutput>;
}

/// Validates a parsed command before it runs.
#[async_trait]
pub trait Checker: Send + Sync {
    async fn check(&self, ctx: &RunContext<'_>) -> RouteResult<()>;
}

/// Adapter turning a plain function into a [`Runner`].
pub struct FnRunner<F>(F);

impl<F> FnRunner<F>
where
    F: Fn(&RunContext<'_>) -> RouteResult<RunOutput> + Send + Sync,
{
    pub fn new(f: F) -> Self {
        Self(f)
    }
}

#[async_trait]
impl<F> Runner for FnRunner<F>
where
    F: Fn(&RunContext<'_>) -> RouteResult<RunOutput> + Send + Sync,
{
    async fn run(&self, ctx: &RunContext<'_>) -> RouteResult<RunOutput> {
        (self.0)(ctx)
    }
}

/// Adapter turning a plain function into a [`Checker`].
pub struct FnChecker<F>(F);

impl<F> FnChecker<F>
where
    F: Fn(&RunContext<'_>) -> RouteResult<()> + Send + Sync,
{
    pub fn new(f: F) -> Self {
        Self(f)
    }
}

#[async_trait]
impl<F> Checker for FnChecker<F>
where
    F: Fn(&RunContext<'_>) -> RouteResult<()> + Send + Sync,
{
    async fn check(&self, ctx: &RunContext<'_>) -> RouteResult<()> {
        (self.0)(ctx)
    }
}
