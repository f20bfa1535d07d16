//! Context passed to runners and checkers.

use std::sync::Arc;

use termrd_proto::TerminalRequest;
use tokio_util::sync::CancellationToken;

use crate::commands::CommandStore;
use crate::license::License;
use crate::parser::ParsedCommand;

/// Everything a command sees while it is checked and run.
pub struct RunContext<'a> {
    /// The originating request.
    pub request: &'a TerminalRequest,
    /// The parsed invocation.
    pub command: &'a ParsedCommand,
    /// License snapshot taken when routing started.
    pub license: &'a Arc<License>,
    /// Fires when the request is canceled or times out.
    pub cancel: &'a CancellationToken,
    /// Declared commands, for introspection.
    pub commands: &'a CommandStore,
}

impl<'a> RunContext<'a> {
    #[inline]
    pub fn command_id(&self) -> &'a str {
        &self.command.descriptor.id
    }

    #[inline]
    pub fn is_canceled(&self) -> bool {
        self.cancel.is_cancelled()
    }
}
