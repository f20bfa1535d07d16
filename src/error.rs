//! Unified error handling for termrd.
//!
//! This module provides the error hierarchy for the routing pipeline, with
//! stable error codes and conversion into failed command results.

use termrd_proto::{CommandResult, ErrorCode};
use thiserror::Error;

// ============================================================================
// Route Errors (request processing)
// ============================================================================

/// Errors that can fail a single routed request.
///
/// Every variant maps onto exactly one stable [`ErrorCode`]; the display text
/// becomes the human-readable description of the failed result.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum RouteError {
    #[error("no command supplied")]
    MissingCommand,

    #[error("command '{0}' is not supported")]
    UnsupportedCommand(String),

    #[error("command '{command}' cannot be invoked: {reason}")]
    InvalidCommand { command: String, reason: String },

    #[error("option '{option}' is invalid: {reason}")]
    InvalidOption { option: String, reason: String },

    #[error("required option '{0}' is missing")]
    MissingOption(String),

    #[error("option '{option}' is not supported by command '{command}'")]
    UnsupportedOption { command: String, option: String },

    #[error("option '{0}' may only be given once")]
    DuplicateOption(String),

    #[error("argument '{argument}' is invalid: {reason}")]
    InvalidArgument { argument: String, reason: String },

    #[error("required argument '{0}' is missing")]
    MissingArgument(String),

    #[error("unexpected argument '{0}'")]
    UnsupportedArgument(String),

    #[error("invalid request: {0}")]
    InvalidRequest(String),

    #[error("invalid configuration: {0}")]
    InvalidConfiguration(String),

    #[error("no valid license is available")]
    InvalidLicense,

    #[error("request carries no identity")]
    MissingIdentity,

    #[error("license lacks claim '{0}'")]
    MissingClaim(String),

    #[error("access to command '{0}' is denied")]
    UnauthorizedAccess(String),

    #[error("invalid declaration: {0}")]
    InvalidDeclaration(String),

    #[error("request was canceled")]
    RequestCanceled,

    #[error("request timed out after {0} ms")]
    RequestTimedOut(u64),

    #[error("connection closed before a result was produced")]
    ConnectionClosed,

    #[error("internal error: {0}")]
    ServerError(String),
}

impl RouteError {
    /// Stable error code for this failure.
    #[inline]
    pub fn error_code(&self) -> ErrorCode {
        match self {
            Self::MissingCommand => ErrorCode::MissingCommand,
            Self::UnsupportedCommand(_) => ErrorCode::UnsupportedCommand,
            Self::InvalidCommand { .. } => ErrorCode::InvalidCommand,
            Self::InvalidOption { .. } => ErrorCode::InvalidOption,
            Self::MissingOption(_) => ErrorCode::MissingOption,
            Self::UnsupportedOption { .. } => ErrorCode::UnsupportedOption,
            Self::DuplicateOption(_) => ErrorCode::DuplicateOption,
            Self::InvalidArgument { .. } => ErrorCode::InvalidArgument,
            Self::MissingArgument(_) => ErrorCode::MissingArgument,
            Self::UnsupportedArgument(_) => ErrorCode::UnsupportedArgument,
            Self::InvalidRequest(_) => ErrorCode::InvalidRequest,
            Self::InvalidConfiguration(_) => ErrorCode::InvalidConfiguration,
            Self::InvalidLicense => ErrorCode::InvalidLicense,
            Self::MissingIdentity => ErrorCode::MissingIdentity,
            Self::MissingClaim(_) => ErrorCode::MissingClaim,
            Self::UnauthorizedAccess(_) => ErrorCode::UnauthorizedAccess,
            Self::InvalidDeclaration(_) => ErrorCode::InvalidDeclaration,
            Self::RequestCanceled | Self::RequestTimedOut(_) => ErrorCode::RequestCanceled,
            Self::ConnectionClosed => ErrorCode::ConnectionClosed,
            Self::ServerError(_) => ErrorCode::ServerError,
        }
    }

    /// Convert into a failed result for `request_id`.
    pub fn to_result(&self, request_id: impl Into<String>) -> CommandResult {
        CommandResult::failure(request_id, self.error_code(), self.to_string())
    }

    pub(crate) fn invalid_option(option: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::InvalidOption {
            option: option.into(),
            reason: reason.into(),
        }
    }

    pub(crate) fn invalid_argument(argument: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::InvalidArgument {
            argument: argument.into(),
            reason: reason.into(),
        }
    }
}

/// Result type for routing stages.
pub type RouteResult<T> = Result<T, RouteError>;

// ============================================================================
// Queue Errors (infrastructure)
// ============================================================================

/// Request queue failures.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum QueueError {
    #[error("request queue is full")]
    Full,

    #[error("request queue is closed")]
    Closed,
}

impl From<QueueError> for RouteError {
    fn from(err: QueueError) -> Self {
        match err {
            QueueError::Full => RouteError::ServerError("request queue is full".to_string()),
            QueueError::Closed => RouteError::ConnectionClosed,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_route_error_codes() {
        assert_eq!(RouteError::MissingCommand.error_code(), ErrorCode::MissingCommand);
        assert_eq!(
            RouteError::DuplicateOption("version".into()).error_code(),
            ErrorCode::DuplicateOption
        );
        assert_eq!(
            RouteError::RequestTimedOut(25_000).error_code(),
            ErrorCode::RequestCanceled
        );
        assert_eq!(
            RouteError::ServerError("boom".into()).error_code(),
            ErrorCode::ServerError
        );
    }

    #[test]
    fn test_to_result_carries_description() {
        let result = RouteError::UnsupportedCommand("nope".into()).to_result("7");
        assert_eq!(result.request_id, "7");
        assert!(!result.success);
        let error = result.error.unwrap();
        assert_eq!(error.code, ErrorCode::UnsupportedCommand);
        assert_eq!(error.description, "command 'nope' is not supported");
    }

    #[test]
    fn test_queue_error_conversion() {
        assert_eq!(
            RouteError::from(QueueError::Full).error_code(),
            ErrorCode::ServerError
        );
        assert_eq!(
            RouteError::from(QueueError::Closed).error_code(),
            ErrorCode::ConnectionClosed
        );
    }
}
