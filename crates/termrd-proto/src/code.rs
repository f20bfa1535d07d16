//! Stable error codes exposed at the transport boundary.
//!
//! These identifiers are part of the wire contract: clients match on the
//! string form, never on Rust type names.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Error code carried by a failed [`CommandResult`](crate::CommandResult).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
#[non_exhaustive]
pub enum ErrorCode {
    /// The command exists but cannot be invoked this way.
    InvalidCommand,
    /// The server configuration is invalid.
    InvalidConfiguration,
    /// An option value or option usage is invalid.
    InvalidOption,
    /// An argument value is invalid.
    InvalidArgument,
    /// A non-repeatable option was given more than once.
    DuplicateOption,
    /// The request itself is malformed.
    InvalidRequest,
    /// The option is not declared by the command.
    UnsupportedOption,
    /// The command is not registered.
    UnsupportedCommand,
    /// More arguments than the command declares.
    UnsupportedArgument,
    /// Unexpected failure inside the server.
    ServerError,
    /// A required option is absent.
    MissingOption,
    /// A required argument is absent.
    MissingArgument,
    /// The request does not name a command.
    MissingCommand,
    /// No identity accompanies the request.
    MissingIdentity,
    /// The license lacks a claim required by the command.
    MissingClaim,
    /// The request was canceled or timed out.
    RequestCanceled,
    /// No valid license is available.
    InvalidLicense,
    /// The caller is not permitted to run the command.
    UnauthorizedAccess,
    /// A command declaration is inconsistent.
    InvalidDeclaration,
    /// The connection or queue closed before a result was produced.
    ConnectionClosed,
}

impl ErrorCode {
    /// Every code, in declaration order.
    pub const ALL: [ErrorCode; 20] = [
        Self::InvalidCommand,
        Self::InvalidConfiguration,
        Self::InvalidOption,
        Self::InvalidArgument,
        Self::DuplicateOption,
        Self::InvalidRequest,
        Self::UnsupportedOption,
        Self::UnsupportedCommand,
        Self::UnsupportedArgument,
        Self::ServerError,
        Self::MissingOption,
        Self::MissingArgument,
        Self::MissingCommand,
        Self::MissingIdentity,
        Self::MissingClaim,
        Self::RequestCanceled,
        Self::InvalidLicense,
        Self::UnauthorizedAccess,
        Self::InvalidDeclaration,
        Self::ConnectionClosed,
    ];

    /// The stable string identifier.
    #[inline]
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::InvalidCommand => "invalid_command",
            Self::InvalidConfiguration => "invalid_configuration",
            Self::InvalidOption => "invalid_option",
            Self::InvalidArgument => "invalid_argument",
            Self::DuplicateOption => "duplicate_option",
            Self::InvalidRequest => "invalid_request",
            Self::UnsupportedOption => "unsupported_option",
            Self::UnsupportedCommand => "unsupported_command",
            Self::UnsupportedArgument => "unsupported_argument",
            Self::ServerError => "server_error",
            Self::MissingOption => "missing_option",
            Self::MissingArgument => "missing_argument",
            Self::MissingCommand => "missing_command",
            Self::MissingIdentity => "missing_identity",
            Self::MissingClaim => "missing_claim",
            Self::RequestCanceled => "request_canceled",
            Self::InvalidLicense => "invalid_license",
            Self::UnauthorizedAccess => "unauthorized_access",
            Self::InvalidDeclaration => "invalid_declaration",
            Self::ConnectionClosed => "connection_closed",
        }
    }
}

impl fmt::Display for ErrorCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Unknown error code string.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("unknown error code: {0}")]
pub struct UnknownErrorCode(pub String);

impl FromStr for ErrorCode {
    type Err = UnknownErrorCode;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::ALL
            .iter()
            .copied()
            .find(|code| code.as_str() == s)
            .ok_or_else(|| UnknownErrorCode(s.to_string()))
    }
}
