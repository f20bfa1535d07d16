//! Command results and correlated output.

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::code::ErrorCode;
use crate::request::TerminalRequest;

/// Typed error attached to a failed result.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ErrorDescriptor {
    /// Stable error code.
    pub code: ErrorCode,
    /// Human-readable description.
    pub description: String,
}

/// Outcome of routing one request.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CommandResult {
    /// Id of the request that produced this result.
    pub request_id: String,
    /// Whether the command completed.
    pub success: bool,
    /// Payload returned by the command, if any.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub payload: Option<Value>,
    /// Error descriptor, present when `success` is false.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<ErrorDescriptor>,
}

impl CommandResult {
    /// A completed result with an optional payload.
    pub fn success(request_id: impl Into<String>, payload: Option<Value>) -> Self {
        Self {
            request_id: request_id.into(),
            success: true,
            payload,
            error: None,
        }
    }

    /// A failed result.
    pub fn failure(
        request_id: impl Into<String>,
        code: ErrorCode,
        description: impl Into<String>,
    ) -> Self {
        Self {
            request_id: request_id.into(),
            success: false,
            payload: None,
            error: Some(ErrorDescriptor {
                code,
                description: description.into(),
            }),
        }
    }

    /// Error code of a failed result.
    pub fn error_code(&self) -> Option<ErrorCode> {
        self.error.as_ref().map(|e| e.code)
    }
}

/// A result re-associated with the request (and sender) that produced it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CorrelatedOutput {
    /// Id of the originating request.
    pub request_id: String,
    /// Sender id, carried through unchanged.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub sender_id: Option<String>,
    /// Sender endpoint, carried through unchanged.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub sender_endpoint: Option<String>,
    /// The result.
    pub result: CommandResult,
}

impl CorrelatedOutput {
    /// Attach `result` to `request`.
    ///
    /// Correlation is keyed on the request, the caller must have checked
    /// that `result.request_id` matches.
    pub fn new(request: &TerminalRequest, result: CommandResult) -> Self {
        Self {
            request_id: request.id.clone(),
            sender_id: request.sender_id.clone(),
            sender_endpoint: request.sender_endpoint.clone(),
            result,
        }
    }
}
