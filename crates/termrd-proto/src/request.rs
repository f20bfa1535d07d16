//! Terminal requests and the HTTP batch envelope.

use serde::{Deserialize, Serialize};

use crate::result::CommandResult;

/// One unit of input received by a transport.
///
/// `raw` is unverified command text; the router parses it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TerminalRequest {
    /// Unique id of the logical request (unique within a batch).
    pub id: String,
    /// Raw command text.
    pub raw: String,
    /// Id of the sender, for remote clients.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub sender_id: Option<String>,
    /// Endpoint of the sender, for remote clients.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub sender_endpoint: Option<String>,
}

impl TerminalRequest {
    /// Create a request without sender information.
    pub fn new(id: impl Into<String>, raw: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            raw: raw.into(),
            sender_id: None,
            sender_endpoint: None,
        }
    }

    /// Tag the request with its origin.
    pub fn with_sender(mut self, sender_id: impl Into<String>, endpoint: impl Into<String>) -> Self {
        self.sender_id = Some(sender_id.into());
        self.sender_endpoint = Some(endpoint.into());
        self
    }
}

/// JSON envelope accepted and returned by the HTTP boundary.
///
/// On the way in `results` is usually empty. On the way out it holds one
/// entry per request, in request order; an entry without a result is `null`.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct TerminalInputOutput {
    /// Requests in submission order.
    pub requests: Vec<TerminalRequest>,
    /// Results aligned with `requests`.
    #[serde(default)]
    pub results: Vec<Option<CommandResult>>,
}

impl TerminalInputOutput {
    /// Envelope holding a single request.
    pub fn single(request: TerminalRequest) -> Self {
        Self {
            requests: vec![request],
            results: Vec::new(),
        }
    }

    /// Envelope holding a batch of requests.
    pub fn batch(requests: Vec<TerminalRequest>) -> Self {
        Self {
            requests,
            results: Vec::new(),
        }
    }

    /// Whether this envelope carries more than one request.
    pub fn is_batch(&self) -> bool {
        self.requests.len() > 1
    }

    /// Result for the request with the given id.
    pub fn result_for(&self, id: &str) -> Option<&CommandResult> {
        let index = self.requests.iter().position(|r| r.id == id)?;
        self.results.get(index)?.as_ref()
    }
}
