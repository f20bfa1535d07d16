//! Result correlation.
//!
//! Results are matched to their requests by the immutable request id, never
//! by position. A batch registers one ticket per request, workers complete
//! tickets in any order, and [`PendingBatch::collect`] returns the outputs in
//! input order.

use std::collections::HashSet;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};

use dashmap::DashMap;
use termrd_proto::{CommandResult, CorrelatedOutput, TerminalRequest};
use tokio::sync::oneshot;
use tracing::{debug, error};

use crate::error::{RouteError, RouteResult};

/// Attach `result` to `request`, carrying the sender fields through.
///
/// A result produced under another id is replaced by a `server_error`
/// result for this request.
pub fn correlate(request: &TerminalRequest, result: CommandResult) -> CorrelatedOutput {
    if result.request_id != request.id {
        error!(
            request_id = %request.id,
            result_id = %result.request_id,
            "Result delivered under the wrong request id"
        );
        let mismatch = RouteError::ServerError(format!(
            "result for '{}' was delivered to '{}'",
            result.request_id, request.id
        ));
        return CorrelatedOutput::new(request, mismatch.to_result(&request.id));
    }
    CorrelatedOutput::new(request, result)
}

/// Key of one in-flight request.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Ticket {
    pub batch: u64,
    pub request_id: String,
}

/// Tracks in-flight requests until their results arrive.
#[derive(Debug, Default)]
pub struct Correlator {
    pending: DashMap<Ticket, oneshot::Sender<CommandResult>>,
    next_batch: AtomicU64,
    closed: AtomicBool,
}

impl Correlator {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a batch. Request ids must be unique within it.
    pub fn register_batch(self: &Arc<Self>, requests: &[TerminalRequest]) -> RouteResult<PendingBatch> {
        if self.closed.load(Ordering::Acquire) {
            return Err(RouteError::ConnectionClosed);
        }

        let mut seen = HashSet::with_capacity(requests.len());
        for request in requests {
            if !seen.insert(request.id.as_str()) {
                return Err(RouteError::InvalidRequest(format!(
                    "request id '{}' appears more than once in the batch",
                    request.id
                )));
            }
        }

        let batch = self.next_batch.fetch_add(1, Ordering::Relaxed);
        let entries = requests
            .iter()
            .map(|request| {
                let ticket = Ticket {
                    batch,
                    request_id: request.id.clone(),
                };
                let (tx, rx) = oneshot::channel();
                self.pending.insert(ticket.clone(), tx);
                Entry {
                    ticket,
                    request: request.clone(),
                    rx,
                }
            })
            .collect();

        debug!(batch, size = requests.len(), "Registered batch");
        Ok(PendingBatch {
            correlator: Arc::clone(self),
            entries,
        })
    }

    /// Deliver the result for `ticket`.
    ///
    /// Returns false when nobody is waiting any more.
    pub fn complete(&self, ticket: &Ticket, result: CommandResult) -> bool {
        match self.pending.remove(ticket) {
            Some((_, tx)) => tx.send(result).is_ok(),
            None => {
                debug!(batch = ticket.batch, request_id = %ticket.request_id, "Result for abandoned ticket");
                false
            }
        }
    }

    /// Requests awaiting a result.
    pub fn in_flight(&self) -> usize {
        self.pending.len()
    }

    /// Refuse new batches and abandon every pending ticket.
    pub fn close(&self) {
        self.closed.store(true, Ordering::Release);
        self.pending.clear();
    }
}

struct Entry {
    ticket: Ticket,
    request: TerminalRequest,
    rx: oneshot::Receiver<CommandResult>,
}

/// A registered batch awaiting its results.
///
/// Dropping it abandons every ticket still pending.
pub struct PendingBatch {
    correlator: Arc<Correlator>,
    entries: Vec<Entry>,
}

impl PendingBatch {
    /// Tickets with their requests, in input order.
    pub fn tickets(&self) -> impl Iterator<Item = (&Ticket, &TerminalRequest)> {
        self.entries.iter().map(|e| (&e.ticket, &e.request))
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Wait for every result, returning outputs in input order.
    pub async fn collect(mut self) -> Vec<CorrelatedOutput> {
        let entries = std::mem::take(&mut self.entries);
        let mut outputs = Vec::with_capacity(entries.len());
        for entry in entries {
            let result = match entry.rx.await {
                Ok(result) => result,
                Err(_) => RouteError::ConnectionClosed.to_result(&entry.request.id),
            };
            outputs.push(correlate(&entry.request, result));
        }
        outputs
    }
}

impl Drop for PendingBatch {
    fn drop(&mut self) {
        for entry in &self.entries {
            self.correlator.pending.remove(&entry.ticket);
        }
    }
}

impl std::fmt::Debug for PendingBatch {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PendingBatch")
            .field("tickets", &self.entries.iter().map(|e| &e.ticket).collect::<Vec<_>>())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use termrd_proto::ErrorCode;

    fn requests(ids: &[&str]) -> Vec<TerminalRequest> {
        ids.iter()
            .map(|id| TerminalRequest::new(*id, "ping").with_sender("T1", "127.0.0.1:4000"))
            .collect()
    }

    #[test]
    fn test_correlate_keeps_sender() {
        let request = TerminalRequest::new("1", "ping").with_sender("T1", "10.0.0.1:5");
        let output = correlate(&request, CommandResult::success("1", None));
        assert_eq!(output.request_id, "1");
        assert_eq!(output.sender_id.as_deref(), Some("T1"));
        assert_eq!(output.sender_endpoint.as_deref(), Some("10.0.0.1:5"));
        assert!(output.result.success);
    }

    #[test]
    fn test_correlate_rejects_wrong_id() {
        let request = TerminalRequest::new("1", "ping");
        let output = correlate(&request, CommandResult::success("2", None));
        assert_eq!(output.request_id, "1");
        assert_eq!(output.result.request_id, "1");
        assert_eq!(output.result.error_code(), Some(ErrorCode::ServerError));
    }

    #[tokio::test]
    async fn test_out_of_order_completion_keeps_input_order() {
        let correlator = Arc::new(Correlator::new());
        let batch = correlator.register_batch(&requests(&["a", "b", "c"])).unwrap();
        let tickets: Vec<Ticket> = batch.tickets().map(|(t, _)| t.clone()).collect();

        for ticket in tickets.iter().rev() {
            let payload = serde_json::json!(ticket.request_id);
            assert!(correlator.complete(ticket, CommandResult::success(&ticket.request_id, Some(payload))));
        }

        let outputs = batch.collect().await;
        let ids: Vec<&str> = outputs.iter().map(|o| o.request_id.as_str()).collect();
        assert_eq!(ids, ["a", "b", "c"]);
        for output in &outputs {
            assert_eq!(output.result.payload, Some(serde_json::json!(output.request_id)));
        }
        assert_eq!(correlator.in_flight(), 0);
    }

    #[test]
    fn test_duplicate_ids_rejected() {
        let correlator = Arc::new(Correlator::new());
        let err = correlator.register_batch(&requests(&["a", "a"])).unwrap_err();
        assert_eq!(err.error_code(), ErrorCode::InvalidRequest);
        assert_eq!(correlator.in_flight(), 0);
    }

    #[test]
    fn test_same_id_in_separate_batches() {
        let correlator = Arc::new(Correlator::new());
        let first = correlator.register_batch(&requests(&["1"])).unwrap();
        let second = correlator.register_batch(&requests(&["1"])).unwrap();
        assert_eq!(correlator.in_flight(), 2);

        let first_ticket = first.tickets().next().unwrap().0.clone();
        let second_ticket = second.tickets().next().unwrap().0.clone();
        assert_ne!(first_ticket, second_ticket);
    }

    #[tokio::test]
    async fn test_dropped_batch_abandons_tickets() {
        let correlator = Arc::new(Correlator::new());
        let batch = correlator.register_batch(&requests(&["a"])).unwrap();
        let ticket = batch.tickets().next().unwrap().0.clone();
        drop(batch);

        assert_eq!(correlator.in_flight(), 0);
        assert!(!correlator.complete(&ticket, CommandResult::success("a", None)));
    }

    #[tokio::test]
    async fn test_close_resolves_connection_closed() {
        let correlator = Arc::new(Correlator::new());
        let batch = correlator.register_batch(&requests(&["a", "b"])).unwrap();
        let ticket = batch.tickets().next().unwrap().0.clone();
        correlator.complete(&ticket, CommandResult::success("a", None));
        correlator.close();

        let outputs = batch.collect().await;
        assert!(outputs[0].result.success);
        assert_eq!(outputs[1].result.error_code(), Some(ErrorCode::ConnectionClosed));

        let err = correlator.register_batch(&requests(&["c"])).unwrap_err();
        assert_eq!(err, RouteError::ConnectionClosed);
    }
}
