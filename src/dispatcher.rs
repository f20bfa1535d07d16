//! Queue consumers.
//!
//! Transports submit batches; `router.workers` tasks drain the queue, each
//! routing one request to completion before taking the next. A failed
//! request never stops a worker. Closing the queue or firing the shutdown
//! token does.

use std::sync::Arc;

use parking_lot::Mutex;
use termrd_proto::{CorrelatedOutput, TerminalRequest};
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use crate::correlator::{Correlator, Ticket, correlate};
use crate::error::RouteError;
use crate::metrics;
use crate::queue::{Dequeued, RequestQueue};
use crate::router::Router;

/// A queued request with its reply ticket and its own token.
#[derive(Debug)]
pub struct Envelope {
    pub ticket: Ticket,
    pub request: TerminalRequest,
    pub cancel: CancellationToken,
}

/// Owns the worker pool and the submission side of the queue.
pub struct Dispatcher {
    queue: RequestQueue<Envelope>,
    correlator: Arc<Correlator>,
    workers: Mutex<Vec<JoinHandle<()>>>,
}

impl Dispatcher {
    /// Start `workers` consumers (at least one).
    pub fn spawn(
        queue: RequestQueue<Envelope>,
        router: Arc<Router>,
        correlator: Arc<Correlator>,
        workers: usize,
        shutdown: CancellationToken,
    ) -> Arc<Self> {
        let handles = (0..workers.max(1))
            .map(|index| {
                tokio::spawn(worker(
                    index,
                    queue.clone(),
                    Arc::clone(&router),
                    Arc::clone(&correlator),
                    shutdown.clone(),
                ))
            })
            .collect();

        info!(workers = workers.max(1), capacity = queue.capacity(), "Dispatcher started");
        Arc::new(Self {
            queue,
            correlator,
            workers: Mutex::new(handles),
        })
    }

    /// Route a batch and wait for its outputs, in input order.
    ///
    /// `cancel` bounds the whole batch; each request runs under a child of
    /// it. Requests the queue refuses are answered at once.
    pub async fn submit_batch(
        &self,
        requests: Vec<TerminalRequest>,
        cancel: &CancellationToken,
    ) -> Vec<CorrelatedOutput> {
        metrics::record_batch();

        let batch = match self.correlator.register_batch(&requests) {
            Ok(batch) => batch,
            Err(e) => {
                warn!(error = %e, size = requests.len(), "Batch refused");
                return requests
                    .iter()
                    .map(|request| correlate(request, e.to_result(&request.id)))
                    .collect();
            }
        };

        for (ticket, request) in batch.tickets() {
            let envelope = Envelope {
                ticket: ticket.clone(),
                request: request.clone(),
                cancel: cancel.child_token(),
            };
            if let Err(e) = self.queue.enqueue(envelope) {
                metrics::record_queue_rejected();
                warn!(request_id = %request.id, error = %e, "Request refused by queue");
                self.correlator
                    .complete(ticket, RouteError::from(e).to_result(&request.id));
            }
        }
        metrics::set_queue_depth(self.queue.len());

        batch.collect().await
    }

    /// Route a single request under its own token.
    pub async fn submit(
        &self,
        request: TerminalRequest,
        cancel: &CancellationToken,
    ) -> CorrelatedOutput {
        let fallback = request.clone();
        match self.submit_batch(vec![request], cancel).await.pop() {
            Some(output) => output,
            None => correlate(&fallback, RouteError::ConnectionClosed.to_result(&fallback.id)),
        }
    }

    pub fn queue(&self) -> &RequestQueue<Envelope> {
        &self.queue
    }

    pub fn correlator(&self) -> &Arc<Correlator> {
        &self.correlator
    }

    /// Close the queue, abandon pending tickets and wait for the workers.
    pub async fn shutdown(&self) {
        self.queue.close().await;
        self.correlator.close();

        let handles = std::mem::take(&mut *self.workers.lock());
        for handle in handles {
            if let Err(e) = handle.await {
                warn!(error = %e, "Worker ended abnormally");
            }
        }
        info!("Dispatcher stopped");
    }
}

impl std::fmt::Debug for Dispatcher {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Dispatcher")
            .field("queued", &self.queue.len())
            .field("in_flight", &self.correlator.in_flight())
            .field("workers", &self.workers.lock().len())
            .finish()
    }
}

async fn worker(
    index: usize,
    queue: RequestQueue<Envelope>,
    router: Arc<Router>,
    correlator: Arc<Correlator>,
    shutdown: CancellationToken,
) {
    debug!(worker = index, "Worker started");
    loop {
        let envelope = match queue.dequeue(&shutdown).await {
            Dequeued::Item(envelope) => envelope,
            Dequeued::Canceled => {
                debug!(worker = index, "Worker stopping on shutdown");
                break;
            }
            Dequeued::Closed => {
                debug!(worker = index, "Worker stopping: queue closed");
                break;
            }
        };
        metrics::set_queue_depth(queue.len());

        let result = router.route(&envelope.request, &envelope.cancel).await;
        correlator.complete(&envelope.ticket, result);
    }
}
