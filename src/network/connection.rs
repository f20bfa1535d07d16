//! Connection - handles one remote terminal client.
//!
//! A reader task frames the inbound stream and hands complete batches to the
//! connection loop, which submits them and writes the outputs back:
//!
//! ```text
//!  FramedRead ──batch──▶ connection loop ──submit_batch──▶ Dispatcher
//!                              │
//!  FramedWrite ◀───outputs─────┘  (one message per output, then EndOfBatch)
//! ```
//!
//! Outputs are framed with the response codec. An output longer than the
//! response limit is replaced by a `server_error` result under the same id.
//! A framing violation answers with a single `invalid_request` output and
//! closes the connection. A read failure cancels every in-flight request of
//! the connection. A clean end of stream lets queued batches finish first.

use std::net::SocketAddr;
use std::sync::Arc;

use futures_util::{SinkExt, StreamExt};
use termrd_proto::{
    CorrelatedOutput, Frame, FrameCodec, FramingConfig, ProtocolError, TerminalRequest,
};
use tokio::io::{AsyncRead, AsyncWrite};
use tokio::sync::mpsc;
use tokio_util::codec::{FramedRead, FramedWrite};
use tokio_util::sync::CancellationToken;
use tracing::{Instrument, debug, info, warn};

use crate::correlator::correlate;
use crate::dispatcher::Dispatcher;
use crate::error::RouteError;
use crate::metrics;
use crate::telemetry::spans;

/// Complete batches buffered between the reader and the connection loop.
const INBOUND_BUFFER: usize = 8;

enum Inbound {
    Batch(Vec<TerminalRequest>),
    Malformed {
        request_id: String,
        error: ProtocolError,
    },
}

/// Decrements the active connection gauge on drop.
struct ActiveGuard;

impl ActiveGuard {
    fn new() -> Self {
        metrics::connection_opened();
        Self
    }
}

impl Drop for ActiveGuard {
    fn drop(&mut self) {
        metrics::connection_closed();
    }
}

/// A remote client connection.
pub struct Connection<S> {
    sender_id: String,
    peer: SocketAddr,
    stream: S,
    dispatcher: Arc<Dispatcher>,
    framing: FramingConfig,
    shutdown: CancellationToken,
}

impl<S> Connection<S>
where
    S: AsyncRead + AsyncWrite + Unpin + Send + 'static,
{
    pub fn new(
        sender_id: String,
        peer: SocketAddr,
        stream: S,
        dispatcher: Arc<Dispatcher>,
        framing: FramingConfig,
        shutdown: CancellationToken,
    ) -> Self {
        Self {
            sender_id,
            peer,
            stream,
            dispatcher,
            framing,
            shutdown,
        }
    }

    /// Serve the client until it disconnects or the server shuts down.
    pub async fn run(self) -> anyhow::Result<()> {
        let span = spans::connection(&self.sender_id, &self.peer.to_string());
        self.serve().instrument(span).await
    }

    async fn serve(self) -> anyhow::Result<()> {
        let Self {
            sender_id,
            peer,
            stream,
            dispatcher,
            framing,
            shutdown,
        } = self;
        let endpoint = peer.to_string();

        let (read_half, write_half) = tokio::io::split(stream);
        let frames = FramedRead::new(read_half, FrameCodec::with_config(framing)?);
        let mut writer = FramedWrite::new(write_half, FrameCodec::responses(framing)?);

        let _active = ActiveGuard::new();
        info!("Client connected");

        let cancel = shutdown.child_token();
        let (tx, mut rx) = mpsc::channel(INBOUND_BUFFER);
        let reader = tokio::spawn(
            read_batches(frames, sender_id.clone(), endpoint.clone(), tx, cancel.clone())
                .in_current_span(),
        );

        let result = loop {
            let inbound = tokio::select! {
                _ = cancel.cancelled() => break Ok(()),
                inbound = rx.recv() => inbound,
            };
            match inbound {
                Some(Inbound::Batch(requests)) => {
                    debug!(size = requests.len(), "Batch received");
                    let outputs = dispatcher.submit_batch(requests, &cancel).await;
                    if let Err(e) = write_batch(&mut writer, &outputs).await {
                        break Err(e);
                    }
                }
                Some(Inbound::Malformed { request_id, error }) => {
                    warn!(error = %error, "Framing error, closing connection");
                    let request =
                        TerminalRequest::new(&request_id, "").with_sender(&sender_id, &endpoint);
                    let rejection = RouteError::InvalidRequest(error.to_string());
                    let output = correlate(&request, rejection.to_result(&request_id));
                    break write_batch(&mut writer, std::slice::from_ref(&output)).await;
                }
                None => break Ok(()),
            }
        };

        cancel.cancel();
        reader.abort();
        if let Err(e) = writer.close().await {
            debug!(error = %e, "Failed to close writer");
        }
        info!("Client disconnected");
        result
    }
}

/// Frame the inbound stream into batches until it ends or fails.
async fn read_batches<R>(
    mut frames: FramedRead<R, FrameCodec>,
    sender_id: String,
    endpoint: String,
    tx: mpsc::Sender<Inbound>,
    cancel: CancellationToken,
) where
    R: AsyncRead + Unpin,
{
    let mut batch = Vec::new();
    let mut next_id: u64 = 1;

    loop {
        let frame = tokio::select! {
            _ = cancel.cancelled() => return,
            frame = frames.next() => frame,
        };

        match frame {
            Some(Ok(Frame::Message(raw))) => {
                batch.push(
                    TerminalRequest::new(next_id.to_string(), raw)
                        .with_sender(&sender_id, &endpoint),
                );
                next_id += 1;
            }
            Some(Ok(Frame::EndOfBatch)) => {
                if tx.send(Inbound::Batch(std::mem::take(&mut batch))).await.is_err() {
                    return;
                }
            }
            Some(Err(error)) if error.is_recoverable() => {
                let malformed = Inbound::Malformed {
                    request_id: next_id.to_string(),
                    error,
                };
                if tx.send(malformed).await.is_err() {
                    debug!("Connection loop gone before framing error was reported");
                }
                return;
            }
            Some(Err(error)) => {
                debug!(error = %error, "Read failed, canceling in-flight requests");
                cancel.cancel();
                return;
            }
            None => {
                if !batch.is_empty() {
                    debug!(discarded = batch.len(), "Stream ended inside a batch");
                }
                return;
            }
        }
    }
}

/// Write one message per output followed by the batch delimiter.
async fn write_batch<W>(
    writer: &mut FramedWrite<W, FrameCodec>,
    outputs: &[CorrelatedOutput],
) -> anyhow::Result<()>
where
    W: AsyncWrite + Unpin,
{
    let limit = writer.encoder().max_length();
    for output in outputs {
        writer.feed(Frame::Message(encode_output(output, limit)?)).await?;
    }
    writer.send(Frame::EndOfBatch).await?;
    Ok(())
}

fn encode_output(output: &CorrelatedOutput, limit: usize) -> anyhow::Result<String> {
    let json = serde_json::to_string(output)?;
    let chars = json.chars().count();
    if chars <= limit {
        return Ok(json);
    }

    warn!(request_id = %output.request_id, chars, limit, "Output exceeds response limit");
    let oversized = RouteError::ServerError(format!(
        "result of {chars} characters exceeds the response limit of {limit}"
    ));
    let replacement = CorrelatedOutput {
        result: oversized.to_result(&output.request_id),
        ..output.clone()
    };
    Ok(serde_json::to_string(&replacement)?)
}

/// Answer a client the server cannot take with a `connection_closed` batch.
pub(crate) async fn refuse<W>(
    stream: W,
    sender_id: &str,
    peer: SocketAddr,
    framing: FramingConfig,
) -> anyhow::Result<()>
where
    W: AsyncWrite + Unpin,
{
    let mut writer = FramedWrite::new(stream, FrameCodec::responses(framing)?);
    let request = TerminalRequest::new("0", "").with_sender(sender_id, peer.to_string());
    let output = correlate(&request, RouteError::ConnectionClosed.to_result("0"));
    write_batch(&mut writer, std::slice::from_ref(&output)).await?;
    writer.close().await?;
    Ok(())
}
