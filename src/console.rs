//! Local console: one request per input line, one JSON output per line.
//!
//! Lines longer than the framing message limit are answered with
//! `invalid_request` and never reach the queue.

use std::sync::Arc;

use futures_util::StreamExt;
use termrd_proto::{CorrelatedOutput, ProtocolError, TerminalRequest};
use tokio::io::{AsyncRead, AsyncWrite, AsyncWriteExt};
use tokio_util::codec::{FramedRead, LinesCodec, LinesCodecError};
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use crate::correlator::correlate;
use crate::dispatcher::Dispatcher;
use crate::error::RouteError;

/// Sender id of console requests.
pub const CONSOLE_SENDER: &str = "console";

const CONSOLE_ENDPOINT: &str = "stdin";

/// Longest UTF-8 encoding of one character.
const MAX_CHAR_BYTES: usize = 4;

/// Read requests from `input` until it ends or `shutdown` fires.
pub async fn run_console<R, W>(
    input: R,
    mut output: W,
    dispatcher: Arc<Dispatcher>,
    max_message_length: usize,
    shutdown: CancellationToken,
) -> std::io::Result<()>
where
    R: AsyncRead + Unpin,
    W: AsyncWrite + Unpin,
{
    let codec = LinesCodec::new_with_max_length(max_message_length.saturating_mul(MAX_CHAR_BYTES));
    let mut lines = FramedRead::new(input, codec);
    let mut next_id: u64 = 1;
    // FramedRead yields one None after a decode error before resuming
    let mut resuming = false;
    info!("Console ready");

    loop {
        let line = tokio::select! {
            _ = shutdown.cancelled() => break,
            line = lines.next() => line,
        };
        let id = next_id.to_string();

        let result = match line {
            None if resuming => {
                resuming = false;
                continue;
            }
            None => {
                debug!("Console input closed");
                break;
            }
            Some(Err(LinesCodecError::Io(e))) => return Err(e),
            Some(Err(LinesCodecError::MaxLineLengthExceeded)) => {
                resuming = true;
                rejected(&id, format!("message too long (limit: {max_message_length} characters)"))
            }
            Some(Ok(line)) => {
                resuming = false;
                let chars = line.chars().count();
                if chars > max_message_length {
                    let error = ProtocolError::MessageTooLong {
                        actual: chars,
                        limit: max_message_length,
                    };
                    rejected(&id, error.to_string())
                } else {
                    let request =
                        TerminalRequest::new(&id, line).with_sender(CONSOLE_SENDER, CONSOLE_ENDPOINT);
                    let cancel = shutdown.child_token();
                    dispatcher.submit(request, &cancel).await
                }
            }
        };
        next_id += 1;

        let mut json = serde_json::to_vec(&result).map_err(std::io::Error::other)?;
        json.push(b'\n');
        output.write_all(&json).await?;
        output.flush().await?;
    }
    Ok(())
}

fn rejected(id: &str, reason: String) -> CorrelatedOutput {
    warn!(request_id = %id, reason = %reason, "Console line rejected");
    let request = TerminalRequest::new(id, "").with_sender(CONSOLE_SENDER, CONSOLE_ENDPOINT);
    correlate(&request, RouteError::InvalidRequest(reason).to_result(id))
}

/// Run the console on the process's stdin and stdout.
pub async fn run_stdio(
    dispatcher: Arc<Dispatcher>,
    max_message_length: usize,
    shutdown: CancellationToken,
) -> std::io::Result<()> {
    run_console(tokio::io::stdin(), tokio::io::stdout(), dispatcher, max_message_length, shutdown).await
}
