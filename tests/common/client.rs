//! Test clients.
//!
//! [`TestClient`] speaks framing v1 over TCP; [`HttpClient`] issues plain
//! HTTP/1.1 requests against the HTTP boundary.

use std::net::SocketAddr;
use std::time::Duration;

use futures_util::{SinkExt, StreamExt};
use termrd_proto::{CorrelatedOutput, Frame, FrameCodec, FramingConfig, TerminalInputOutput};
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::TcpStream;
use tokio::net::tcp::{OwnedReadHalf, OwnedWriteHalf};
use tokio::time::timeout;
use tokio_util::codec::{FramedRead, FramedWrite};

/// A framed remote terminal client.
pub struct TestClient {
    reader: FramedRead<OwnedReadHalf, FrameCodec>,
    writer: FramedWrite<OwnedWriteHalf, FrameCodec>,
}

impl TestClient {
    /// Connect to a test server.
    pub async fn connect(address: SocketAddr) -> anyhow::Result<Self> {
        let stream = TcpStream::connect(address).await?;
        let (read_half, write_half) = stream.into_split();
        Ok(Self {
            reader: FramedRead::new(read_half, FrameCodec::responses(FramingConfig::default())?),
            writer: FramedWrite::new(write_half, FrameCodec::new()),
        })
    }

    /// Send raw bytes, bypassing the encoder.
    pub async fn send_bytes(&mut self, bytes: &[u8]) -> anyhow::Result<()> {
        let stream = self.writer.get_mut();
        stream.write_all(bytes).await?;
        stream.flush().await?;
        Ok(())
    }

    /// Send one batch of raw commands.
    pub async fn send_batch(&mut self, commands: &[&str]) -> anyhow::Result<()> {
        for command in commands {
            self.writer.feed(Frame::Message(command.to_string())).await?;
        }
        self.writer.send(Frame::EndOfBatch).await?;
        Ok(())
    }

    /// Receive outputs up to the next batch delimiter.
    pub async fn recv_batch(&mut self) -> anyhow::Result<Vec<CorrelatedOutput>> {
        self.recv_batch_timeout(Duration::from_secs(5)).await
    }

    pub async fn recv_batch_timeout(&mut self, dur: Duration) -> anyhow::Result<Vec<CorrelatedOutput>> {
        let mut outputs = Vec::new();
        loop {
            let frame = timeout(dur, self.reader.next())
                .await?
                .ok_or_else(|| anyhow::anyhow!("connection closed"))??;
            match frame {
                Frame::Message(json) => outputs.push(serde_json::from_str(&json)?),
                Frame::EndOfBatch => return Ok(outputs),
            }
        }
    }

    /// Send a batch and wait for its outputs.
    pub async fn roundtrip(&mut self, commands: &[&str]) -> anyhow::Result<Vec<CorrelatedOutput>> {
        self.send_batch(commands).await?;
        self.recv_batch().await
    }

    /// Whether the server has closed the connection.
    pub async fn is_closed(&mut self) -> bool {
        matches!(
            timeout(Duration::from_secs(2), self.reader.next()).await,
            Ok(None) | Ok(Some(Err(_)))
        )
    }
}

/// Minimal HTTP/1.1 client.
pub struct HttpClient {
    address: SocketAddr,
}

/// Status and body of an HTTP response.
pub struct HttpResponse {
    pub status: u16,
    pub body: String,
}

impl HttpClient {
    pub fn new(address: SocketAddr) -> Self {
        Self { address }
    }

    async fn request(&self, method: &str, path: &str, body: &str) -> anyhow::Result<HttpResponse> {
        let mut stream = TcpStream::connect(self.address).await?;
        let request = format!(
            "{method} {path} HTTP/1.1\r\nHost: {}\r\nContent-Type: application/json\r\nContent-Length: {}\r\nConnection: close\r\n\r\n{body}",
            self.address,
            body.len()
        );
        stream.write_all(request.as_bytes()).await?;

        let mut raw = Vec::new();
        timeout(Duration::from_secs(5), stream.read_to_end(&mut raw)).await??;
        let raw = String::from_utf8(raw)?;

        let (head, body) = raw
            .split_once("\r\n\r\n")
            .ok_or_else(|| anyhow::anyhow!("malformed response"))?;
        let status = head
            .split_whitespace()
            .nth(1)
            .ok_or_else(|| anyhow::anyhow!("missing status"))?
            .parse()?;
        Ok(HttpResponse {
            status,
            body: body.to_string(),
        })
    }

    pub async fn get(&self, path: &str) -> anyhow::Result<HttpResponse> {
        self.request("GET", path, "").await
    }

    pub async fn post_json(&self, path: &str, body: &str) -> anyhow::Result<HttpResponse> {
        self.request("POST", path, body).await
    }

    /// POST an envelope to `/terminal` and decode the reply.
    pub async fn terminal(&self, input: &TerminalInputOutput) -> anyhow::Result<TerminalInputOutput> {
        let response = self
            .post_json("/terminal", &serde_json::to_string(input)?)
            .await?;
        anyhow::ensure!(response.status == 200, "status {}: {}", response.status, response.body);
        Ok(serde_json::from_str(&response.body)?)
    }
}
