//! Per-connection echo work: read one request, answer with what was received.

use std::net::SocketAddr;
use std::time::Duration;

use anyhow::{Context, Result};
use async_trait::async_trait;
use tokio::io::{AsyncBufReadExt, AsyncReadExt, AsyncWriteExt, BufReader};
use tokio::net::TcpStream;

use crate::work::WorkFunction;

use super::request::{parse_head, RequestHead};

/// Largest request head accepted, in bytes.
const MAX_HEAD_BYTES: usize = 16 * 1024;
/// Largest request body accepted, in bytes.
const MAX_BODY_BYTES: usize = 16 * 1024 * 1024;
/// After rejecting a request, unread input discarded before closing.
const LINGER_BYTES: u64 = 256 * 1024;
const LINGER_TIMEOUT: Duration = Duration::from_secs(1);

/// An accepted client connection handed to the dispatcher.
#[derive(Debug)]
pub struct Connection {
    pub stream: TcpStream,
    pub peer: SocketAddr,
}

/// Answers one request per connection, then closes it.
#[derive(Debug, Clone, Copy)]
pub struct EchoHandler {
    pub io_timeout: Duration,
}

impl EchoHandler {
    pub fn new(io_timeout: Duration) -> Self {
        Self { io_timeout }
    }
}

impl Default for EchoHandler {
    fn default() -> Self {
        Self::new(Duration::from_secs(10))
    }
}

#[async_trait]
impl WorkFunction<Connection> for EchoHandler {
    async fn call(&self, conn: Connection) -> Result<()> {
        tokio::time::timeout(self.io_timeout, handle(conn))
            .await
            .context("echo connection timed out")?
    }
}

async fn handle(conn: Connection) -> Result<()> {
    let Connection { stream, peer } = conn;
    let mut reader = BufReader::new(stream);

    let parsed = read_head(&mut reader)
        .await
        .and_then(|head| head.content_length().map(|len| (head, len)));
    let (head, len) = match parsed {
        Ok(parsed) => parsed,
        Err(e) => {
            reject(&mut reader, "400 Bad Request").await;
            return Err(e);
        }
    };
    if len > MAX_BODY_BYTES {
        reject(&mut reader, "413 Payload Too Large").await;
        anyhow::bail!("request body of {} bytes exceeds limit", len);
    }

    let mut body = vec![0u8; len];
    reader
        .read_exact(&mut body)
        .await
        .context("read request body")?;

    let echoed = render_echo(&head, peer, &body);
    let response = format!(
        "HTTP/1.1 200 OK\r\nContent-Type: text/plain; charset=utf-8\r\nContent-Length: {}\r\nConnection: close\r\n\r\n",
        echoed.len()
    );
    let stream = reader.get_mut();
    stream
        .write_all(response.as_bytes())
        .await
        .context("write response head")?;
    stream.write_all(&echoed).await.context("write response body")?;
    stream.shutdown().await.context("close connection")?;
    Ok(())
}

/// Read lines up to the blank line ending the request head, never buffering
/// more than `MAX_HEAD_BYTES + 1` bytes of it.
async fn read_head(reader: &mut BufReader<TcpStream>) -> Result<RequestHead> {
    let mut limited = (&mut *reader).take(MAX_HEAD_BYTES as u64 + 1);
    let mut head = String::new();
    loop {
        let n = limited
            .read_line(&mut head)
            .await
            .context("read request head")?;
        if head.len() > MAX_HEAD_BYTES {
            anyhow::bail!("request head exceeds {} bytes", MAX_HEAD_BYTES);
        }
        if n == 0 {
            anyhow::bail!("connection closed before request head ended");
        }
        if head.ends_with("\r\n\r\n") || head == "\r\n" {
            break;
        }
    }
    parse_head(&head)
}

/// Send an empty error response, half-close, and discard what the client is
/// still sending so the close does not reset the connection under the reply.
async fn reject(reader: &mut BufReader<TcpStream>, status: &str) {
    let response = format!(
        "HTTP/1.1 {}\r\nContent-Length: 0\r\nConnection: close\r\n\r\n",
        status
    );
    let stream = reader.get_mut();
    if let Err(e) = stream.write_all(response.as_bytes()).await {
        tracing::debug!("write {} response: {}", status, e);
        return;
    }
    let _ = stream.shutdown().await;
    let mut rest = (&mut *reader).take(LINGER_BYTES);
    let _ = tokio::time::timeout(LINGER_TIMEOUT, tokio::io::copy(&mut rest, &mut tokio::io::sink())).await;
}

/// Body of the echo response: method, target, peer, headers, then the request body.
pub fn render_echo(head: &RequestHead, peer: SocketAddr, body: &[u8]) -> Vec<u8> {
    let mut out = format!(
        "\nmethod: {}\nurl: {}\norigin: {}\nheaders:",
        head.method, head.target, peer
    );
    for (name, value) in &head.headers {
        out.push_str(&format!("\n\t{}: {}", name, value));
    }
    out.push_str("\ndata: ");
    let mut out = out.into_bytes();
    out.extend_from_slice(body);
    out
}
