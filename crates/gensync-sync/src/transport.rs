//! Transport abstraction for the sync session.
//!
//! A transport is a reliable, ordered, bidirectional channel carrying
//! [`SyncMessage`]s. [`FramedTransport`] provides one over any async byte
//! stream using a 4-byte big-endian length prefix followed by a CBOR body.

use std::time::{Duration, Instant};

use async_trait::async_trait;
use tokio::io::{AsyncRead, AsyncReadExt, AsyncWrite, AsyncWriteExt};

use crate::error::{Result, SyncError};
use crate::messages::SyncMessage;

/// Largest frame body accepted in either direction.
pub const MAX_FRAME_SIZE: usize = 16 * 1024 * 1024;

/// Byte, message and timing counters for one connection.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct TransferStats {
    pub bytes_sent: u64,
    pub bytes_received: u64,
    pub messages_sent: u64,
    pub messages_received: u64,
    /// Time spent writing frames and reading frame bodies.
    pub io_time: Duration,
    /// Time spent in `recv` waiting for the peer to start a frame.
    pub idle_time: Duration,
}

/// Transport trait for sending and receiving sync messages with one peer.
#[async_trait]
pub trait Transport: Send {
    /// Send a message to the peer.
    async fn send(&mut self, message: &SyncMessage) -> Result<()>;

    /// Receive the next message from the peer.
    ///
    /// Blocks until a message is available or an error occurs.
    async fn recv(&mut self) -> Result<SyncMessage>;

    /// Shut down the write half and release the connection.
    async fn close(&mut self) -> Result<()>;

    /// Traffic counters so far.
    fn stats(&self) -> TransferStats;

    /// Human-readable peer address.
    fn peer(&self) -> &str;
}

/// Length-prefixed CBOR framing over an async byte stream.
#[derive(Debug)]
pub struct FramedTransport<S> {
    stream: S,
    peer: String,
    stats: TransferStats,
}

impl<S> FramedTransport<S>
where
    S: AsyncRead + AsyncWrite + Unpin + Send,
{
    /// Wrap an established stream.
    pub fn new(stream: S, peer: impl Into<String>) -> Self {
        Self {
            stream,
            peer: peer.into(),
            stats: TransferStats::default(),
        }
    }

    /// Unwrap the underlying stream.
    pub fn into_inner(self) -> S {
        self.stream
    }
}

/// Encode a message into a frame body.
pub fn encode_frame(message: &SyncMessage) -> Result<Vec<u8>> {
    message
        .validate_limits()
        .map_err(|e| SyncError::InvalidMessage(e.into()))?;

    let mut body = Vec::new();
    ciborium::into_writer(message, &mut body).map_err(|e| SyncError::Codec(e.to_string()))?;
    if body.len() > MAX_FRAME_SIZE {
        return Err(SyncError::Codec(format!(
            "frame of {} bytes exceeds limit of {}",
            body.len(),
            MAX_FRAME_SIZE
        )));
    }
    Ok(body)
}

/// Decode a frame body into a message.
pub fn decode_frame(body: &[u8]) -> Result<SyncMessage> {
    let message: SyncMessage =
        ciborium::from_reader(body).map_err(|e| SyncError::Codec(e.to_string()))?;
    message
        .validate_limits()
        .map_err(|e| SyncError::InvalidMessage(e.into()))?;
    Ok(message)
}

fn io_error(context: &str, e: std::io::Error) -> SyncError {
    if e.kind() == std::io::ErrorKind::UnexpectedEof {
        SyncError::Transport(format!("{}: peer closed the connection", context))
    } else {
        SyncError::Transport(format!("{}: {}", context, e))
    }
}

#[async_trait]
impl<S> Transport for FramedTransport<S>
where
    S: AsyncRead + AsyncWrite + Unpin + Send,
{
    async fn send(&mut self, message: &SyncMessage) -> Result<()> {
        let body = encode_frame(message)?;
        // encode_frame caps the body well below u32::MAX
        let len = body.len() as u32;
        let started = Instant::now();

        self.stream
            .write_u32(len)
            .await
            .map_err(|e| io_error("send", e))?;
        self.stream
            .write_all(&body)
            .await
            .map_err(|e| io_error("send", e))?;
        self.stream.flush().await.map_err(|e| io_error("send", e))?;

        self.stats.io_time += started.elapsed();
        self.stats.bytes_sent += 4 + u64::from(len);
        self.stats.messages_sent += 1;
        tracing::debug!("sent {} ({} bytes) to {}", message.kind(), len, self.peer);
        Ok(())
    }

    async fn recv(&mut self) -> Result<SyncMessage> {
        let waiting = Instant::now();
        let len = self.stream.read_u32().await;
        self.stats.idle_time += waiting.elapsed();
        let len = len.map_err(|e| io_error("recv", e))? as usize;
        if len > MAX_FRAME_SIZE {
            return Err(SyncError::Codec(format!(
                "incoming frame of {} bytes exceeds limit of {}",
                len, MAX_FRAME_SIZE
            )));
        }

        let reading = Instant::now();
        let mut body = vec![0u8; len];
        self.stream
            .read_exact(&mut body)
            .await
            .map_err(|e| io_error("recv", e))?;
        self.stats.io_time += reading.elapsed();

        self.stats.bytes_received += 4 + len as u64;
        self.stats.messages_received += 1;

        let message = decode_frame(&body)?;
        tracing::debug!("received {} ({} bytes) from {}", message.kind(), len, self.peer);
        Ok(message)
    }

    async fn close(&mut self) -> Result<()> {
        self.stream
            .shutdown()
            .await
            .map_err(|e| io_error("close", e))
    }

    fn stats(&self) -> TransferStats {
        self.stats
    }

    fn peer(&self) -> &str {
        &self.peer
    }
}

/// A framed transport over TCP.
pub type TcpTransport = FramedTransport<tokio::net::TcpStream>;

/// TCP connection establishment.
pub mod tcp {
    use std::io::ErrorKind;
    use std::time::Duration;

    use tokio::net::{TcpListener, TcpStream};

    use super::TcpTransport;
    use crate::error::{Result, SyncError};

    /// Connect to `host:port`.
    ///
    /// Refused connections are retried every `retry_interval` until the
    /// peer starts listening. With `timeout = None` this waits forever.
    pub async fn connect(
        host: &str,
        port: u16,
        timeout: Option<Duration>,
        retry_interval: Duration,
    ) -> Result<TcpTransport> {
        let attempt = async {
            loop {
                match TcpStream::connect((host, port)).await {
                    Ok(stream) => return Ok(stream),
                    Err(e) if is_retryable(e.kind()) => {
                        tracing::debug!("{}:{} not accepting yet ({}), retrying", host, port, e);
                        tokio::time::sleep(retry_interval).await;
                    }
                    Err(e) => {
                        return Err(SyncError::Transport(format!(
                            "could not connect to {}:{}: {}",
                            host, port, e
                        )))
                    }
                }
            }
        };

        let stream = match timeout {
            Some(limit) => tokio::time::timeout(limit, attempt).await.map_err(|_| {
                SyncError::Transport(format!(
                    "gave up connecting to {}:{} after {:?}",
                    host, port, limit
                ))
            })??,
            None => attempt.await?,
        };

        stream
            .set_nodelay(true)
            .map_err(|e| SyncError::Transport(e.to_string()))?;
        let peer = stream
            .peer_addr()
            .map(|a| a.to_string())
            .unwrap_or_else(|_| format!("{}:{}", host, port));
        tracing::info!("connected to {}", peer);
        Ok(TcpTransport::new(stream, peer))
    }

    /// Bind a listener on `host:port`.
    pub async fn bind(host: &str, port: u16) -> Result<TcpListener> {
        let listener = TcpListener::bind((host, port)).await.map_err(|e| {
            SyncError::Transport(format!("could not listen on {}:{}: {}", host, port, e))
        })?;
        if let Ok(addr) = listener.local_addr() {
            tracing::info!("listening on {}", addr);
        }
        Ok(listener)
    }

    /// Accept exactly one connection from `listener`, then drop it.
    pub async fn accept_one(
        listener: TcpListener,
        timeout: Option<Duration>,
    ) -> Result<TcpTransport> {
        let accepted = match timeout {
            Some(limit) => tokio::time::timeout(limit, listener.accept())
                .await
                .map_err(|_| {
                    SyncError::Transport(format!("no peer connected within {:?}", limit))
                })?,
            None => listener.accept().await,
        };
        let (stream, remote) =
            accepted.map_err(|e| SyncError::Transport(format!("accept failed: {}", e)))?;

        stream
            .set_nodelay(true)
            .map_err(|e| SyncError::Transport(e.to_string()))?;
        tracing::info!("accepted connection from {}", remote);
        Ok(TcpTransport::new(stream, remote.to_string()))
    }

    /// Listen on `host:port` and accept exactly one connection.
    pub async fn accept(host: &str, port: u16, timeout: Option<Duration>) -> Result<TcpTransport> {
        let listener = bind(host, port).await?;
        accept_one(listener, timeout).await
    }

    fn is_retryable(kind: ErrorKind) -> bool {
        matches!(
            kind,
            ErrorKind::ConnectionRefused | ErrorKind::ConnectionReset | ErrorKind::TimedOut
        )
    }
}

/// An in-memory transport pair for testing.
pub mod memory {
    use tokio::io::DuplexStream;

    use super::FramedTransport;

    /// Buffer size of each direction of the pipe.
    const PIPE_CAPACITY: usize = 64 * 1024;

    /// In-memory transport implementation.
    pub type MemoryTransport = FramedTransport<DuplexStream>;

    /// Create two transports wired to each other.
    pub fn pair() -> (MemoryTransport, MemoryTransport) {
        let (a, b) = tokio::io::duplex(PIPE_CAPACITY);
        (
            FramedTransport::new(a, "memory:a"),
            FramedTransport::new(b, "memory:b"),
        )
    }
}
