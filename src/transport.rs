//! Request/reply transport for the local command channel
//!
//! The dispatcher consumes the channel through the narrow `ReplyTransport`
//! trait: one bounded-wait receive, one send answering the request just
//! received. The production implementation serves length-prefixed frames
//! over a local TCP listener, one client conversation at a time.

use anyhow::{bail, Context, Result};
use async_trait::async_trait;
use bytes::Bytes;
use commandd_shared::codec::FrameDecoder;
use std::net::SocketAddr;
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::{TcpListener, TcpStream};
use tokio::time::{timeout_at, Duration, Instant};
use tracing::{debug, warn};

/// A strict request/reply channel
#[async_trait]
pub trait ReplyTransport: Send {
    /// Wait up to `wait` for the next request frame.
    /// `Ok(None)` means nothing arrived inside the window.
    async fn recv_timeout(&mut self, wait: Duration) -> Result<Option<Bytes>>;

    /// Answer the request most recently returned by `recv_timeout`
    async fn send(&mut self, frame: Bytes) -> Result<()>;
}

struct ClientConn {
    stream: TcpStream,
    decoder: FrameDecoder,
    read_buf: Vec<u8>,
}

impl ClientConn {
    fn new(stream: TcpStream) -> Self {
        Self {
            stream,
            decoder: FrameDecoder::new(),
            read_buf: vec![0u8; 4096],
        }
    }
}

/// TCP implementation of the command channel
pub struct TcpReplyTransport {
    listener: TcpListener,
    conn: Option<ClientConn>,
}

impl TcpReplyTransport {
    pub async fn bind(addr: &str) -> Result<Self> {
        let listener = TcpListener::bind(addr)
            .await
            .with_context(|| format!("failed to bind command channel on {addr}"))?;
        Ok(Self {
            listener,
            conn: None,
        })
    }

    /// The actual bound address (useful when binding port 0)
    pub fn local_addr(&self) -> Result<SocketAddr> {
        Ok(self.listener.local_addr()?)
    }
}

#[async_trait]
impl ReplyTransport for TcpReplyTransport {
    async fn recv_timeout(&mut self, wait: Duration) -> Result<Option<Bytes>> {
        let deadline = Instant::now() + wait;

        loop {
            // Accept a client if none is connected
            if self.conn.is_none() {
                match timeout_at(deadline, self.listener.accept()).await {
                    Ok(Ok((stream, addr))) => {
                        debug!("client connected: {addr}");
                        self.conn = Some(ClientConn::new(stream));
                    }
                    Ok(Err(err)) => {
                        warn!("accept failed: {err}");
                        continue;
                    }
                    Err(_) => return Ok(None),
                }
            }

            let conn = self.conn.as_mut().unwrap();

            // Drain a buffered frame before reading more
            match conn.decoder.decode_next() {
                Ok(Some(payload)) => return Ok(Some(payload)),
                Ok(None) => {}
                Err(err) => {
                    // Framing is broken beyond recovery for this client only
                    warn!("dropping client after framing error: {err}");
                    self.conn = None;
                    continue;
                }
            }

            match timeout_at(deadline, conn.stream.read(&mut conn.read_buf)).await {
                Ok(Ok(0)) => {
                    debug!("client disconnected");
                    self.conn = None;
                }
                Ok(Ok(n)) => {
                    conn.decoder.extend(&conn.read_buf[..n]);
                }
                Ok(Err(err)) => {
                    warn!("client read error: {err}");
                    self.conn = None;
                }
                Err(_) => return Ok(None),
            }
        }
    }

    async fn send(&mut self, frame: Bytes) -> Result<()> {
        let Some(conn) = self.conn.as_mut() else {
            bail!("no connected client to reply to");
        };
        if let Err(err) = conn.stream.write_all(&frame).await {
            self.conn = None;
            return Err(err).context("failed to write reply frame");
        }
        Ok(())
    }
}
