//! Uniform I/O over plain TCP and TLS session streams.
//!
//! Every variable-length payload on the wire is preceded by a signed 64-bit
//! big-endian size frame; `-1` marks a directory entry and carries no body.
//! Reads and writes are bounded by a 500 ms per-call timeout and a small
//! retry budget so a hung peer cannot pin a worker.

use std::io;
use std::time::Duration;

use thiserror::Error;
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::TcpStream;
use tokio::time::timeout;
use tokio_rustls::server::TlsStream;

/// Per-call receive/send timeout.
const IO_TIMEOUT: Duration = Duration::from_millis(500);
/// Transient errors tolerated before the peer is considered gone.
const MAX_RETRIES: u32 = 10;

#[derive(Debug, Error)]
pub enum StreamError {
    #[error("peer closed the connection")]
    PeerGone,

    #[error("socket error: {0}")]
    Io(#[from] io::Error),

    #[error("transient error budget exhausted")]
    RetriesExhausted,

    #[error("socket is closed")]
    Closed,
}

/// How to tear a session stream down.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CloseMode {
    /// Read one byte to the discard first, so the peer drains our last write
    /// before seeing FIN.
    WaitPeerEof,
    /// Shut down right away.
    Immediate,
    /// Drop the descriptor without a shutdown handshake. For TLS this skips
    /// `close_notify`; used when a prior error makes the record layer
    /// untrustworthy.
    ImmediateNoShutdown,
}

enum Inner {
    Plain(TcpStream),
    Tls(Box<TlsStream<TcpStream>>),
}

impl Inner {
    async fn read_some(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        match self {
            Inner::Plain(s) => s.read(buf).await,
            Inner::Tls(s) => s.read(buf).await,
        }
    }

    async fn write_some(&mut self, buf: &[u8]) -> io::Result<usize> {
        match self {
            Inner::Plain(s) => s.write(buf).await,
            Inner::Tls(s) => s.write(buf).await,
        }
    }

    async fn shutdown(&mut self) -> io::Result<()> {
        match self {
            Inner::Plain(s) => s.shutdown().await,
            Inner::Tls(s) => s.shutdown().await,
        }
    }
}

/// A session stream, plain or TLS, valid until [`PeerStream::close`] is
/// called. I/O after close fails with [`StreamError::Closed`].
pub struct PeerStream {
    inner: Option<Inner>,
}

fn is_transient(kind: io::ErrorKind) -> bool {
    matches!(
        kind,
        io::ErrorKind::Interrupted | io::ErrorKind::WouldBlock | io::ErrorKind::TimedOut
    )
}

impl PeerStream {
    pub fn plain(stream: TcpStream) -> Self {
        Self { inner: Some(Inner::Plain(stream)) }
    }

    pub fn tls(stream: TlsStream<TcpStream>) -> Self {
        Self { inner: Some(Inner::Tls(Box::new(stream))) }
    }

    pub fn is_tls(&self) -> bool {
        matches!(self.inner, Some(Inner::Tls(_)))
    }

    fn inner(&mut self) -> Result<&mut Inner, StreamError> {
        self.inner.as_mut().ok_or(StreamError::Closed)
    }

    /// Read exactly `buf.len()` bytes.
    pub async fn read_exact(&mut self, buf: &mut [u8]) -> Result<(), StreamError> {
        let mut filled = 0;
        let mut retries = 0;
        while filled < buf.len() {
            let inner = self.inner.as_mut().ok_or(StreamError::Closed)?;
            match timeout(IO_TIMEOUT, inner.read_some(&mut buf[filled..])).await {
                Ok(Ok(0)) => return Err(StreamError::PeerGone),
                Ok(Ok(n)) => {
                    filled += n;
                    retries = 0;
                }
                Ok(Err(e)) if !is_transient(e.kind()) => return Err(StreamError::Io(e)),
                Ok(Err(_)) | Err(_) => {
                    retries += 1;
                    if retries > MAX_RETRIES {
                        return Err(StreamError::RetriesExhausted);
                    }
                }
            }
        }
        Ok(())
    }

    /// Write all of `buf`.
    pub async fn write_exact(&mut self, buf: &[u8]) -> Result<(), StreamError> {
        let mut written = 0;
        let mut retries = 0;
        while written < buf.len() {
            let inner = self.inner.as_mut().ok_or(StreamError::Closed)?;
            match timeout(IO_TIMEOUT, inner.write_some(&buf[written..])).await {
                Ok(Ok(0)) => return Err(StreamError::PeerGone),
                Ok(Ok(n)) => {
                    written += n;
                    retries = 0;
                }
                Ok(Err(e)) if !is_transient(e.kind()) => return Err(StreamError::Io(e)),
                Ok(Err(_)) | Err(_) => {
                    retries += 1;
                    if retries > MAX_RETRIES {
                        return Err(StreamError::RetriesExhausted);
                    }
                }
            }
        }
        Ok(())
    }

    /// Read whatever is currently available, up to `buf.len()` bytes. May
    /// return zero when nothing arrives within the call timeout.
    pub async fn read_available(&mut self, buf: &mut [u8]) -> Result<usize, StreamError> {
        let inner = self.inner()?;
        match timeout(IO_TIMEOUT, inner.read_some(buf)).await {
            Ok(Ok(n)) => Ok(n),
            Ok(Err(e)) => Err(StreamError::Io(e)),
            Err(_) => Ok(0),
        }
    }

    /// Send a signed 64-bit big-endian size frame.
    pub async fn send_size(&mut self, size: i64) -> Result<(), StreamError> {
        self.write_exact(&size.to_be_bytes()).await
    }

    /// Read a signed 64-bit big-endian size frame.
    pub async fn read_size(&mut self) -> Result<i64, StreamError> {
        let mut buf = [0u8; 8];
        self.read_exact(&mut buf).await?;
        Ok(i64::from_be_bytes(buf))
    }

    pub async fn read_u8(&mut self) -> Result<u8, StreamError> {
        let mut buf = [0u8; 1];
        self.read_exact(&mut buf).await?;
        Ok(buf[0])
    }

    pub async fn write_u8(&mut self, byte: u8) -> Result<(), StreamError> {
        self.write_exact(&[byte]).await
    }

    /// Tear the stream down. Idempotent; any further I/O fails with
    /// [`StreamError::Closed`].
    pub async fn close(&mut self, mode: CloseMode) {
        let Some(mut inner) = self.inner.take() else { return };
        if mode == CloseMode::WaitPeerEof {
            let mut drain = [0u8; 1];
            let _ = timeout(IO_TIMEOUT, inner.read_some(&mut drain)).await;
        }
        if mode != CloseMode::ImmediateNoShutdown {
            let _ = timeout(IO_TIMEOUT, inner.shutdown()).await;
        }
    }
}
