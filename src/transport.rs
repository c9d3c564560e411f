/*
 * SPDX-License-Identifier: Apache-2.0
 * Copyright 2023-2025 ByteDance and/or its affiliates.
 */

//! The byte-stream abstraction the adaptation engine runs on, and the
//! connection manager that supplies one per call.
//!
//! The engine never dials a socket or negotiates TLS itself: it asks a
//! [`ConnectionManager`] for a [`Transport`] and talks only to that trait.
//! Both are `async_trait` object-safe traits, letting a pooled/TLS-wrapped
//! implementation stand in without this crate depending on `rustls` or
//! `openssl` directly.

use async_trait::async_trait;
use std::time::Duration;
use tokio::io::{AsyncRead, AsyncReadExt, AsyncWrite, AsyncWriteExt};

/// Sentinel returned by [`Transport::pipe_body`] when the source stream's
/// chunk framing was malformed partway through.
pub const PIPE_BODY_FRAMING_ERROR: i64 = -1;

/// An open, bidirectional byte stream to an ICAP service, plus the two
/// timeouts that bound every operation on it.
#[async_trait]
pub trait Transport: Send {
    /// Write raw bytes. Fire-and-forget: errors may not surface until the
    /// next `flush` or read.
    async fn write(&mut self, bytes: &[u8]) -> std::io::Result<()>;

    /// Write a UTF-8 string. Convenience wrapper over [`Self::write`].
    async fn write_string(&mut self, s: &str) -> std::io::Result<()> {
        self.write(s.as_bytes()).await
    }

    /// Flush any buffered writes, surfacing prior write errors.
    async fn flush(&mut self) -> std::io::Result<()>;

    /// Read bytes until `delimiter` is found (inclusive of the delimiter in
    /// the returned buffer), or fail if more than `max_bytes` are read
    /// first without finding it.
    async fn read_until(&mut self, delimiter: &[u8], max_bytes: usize) -> std::io::Result<Vec<u8>>;

    /// Stream `len` bytes of body from the transport into `sink`, copying
    /// them byte-for-byte (the ICAP chunk framing around them has already
    /// been decoded by the caller). Returns the number of bytes written, or
    /// [`PIPE_BODY_FRAMING_ERROR`] if framing was malformed.
    async fn pipe_body(&mut self, sink: &mut (dyn AsyncWrite + Send + Unpin), len: usize) -> std::io::Result<i64> {
        let mut remaining = len;
        let mut total: i64 = 0;
        let mut buf = vec![0u8; 8192.min(len.max(1))];
        while remaining > 0 {
            let to_read = remaining.min(buf.len());
            let n = self.read_exact_into(&mut buf[..to_read]).await?;
            if n == 0 {
                return Ok(PIPE_BODY_FRAMING_ERROR);
            }
            sink.write_all(&buf[..n]).await?;
            total += n as i64;
            remaining -= n;
        }
        Ok(total)
    }

    /// Read exactly `buf.len()` bytes, or as many as remain before EOF.
    async fn read_exact_into(&mut self, buf: &mut [u8]) -> std::io::Result<usize>;

    /// Close the transport. Called on every exit path, success or failure.
    async fn close(&mut self) -> std::io::Result<()>;
}

/// Produces an open [`Transport`] for a given service. The manager owns any
/// pooling and TLS handshaking; the engine never caches the transports it
/// receives.
#[async_trait]
pub trait ConnectionManager: Send + Sync {
    /// Dial (or borrow from a pool) a transport to `host:port`, optionally
    /// TLS-wrapped per `secure`, bounding the dial itself by
    /// `connect_timeout` and every subsequent read by `read_timeout`.
    async fn connect(
        &self,
        host: &str,
        port: u16,
        service_name: &str,
        secure: bool,
        connect_timeout: Duration,
        read_timeout: Duration,
    ) -> std::io::Result<Box<dyn Transport>>;
}

/// A [`Transport`] wrapping a plain in-process duplex stream or TCP socket:
/// any type that is both [`AsyncRead`] and [`AsyncWrite`]. Every read is
/// bounded by `read_timeout`; `connect_timeout` is the manager's concern,
/// not this wrapper's, since by construction the stream is already open.
pub struct StreamTransport<S> {
    stream: S,
    read_timeout: Duration,
}

impl<S> StreamTransport<S>
where
    S: AsyncRead + AsyncWrite + Send + Unpin,
{
    /// Wrap an already-open stream, applying `read_timeout` to every read.
    pub fn new(stream: S, read_timeout: Duration) -> Self {
        StreamTransport { stream, read_timeout }
    }
}

#[async_trait]
impl<S> Transport for StreamTransport<S>
where
    S: AsyncRead + AsyncWrite + Send + Unpin,
{
    async fn write(&mut self, bytes: &[u8]) -> std::io::Result<()> {
        self.stream.write_all(bytes).await
    }

    async fn flush(&mut self) -> std::io::Result<()> {
        self.stream.flush().await
    }

    async fn read_until(&mut self, delimiter: &[u8], max_bytes: usize) -> std::io::Result<Vec<u8>> {
        let mut buf = Vec::new();
        let mut byte = [0u8; 1];
        loop {
            if buf.len() >= max_bytes {
                return Err(std::io::Error::new(
                    std::io::ErrorKind::InvalidData,
                    format!("exceeded max header size of {max_bytes} bytes without finding delimiter"),
                ));
            }
            let n = tokio::time::timeout(self.read_timeout, self.stream.read(&mut byte))
                .await
                .map_err(|_| std::io::Error::new(std::io::ErrorKind::TimedOut, "read timed out"))??;
            if n == 0 {
                return Err(std::io::Error::new(std::io::ErrorKind::UnexpectedEof, "connection closed mid-read"));
            }
            buf.push(byte[0]);
            if buf.len() >= delimiter.len() && buf[buf.len() - delimiter.len()..] == *delimiter {
                return Ok(buf);
            }
        }
    }

    async fn read_exact_into(&mut self, buf: &mut [u8]) -> std::io::Result<usize> {
        let n = tokio::time::timeout(self.read_timeout, self.stream.read(buf))
            .await
            .map_err(|_| std::io::Error::new(std::io::ErrorKind::TimedOut, "read timed out"))??;
        Ok(n)
    }

    async fn close(&mut self) -> std::io::Result<()> {
        self.stream.shutdown().await
    }
}
