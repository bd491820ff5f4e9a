//! Standard I/O transport binding.
//!
//! The most common binding for servers launched as subprocesses: the server
//! reads requests from stdin and writes responses to stdout.
//!
//! # Wire Format
//!
//! Messages are newline-delimited JSON: one frame per line, one line per
//! frame. Because there is a single bidirectional byte stream, the process
//! carries exactly one implicit session for its lifetime and responses are
//! observed strictly in request order.
//!
//! Logging and debug output must go to stderr to keep the protocol stream
//! clean.

use crate::error::TransportError;
use crate::Transport;
use capkit_core::protocol::{ClientMessage, Response};
use std::sync::atomic::{AtomicBool, Ordering};
use tokio::io::{AsyncBufReadExt, AsyncRead, AsyncWrite, AsyncWriteExt, BufReader, Stdin, Stdout};
use tokio::sync::Mutex;

/// Maximum allowed frame size (16 MiB).
pub const MAX_FRAME_SIZE: usize = 16 * 1024 * 1024;

/// A transport that frames messages over a pair of byte streams.
///
/// Use [`StdioTransport::new`] for process stdin/stdout, or
/// [`StdioTransport::with_streams`] to drive the binding over arbitrary
/// streams (duplex pipes in tests, sockets, ...).
pub struct StdioTransport<R, W> {
    reader: Mutex<BufReader<R>>,
    writer: Mutex<W>,
    connected: AtomicBool,
}

impl StdioTransport<Stdin, Stdout> {
    /// Create a transport over the process's stdin/stdout.
    #[must_use]
    pub fn new() -> Self {
        Self::with_streams(tokio::io::stdin(), tokio::io::stdout())
    }
}

impl Default for StdioTransport<Stdin, Stdout> {
    fn default() -> Self {
        Self::new()
    }
}

impl<R, W> StdioTransport<R, W>
where
    R: AsyncRead + Unpin + Send,
    W: AsyncWrite + Unpin + Send,
{
    /// Create a transport over custom streams.
    #[must_use]
    pub fn with_streams(reader: R, writer: W) -> Self {
        Self {
            reader: Mutex::new(BufReader::new(reader)),
            writer: Mutex::new(writer),
            connected: AtomicBool::new(true),
        }
    }
}

impl<R, W> Transport for StdioTransport<R, W>
where
    R: AsyncRead + Unpin + Send + Sync,
    W: AsyncWrite + Unpin + Send + Sync,
{
    async fn send(&self, response: &Response) -> Result<(), TransportError> {
        if !self.is_connected() {
            return Err(TransportError::NotConnected);
        }

        let json = serde_json::to_string(response)?;
        if json.len() > MAX_FRAME_SIZE {
            return Err(TransportError::FrameTooLarge {
                size: json.len(),
                max: MAX_FRAME_SIZE,
            });
        }

        let mut writer = self.writer.lock().await;
        writer.write_all(json.as_bytes()).await?;
        writer.write_all(b"\n").await?;
        writer.flush().await?;

        Ok(())
    }

    async fn recv(&self) -> Result<Option<ClientMessage>, TransportError> {
        if !self.is_connected() {
            return Err(TransportError::NotConnected);
        }

        let mut reader = self.reader.lock().await;

        loop {
            let mut line = String::new();
            let bytes_read = reader.read_line(&mut line).await?;

            if bytes_read == 0 {
                // EOF - the peer closed its end
                self.connected.store(false, Ordering::SeqCst);
                return Ok(None);
            }

            if line.len() > MAX_FRAME_SIZE {
                return Err(TransportError::FrameTooLarge {
                    size: line.len(),
                    max: MAX_FRAME_SIZE,
                });
            }

            let trimmed = line.trim();
            if trimmed.is_empty() {
                continue;
            }

            let msg: ClientMessage = serde_json::from_str(trimmed)?;
            return Ok(Some(msg));
        }
    }

    async fn close(&self) -> Result<(), TransportError> {
        self.connected.store(false, Ordering::SeqCst);
        let mut writer = self.writer.lock().await;
        writer.flush().await?;
        Ok(())
    }

    fn is_connected(&self) -> bool {
        self.connected.load(Ordering::SeqCst)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use capkit_core::capability::CapabilityKind;
    use capkit_core::protocol::{Request, RequestId};

    #[tokio::test]
    async fn frames_round_trip_over_duplex() {
        let (client, server) = tokio::io::duplex(1024);
        let (server_read, server_write) = tokio::io::split(server);
        let (mut client_read, mut client_write) = tokio::io::split(client);

        let transport = StdioTransport::with_streams(server_read, server_write);

        client_write
            .write_all(b"{\"id\":\"1\",\"kind\":\"tool\",\"name\":\"add\",\"arguments\":{\"a\":2,\"b\":3}}\n")
            .await
            .unwrap();

        let msg = transport.recv().await.unwrap().unwrap();
        let ClientMessage::Request(req) = msg else {
            panic!("expected a request");
        };
        assert_eq!(req.kind, CapabilityKind::Tool);
        assert_eq!(req.name, "add");

        transport
            .send(&Response::success(req.id, serde_json::json!(5)))
            .await
            .unwrap();

        let mut buf = vec![0u8; 64];
        let n = tokio::io::AsyncReadExt::read(&mut client_read, &mut buf)
            .await
            .unwrap();
        assert_eq!(
            String::from_utf8_lossy(&buf[..n]),
            "{\"id\":\"1\",\"result\":5}\n"
        );
    }

    #[tokio::test]
    async fn empty_lines_are_skipped() {
        let (client, server) = tokio::io::duplex(1024);
        let (server_read, server_write) = tokio::io::split(server);
        let (_client_read, mut client_write) = tokio::io::split(client);

        let transport = StdioTransport::with_streams(server_read, server_write);

        client_write
            .write_all(b"\n\n{\"terminate\":true}\n")
            .await
            .unwrap();

        let msg = transport.recv().await.unwrap().unwrap();
        assert!(matches!(msg, ClientMessage::Terminate(_)));
    }

    #[tokio::test]
    async fn eof_disconnects() {
        let (client, server) = tokio::io::duplex(64);
        let (server_read, server_write) = tokio::io::split(server);

        let transport = StdioTransport::with_streams(server_read, server_write);
        drop(client);

        assert!(transport.recv().await.unwrap().is_none());
        assert!(!transport.is_connected());
        assert!(matches!(
            transport.recv().await,
            Err(TransportError::NotConnected)
        ));
    }

    #[tokio::test]
    async fn malformed_frame_is_a_recoverable_error() {
        let (client, server) = tokio::io::duplex(1024);
        let (server_read, server_write) = tokio::io::split(server);
        let (_client_read, mut client_write) = tokio::io::split(client);

        let transport = StdioTransport::with_streams(server_read, server_write);

        client_write.write_all(b"not json at all\n").await.unwrap();
        client_write
            .write_all(b"{\"cancel\":\"1\"}\n")
            .await
            .unwrap();

        let err = transport.recv().await.unwrap_err();
        assert!(err.is_recoverable());

        // The connection survives; the next frame is readable.
        let msg = transport.recv().await.unwrap().unwrap();
        let ClientMessage::Cancel(frame) = msg else {
            panic!("expected a cancel frame");
        };
        assert_eq!(frame.cancel, RequestId::String("1".to_string()));
    }

    #[tokio::test]
    async fn oversized_outbound_frame_is_rejected() {
        let (_client, server) = tokio::io::duplex(64);
        let (server_read, server_write) = tokio::io::split(server);
        let transport = StdioTransport::with_streams(server_read, server_write);

        let huge = "x".repeat(MAX_FRAME_SIZE);
        let result = transport
            .send(&Response::success(1u64, serde_json::Value::String(huge)))
            .await;
        assert!(matches!(result, Err(TransportError::FrameTooLarge { .. })));
    }

    #[test]
    fn request_builder_for_tests() {
        let req = Request::new(1u64, CapabilityKind::Tool, "add")
            .argument("a", 2)
            .argument("b", 3);
        assert_eq!(req.arguments.len(), 2);
    }
}
