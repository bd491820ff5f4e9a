//! # capkit-transport
//!
//! Byte-level framing for the capkit capability-protocol SDK.
//!
//! A transport turns raw bytes into [`ClientMessage`]s and [`Response`]s
//! back into bytes; everything above the framing (sessions, dispatch) is
//! transport-independent. This crate provides the [`Transport`] trait and
//! the stdio binding; the HTTP bindings (SSE and streamable HTTP) live in
//! `capkit-axum` because they are router integrations rather than plain
//! byte streams.

#![deny(missing_docs)]
#![warn(clippy::all)]
#![warn(clippy::pedantic)]

pub mod error;
pub mod stdio;

pub use error::TransportError;
pub use stdio::{StdioTransport, MAX_FRAME_SIZE};

use capkit_core::protocol::{ClientMessage, Response};

/// A bidirectional message transport.
///
/// Implementations own the framing; they never interpret the payload and
/// never bypass the dispatcher.
pub trait Transport: Send + Sync {
    /// Send a response to the peer.
    fn send(
        &self,
        response: &Response,
    ) -> impl std::future::Future<Output = Result<(), TransportError>> + Send;

    /// Receive the next inbound message.
    ///
    /// Returns `Ok(None)` when the peer has closed the connection.
    fn recv(
        &self,
    ) -> impl std::future::Future<Output = Result<Option<ClientMessage>, TransportError>> + Send;

    /// Close the transport, flushing pending output.
    fn close(&self) -> impl std::future::Future<Output = Result<(), TransportError>> + Send;

    /// Check if the transport is still connected.
    fn is_connected(&self) -> bool;
}
