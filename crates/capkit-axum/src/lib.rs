//! # capkit-axum
//!
//! The two HTTP transport bindings for the capkit capability-protocol SDK,
//! built on axum:
//!
//! - **SSE**: an inbound POST endpoint for client requests and a long-lived
//!   outbound `text/event-stream` per session for responses. Supports any
//!   number of concurrent clients, one session and one stream each.
//! - **Streamable HTTP**: a single path where each POST is a self-contained
//!   request/response cycle. In stateful mode a session token threads
//!   across calls via the [`SESSION_HEADER`] header and a GET on the same
//!   path retains a push stream; in stateless mode no session survives the
//!   request.
//!
//! Both bindings carry the exact same payload shapes as the stdio binding;
//! only framing and channels differ. They decode bytes into client
//! messages, hand them to the runtime's dispatcher, and deliver responses
//! on the right channel — never interpreting payloads beyond that.
//!
//! # Example
//!
//! ```rust,no_run
//! use capkit_axum::CapRouter;
//! use capkit_core::registry::Registry;
//! use capkit_server::{ServerConfig, ServerRuntime, TransportKind};
//! use std::sync::Arc;
//!
//! # async fn run() -> Result<(), capkit_core::CapError> {
//! let registry = Registry::new();
//! let config = ServerConfig::new(TransportKind::Sse).with_port(8866);
//! let runtime = Arc::new(ServerRuntime::new(registry, config));
//! CapRouter::new(runtime).with_tracing().serve().await
//! # }
//! ```

#![deny(missing_docs)]
#![warn(clippy::all)]
#![warn(clippy::pedantic)]

pub mod router;
pub mod serve;
mod sse;
mod streamable;

pub use router::CapRouter;
pub use serve::serve;

use axum::http::{HeaderMap, StatusCode};
use axum::response::IntoResponse;
use capkit_core::protocol::{ErrorKind, ResponseError};

/// The header carrying the session token on the HTTP bindings.
///
/// Lowercase for HTTP/2 compatibility.
pub const SESSION_HEADER: &str = "cap-session-id";

/// Extract the session token from the request headers, if present.
pub(crate) fn header_session(headers: &HeaderMap) -> Option<String> {
    headers
        .get(SESSION_HEADER)
        .and_then(|value| value.to_str().ok())
        .map(String::from)
}

/// A structured rejection: HTTP status plus the wire error shape, so a
/// malformed request never gets a silent drop or a bare status line.
pub(crate) fn reject(status: StatusCode, detail: impl Into<String>) -> axum::response::Response {
    (
        status,
        axum::Json(ResponseError::new(ErrorKind::TransportError, detail)),
    )
        .into_response()
}
