//! # capkit - a transport-agnostic capability-protocol server SDK
//!
//! capkit exposes a registry of callable capabilities — **tools**,
//! **resources**, and **prompts** — to remote clients over three transport
//! bindings (stdio, SSE, streamable HTTP), with one coherent session and
//! request/response model across all three.
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use capkit::prelude::*;
//!
//! #[tokio::main]
//! async fn main() -> Result<(), CapError> {
//!     let mut registry = Registry::new();
//!     registry.register_tool(
//!         ToolDef::new("add").description("Add two integers").input_schema(
//!             ArgumentSchema::new()
//!                 .require("a", PropertyType::Integer)
//!                 .require("b", PropertyType::Integer),
//!         ),
//!         |args| async move {
//!             let a = args.get("a").and_then(serde_json::Value::as_i64).unwrap_or_default();
//!             let b = args.get("b").and_then(serde_json::Value::as_i64).unwrap_or_default();
//!             Ok(serde_json::Value::from(a + b))
//!         },
//!     )?;
//!
//!     let runtime = ServerRuntime::new(registry, ServerConfig::new(TransportKind::Stdio));
//!     runtime.run_stdio(&StdioTransport::new()).await
//! }
//! ```
//!
//! ## Crate Organization
//!
//! - [`capkit_core`] - wire types, descriptors, schemas, and the registry
//!   (no async runtime)
//! - [`capkit_transport`] - the `Transport` trait and the stdio binding
//! - [`mod@capkit_server`] - dispatcher, sessions, and the server runtime
//! - [`capkit_axum`] - the SSE and streamable-HTTP bindings on axum

#![deny(missing_docs)]
#![warn(clippy::all)]
#![warn(clippy::pedantic)]
#![warn(clippy::unwrap_used)]
#![allow(clippy::module_name_repetitions)]

// Re-export all public items from core
pub use capkit_core::*;

// Re-export server types
pub use capkit_server::{
    CancellationToken, Dispatcher, ServerConfig, ServerRuntime, Session, SessionState,
    SessionStore, TransportKind,
};

// Re-export transport types
pub use capkit_transport::{StdioTransport, Transport, TransportError};

// Re-export the HTTP bindings
pub use capkit_axum::{serve, CapRouter, SESSION_HEADER};

/// Prelude module for convenient imports.
///
/// # Example
///
/// ```rust
/// use capkit::prelude::*;
/// ```
pub mod prelude {
    pub use capkit_axum::CapRouter;
    pub use capkit_core::prelude::*;
    pub use capkit_server::{ServerConfig, ServerRuntime, TransportKind};
    pub use capkit_transport::{StdioTransport, Transport};
}
