//! # capkit-server
//!
//! Dispatch, sessions, and the server runtime for the capkit
//! capability-protocol SDK.
//!
//! The pieces fit together in dependency order:
//!
//! - [`Dispatcher`] validates a request against the registry, runs the
//!   bound handler, and shapes the outcome into a wire response. It is
//!   stateless and safe to call concurrently from any number of sessions.
//! - [`SessionStore`] is the concurrent table of live sessions, each a
//!   `Created -> Active -> Draining -> Closed` state machine with its own
//!   outbound channel and cancellation tokens.
//! - [`ServerRuntime`] ties them to a configuration, drives the stdio
//!   binding directly, and hands the HTTP bindings (in `capkit-axum`) a
//!   shared handle.
//!
//! # Example
//!
//! ```rust
//! use capkit_core::capability::ToolDef;
//! use capkit_core::registry::Registry;
//! use capkit_server::{ServerConfig, ServerRuntime, TransportKind};
//!
//! let mut registry = Registry::new();
//! registry.register_tool(ToolDef::new("ping"), |_| async {
//!     Ok(serde_json::json!("pong"))
//! }).unwrap();
//!
//! let runtime = ServerRuntime::new(registry, ServerConfig::new(TransportKind::Stdio));
//! assert_eq!(runtime.sessions().count(), 0);
//! ```

#![deny(missing_docs)]
#![warn(clippy::all)]
#![warn(clippy::pedantic)]

pub mod config;
pub mod dispatch;
pub mod runtime;
pub mod session;

pub use config::{ServerConfig, TransportKind};
pub use dispatch::Dispatcher;
pub use runtime::ServerRuntime;
pub use session::{CancellationToken, Session, SessionState, SessionStore};
