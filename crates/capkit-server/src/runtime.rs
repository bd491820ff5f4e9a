//! The server runtime.
//!
//! Owns the dispatcher and the session table, runs exactly one transport
//! binding per process, and coordinates shutdown: on a shutdown signal
//! every session transitions to draining, in-flight work gets a bounded
//! grace period, then everything is forcibly closed.

use crate::config::ServerConfig;
use crate::dispatch::Dispatcher;
use crate::session::SessionStore;
use capkit_core::error::CapError;
use capkit_core::protocol::{ClientMessage, ErrorKind, RequestId, Response, ResponseError};
use capkit_core::registry::Registry;
use capkit_transport::Transport;
use std::sync::Arc;
use std::time::{Duration, Instant};

/// The transport-independent server core.
///
/// Constructed explicitly and handed to whichever binding is started; there
/// is no process-wide singleton.
///
/// # Example
///
/// ```rust,no_run
/// use capkit_core::registry::Registry;
/// use capkit_server::config::{ServerConfig, TransportKind};
/// use capkit_server::runtime::ServerRuntime;
/// use capkit_transport::StdioTransport;
///
/// # async fn run() -> Result<(), capkit_core::CapError> {
/// let registry = Registry::new();
/// let runtime = ServerRuntime::new(registry, ServerConfig::new(TransportKind::Stdio));
/// runtime.run_stdio(&StdioTransport::new()).await
/// # }
/// ```
pub struct ServerRuntime {
    dispatcher: Dispatcher,
    sessions: Arc<SessionStore>,
    config: ServerConfig,
}

impl ServerRuntime {
    /// Create a runtime over a fully built registry.
    ///
    /// The registry is frozen here; all later reads are lock-free.
    #[must_use]
    pub fn new(registry: Registry, config: ServerConfig) -> Self {
        let sessions = Arc::new(SessionStore::new(config.idle_timeout, config.drain_grace));
        Self {
            dispatcher: Dispatcher::new(Arc::new(registry)),
            sessions,
            config,
        }
    }

    /// The dispatcher.
    #[must_use]
    pub fn dispatcher(&self) -> &Dispatcher {
        &self.dispatcher
    }

    /// The session table.
    #[must_use]
    pub fn sessions(&self) -> &Arc<SessionStore> {
        &self.sessions
    }

    /// The runtime configuration.
    #[must_use]
    pub fn config(&self) -> &ServerConfig {
        &self.config
    }

    /// Start the background sweep that expires idle sessions and reaps
    /// drained ones. Called by the long-running bindings; must run inside
    /// a tokio runtime.
    pub fn start_maintenance(&self) {
        let interval = (self.config.idle_timeout.min(self.config.drain_grace) / 4)
            .max(Duration::from_millis(50));
        self.sessions.spawn_sweeper(interval);
    }

    /// Handle one decoded client message for a session.
    ///
    /// Requests produce exactly one response; cancellation and termination
    /// frames produce none. A request against a draining or unknown session
    /// is refused with a `transport_error` response.
    pub async fn handle_message(
        &self,
        session_id: &str,
        message: ClientMessage,
    ) -> Option<Response> {
        match message {
            ClientMessage::Request(request) => {
                let id = request.id.clone();
                let token = match self.sessions.begin_request(session_id, &id) {
                    Ok(token) => token,
                    Err(err) => {
                        tracing::debug!(session_id = %session_id, error = %err, "request refused");
                        return Some(Response::failure(id, err.to_response_error()));
                    }
                };
                let response = self.dispatcher.dispatch(request, &token).await;
                self.sessions.finish_request(session_id, &id);
                Some(response)
            }
            ClientMessage::Cancel(frame) => {
                if !self.sessions.cancel(session_id, &frame.cancel) {
                    tracing::debug!(
                        session_id = %session_id,
                        id = %frame.cancel,
                        "cancel for a request not in flight"
                    );
                }
                None
            }
            ClientMessage::Terminate(_) => {
                tracing::info!(session_id = %session_id, "session terminated by client");
                self.sessions.terminate(session_id);
                None
            }
        }
    }

    /// Drive the stdio binding until the peer disconnects or terminates.
    ///
    /// One implicit session for the transport's lifetime, strictly
    /// sequential request-then-response. Malformed frames are answered
    /// with a `transport_error` response (request id `0`, since a parse
    /// failure leaves no recoverable id) and the session survives.
    pub async fn run_stdio<T: Transport>(&self, transport: &T) -> Result<(), CapError> {
        let session_id = self.sessions.create();
        self.sessions.activate(&session_id);
        tracing::info!(session_id = %session_id, "stdio session started");

        loop {
            match transport.recv().await {
                Ok(Some(message)) => {
                    let terminated = matches!(message, ClientMessage::Terminate(_));
                    if let Some(response) = self.handle_message(&session_id, message).await {
                        transport.send(&response).await?;
                    }
                    if terminated {
                        break;
                    }
                }
                Ok(None) => {
                    tracing::info!(session_id = %session_id, "stdin closed");
                    break;
                }
                Err(err) if err.is_recoverable() => {
                    tracing::warn!(session_id = %session_id, error = %err, "malformed frame");
                    let response = Response::failure(
                        RequestId::Number(0),
                        ResponseError::new(ErrorKind::TransportError, err.to_string()),
                    );
                    transport.send(&response).await?;
                }
                Err(err) => {
                    tracing::error!(session_id = %session_id, error = %err, "transport failed");
                    self.sessions.terminate(&session_id);
                    let _ = transport.close().await;
                    return Err(err.into());
                }
            }
        }

        self.sessions.terminate(&session_id);
        transport.close().await?;
        Ok(())
    }

    /// Drain every session and wait out the grace period.
    ///
    /// Returns once all in-flight work has finished or the deadline
    /// elapsed; either way no session survives the call.
    pub async fn shutdown(&self) {
        tracing::info!(sessions = self.sessions.count(), "shutting down, draining sessions");
        self.sessions.drain_all();
        let deadline = Instant::now() + self.config.drain_grace;
        while self.sessions.total_in_flight() > 0 && Instant::now() < deadline {
            tokio::time::sleep(Duration::from_millis(20)).await;
        }
        self.sessions.close_all();
        tracing::info!("shutdown complete");
    }
}

impl std::fmt::Debug for ServerRuntime {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ServerRuntime")
            .field("config", &self.config)
            .field("sessions", &self.sessions.count())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::TransportKind;
    use capkit_core::capability::CapabilityKind;
    use capkit_core::capability::ToolDef;
    use capkit_core::protocol::Request;
    use capkit_core::schema::{ArgumentSchema, PropertyType};
    use capkit_transport::StdioTransport;
    use serde_json::Value;
    use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader};

    fn runtime() -> ServerRuntime {
        let mut registry = Registry::new();
        registry
            .register_tool(
                ToolDef::new("add").input_schema(
                    ArgumentSchema::new()
                        .require("a", PropertyType::Integer)
                        .require("b", PropertyType::Integer),
                ),
                |args| async move {
                    let a = args.get("a").and_then(Value::as_i64).unwrap_or_default();
                    let b = args.get("b").and_then(Value::as_i64).unwrap_or_default();
                    Ok(Value::from(a + b))
                },
            )
            .unwrap();
        ServerRuntime::new(
            registry,
            ServerConfig::new(TransportKind::Stdio).with_drain_grace(Duration::from_millis(50)),
        )
    }

    #[tokio::test]
    async fn request_against_unknown_session_is_refused() {
        let runtime = runtime();
        let request = Request::new(1u64, CapabilityKind::Tool, "add")
            .argument("a", 1)
            .argument("b", 2);
        let response = runtime
            .handle_message("ghost", ClientMessage::Request(request))
            .await
            .unwrap();
        assert_eq!(response.error.unwrap().kind, ErrorKind::TransportError);
    }

    #[tokio::test]
    async fn terminate_frame_closes_the_session() {
        let runtime = runtime();
        let id = runtime.sessions().create();
        runtime.sessions().activate(&id);

        let none = runtime
            .handle_message(
                &id,
                serde_json::from_str::<ClientMessage>(r#"{"terminate":true}"#).unwrap(),
            )
            .await;
        assert!(none.is_none());
        assert!(!runtime.sessions().contains(&id));
    }

    #[tokio::test]
    async fn stdio_loop_answers_and_drains_on_eof() {
        let runtime = runtime();
        let (client, server) = tokio::io::duplex(4096);
        let (server_read, server_write) = tokio::io::split(server);
        let (client_read, mut client_write) = tokio::io::split(client);
        let transport = StdioTransport::with_streams(server_read, server_write);

        let driver = async {
            runtime.run_stdio(&transport).await.unwrap();
        };
        let exchange = async {
            client_write
                .write_all(b"{\"id\":\"1\",\"kind\":\"tool\",\"name\":\"add\",\"arguments\":{\"a\":2,\"b\":3}}\n")
                .await
                .unwrap();
            let mut lines = BufReader::new(client_read).lines();
            let line = lines.next_line().await.unwrap().unwrap();
            assert_eq!(line, r#"{"id":"1","result":5}"#);
            drop(client_write);
        };
        tokio::join!(driver, exchange);

        assert_eq!(runtime.sessions().count(), 0);
    }

    #[tokio::test]
    async fn shutdown_clears_the_table() {
        let runtime = runtime();
        let a = runtime.sessions().create();
        runtime.sessions().activate(&a);
        runtime.sessions().create();

        runtime.shutdown().await;
        assert_eq!(runtime.sessions().count(), 0);
    }
}
