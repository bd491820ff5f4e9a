//! Router builder for the HTTP bindings.

use crate::serve;
use crate::sse;
use crate::streamable;
use axum::routing::{get, post};
use axum::Router;
use capkit_core::error::CapError;
use capkit_server::{ServerRuntime, TransportKind};
use std::sync::Arc;
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;

/// Builds the axum router for whichever HTTP binding the runtime is
/// configured for.
///
/// The SSE binding gets a GET event-stream path and a POST message path;
/// the streamable binding gets a single path carrying POST (and, in
/// stateful mode, GET for the push stream and DELETE for termination).
///
/// # Example
///
/// ```rust,no_run
/// use capkit_axum::CapRouter;
/// use capkit_core::registry::Registry;
/// use capkit_server::{ServerConfig, ServerRuntime, TransportKind};
/// use std::sync::Arc;
///
/// let runtime = Arc::new(ServerRuntime::new(
///     Registry::new(),
///     ServerConfig::new(TransportKind::StreamableHttp),
/// ));
/// let router = CapRouter::new(runtime).with_cors().into_router();
/// ```
pub struct CapRouter {
    runtime: Arc<ServerRuntime>,
    enable_cors: bool,
    enable_tracing: bool,
    events_path: String,
    messages_path: String,
    rpc_path: String,
}

impl CapRouter {
    /// Create a router builder for the runtime's configured binding.
    #[must_use]
    pub fn new(runtime: Arc<ServerRuntime>) -> Self {
        Self {
            runtime,
            enable_cors: false,
            enable_tracing: false,
            events_path: "/events".to_string(),
            messages_path: "/messages".to_string(),
            rpc_path: "/rpc".to_string(),
        }
    }

    /// Enable CORS with permissive defaults.
    #[must_use]
    pub fn with_cors(mut self) -> Self {
        self.enable_cors = true;
        self
    }

    /// Enable request tracing.
    #[must_use]
    pub fn with_tracing(mut self) -> Self {
        self.enable_tracing = true;
        self
    }

    /// Set the SSE event-stream path.
    #[must_use]
    pub fn events_path(mut self, path: impl Into<String>) -> Self {
        self.events_path = path.into();
        self
    }

    /// Set the SSE inbound message path.
    #[must_use]
    pub fn messages_path(mut self, path: impl Into<String>) -> Self {
        self.messages_path = path.into();
        self
    }

    /// Set the streamable HTTP path.
    #[must_use]
    pub fn rpc_path(mut self, path: impl Into<String>) -> Self {
        self.rpc_path = path.into();
        self
    }

    /// Build the router.
    #[must_use]
    pub fn into_router(self) -> Router {
        let config = self.runtime.config();
        let routes = match config.transport {
            TransportKind::Sse => Router::new()
                .route(&self.events_path, get(sse::handle_events))
                .route(&self.messages_path, post(sse::handle_message)),
            TransportKind::StreamableHttp if config.stateless_mode => {
                Router::new().route(&self.rpc_path, post(streamable::handle_post))
            }
            TransportKind::StreamableHttp => Router::new().route(
                &self.rpc_path,
                post(streamable::handle_post)
                    .get(streamable::handle_stream)
                    .delete(streamable::handle_delete),
            ),
            TransportKind::Stdio => {
                tracing::warn!("stdio transport has no HTTP binding, router is empty");
                Router::new()
            }
        };

        let mut router = routes.with_state(self.runtime);

        if self.enable_cors {
            router = router.layer(
                CorsLayer::new()
                    .allow_origin(Any)
                    .allow_methods(Any)
                    .allow_headers(Any),
            );
        }

        if self.enable_tracing {
            router = router.layer(TraceLayer::new_for_http());
        }

        router
    }

    /// Build the router and serve it on the runtime's configured address,
    /// with graceful shutdown on interrupt.
    pub async fn serve(self) -> Result<(), CapError> {
        let runtime = Arc::clone(&self.runtime);
        serve::serve(runtime, self.into_router()).await
    }
}
