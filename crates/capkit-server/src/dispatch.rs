//! Request dispatch.
//!
//! The dispatcher is the single choke point between transports and
//! handlers: it looks the capability up, validates arguments against the
//! declared schema, invokes the handler, and shapes the outcome into the
//! wire [`Response`]. It holds no mutable state and is safe to call
//! concurrently from any number of sessions.
//!
//! Per-request errors never unwind past dispatch: unknown names, schema
//! violations, handler errors, and handler panics all become structured
//! error responses.

use crate::session::CancellationToken;
use capkit_core::capability::{CapabilityKind, ResourceContent};
use capkit_core::error::CapError;
use capkit_core::protocol::{ErrorKind, Request, Response, ResponseError};
use capkit_core::registry::{HandlerFuture, Registry};
use futures::FutureExt;
use serde_json::Value;
use std::panic::AssertUnwindSafe;
use std::sync::Arc;
use std::time::Duration;

/// The reserved discovery name.
///
/// A request for `(kind, "list")` with no capability registered under that
/// name returns the registration-ordered descriptor summaries of the kind.
const LIST_NAME: &str = "list";

/// How often an in-flight dispatch checks its cancellation token.
const CANCEL_POLL: Duration = Duration::from_millis(25);

/// Validates requests against the registry and runs their handlers.
#[derive(Clone)]
pub struct Dispatcher {
    registry: Arc<Registry>,
}

impl Dispatcher {
    /// Create a dispatcher over a registry.
    #[must_use]
    pub fn new(registry: Arc<Registry>) -> Self {
        Self { registry }
    }

    /// The registry this dispatcher serves.
    #[must_use]
    pub fn registry(&self) -> &Arc<Registry> {
        &self.registry
    }

    /// Dispatch one request to its handler and shape the outcome.
    ///
    /// The request is consumed; exactly one response comes back. The
    /// cancellation token is polled while the handler runs: once flipped,
    /// the handler future is dropped and the client receives a
    /// `handler_failure` response. A handler that finishes between polls
    /// wins the race and its result is returned normally.
    pub async fn dispatch(&self, request: Request, cancel: &CancellationToken) -> Response {
        let id = request.id.clone();

        if request.name == LIST_NAME && !self.registry.contains(request.kind, LIST_NAME) {
            let listing: Vec<Value> = self.registry.summaries(request.kind).collect();
            tracing::debug!(kind = %request.kind, count = listing.len(), "discovery listing");
            return Response::success(id, Value::Array(listing));
        }

        let work = match self.prepare(&request) {
            Ok(future) => future,
            Err(err) => {
                tracing::debug!(kind = %request.kind, name = %request.name, error = %err, "dispatch rejected");
                return Response::failure(id, err.to_response_error());
            }
        };

        let mut work = AssertUnwindSafe(work).catch_unwind();
        let mut poll = tokio::time::interval(CANCEL_POLL);
        let outcome = loop {
            tokio::select! {
                outcome = &mut work => break Some(outcome),
                _ = poll.tick() => {
                    if cancel.is_cancelled() {
                        break None;
                    }
                }
            }
        };

        match outcome {
            None => {
                tracing::debug!(id = %id, "request cancelled");
                Response::failure(
                    id,
                    ResponseError::new(ErrorKind::HandlerFailure, "request cancelled"),
                )
            }
            Some(Ok(Ok(value))) => Response::success(id, value),
            Some(Ok(Err(err))) => Response::failure(id, err.to_response_error()),
            Some(Err(_panic)) => {
                tracing::error!(kind = %request.kind, name = %request.name, "handler panicked");
                Response::failure(
                    id,
                    ResponseError::new(ErrorKind::HandlerFailure, "handler panicked"),
                )
            }
        }
    }

    /// Resolve the descriptor, validate arguments, and build the handler
    /// future with the kind-appropriate result shaping.
    fn prepare(&self, request: &Request) -> Result<HandlerFuture<Value>, CapError> {
        let arguments = request.arguments.clone();
        match request.kind {
            CapabilityKind::Tool => {
                let entry = self.registry.tool(&request.name).ok_or_else(|| {
                    CapError::MethodNotFound {
                        kind: request.kind,
                        name: request.name.clone(),
                    }
                })?;
                Self::check_arguments(&entry.def.input_schema, &arguments)?;
                Ok((entry.handler)(arguments))
            }
            CapabilityKind::Resource => {
                let entry = self.registry.resource(&request.name).ok_or_else(|| {
                    CapError::MethodNotFound {
                        kind: request.kind,
                        name: request.name.clone(),
                    }
                })?;
                Self::check_arguments(&entry.def.input_schema, &arguments)?;
                let mime_type = entry.def.mime_type.clone();
                let future = (entry.handler)(arguments);
                Ok(Box::pin(async move {
                    let text = future.await?;
                    Ok(serde_json::to_value(ResourceContent { mime_type, text })?)
                }))
            }
            CapabilityKind::Prompt => {
                let entry = self.registry.prompt(&request.name).ok_or_else(|| {
                    CapError::MethodNotFound {
                        kind: request.kind,
                        name: request.name.clone(),
                    }
                })?;
                Self::check_arguments(&entry.def.input_schema, &arguments)?;
                let future = (entry.handler)(arguments);
                Ok(Box::pin(async move {
                    let messages = future.await?;
                    Ok(serde_json::to_value(messages)?)
                }))
            }
        }
    }

    fn check_arguments(
        schema: &capkit_core::schema::ArgumentSchema,
        arguments: &serde_json::Map<String, Value>,
    ) -> Result<(), CapError> {
        schema
            .check(arguments)
            .map_err(|violation| CapError::InvalidArguments {
                detail: violation.to_string(),
            })
    }
}

impl std::fmt::Debug for Dispatcher {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Dispatcher")
            .field("registry", &self.registry)
            .finish()
    }
}
