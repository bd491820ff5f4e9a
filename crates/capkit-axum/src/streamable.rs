//! The streamable HTTP binding: one path, self-contained POST cycles.
//!
//! Two modes, fixed at startup:
//!
//! - **Stateless**: each POST builds an ephemeral session context that is
//!   dropped before the response body leaves the server. No session token
//!   is issued and nothing persists between calls.
//! - **Stateful**: the first POST without a session header creates the
//!   session and every reply echoes its token; a GET on the same path
//!   retains an SSE push stream for server-initiated messages; DELETE
//!   terminates the session. Unlike the SSE binding, closing the push
//!   stream does not tear the session down — its lifetime is bounded by
//!   DELETE, a terminate frame, or the idle timeout.

use crate::{header_session, reject, SESSION_HEADER};
use axum::extract::State;
use axum::http::{HeaderMap, StatusCode};
use axum::response::sse::{Event, KeepAlive, Sse};
use axum::response::IntoResponse;
use axum::Json;
use capkit_core::protocol::ClientMessage;
use capkit_server::ServerRuntime;
use futures::stream::Stream;
use std::convert::Infallible;
use std::sync::Arc;
use tokio::sync::broadcast;
use tracing::{info, warn};

/// POST: one request/response cycle.
pub(crate) async fn handle_post(
    State(runtime): State<Arc<ServerRuntime>>,
    headers: HeaderMap,
    body: String,
) -> axum::response::Response {
    let message: ClientMessage = match serde_json::from_str(&body) {
        Ok(message) => message,
        Err(err) => {
            warn!(error = %err, "malformed frame");
            return reject(StatusCode::BAD_REQUEST, format!("malformed frame: {err}"));
        }
    };

    if runtime.config().stateless_mode {
        return handle_stateless(&runtime, message).await;
    }

    let session_id = match header_session(&headers) {
        Some(id) => {
            if !runtime.sessions().contains(&id) {
                return reject(StatusCode::NOT_FOUND, format!("unknown session '{id}'"));
            }
            id
        }
        None => {
            let (id, _rx) = runtime.sessions().create_with_channel();
            runtime.sessions().activate(&id);
            info!(session_id = %id, "session created");
            id
        }
    };

    match runtime.handle_message(&session_id, message).await {
        Some(response) => (
            StatusCode::OK,
            [(SESSION_HEADER, session_id.as_str())],
            Json(response),
        )
            .into_response(),
        None => (StatusCode::ACCEPTED, [(SESSION_HEADER, session_id.as_str())]).into_response(),
    }
}

/// Stateless cycle: an ephemeral session that never outlives the call.
async fn handle_stateless(
    runtime: &Arc<ServerRuntime>,
    message: ClientMessage,
) -> axum::response::Response {
    let ClientMessage::Request(request) = message else {
        // No session persists, so there is nothing to cancel or terminate.
        return StatusCode::ACCEPTED.into_response();
    };

    let session_id = runtime.sessions().create();
    runtime.sessions().activate(&session_id);
    let response = runtime
        .handle_message(&session_id, ClientMessage::Request(request))
        .await;
    runtime.sessions().terminate(&session_id);

    match response {
        Some(response) => Json(response).into_response(),
        None => StatusCode::ACCEPTED.into_response(),
    }
}

/// GET: retain an SSE push stream for an existing session (stateful only).
pub(crate) async fn handle_stream(
    State(runtime): State<Arc<ServerRuntime>>,
    headers: HeaderMap,
) -> axum::response::Response {
    let Some(session_id) = header_session(&headers) else {
        return reject(StatusCode::BAD_REQUEST, "missing session token");
    };
    let Some(rx) = runtime.sessions().subscribe(&session_id) else {
        return reject(
            StatusCode::NOT_FOUND,
            format!("unknown session '{session_id}'"),
        );
    };
    runtime.sessions().touch(&session_id);
    info!(session_id = %session_id, "push stream retained");

    Sse::new(push_stream(session_id, rx))
        .keep_alive(KeepAlive::default())
        .into_response()
}

/// DELETE: terminate the session explicitly (stateful only).
pub(crate) async fn handle_delete(
    State(runtime): State<Arc<ServerRuntime>>,
    headers: HeaderMap,
) -> axum::response::Response {
    let Some(session_id) = header_session(&headers) else {
        return reject(StatusCode::BAD_REQUEST, "missing session token");
    };
    if !runtime.sessions().contains(&session_id) {
        return reject(
            StatusCode::NOT_FOUND,
            format!("unknown session '{session_id}'"),
        );
    }
    runtime.sessions().terminate(&session_id);
    info!(session_id = %session_id, "session terminated by client");
    StatusCode::NO_CONTENT.into_response()
}

fn push_stream(
    session_id: String,
    mut rx: broadcast::Receiver<String>,
) -> impl Stream<Item = Result<Event, Infallible>> {
    async_stream::stream! {
        yield Ok(Event::default().event("session").data(&session_id));

        loop {
            match rx.recv().await {
                Ok(json) => {
                    yield Ok(Event::default().event("message").data(json));
                }
                Err(broadcast::error::RecvError::Lagged(skipped)) => {
                    warn!(session_id = %session_id, skipped, "slow client, messages dropped");
                }
                Err(broadcast::error::RecvError::Closed) => break,
            }
        }
    }
}
