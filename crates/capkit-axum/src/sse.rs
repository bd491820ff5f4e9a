//! The SSE binding: POST inbound, `text/event-stream` outbound.
//!
//! Opening the event stream creates the session; its first event (named
//! `session`) carries the token the client must attach to every POST, as a
//! `session` query parameter or the session header. Responses travel back
//! as `message` events on the stream that belongs to the POSTing session.
//! When the stream closes — client disconnect or server shutdown — the
//! session drains and is torn down, and anything still in flight is
//! discarded rather than delivered.

use crate::{header_session, reject, SESSION_HEADER};
use axum::extract::{Query, State};
use axum::http::{HeaderMap, StatusCode};
use axum::response::sse::{Event, KeepAlive, Sse};
use axum::response::IntoResponse;
use capkit_core::protocol::ClientMessage;
use capkit_server::ServerRuntime;
use futures::stream::Stream;
use serde::Deserialize;
use std::convert::Infallible;
use std::sync::Arc;
use tokio::sync::broadcast;
use tracing::{debug, info, warn};

/// Query parameters accepted by the message endpoint.
#[derive(Debug, Deserialize)]
pub(crate) struct MessageParams {
    /// The session token issued by the event stream.
    session: Option<String>,
}

/// GET: open the outbound event stream, creating the session.
pub(crate) async fn handle_events(
    State(runtime): State<Arc<ServerRuntime>>,
) -> impl IntoResponse {
    let (session_id, rx) = runtime.sessions().create_with_channel();
    runtime.sessions().activate(&session_id);
    info!(session_id = %session_id, "event stream opened");
    Sse::new(event_stream(runtime, session_id, rx)).keep_alive(KeepAlive::default())
}

/// POST: decode a client message and dispatch it for the given session.
///
/// Dispatch runs on its own task so a slow handler never blocks other
/// sessions; the response lands on the session's event stream. Returns
/// `202 Accepted` immediately.
pub(crate) async fn handle_message(
    State(runtime): State<Arc<ServerRuntime>>,
    Query(params): Query<MessageParams>,
    headers: HeaderMap,
    body: String,
) -> axum::response::Response {
    let Some(session_id) = params.session.or_else(|| header_session(&headers)) else {
        return reject(StatusCode::BAD_REQUEST, "missing session token");
    };
    if !runtime.sessions().contains(&session_id) {
        return reject(
            StatusCode::NOT_FOUND,
            format!("unknown session '{session_id}'"),
        );
    }

    let message: ClientMessage = match serde_json::from_str(&body) {
        Ok(message) => message,
        Err(err) => {
            warn!(session_id = %session_id, error = %err, "malformed frame");
            return reject(StatusCode::BAD_REQUEST, format!("malformed frame: {err}"));
        }
    };

    let token = session_id.clone();
    tokio::spawn(async move {
        if let Some(response) = runtime.handle_message(&session_id, message).await {
            if !runtime.sessions().push(&session_id, &response) {
                debug!(session_id = %session_id, "response discarded, session gone");
            }
        }
    });

    (StatusCode::ACCEPTED, [(SESSION_HEADER, token.as_str())]).into_response()
}

/// Tears the session down when the event stream is dropped.
struct StreamGuard {
    runtime: Arc<ServerRuntime>,
    session_id: String,
}

impl Drop for StreamGuard {
    fn drop(&mut self) {
        debug!(session_id = %self.session_id, "event stream closed");
        self.runtime.sessions().terminate(&self.session_id);
    }
}

fn event_stream(
    runtime: Arc<ServerRuntime>,
    session_id: String,
    mut rx: broadcast::Receiver<String>,
) -> impl Stream<Item = Result<Event, Infallible>> {
    async_stream::stream! {
        let guard = StreamGuard { runtime, session_id };
        yield Ok(Event::default().event("session").data(&guard.session_id));

        loop {
            match rx.recv().await {
                Ok(json) => {
                    yield Ok(Event::default().event("message").data(json));
                }
                Err(broadcast::error::RecvError::Lagged(skipped)) => {
                    warn!(session_id = %guard.session_id, skipped, "slow client, messages dropped");
                }
                Err(broadcast::error::RecvError::Closed) => break,
            }
        }
    }
}
