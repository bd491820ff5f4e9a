//! Session model and the concurrent session table.
//!
//! A session is one logical client conversation, independent of the
//! transport that carries it. Its lifecycle is a one-way state machine:
//!
//! ```text
//! Created -> Active -> Draining -> Closed
//! ```
//!
//! `Created` on first contact, `Active` once the binding's hello completes,
//! `Draining` on termination/disconnect/idle-timeout (no new requests, but
//! in-flight ones finish), `Closed` once in-flight work reaches zero or the
//! drain deadline elapses. Closed sessions are removed from the table and
//! their outbound channels dropped, so a response for a destroyed session
//! has nowhere to go — it is discarded, never retried.

use capkit_core::error::CapError;
use capkit_core::protocol::{RequestId, Response};
use dashmap::DashMap;
use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::sync::broadcast;

/// A cooperative cancellation flag shared with in-flight work.
#[derive(Debug, Clone, Default)]
pub struct CancellationToken {
    cancelled: Arc<AtomicBool>,
}

impl CancellationToken {
    /// Create a fresh, uncancelled token.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Check if cancellation has been requested.
    #[must_use]
    pub fn is_cancelled(&self) -> bool {
        self.cancelled.load(Ordering::SeqCst)
    }

    /// Request cancellation.
    pub fn cancel(&self) {
        self.cancelled.store(true, Ordering::SeqCst);
    }
}

/// Lifecycle states of a session.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionState {
    /// First contact made; the binding has not completed its hello yet.
    Created,
    /// Accepting requests.
    Active,
    /// No new requests; in-flight ones may finish until the deadline.
    Draining,
    /// Terminal. The entry is removed from the table at this point.
    Closed,
}

/// One logical client conversation.
#[derive(Debug, Clone)]
pub struct Session {
    /// Opaque session token handed to the client.
    pub id: String,
    /// Current lifecycle state.
    pub state: SessionState,
    /// When the session was created.
    pub created_at: Instant,
    /// When the session last saw traffic.
    pub last_active: Instant,
    in_flight: usize,
    drain_deadline: Option<Instant>,
    cancellations: HashMap<String, CancellationToken>,
}

impl Session {
    fn new(id: String) -> Self {
        let now = Instant::now();
        Self {
            id,
            state: SessionState::Created,
            created_at: now,
            last_active: now,
            in_flight: 0,
            drain_deadline: None,
            cancellations: HashMap::new(),
        }
    }

    /// Whether the session currently accepts new requests.
    #[must_use]
    pub fn accepts(&self) -> bool {
        matches!(self.state, SessionState::Created | SessionState::Active)
    }

    /// Number of requests currently being dispatched.
    #[must_use]
    pub fn in_flight(&self) -> usize {
        self.in_flight
    }

    /// Check if the session has been idle longer than `timeout`.
    #[must_use]
    pub fn is_expired(&self, timeout: Duration) -> bool {
        self.accepts() && self.last_active.elapsed() >= timeout
    }

    fn touch(&mut self) {
        self.last_active = Instant::now();
    }

    fn begin_drain(&mut self, deadline: Instant) {
        if self.accepts() {
            self.state = SessionState::Draining;
            self.drain_deadline = Some(deadline);
        }
    }

    fn drained(&self, now: Instant) -> bool {
        self.state == SessionState::Draining
            && (self.in_flight == 0 || self.drain_deadline.is_some_and(|d| now >= d))
    }
}

/// Thread-safe session table with per-session outbound channels.
///
/// Multiple binding tasks add and remove entries concurrently; the table is
/// a concurrent map. Outbound channels exist only for bindings with a push
/// direction (SSE, stateful streamable HTTP); the stdio binding writes its
/// responses inline and never allocates one.
pub struct SessionStore {
    sessions: DashMap<String, Session>,
    channels: DashMap<String, broadcast::Sender<String>>,
    idle_timeout: Duration,
    drain_grace: Duration,
}

impl SessionStore {
    /// Outbound channel capacity per session.
    const CHANNEL_CAPACITY: usize = 64;

    /// Create a store with the given idle timeout and drain grace period.
    #[must_use]
    pub fn new(idle_timeout: Duration, drain_grace: Duration) -> Self {
        Self {
            sessions: DashMap::new(),
            channels: DashMap::new(),
            idle_timeout,
            drain_grace,
        }
    }

    /// Create a new session and return its token.
    #[must_use]
    pub fn create(&self) -> String {
        let id = uuid::Uuid::new_v4().to_string();
        self.sessions.insert(id.clone(), Session::new(id.clone()));
        id
    }

    /// Create a new session with an outbound channel, returning the token
    /// and the channel's receiving end.
    #[must_use]
    pub fn create_with_channel(&self) -> (String, broadcast::Receiver<String>) {
        let id = self.create();
        let (tx, rx) = broadcast::channel(Self::CHANNEL_CAPACITY);
        self.channels.insert(id.clone(), tx);
        (id, rx)
    }

    /// Transition a session from `Created` to `Active`.
    pub fn activate(&self, id: &str) {
        if let Some(mut session) = self.sessions.get_mut(id) {
            if session.state == SessionState::Created {
                session.state = SessionState::Active;
            }
            session.touch();
        }
    }

    /// Update a session's last-active time.
    pub fn touch(&self, id: &str) {
        if let Some(mut session) = self.sessions.get_mut(id) {
            session.touch();
        }
    }

    /// Get a snapshot of a session.
    #[must_use]
    pub fn get(&self, id: &str) -> Option<Session> {
        self.sessions.get(id).map(|s| s.clone())
    }

    /// Check whether a session exists.
    #[must_use]
    pub fn contains(&self, id: &str) -> bool {
        self.sessions.contains_key(id)
    }

    /// Number of live sessions.
    #[must_use]
    pub fn count(&self) -> usize {
        self.sessions.len()
    }

    /// Total in-flight requests across all sessions.
    #[must_use]
    pub fn total_in_flight(&self) -> usize {
        self.sessions.iter().map(|s| s.in_flight).sum()
    }

    /// Admit a request into a session.
    ///
    /// Fails when the session is unknown or no longer accepting (draining).
    /// On success the returned token is also retained for [`cancel`](Self::cancel).
    pub fn begin_request(
        &self,
        id: &str,
        request_id: &RequestId,
    ) -> Result<CancellationToken, CapError> {
        let Some(mut session) = self.sessions.get_mut(id) else {
            return Err(CapError::transport(format!("unknown session '{id}'")));
        };
        if !session.accepts() {
            return Err(CapError::transport(format!(
                "session '{id}' is not accepting requests"
            )));
        }
        session.touch();
        session.in_flight += 1;
        let token = CancellationToken::new();
        session
            .cancellations
            .insert(request_id.to_string(), token.clone());
        Ok(token)
    }

    /// Mark a request as finished, closing the session if it was the last
    /// in-flight request of a draining session.
    pub fn finish_request(&self, id: &str, request_id: &RequestId) {
        let mut close = false;
        if let Some(mut session) = self.sessions.get_mut(id) {
            session.in_flight = session.in_flight.saturating_sub(1);
            session.cancellations.remove(&request_id.to_string());
            if session.state == SessionState::Draining && session.in_flight == 0 {
                session.state = SessionState::Closed;
                close = true;
            }
        }
        if close {
            self.remove(id);
        }
    }

    /// Request cooperative cancellation of an in-flight request.
    ///
    /// Returns `true` if a matching in-flight request was found.
    pub fn cancel(&self, id: &str, request_id: &RequestId) -> bool {
        if let Some(session) = self.sessions.get(id) {
            if let Some(token) = session.cancellations.get(&request_id.to_string()) {
                token.cancel();
                return true;
            }
        }
        false
    }

    /// Deliver a response on a session's outbound channel.
    ///
    /// Returns `false` if the session is gone or has no channel — the
    /// response is discarded in that case, upholding the rule that nothing
    /// is delivered after a session is destroyed.
    #[must_use]
    pub fn push(&self, id: &str, response: &Response) -> bool {
        if !self.sessions.contains_key(id) {
            return false;
        }
        let Ok(json) = serde_json::to_string(response) else {
            return false;
        };
        if let Some(tx) = self.channels.get(id) {
            // A send error means no receiver is listening; treat as undelivered.
            return tx.send(json).is_ok();
        }
        false
    }

    /// Subscribe to a session's outbound channel.
    #[must_use]
    pub fn subscribe(&self, id: &str) -> Option<broadcast::Receiver<String>> {
        self.channels.get(id).map(|tx| tx.subscribe())
    }

    /// Begin draining a session (termination message, disconnect, timeout).
    ///
    /// Closes it immediately when nothing is in flight.
    pub fn terminate(&self, id: &str) {
        let deadline = Instant::now() + self.drain_grace;
        let mut close = false;
        if let Some(mut session) = self.sessions.get_mut(id) {
            session.begin_drain(deadline);
            if session.in_flight == 0 {
                session.state = SessionState::Closed;
                close = true;
            }
        }
        if close {
            self.remove(id);
        }
    }

    /// Begin draining every session (server shutdown).
    pub fn drain_all(&self) {
        let deadline = Instant::now() + self.drain_grace;
        let ids: Vec<String> = self.sessions.iter().map(|s| s.id.clone()).collect();
        for id in &ids {
            if let Some(mut session) = self.sessions.get_mut(id) {
                session.begin_drain(deadline);
            }
        }
        self.reap();
    }

    /// Remove every session unconditionally (post-grace forced close).
    pub fn close_all(&self) {
        self.sessions.clear();
        self.channels.clear();
    }

    /// Remove a session and drop its outbound channel.
    pub fn remove(&self, id: &str) {
        self.sessions.remove(id);
        self.channels.remove(id);
        tracing::debug!(session_id = %id, "session closed");
    }

    /// One maintenance pass: expire idle sessions, then reap drained ones.
    pub fn sweep(&self) {
        let deadline = Instant::now() + self.drain_grace;
        let expired: Vec<String> = self
            .sessions
            .iter()
            .filter(|s| s.is_expired(self.idle_timeout))
            .map(|s| s.id.clone())
            .collect();
        for id in &expired {
            tracing::debug!(session_id = %id, "session idle timeout");
            if let Some(mut session) = self.sessions.get_mut(id) {
                session.begin_drain(deadline);
            }
        }
        self.reap();
    }

    fn reap(&self) {
        let now = Instant::now();
        let done: Vec<String> = self
            .sessions
            .iter()
            .filter(|s| s.drained(now))
            .map(|s| s.id.clone())
            .collect();
        for id in &done {
            self.remove(id);
        }
    }

    /// Start a background task that sweeps the table periodically.
    pub fn spawn_sweeper(self: &Arc<Self>, interval: Duration) {
        let store = Arc::clone(self);
        tokio::spawn(async move {
            loop {
                tokio::time::sleep(interval).await;
                store.sweep();
            }
        });
    }
}
