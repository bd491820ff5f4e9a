//! Runtime configuration.
//!
//! A server runs exactly one transport binding per process; the binding and
//! its parameters are fixed at startup and never change mid-run.

use std::time::Duration;

/// Which transport binding the process runs.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TransportKind {
    /// Newline-delimited JSON over stdin/stdout.
    Stdio,
    /// HTTP POST inbound, `text/event-stream` outbound.
    Sse,
    /// Single-path HTTP POST, stateless or stateful.
    StreamableHttp,
}

impl std::fmt::Display for TransportKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Stdio => write!(f, "stdio"),
            Self::Sse => write!(f, "sse"),
            Self::StreamableHttp => write!(f, "streamable-http"),
        }
    }
}

impl std::str::FromStr for TransportKind {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "stdio" => Ok(Self::Stdio),
            "sse" => Ok(Self::Sse),
            "streamable-http" => Ok(Self::StreamableHttp),
            other => Err(format!("unknown transport '{other}'")),
        }
    }
}

/// Server runtime configuration.
///
/// # Example
///
/// ```rust
/// use capkit_server::config::{ServerConfig, TransportKind};
/// use std::time::Duration;
///
/// let config = ServerConfig::new(TransportKind::Sse)
///     .with_host("127.0.0.1")
///     .with_port(8866)
///     .with_idle_timeout(Duration::from_secs(300));
/// assert_eq!(config.addr(), "127.0.0.1:8866");
/// ```
#[derive(Debug, Clone)]
pub struct ServerConfig {
    /// Bind host for the HTTP bindings. Ignored by stdio.
    pub host: String,
    /// Bind port for the HTTP bindings. Ignored by stdio.
    pub port: u16,
    /// The transport binding to run.
    pub transport: TransportKind,
    /// Streamable HTTP only: when `true`, no session is persisted and each
    /// POST is fully self-contained.
    pub stateless_mode: bool,
    /// Sessions idle longer than this are drained and closed.
    pub idle_timeout: Duration,
    /// How long a draining session may keep in-flight work before it is
    /// forcibly closed.
    pub drain_grace: Duration,
}

impl ServerConfig {
    /// Default idle timeout (5 minutes).
    pub const DEFAULT_IDLE_TIMEOUT: Duration = Duration::from_secs(300);

    /// Default drain grace period.
    pub const DEFAULT_DRAIN_GRACE: Duration = Duration::from_secs(5);

    /// Create a configuration for the given transport with defaults.
    #[must_use]
    pub fn new(transport: TransportKind) -> Self {
        Self {
            host: "127.0.0.1".to_string(),
            port: 8866,
            transport,
            stateless_mode: false,
            idle_timeout: Self::DEFAULT_IDLE_TIMEOUT,
            drain_grace: Self::DEFAULT_DRAIN_GRACE,
        }
    }

    /// Set the bind host.
    #[must_use]
    pub fn with_host(mut self, host: impl Into<String>) -> Self {
        self.host = host.into();
        self
    }

    /// Set the bind port.
    #[must_use]
    pub fn with_port(mut self, port: u16) -> Self {
        self.port = port;
        self
    }

    /// Enable or disable stateless mode (streamable HTTP only).
    #[must_use]
    pub fn with_stateless_mode(mut self, stateless: bool) -> Self {
        self.stateless_mode = stateless;
        self
    }

    /// Set the session idle timeout.
    #[must_use]
    pub fn with_idle_timeout(mut self, timeout: Duration) -> Self {
        self.idle_timeout = timeout;
        self
    }

    /// Set the drain grace period.
    #[must_use]
    pub fn with_drain_grace(mut self, grace: Duration) -> Self {
        self.drain_grace = grace;
        self
    }

    /// The socket address string for the HTTP bindings.
    #[must_use]
    pub fn addr(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self::new(TransportKind::Stdio)
    }
}
