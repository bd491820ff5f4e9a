//! The unified error type for the SDK.
//!
//! A single context-rich enum covers the whole taxonomy: configuration
//! errors are fatal at startup, per-request errors become structured
//! [`ResponseError`](crate::protocol::ResponseError)s and never unwind past
//! the dispatcher, and transport errors tear a session down while the
//! server keeps running.

use crate::capability::CapabilityKind;
use crate::protocol::{ErrorKind, ResponseError};
use miette::Diagnostic;
use thiserror::Error;

/// A boxed error source.
pub type BoxError = Box<dyn std::error::Error + Send + Sync>;

/// The primary error type for the SDK.
#[derive(Error, Diagnostic, Debug)]
pub enum CapError {
    // ========================================================================
    // Configuration errors (fatal at startup)
    // ========================================================================
    /// A capability name was registered twice within one kind.
    #[error("duplicate {kind} capability '{name}'")]
    #[diagnostic(
        code(capkit::registry::duplicate),
        help("capability names must be unique within a kind")
    )]
    DuplicateCapability {
        /// The namespace the duplicate was registered in.
        kind: CapabilityKind,
        /// The offending name.
        name: String,
    },

    /// A descriptor declared a malformed argument schema.
    #[error("invalid schema for {kind} '{name}': {reason}")]
    #[diagnostic(code(capkit::registry::invalid_schema))]
    InvalidSchema {
        /// The namespace of the descriptor.
        kind: CapabilityKind,
        /// The descriptor's name.
        name: String,
        /// Why the schema is malformed.
        reason: String,
    },

    // ========================================================================
    // Per-request errors (reported to the client, server continues)
    // ========================================================================
    /// No capability with the requested `(kind, name)` exists.
    #[error("no {kind} named '{name}'")]
    #[diagnostic(code(capkit::dispatch::method_not_found))]
    MethodNotFound {
        /// The namespace that was searched.
        kind: CapabilityKind,
        /// The name that was requested.
        name: String,
    },

    /// The request arguments failed schema validation.
    #[error("invalid arguments: {detail}")]
    #[diagnostic(code(capkit::dispatch::invalid_arguments))]
    InvalidArguments {
        /// The violation, naming the first failing field.
        detail: String,
    },

    /// A handler reported a domain error.
    #[error("{message}")]
    #[diagnostic(code(capkit::handler::failure))]
    HandlerFailure {
        /// The handler-supplied message.
        message: String,
    },

    // ========================================================================
    // Transport and lifecycle errors
    // ========================================================================
    /// A frame was malformed, a connection dropped, or a session cannot
    /// accept work.
    #[error("transport error: {message}")]
    #[diagnostic(code(capkit::transport::error))]
    Transport {
        /// Human-readable detail.
        message: String,
        /// The underlying error, if available.
        #[source]
        source: Option<BoxError>,
    },

    /// The server could not start (e.g. the port is in use).
    #[error("startup failed: {message}")]
    #[diagnostic(
        code(capkit::startup::failed),
        help("check that the configured address is free and bindable")
    )]
    Startup {
        /// Human-readable detail.
        message: String,
        /// The underlying error, if available.
        #[source]
        source: Option<BoxError>,
    },
}

impl CapError {
    /// Create a handler failure from any displayable error.
    #[must_use]
    pub fn handler_failure(message: impl std::fmt::Display) -> Self {
        Self::HandlerFailure {
            message: message.to_string(),
        }
    }

    /// Create a transport error without a source.
    #[must_use]
    pub fn transport(message: impl Into<String>) -> Self {
        Self::Transport {
            message: message.into(),
            source: None,
        }
    }

    /// Create a startup error with a source.
    #[must_use]
    pub fn startup(message: impl Into<String>, source: impl Into<BoxError>) -> Self {
        Self::Startup {
            message: message.into(),
            source: Some(source.into()),
        }
    }

    /// Whether this error is fatal at startup rather than per-request.
    #[must_use]
    pub const fn is_fatal(&self) -> bool {
        matches!(
            self,
            Self::DuplicateCapability { .. } | Self::InvalidSchema { .. } | Self::Startup { .. }
        )
    }

    /// Map this error onto the wire-visible error shape.
    ///
    /// Configuration and startup errors never reach a client; they map to
    /// `transport_error` defensively should one ever be asked to.
    #[must_use]
    pub fn to_response_error(&self) -> ResponseError {
        let kind = match self {
            Self::MethodNotFound { .. } => ErrorKind::MethodNotFound,
            Self::InvalidArguments { .. } => ErrorKind::InvalidArguments,
            Self::HandlerFailure { .. } => ErrorKind::HandlerFailure,
            _ => ErrorKind::TransportError,
        };
        ResponseError::new(kind, self.to_string())
    }
}

impl From<serde_json::Error> for CapError {
    fn from(err: serde_json::Error) -> Self {
        Self::Transport {
            message: err.to_string(),
            source: Some(Box::new(err)),
        }
    }
}
