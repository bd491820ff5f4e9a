//! Wire types for the capability protocol.
//!
//! Every transport carries the same payload shapes; only the framing and
//! delivery channel differ. All messages are one of:
//!
//! - **Request**: invoke a named capability, expecting exactly one response
//! - **Cancel**: ask the server to stop work on an earlier request
//! - **Terminate**: end the session explicitly
//! - **Response**: the reply to a request (success or error, never both)
//!
//! # Example
//!
//! ```rust
//! use capkit_core::protocol::{ClientMessage, Request, Response};
//!
//! let json = r#"{"id":"1","kind":"tool","name":"add","arguments":{"a":2,"b":3}}"#;
//! let msg: ClientMessage = serde_json::from_str(json).unwrap();
//! assert!(matches!(msg, ClientMessage::Request(_)));
//!
//! let reply = Response::success("1", serde_json::json!(5));
//! assert_eq!(serde_json::to_string(&reply).unwrap(), r#"{"id":"1","result":5}"#);
//! ```

use crate::capability::CapabilityKind;
use serde::{Deserialize, Serialize};

/// A request correlation token.
///
/// Opaque to the server: it is echoed back verbatim in the response so the
/// client can match replies to requests. Numbers and strings are both
/// accepted on the wire.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(untagged)]
pub enum RequestId {
    /// Numeric correlation token.
    Number(u64),
    /// String correlation token.
    String(String),
}

impl From<u64> for RequestId {
    fn from(id: u64) -> Self {
        Self::Number(id)
    }
}

impl From<String> for RequestId {
    fn from(id: String) -> Self {
        Self::String(id)
    }
}

impl From<&str> for RequestId {
    fn from(id: &str) -> Self {
        Self::String(id.to_string())
    }
}

impl std::fmt::Display for RequestId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Number(n) => write!(f, "{n}"),
            Self::String(s) => write!(f, "{s}"),
        }
    }
}

/// A capability invocation.
///
/// Created by a transport binding on decode, consumed once by the
/// dispatcher, never mutated.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Request {
    /// Correlation token echoed in the response.
    pub id: RequestId,
    /// Which capability namespace the name belongs to.
    pub kind: CapabilityKind,
    /// Name of the capability to invoke.
    pub name: String,
    /// Named arguments for the handler. May be empty.
    #[serde(default)]
    pub arguments: serde_json::Map<String, serde_json::Value>,
}

impl Request {
    /// Create a request with no arguments.
    #[must_use]
    pub fn new(id: impl Into<RequestId>, kind: CapabilityKind, name: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            kind,
            name: name.into(),
            arguments: serde_json::Map::new(),
        }
    }

    /// Add an argument.
    #[must_use]
    pub fn argument(mut self, name: impl Into<String>, value: impl Into<serde_json::Value>) -> Self {
        self.arguments.insert(name.into(), value.into());
        self
    }
}

/// The reply to a [`Request`].
///
/// Exactly one of `result` / `error` is set; the constructors enforce this.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Response {
    /// The correlation token of the request this answers.
    pub id: RequestId,
    /// The result on success.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub result: Option<serde_json::Value>,
    /// The error on failure.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<ResponseError>,
}

impl Response {
    /// Create a successful response.
    #[must_use]
    pub fn success(id: impl Into<RequestId>, result: serde_json::Value) -> Self {
        Self {
            id: id.into(),
            result: Some(result),
            error: None,
        }
    }

    /// Create an error response.
    #[must_use]
    pub fn failure(id: impl Into<RequestId>, error: ResponseError) -> Self {
        Self {
            id: id.into(),
            result: None,
            error: Some(error),
        }
    }

    /// Check if this response indicates success.
    #[must_use]
    pub const fn is_success(&self) -> bool {
        self.result.is_some() && self.error.is_none()
    }

    /// Check if this response indicates an error.
    #[must_use]
    pub const fn is_error(&self) -> bool {
        self.error.is_some()
    }

    /// Get the result, consuming self.
    ///
    /// Returns `Err` if this was an error response.
    pub fn into_result(self) -> Result<serde_json::Value, ResponseError> {
        if let Some(error) = self.error {
            Err(error)
        } else {
            self.result.ok_or_else(|| ResponseError {
                kind: ErrorKind::TransportError,
                message: "response contained neither result nor error".to_string(),
            })
        }
    }
}

/// A structured error carried inside a [`Response`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ResponseError {
    /// Error category, stable across transports.
    pub kind: ErrorKind,
    /// Human-readable detail.
    pub message: String,
}

impl ResponseError {
    /// Create a new response error.
    #[must_use]
    pub fn new(kind: ErrorKind, message: impl Into<String>) -> Self {
        Self {
            kind,
            message: message.into(),
        }
    }
}

impl std::fmt::Display for ResponseError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}: {}", self.kind, self.message)
    }
}

/// Error categories visible to clients.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ErrorKind {
    /// No capability with the requested `(kind, name)` is registered.
    MethodNotFound,
    /// The arguments failed schema validation.
    InvalidArguments,
    /// The handler itself reported a domain error.
    HandlerFailure,
    /// The frame was malformed or the session cannot accept work.
    TransportError,
}

impl std::fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::MethodNotFound => write!(f, "method_not_found"),
            Self::InvalidArguments => write!(f, "invalid_arguments"),
            Self::HandlerFailure => write!(f, "handler_failure"),
            Self::TransportError => write!(f, "transport_error"),
        }
    }
}

/// A cancellation frame: `{"cancel": <request id>}`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CancelFrame {
    /// The id of the request to stop working on.
    pub cancel: RequestId,
}

/// A termination frame: `{"terminate": true}`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TerminateFrame {
    /// Always `true`; present so the frame is self-describing.
    pub terminate: bool,
}

/// Any message a client may send.
///
/// Untagged: a frame with a `cancel` field is a cancellation, a frame with
/// a `terminate` field ends the session, everything else must parse as a
/// [`Request`].
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(untagged)]
pub enum ClientMessage {
    /// Cancel an in-flight request.
    Cancel(CancelFrame),
    /// End the session explicitly.
    Terminate(TerminateFrame),
    /// Invoke a capability.
    Request(Request),
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::capability::CapabilityKind;
    use pretty_assertions::assert_eq;

    #[test]
    fn request_wire_shape() {
        let json = r#"{"id":"1","kind":"tool","name":"add","arguments":{"a":2,"b":3}}"#;
        let req: Request = serde_json::from_str(json).unwrap();
        assert_eq!(req.id, RequestId::String("1".to_string()));
        assert_eq!(req.kind, CapabilityKind::Tool);
        assert_eq!(req.name, "add");
        assert_eq!(req.arguments["a"], serde_json::json!(2));
    }

    #[test]
    fn request_arguments_default_to_empty() {
        let json = r#"{"id":7,"kind":"resource","name":"zen_python"}"#;
        let req: Request = serde_json::from_str(json).unwrap();
        assert_eq!(req.id, RequestId::Number(7));
        assert!(req.arguments.is_empty());
    }

    #[test]
    fn response_success_shape() {
        let resp = Response::success("1", serde_json::json!(5));
        assert!(resp.is_success());
        assert_eq!(
            serde_json::to_string(&resp).unwrap(),
            r#"{"id":"1","result":5}"#
        );
    }

    #[test]
    fn response_error_shape() {
        let resp = Response::failure(
            2u64,
            ResponseError::new(ErrorKind::MethodNotFound, "no tool named 'pow'"),
        );
        assert!(resp.is_error());
        let json = serde_json::to_value(&resp).unwrap();
        assert_eq!(json["error"]["kind"], "method_not_found");
        assert!(json.get("result").is_none());
    }

    #[test]
    fn client_message_discrimination() {
        let cancel: ClientMessage = serde_json::from_str(r#"{"cancel":"1"}"#).unwrap();
        assert!(matches!(cancel, ClientMessage::Cancel(_)));

        let term: ClientMessage = serde_json::from_str(r#"{"terminate":true}"#).unwrap();
        assert!(matches!(term, ClientMessage::Terminate(_)));

        let req: ClientMessage =
            serde_json::from_str(r#"{"id":1,"kind":"prompt","name":"review_code"}"#).unwrap();
        assert!(matches!(req, ClientMessage::Request(_)));
    }

    #[test]
    fn malformed_frame_is_rejected() {
        let err = serde_json::from_str::<ClientMessage>(r#"{"name":"add"}"#);
        assert!(err.is_err());
    }

    #[test]
    fn into_result_splits_success_and_error() {
        let ok = Response::success(1u64, serde_json::json!(42));
        assert_eq!(ok.into_result().unwrap(), serde_json::json!(42));

        let err = Response::failure(
            1u64,
            ResponseError::new(ErrorKind::HandlerFailure, "division by zero"),
        );
        assert_eq!(err.into_result().unwrap_err().kind, ErrorKind::HandlerFailure);
    }
}
