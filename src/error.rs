//! Error types for rpc-dispatch.

use thiserror::Error;

/// Main error type for all dispatch operations.
#[derive(Debug, Error)]
pub enum DispatchError {
    /// A handler left without a concrete implementation was invoked.
    #[error("Handler for method '{0}' is not implemented")]
    NotImplemented(String),

    /// No endpoint is registered under the requested method.
    #[error("No such method: {0}")]
    MethodNotFound(String),

    /// A handler returned an error or panicked while serving a call.
    #[error("Handler for method '{method}' failed: {source}")]
    HandlerFailure {
        /// Method the failing handler was registered under.
        method: String,
        /// The error raised by the handler.
        #[source]
        source: Box<DispatchError>,
    },

    /// Write or finish on a response that is not open.
    #[error("Response state violation: {0}")]
    StateViolation(&'static str),

    /// Application-level failure raised from inside a handler.
    #[error("{0}")]
    Handler(String),

    /// The call was rejected because the server is at capacity.
    #[error("Server busy")]
    Busy,

    /// I/O error during socket operations.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// JSON error while reading endpoint options.
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// MsgPack serialization error.
    #[error("MsgPack encode error: {0}")]
    MsgPackEncode(#[from] rmp_serde::encode::Error),

    /// MsgPack deserialization error.
    #[error("MsgPack decode error: {0}")]
    MsgPackDecode(#[from] rmp_serde::decode::Error),

    /// Protocol error (malformed frame, oversized payload, etc.).
    #[error("Protocol error: {0}")]
    Protocol(String),

    /// Connection closed unexpectedly.
    #[error("Connection closed")]
    ConnectionClosed,

    /// Writer queue stayed full past the send timeout.
    #[error("Backpressure timeout")]
    BackpressureTimeout,
}

impl DispatchError {
    /// Build an application failure from anything displayable.
    pub fn handler(message: impl Into<String>) -> Self {
        Self::Handler(message.into())
    }

    /// Whether this error signals a programming error rather than a
    /// runtime failure.
    pub fn is_programming_error(&self) -> bool {
        match self {
            Self::NotImplemented(_) | Self::StateViolation(_) => true,
            Self::HandlerFailure { source, .. } => source.is_programming_error(),
            _ => false,
        }
    }
}

/// Result type alias using DispatchError.
pub type Result<T> = std::result::Result<T, DispatchError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_handler_failure_message_keeps_source() {
        let err = DispatchError::HandlerFailure {
            method: "boom".to_string(),
            source: Box::new(DispatchError::handler("kaboom")),
        };

        assert_eq!(err.to_string(), "Handler for method 'boom' failed: kaboom");
        assert!(std::error::Error::source(&err).is_some());
    }

    #[test]
    fn test_programming_error_classification() {
        assert!(DispatchError::NotImplemented("x".into()).is_programming_error());
        assert!(DispatchError::StateViolation("finish called twice").is_programming_error());
        assert!(!DispatchError::MethodNotFound("x".into()).is_programming_error());
        assert!(!DispatchError::handler("oops").is_programming_error());

        let wrapped = DispatchError::HandlerFailure {
            method: "m".into(),
            source: Box::new(DispatchError::NotImplemented("m".into())),
        };
        assert!(wrapped.is_programming_error());
    }
}
