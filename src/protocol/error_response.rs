//! Structured error bodies carried by `ERROR` frames.

use serde::{Deserialize, Serialize};

use crate::codec::MsgPackCodec;
use crate::error::{DispatchError, Result};

/// Error codes understood by callers.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(into = "u8", try_from = "u8")]
pub enum ErrorCode {
    /// Call rejected because the server is at capacity.
    Busy,
    /// The handler failed while serving the call.
    UnexpectedError,
    /// The call could not be served as addressed (unknown method, bad frame).
    BadRequest,
}

impl ErrorCode {
    /// Wire value of the code.
    pub fn as_u8(self) -> u8 {
        match self {
            Self::Busy => 0x03,
            Self::UnexpectedError => 0x05,
            Self::BadRequest => 0x06,
        }
    }
}

impl From<ErrorCode> for u8 {
    fn from(code: ErrorCode) -> Self {
        code.as_u8()
    }
}

impl TryFrom<u8> for ErrorCode {
    type Error = String;

    fn try_from(value: u8) -> std::result::Result<Self, Self::Error> {
        match value {
            0x03 => Ok(Self::Busy),
            0x05 => Ok(Self::UnexpectedError),
            0x06 => Ok(Self::BadRequest),
            other => Err(format!("unknown error code 0x{:02X}", other)),
        }
    }
}

/// Body of an error response.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ErrorResponse {
    pub code: ErrorCode,
    pub message: String,
}

impl ErrorResponse {
    pub fn new(code: ErrorCode, message: impl Into<String>) -> Self {
        Self {
            code,
            message: message.into(),
        }
    }

    /// Map a dispatch error to the response a caller should see.
    ///
    /// The error's display text is kept as the message.
    pub fn from_error(err: &DispatchError) -> Self {
        let code = match err {
            DispatchError::MethodNotFound(_) | DispatchError::Protocol(_) => ErrorCode::BadRequest,
            DispatchError::Busy => ErrorCode::Busy,
            _ => ErrorCode::UnexpectedError,
        };
        Self::new(code, err.to_string())
    }

    /// Encode as an `ERROR` frame payload.
    pub fn encode(&self) -> Result<Vec<u8>> {
        MsgPackCodec::encode(self)
    }

    /// Decode an `ERROR` frame payload.
    pub fn decode(bytes: &[u8]) -> Result<Self> {
        MsgPackCodec::decode(bytes)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_code_mapping() {
        let not_found = ErrorResponse::from_error(&DispatchError::MethodNotFound("x".into()));
        assert_eq!(not_found.code, ErrorCode::BadRequest);
        assert_eq!(not_found.message, "No such method: x");

        let failure = ErrorResponse::from_error(&DispatchError::HandlerFailure {
            method: "boom".into(),
            source: Box::new(DispatchError::handler("kaboom")),
        });
        assert_eq!(failure.code, ErrorCode::UnexpectedError);
        assert!(failure.message.contains("kaboom"));

        assert_eq!(
            ErrorResponse::from_error(&DispatchError::Busy).code,
            ErrorCode::Busy
        );
    }

    #[test]
    fn test_code_encodes_as_integer() {
        let response = ErrorResponse::from_error(&DispatchError::MethodNotFound("nope".into()));
        let encoded = response.encode().unwrap();

        // fixmap(2), fixstr "code", positive fixint 0x06
        assert_eq!(encoded[0], 0x82);
        assert_eq!(&encoded[1..6], b"\xa4code");
        assert_eq!(encoded[6], 0x06);

        let decoded = ErrorResponse::decode(&encoded).unwrap();
        assert_eq!(decoded, response);
    }

    #[test]
    fn test_unknown_code_rejected() {
        assert!(ErrorCode::try_from(0x42).is_err());
    }
}
