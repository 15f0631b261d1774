//! Read-only view of an incoming call.

use std::sync::Arc;

use bytes::Bytes;

use crate::connection::Connection;
use crate::protocol::CallMessage;

/// A decoded incoming call as handed over by the transport.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CallContext {
    /// Transport-assigned call identifier.
    pub call_id: u32,
    /// The decoded message.
    pub message: CallMessage,
}

impl CallContext {
    pub fn new(
        call_id: u32,
        method: impl Into<Bytes>,
        header: impl Into<Bytes>,
        body: impl Into<Bytes>,
    ) -> Self {
        Self {
            call_id,
            message: CallMessage::new(method, header, body),
        }
    }

    pub fn from_message(call_id: u32, message: CallMessage) -> Self {
        Self { call_id, message }
    }
}

/// Request handed to a handler.
///
/// Cloning is cheap: payloads are reference-counted and the connection is a
/// shared, non-owning back-reference.
#[derive(Clone)]
pub struct Request {
    call_id: u32,
    method: String,
    header: Bytes,
    body: Bytes,
    connection: Arc<dyn Connection>,
}

impl Request {
    /// Build the view for one call.
    ///
    /// Method bytes that are not valid UTF-8 are converted lossily.
    pub fn new(context: CallContext, connection: Arc<dyn Connection>) -> Self {
        let CallMessage { arg1, arg2, arg3 } = context.message;
        Self {
            call_id: context.call_id,
            method: String::from_utf8_lossy(&arg1).into_owned(),
            header: arg2,
            body: arg3,
            connection,
        }
    }

    #[inline]
    pub fn call_id(&self) -> u32 {
        self.call_id
    }

    #[inline]
    pub fn method(&self) -> &str {
        &self.method
    }

    #[inline]
    pub fn header(&self) -> &Bytes {
        &self.header
    }

    #[inline]
    pub fn body(&self) -> &Bytes {
        &self.body
    }

    /// The connection this call arrived on.
    #[inline]
    pub fn connection(&self) -> &Arc<dyn Connection> {
        &self.connection
    }
}

impl std::fmt::Debug for Request {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Request")
            .field("call_id", &self.call_id)
            .field("method", &self.method)
            .field("header_len", &self.header.len())
            .field("body_len", &self.body.len())
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::connection::testing::RecordingConnection;

    #[test]
    fn test_fields_projected_positionally() {
        let conn = RecordingConnection::new();
        let ctx = CallContext::new(7, "ping", Bytes::from_static(b"hdr"), Bytes::from_static(b"bdy"));

        let request = Request::new(ctx, conn.clone());

        assert_eq!(request.call_id(), 7);
        assert_eq!(request.method(), "ping");
        assert_eq!(request.header().as_ref(), b"hdr");
        assert_eq!(request.body().as_ref(), b"bdy");

        let expected: Arc<dyn Connection> = conn;
        assert!(Arc::ptr_eq(request.connection(), &expected));
    }

    #[test]
    fn test_invalid_utf8_method_is_lossy() {
        let conn = RecordingConnection::new();
        let ctx = CallContext::new(1, Bytes::from_static(b"p\xffng"), Bytes::new(), Bytes::new());

        let request = Request::new(ctx, conn);

        assert_eq!(request.method(), "p\u{FFFD}ng");
    }
}
