//! Frame struct with typed accessors.
//!
//! # Example
//!
//! ```
//! use rpc_dispatch::protocol::{frame_type, Frame, Header};
//! use bytes::Bytes;
//!
//! let header = Header::new(frame_type::CALL_RES, 42, 4);
//! let frame = Frame::new(header, Bytes::from_static(b"pong"));
//!
//! assert_eq!(frame.call_id(), 42);
//! assert_eq!(frame.payload(), b"pong");
//! ```

use bytes::Bytes;

use super::wire_format::Header;

/// A complete protocol frame.
#[derive(Debug, Clone)]
pub struct Frame {
    /// Decoded header.
    pub header: Header,
    /// Payload bytes.
    pub payload: Bytes,
}

impl Frame {
    /// Create a new frame from header and payload.
    pub fn new(header: Header, payload: Bytes) -> Self {
        Self { header, payload }
    }

    /// Get a reference to the payload bytes.
    #[inline]
    pub fn payload(&self) -> &[u8] {
        &self.payload
    }

    /// Get the frame type byte.
    #[inline]
    pub fn frame_type(&self) -> u8 {
        self.header.frame_type
    }

    /// Get the call ID.
    #[inline]
    pub fn call_id(&self) -> u32 {
        self.header.call_id
    }

    #[inline]
    pub fn is_call(&self) -> bool {
        self.header.is_call()
    }

    #[inline]
    pub fn is_error(&self) -> bool {
        self.header.is_error()
    }

    #[inline]
    pub fn is_end(&self) -> bool {
        self.header.is_end()
    }
}
