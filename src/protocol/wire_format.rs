//! Wire format encoding and decoding.
//!
//! Every frame starts with a 9-byte header:
//! ```text
//! ┌──────────┬──────────┬──────────┐
//! │ Type     │ Call ID  │ Length   │
//! │ 1 byte   │ 4 bytes  │ 4 bytes  │
//! │          │ uint32 BE│ uint32 BE│
//! └──────────┴──────────┴──────────┘
//! ```

use crate::error::{DispatchError, Result};

/// Header size in bytes (fixed, exactly 9).
pub const HEADER_SIZE: usize = 9;

/// Default maximum payload size (16 MB).
pub const DEFAULT_MAX_PAYLOAD_SIZE: u32 = 16 * 1024 * 1024;

/// Frame type constants.
pub mod frame_type {
    /// Incoming call carrying method, header and body arguments.
    pub const CALL_REQ: u8 = 0x03;
    /// One chunk of response output for a call.
    pub const CALL_RES: u8 = 0x04;
    /// Response finalized; always an empty payload.
    pub const CALL_RES_END: u8 = 0x05;
    /// Error indication for a call; MsgPack `ErrorResponse` payload.
    pub const ERROR: u8 = 0xFF;

    /// Whether the byte names a known frame type.
    #[inline]
    pub fn is_known(frame_type: u8) -> bool {
        matches!(frame_type, CALL_REQ | CALL_RES | CALL_RES_END | ERROR)
    }
}

/// Decoded header from wire format.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Header {
    /// Frame type (see [`frame_type`]).
    pub frame_type: u8,
    /// Call identifier shared by a request and all of its response frames.
    pub call_id: u32,
    /// Payload length in bytes.
    pub payload_length: u32,
}

impl Header {
    /// Create a new header.
    pub fn new(frame_type: u8, call_id: u32, payload_length: u32) -> Self {
        Self {
            frame_type,
            call_id,
            payload_length,
        }
    }

    /// Encode header to bytes (Big Endian).
    ///
    /// # Example
    ///
    /// ```
    /// use rpc_dispatch::protocol::{frame_type, Header, HEADER_SIZE};
    ///
    /// let bytes = Header::new(frame_type::CALL_RES, 42, 100).encode();
    /// assert_eq!(bytes.len(), HEADER_SIZE);
    /// ```
    pub fn encode(&self) -> [u8; HEADER_SIZE] {
        let mut buf = [0u8; HEADER_SIZE];
        buf[0] = self.frame_type;
        buf[1..5].copy_from_slice(&self.call_id.to_be_bytes());
        buf[5..9].copy_from_slice(&self.payload_length.to_be_bytes());
        buf
    }

    /// Header for a frame carrying `payload_len` bytes.
    ///
    /// Fails with `Protocol` when the length does not fit the 32-bit length
    /// field.
    pub fn for_payload(frame_type: u8, call_id: u32, payload_len: usize) -> Result<Self> {
        let payload_length = u32::try_from(payload_len).map_err(|_| {
            DispatchError::Protocol(format!(
                "Payload of {} bytes does not fit a frame",
                payload_len
            ))
        })?;
        Ok(Self::new(frame_type, call_id, payload_length))
    }

    /// Decode header from bytes (Big Endian).
    pub fn decode(buf: &[u8; HEADER_SIZE]) -> Self {
        Self {
            frame_type: buf[0],
            call_id: u32::from_be_bytes([buf[1], buf[2], buf[3], buf[4]]),
            payload_length: u32::from_be_bytes([buf[5], buf[6], buf[7], buf[8]]),
        }
    }

    /// Validate the header for protocol compliance.
    ///
    /// Checks:
    /// - Frame type is known
    /// - Payload length doesn't exceed max
    /// - `CALL_RES_END` carries no payload
    pub fn validate(&self, max_payload_size: u32) -> Result<()> {
        if !frame_type::is_known(self.frame_type) {
            return Err(DispatchError::Protocol(format!(
                "Unknown frame type 0x{:02X}",
                self.frame_type
            )));
        }

        if self.payload_length > max_payload_size {
            return Err(DispatchError::Protocol(format!(
                "Payload size {} exceeds maximum {}",
                self.payload_length, max_payload_size
            )));
        }

        if self.frame_type == frame_type::CALL_RES_END && self.payload_length != 0 {
            return Err(DispatchError::Protocol(
                "CALL_RES_END must have an empty payload".to_string(),
            ));
        }

        Ok(())
    }

    /// Check if this is an incoming call.
    #[inline]
    pub fn is_call(&self) -> bool {
        self.frame_type == frame_type::CALL_REQ
    }

    /// Check if this is an error frame.
    #[inline]
    pub fn is_error(&self) -> bool {
        self.frame_type == frame_type::ERROR
    }

    /// Check if this frame finalizes a call.
    #[inline]
    pub fn is_end(&self) -> bool {
        self.frame_type == frame_type::CALL_RES_END
    }
}
