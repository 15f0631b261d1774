//! Protocol module - wire format, framing, and call payloads.
//!
//! - 9-byte frame header encoding/decoding
//! - Frame-at-a-time reader over async streams
//! - `CALL_REQ` payload layout ([`CallMessage`])
//! - Structured error bodies ([`ErrorResponse`])

mod call;
mod error_response;
mod frame;
mod frame_reader;
mod wire_format;

pub use call::CallMessage;
pub use error_response::{ErrorCode, ErrorResponse};
pub use frame::Frame;
pub use frame_reader::FrameReader;
pub use wire_format::{frame_type, Header, DEFAULT_MAX_PAYLOAD_SIZE, HEADER_SIZE};
