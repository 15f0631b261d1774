//! Codec module - serialization for structured frame payloads.
//!
//! Call arguments travel as opaque bytes and are never decoded here. Only
//! transport-owned bodies (error responses) are structured, and those use
//! [`MsgPackCodec`].
//!
//! # Example
//!
//! ```
//! use rpc_dispatch::codec::MsgPackCodec;
//!
//! let encoded = MsgPackCodec::encode(&"hello").unwrap();
//! let decoded: String = MsgPackCodec::decode(&encoded).unwrap();
//! assert_eq!(decoded, "hello");
//! ```

mod msgpack;

pub use msgpack::MsgPackCodec;
