//! `CALL_REQ` payload layout.
//!
//! ```text
//! ┌──────────┬──────────┬──────────┬──────────┬───────────────┐
//! │ arg1 len │ arg1     │ arg2 len │ arg2     │ arg3          │
//! │ uint16 BE│ method   │ uint32 BE│ header   │ body (rest)   │
//! └──────────┴──────────┴──────────┴──────────┴───────────────┘
//! ```
//!
//! All three arguments are opaque; slicing is zero-copy over the frame
//! payload.

use bytes::{BufMut, Bytes, BytesMut};

use crate::error::{DispatchError, Result};

/// A decoded call message with its three positional arguments.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct CallMessage {
    /// Method name.
    pub arg1: Bytes,
    /// Application header blob.
    pub arg2: Bytes,
    /// Application body blob.
    pub arg3: Bytes,
}

impl CallMessage {
    /// Create a call message from its three arguments.
    pub fn new(arg1: impl Into<Bytes>, arg2: impl Into<Bytes>, arg3: impl Into<Bytes>) -> Self {
        Self {
            arg1: arg1.into(),
            arg2: arg2.into(),
            arg3: arg3.into(),
        }
    }

    /// Encode into a `CALL_REQ` payload.
    ///
    /// # Errors
    ///
    /// Returns a protocol error if `arg1` or `arg2` exceed their length
    /// prefix.
    pub fn encode(&self) -> Result<Bytes> {
        let arg1_len = u16::try_from(self.arg1.len()).map_err(|_| {
            DispatchError::Protocol(format!("arg1 too long: {} bytes", self.arg1.len()))
        })?;
        let arg2_len = u32::try_from(self.arg2.len()).map_err(|_| {
            DispatchError::Protocol(format!("arg2 too long: {} bytes", self.arg2.len()))
        })?;

        let mut buf =
            BytesMut::with_capacity(2 + 4 + self.arg1.len() + self.arg2.len() + self.arg3.len());
        buf.put_u16(arg1_len);
        buf.put_slice(&self.arg1);
        buf.put_u32(arg2_len);
        buf.put_slice(&self.arg2);
        buf.put_slice(&self.arg3);
        Ok(buf.freeze())
    }

    /// Decode a `CALL_REQ` payload.
    ///
    /// # Errors
    ///
    /// Returns a protocol error if a length prefix runs past the payload.
    pub fn decode(payload: &Bytes) -> Result<Self> {
        let mut offset = 0usize;

        let arg1_len = read_len(payload, &mut offset, 2, "arg1")?;
        let arg1 = take(payload, &mut offset, arg1_len, "arg1")?;

        let arg2_len = read_len(payload, &mut offset, 4, "arg2")?;
        let arg2 = take(payload, &mut offset, arg2_len, "arg2")?;

        let arg3 = payload.slice(offset..);

        Ok(Self { arg1, arg2, arg3 })
    }
}

fn read_len(payload: &Bytes, offset: &mut usize, width: usize, name: &str) -> Result<usize> {
    let end = *offset + width;
    if payload.len() < end {
        return Err(DispatchError::Protocol(format!(
            "Truncated call: missing {} length",
            name
        )));
    }

    let raw = &payload[*offset..end];
    *offset = end;
    Ok(match width {
        2 => u16::from_be_bytes([raw[0], raw[1]]) as usize,
        _ => u32::from_be_bytes([raw[0], raw[1], raw[2], raw[3]]) as usize,
    })
}

fn take(payload: &Bytes, offset: &mut usize, len: usize, name: &str) -> Result<Bytes> {
    let end = *offset + len;
    if payload.len() < end {
        return Err(DispatchError::Protocol(format!(
            "Truncated call: {} needs {} bytes, {} available",
            name,
            len,
            payload.len() - *offset
        )));
    }

    let out = payload.slice(*offset..end);
    *offset = end;
    Ok(out)
}
