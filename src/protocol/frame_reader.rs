//! Reads whole frames off an async byte stream.
//!
//! Each frame is read as a header followed by exactly `payload_length`
//! bytes. The stream may only end between frames.

use std::io::ErrorKind;

use bytes::Bytes;
use tokio::io::{AsyncBufReadExt, AsyncRead, AsyncReadExt, BufReader};

use super::wire_format::{Header, DEFAULT_MAX_PAYLOAD_SIZE, HEADER_SIZE};
use super::Frame;
use crate::error::{DispatchError, Result};

/// Frame-at-a-time reader over any `AsyncRead`.
pub struct FrameReader<R> {
    reader: BufReader<R>,
    max_payload_size: u32,
}

impl<R: AsyncRead + Unpin> FrameReader<R> {
    pub fn new(reader: R) -> Self {
        Self::with_max_payload(reader, DEFAULT_MAX_PAYLOAD_SIZE)
    }

    /// Reader rejecting frames whose payload exceeds `max_payload_size`.
    pub fn with_max_payload(reader: R, max_payload_size: u32) -> Self {
        Self {
            reader: BufReader::new(reader),
            max_payload_size,
        }
    }

    /// Read the next frame.
    ///
    /// Returns `Ok(None)` when the stream ends cleanly between frames.
    ///
    /// # Errors
    ///
    /// `Protocol` for an invalid header or a stream that ends mid-frame,
    /// `Io` for any other read failure.
    pub async fn next_frame(&mut self) -> Result<Option<Frame>> {
        if self.reader.fill_buf().await?.is_empty() {
            return Ok(None);
        }

        let mut raw = [0u8; HEADER_SIZE];
        self.reader.read_exact(&mut raw).await.map_err(truncated)?;
        let header = Header::decode(&raw);
        header.validate(self.max_payload_size)?;

        let mut payload = vec![0u8; header.payload_length as usize];
        self.reader
            .read_exact(&mut payload)
            .await
            .map_err(truncated)?;

        Ok(Some(Frame::new(header, Bytes::from(payload))))
    }
}

fn truncated(e: std::io::Error) -> DispatchError {
    if e.kind() == ErrorKind::UnexpectedEof {
        DispatchError::Protocol("Stream ended inside a frame".to_string())
    } else {
        DispatchError::Io(e)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::protocol::frame_type;

    fn encode(frame_type: u8, call_id: u32, payload: &[u8]) -> Vec<u8> {
        let mut raw = Header::new(frame_type, call_id, payload.len() as u32)
            .encode()
            .to_vec();
        raw.extend_from_slice(payload);
        raw
    }

    #[tokio::test]
    async fn test_reads_consecutive_frames() {
        let mut raw = encode(frame_type::CALL_REQ, 1, b"first");
        raw.extend(encode(frame_type::CALL_RES, 2, b"second"));
        raw.extend(encode(frame_type::CALL_RES_END, 2, b""));

        let mut reader = FrameReader::new(raw.as_slice());

        let first = reader.next_frame().await.unwrap().unwrap();
        assert_eq!(first.call_id(), 1);
        assert_eq!(first.payload(), b"first");

        let second = reader.next_frame().await.unwrap().unwrap();
        assert_eq!(second.payload(), b"second");

        assert!(reader.next_frame().await.unwrap().unwrap().is_end());
        assert!(reader.next_frame().await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_frame_split_across_reads() {
        let raw = encode(frame_type::CALL_REQ, 42, b"a payload split in two");
        let (mut tx, rx) = tokio::io::duplex(64);

        let feeder = tokio::spawn(async move {
            use tokio::io::AsyncWriteExt;
            for chunk in raw.chunks(4) {
                tx.write_all(chunk).await.unwrap();
                tokio::task::yield_now().await;
            }
        });

        let mut reader = FrameReader::new(rx);
        let frame = reader.next_frame().await.unwrap().unwrap();
        feeder.await.unwrap();

        assert_eq!(frame.call_id(), 42);
        assert_eq!(frame.payload(), b"a payload split in two");
        assert!(reader.next_frame().await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_oversized_payload_rejected() {
        let raw = Header::new(frame_type::CALL_REQ, 42, 1000).encode();
        let mut reader = FrameReader::with_max_payload(&raw[..], 100);

        let err = reader.next_frame().await.unwrap_err();
        assert!(err.to_string().contains("exceeds maximum"));
    }

    #[tokio::test]
    async fn test_unknown_frame_type_rejected() {
        let raw = Header::new(0x10, 1, 0).encode();
        let mut reader = FrameReader::new(&raw[..]);
        assert!(matches!(
            reader.next_frame().await,
            Err(DispatchError::Protocol(_))
        ));
    }

    #[tokio::test]
    async fn test_stream_ending_mid_frame_is_protocol_error() {
        let raw = encode(frame_type::CALL_REQ, 1, b"truncated");
        let mut reader = FrameReader::new(&raw[..HEADER_SIZE + 3]);

        let err = reader.next_frame().await.unwrap_err();
        assert!(matches!(err, DispatchError::Protocol(ref m) if m.contains("inside a frame")));
    }
}
