//! Dedicated writer task for one transport connection.
//!
//! Every in-flight call holds a [`WriterHandle`] clone and queues response
//! frames on one bounded channel; a single task owns the write half.
//!
//! ```text
//! Call 1 ─┐
//! Call 2 ─┼─► mpsc::Sender<OutboundFrame> ─► Writer Task ─► Socket
//! Call N ─┘
//! ```
//!
//! A full channel is the backpressure: `send` waits for room, up to the
//! configured timeout. The task exits once every handle has been dropped
//! and the queue is drained, so awaiting its `JoinHandle` flushes all
//! outstanding responses.

use std::time::Duration;

use bytes::Bytes;
use tokio::io::{AsyncWrite, AsyncWriteExt, BufWriter};
use tokio::sync::mpsc;
use tokio::task::JoinHandle;

use crate::error::{DispatchError, Result};
use crate::protocol::Header;

/// Default number of frames queued before senders wait.
pub const DEFAULT_CHANNEL_CAPACITY: usize = 1024;

/// Default time a sender waits for room in a full queue.
pub const DEFAULT_SEND_TIMEOUT: Duration = Duration::from_secs(5);

/// A frame queued for the writer task.
#[derive(Debug)]
pub struct OutboundFrame {
    header: Header,
    payload: Bytes,
}

impl OutboundFrame {
    /// Frame carrying `payload`; fails if it is too long for one frame.
    pub fn new(frame_type: u8, call_id: u32, payload: Bytes) -> Result<Self> {
        let header = Header::for_payload(frame_type, call_id, payload.len())?;
        Ok(Self { header, payload })
    }

    /// Frame with an empty payload.
    pub fn empty(frame_type: u8, call_id: u32) -> Self {
        Self {
            header: Header::new(frame_type, call_id, 0),
            payload: Bytes::new(),
        }
    }
}

/// Configuration for the writer task.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WriterConfig {
    /// Frames queued before `send` waits.
    pub channel_capacity: usize,
    /// How long `send` waits on a full queue before `BackpressureTimeout`.
    pub send_timeout: Duration,
}

impl Default for WriterConfig {
    fn default() -> Self {
        Self {
            channel_capacity: DEFAULT_CHANNEL_CAPACITY,
            send_timeout: DEFAULT_SEND_TIMEOUT,
        }
    }
}

/// Sending side of the writer task. Cheap to clone.
#[derive(Clone)]
pub struct WriterHandle {
    tx: mpsc::Sender<OutboundFrame>,
    send_timeout: Duration,
}

impl WriterHandle {
    /// Queue a frame for writing.
    pub async fn send(&self, frame: OutboundFrame) -> Result<()> {
        match tokio::time::timeout(self.send_timeout, self.tx.send(frame)).await {
            Ok(Ok(())) => Ok(()),
            Ok(Err(_)) => Err(DispatchError::ConnectionClosed),
            Err(_) => Err(DispatchError::BackpressureTimeout),
        }
    }
}

/// Spawn the writer task for `writer`.
///
/// The `JoinHandle` resolves once all handles are dropped and every queued
/// frame has been written, or on the first I/O error.
pub fn spawn_writer_task<W>(
    writer: W,
    config: WriterConfig,
) -> (WriterHandle, JoinHandle<Result<()>>)
where
    W: AsyncWrite + Unpin + Send + 'static,
{
    let (tx, rx) = mpsc::channel(config.channel_capacity);
    let handle = WriterHandle {
        tx,
        send_timeout: config.send_timeout,
    };

    (handle, tokio::spawn(writer_loop(rx, writer)))
}

async fn writer_loop<W>(mut rx: mpsc::Receiver<OutboundFrame>, writer: W) -> Result<()>
where
    W: AsyncWrite + Unpin,
{
    let mut out = BufWriter::new(writer);

    while let Some(frame) = rx.recv().await {
        write_frame(&mut out, &frame).await?;
        // Flush only once the queue has run dry.
        while let Ok(frame) = rx.try_recv() {
            write_frame(&mut out, &frame).await?;
        }
        out.flush().await?;
    }

    out.shutdown().await?;
    Ok(())
}

async fn write_frame<W: AsyncWrite + Unpin>(out: &mut W, frame: &OutboundFrame) -> Result<()> {
    out.write_all(&frame.header.encode()).await?;
    out.write_all(&frame.payload).await?;
    Ok(())
}
