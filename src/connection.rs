//! The connection contract consumed by the dispatcher.
//!
//! The dispatcher never does I/O itself: responses reach the caller through
//! a [`Connection`]. [`FramedConnection`] is the implementation used by the
//! bundled server, mapping each operation onto one frame for a call id.

use bytes::Bytes;

use crate::error::Result;
use crate::handler::BoxFuture;
use crate::protocol::{frame_type, ErrorResponse};
use crate::writer::{OutboundFrame, WriterHandle};

/// Output side of one call.
///
/// `finish` means no more writes will follow; implementations release or
/// flush as appropriate.
pub trait Connection: Send + Sync + 'static {
    /// Deliver one chunk of response output.
    fn write(&self, payload: Bytes) -> BoxFuture<'_, Result<()>>;

    /// Deliver an error indication for the call.
    fn write_error(&self, error: ErrorResponse) -> BoxFuture<'_, Result<()>>;

    /// Finalize the call.
    fn finish(&self) -> BoxFuture<'_, Result<()>>;
}

/// Connection for a single call multiplexed over a framed transport.
///
/// | operation     | frame          |
/// |---------------|----------------|
/// | `write`       | `CALL_RES`     |
/// | `write_error` | `ERROR`        |
/// | `finish`      | `CALL_RES_END` |
#[derive(Clone)]
pub struct FramedConnection {
    call_id: u32,
    writer: WriterHandle,
}

impl FramedConnection {
    pub fn new(call_id: u32, writer: WriterHandle) -> Self {
        Self { call_id, writer }
    }

    #[inline]
    pub fn call_id(&self) -> u32 {
        self.call_id
    }
}

impl Connection for FramedConnection {
    fn write(&self, payload: Bytes) -> BoxFuture<'_, Result<()>> {
        Box::pin(async move {
            let frame = OutboundFrame::new(frame_type::CALL_RES, self.call_id, payload)?;
            self.writer.send(frame).await
        })
    }

    fn write_error(&self, error: ErrorResponse) -> BoxFuture<'_, Result<()>> {
        Box::pin(async move {
            let body = Bytes::from(error.encode()?);
            let frame = OutboundFrame::new(frame_type::ERROR, self.call_id, body)?;
            self.writer.send(frame).await
        })
    }

    fn finish(&self) -> BoxFuture<'_, Result<()>> {
        Box::pin(async move {
            self.writer
                .send(OutboundFrame::empty(frame_type::CALL_RES_END, self.call_id))
                .await
        })
    }
}

#[cfg(test)]
pub(crate) mod testing {
    //! In-memory connection that records what it was asked to do.

    use std::sync::{Arc, Mutex};

    use super::*;
    use crate::error::DispatchError;

    #[derive(Debug, Clone, PartialEq)]
    pub(crate) enum Event {
        Write(Bytes),
        Error(ErrorResponse),
        Finish,
    }

    #[derive(Default)]
    pub(crate) struct RecordingConnection {
        events: Mutex<Vec<Event>>,
        fail_finish: bool,
    }

    impl RecordingConnection {
        pub(crate) fn new() -> Arc<Self> {
            Arc::new(Self::default())
        }

        pub(crate) fn failing_finish() -> Arc<Self> {
            Arc::new(Self {
                fail_finish: true,
                ..Self::default()
            })
        }

        pub(crate) fn events(&self) -> Vec<Event> {
            self.events.lock().unwrap().clone()
        }

        pub(crate) fn writes(&self) -> Vec<Bytes> {
            self.events()
                .into_iter()
                .filter_map(|e| match e {
                    Event::Write(b) => Some(b),
                    _ => None,
                })
                .collect()
        }

        pub(crate) fn errors(&self) -> Vec<ErrorResponse> {
            self.events()
                .into_iter()
                .filter_map(|e| match e {
                    Event::Error(err) => Some(err),
                    _ => None,
                })
                .collect()
        }

        pub(crate) fn finish_count(&self) -> usize {
            self.events()
                .iter()
                .filter(|e| **e == Event::Finish)
                .count()
        }

        fn record(&self, event: Event) {
            self.events.lock().unwrap().push(event);
        }
    }

    impl Connection for RecordingConnection {
        fn write(&self, payload: Bytes) -> BoxFuture<'_, Result<()>> {
            self.record(Event::Write(payload));
            Box::pin(async { Ok(()) })
        }

        fn write_error(&self, error: ErrorResponse) -> BoxFuture<'_, Result<()>> {
            self.record(Event::Error(error));
            Box::pin(async { Ok(()) })
        }

        fn finish(&self) -> BoxFuture<'_, Result<()>> {
            self.record(Event::Finish);
            let fail = self.fail_finish;
            Box::pin(async move {
                if fail {
                    Err(DispatchError::ConnectionClosed)
                } else {
                    Ok(())
                }
            })
        }
    }
}
