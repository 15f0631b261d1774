//! Response writer bound to one call's connection.
//!
//! A response is `Open` until `finish` succeeds in flipping it to
//! `Finished`; from then on every write, error or finish is rejected with
//! [`DispatchError::StateViolation`] and never reaches the connection.

use std::sync::Arc;

use bytes::Bytes;
use tokio::sync::Mutex;

use crate::connection::Connection;
use crate::error::{DispatchError, Result};
use crate::protocol::ErrorResponse;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum State {
    Open,
    Finished,
}

/// Handle for writing a call's response.
///
/// Clones share state, so a handler may pass a clone to helper tasks; the
/// state lock is held across each connection call, which keeps writes and
/// finish ordered.
#[derive(Clone)]
pub struct Response {
    connection: Arc<dyn Connection>,
    state: Arc<Mutex<State>>,
}

impl Response {
    pub fn new(connection: Arc<dyn Connection>) -> Self {
        Self {
            connection,
            state: Arc::new(Mutex::new(State::Open)),
        }
    }

    /// Forward `payload` unchanged to the connection.
    pub async fn write(&self, payload: impl Into<Bytes>) -> Result<()> {
        let state = self.state.lock().await;
        if *state == State::Finished {
            return Err(DispatchError::StateViolation("write after finish"));
        }
        self.connection.write(payload.into()).await
    }

    /// Send an error indication through the connection's error path.
    pub async fn error(&self, error: ErrorResponse) -> Result<()> {
        let state = self.state.lock().await;
        if *state == State::Finished {
            return Err(DispatchError::StateViolation("error after finish"));
        }
        self.connection.write_error(error).await
    }

    /// Finalize the response.
    ///
    /// The state flips to `Finished` before the connection is told, so a
    /// failing connection finish is never retried.
    pub async fn finish(&self) -> Result<()> {
        let mut state = self.state.lock().await;
        if *state == State::Finished {
            return Err(DispatchError::StateViolation("finish called twice"));
        }
        *state = State::Finished;
        self.connection.finish().await
    }

    /// Finalize unless a handler already did. Returns whether this call
    /// performed the finish.
    pub(crate) async fn finish_if_open(&self) -> Result<bool> {
        let mut state = self.state.lock().await;
        if *state == State::Finished {
            return Ok(false);
        }
        *state = State::Finished;
        self.connection.finish().await.map(|()| true)
    }

    pub async fn is_finished(&self) -> bool {
        *self.state.lock().await == State::Finished
    }
}

impl std::fmt::Debug for Response {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Response").finish_non_exhaustive()
    }
}
