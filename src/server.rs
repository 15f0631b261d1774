//! Server builder and per-connection read loop.
//!
//! [`ServerBuilder`] collects endpoints and configuration; the built
//! [`Server`] serves framed streams:
//! 1. Spawn a writer task for the stream's write half
//! 2. Read frames and decode each `CALL_REQ`
//! 3. Dispatch every call on its own task, bounded by a semaphore
//! 4. On EOF, wait until every in-flight response has been flushed
//!
//! # Example
//!
//! ```no_run
//! use rpc_dispatch::Server;
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let server = Server::builder()
//!         .handle("ping", |_req, resp, _opts| async move {
//!             resp.write("pong").await
//!         })
//!         .max_concurrent_calls(64)
//!         .build();
//!
//!     server.listen("127.0.0.1:4040").await?;
//!     Ok(())
//! }
//! ```

use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

use bytes::Bytes;
use tokio::io::{AsyncRead, AsyncWrite};
use tokio::net::{TcpListener, ToSocketAddrs};
use tokio::sync::Semaphore;

use crate::connection::{Connection, FramedConnection};
use crate::dispatcher::{DispatchOutcome, Dispatcher};
use crate::error::{DispatchError, Result};
use crate::handler::{
    handler_fn, CallContext, EndpointOpts, Handler, HandlerResult, Request, Response,
};
use crate::protocol::{
    frame_type, CallMessage, ErrorResponse, Frame, FrameReader, DEFAULT_MAX_PAYLOAD_SIZE,
};
use crate::writer::{spawn_writer_task, OutboundFrame, WriterConfig, WriterHandle};

/// Default maximum concurrent calls per connection.
pub const DEFAULT_MAX_CONCURRENT_CALLS: usize = 256;

/// Server configuration.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ServerConfig {
    /// Calls dispatched concurrently on one connection before new calls
    /// are answered with `Busy`.
    pub max_concurrent_calls: usize,
    /// Largest accepted frame payload.
    pub max_payload_size: u32,
    /// Writer task settings.
    pub writer: WriterConfig,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            max_concurrent_calls: DEFAULT_MAX_CONCURRENT_CALLS,
            max_payload_size: DEFAULT_MAX_PAYLOAD_SIZE,
            writer: WriterConfig::default(),
        }
    }
}

/// Builder for configuring and creating a [`Server`].
#[derive(Default)]
pub struct ServerBuilder {
    dispatcher: Dispatcher,
    config: ServerConfig,
}

impl ServerBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a handler with options.
    pub fn register(
        mut self,
        method: &str,
        handler: Arc<dyn Handler>,
        opts: EndpointOpts,
    ) -> Self {
        self.dispatcher.register(method, handler, opts);
        self
    }

    /// Register an async closure with no options.
    pub fn handle<F, Fut>(self, method: &str, f: F) -> Self
    where
        F: Fn(Request, Response, Arc<EndpointOpts>) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = HandlerResult> + Send + 'static,
    {
        self.register(method, Arc::new(handler_fn(f)), EndpointOpts::new())
    }

    /// Mutable access to the dispatcher, e.g. for [`Dispatcher::route`].
    pub fn dispatcher_mut(&mut self) -> &mut Dispatcher {
        &mut self.dispatcher
    }

    /// Default: 256
    pub fn max_concurrent_calls(mut self, limit: usize) -> Self {
        self.config.max_concurrent_calls = limit;
        self
    }

    /// Default: 16 MB
    pub fn max_payload_size(mut self, limit: u32) -> Self {
        self.config.max_payload_size = limit;
        self
    }

    /// Default: 1024
    pub fn channel_capacity(mut self, capacity: usize) -> Self {
        self.config.writer.channel_capacity = capacity;
        self
    }

    /// Default: 5 seconds
    pub fn send_timeout(mut self, timeout: Duration) -> Self {
        self.config.writer.send_timeout = timeout;
        self
    }

    pub fn config(mut self, config: ServerConfig) -> Self {
        self.config = config;
        self
    }

    pub fn build(self) -> Server {
        Server {
            dispatcher: Arc::new(self.dispatcher),
            config: self.config,
        }
    }
}

/// Serves framed connections with a shared dispatcher.
#[derive(Clone)]
pub struct Server {
    dispatcher: Arc<Dispatcher>,
    config: ServerConfig,
}

impl Server {
    pub fn builder() -> ServerBuilder {
        ServerBuilder::new()
    }

    pub fn new(dispatcher: Dispatcher, config: ServerConfig) -> Self {
        Self {
            dispatcher: Arc::new(dispatcher),
            config,
        }
    }

    pub fn dispatcher(&self) -> &Arc<Dispatcher> {
        &self.dispatcher
    }

    pub fn config(&self) -> &ServerConfig {
        &self.config
    }

    /// Accept TCP connections forever, serving each on its own task.
    pub async fn listen<A: ToSocketAddrs>(&self, addr: A) -> Result<()> {
        let listener = TcpListener::bind(addr).await?;
        tracing::info!("Listening on {}", listener.local_addr()?);

        loop {
            let (stream, peer) = listener.accept().await?;
            let server = self.clone();

            tokio::spawn(async move {
                tracing::debug!("Accepted connection from {}", peer);
                if let Err(e) = server.serve(stream).await {
                    tracing::error!("Connection {} failed: {}", peer, e);
                }
            });
        }
    }

    /// Serve one stream until the peer closes its write side.
    ///
    /// Returns after every call read from the stream has been answered and
    /// written out.
    pub async fn serve<S>(&self, stream: S) -> Result<()>
    where
        S: AsyncRead + AsyncWrite + Send + 'static,
    {
        let (reader, write_half) = tokio::io::split(stream);
        let (writer, writer_task) = spawn_writer_task(write_half, self.config.writer.clone());
        let semaphore = Arc::new(Semaphore::new(self.config.max_concurrent_calls));

        let read_result = self.read_loop(reader, &writer, &semaphore).await;

        // In-flight calls hold their own handle clones; the writer task ends
        // once the last of them is dropped.
        drop(writer);
        let write_result = writer_task
            .await
            .map_err(|e| DispatchError::Io(std::io::Error::other(e)))?;

        read_result.and(write_result)
    }

    async fn read_loop<R: AsyncRead + Unpin>(
        &self,
        reader: R,
        writer: &WriterHandle,
        semaphore: &Arc<Semaphore>,
    ) -> Result<()> {
        let mut frames = FrameReader::with_max_payload(reader, self.config.max_payload_size);

        while let Some(frame) = frames.next_frame().await? {
            self.accept_frame(frame, writer, semaphore).await;
        }
        Ok(())
    }

    async fn accept_frame(&self, frame: Frame, writer: &WriterHandle, semaphore: &Arc<Semaphore>) {
        let call_id = frame.call_id();

        if !frame.is_call() {
            tracing::warn!(
                "Ignoring unexpected frame type 0x{:02X} for call {}",
                frame.frame_type(),
                call_id
            );
            return;
        }

        let message = match CallMessage::decode(&frame.payload) {
            Ok(message) => message,
            Err(e) => {
                tracing::warn!("Rejecting malformed call {}: {}", call_id, e);
                reject(writer, call_id, ErrorResponse::from_error(&e)).await;
                return;
            }
        };

        let permit = match semaphore.clone().try_acquire_owned() {
            Ok(p) => p,
            Err(_) => {
                tracing::warn!("Call capacity reached, rejecting call {}", call_id);
                reject(writer, call_id, ErrorResponse::from_error(&DispatchError::Busy)).await;
                return;
            }
        };

        let dispatcher = self.dispatcher.clone();
        let connection: Arc<dyn Connection> =
            Arc::new(FramedConnection::new(call_id, writer.clone()));

        tokio::spawn(async move {
            let _permit = permit;

            let context = CallContext::from_message(call_id, message);
            if let DispatchOutcome::HandlerFailed(e) = dispatcher.handle(context, connection).await {
                tracing::debug!("Call {} completed with handler failure: {}", call_id, e);
            }
        });
    }
}

/// Answer a call that never reached the dispatcher: error, then end.
async fn reject(writer: &WriterHandle, call_id: u32, error: ErrorResponse) {
    if let Err(e) = send_rejection(writer, call_id, &error).await {
        tracing::warn!("Failed to reject call {}: {}", call_id, e);
    }
}

async fn send_rejection(writer: &WriterHandle, call_id: u32, error: &ErrorResponse) -> Result<()> {
    let body = Bytes::from(error.encode()?);
    writer
        .send(OutboundFrame::new(frame_type::ERROR, call_id, body)?)
        .await?;
    writer
        .send(OutboundFrame::empty(frame_type::CALL_RES_END, call_id))
        .await
}
