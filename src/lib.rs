//! # rpc-dispatch
//!
//! Server-side dispatch core for an RPC layer: incoming calls are routed by
//! exact method name to registered handlers, wrapped into request/response
//! views, and their connections are finalized exactly once on every path.
//!
//! ## Architecture
//!
//! - **Core**: [`Handler`], [`EndpointRegistry`], [`Request`], [`Response`]
//!   and [`Dispatcher`]; I/O happens only through the [`Connection`] trait
//! - **Host**: [`Server`] reads framed calls from a stream and answers them
//!   through [`FramedConnection`]s sharing one writer task
//!
//! ## Example
//!
//! ```no_run
//! use rpc_dispatch::Server;
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let server = Server::builder()
//!         .handle("echo", |req, resp, _opts| async move {
//!             resp.write(req.body().clone()).await
//!         })
//!         .build();
//!
//!     server.listen("127.0.0.1:4040").await?;
//!     Ok(())
//! }
//! ```

pub mod codec;
pub mod connection;
pub mod dispatcher;
pub mod error;
pub mod handler;
pub mod protocol;
pub mod writer;

mod server;

pub use connection::{Connection, FramedConnection};
pub use dispatcher::{DispatchOutcome, Dispatcher};
pub use error::DispatchError;
pub use handler::{
    handler_fn, CallContext, Endpoint, EndpointOpts, EndpointRegistry, Handler, Request, Response,
};
pub use server::{Server, ServerBuilder, ServerConfig, DEFAULT_MAX_CONCURRENT_CALLS};
