//! Handler module - the extensibility contract of the dispatcher.
//!
//! Provides:
//! - [`Handler`] - the capability a request-processing unit implements
//! - [`EndpointRegistry`] - maps method names to handlers and their options
//! - [`Request`] / [`Response`] - per-call views handed to a handler
//!
//! # Example
//!
//! ```
//! use std::sync::Arc;
//! use rpc_dispatch::handler::{handler_fn, EndpointOpts, EndpointRegistry};
//!
//! let mut registry = EndpointRegistry::new();
//!
//! registry.register(
//!     "ping",
//!     Arc::new(handler_fn(|_req, resp, _opts| async move {
//!         resp.write("pong").await
//!     })),
//!     EndpointOpts::new(),
//! );
//!
//! assert!(registry.lookup("ping").is_some());
//! assert!(registry.lookup("PING").is_none());
//! ```

mod opts;
mod registry;
mod request;
mod response;

pub use opts::EndpointOpts;
pub use registry::{
    handler_fn, BoxFuture, Endpoint, EndpointRegistry, FnHandler, Handler, HandlerResult, Route,
    Unimplemented,
};
pub use request::{CallContext, Request};
pub use response::Response;
