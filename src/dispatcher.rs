//! Call dispatcher.
//!
//! [`Dispatcher::handle`] runs one call through its whole lifecycle:
//!
//! ```text
//! Received ─► Routed ───► Handled ─┐
//!         └─► Unrouted ────────────┴─► Finalized
//! ```
//!
//! Every path ends in `Finalized`: the connection's `finish` is invoked
//! exactly once per call, and no error or handler panic escapes `handle`.

use std::any::Any;
use std::sync::Arc;

use crate::connection::Connection;
use crate::error::DispatchError;
use crate::handler::{
    CallContext, Endpoint, EndpointOpts, EndpointRegistry, Handler, Request, Response, Route,
};
use crate::protocol::ErrorResponse;

/// How a dispatched call ended.
///
/// Informational only; by the time it is returned the caller has already
/// received its response and the connection has been finalized.
#[derive(Debug)]
pub enum DispatchOutcome {
    /// The handler ran to completion.
    Handled,
    /// No endpoint was registered under the method.
    MethodNotFound(String),
    /// The handler returned an error or panicked.
    HandlerFailed(DispatchError),
}

impl DispatchOutcome {
    pub fn is_handled(&self) -> bool {
        matches!(self, Self::Handled)
    }
}

/// Routes calls to handlers registered by method name.
///
/// Registration takes `&mut self`; dispatch takes `&self`, so once set up
/// a dispatcher is shared read-only (typically behind an `Arc`).
#[derive(Debug, Default)]
pub struct Dispatcher {
    registry: EndpointRegistry,
}

impl Dispatcher {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_registry(registry: EndpointRegistry) -> Self {
        Self { registry }
    }

    /// Register `handler` under `name`, replacing any existing endpoint.
    pub fn register(
        &mut self,
        name: impl Into<String>,
        handler: Arc<dyn Handler>,
        opts: EndpointOpts,
    ) {
        self.registry.register(name, handler, opts);
    }

    /// Start a registration that hands the handler back once registered.
    ///
    /// ```
    /// use std::sync::Arc;
    /// use rpc_dispatch::{handler_fn, Dispatcher, EndpointOpts};
    ///
    /// let mut dispatcher = Dispatcher::new();
    /// let ping = dispatcher
    ///     .route("ping", EndpointOpts::new())
    ///     .to(Arc::new(handler_fn(|_req, resp, _opts| async move {
    ///         resp.write("pong").await
    ///     })));
    ///
    /// // `ping` is still an ordinary handler that can be called directly.
    /// let _ = ping;
    /// assert!(dispatcher.lookup("ping").is_some());
    /// ```
    pub fn route(&mut self, name: impl Into<String>, opts: EndpointOpts) -> Route<'_> {
        self.registry.route(name, opts)
    }

    pub fn lookup(&self, name: &str) -> Option<&Endpoint> {
        self.registry.lookup(name)
    }

    pub fn registry(&self) -> &EndpointRegistry {
        &self.registry
    }

    /// Dispatch one call and finalize its connection.
    ///
    /// Must run inside a tokio runtime: the handler executes on its own
    /// task so that a panic can be turned into an error response.
    pub async fn handle(
        &self,
        context: CallContext,
        connection: Arc<dyn Connection>,
    ) -> DispatchOutcome {
        let request = Request::new(context, connection.clone());
        let response = Response::new(connection);
        let call_id = request.call_id();
        let method = request.method().to_string();

        let outcome = match self.registry.lookup(&method) {
            Some(endpoint) => invoke(endpoint, request, &response).await,
            None => {
                tracing::warn!(method = %method, call_id, "No endpoint registered for method");
                let err = DispatchError::MethodNotFound(method.clone());
                send_error(&response, ErrorResponse::from_error(&err)).await;
                DispatchOutcome::MethodNotFound(method.clone())
            }
        };

        match response.finish_if_open().await {
            Ok(true) => tracing::debug!(method = %method, call_id, "Response finalized"),
            Ok(false) => tracing::debug!(method = %method, call_id, "Handler finalized response"),
            Err(e) => tracing::warn!(method = %method, call_id, "Finalizing response failed: {}", e),
        }

        outcome
    }
}

async fn invoke(endpoint: &Endpoint, request: Request, response: &Response) -> DispatchOutcome {
    let method = request.method().to_string();
    let call_id = request.call_id();

    let handler = endpoint.handler.clone();
    let opts = endpoint.opts.clone();
    let response_in = response.clone();

    // `handle` itself runs on the task: a panic while building the future
    // is caught the same way as one while polling it.
    let task = tokio::spawn(async move { handler.handle(request, response_in, opts).await });

    let result = match task.await {
        Ok(result) => result,
        Err(e) if e.is_panic() => {
            let payload = e.into_panic();
            Err(DispatchError::Handler(format!(
                "handler panicked: {}",
                panic_message(&*payload)
            )))
        }
        Err(_) => Err(DispatchError::handler("handler task was cancelled")),
    };

    match result {
        Ok(()) => DispatchOutcome::Handled,
        Err(source) => {
            let err = DispatchError::HandlerFailure {
                method: method.clone(),
                source: Box::new(source),
            };

            if err.is_programming_error() {
                tracing::error!(method = %method, call_id, "Handler misuse: {}", err);
            } else {
                tracing::error!(method = %method, call_id, "Handler error: {}", err);
            }

            send_error(response, ErrorResponse::from_error(&err)).await;
            DispatchOutcome::HandlerFailed(err)
        }
    }
}

async fn send_error(response: &Response, error: ErrorResponse) {
    match response.error(error).await {
        Ok(()) => {}
        Err(DispatchError::StateViolation(_)) => {
            tracing::debug!("Response already finished, error not delivered");
        }
        Err(e) => tracing::warn!("Failed to send error response: {}", e),
    }
}

fn panic_message(payload: &(dyn Any + Send)) -> &str {
    if let Some(s) = payload.downcast_ref::<&'static str>() {
        s
    } else if let Some(s) = payload.downcast_ref::<String>() {
        s.as_str()
    } else {
        "<non-string panic payload>"
    }
}
