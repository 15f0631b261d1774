//! Endpoint registry for dispatching calls by method name.
//!
//! Lookup is exact string match. Registering a name that is already present
//! replaces the previous endpoint without error.
//!
//! # Example
//!
//! ```
//! use std::sync::Arc;
//! use rpc_dispatch::handler::{handler_fn, EndpointOpts, EndpointRegistry};
//!
//! let mut registry = EndpointRegistry::new();
//!
//! // Register at the point of definition and keep using the handler.
//! let echo = registry
//!     .route("echo", EndpointOpts::new())
//!     .to(Arc::new(handler_fn(|req, resp, _opts| async move {
//!         resp.write(req.body().clone()).await
//!     })));
//!
//! assert!(Arc::ptr_eq(
//!     &(echo as Arc<dyn rpc_dispatch::Handler>),
//!     &registry.lookup("echo").unwrap().handler,
//! ));
//! ```

use std::collections::HashMap;
use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;

use super::{EndpointOpts, Request, Response};
use crate::error::{DispatchError, Result};

/// Result type for handler functions.
pub type HandlerResult = Result<()>;

/// Boxed future for handler results.
pub type BoxFuture<'a, T> = Pin<Box<dyn Future<Output = T> + Send + 'a>>;

/// The capability a request-processing unit implements.
///
/// The returned future must only resolve once the handler's work is
/// complete; the dispatcher finalizes the response after it resolves.
pub trait Handler: Send + Sync + 'static {
    /// Serve one call, writing output through `response`.
    fn handle(
        &self,
        request: Request,
        response: Response,
        opts: Arc<EndpointOpts>,
    ) -> BoxFuture<'static, HandlerResult>;
}

/// Adapter that turns an async closure into a [`Handler`].
pub struct FnHandler<F> {
    f: F,
}

impl<F, Fut> Handler for FnHandler<F>
where
    F: Fn(Request, Response, Arc<EndpointOpts>) -> Fut + Send + Sync + 'static,
    Fut: Future<Output = HandlerResult> + Send + 'static,
{
    fn handle(
        &self,
        request: Request,
        response: Response,
        opts: Arc<EndpointOpts>,
    ) -> BoxFuture<'static, HandlerResult> {
        Box::pin((self.f)(request, response, opts))
    }
}

/// Wrap an async closure as a [`Handler`].
pub fn handler_fn<F, Fut>(f: F) -> FnHandler<F>
where
    F: Fn(Request, Response, Arc<EndpointOpts>) -> Fut + Send + Sync + 'static,
    Fut: Future<Output = HandlerResult> + Send + 'static,
{
    FnHandler { f }
}

/// Placeholder for a method that is declared but has no implementation.
///
/// Every invocation fails with [`DispatchError::NotImplemented`].
#[derive(Debug, Clone, Copy, Default)]
pub struct Unimplemented;

impl Handler for Unimplemented {
    fn handle(
        &self,
        request: Request,
        _response: Response,
        _opts: Arc<EndpointOpts>,
    ) -> BoxFuture<'static, HandlerResult> {
        let method = request.method().to_string();
        Box::pin(async move { Err(DispatchError::NotImplemented(method)) })
    }
}

/// A handler together with the options it was registered with.
#[derive(Clone)]
pub struct Endpoint {
    pub handler: Arc<dyn Handler>,
    pub opts: Arc<EndpointOpts>,
}

impl std::fmt::Debug for Endpoint {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Endpoint")
            .field("opts", &self.opts)
            .finish_non_exhaustive()
    }
}

/// Registry mapping method names to endpoints.
#[derive(Default, Debug)]
pub struct EndpointRegistry {
    endpoints: HashMap<String, Endpoint>,
}

impl EndpointRegistry {
    /// Create a new empty registry.
    pub fn new() -> Self {
        Self::default()
    }

    /// Register `handler` under `name`, replacing any existing endpoint.
    pub fn register(&mut self, name: impl Into<String>, handler: Arc<dyn Handler>, opts: EndpointOpts) {
        let name = name.into();
        let endpoint = Endpoint {
            handler,
            opts: Arc::new(opts),
        };

        if self.endpoints.insert(name.clone(), endpoint).is_some() {
            tracing::debug!(method = %name, "Replaced existing endpoint");
        } else {
            tracing::debug!(method = %name, "Registered endpoint");
        }
    }

    /// Start a registration that completes with [`Route::to`].
    pub fn route(&mut self, name: impl Into<String>, opts: EndpointOpts) -> Route<'_> {
        Route {
            registry: self,
            name: name.into(),
            opts,
        }
    }

    /// Endpoint registered under exactly `name`.
    pub fn lookup(&self, name: &str) -> Option<&Endpoint> {
        self.endpoints.get(name)
    }

    pub fn contains(&self, name: &str) -> bool {
        self.endpoints.contains_key(name)
    }

    pub fn len(&self) -> usize {
        self.endpoints.len()
    }

    pub fn is_empty(&self) -> bool {
        self.endpoints.is_empty()
    }

    /// Registered method names, in no particular order.
    pub fn methods(&self) -> impl Iterator<Item = &str> {
        self.endpoints.keys().map(String::as_str)
    }
}

/// Pending registration returned by [`EndpointRegistry::route`].
#[must_use = "a route registers nothing until `to` is called"]
pub struct Route<'r> {
    registry: &'r mut EndpointRegistry,
    name: String,
    opts: EndpointOpts,
}

impl Route<'_> {
    /// Register `handler` and hand the same `Arc` back to the caller.
    pub fn to<H: Handler>(self, handler: Arc<H>) -> Arc<H> {
        self.registry.register(self.name, handler.clone(), self.opts);
        handler
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::connection::testing::RecordingConnection;
    use crate::handler::CallContext;

    fn noop() -> Arc<dyn Handler> {
        Arc::new(handler_fn(|_req, _resp, _opts| async { Ok(()) }))
    }

    #[test]
    fn test_register_and_lookup() {
        let mut registry = EndpointRegistry::new();
        registry.register("echo", noop(), EndpointOpts::new().with("k", 1));

        let endpoint = registry.lookup("echo").unwrap();
        assert_eq!(endpoint.opts.get_as::<i32>("k").unwrap(), Some(1));
        assert_eq!(registry.len(), 1);
        assert!(registry.contains("echo"));
    }

    #[test]
    fn test_lookup_is_exact() {
        let mut registry = EndpointRegistry::new();
        registry.register("echo", noop(), EndpointOpts::new());

        assert!(registry.lookup("ech").is_none());
        assert!(registry.lookup("echo2").is_none());
        assert!(registry.lookup("Echo").is_none());
        assert!(registry.lookup("").is_none());
    }

    #[test]
    fn test_reregister_last_write_wins() {
        let mut registry = EndpointRegistry::new();
        let first = noop();
        let second = noop();

        registry.register("echo", first.clone(), EndpointOpts::new().with("v", 1));
        registry.register("echo", second.clone(), EndpointOpts::new().with("v", 2));

        let endpoint = registry.lookup("echo").unwrap();
        assert!(Arc::ptr_eq(&endpoint.handler, &second));
        assert!(!Arc::ptr_eq(&endpoint.handler, &first));
        assert_eq!(endpoint.opts.get_as::<i32>("v").unwrap(), Some(2));
        assert_eq!(registry.len(), 1);
    }

    #[test]
    fn test_route_returns_same_handler() {
        let mut registry = EndpointRegistry::new();
        let handler = Arc::new(Unimplemented);

        let returned = registry.route("later", EndpointOpts::new()).to(handler.clone());

        assert!(Arc::ptr_eq(&returned, &handler));
        assert!(registry.contains("later"));
        let mut methods: Vec<_> = registry.methods().collect();
        methods.sort();
        assert_eq!(methods, vec!["later"]);
    }

    #[tokio::test]
    async fn test_unimplemented_fails_with_not_implemented() {
        let conn = RecordingConnection::new();
        let request = Request::new(CallContext::new(1, "todo", "", ""), conn.clone());
        let response = Response::new(conn);

        let result = Unimplemented
            .handle(request, response, Arc::new(EndpointOpts::new()))
            .await;

        assert!(matches!(result, Err(DispatchError::NotImplemented(m)) if m == "todo"));
    }
}
