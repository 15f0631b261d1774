//! Ping server - minimal host for the dispatcher.
//!
//! Serves three methods over TCP:
//! - `ping` answers `pong`
//! - `echo` answers with the call body
//! - `reverse` is declared but not built yet and fails with "not implemented"
//!
//! ```text
//! RUST_LOG=debug cargo run --example ping -- 127.0.0.1:4040
//! ```

use std::sync::Arc;

use rpc_dispatch::handler::{HandlerResult, Unimplemented};
use rpc_dispatch::{EndpointOpts, Request, Response, Server};
use tracing_subscriber::EnvFilter;

async fn echo(req: Request, resp: Response, opts: Arc<EndpointOpts>) -> HandlerResult {
    if let Some(prefix) = opts.get_as::<String>("prefix")? {
        resp.write(prefix).await?;
    }
    resp.write(req.body().clone()).await
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    let addr = std::env::args()
        .nth(1)
        .unwrap_or_else(|| "127.0.0.1:4040".to_string());

    let mut builder = Server::builder()
        .handle("ping", |_req, resp, _opts| async move { resp.write("pong").await })
        .register(
            "echo",
            Arc::new(rpc_dispatch::handler_fn(echo)),
            EndpointOpts::new().with("prefix", "echo: "),
        );
    builder
        .dispatcher_mut()
        .route("reverse", EndpointOpts::new())
        .to(Arc::new(Unimplemented));

    builder.build().listen(addr.as_str()).await?;
    Ok(())
}
