//! Echo server.
//!
//! Serves the echo, error and log routes on `127.0.0.1:3000` (or the
//! address in `PORTICO_DEMO_ADDR`), scoping each request with a fresh
//! invocation id.
//!
//! ```text
//! cargo run -p portico --example echo
//! curl -i localhost:3000/geese?name=gerald
//! curl -i localhost:3000/error/418
//! ```

use hyper::body::Incoming;
use hyper::server::conn::http1;
use hyper::service::service_fn;
use hyper_util::rt::TokioIo;
use portico::prelude::*;
use portico::telemetry::TracingSink;
use std::convert::Infallible;
use std::net::SocketAddr;
use std::sync::Arc;
use tokio::net::TcpListener;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let settings = ConfigLoader::new()
        .with_optional_dotenv(".env")?
        .with_env()
        .load()?;
    let project = Project::new(settings)
        .with_logger(Logger::new(TracingSink::with_config(LogConfig::development())));
    project.logger().init();

    let routes: Arc<EchoRoutes<Next>> = Arc::new(EchoRoutes::new(&project));

    let addr: SocketAddr = std::env::var("PORTICO_DEMO_ADDR")
        .unwrap_or_else(|_| "127.0.0.1:3000".to_string())
        .parse()?;
    let listener = TcpListener::bind(addr).await?;
    tracing::info!("Listening on http://{}", addr);

    loop {
        let (stream, remote_addr) = listener.accept().await?;
        let routes = Arc::clone(&routes);

        tokio::spawn(async move {
            let service = service_fn(move |request: http::Request<Incoming>| {
                let chain = Chain::new().with(routes.route(request.uri().path()).clone());
                invocation::scope(invocation::generate(), async move {
                    Ok::<_, Infallible>(chain.handle(request).await)
                })
            });

            if let Err(e) = http1::Builder::new()
                .serve_connection(TokioIo::new(stream), service)
                .await
            {
                tracing::error!("Connection error from {}: {}", remote_addr, e);
            }
        });
    }
}
