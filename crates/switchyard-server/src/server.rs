//! HTTP server implementation using Axum.

use crate::handlers::{handle_action, handle_health};
use axum::{routing::get, Router};
use std::future::Future;
use std::net::SocketAddr;
use std::sync::Arc;
use switchyard::Dispatcher;
use tokio::task::JoinHandle;
use tower::limit::ConcurrencyLimitLayer;
use tower_http::trace::TraceLayer;
use tracing::{error, info};

/// Application state shared across HTTP endpoints.
pub struct AppState {
    /// Dispatcher bound to the process-wide handler registry
    pub dispatcher: Dispatcher,
}

/// Build the router serving `/health` and `/action`.
pub fn build_router(dispatcher: Dispatcher, max_concurrency: usize) -> Router {
    let state = Arc::new(AppState { dispatcher });

    Router::new()
        .route("/health", get(handle_health))
        .route("/action", get(handle_action).post(handle_action))
        .layer(ConcurrencyLimitLayer::new(max_concurrency.max(1)))
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

/// Start the HTTP server.
///
/// Returns the actual address the server is bound to (useful when port=0)
/// and the server task. Once `shutdown` resolves the server stops accepting
/// connections. The task finishes only after every in-flight request has
/// been answered; await it before releasing handlers.
pub async fn start_server<F>(
    dispatcher: Dispatcher,
    host: &str,
    port: u16,
    max_concurrency: usize,
    shutdown: F,
) -> anyhow::Result<(SocketAddr, JoinHandle<()>)>
where
    F: Future<Output = ()> + Send + 'static,
{
    let app = build_router(dispatcher, max_concurrency);

    // Parse the address
    let addr: SocketAddr = format!("{}:{}", host, port).parse()?;

    // Bind to the address
    let listener = tokio::net::TcpListener::bind(addr).await?;
    let actual_addr = listener.local_addr()?;

    info!("Server listening on {}", actual_addr);

    // Spawn the server in the background
    let task = tokio::spawn(async move {
        let service = app.into_make_service_with_connect_info::<SocketAddr>();
        if let Err(e) = axum::serve(listener, service)
            .with_graceful_shutdown(shutdown)
            .await
        {
            error!("Server error: {}", e);
        }
        info!("Server stopped");
    });

    Ok((actual_addr, task))
}
