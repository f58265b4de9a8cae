use crate::config::RelayConfig;
use crate::relay::SignalingRelay;
use crate::signaling::ws_handler;
use anyhow::{Context, Result};
use axum::Router;
use axum::routing::get;
use std::future::Future;
use tokio::net::TcpListener;
use tower_http::cors::{Any, CorsLayer};
use tracing::info;

/// Routes for the relay. Browsers connect to the bare host, so the upgrade
/// is served on `/` as well as `/ws`.
pub fn router(relay: SignalingRelay) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    Router::new()
        .route("/", get(ws_handler))
        .route("/ws", get(ws_handler))
        .layer(cors)
        .with_state(relay)
}

/// Bind `config.listen_addr` and serve until `shutdown` resolves.
pub async fn serve<F>(config: RelayConfig, shutdown: F) -> Result<()>
where
    F: Future<Output = ()> + Send + 'static,
{
    let listener = TcpListener::bind(config.listen_addr)
        .await
        .with_context(|| format!("Failed to bind {}", config.listen_addr))?;

    serve_listener(listener, SignalingRelay::new(config), shutdown).await
}

pub async fn serve_listener<F>(listener: TcpListener, relay: SignalingRelay, shutdown: F) -> Result<()>
where
    F: Future<Output = ()> + Send + 'static,
{
    let addr = listener.local_addr().context("Listener has no local address")?;
    info!("Signaling relay listening on ws://{}", addr);

    axum::serve(listener, router(relay))
        .with_graceful_shutdown(shutdown)
        .await
        .context("Relay server failed")?;

    info!("Signaling relay stopped");
    Ok(())
}
