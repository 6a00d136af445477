mod error;
mod handlers;
mod types;

pub use error::ApiError;
pub use types::*;

use crate::domain::{SubscriptionRegistry, TelemetryQueries};
use crate::realtime::{ws_handler, ObserverHub};
use anyhow::Result;
use axum::routing::get;
use axum::Router;
use std::net::SocketAddr;
use std::sync::Arc;
use tokio_util::sync::CancellationToken;
use tracing::info;

#[derive(Clone)]
pub struct AppState {
    pub queries: Arc<dyn TelemetryQueries>,
    pub registry: Arc<SubscriptionRegistry>,
    pub hub: Arc<ObserverHub>,
}

pub fn router(state: AppState) -> Router {
    Router::new()
        .route("/dados", get(handlers::histogram))
        .route("/dados/daily", get(handlers::daily_total))
        .route("/dados/byBagType", get(handlers::totals_by_category))
        .route("/dados/average", get(handlers::hourly_average))
        .route("/dados/productionTime", get(handlers::production_time))
        .route("/ws", get(ws_handler))
        .with_state(state)
}

/// Serve the query API and WebSocket channel until cancellation.
pub async fn serve(addr: SocketAddr, router: Router, token: CancellationToken) -> Result<()> {
    let listener = tokio::net::TcpListener::bind(addr).await?;
    info!(%addr, "http server listening");

    axum::serve(listener, router)
        .with_graceful_shutdown(async move { token.cancelled().await })
        .await?;

    info!("http server stopped");
    Ok(())
}
