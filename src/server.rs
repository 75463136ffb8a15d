//! HTTP trigger surface: GET / runs one cycle and returns its report.

use crate::inventory::InventoryApi;
use crate::watcher::Watcher;
use axum::extract::State;
use axum::http::StatusCode;
use axum::routing::get;
use axum::Router;
use std::sync::Arc;
use tracing::{error, info};

/// Binds the listener and serves trigger requests until shutdown.
pub async fn serve<A: InventoryApi + 'static>(
    watcher: Arc<Watcher<A>>,
    bind: &str,
) -> anyhow::Result<()> {
    let app = router(watcher);
    let listener = tokio::net::TcpListener::bind(bind).await?;
    info!("Listening on {}", listener.local_addr()?);
    axum::serve(listener, app).await?;
    Ok(())
}

fn router<A: InventoryApi + 'static>(watcher: Arc<Watcher<A>>) -> Router {
    Router::new().route("/", get(trigger::<A>)).with_state(watcher)
}

/// Runs one full cycle per request. Requests serialize naturally against
/// the upstream rate limits because each one polls live.
async fn trigger<A: InventoryApi + 'static>(
    State(watcher): State<Arc<Watcher<A>>>,
) -> (StatusCode, String) {
    match watcher.run_once().await {
        Ok(banner) => (StatusCode::OK, banner),
        Err(e) => {
            error!("Triggered run failed: {}", e);
            (StatusCode::INTERNAL_SERVER_ERROR, format!("Run failed: {e}"))
        }
    }
}
