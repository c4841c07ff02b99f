pub mod error;
pub mod routes;

use std::future::Future;
use std::sync::Arc;

use axum::Router;
use tokio::net::TcpListener;
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;

use crate::persist::CoinStore;

/// Shared state handed to every handler. Reads only.
#[derive(Clone)]
pub struct AppState {
    pub store: Arc<dyn CoinStore>,
}

pub fn router(store: Arc<dyn CoinStore>) -> Router {
    routes::routes()
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive())
        .with_state(AppState { store })
}

/// Serve the read API on `listener` until `shutdown` resolves.
pub async fn serve<F>(listener: TcpListener, store: Arc<dyn CoinStore>, shutdown: F) -> std::io::Result<()>
where
    F: Future<Output = ()> + Send + 'static,
{
    if let Ok(addr) = listener.local_addr() {
        tracing::info!("coinx API listening on http://{addr}");
    }
    axum::serve(listener, router(store))
        .with_graceful_shutdown(shutdown)
        .await
}
