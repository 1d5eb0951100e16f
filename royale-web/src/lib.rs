//! HTTP surface of the dashboard.
//!
//! - [`proxy`]: `/api/*` JSON relays to the game API plus the deck scrape
//! - [`pages`]: askama-rendered HTML views built from [`views`] models
//! - [`router::app_router`]: wires both together with static assets and tracing
pub mod pages;
pub mod proxy;
pub mod router;
pub mod state;
pub mod views;

pub use router::app_router;
pub use state::AppState;

use std::future::Future;
use std::net::SocketAddr;
use std::path::Path;

/// Serve on an already-bound listener until `shutdown` resolves.
pub async fn serve_listener(
    listener: tokio::net::TcpListener,
    state: AppState,
    static_dir: impl AsRef<Path>,
    shutdown: impl Future<Output = ()> + Send + 'static,
) -> anyhow::Result<SocketAddr> {
    let addr = listener.local_addr()?;
    let app = app_router(state, static_dir);
    tracing::info!(target: "web.server", %addr, "server.listening");
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown)
        .await?;
    tracing::info!(target: "web.server", "server.stopped");
    Ok(addr)
}
