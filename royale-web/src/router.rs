use crate::state::AppState;
use crate::{pages, proxy};
use axum::Router;
use axum::routing::{MethodRouter, get};
use std::path::Path;
use tower_http::services::ServeDir;
use tower_http::trace::TraceLayer;

/// GET-only API route; any other method gets the JSON 405 body.
fn api_get<H, T>(handler: H) -> MethodRouter<AppState>
where
    H: axum::handler::Handler<T, AppState>,
    T: 'static,
{
    get(handler).fallback(proxy::method_not_allowed)
}

pub fn app_router(state: AppState, static_dir: impl AsRef<Path>) -> Router {
    Router::new()
        .route("/api/player", api_get(proxy::player))
        .route("/api/player/battlelog", api_get(proxy::battle_log))
        .route("/api/cards", api_get(proxy::cards))
        .route("/api/tournaments", api_get(proxy::tournaments))
        .route("/api/clan", api_get(proxy::clan))
        .route("/api/scrape", api_get(proxy::scrape))
        .route("/health", get(proxy::health))
        .route("/", get(pages::index))
        .route("/cards", get(pages::cards))
        .route("/cards/{id}", get(pages::card_detail))
        .route("/clans", get(pages::clans))
        .route("/player", get(pages::player))
        .route("/tournaments", get(pages::tournaments))
        .nest_service("/static", ServeDir::new(static_dir.as_ref()))
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}
