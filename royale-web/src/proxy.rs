//! JSON relay routes in front of the game API.
//!
//! Successful upstream bodies are passed through untouched. Failures become
//! `{"error": "..."}` with the upstream status, 400 for bad input and 502
//! when the upstream could not be reached at all.
use crate::state::AppState;
use axum::Json;
use axum::extract::{Query, State};
use axum::http::{StatusCode, header};
use axum::response::{IntoResponse, Response};
use royale_api::{ApiError, Cursor};
use royale_http::RawResponse;
use royale_scrape::ScrapeError;
use serde::Deserialize;
use serde_json::json;

#[derive(Debug, Default, Deserialize)]
pub struct TagQuery {
    pub tag: Option<String>,
}

impl TagQuery {
    /// The trimmed tag, or `None` when missing or blank.
    pub fn tag(&self) -> Option<&str> {
        self.tag.as_deref().map(str::trim).filter(|t| !t.is_empty())
    }
}

#[derive(Debug, Default, Deserialize)]
pub struct ClanQuery {
    pub location: Option<String>,
    pub after: Option<String>,
    pub before: Option<String>,
    /// Display-only page number; kept as text so junk never rejects the query.
    pub page: Option<String>,
}

impl ClanQuery {
    pub fn cursor(&self) -> Option<Cursor> {
        Cursor::from_query(self.after.as_deref(), self.before.as_deref())
    }

    /// Page number for the leaderboard view; anything unparsable is page 1.
    pub fn page_number(&self) -> u32 {
        self.page
            .as_deref()
            .and_then(|p| p.trim().parse().ok())
            .filter(|&p| p > 0)
            .unwrap_or(1)
    }
}

pub fn json_error(status: StatusCode, message: impl Into<String>) -> Response {
    (status, Json(json!({ "error": message.into() }))).into_response()
}

/// `API Error: 404 Not Found`
pub fn upstream_error_text(status: StatusCode) -> String {
    match status.canonical_reason() {
        Some(reason) => format!("API Error: {} {reason}", status.as_u16()),
        None => format!("API Error: {}", status.as_u16()),
    }
}

fn relay(result: Result<RawResponse, ApiError>) -> Response {
    match result {
        Ok(raw) if raw.is_success() => (
            StatusCode::OK,
            [(header::CONTENT_TYPE, "application/json")],
            raw.body,
        )
            .into_response(),
        Ok(raw) => json_error(raw.status, upstream_error_text(raw.status)),
        Err(e @ ApiError::InvalidInput { .. }) => json_error(StatusCode::BAD_REQUEST, e.to_string()),
        Err(e) => {
            tracing::error!(target: "web.proxy", error = %e, "relay.upstream_unreachable");
            json_error(StatusCode::BAD_GATEWAY, e.to_string())
        }
    }
}

fn tag_required() -> Response {
    json_error(StatusCode::BAD_REQUEST, "Player tag is required")
}

pub async fn method_not_allowed() -> Response {
    json_error(StatusCode::METHOD_NOT_ALLOWED, "Method not allowed")
}

pub async fn player(State(state): State<AppState>, Query(q): Query<TagQuery>) -> Response {
    let Some(tag) = q.tag() else {
        return tag_required();
    };
    relay(state.api.player_raw(tag).await)
}

pub async fn battle_log(State(state): State<AppState>, Query(q): Query<TagQuery>) -> Response {
    let Some(tag) = q.tag() else {
        return tag_required();
    };
    relay(state.api.battle_log_raw(tag).await)
}

pub async fn cards(State(state): State<AppState>) -> Response {
    relay(state.api.cards_raw().await)
}

pub async fn tournaments(State(state): State<AppState>) -> Response {
    relay(state.api.tournaments_raw().await)
}

pub async fn clan(State(state): State<AppState>, Query(q): Query<ClanQuery>) -> Response {
    let cursor = q.cursor();
    relay(
        state
            .api
            .clan_rankings_raw(q.location.as_deref(), cursor.as_ref())
            .await,
    )
}

pub async fn scrape(State(state): State<AppState>) -> Response {
    match state.scraper.scrape().await {
        Ok(report) => Json(json!({ "decks": report.card_names() })).into_response(),
        Err(e @ ScrapeError::NoDecks) => json_error(StatusCode::INTERNAL_SERVER_ERROR, e.to_string()),
        Err(e) => {
            tracing::error!(target: "web.proxy", error = %e, "scrape.failed");
            json_error(StatusCode::INTERNAL_SERVER_ERROR, e.to_string())
        }
    }
}

pub async fn health() -> &'static str {
    "ok"
}
