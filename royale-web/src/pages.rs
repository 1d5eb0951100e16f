//! Server-rendered dashboard pages.
use crate::proxy::{ClanQuery, TagQuery};
use crate::state::AppState;
use crate::views::{
    self, BattleView, CardSort, CardView, ClanRow, LocationOption, Pager, PlayerView,
    TournamentView,
};
use askama::Template;
use axum::extract::{Path, Query, State};
use axum::http::StatusCode;
use axum::response::{Html, IntoResponse, Response};
use chrono::Utc;
use royale_api::ApiError;
use serde::Deserialize;

#[derive(Template)]
#[template(path = "index.html")]
pub struct IndexTemplate;

#[derive(Template)]
#[template(path = "error.html")]
pub struct ErrorTemplate {
    pub heading: String,
    pub message: String,
}

#[derive(Template)]
#[template(path = "cards.html")]
pub struct CardsTemplate {
    pub cards: Vec<CardView>,
    pub support: Vec<CardView>,
    pub sort: &'static str,
    pub descending: bool,
}

#[derive(Template)]
#[template(path = "card_detail.html")]
pub struct CardDetailTemplate {
    pub card: CardView,
    pub related: Vec<CardView>,
}

#[derive(Template)]
#[template(path = "clans.html")]
pub struct ClansTemplate {
    pub rows: Vec<ClanRow>,
    pub locations: Vec<LocationOption>,
    pub pager: Pager,
}

#[derive(Template)]
#[template(path = "player.html")]
pub struct PlayerTemplate {
    pub player: PlayerView,
    pub battles: Vec<BattleView>,
    pub battle_error: Option<String>,
}

#[derive(Template)]
#[template(path = "tournaments.html")]
pub struct TournamentsTemplate {
    pub active: Vec<TournamentView>,
    pub inactive: Vec<TournamentView>,
}

fn render<T: Template>(status: StatusCode, page: &T) -> Response {
    match page.render() {
        Ok(html) => (status, Html(html)).into_response(),
        Err(e) => {
            tracing::error!(target: "web.pages", error = %e, "template.render_failed");
            (StatusCode::INTERNAL_SERVER_ERROR, "template error").into_response()
        }
    }
}

fn error_page(status: StatusCode, heading: &str, message: impl Into<String>) -> Response {
    render(
        status,
        &ErrorTemplate {
            heading: heading.into(),
            message: message.into(),
        },
    )
}

/// Error page for a failed upstream call, keeping the upstream status when there is one.
fn upstream_failure(err: &ApiError) -> Response {
    match err.status() {
        Some(status) => error_page(
            status,
            "Upstream error",
            crate::proxy::upstream_error_text(status),
        ),
        None => {
            tracing::warn!(target: "web.pages", error = %err, "page.upstream_unreachable");
            let status = match err {
                ApiError::InvalidInput { .. } => StatusCode::BAD_REQUEST,
                _ => StatusCode::BAD_GATEWAY,
            };
            error_page(status, "Upstream error", err.to_string())
        }
    }
}

pub async fn index() -> Response {
    render(StatusCode::OK, &IndexTemplate)
}

#[derive(Debug, Default, Deserialize)]
pub struct CardsQuery {
    pub sort: Option<String>,
    pub order: Option<String>,
}

pub async fn cards(State(state): State<AppState>, Query(q): Query<CardsQuery>) -> Response {
    let mut list = match state.api.cards().await {
        Ok(list) => list,
        Err(e) => return upstream_failure(&e),
    };
    let sort = CardSort::parse(q.sort.as_deref());
    let descending = q.order.as_deref() == Some("desc");
    views::sort_cards(&mut list.items, sort, descending);
    views::sort_cards(&mut list.support_items, sort, descending);
    render(
        StatusCode::OK,
        &CardsTemplate {
            cards: list.items.iter().map(CardView::from).collect(),
            support: list.support_items.iter().map(CardView::from).collect(),
            sort: sort.as_str(),
            descending,
        },
    )
}

pub async fn card_detail(State(state): State<AppState>, Path(id): Path<String>) -> Response {
    let Ok(id) = id.trim().parse::<u64>() else {
        return error_page(StatusCode::NOT_FOUND, "Card not found", format!("No card with id {id}."));
    };
    let list = match state.api.cards().await {
        Ok(list) => list,
        Err(e) => return upstream_failure(&e),
    };
    let all: Vec<_> = list.items.into_iter().chain(list.support_items).collect();
    let Some(card) = all.iter().find(|c| c.id == Some(id)) else {
        return error_page(StatusCode::NOT_FOUND, "Card not found", format!("No card with id {id}."));
    };
    render(
        StatusCode::OK,
        &CardDetailTemplate {
            card: CardView::from(card),
            related: views::related_cards(card, &all),
        },
    )
}

pub async fn clans(State(state): State<AppState>, Query(q): Query<ClanQuery>) -> Response {
    let location = q
        .location
        .as_deref()
        .map(str::trim)
        .filter(|l| !l.is_empty())
        .unwrap_or(royale_api::client::DEFAULT_LOCATION)
        .to_string();
    let cursor = q.cursor();
    let page = match state.api.clan_rankings(Some(&location), cursor.as_ref()).await {
        Ok(page) => page,
        Err(e) => return upstream_failure(&e),
    };
    render(
        StatusCode::OK,
        &ClansTemplate {
            rows: page.items.iter().map(ClanRow::from).collect(),
            locations: views::location_options(&location),
            pager: Pager::new(&page, &location, q.page_number()),
        },
    )
}

pub async fn player(State(state): State<AppState>, Query(q): Query<TagQuery>) -> Response {
    let Some(tag) = q.tag() else {
        return error_page(StatusCode::BAD_REQUEST, "Player", "No player tag provided.");
    };

    let (profile, log) = tokio::join!(state.api.player(tag), state.api.battle_log(tag));
    let profile = match profile {
        Ok(p) => p,
        Err(e) if e.status() == Some(StatusCode::NOT_FOUND) => {
            return error_page(StatusCode::NOT_FOUND, "Player", "User does not exist");
        }
        Err(e) => return upstream_failure(&e),
    };
    let (battles, battle_error) = match log {
        Ok(log) => (views::recent_battles(&log), None),
        Err(e) => {
            tracing::warn!(target: "web.pages", error = %e, "player.battle_log_failed");
            (Vec::new(), Some(e.to_string()))
        }
    };

    render(
        StatusCode::OK,
        &PlayerTemplate {
            player: PlayerView::from(&profile),
            battles,
            battle_error,
        },
    )
}

pub async fn tournaments(State(state): State<AppState>) -> Response {
    let list = match state.api.tournaments().await {
        Ok(list) => list,
        Err(e) => return upstream_failure(&e),
    };
    let (active, inactive) = views::split_tournaments(&list.items, Utc::now());
    render(StatusCode::OK, &TournamentsTemplate { active, inactive })
}
