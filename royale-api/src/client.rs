//! Thin wrapper around the game API with dashboard defaults.
//!
//! Handles bearer auth, path-segment encoding of player tags and locations,
//! and cursor shaping for the clan leaderboard before delegating to the
//! shared HTTP client.
use crate::types::{Battle, CardList, ClanRankingPage, Player, TournamentList};
use percent_encoding::{AsciiSet, NON_ALPHANUMERIC, utf8_percent_encode};
use royale_http::{Auth, HttpClient, HttpError, RawResponse, RequestOpts, StatusCode};
use serde::de::DeserializeOwned;
use std::borrow::Cow;
use std::time::Duration;
use thiserror::Error;

pub const DEFAULT_BASE: &str = "https://proxy.royaleapi.dev/v1/";
pub const DEFAULT_LOCATION: &str = "global";
pub const CLAN_PAGE_SIZE: u32 = 50;

/// Same set `encodeURIComponent` leaves alone, so `#` in tags becomes `%23`.
const SEGMENT: &AsciiSet = &NON_ALPHANUMERIC
    .remove(b'-')
    .remove(b'_')
    .remove(b'.')
    .remove(b'!')
    .remove(b'~')
    .remove(b'*')
    .remove(b'\'')
    .remove(b'(')
    .remove(b')');

#[derive(Debug, Error)]
pub enum ApiError {
    #[error("invalid {field}: {reason}")]
    InvalidInput { field: &'static str, reason: String },
    #[error(transparent)]
    Http(#[from] HttpError),
}

impl ApiError {
    /// Upstream status when the API answered with an error.
    pub fn status(&self) -> Option<StatusCode> {
        match self {
            ApiError::Http(e) => e.status(),
            ApiError::InvalidInput { .. } => None,
        }
    }
}

/// Opaque leaderboard cursor handed back by the API in `paging.cursors`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Cursor {
    After(String),
    Before(String),
}

impl Cursor {
    /// Pick a cursor from query-string values; `after` wins when both are set.
    ///
    /// ```
    /// use royale_api::Cursor;
    ///
    /// assert_eq!(
    ///     Cursor::from_query(Some("a1"), Some("b1")),
    ///     Some(Cursor::After("a1".into()))
    /// );
    /// assert_eq!(Cursor::from_query(Some(""), Some("b1")), Some(Cursor::Before("b1".into())));
    /// assert_eq!(Cursor::from_query(None, None), None);
    /// ```
    pub fn from_query(after: Option<&str>, before: Option<&str>) -> Option<Self> {
        let non_empty = |v: Option<&str>| v.filter(|s| !s.is_empty()).map(str::to_string);
        non_empty(after)
            .map(Cursor::After)
            .or_else(|| non_empty(before).map(Cursor::Before))
    }

    pub fn param(&self) -> (&'static str, &str) {
        match self {
            Cursor::After(v) => ("after", v),
            Cursor::Before(v) => ("before", v),
        }
    }
}

fn encode_segment(field: &'static str, raw: &str) -> Result<String, ApiError> {
    let trimmed = raw.trim();
    if trimmed.is_empty() {
        return Err(ApiError::InvalidInput {
            field,
            reason: "must not be empty".into(),
        });
    }
    // "." and ".." would be resolved away by URL joining.
    if trimmed.chars().all(|c| c == '.') {
        return Err(ApiError::InvalidInput {
            field,
            reason: "must not be a relative path".into(),
        });
    }
    Ok(utf8_percent_encode(trimmed, SEGMENT).to_string())
}

/// Upstream path for a player profile.
///
/// ```
/// assert_eq!(royale_api::client::player_path("#2PP").unwrap(), "players/%232PP");
/// ```
pub fn player_path(tag: &str) -> Result<String, ApiError> {
    Ok(format!("players/{}", encode_segment("tag", tag)?))
}

pub fn battle_log_path(tag: &str) -> Result<String, ApiError> {
    Ok(format!("players/{}/battlelog", encode_segment("tag", tag)?))
}

/// Upstream path for a clan leaderboard; blank locations mean `global`.
pub fn clan_rankings_path(location: Option<&str>) -> Result<String, ApiError> {
    let location = location
        .map(str::trim)
        .filter(|l| !l.is_empty())
        .unwrap_or(DEFAULT_LOCATION);
    Ok(format!(
        "locations/{}/rankings/clans",
        encode_segment("location", location)?
    ))
}

#[derive(Clone)]
pub struct RoyaleApi {
    http: HttpClient,
    token: String,
}

impl RoyaleApi {
    pub fn new(base_url: &str, token: String) -> Result<Self, ApiError> {
        let http = HttpClient::new(base_url)?;
        Ok(Self::with_http(http, token))
    }

    /// Build from a preconfigured client (timeouts, retries).
    pub fn with_http(http: HttpClient, token: String) -> Self {
        let api = Self { http, token };
        tracing::info!(
            target: "api.royale",
            base = %api.http.base(),
            token_loaded = api.has_token(),
            "royale_api.init"
        );
        api
    }

    /// Convenience for config-driven construction.
    pub fn from_settings(
        base_url: &str,
        token: String,
        timeout: Duration,
        retries: usize,
    ) -> Result<Self, ApiError> {
        let http = HttpClient::new(base_url)?
            .with_timeout(timeout)
            .with_retries(retries);
        Ok(Self::with_http(http, token))
    }

    pub fn has_token(&self) -> bool {
        !self.token.trim().is_empty()
    }

    fn opts(&self) -> RequestOpts<'_> {
        RequestOpts {
            auth: if self.has_token() {
                Some(Auth::Bearer(&self.token))
            } else {
                Some(Auth::None)
            },
            ..Default::default()
        }
    }

    async fn fetch_raw(
        &self,
        resource: &'static str,
        path: &str,
        opts: RequestOpts<'_>,
    ) -> Result<RawResponse, ApiError> {
        tracing::debug!(target: "api.royale", resource, %path, "royale_api.fetch");
        let raw = self.http.get_raw(path, opts).await?;
        if !raw.is_success() {
            tracing::warn!(
                target: "api.royale",
                resource,
                status = %raw.status,
                message = %raw.error_message(),
                "royale_api.upstream_error"
            );
        }
        Ok(raw)
    }

    async fn fetch_json<T: DeserializeOwned>(
        &self,
        resource: &'static str,
        path: &str,
        opts: RequestOpts<'_>,
    ) -> Result<T, ApiError> {
        tracing::debug!(target: "api.royale", resource, %path, "royale_api.fetch");
        Ok(self.http.get_json(path, opts).await?)
    }

    fn clan_opts<'a>(&'a self, cursor: Option<&'a Cursor>) -> RequestOpts<'a> {
        let mut query: Vec<(&str, Cow<'_, str>)> =
            vec![("limit", Cow::Owned(CLAN_PAGE_SIZE.to_string()))];
        if let Some(c) = cursor {
            let (name, value) = c.param();
            query.push((name, Cow::Borrowed(value)));
        }
        RequestOpts {
            query: Some(query),
            ..self.opts()
        }
    }

    pub async fn player_raw(&self, tag: &str) -> Result<RawResponse, ApiError> {
        let path = player_path(tag)?;
        self.fetch_raw("player", &path, self.opts()).await
    }

    pub async fn player(&self, tag: &str) -> Result<Player, ApiError> {
        let path = player_path(tag)?;
        self.fetch_json("player", &path, self.opts()).await
    }

    pub async fn battle_log_raw(&self, tag: &str) -> Result<RawResponse, ApiError> {
        let path = battle_log_path(tag)?;
        self.fetch_raw("battlelog", &path, self.opts()).await
    }

    pub async fn battle_log(&self, tag: &str) -> Result<Vec<Battle>, ApiError> {
        let path = battle_log_path(tag)?;
        self.fetch_json("battlelog", &path, self.opts()).await
    }

    pub async fn cards_raw(&self) -> Result<RawResponse, ApiError> {
        self.fetch_raw("cards", "cards", self.opts()).await
    }

    pub async fn cards(&self) -> Result<CardList, ApiError> {
        self.fetch_json("cards", "cards", self.opts()).await
    }

    pub async fn tournaments_raw(&self) -> Result<RawResponse, ApiError> {
        self.fetch_raw("tournaments", "globaltournaments", self.opts())
            .await
    }

    pub async fn tournaments(&self) -> Result<TournamentList, ApiError> {
        self.fetch_json("tournaments", "globaltournaments", self.opts())
            .await
    }

    pub async fn clan_rankings_raw(
        &self,
        location: Option<&str>,
        cursor: Option<&Cursor>,
    ) -> Result<RawResponse, ApiError> {
        let path = clan_rankings_path(location)?;
        self.fetch_raw("clan_rankings", &path, self.clan_opts(cursor))
            .await
    }

    pub async fn clan_rankings(
        &self,
        location: Option<&str>,
        cursor: Option<&Cursor>,
    ) -> Result<ClanRankingPage, ApiError> {
        let path = clan_rankings_path(location)?;
        self.fetch_json("clan_rankings", &path, self.clan_opts(cursor))
            .await
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn tags_are_encoded_like_encode_uri_component() {
        assert_eq!(player_path(" #ABC ").unwrap(), "players/%23ABC");
        assert_eq!(battle_log_path("#a/b").unwrap(), "players/%23a%2Fb/battlelog");
        assert_eq!(player_path("x y").unwrap(), "players/x%20y");
    }

    #[test]
    fn rejects_blank_and_dot_segments() {
        assert!(matches!(player_path("  "), Err(ApiError::InvalidInput { field: "tag", .. })));
        assert!(player_path("..").is_err());
    }

    #[test]
    fn clan_location_defaults_to_global() {
        assert_eq!(
            clan_rankings_path(None).unwrap(),
            "locations/global/rankings/clans"
        );
        assert_eq!(
            clan_rankings_path(Some("")).unwrap(),
            "locations/global/rankings/clans"
        );
        assert_eq!(
            clan_rankings_path(Some("57000249")).unwrap(),
            "locations/57000249/rankings/clans"
        );
    }

    #[test]
    fn cursor_param_names() {
        assert_eq!(Cursor::After("x".into()).param(), ("after", "x"));
        assert_eq!(Cursor::Before("y".into()).param(), ("before", "y"));
    }
}
