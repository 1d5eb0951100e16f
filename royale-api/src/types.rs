use chrono::{DateTime, NaiveDateTime, Utc};
use serde::{Deserialize, Serialize};

/// Timestamp format used throughout the API: `20250101T120000.000Z`.
const API_TIME_FORMAT: &str = "%Y%m%dT%H%M%S%.fZ";

/// Parse an API timestamp (`yyyymmddThhmmss.sssZ`) as UTC.
///
/// ```
/// use royale_api::types::parse_api_time;
///
/// let t = parse_api_time("20250314T093000.000Z").unwrap();
/// assert_eq!(t.to_rfc3339(), "2025-03-14T09:30:00+00:00");
/// assert!(parse_api_time("yesterday").is_none());
/// ```
pub fn parse_api_time(raw: &str) -> Option<DateTime<Utc>> {
    let raw = raw.trim();
    NaiveDateTime::parse_from_str(raw, API_TIME_FORMAT)
        .or_else(|_| NaiveDateTime::parse_from_str(raw, "%Y%m%dT%H%M%SZ"))
        .ok()
        .map(|ndt| DateTime::<Utc>::from_naive_utc_and_offset(ndt, Utc))
}

#[derive(Debug, Clone, Serialize, Deserialize, Default)]
#[serde(rename_all = "camelCase")]
pub struct IconUrls {
    #[serde(default)]
    pub medium: Option<String>,
    #[serde(default)]
    pub large: Option<String>,
    #[serde(default)]
    pub evolution_medium: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Card {
    pub name: String,
    #[serde(default)]
    pub id: Option<u64>,
    #[serde(default)]
    pub level: Option<u32>,
    #[serde(default)]
    pub max_level: Option<u32>,
    #[serde(default)]
    pub elixir_cost: Option<u32>,
    #[serde(default)]
    pub rarity: Option<String>,
    #[serde(default)]
    pub icon_urls: IconUrls,
}

#[derive(Debug, Clone, Serialize, Deserialize, Default)]
#[serde(rename_all = "camelCase")]
pub struct CardList {
    #[serde(default)]
    pub items: Vec<Card>,
    #[serde(default)]
    pub support_items: Vec<Card>,
}

#[derive(Debug, Clone, Serialize, Deserialize, Default)]
#[serde(rename_all = "camelCase")]
pub struct ClanRef {
    #[serde(default)]
    pub tag: Option<String>,
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub role: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct Named {
    #[serde(default)]
    pub id: Option<u64>,
    #[serde(default)]
    pub name: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Badge {
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub level: Option<u32>,
    #[serde(default)]
    pub icon_urls: IconUrls,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Player {
    pub tag: String,
    pub name: String,
    #[serde(default)]
    pub exp_level: Option<u32>,
    #[serde(default)]
    pub trophies: Option<u32>,
    #[serde(default)]
    pub best_trophies: Option<u32>,
    #[serde(default)]
    pub wins: Option<u32>,
    #[serde(default)]
    pub losses: Option<u32>,
    #[serde(default)]
    pub battle_count: Option<u32>,
    #[serde(default)]
    pub three_crown_wins: Option<u32>,
    /// Clan role sits at the top level of the player object.
    #[serde(default)]
    pub role: Option<String>,
    #[serde(default)]
    pub clan: Option<ClanRef>,
    #[serde(default)]
    pub arena: Option<Named>,
    #[serde(default)]
    pub badges: Vec<Badge>,
    #[serde(default)]
    pub current_deck: Vec<Card>,
    #[serde(default)]
    pub current_favourite_card: Option<Card>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BattleSide {
    #[serde(default)]
    pub tag: Option<String>,
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub crowns: u32,
    #[serde(default)]
    pub trophy_change: Option<i32>,
    #[serde(default)]
    pub elixir_leaked: Option<f64>,
    #[serde(default)]
    pub cards: Vec<Card>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Battle {
    #[serde(rename = "type", default)]
    pub kind: Option<String>,
    #[serde(default)]
    pub battle_time: Option<String>,
    #[serde(default)]
    pub arena: Option<Named>,
    #[serde(default)]
    pub game_mode: Option<Named>,
    #[serde(default)]
    pub team: Vec<BattleSide>,
    #[serde(default)]
    pub opponent: Vec<BattleSide>,
}

#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct Cursors {
    #[serde(default)]
    pub after: Option<String>,
    #[serde(default)]
    pub before: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct Paging {
    #[serde(default)]
    pub cursors: Cursors,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ClanRanking {
    pub tag: String,
    pub name: String,
    #[serde(default)]
    pub rank: Option<u32>,
    #[serde(default)]
    pub previous_rank: Option<i64>,
    #[serde(default)]
    pub location: Option<Named>,
    #[serde(default)]
    pub clan_score: Option<u64>,
    #[serde(default)]
    pub members: Option<u32>,
}

#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct ClanRankingPage {
    #[serde(default)]
    pub items: Vec<ClanRanking>,
    #[serde(default)]
    pub paging: Paging,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Reward {
    #[serde(rename = "type", default)]
    pub kind: Option<String>,
    #[serde(default)]
    pub wins: Option<u32>,
    #[serde(default)]
    pub amount: Option<u64>,
    #[serde(default)]
    pub resource: Option<String>,
    #[serde(default)]
    pub consumable_name: Option<String>,
    #[serde(default)]
    pub chest: Option<String>,
    #[serde(default)]
    pub rarity: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Tournament {
    #[serde(default)]
    pub tag: Option<String>,
    #[serde(default)]
    pub title: Option<String>,
    #[serde(default)]
    pub start_time: Option<String>,
    #[serde(default)]
    pub end_time: Option<String>,
    #[serde(default)]
    pub max_losses: Option<u32>,
    #[serde(default)]
    pub min_exp_level: Option<u32>,
    #[serde(default)]
    pub max_top_reward_rank: Option<u32>,
    #[serde(default)]
    pub game_mode: Option<Named>,
    #[serde(default)]
    pub milestone_rewards: Vec<Reward>,
    #[serde(default)]
    pub free_tier_rewards: Vec<Reward>,
    #[serde(default)]
    pub top_rank_reward: Vec<Reward>,
}

#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct TournamentList {
    #[serde(default)]
    pub items: Vec<Tournament>,
}
