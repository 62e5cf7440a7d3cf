//! Typed payload shapes for the balldontlie API.
//!
//! Every external JSON shape is decoded once at the boundary into one of
//! these structs. Fields the API sometimes omits are named optionals; there
//! is no string-keyed lookup anywhere downstream.

use anyhow::{Context, Result};
use chrono::{DateTime, NaiveDate, Utc};
use serde::de::Deserializer;
use serde::Deserialize;

/// One page of a cursor-paginated endpoint.
#[derive(Debug, Deserialize)]
pub struct Page<T> {
    pub data: Vec<T>,
    pub meta: Option<PageMeta>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub struct PageMeta {
    pub next_cursor: Option<i64>,
    pub per_page: Option<i64>,
}

/// Draft fields have shipped as both numbers and strings over API versions;
/// accept either, map anything unparseable to None.
fn lenient_i32<'de, D>(deserializer: D) -> Result<Option<i32>, D::Error>
where
    D: Deserializer<'de>,
{
    let value = Option::<serde_json::Value>::deserialize(deserializer)?;
    Ok(match value {
        Some(serde_json::Value::Number(n)) => n.as_i64().map(|v| v as i32),
        Some(serde_json::Value::String(s)) => s.trim().parse().ok(),
        _ => None,
    })
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct ApiTeam {
    pub id: i64,
    pub full_name: Option<String>,
    pub name: Option<String>,
    pub abbreviation: Option<String>,
    pub conference: Option<String>,
    pub division: Option<String>,
    pub city: Option<String>,
}

impl ApiTeam {
    /// Display name, falling back through the shorter name to a placeholder.
    pub fn display_name(&self) -> String {
        self.full_name
            .clone()
            .or_else(|| self.name.clone())
            .unwrap_or_else(|| format!("Team {}", self.id))
    }
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct ApiPlayer {
    pub id: i64,
    pub first_name: Option<String>,
    pub last_name: Option<String>,
    pub position: Option<String>,
    /// Feet-inches string like "6-7".
    pub height: Option<String>,
    /// Pounds as a string like "220".
    pub weight: Option<String>,
    pub jersey_number: Option<String>,
    pub college: Option<String>,
    pub country: Option<String>,
    #[serde(deserialize_with = "lenient_i32")]
    pub draft_year: Option<i32>,
    #[serde(deserialize_with = "lenient_i32")]
    pub draft_round: Option<i32>,
    #[serde(deserialize_with = "lenient_i32")]
    pub draft_number: Option<i32>,
    /// Present on /players responses.
    pub team: Option<ApiTeam>,
    /// Present on injury/contract-embedded player objects.
    pub team_id: Option<i64>,
}

impl ApiPlayer {
    pub fn full_name(&self) -> String {
        let first = self.first_name.as_deref().unwrap_or("");
        let last = self.last_name.as_deref().unwrap_or("");
        format!("{} {}", first, last).trim().to_string()
    }
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct ApiGame {
    pub id: i64,
    /// "YYYY-MM-DD", or a full ISO timestamp on some endpoints.
    pub date: String,
    pub season: Option<i32>,
    pub postseason: bool,
    pub status: Option<String>,
    pub period: Option<i32>,
    pub time: Option<String>,
    pub datetime: Option<DateTime<Utc>>,
    /// /games embeds full team objects; stat-embedded games carry only ids.
    pub home_team: Option<ApiTeam>,
    pub visitor_team: Option<ApiTeam>,
    pub home_team_id: Option<i64>,
    pub visitor_team_id: Option<i64>,
    pub home_team_score: Option<i32>,
    pub visitor_team_score: Option<i32>,
    pub home_q1: Option<i32>,
    pub home_q2: Option<i32>,
    pub home_q3: Option<i32>,
    pub home_q4: Option<i32>,
    pub home_ot1: Option<i32>,
    pub home_ot2: Option<i32>,
    pub home_ot3: Option<i32>,
    pub home_timeouts_remaining: Option<i32>,
    pub home_in_bonus: Option<bool>,
    pub visitor_q1: Option<i32>,
    pub visitor_q2: Option<i32>,
    pub visitor_q3: Option<i32>,
    pub visitor_q4: Option<i32>,
    pub visitor_ot1: Option<i32>,
    pub visitor_ot2: Option<i32>,
    pub visitor_ot3: Option<i32>,
    pub visitor_timeouts_remaining: Option<i32>,
    pub visitor_in_bonus: Option<bool>,
}

impl ApiGame {
    pub fn game_date(&self) -> Result<NaiveDate> {
        let date_part = self.date.split('T').next().unwrap_or(&self.date);
        date_part
            .parse()
            .with_context(|| format!("game {} has unparseable date {:?}", self.id, self.date))
    }

    pub fn home_id(&self) -> Option<i64> {
        self.home_team.as_ref().map(|t| t.id).or(self.home_team_id)
    }

    pub fn visitor_id(&self) -> Option<i64> {
        self.visitor_team.as_ref().map(|t| t.id).or(self.visitor_team_id)
    }
}

/// One per-player box-score row from /stats.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct ApiStat {
    /// "MM:SS" played, sometimes empty for DNPs.
    pub min: Option<String>,
    pub pts: Option<i32>,
    pub reb: Option<i32>,
    pub oreb: Option<i32>,
    pub dreb: Option<i32>,
    pub ast: Option<i32>,
    pub stl: Option<i32>,
    pub blk: Option<i32>,
    pub pf: Option<i32>,
    pub turnover: Option<i32>,
    pub fgm: Option<i32>,
    pub fga: Option<i32>,
    pub fg3m: Option<i32>,
    pub fg3a: Option<i32>,
    pub ftm: Option<i32>,
    pub fta: Option<i32>,
    pub fg_pct: Option<f64>,
    pub fg3_pct: Option<f64>,
    pub ft_pct: Option<f64>,
    pub player: ApiPlayer,
    pub team: ApiTeam,
    pub game: ApiGame,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct ApiAdvancedStat {
    pub pie: Option<f64>,
    pub pace: Option<f64>,
    pub assist_percentage: Option<f64>,
    pub assist_ratio: Option<f64>,
    pub assist_to_turnover: Option<f64>,
    pub defensive_rating: Option<f64>,
    pub defensive_rebound_percentage: Option<f64>,
    pub effective_field_goal_percentage: Option<f64>,
    pub net_rating: Option<f64>,
    pub offensive_rating: Option<f64>,
    pub offensive_rebound_percentage: Option<f64>,
    pub rebound_percentage: Option<f64>,
    pub true_shooting_percentage: Option<f64>,
    pub turnover_ratio: Option<f64>,
    pub usage_percentage: Option<f64>,
    pub player: ApiPlayer,
    pub team: ApiTeam,
    pub game: ApiGame,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct ApiStanding {
    pub team: ApiTeam,
    pub season: Option<i32>,
    pub conference_record: Option<String>,
    pub conference_rank: Option<i32>,
    pub division_record: Option<String>,
    pub division_rank: Option<i32>,
    pub wins: Option<i32>,
    pub losses: Option<i32>,
    pub home_record: Option<String>,
    pub road_record: Option<String>,
}

/// Game-level betting lines from /v2/odds. Line values arrive as strings
/// like "-7.5"; prices are American-odds integers.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct ApiOdds {
    pub id: i64,
    pub game_id: i64,
    pub vendor: String,
    pub spread_home_value: Option<String>,
    pub spread_home_odds: Option<i32>,
    pub spread_away_value: Option<String>,
    pub spread_away_odds: Option<i32>,
    pub moneyline_home_odds: Option<i32>,
    pub moneyline_away_odds: Option<i32>,
    pub total_value: Option<String>,
    pub total_over_odds: Option<i32>,
    pub total_under_odds: Option<i32>,
    pub updated_at: Option<DateTime<Utc>>,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct ApiPropMarket {
    #[serde(rename = "type")]
    pub market_type: Option<String>,
    pub over_odds: Option<i32>,
    pub under_odds: Option<i32>,
    /// Milestone markets carry a single price.
    pub odds: Option<i32>,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct ApiProp {
    pub id: i64,
    pub game_id: i64,
    pub player_id: i64,
    pub vendor: Option<String>,
    pub prop_type: Option<String>,
    pub line_value: Option<String>,
    pub market: Option<ApiPropMarket>,
    pub updated_at: Option<DateTime<Utc>>,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct ApiInjury {
    pub player: ApiPlayer,
    pub status: Option<String>,
    /// Free-form text like "Nov 17", not a parseable date.
    pub return_date: Option<String>,
    pub description: Option<String>,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct ApiContract {
    pub id: i64,
    pub player_id: i64,
    pub team_id: i64,
    pub season: Option<i32>,
    pub cap_hit: Option<f64>,
    pub total_cash: Option<f64>,
    pub base_salary: Option<f64>,
    pub rank: Option<i32>,
    pub team: Option<ApiTeam>,
    pub player: Option<ApiPlayer>,
}

/// Contract notes have shipped both as a single string and as a list of
/// strings; lists are joined into one text field.
fn notes_text<'de, D>(deserializer: D) -> Result<Option<String>, D::Error>
where
    D: Deserializer<'de>,
{
    let value = Option::<serde_json::Value>::deserialize(deserializer)?;
    Ok(match value {
        Some(serde_json::Value::String(s)) => Some(s),
        Some(serde_json::Value::Array(items)) => {
            let parts: Vec<&str> = items.iter().filter_map(|v| v.as_str()).collect();
            if parts.is_empty() {
                None
            } else {
                Some(parts.join("; "))
            }
        }
        _ => None,
    })
}

/// Whole-contract summary from /v1/contracts/players/aggregate: one row per
/// signed deal, spanning seasons, rather than one per season.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct ApiContractAggregate {
    pub id: i64,
    pub player_id: i64,
    pub team_id: Option<i64>,
    pub start_year: Option<i32>,
    pub end_year: Option<i32>,
    pub contract_type: Option<String>,
    pub contract_status: Option<String>,
    pub contract_years: Option<i32>,
    pub total_value: Option<f64>,
    pub average_salary: Option<f64>,
    pub guaranteed_at_signing: Option<f64>,
    pub total_guaranteed: Option<f64>,
    pub signed_using: Option<String>,
    pub free_agent_year: Option<i32>,
    pub free_agent_status: Option<String>,
    #[serde(deserialize_with = "notes_text")]
    pub contract_notes: Option<String>,
    pub team: Option<ApiTeam>,
    pub player: Option<ApiPlayer>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn stat_payload_decodes() {
        let raw = r#"{
            "id": 1,
            "min": "34:22",
            "pts": 28, "reb": 9, "oreb": 2, "dreb": 7,
            "ast": 7, "stl": 2, "blk": 1, "pf": 3, "turnover": 4,
            "fgm": 10, "fga": 21, "fg3m": 3, "fg3a": 8, "ftm": 5, "fta": 6,
            "fg_pct": 0.476, "fg3_pct": 0.375, "ft_pct": 0.833,
            "player": {"id": 115, "first_name": "Stephen", "last_name": "Curry", "position": "G"},
            "team": {"id": 10, "full_name": "Golden State Warriors", "abbreviation": "GSW"},
            "game": {"id": 500, "date": "2024-01-10", "season": 2023,
                     "home_team_id": 10, "visitor_team_id": 20,
                     "home_team_score": 110, "visitor_team_score": 102}
        }"#;
        let stat: ApiStat = serde_json::from_str(raw).unwrap();
        assert_eq!(stat.pts, Some(28));
        assert_eq!(stat.turnover, Some(4));
        assert_eq!(stat.player.full_name(), "Stephen Curry");
        assert_eq!(stat.game.home_id(), Some(10));
        assert_eq!(stat.game.game_date().unwrap(), "2024-01-10".parse().unwrap());
    }

    #[test]
    fn game_date_accepts_iso_timestamps() {
        let game = ApiGame {
            id: 7,
            date: "2024-01-20T00:00:00.000Z".to_string(),
            ..Default::default()
        };
        assert_eq!(game.game_date().unwrap(), "2024-01-20".parse().unwrap());
    }

    #[test]
    fn game_prefers_embedded_team_objects() {
        let raw = r#"{
            "id": 9, "date": "2024-02-01", "season": 2023, "postseason": false,
            "home_team": {"id": 14, "full_name": "Los Angeles Lakers"},
            "visitor_team": {"id": 2, "full_name": "Boston Celtics"},
            "home_team_score": 114, "visitor_team_score": 105,
            "home_q1": 30, "visitor_q1": 25
        }"#;
        let game: ApiGame = serde_json::from_str(raw).unwrap();
        assert_eq!(game.home_id(), Some(14));
        assert_eq!(game.visitor_id(), Some(2));
        assert_eq!(game.home_q1, Some(30));
    }

    #[test]
    fn draft_fields_accept_numbers_and_strings() {
        let raw = r#"{"id": 1, "first_name": "Test", "last_name": "Player",
                      "draft_year": 2019, "draft_round": "1", "draft_number": null}"#;
        let player: ApiPlayer = serde_json::from_str(raw).unwrap();
        assert_eq!(player.draft_year, Some(2019));
        assert_eq!(player.draft_round, Some(1));
        assert_eq!(player.draft_number, None);
    }

    #[test]
    fn page_meta_cursor_optional() {
        let raw = r#"{"data": [{"id": 1}], "meta": {"next_cursor": 25, "per_page": 25}}"#;
        let page: Page<ApiTeam> = serde_json::from_str(raw).unwrap();
        assert_eq!(page.meta.unwrap().next_cursor, Some(25));

        let raw = r#"{"data": [], "meta": {"per_page": 25}}"#;
        let page: Page<ApiTeam> = serde_json::from_str(raw).unwrap();
        assert_eq!(page.meta.unwrap().next_cursor, None);
    }

    #[test]
    fn odds_lines_stay_strings_until_parsed() {
        let raw = r#"{
            "id": 44, "game_id": 500, "vendor": "draftkings",
            "spread_home_value": "-7.5", "spread_home_odds": -110,
            "total_value": "228.5", "total_over_odds": -108,
            "updated_at": "2025-10-21T23:46:11.875Z"
        }"#;
        let odds: ApiOdds = serde_json::from_str(raw).unwrap();
        assert_eq!(odds.spread_home_value.as_deref(), Some("-7.5"));
        assert_eq!(odds.moneyline_home_odds, None);
        assert!(odds.updated_at.is_some());
    }

    #[test]
    fn contract_notes_accept_string_and_list() {
        let raw = r#"{"id": 1, "player_id": 115, "contract_notes": "Signed using cap space"}"#;
        let agg: ApiContractAggregate = serde_json::from_str(raw).unwrap();
        assert_eq!(agg.contract_notes.as_deref(), Some("Signed using cap space"));

        let raw = r#"{"id": 2, "player_id": 115,
                      "contract_notes": ["Team option 2026-27", "Trade kicker: 15%"]}"#;
        let agg: ApiContractAggregate = serde_json::from_str(raw).unwrap();
        assert_eq!(
            agg.contract_notes.as_deref(),
            Some("Team option 2026-27; Trade kicker: 15%")
        );

        let raw = r#"{"id": 3, "player_id": 115, "contract_notes": null}"#;
        let agg: ApiContractAggregate = serde_json::from_str(raw).unwrap();
        assert_eq!(agg.contract_notes, None);
    }

    #[test]
    fn prop_market_variants_decode() {
        let raw = r#"{
            "id": 3, "game_id": 500, "player_id": 115, "vendor": "fanduel",
            "prop_type": "points", "line_value": "27.5",
            "market": {"type": "over_under", "over_odds": -115, "under_odds": -105}
        }"#;
        let prop: ApiProp = serde_json::from_str(raw).unwrap();
        let market = prop.market.unwrap();
        assert_eq!(market.market_type.as_deref(), Some("over_under"));
        assert_eq!(market.odds, None);

        let raw = r#"{
            "id": 4, "game_id": 500, "player_id": 115,
            "market": {"type": "milestone", "odds": 320}
        }"#;
        let prop: ApiProp = serde_json::from_str(raw).unwrap();
        assert_eq!(prop.market.unwrap().odds, Some(320));
    }
}
