//! HTTP client for the balldontlie API.
//!
//! All endpoint access funnels through `fetch_all`, which handles the
//! Authorization header, rate limiting, and cursor-based pagination.

pub mod models;

use crate::config::Config;
use anyhow::{anyhow, Context, Result};
use chrono::NaiveDate;
use governor::{Quota, RateLimiter};
use reqwest::StatusCode;
use serde::de::DeserializeOwned;
use std::num::NonZeroU32;
use std::time::Duration;
use tracing::{debug, info};

use models::{
    ApiAdvancedStat, ApiContract, ApiContractAggregate, ApiGame, ApiInjury, ApiOdds, ApiPlayer,
    ApiProp, ApiStanding, ApiStat, ApiTeam, Page,
};

const BASE_V1: &str = "https://api.balldontlie.io/v1";
const BASE_V2: &str = "https://api.balldontlie.io/v2";
const PER_PAGE: i64 = 100;

pub struct ApiClient {
    http: reqwest::Client,
    api_key: String,
    rate_limiter: RateLimiter<
        governor::state::NotKeyed,
        governor::state::InMemoryState,
        governor::clock::DefaultClock,
    >,
}

impl ApiClient {
    pub fn new(config: &Config) -> Result<Self> {
        // A zero quota would deadlock the limiter; floor at one per minute.
        let rpm = NonZeroU32::new(config.requests_per_minute).unwrap_or(NonZeroU32::MIN);
        let quota = Quota::per_minute(rpm);

        let http = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.http_timeout_secs))
            .connect_timeout(Duration::from_secs(10))
            .build()
            .context("Failed to create HTTP client")?;

        Ok(Self {
            http,
            api_key: config.api_key.clone(),
            rate_limiter: RateLimiter::direct(quota),
        })
    }

    /// One GET against the API; returns status and raw body.
    async fn get(&self, url: &str, query: &[(&str, String)]) -> Result<(StatusCode, String)> {
        self.rate_limiter.until_ready().await;

        debug!(url, ?query, "API request");
        let response = self
            .http
            .get(url)
            .header("Authorization", &self.api_key)
            .query(query)
            .send()
            .await
            .with_context(|| format!("request to {} failed", url))?;

        let status = response.status();
        let body = response
            .text()
            .await
            .with_context(|| format!("failed to read response body from {}", url))?;
        Ok((status, body))
    }

    /// Drain a cursor-paginated endpoint. When `tolerate_not_found` is set a
    /// 404 means "no data for this entity" and yields an empty list.
    async fn fetch_all<T: DeserializeOwned>(
        &self,
        url: &str,
        base_query: &[(&str, String)],
        tolerate_not_found: bool,
    ) -> Result<Vec<T>> {
        let mut rows = Vec::new();
        let mut cursor: Option<i64> = None;
        let mut page_num = 1u32;

        loop {
            let mut query: Vec<(&str, String)> = vec![("per_page", PER_PAGE.to_string())];
            query.extend(base_query.iter().cloned());
            if let Some(c) = cursor {
                query.push(("cursor", c.to_string()));
            }

            let (status, body) = self.get(url, &query).await?;

            if status == StatusCode::NOT_FOUND && tolerate_not_found {
                debug!(url, "endpoint returned 404, treating as empty");
                return Ok(rows);
            }
            if !status.is_success() {
                return Err(anyhow!(
                    "API error from {} (status {}): {}",
                    url,
                    status,
                    body.chars().take(300).collect::<String>()
                ));
            }

            let page: Page<T> = serde_json::from_str(&body)
                .with_context(|| format!("failed to parse response from {}", url))?;

            let batch = page.data.len();
            rows.extend(page.data);
            debug!(url, page_num, batch, "fetched page");

            cursor = page.meta.and_then(|m| m.next_cursor);
            if cursor.is_none() || batch == 0 {
                break;
            }
            page_num += 1;
        }

        Ok(rows)
    }

    pub async fn teams(&self) -> Result<Vec<ApiTeam>> {
        let teams = self
            .fetch_all(&format!("{}/teams", BASE_V1), &[], false)
            .await?;
        info!("Fetched {} teams", teams.len());
        Ok(teams)
    }

    pub async fn players(&self) -> Result<Vec<ApiPlayer>> {
        let players = self
            .fetch_all(&format!("{}/players", BASE_V1), &[], false)
            .await?;
        info!("Fetched {} players", players.len());
        Ok(players)
    }

    pub async fn games_for_date(&self, date: NaiveDate) -> Result<Vec<ApiGame>> {
        let games = self
            .fetch_all(
                &format!("{}/games", BASE_V1),
                &[("dates[]", date.to_string())],
                false,
            )
            .await?;
        info!("Fetched {} games for {}", games.len(), date);
        Ok(games)
    }

    pub async fn stats_for_date(&self, date: NaiveDate) -> Result<Vec<ApiStat>> {
        let stats = self
            .fetch_all(
                &format!("{}/stats", BASE_V1),
                &[("dates[]", date.to_string())],
                false,
            )
            .await?;
        info!("Fetched {} box-score rows for {}", stats.len(), date);
        Ok(stats)
    }

    pub async fn advanced_stats_for_date(&self, date: NaiveDate) -> Result<Vec<ApiAdvancedStat>> {
        let stats = self
            .fetch_all(
                &format!("{}/stats/advanced", BASE_V1),
                &[("dates[]", date.to_string())],
                false,
            )
            .await?;
        info!("Fetched {} advanced-stat rows for {}", stats.len(), date);
        Ok(stats)
    }

    pub async fn standings(&self, season: i32) -> Result<Vec<ApiStanding>> {
        let standings = self
            .fetch_all(
                &format!("{}/standings", BASE_V1),
                &[("season", season.to_string())],
                false,
            )
            .await?;
        info!("Fetched {} standings rows for season {}", standings.len(), season);
        Ok(standings)
    }

    pub async fn odds_for_date(&self, date: NaiveDate) -> Result<Vec<ApiOdds>> {
        let odds = self
            .fetch_all(
                &format!("{}/odds", BASE_V2),
                &[("dates[]", date.to_string())],
                false,
            )
            .await?;
        info!("Fetched {} odds rows for {}", odds.len(), date);
        Ok(odds)
    }

    /// Player props for one game. Games without a props market 404.
    pub async fn props_for_game(&self, game_id: i64) -> Result<Vec<ApiProp>> {
        self.fetch_all(
            &format!("{}/odds/player_props", BASE_V2),
            &[("game_id", game_id.to_string())],
            true,
        )
        .await
    }

    pub async fn injuries(&self) -> Result<Vec<ApiInjury>> {
        let injuries = self
            .fetch_all(&format!("{}/player_injuries", BASE_V1), &[], false)
            .await?;
        info!("Fetched {} injury rows", injuries.len());
        Ok(injuries)
    }

    /// Contract rows for one team and season. 404 means none published.
    pub async fn team_contracts(&self, team_id: i64, season: i32) -> Result<Vec<ApiContract>> {
        self.fetch_all(
            &format!("{}/contracts/teams", BASE_V1),
            &[
                ("team_id", team_id.to_string()),
                ("season", season.to_string()),
            ],
            true,
        )
        .await
    }

    /// Whole-deal contract summaries for one player. 404 means none.
    pub async fn contract_aggregates_for_player(
        &self,
        player_id: i64,
    ) -> Result<Vec<ApiContractAggregate>> {
        self.fetch_all(
            &format!("{}/contracts/players/aggregate", BASE_V1),
            &[("player_id", player_id.to_string())],
            true,
        )
        .await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::Config;

    fn test_config(rpm: u32) -> Config {
        Config {
            api_key: "test-key".to_string(),
            database_url: "postgresql://localhost/test".to_string(),
            requests_per_minute: rpm,
            http_timeout_secs: 5,
        }
    }

    #[test]
    fn client_builds_even_with_zero_quota() {
        let client = ApiClient::new(&test_config(0)).unwrap();
        // The floored quota still grants the first permit immediately.
        tokio_test::block_on(client.rate_limiter.until_ready());
    }

    #[test]
    fn client_builds_with_normal_quota() {
        assert!(ApiClient::new(&test_config(60)).is_ok());
    }
}
