//! Shared dimension-table upserts.
//!
//! Every adapter that encounters an embedded team/player/game object goes
//! through these, so there is exactly one merge policy: incoming NULLs never
//! clobber existing values (COALESCE on the conflict update), and empty
//! strings are normalized to NULL at this boundary.

use crate::api::models::{ApiGame, ApiPlayer, ApiTeam};
use crate::scope::DateRange;
use anyhow::{anyhow, Result};
use chrono::{Datelike, NaiveDate};
use sqlx::PgPool;

fn none_if_empty(value: Option<&str>) -> Option<String> {
    value
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(str::to_string)
}

/// "6-7" (feet-inches) to total inches.
pub(crate) fn parse_height_inches(raw: Option<&str>) -> Option<i32> {
    let raw = raw?.trim();
    let mut parts = raw.split('-');
    let feet: i32 = parts.next()?.trim().parse().ok()?;
    let inches: i32 = match parts.next() {
        Some(p) => p.trim().parse().ok()?,
        None => 0,
    };
    Some(feet * 12 + inches)
}

pub(crate) fn parse_weight_pounds(raw: Option<&str>) -> Option<i32> {
    raw?.trim().parse().ok()
}

pub async fn upsert_team(pool: &PgPool, team: &ApiTeam) -> Result<()> {
    if team.id == 0 {
        return Err(anyhow!("team payload missing id"));
    }
    sqlx::query(
        r#"
        INSERT INTO teams (id, name, short_name, abbreviation, conference, division, city)
        VALUES ($1, $2, $3, $4, $5, $6, $7)
        ON CONFLICT (id) DO UPDATE SET
            name         = COALESCE(EXCLUDED.name, teams.name),
            short_name   = COALESCE(EXCLUDED.short_name, teams.short_name),
            abbreviation = COALESCE(EXCLUDED.abbreviation, teams.abbreviation),
            conference   = COALESCE(EXCLUDED.conference, teams.conference),
            division     = COALESCE(EXCLUDED.division, teams.division),
            city         = COALESCE(EXCLUDED.city, teams.city)
        "#,
    )
    .bind(team.id)
    .bind(team.display_name())
    .bind(none_if_empty(team.name.as_deref()))
    .bind(none_if_empty(team.abbreviation.as_deref()))
    .bind(none_if_empty(team.conference.as_deref()))
    .bind(none_if_empty(team.division.as_deref()))
    .bind(none_if_empty(team.city.as_deref()))
    .execute(pool)
    .await?;
    Ok(())
}

/// Placeholder row so foreign keys hold until the teams adapter fills it in.
pub async fn ensure_team_stub(pool: &PgPool, team_id: i64) -> Result<()> {
    sqlx::query(
        r#"
        INSERT INTO teams (id, name)
        VALUES ($1, $2)
        ON CONFLICT (id) DO NOTHING
        "#,
    )
    .bind(team_id)
    .bind(format!("Team {}", team_id))
    .execute(pool)
    .await?;
    Ok(())
}

/// Upsert a player. `team_id_override` wins over whatever the payload
/// carries; box-score rows know the team from the stat, not the player.
pub async fn upsert_player(
    pool: &PgPool,
    player: &ApiPlayer,
    team_id_override: Option<i64>,
) -> Result<()> {
    if player.id == 0 {
        return Err(anyhow!("player payload missing id"));
    }
    let team_id = team_id_override
        .or(player.team_id)
        .or_else(|| player.team.as_ref().map(|t| t.id));

    sqlx::query(
        r#"
        INSERT INTO players
            (id, name, team_id, position, height_in, weight_lb,
             jersey_number, college, country,
             draft_round, draft_number, draft_year, active)
        VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12, TRUE)
        ON CONFLICT (id) DO UPDATE SET
            name          = EXCLUDED.name,
            team_id       = COALESCE(EXCLUDED.team_id, players.team_id),
            position      = COALESCE(EXCLUDED.position, players.position),
            height_in     = COALESCE(EXCLUDED.height_in, players.height_in),
            weight_lb     = COALESCE(EXCLUDED.weight_lb, players.weight_lb),
            jersey_number = COALESCE(EXCLUDED.jersey_number, players.jersey_number),
            college       = COALESCE(EXCLUDED.college, players.college),
            country       = COALESCE(EXCLUDED.country, players.country),
            draft_round   = COALESCE(EXCLUDED.draft_round, players.draft_round),
            draft_number  = COALESCE(EXCLUDED.draft_number, players.draft_number),
            draft_year    = COALESCE(EXCLUDED.draft_year, players.draft_year),
            active        = TRUE
        "#,
    )
    .bind(player.id)
    .bind(player.full_name())
    .bind(team_id)
    .bind(none_if_empty(player.position.as_deref()))
    .bind(parse_height_inches(player.height.as_deref()))
    .bind(parse_weight_pounds(player.weight.as_deref()))
    .bind(none_if_empty(player.jersey_number.as_deref()))
    .bind(none_if_empty(player.college.as_deref()))
    .bind(none_if_empty(player.country.as_deref()))
    .bind(player.draft_round)
    .bind(player.draft_number)
    .bind(player.draft_year)
    .execute(pool)
    .await?;
    Ok(())
}

/// Placeholder player row so prop rows can reference ids the players
/// adapter has not seen yet.
pub async fn ensure_player_stub(pool: &PgPool, player_id: i64) -> Result<()> {
    sqlx::query(
        r#"
        INSERT INTO players (id, name, active)
        VALUES ($1, $2, TRUE)
        ON CONFLICT (id) DO NOTHING
        "#,
    )
    .bind(player_id)
    .bind(format!("Player {}", player_id))
    .execute(pool)
    .await?;
    Ok(())
}

pub async fn ensure_calendar_day(
    pool: &PgPool,
    day: NaiveDate,
    season: Option<i32>,
    postseason: bool,
) -> Result<()> {
    sqlx::query(
        r#"
        INSERT INTO calendar (date, year, month, day, week, day_of_week, season, playoffs)
        VALUES ($1, $2, $3, $4, $5, $6, $7, $8)
        ON CONFLICT (date) DO NOTHING
        "#,
    )
    .bind(day)
    .bind(day.year())
    .bind(day.month() as i32)
    .bind(day.day() as i32)
    .bind(day.iso_week().week() as i32)
    .bind(day.weekday().number_from_monday() as i32)
    .bind(season)
    .bind(postseason)
    .execute(pool)
    .await?;
    Ok(())
}

/// Minimal games row from a stat-embedded game object; the games adapter
/// enriches it later with scores, quarters, and status.
pub async fn ensure_game_stub(pool: &PgPool, game: &ApiGame) -> Result<NaiveDate> {
    let date = game.game_date()?;
    let home_id = game
        .home_id()
        .ok_or_else(|| anyhow!("game {} has no home team id", game.id))?;
    let visitor_id = game
        .visitor_id()
        .ok_or_else(|| anyhow!("game {} has no visitor team id", game.id))?;

    ensure_calendar_day(pool, date, game.season, game.postseason).await?;
    ensure_team_stub(pool, home_id).await?;
    ensure_team_stub(pool, visitor_id).await?;

    sqlx::query(
        r#"
        INSERT INTO games (id, date, home_team_id, away_team_id, season, postseason)
        VALUES ($1, $2, $3, $4, $5, $6)
        ON CONFLICT (id) DO NOTHING
        "#,
    )
    .bind(game.id)
    .bind(date)
    .bind(home_id)
    .bind(visitor_id)
    .bind(game.season)
    .bind(game.postseason)
    .execute(pool)
    .await?;
    Ok(date)
}

pub async fn team_ids(pool: &PgPool) -> Result<Vec<i64>> {
    let rows: Vec<(i64,)> = sqlx::query_as("SELECT id FROM teams ORDER BY id")
        .fetch_all(pool)
        .await?;
    Ok(rows.into_iter().map(|(id,)| id).collect())
}

/// Players that appear in the season-contract table; the aggregate-contract
/// endpoint is queried per player, so this bounds the fetch set.
pub async fn players_with_contracts(pool: &PgPool) -> Result<Vec<i64>> {
    let rows: Vec<(i64,)> =
        sqlx::query_as("SELECT DISTINCT player_id FROM player_contracts ORDER BY player_id")
            .fetch_all(pool)
            .await?;
    Ok(rows.into_iter().map(|(id,)| id).collect())
}

pub async fn game_ids_between(pool: &PgPool, range: &DateRange) -> Result<Vec<i64>> {
    let rows: Vec<(i64,)> = sqlx::query_as(
        "SELECT id FROM games WHERE date BETWEEN $1 AND $2 ORDER BY date, id",
    )
    .bind(range.start)
    .bind(range.end)
    .fetch_all(pool)
    .await?;
    Ok(rows.into_iter().map(|(id,)| id).collect())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn height_parses_feet_and_inches() {
        assert_eq!(parse_height_inches(Some("6-7")), Some(79));
        assert_eq!(parse_height_inches(Some("7-0")), Some(84));
        assert_eq!(parse_height_inches(Some("6")), Some(72));
        assert_eq!(parse_height_inches(Some("")), None);
        assert_eq!(parse_height_inches(Some("tall")), None);
        assert_eq!(parse_height_inches(None), None);
    }

    #[test]
    fn weight_parses_pounds() {
        assert_eq!(parse_weight_pounds(Some("220")), Some(220));
        assert_eq!(parse_weight_pounds(Some(" 185 ")), Some(185));
        assert_eq!(parse_weight_pounds(Some("")), None);
        assert_eq!(parse_weight_pounds(None), None);
    }

    #[test]
    fn empty_strings_become_null() {
        assert_eq!(none_if_empty(Some("")), None);
        assert_eq!(none_if_empty(Some("  ")), None);
        assert_eq!(none_if_empty(Some("GSW")), Some("GSW".to_string()));
        assert_eq!(none_if_empty(None), None);
    }
}
