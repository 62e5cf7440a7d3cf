//! Games: /v1/games per day in the range, upserted with quarter and OT
//! splits. In-progress games are re-upserted with fresh scores on every run.

use crate::api::models::ApiGame;
use crate::context::AppContext;
use crate::ingest::IngestSummary;
use crate::scope::DateRange;
use crate::store;
use anyhow::{anyhow, Result};
use chrono::NaiveDate;
use sqlx::PgPool;
use tracing::{info, warn};

pub async fn run(ctx: &AppContext, range: &DateRange) -> Result<IngestSummary> {
    let mut summary = IngestSummary::default();

    for day in range.days() {
        match ingest_day(ctx, day).await {
            Ok(day_summary) => summary.absorb(day_summary),
            Err(e) => {
                warn!("Games ingest for {} failed, skipping day: {:?}", day, e);
                summary.failed_units += 1;
            }
        }
    }

    info!("Games ingest complete for {}: {}", range, summary);
    Ok(summary)
}

async fn ingest_day(ctx: &AppContext, day: NaiveDate) -> Result<IngestSummary> {
    let games = ctx.api.games_for_date(day).await?;

    let mut summary = IngestSummary {
        fetched: games.len(),
        ..Default::default()
    };

    for game in &games {
        upsert_game(&ctx.db, game).await?;
        summary.written += 1;
    }

    Ok(summary)
}

async fn upsert_game(pool: &PgPool, game: &ApiGame) -> Result<()> {
    let date = game.game_date()?;
    let home = game
        .home_team
        .as_ref()
        .ok_or_else(|| anyhow!("game {} missing home team", game.id))?;
    let visitor = game
        .visitor_team
        .as_ref()
        .ok_or_else(|| anyhow!("game {} missing visitor team", game.id))?;

    store::ensure_calendar_day(pool, date, game.season, game.postseason).await?;
    store::upsert_team(pool, home).await?;
    store::upsert_team(pool, visitor).await?;

    sqlx::query(
        r#"
        INSERT INTO games
            (id, date, home_team_id, away_team_id, season, postseason,
             home_score, visitor_score, status, period, tipoff, game_clock,
             home_q1, home_q2, home_q3, home_q4,
             home_ot1, home_ot2, home_ot3,
             home_timeouts_remaining, home_in_bonus,
             visitor_q1, visitor_q2, visitor_q3, visitor_q4,
             visitor_ot1, visitor_ot2, visitor_ot3,
             visitor_timeouts_remaining, visitor_in_bonus)
        VALUES
            ($1, $2, $3, $4, $5, $6,
             $7, $8, $9, $10, $11, $12,
             $13, $14, $15, $16,
             $17, $18, $19,
             $20, $21,
             $22, $23, $24, $25,
             $26, $27, $28,
             $29, $30)
        ON CONFLICT (id) DO UPDATE SET
            date          = EXCLUDED.date,
            home_team_id  = EXCLUDED.home_team_id,
            away_team_id  = EXCLUDED.away_team_id,
            season        = EXCLUDED.season,
            postseason    = EXCLUDED.postseason,
            home_score    = EXCLUDED.home_score,
            visitor_score = EXCLUDED.visitor_score,
            status        = EXCLUDED.status,
            period        = EXCLUDED.period,
            tipoff        = EXCLUDED.tipoff,
            game_clock    = EXCLUDED.game_clock,
            home_q1       = EXCLUDED.home_q1,
            home_q2       = EXCLUDED.home_q2,
            home_q3       = EXCLUDED.home_q3,
            home_q4       = EXCLUDED.home_q4,
            home_ot1      = EXCLUDED.home_ot1,
            home_ot2      = EXCLUDED.home_ot2,
            home_ot3      = EXCLUDED.home_ot3,
            home_timeouts_remaining    = EXCLUDED.home_timeouts_remaining,
            home_in_bonus = EXCLUDED.home_in_bonus,
            visitor_q1    = EXCLUDED.visitor_q1,
            visitor_q2    = EXCLUDED.visitor_q2,
            visitor_q3    = EXCLUDED.visitor_q3,
            visitor_q4    = EXCLUDED.visitor_q4,
            visitor_ot1   = EXCLUDED.visitor_ot1,
            visitor_ot2   = EXCLUDED.visitor_ot2,
            visitor_ot3   = EXCLUDED.visitor_ot3,
            visitor_timeouts_remaining = EXCLUDED.visitor_timeouts_remaining,
            visitor_in_bonus           = EXCLUDED.visitor_in_bonus
        "#,
    )
    .bind(game.id)
    .bind(date)
    .bind(home.id)
    .bind(visitor.id)
    .bind(game.season)
    .bind(game.postseason)
    .bind(game.home_team_score.unwrap_or(0))
    .bind(game.visitor_team_score.unwrap_or(0))
    .bind(game.status.as_deref())
    .bind(game.period.unwrap_or(0))
    .bind(game.datetime)
    .bind(game.time.as_deref())
    .bind(game.home_q1)
    .bind(game.home_q2)
    .bind(game.home_q3)
    .bind(game.home_q4)
    .bind(game.home_ot1)
    .bind(game.home_ot2)
    .bind(game.home_ot3)
    .bind(game.home_timeouts_remaining)
    .bind(game.home_in_bonus)
    .bind(game.visitor_q1)
    .bind(game.visitor_q2)
    .bind(game.visitor_q3)
    .bind(game.visitor_q4)
    .bind(game.visitor_ot1)
    .bind(game.visitor_ot2)
    .bind(game.visitor_ot3)
    .bind(game.visitor_timeouts_remaining)
    .bind(game.visitor_in_bonus)
    .execute(pool)
    .await?;
    Ok(())
}
