//! Per-player advanced metrics: /v1/stats/advanced per day. Also enriches
//! the games table with scores when the games adapter has not run yet for
//! that day (COALESCE semantics, never overwriting known values with NULL).

use crate::api::models::{ApiAdvancedStat, ApiGame};
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
                warn!("Advanced-stats ingest for {} failed, skipping day: {:?}", day, e);
                summary.failed_units += 1;
            }
        }
    }

    info!("Advanced-stats ingest complete for {}: {}", range, summary);
    Ok(summary)
}

async fn ingest_day(ctx: &AppContext, day: NaiveDate) -> Result<IngestSummary> {
    let rows = ctx.api.advanced_stats_for_date(day).await?;

    let mut summary = IngestSummary {
        fetched: rows.len(),
        ..Default::default()
    };

    for adv in &rows {
        store::upsert_team(&ctx.db, &adv.team).await?;
        enrich_game(&ctx.db, &adv.game).await?;
        store::upsert_player(&ctx.db, &adv.player, Some(adv.team.id)).await?;
        upsert_advanced(&ctx.db, adv).await?;
        summary.written += 1;
    }

    Ok(summary)
}

async fn enrich_game(pool: &PgPool, game: &ApiGame) -> Result<()> {
    let date = game.game_date()?;
    let home_id = game
        .home_id()
        .ok_or_else(|| anyhow!("game {} has no home team id", game.id))?;
    let visitor_id = game
        .visitor_id()
        .ok_or_else(|| anyhow!("game {} has no visitor team id", game.id))?;

    store::ensure_calendar_day(pool, date, game.season, game.postseason).await?;
    store::ensure_team_stub(pool, home_id).await?;
    store::ensure_team_stub(pool, visitor_id).await?;

    sqlx::query(
        r#"
        INSERT INTO games
            (id, date, home_team_id, away_team_id, season, postseason,
             home_score, visitor_score, status, period)
        VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10)
        ON CONFLICT (id) DO UPDATE SET
            date          = EXCLUDED.date,
            home_team_id  = EXCLUDED.home_team_id,
            away_team_id  = EXCLUDED.away_team_id,
            season        = COALESCE(EXCLUDED.season, games.season),
            home_score    = GREATEST(EXCLUDED.home_score, games.home_score),
            visitor_score = GREATEST(EXCLUDED.visitor_score, games.visitor_score),
            status        = COALESCE(EXCLUDED.status, games.status),
            period        = GREATEST(EXCLUDED.period, games.period)
        "#,
    )
    .bind(game.id)
    .bind(date)
    .bind(home_id)
    .bind(visitor_id)
    .bind(game.season)
    .bind(game.postseason)
    .bind(game.home_team_score.unwrap_or(0))
    .bind(game.visitor_team_score.unwrap_or(0))
    .bind(game.status.as_deref())
    .bind(game.period.unwrap_or(0))
    .execute(pool)
    .await?;
    Ok(())
}

async fn upsert_advanced(pool: &PgPool, adv: &ApiAdvancedStat) -> Result<()> {
    sqlx::query(
        r#"
        INSERT INTO player_advanced_stats
            (player_id, game_id, team_id,
             pie, pace,
             assist_percentage, assist_ratio, assist_to_turnover,
             defensive_rating, defensive_rebound_percentage,
             effective_field_goal_percentage, net_rating,
             offensive_rating, offensive_rebound_percentage,
             rebound_percentage, true_shooting_percentage,
             turnover_ratio, usage_percentage)
        VALUES
            ($1, $2, $3,
             $4, $5,
             $6, $7, $8,
             $9, $10,
             $11, $12,
             $13, $14,
             $15, $16,
             $17, $18)
        ON CONFLICT (player_id, game_id) DO UPDATE SET
            team_id                          = EXCLUDED.team_id,
            pie                              = EXCLUDED.pie,
            pace                             = EXCLUDED.pace,
            assist_percentage                = EXCLUDED.assist_percentage,
            assist_ratio                     = EXCLUDED.assist_ratio,
            assist_to_turnover               = EXCLUDED.assist_to_turnover,
            defensive_rating                 = EXCLUDED.defensive_rating,
            defensive_rebound_percentage     = EXCLUDED.defensive_rebound_percentage,
            effective_field_goal_percentage  = EXCLUDED.effective_field_goal_percentage,
            net_rating                       = EXCLUDED.net_rating,
            offensive_rating                 = EXCLUDED.offensive_rating,
            offensive_rebound_percentage     = EXCLUDED.offensive_rebound_percentage,
            rebound_percentage               = EXCLUDED.rebound_percentage,
            true_shooting_percentage         = EXCLUDED.true_shooting_percentage,
            turnover_ratio                   = EXCLUDED.turnover_ratio,
            usage_percentage                 = EXCLUDED.usage_percentage
        "#,
    )
    .bind(adv.player.id)
    .bind(adv.game.id)
    .bind(adv.team.id)
    .bind(adv.pie)
    .bind(adv.pace)
    .bind(adv.assist_percentage)
    .bind(adv.assist_ratio)
    .bind(adv.assist_to_turnover)
    .bind(adv.defensive_rating)
    .bind(adv.defensive_rebound_percentage)
    .bind(adv.effective_field_goal_percentage)
    .bind(adv.net_rating)
    .bind(adv.offensive_rating)
    .bind(adv.offensive_rebound_percentage)
    .bind(adv.rebound_percentage)
    .bind(adv.true_shooting_percentage)
    .bind(adv.turnover_ratio)
    .bind(adv.usage_percentage)
    .execute(pool)
    .await?;
    Ok(())
}
