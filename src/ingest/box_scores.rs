//! Per-player box scores: /v1/stats per day, into `player_game_stats`.
//!
//! Minutes arrive as "MM:SS" strings and are stored as fractional minutes.
//! DraftKings/FanDuel fantasy points are derived here, at ingest time, so
//! the aggregation engine can treat them as plain summable columns.

use crate::api::models::ApiStat;
use crate::context::AppContext;
use crate::ingest::IngestSummary;
use crate::scope::DateRange;
use crate::store;
use anyhow::Result;
use chrono::NaiveDate;
use sqlx::PgPool;
use tracing::{info, warn};

/// "34:22" to 34.37 minutes. Empty or malformed strings count as no time
/// played; missing numeric inputs always sum as zero.
pub(crate) fn parse_minutes(raw: Option<&str>) -> f64 {
    let Some(raw) = raw else { return 0.0 };
    let raw = raw.trim();
    if raw.is_empty() {
        return 0.0;
    }
    let mut parts = raw.split(':');
    let mins: i64 = match parts.next().and_then(|p| p.trim().parse().ok()) {
        Some(m) => m,
        None => return 0.0,
    };
    let secs: i64 = parts
        .next()
        .and_then(|p| p.trim().parse().ok())
        .unwrap_or(0);
    mins as f64 + secs as f64 / 60.0
}

/// DraftKings-style NBA scoring with double-double / triple-double bonuses.
pub(crate) fn dk_fantasy_points(pts: i32, reb: i32, ast: i32, stl: i32, blk: i32, tov: i32) -> f64 {
    let base = pts as f64
        + 1.25 * reb as f64
        + 1.5 * ast as f64
        + 2.0 * stl as f64
        + 2.0 * blk as f64
        - 0.5 * tov as f64;

    let cats_10 = [pts, reb, ast, stl, blk]
        .iter()
        .filter(|&&v| v >= 10)
        .count();
    let mut bonus = 0.0;
    if cats_10 >= 2 {
        bonus += 1.5;
    }
    if cats_10 >= 3 {
        bonus += 3.0;
    }
    base + bonus
}

/// FanDuel-style NBA scoring.
pub(crate) fn fd_fantasy_points(pts: i32, reb: i32, ast: i32, stl: i32, blk: i32, tov: i32) -> f64 {
    pts as f64 + 1.2 * reb as f64 + 1.5 * ast as f64 + 3.0 * stl as f64 + 3.0 * blk as f64
        - tov as f64
}

pub async fn run(ctx: &AppContext, range: &DateRange) -> Result<IngestSummary> {
    let mut summary = IngestSummary::default();

    for day in range.days() {
        match ingest_day(ctx, day).await {
            Ok(day_summary) => summary.absorb(day_summary),
            Err(e) => {
                warn!("Box-score ingest for {} failed, skipping day: {:?}", day, e);
                summary.failed_units += 1;
            }
        }
    }

    info!("Box-score ingest complete for {}: {}", range, summary);
    Ok(summary)
}

async fn ingest_day(ctx: &AppContext, day: NaiveDate) -> Result<IngestSummary> {
    let stats = ctx.api.stats_for_date(day).await?;

    let mut summary = IngestSummary {
        fetched: stats.len(),
        ..Default::default()
    };

    for stat in &stats {
        store::ensure_game_stub(&ctx.db, &stat.game).await?;
        store::upsert_team(&ctx.db, &stat.team).await?;
        store::upsert_player(&ctx.db, &stat.player, Some(stat.team.id)).await?;
        insert_stat(&ctx.db, stat).await?;
        summary.written += 1;
    }

    Ok(summary)
}

async fn insert_stat(pool: &PgPool, stat: &ApiStat) -> Result<()> {
    let team_id = stat.team.id;
    let home_id = stat.game.home_id().unwrap_or_default();
    let away_id = stat.game.visitor_id().unwrap_or_default();
    let opponent_id = if team_id == home_id { away_id } else { home_id };

    let pts = stat.pts.unwrap_or(0);
    let reb = stat.reb.unwrap_or(0);
    let ast = stat.ast.unwrap_or(0);
    let stl = stat.stl.unwrap_or(0);
    let blk = stat.blk.unwrap_or(0);
    let tov = stat.turnover.unwrap_or(0);

    sqlx::query(
        r#"
        INSERT INTO player_game_stats
            (player_id, game_id, team_id, opponent_id, minutes,
             pts, reb, oreb, dreb, ast, stl, blk, pf, tov,
             fgm, fga, fg3m, fg3a, ftm, fta,
             fg_pct, fg3_pct, ft_pct,
             fantasy_dk, fantasy_fd)
        VALUES
            ($1, $2, $3, $4, $5,
             $6, $7, $8, $9, $10, $11, $12, $13, $14,
             $15, $16, $17, $18, $19, $20,
             $21, $22, $23,
             $24, $25)
        ON CONFLICT (player_id, game_id) DO NOTHING
        "#,
    )
    .bind(stat.player.id)
    .bind(stat.game.id)
    .bind(team_id)
    .bind(opponent_id)
    .bind(parse_minutes(stat.min.as_deref()))
    .bind(pts)
    .bind(reb)
    .bind(stat.oreb.unwrap_or(0))
    .bind(stat.dreb.unwrap_or(0))
    .bind(ast)
    .bind(stl)
    .bind(blk)
    .bind(stat.pf.unwrap_or(0))
    .bind(tov)
    .bind(stat.fgm.unwrap_or(0))
    .bind(stat.fga.unwrap_or(0))
    .bind(stat.fg3m.unwrap_or(0))
    .bind(stat.fg3a.unwrap_or(0))
    .bind(stat.ftm.unwrap_or(0))
    .bind(stat.fta.unwrap_or(0))
    .bind(stat.fg_pct.unwrap_or(0.0))
    .bind(stat.fg3_pct.unwrap_or(0.0))
    .bind(stat.ft_pct.unwrap_or(0.0))
    .bind(dk_fantasy_points(pts, reb, ast, stl, blk, tov))
    .bind(fd_fantasy_points(pts, reb, ast, stl, blk, tov))
    .execute(pool)
    .await?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn minutes_parse_mm_ss() {
        assert!((parse_minutes(Some("34:22")) - 34.366666).abs() < 1e-4);
        assert_eq!(parse_minutes(Some("36")), 36.0);
        assert_eq!(parse_minutes(Some("0:00")), 0.0);
        assert_eq!(parse_minutes(Some("")), 0.0);
        assert_eq!(parse_minutes(Some("DNP")), 0.0);
        assert_eq!(parse_minutes(None), 0.0);
    }

    #[test]
    fn dk_base_scoring() {
        // 20 pts, 5 reb, 4 ast, 1 stl, 0 blk, 2 tov: no bonus categories.
        let pts = dk_fantasy_points(20, 5, 4, 1, 0, 2);
        assert!((pts - (20.0 + 6.25 + 6.0 + 2.0 - 1.0)).abs() < 1e-9);
    }

    #[test]
    fn dk_double_double_bonus() {
        let without = dk_fantasy_points(10, 9, 3, 0, 0, 0);
        let with = dk_fantasy_points(10, 10, 3, 0, 0, 0);
        // The extra rebound is worth 1.25 plus the 1.5 double-double bonus.
        assert!((with - without - 1.25 - 1.5).abs() < 1e-9);
    }

    #[test]
    fn dk_triple_double_bonus() {
        // 10/10/10 earns both the double-double and triple-double bonuses.
        let pts = dk_fantasy_points(10, 10, 10, 0, 0, 0);
        let base = 10.0 + 12.5 + 15.0;
        assert!((pts - (base + 1.5 + 3.0)).abs() < 1e-9);
    }

    #[test]
    fn fd_scoring() {
        let pts = fd_fantasy_points(20, 5, 4, 1, 1, 2);
        assert!((pts - (20.0 + 6.0 + 6.0 + 3.0 + 3.0 - 2.0)).abs() < 1e-9);
    }
}
