//! Game-level betting odds: /v2/odds per day, upserted by (game_id, vendor).
//! The API sends line values as strings; they are parsed leniently here and
//! stored as doubles.

use crate::api::models::ApiOdds;
use crate::context::AppContext;
use crate::ingest::IngestSummary;
use crate::scope::DateRange;
use anyhow::Result;
use chrono::NaiveDate;
use sqlx::PgPool;
use tracing::{info, warn};

/// "-7.5" -> Some(-7.5); anything unparseable -> None.
pub(crate) fn parse_line(raw: Option<&str>) -> Option<f64> {
    raw?.trim().parse().ok()
}

pub async fn run(ctx: &AppContext, range: &DateRange) -> Result<IngestSummary> {
    let mut summary = IngestSummary::default();

    for day in range.days() {
        match ingest_day(ctx, day).await {
            Ok(day_summary) => summary.absorb(day_summary),
            Err(e) => {
                warn!("Odds ingest for {} failed, skipping day: {:?}", day, e);
                summary.failed_units += 1;
            }
        }
    }

    info!("Odds ingest complete for {}: {}", range, summary);
    Ok(summary)
}

async fn ingest_day(ctx: &AppContext, day: NaiveDate) -> Result<IngestSummary> {
    let odds = ctx.api.odds_for_date(day).await?;

    let mut summary = IngestSummary {
        fetched: odds.len(),
        ..Default::default()
    };

    for row in &odds {
        upsert_odds(&ctx.db, row).await?;
        summary.written += 1;
    }

    Ok(summary)
}

async fn upsert_odds(pool: &PgPool, odds: &ApiOdds) -> Result<()> {
    sqlx::query(
        r#"
        INSERT INTO game_odds
            (game_id, vendor, odds_id,
             spread_home_value, spread_home_odds,
             spread_away_value, spread_away_odds,
             moneyline_home_odds, moneyline_away_odds,
             total_value, total_over_odds, total_under_odds,
             updated_at)
        VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12, $13)
        ON CONFLICT (game_id, vendor) DO UPDATE SET
            odds_id             = EXCLUDED.odds_id,
            spread_home_value   = EXCLUDED.spread_home_value,
            spread_home_odds    = EXCLUDED.spread_home_odds,
            spread_away_value   = EXCLUDED.spread_away_value,
            spread_away_odds    = EXCLUDED.spread_away_odds,
            moneyline_home_odds = EXCLUDED.moneyline_home_odds,
            moneyline_away_odds = EXCLUDED.moneyline_away_odds,
            total_value         = EXCLUDED.total_value,
            total_over_odds     = EXCLUDED.total_over_odds,
            total_under_odds    = EXCLUDED.total_under_odds,
            updated_at          = EXCLUDED.updated_at
        "#,
    )
    .bind(odds.game_id)
    .bind(&odds.vendor)
    .bind(odds.id)
    .bind(parse_line(odds.spread_home_value.as_deref()))
    .bind(odds.spread_home_odds)
    .bind(parse_line(odds.spread_away_value.as_deref()))
    .bind(odds.spread_away_odds)
    .bind(odds.moneyline_home_odds)
    .bind(odds.moneyline_away_odds)
    .bind(parse_line(odds.total_value.as_deref()))
    .bind(odds.total_over_odds)
    .bind(odds.total_under_odds)
    .bind(odds.updated_at)
    .execute(pool)
    .await?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn lines_parse_leniently() {
        assert_eq!(parse_line(Some("-7.5")), Some(-7.5));
        assert_eq!(parse_line(Some("228.5")), Some(228.5));
        assert_eq!(parse_line(Some(" 3 ")), Some(3.0));
        assert_eq!(parse_line(Some("PK")), None);
        assert_eq!(parse_line(Some("")), None);
        assert_eq!(parse_line(None), None);
    }
}
