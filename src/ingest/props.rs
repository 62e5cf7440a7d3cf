//! Player props: /v2/odds/player_props per game, for every game already in
//! the warehouse for the date range. A 404 from the endpoint means the game
//! has no props market, not an error.

use crate::api::models::ApiProp;
use crate::context::AppContext;
use crate::ingest::IngestSummary;
use crate::scope::DateRange;
use crate::store;
use anyhow::Result;
use sqlx::PgPool;
use tracing::{info, warn};

pub async fn run(ctx: &AppContext, range: &DateRange) -> Result<IngestSummary> {
    let game_ids = store::game_ids_between(&ctx.db, range).await?;
    info!("Found {} games in {} for props ingest", game_ids.len(), range);

    let mut summary = IngestSummary::default();

    for game_id in game_ids {
        match ingest_game(ctx, game_id).await {
            Ok(game_summary) => summary.absorb(game_summary),
            Err(e) => {
                warn!("Props ingest for game {} failed, skipping: {:?}", game_id, e);
                summary.failed_units += 1;
            }
        }
    }

    info!("Props ingest complete for {}: {}", range, summary);
    Ok(summary)
}

async fn ingest_game(ctx: &AppContext, game_id: i64) -> Result<IngestSummary> {
    let props = ctx.api.props_for_game(game_id).await?;

    let mut summary = IngestSummary {
        fetched: props.len(),
        ..Default::default()
    };

    for prop in &props {
        store::ensure_player_stub(&ctx.db, prop.player_id).await?;
        upsert_prop(&ctx.db, prop).await?;
        summary.written += 1;
    }

    Ok(summary)
}

async fn upsert_prop(pool: &PgPool, prop: &ApiProp) -> Result<()> {
    let market_type = prop.market.as_ref().and_then(|m| m.market_type.as_deref());

    // Over/under markets carry two prices, milestone markets one.
    let (over_odds, under_odds, milestone_odds) = match (market_type, prop.market.as_ref()) {
        (Some("over_under"), Some(m)) => (m.over_odds, m.under_odds, None),
        (Some("milestone"), Some(m)) => (None, None, m.odds),
        _ => (None, None, None),
    };

    sqlx::query(
        r#"
        INSERT INTO player_props
            (prop_id, game_id, player_id, vendor,
             prop_type, line_value, market_type,
             over_odds, under_odds, milestone_odds, updated_at)
        VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11)
        ON CONFLICT (prop_id) DO UPDATE SET
            game_id        = EXCLUDED.game_id,
            player_id      = EXCLUDED.player_id,
            vendor         = EXCLUDED.vendor,
            prop_type      = EXCLUDED.prop_type,
            line_value     = EXCLUDED.line_value,
            market_type    = EXCLUDED.market_type,
            over_odds      = EXCLUDED.over_odds,
            under_odds     = EXCLUDED.under_odds,
            milestone_odds = EXCLUDED.milestone_odds,
            updated_at     = EXCLUDED.updated_at
        "#,
    )
    .bind(prop.id)
    .bind(prop.game_id)
    .bind(prop.player_id)
    .bind(prop.vendor.as_deref())
    .bind(prop.prop_type.as_deref())
    .bind(crate::ingest::odds::parse_line(prop.line_value.as_deref()))
    .bind(market_type)
    .bind(over_odds)
    .bind(under_odds)
    .bind(milestone_odds)
    .bind(prop.updated_at)
    .execute(pool)
    .await?;
    Ok(())
}
