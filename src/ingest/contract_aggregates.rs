//! Whole-deal contract summaries: /v1/contracts/players/aggregate, queried
//! per player. Runs after the season-contracts adapter, which defines the
//! player set worth asking about; players without aggregate data 404 and are
//! skipped quietly.

use crate::api::models::ApiContractAggregate;
use crate::context::AppContext;
use crate::ingest::IngestSummary;
use crate::store;
use anyhow::Result;
use sqlx::PgPool;
use tracing::{info, warn};

pub async fn run(ctx: &AppContext) -> Result<IngestSummary> {
    let player_ids = store::players_with_contracts(&ctx.db).await?;
    info!(
        "Found {} players with contracts for aggregate ingest",
        player_ids.len()
    );

    let mut summary = IngestSummary::default();

    for player_id in player_ids {
        match ingest_player(ctx, player_id).await {
            Ok(unit) => summary.absorb(unit),
            Err(e) => {
                warn!(
                    "Contract-aggregate ingest for player {} failed, skipping: {:?}",
                    player_id, e
                );
                summary.failed_units += 1;
            }
        }
    }

    info!("Contract-aggregate ingest complete: {}", summary);
    Ok(summary)
}

async fn ingest_player(ctx: &AppContext, player_id: i64) -> Result<IngestSummary> {
    let aggregates = ctx.api.contract_aggregates_for_player(player_id).await?;

    let mut summary = IngestSummary {
        fetched: aggregates.len(),
        ..Default::default()
    };

    for agg in &aggregates {
        if let Some(team) = &agg.team {
            store::upsert_team(&ctx.db, team).await?;
        } else if let Some(team_id) = agg.team_id {
            store::ensure_team_stub(&ctx.db, team_id).await?;
        }
        if let Some(player) = &agg.player {
            store::upsert_player(&ctx.db, player, agg.team_id).await?;
        } else {
            store::ensure_player_stub(&ctx.db, agg.player_id).await?;
        }
        upsert_aggregate(&ctx.db, agg).await?;
        summary.written += 1;
    }

    Ok(summary)
}

async fn upsert_aggregate(pool: &PgPool, agg: &ApiContractAggregate) -> Result<()> {
    sqlx::query(
        r#"
        INSERT INTO player_contract_aggregates
            (aggregate_id, player_id, team_id,
             start_year, end_year,
             contract_type, contract_status, contract_years,
             total_value, average_salary,
             guaranteed_at_signing, total_guaranteed,
             signed_using, free_agent_year, free_agent_status,
             contract_notes)
        VALUES
            ($1, $2, $3,
             $4, $5,
             $6, $7, $8,
             $9, $10,
             $11, $12,
             $13, $14, $15,
             $16)
        ON CONFLICT (aggregate_id) DO UPDATE SET
            player_id             = EXCLUDED.player_id,
            team_id               = EXCLUDED.team_id,
            start_year            = EXCLUDED.start_year,
            end_year              = EXCLUDED.end_year,
            contract_type         = EXCLUDED.contract_type,
            contract_status       = EXCLUDED.contract_status,
            contract_years        = EXCLUDED.contract_years,
            total_value           = EXCLUDED.total_value,
            average_salary        = EXCLUDED.average_salary,
            guaranteed_at_signing = EXCLUDED.guaranteed_at_signing,
            total_guaranteed      = EXCLUDED.total_guaranteed,
            signed_using          = EXCLUDED.signed_using,
            free_agent_year       = EXCLUDED.free_agent_year,
            free_agent_status     = EXCLUDED.free_agent_status,
            contract_notes        = EXCLUDED.contract_notes
        "#,
    )
    .bind(agg.id)
    .bind(agg.player_id)
    .bind(agg.team_id)
    .bind(agg.start_year)
    .bind(agg.end_year)
    .bind(agg.contract_type.as_deref())
    .bind(agg.contract_status.as_deref())
    .bind(agg.contract_years)
    .bind(agg.total_value)
    .bind(agg.average_salary)
    .bind(agg.guaranteed_at_signing)
    .bind(agg.total_guaranteed)
    .bind(agg.signed_using.as_deref())
    .bind(agg.free_agent_year)
    .bind(agg.free_agent_status.as_deref())
    .bind(agg.contract_notes.as_deref())
    .execute(pool)
    .await?;
    Ok(())
}
