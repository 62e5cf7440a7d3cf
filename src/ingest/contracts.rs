//! Player contracts: /v1/contracts/teams per (team, season), for every team
//! already in the warehouse. Teams without published contracts 404 and are
//! skipped quietly.

use crate::api::models::ApiContract;
use crate::context::AppContext;
use crate::ingest::IngestSummary;
use crate::store;
use anyhow::Result;
use sqlx::PgPool;
use tracing::{info, warn};

pub async fn run(ctx: &AppContext, seasons: &[i32]) -> Result<IngestSummary> {
    let team_ids = store::team_ids(&ctx.db).await?;
    info!("Found {} teams for contracts ingest", team_ids.len());

    let mut summary = IngestSummary::default();

    for &season in seasons {
        for &team_id in &team_ids {
            match ingest_team_season(ctx, team_id, season).await {
                Ok(unit) => summary.absorb(unit),
                Err(e) => {
                    warn!(
                        "Contracts ingest for team {} season {} failed, skipping: {:?}",
                        team_id, season, e
                    );
                    summary.failed_units += 1;
                }
            }
        }
    }

    info!("Contracts ingest complete: {}", summary);
    Ok(summary)
}

async fn ingest_team_season(ctx: &AppContext, team_id: i64, season: i32) -> Result<IngestSummary> {
    let contracts = ctx.api.team_contracts(team_id, season).await?;

    let mut summary = IngestSummary {
        fetched: contracts.len(),
        ..Default::default()
    };

    for contract in &contracts {
        if let Some(team) = &contract.team {
            store::upsert_team(&ctx.db, team).await?;
        } else {
            store::ensure_team_stub(&ctx.db, contract.team_id).await?;
        }
        if let Some(player) = &contract.player {
            store::upsert_player(&ctx.db, player, Some(contract.team_id)).await?;
        } else {
            store::ensure_player_stub(&ctx.db, contract.player_id).await?;
        }
        upsert_contract(&ctx.db, contract).await?;
        summary.written += 1;
    }

    Ok(summary)
}

async fn upsert_contract(pool: &PgPool, contract: &ApiContract) -> Result<()> {
    sqlx::query(
        r#"
        INSERT INTO player_contracts
            (contract_id, player_id, team_id, season,
             cap_hit, total_cash, base_salary, rank)
        VALUES ($1, $2, $3, $4, $5, $6, $7, $8)
        ON CONFLICT (contract_id) DO UPDATE SET
            player_id   = EXCLUDED.player_id,
            team_id     = EXCLUDED.team_id,
            season      = EXCLUDED.season,
            cap_hit     = EXCLUDED.cap_hit,
            total_cash  = EXCLUDED.total_cash,
            base_salary = EXCLUDED.base_salary,
            rank        = EXCLUDED.rank
        "#,
    )
    .bind(contract.id)
    .bind(contract.player_id)
    .bind(contract.team_id)
    .bind(contract.season)
    .bind(contract.cap_hit)
    .bind(contract.total_cash)
    .bind(contract.base_salary)
    .bind(contract.rank)
    .execute(pool)
    .await?;
    Ok(())
}
