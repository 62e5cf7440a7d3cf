//! Injury report: /v1/player_injuries is a current snapshot, so the table
//! is truncated and reloaded on every run rather than merged.

use crate::api::models::ApiInjury;
use crate::context::AppContext;
use crate::ingest::IngestSummary;
use crate::store;
use anyhow::Result;
use sqlx::PgPool;
use tracing::info;

pub async fn run(ctx: &AppContext) -> Result<IngestSummary> {
    let injuries = ctx.api.injuries().await?;

    sqlx::query("TRUNCATE TABLE player_injuries")
        .execute(&ctx.db)
        .await?;

    let mut summary = IngestSummary {
        fetched: injuries.len(),
        ..Default::default()
    };

    for injury in &injuries {
        store::upsert_player(&ctx.db, &injury.player, None).await?;
        insert_injury(&ctx.db, injury).await?;
        summary.written += 1;
    }

    info!("Injuries snapshot refreshed: {}", summary);
    Ok(summary)
}

async fn insert_injury(pool: &PgPool, injury: &ApiInjury) -> Result<()> {
    sqlx::query(
        r#"
        INSERT INTO player_injuries
            (player_id, team_id, status, return_date_text, description, pulled_at)
        VALUES ($1, $2, $3, $4, $5, NOW())
        ON CONFLICT (player_id) DO UPDATE SET
            team_id          = EXCLUDED.team_id,
            status           = EXCLUDED.status,
            return_date_text = EXCLUDED.return_date_text,
            description      = EXCLUDED.description,
            pulled_at        = EXCLUDED.pulled_at
        "#,
    )
    .bind(injury.player.id)
    .bind(injury.player.team_id)
    .bind(injury.status.as_deref())
    .bind(injury.return_date.as_deref())
    .bind(injury.description.as_deref())
    .execute(pool)
    .await?;
    Ok(())
}
