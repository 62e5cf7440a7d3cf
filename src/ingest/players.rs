//! Players dimension: every page of /v1/players with full metadata.

use crate::context::AppContext;
use crate::ingest::IngestSummary;
use crate::store;
use anyhow::Result;
use tracing::info;

pub async fn run(ctx: &AppContext) -> Result<IngestSummary> {
    let players = ctx.api.players().await?;

    let mut summary = IngestSummary {
        fetched: players.len(),
        ..Default::default()
    };

    for player in &players {
        if let Some(team) = &player.team {
            store::upsert_team(&ctx.db, team).await?;
        }
        store::upsert_player(&ctx.db, player, None).await?;
        summary.written += 1;
    }

    info!("Players ingest complete: {}", summary);
    Ok(summary)
}
