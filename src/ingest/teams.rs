//! Teams dimension: one page from /v1/teams, upserted into `teams`.

use crate::context::AppContext;
use crate::ingest::IngestSummary;
use crate::store;
use anyhow::Result;
use tracing::info;

pub async fn run(ctx: &AppContext) -> Result<IngestSummary> {
    let teams = ctx.api.teams().await?;

    let mut summary = IngestSummary {
        fetched: teams.len(),
        ..Default::default()
    };

    for team in &teams {
        store::upsert_team(&ctx.db, team).await?;
        summary.written += 1;
    }

    info!("Teams ingest complete: {}", summary);
    Ok(summary)
}
