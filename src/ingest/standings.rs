//! Season standings: /v1/standings?season=Y, upserted by (team_id, season).

use crate::api::models::ApiStanding;
use crate::context::AppContext;
use crate::ingest::IngestSummary;
use crate::store;
use anyhow::Result;
use sqlx::PgPool;
use tracing::{info, warn};

pub async fn run(ctx: &AppContext, seasons: &[i32]) -> Result<IngestSummary> {
    let mut summary = IngestSummary::default();

    for &season in seasons {
        match ingest_season(ctx, season).await {
            Ok(season_summary) => summary.absorb(season_summary),
            Err(e) => {
                warn!("Standings ingest for season {} failed, skipping: {:?}", season, e);
                summary.failed_units += 1;
            }
        }
    }

    info!("Standings ingest complete: {}", summary);
    Ok(summary)
}

async fn ingest_season(ctx: &AppContext, season: i32) -> Result<IngestSummary> {
    let standings = ctx.api.standings(season).await?;

    let mut summary = IngestSummary {
        fetched: standings.len(),
        ..Default::default()
    };

    for standing in &standings {
        store::upsert_team(&ctx.db, &standing.team).await?;
        upsert_standing(&ctx.db, standing, season).await?;
        summary.written += 1;
    }

    Ok(summary)
}

async fn upsert_standing(pool: &PgPool, standing: &ApiStanding, season: i32) -> Result<()> {
    sqlx::query(
        r#"
        INSERT INTO team_standings
            (team_id, season,
             conference_record, conference_rank,
             division_record, division_rank,
             wins, losses, home_record, road_record)
        VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10)
        ON CONFLICT (team_id, season) DO UPDATE SET
            conference_record = EXCLUDED.conference_record,
            conference_rank   = EXCLUDED.conference_rank,
            division_record   = EXCLUDED.division_record,
            division_rank     = EXCLUDED.division_rank,
            wins              = EXCLUDED.wins,
            losses            = EXCLUDED.losses,
            home_record       = EXCLUDED.home_record,
            road_record       = EXCLUDED.road_record
        "#,
    )
    .bind(standing.team.id)
    .bind(standing.season.unwrap_or(season))
    .bind(standing.conference_record.as_deref())
    .bind(standing.conference_rank)
    .bind(standing.division_record.as_deref())
    .bind(standing.division_rank)
    .bind(standing.wins)
    .bind(standing.losses)
    .bind(standing.home_record.as_deref())
    .bind(standing.road_record.as_deref())
    .execute(pool)
    .await?;
    Ok(())
}
