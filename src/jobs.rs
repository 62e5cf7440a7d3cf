//! Pipeline orchestration. The daily job and the full rebuild run every step
//! in-process and in order, so a dimension refresh always lands before the
//! facts that reference it.

use crate::aggregate;
use crate::context::AppContext;
use crate::ingest;
use crate::scope::{DateRange, Scope};
use anyhow::{Context, Result};
use chrono::NaiveDate;
use tracing::info;

/// Daily refresh: yesterday through today, so late finals and same-day
/// markets are both covered.
pub async fn daily(ctx: &AppContext, seasons: &[i32], today: NaiveDate) -> Result<()> {
    let yesterday = today.pred_opt().unwrap_or(today);
    let window = DateRange { start: yesterday, end: today };
    info!("Daily pipeline starting for {}", window);

    let players = ingest::players::run(ctx).await.context("players step")?;
    info!("daily: players {}", players);

    let games = ingest::games::run(ctx, &window).await.context("games step")?;
    info!("daily: games {}", games);

    let box_scores = ingest::box_scores::run(ctx, &window)
        .await
        .context("box scores step")?;
    info!("daily: box scores {}", box_scores);

    let agg = aggregate::aggregate(&ctx.db, Scope::Range(window))
        .await
        .context("aggregation step")?;
    info!(
        "daily: aggregated {} games into {} team rows",
        agg.games, agg.rows_written
    );

    let advanced = ingest::advanced::run(ctx, &window)
        .await
        .context("advanced stats step")?;
    info!("daily: advanced stats {}", advanced);

    let standings = ingest::standings::run(ctx, seasons)
        .await
        .context("standings step")?;
    info!("daily: standings {}", standings);

    let today_only = DateRange::single(today);
    let odds = ingest::odds::run(ctx, &today_only).await.context("odds step")?;
    info!("daily: odds {}", odds);

    let props = ingest::props::run(ctx, &today_only).await.context("props step")?;
    info!("daily: props {}", props);

    let injuries = ingest::injuries::run(ctx).await.context("injuries step")?;
    info!("daily: injuries {}", injuries);

    let contracts = ingest::contracts::run(ctx, seasons)
        .await
        .context("contracts step")?;
    info!("daily: contracts {}", contracts);

    let contract_aggs = ingest::contract_aggregates::run(ctx)
        .await
        .context("contract aggregates step")?;
    info!("daily: contract aggregates {}", contract_aggs);

    info!("Daily pipeline complete");
    Ok(())
}

/// Full rebuild: wipe every fact table, then reload the whole date range from
/// the API and recompute aggregates from scratch.
pub async fn rebuild(ctx: &AppContext, range: &DateRange, seasons: &[i32]) -> Result<()> {
    info!("Full rebuild starting for {}", range);

    wipe_facts(ctx).await.context("wiping fact tables")?;

    let teams = ingest::teams::run(ctx).await.context("teams step")?;
    info!("rebuild: teams {}", teams);

    let players = ingest::players::run(ctx).await.context("players step")?;
    info!("rebuild: players {}", players);

    let games = ingest::games::run(ctx, range).await.context("games step")?;
    info!("rebuild: games {}", games);

    let box_scores = ingest::box_scores::run(ctx, range)
        .await
        .context("box scores step")?;
    info!("rebuild: box scores {}", box_scores);

    let advanced = ingest::advanced::run(ctx, range)
        .await
        .context("advanced stats step")?;
    info!("rebuild: advanced stats {}", advanced);

    let standings = ingest::standings::run(ctx, seasons)
        .await
        .context("standings step")?;
    info!("rebuild: standings {}", standings);

    let odds = ingest::odds::run(ctx, range).await.context("odds step")?;
    info!("rebuild: odds {}", odds);

    let props = ingest::props::run(ctx, range).await.context("props step")?;
    info!("rebuild: props {}", props);

    let injuries = ingest::injuries::run(ctx).await.context("injuries step")?;
    info!("rebuild: injuries {}", injuries);

    let contracts = ingest::contracts::run(ctx, seasons)
        .await
        .context("contracts step")?;
    info!("rebuild: contracts {}", contracts);

    let contract_aggs = ingest::contract_aggregates::run(ctx)
        .await
        .context("contract aggregates step")?;
    info!("rebuild: contract aggregates {}", contract_aggs);

    // Aggregate last, once every box score in the range has landed.
    let agg = aggregate::aggregate(&ctx.db, Scope::Full)
        .await
        .context("aggregation step")?;
    info!(
        "rebuild: aggregated {} games into {} team rows",
        agg.games, agg.rows_written
    );

    info!("Full rebuild complete");
    Ok(())
}

/// Games cascades into every table that references a game, which covers all
/// fact tables except the season- and snapshot-keyed ones.
async fn wipe_facts(ctx: &AppContext) -> Result<()> {
    sqlx::query("TRUNCATE TABLE games RESTART IDENTITY CASCADE")
        .execute(&ctx.db)
        .await?;
    sqlx::query(
        "TRUNCATE TABLE team_standings, player_injuries, player_contracts, \
         player_contract_aggregates",
    )
    .execute(&ctx.db)
    .await?;
    info!("Fact tables truncated");
    Ok(())
}
