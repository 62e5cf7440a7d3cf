//! NBA warehouse ingestion service.
//!
//! Pulls teams, players, games, box scores, odds, props, injuries, contracts
//! and standings from the balldontlie API into Postgres, and recomputes
//! team-game aggregates from the stored player lines.

mod aggregate;
mod api;
mod cli;
mod config;
mod context;
mod db;
mod ingest;
mod jobs;
mod scope;
mod store;

use anyhow::Result;
use chrono::Utc;
use clap::Parser;
use cli::{Cli, Task};
use config::Config;
use context::AppContext;
use tracing::info;
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> Result<()> {
    dotenvy::dotenv().ok();

    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("hoopsink=info")),
        )
        .init();

    let cli = Cli::parse();
    let today = Utc::now().date_naive();

    // Resolve dates before touching the database or the network.
    let task = cli.command.into_task(today)?;

    let config = Config::from_env()?;
    let ctx = AppContext::init(&config).await?;

    match task {
        Task::Teams => {
            let summary = ingest::teams::run(&ctx).await?;
            info!("teams: {}", summary);
        }
        Task::Players => {
            let summary = ingest::players::run(&ctx).await?;
            info!("players: {}", summary);
        }
        Task::Games(range) => {
            let summary = ingest::games::run(&ctx, &range).await?;
            info!("games: {}", summary);
        }
        Task::BoxScores(range) => {
            let summary = ingest::box_scores::run(&ctx, &range).await?;
            info!("box scores: {}", summary);
        }
        Task::AdvancedStats(range) => {
            let summary = ingest::advanced::run(&ctx, &range).await?;
            info!("advanced stats: {}", summary);
        }
        Task::Standings(seasons) => {
            let summary = ingest::standings::run(&ctx, &seasons).await?;
            info!("standings: {}", summary);
        }
        Task::Odds(range) => {
            let summary = ingest::odds::run(&ctx, &range).await?;
            info!("odds: {}", summary);
        }
        Task::Props(range) => {
            let summary = ingest::props::run(&ctx, &range).await?;
            info!("props: {}", summary);
        }
        Task::Injuries => {
            let summary = ingest::injuries::run(&ctx).await?;
            info!("injuries: {}", summary);
        }
        Task::Contracts(seasons) => {
            let summary = ingest::contracts::run(&ctx, &seasons).await?;
            info!("contracts: {}", summary);
        }
        Task::ContractAggregates => {
            let summary = ingest::contract_aggregates::run(&ctx).await?;
            info!("contract aggregates: {}", summary);
        }
        Task::Aggregate(scope) => {
            let summary = aggregate::aggregate(&ctx.db, scope).await?;
            info!(
                "aggregate: {} games, {} team rows written",
                summary.games, summary.rows_written
            );
        }
        Task::Daily(seasons) => jobs::daily(&ctx, &seasons, today).await?,
        Task::Rebuild { range, seasons } => jobs::rebuild(&ctx, &range, &seasons).await?,
    }

    Ok(())
}
