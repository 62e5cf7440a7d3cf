//! Team-game aggregation engine.
//!
//! Folds per-player box-score rows into one row per (team, game) with
//! derived shooting percentages, win flag, and scoring margin. Aggregated
//! rows are derived state: the engine deletes everything in scope and
//! recomputes from `player_game_stats` + `games`, all inside one
//! transaction, so a re-run can never double-count or leave stale rows.

use crate::scope::Scope;
use anyhow::{Context, Result};
use chrono::NaiveDate;
use sqlx::{FromRow, PgPool, Postgres, Transaction};
use std::collections::HashMap;
use tracing::{info, warn};

#[derive(Debug, Clone, FromRow)]
pub struct GameRecord {
    pub id: i64,
    pub date: NaiveDate,
    pub home_team_id: i64,
    pub away_team_id: i64,
    pub home_score: i32,
    pub visitor_score: i32,
}

/// Per-(team, game) sums over player_game_stats. Integer columns come back
/// from SUM() as BIGINT, minutes and fantasy points as DOUBLE PRECISION.
#[derive(Debug, Clone, FromRow)]
pub struct TeamTotals {
    pub game_id: i64,
    pub team_id: i64,
    pub minutes: f64,
    pub pts: i64,
    pub reb: i64,
    pub oreb: i64,
    pub dreb: i64,
    pub ast: i64,
    pub stl: i64,
    pub blk: i64,
    pub pf: i64,
    pub tov: i64,
    pub fgm: i64,
    pub fga: i64,
    pub fg3m: i64,
    pub fg3a: i64,
    pub ftm: i64,
    pub fta: i64,
    pub fantasy_dk: f64,
    pub fantasy_fd: f64,
}

/// Finished output row for team_game_stats. Ratings and pace stay None:
/// no possession-estimation model lives here, the columns exist for a
/// future component.
#[derive(Debug, Clone, PartialEq)]
pub struct TeamGameRow {
    pub team_id: i64,
    pub game_id: i64,
    pub opponent_id: i64,
    pub minutes: f64,
    pub pts: i64,
    pub reb: i64,
    pub oreb: i64,
    pub dreb: i64,
    pub ast: i64,
    pub stl: i64,
    pub blk: i64,
    pub pf: i64,
    pub tov: i64,
    pub fgm: i64,
    pub fga: i64,
    pub fg3m: i64,
    pub fg3a: i64,
    pub ftm: i64,
    pub fta: i64,
    pub fg_pct: f64,
    pub fg3_pct: f64,
    pub ft_pct: f64,
    pub off_rating: Option<f64>,
    pub def_rating: Option<f64>,
    pub pace: Option<f64>,
    pub fantasy_dk: f64,
    pub fantasy_fd: f64,
    pub win_flag: bool,
    pub margin: i32,
}

/// made/attempted, defined as exactly 0 when nothing was attempted.
pub fn shooting_pct(made: i64, attempted: i64) -> f64 {
    if attempted > 0 {
        made as f64 / attempted as f64
    } else {
        0.0
    }
}

/// Derive one output row from a team's summed totals and the game record.
/// The team's own score and the opponent's come from the game by home/away
/// role, never from the summed points, so the win flag and margin stay
/// consistent with the official final.
pub fn derive_team_game(totals: &TeamTotals, game: &GameRecord) -> TeamGameRow {
    let (opponent_id, team_score, opp_score) = if totals.team_id == game.home_team_id {
        (game.away_team_id, game.home_score, game.visitor_score)
    } else {
        (game.home_team_id, game.visitor_score, game.home_score)
    };

    TeamGameRow {
        team_id: totals.team_id,
        game_id: totals.game_id,
        opponent_id,
        minutes: totals.minutes,
        pts: totals.pts,
        reb: totals.reb,
        oreb: totals.oreb,
        dreb: totals.dreb,
        ast: totals.ast,
        stl: totals.stl,
        blk: totals.blk,
        pf: totals.pf,
        tov: totals.tov,
        fgm: totals.fgm,
        fga: totals.fga,
        fg3m: totals.fg3m,
        fg3a: totals.fg3a,
        ftm: totals.ftm,
        fta: totals.fta,
        fg_pct: shooting_pct(totals.fgm, totals.fga),
        fg3_pct: shooting_pct(totals.fg3m, totals.fg3a),
        ft_pct: shooting_pct(totals.ftm, totals.fta),
        off_rating: None,
        def_rating: None,
        pace: None,
        fantasy_dk: totals.fantasy_dk,
        fantasy_fd: totals.fantasy_fd,
        win_flag: team_score > opp_score,
        margin: team_score - opp_score,
    }
}

#[derive(Debug, Default)]
pub struct AggregateSummary {
    pub games: usize,
    pub rows_written: usize,
}

/// Recompute team_game_stats for the scope. Delete and insert run in one
/// transaction, so readers never observe an empty window, and the whole
/// operation is safe to retry blindly after any failure.
pub async fn aggregate(pool: &PgPool, scope: Scope) -> Result<AggregateSummary> {
    let (start, end) = scope.bounds();
    info!("Rebuilding team_game_stats for {}", scope);

    let mut tx = pool.begin().await.context("failed to open transaction")?;

    match scope {
        Scope::Full => {
            sqlx::query("TRUNCATE TABLE team_game_stats")
                .execute(&mut *tx)
                .await
                .context("failed to truncate team_game_stats")?;
        }
        Scope::Range(range) => {
            let deleted = sqlx::query(
                r#"
                DELETE FROM team_game_stats
                WHERE game_id IN (SELECT id FROM games WHERE date BETWEEN $1 AND $2)
                "#,
            )
            .bind(range.start)
            .bind(range.end)
            .execute(&mut *tx)
            .await
            .context("failed to delete in-scope team_game_stats rows")?;
            info!("Deleted {} stale rows for {}", deleted.rows_affected(), range);
        }
    }

    let games: Vec<GameRecord> = sqlx::query_as(
        r#"
        SELECT id, date, home_team_id, away_team_id, home_score, visitor_score
        FROM games
        WHERE ($1::date IS NULL OR date >= $1)
          AND ($2::date IS NULL OR date <= $2)
        "#,
    )
    .bind(start)
    .bind(end)
    .fetch_all(&mut *tx)
    .await
    .context("failed to load in-scope games")?;

    let games_by_id: HashMap<i64, GameRecord> =
        games.into_iter().map(|g| (g.id, g)).collect();

    let totals: Vec<TeamTotals> = sqlx::query_as(
        r#"
        SELECT
            p.game_id,
            p.team_id,
            SUM(p.minutes)              AS minutes,
            SUM(p.pts)::BIGINT          AS pts,
            SUM(p.reb)::BIGINT          AS reb,
            SUM(p.oreb)::BIGINT         AS oreb,
            SUM(p.dreb)::BIGINT         AS dreb,
            SUM(p.ast)::BIGINT          AS ast,
            SUM(p.stl)::BIGINT          AS stl,
            SUM(p.blk)::BIGINT          AS blk,
            SUM(p.pf)::BIGINT           AS pf,
            SUM(p.tov)::BIGINT          AS tov,
            SUM(p.fgm)::BIGINT          AS fgm,
            SUM(p.fga)::BIGINT          AS fga,
            SUM(p.fg3m)::BIGINT         AS fg3m,
            SUM(p.fg3a)::BIGINT         AS fg3a,
            SUM(p.ftm)::BIGINT          AS ftm,
            SUM(p.fta)::BIGINT          AS fta,
            SUM(p.fantasy_dk)           AS fantasy_dk,
            SUM(p.fantasy_fd)           AS fantasy_fd
        FROM player_game_stats p
        JOIN games g ON g.id = p.game_id
        WHERE ($1::date IS NULL OR g.date >= $1)
          AND ($2::date IS NULL OR g.date <= $2)
        GROUP BY p.game_id, p.team_id
        "#,
    )
    .bind(start)
    .bind(end)
    .fetch_all(&mut *tx)
    .await
    .context("failed to sum player_game_stats")?;

    let mut rows_written = 0usize;
    for totals in &totals {
        let Some(game) = games_by_id.get(&totals.game_id) else {
            // Player rows can reference a game the games table has not seen;
            // skipped here, picked up on a re-run once the game is ingested.
            warn!(
                "player stats reference unknown game {}, skipping",
                totals.game_id
            );
            continue;
        };
        let row = derive_team_game(totals, game);
        insert_row(&mut tx, &row).await?;
        rows_written += 1;
    }

    tx.commit().await.context("failed to commit aggregation")?;

    let summary = AggregateSummary {
        games: games_by_id.len(),
        rows_written,
    };
    info!(
        "team_game_stats rebuilt: {} rows across {} in-scope games ({})",
        summary.rows_written, summary.games, scope
    );
    Ok(summary)
}

async fn insert_row(tx: &mut Transaction<'_, Postgres>, row: &TeamGameRow) -> Result<()> {
    sqlx::query(
        r#"
        INSERT INTO team_game_stats
            (team_id, game_id, opponent_id,
             pts, reb, oreb, dreb, ast, stl, blk, pf, tov,
             minutes, fgm, fga, fg3m, fg3a, ftm, fta,
             fg_pct, fg3_pct, ft_pct,
             off_rating, def_rating, pace,
             fantasy_dk, fantasy_fd, win_flag, margin)
        VALUES
            ($1, $2, $3,
             $4, $5, $6, $7, $8, $9, $10, $11, $12,
             $13, $14, $15, $16, $17, $18, $19,
             $20, $21, $22,
             $23, $24, $25,
             $26, $27, $28, $29)
        "#,
    )
    .bind(row.team_id)
    .bind(row.game_id)
    .bind(row.opponent_id)
    .bind(row.pts)
    .bind(row.reb)
    .bind(row.oreb)
    .bind(row.dreb)
    .bind(row.ast)
    .bind(row.stl)
    .bind(row.blk)
    .bind(row.pf)
    .bind(row.tov)
    .bind(row.minutes)
    .bind(row.fgm)
    .bind(row.fga)
    .bind(row.fg3m)
    .bind(row.fg3a)
    .bind(row.ftm)
    .bind(row.fta)
    .bind(row.fg_pct)
    .bind(row.fg3_pct)
    .bind(row.ft_pct)
    .bind(row.off_rating)
    .bind(row.def_rating)
    .bind(row.pace)
    .bind(row.fantasy_dk)
    .bind(row.fantasy_fd)
    .bind(row.win_flag)
    .bind(row.margin)
    .execute(&mut **tx)
    .await
    .with_context(|| format!("failed to insert team_game_stats ({}, {})", row.team_id, row.game_id))?;
    Ok(())
}

// These run against a live database when DATABASE_URL is set and skip
// otherwise. They seed their own games/players in a reserved id range and
// use range scopes only, so they stay isolated from real data and from each
// other under parallel test execution.
#[cfg(test)]
mod db_tests {
    use super::*;
    use crate::scope::DateRange;
    use sqlx::postgres::PgPoolOptions;
    use sqlx::Executor;

    async fn test_pool() -> Option<PgPool> {
        let url = std::env::var("DATABASE_URL").ok()?;
        let pool = PgPoolOptions::new()
            .max_connections(2)
            .connect(&url)
            .await
            .ok()?;
        pool.execute(include_str!("../sql/schema.sql")).await.ok()?;
        Some(pool)
    }

    async fn seed_game(
        pool: &PgPool,
        game_id: i64,
        date: NaiveDate,
        home_id: i64,
        away_id: i64,
        home_score: i32,
        visitor_score: i32,
    ) {
        sqlx::query("DELETE FROM games WHERE id = $1")
            .bind(game_id)
            .execute(pool)
            .await
            .unwrap();
        sqlx::query(
            "INSERT INTO calendar (date, year, month, day, week, day_of_week)
             VALUES ($1, 1976, 1, 1, 1, 1) ON CONFLICT (date) DO NOTHING",
        )
        .bind(date)
        .execute(pool)
        .await
        .unwrap();
        for team_id in [home_id, away_id] {
            sqlx::query(
                "INSERT INTO teams (id, name) VALUES ($1, $2) ON CONFLICT (id) DO NOTHING",
            )
            .bind(team_id)
            .bind(format!("Team {}", team_id))
            .execute(pool)
            .await
            .unwrap();
        }
        sqlx::query(
            "INSERT INTO games (id, date, home_team_id, away_team_id, home_score, visitor_score)
             VALUES ($1, $2, $3, $4, $5, $6)",
        )
        .bind(game_id)
        .bind(date)
        .bind(home_id)
        .bind(away_id)
        .bind(home_score)
        .bind(visitor_score)
        .execute(pool)
        .await
        .unwrap();
    }

    async fn seed_player_line(
        pool: &PgPool,
        player_id: i64,
        game_id: i64,
        team_id: i64,
        opponent_id: i64,
        pts: i32,
        fgm: i32,
        fga: i32,
    ) {
        sqlx::query(
            "INSERT INTO players (id, name) VALUES ($1, $2) ON CONFLICT (id) DO NOTHING",
        )
        .bind(player_id)
        .bind(format!("Player {}", player_id))
        .execute(pool)
        .await
        .unwrap();
        sqlx::query(
            "INSERT INTO player_game_stats
                 (player_id, game_id, team_id, opponent_id, minutes, pts, fgm, fga,
                  fantasy_dk, fantasy_fd)
             VALUES ($1, $2, $3, $4, 36.5, $5, $6, $7, 41.25, 38.0)",
        )
        .bind(player_id)
        .bind(game_id)
        .bind(team_id)
        .bind(opponent_id)
        .bind(pts)
        .bind(fgm)
        .bind(fga)
        .execute(pool)
        .await
        .unwrap();
    }

    type RowSnapshot = (i64, i64, i64, f64, f64, bool, i32, f64);

    async fn snapshot(pool: &PgPool, game_ids: &[i64]) -> Vec<RowSnapshot> {
        sqlx::query_as(
            "SELECT team_id, game_id, pts, fg_pct, minutes, win_flag, margin, fantasy_dk
             FROM team_game_stats
             WHERE game_id = ANY($1)
             ORDER BY game_id, team_id",
        )
        .bind(game_ids)
        .fetch_all(pool)
        .await
        .unwrap()
    }

    #[tokio::test]
    async fn rerun_over_same_range_is_identical() {
        let Some(pool) = test_pool().await else {
            eprintln!("DATABASE_URL not set or unreachable, skipping");
            return;
        };

        let day: NaiveDate = "1976-01-05".parse().unwrap();
        seed_game(&pool, 910_001, day, 910_110, 910_120, 110, 102).await;
        seed_player_line(&pool, 910_201, 910_001, 910_110, 910_120, 110, 45, 90).await;
        seed_player_line(&pool, 910_202, 910_001, 910_120, 910_110, 102, 40, 85).await;

        let scope = Scope::Range(DateRange::new(day, day).unwrap());
        aggregate(&pool, scope).await.unwrap();
        let first = snapshot(&pool, &[910_001]).await;
        assert_eq!(first.len(), 2, "two team rows per game");

        aggregate(&pool, scope).await.unwrap();
        let second = snapshot(&pool, &[910_001]).await;
        assert_eq!(first, second);

        let home = &first[0];
        assert!((home.3 - 0.5).abs() < 1e-9, "home fg_pct");
        assert!(home.5, "home won");
        assert_eq!(home.6, 8, "home margin");
        assert_eq!(first[1].6, -8, "away margin negates");
    }

    #[tokio::test]
    async fn range_aggregation_leaves_out_of_scope_rows_alone() {
        let Some(pool) = test_pool().await else {
            eprintln!("DATABASE_URL not set or unreachable, skipping");
            return;
        };

        let in_day: NaiveDate = "1976-02-05".parse().unwrap();
        let out_day: NaiveDate = "1976-03-05".parse().unwrap();
        seed_game(&pool, 920_001, in_day, 920_110, 920_120, 99, 95).await;
        seed_player_line(&pool, 920_201, 920_001, 920_110, 920_120, 99, 38, 80).await;
        seed_game(&pool, 920_002, out_day, 920_110, 920_120, 104, 101).await;
        seed_player_line(&pool, 920_202, 920_002, 920_110, 920_120, 104, 41, 88).await;

        let both = Scope::Range(DateRange::new(in_day, out_day).unwrap());
        aggregate(&pool, both).await.unwrap();

        // Plant a sentinel on the out-of-scope row, then re-aggregate only
        // the in-scope day. The sentinel must survive.
        sqlx::query(
            "UPDATE team_game_stats SET pts = 9999 WHERE game_id = 920002 AND team_id = 920110",
        )
        .execute(&pool)
        .await
        .unwrap();

        let in_scope = Scope::Range(DateRange::new(in_day, in_day).unwrap());
        aggregate(&pool, in_scope).await.unwrap();

        let rows = snapshot(&pool, &[920_002]).await;
        assert_eq!(rows.len(), 1);
        assert_eq!(rows[0].2, 9999, "out-of-scope row was rewritten");

        let rows = snapshot(&pool, &[920_001]).await;
        assert_eq!(rows.len(), 1);
        assert_eq!(rows[0].2, 99, "in-scope row recomputed from player lines");
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn game_500() -> GameRecord {
        GameRecord {
            id: 500,
            date: "2024-01-10".parse().unwrap(),
            home_team_id: 10,
            away_team_id: 20,
            home_score: 110,
            visitor_score: 102,
        }
    }

    fn totals(team_id: i64, pts: i64, fgm: i64, fga: i64) -> TeamTotals {
        TeamTotals {
            game_id: 500,
            team_id,
            minutes: 240.0,
            pts,
            reb: 44,
            oreb: 10,
            dreb: 34,
            ast: 25,
            stl: 7,
            blk: 5,
            pf: 18,
            tov: 13,
            fgm,
            fga,
            fg3m: 12,
            fg3a: 35,
            ftm: 13,
            fta: 17,
            fantasy_dk: 250.5,
            fantasy_fd: 241.2,
        }
    }

    #[test]
    fn home_winner_row() {
        let row = derive_team_game(&totals(10, 110, 45, 90), &game_500());
        assert_eq!(row.opponent_id, 20);
        assert!(row.win_flag);
        assert_eq!(row.margin, 8);
        assert!((row.fg_pct - 0.5).abs() < 1e-9);
    }

    #[test]
    fn away_loser_row() {
        let row = derive_team_game(&totals(20, 102, 40, 85), &game_500());
        assert_eq!(row.opponent_id, 10);
        assert!(!row.win_flag);
        assert_eq!(row.margin, -8);
        assert!((row.fg_pct - 0.470588).abs() < 1e-4);
    }

    #[test]
    fn opponent_symmetry_and_margin_negation() {
        let game = game_500();
        let home = derive_team_game(&totals(10, 110, 45, 90), &game);
        let away = derive_team_game(&totals(20, 102, 40, 85), &game);
        assert_eq!(home.opponent_id, away.team_id);
        assert_eq!(away.opponent_id, home.team_id);
        assert_eq!(home.margin, -away.margin);
        assert_ne!(home.win_flag, away.win_flag);
    }

    #[test]
    fn zero_attempts_yield_zero_pct() {
        let mut t = totals(10, 110, 0, 0);
        t.fg3m = 0;
        t.fg3a = 0;
        t.ftm = 0;
        t.fta = 0;
        let row = derive_team_game(&t, &game_500());
        assert_eq!(row.fg_pct, 0.0);
        assert_eq!(row.fg3_pct, 0.0);
        assert_eq!(row.ft_pct, 0.0);
    }

    #[test]
    fn ratings_and_pace_left_unset() {
        let row = derive_team_game(&totals(10, 110, 45, 90), &game_500());
        assert_eq!(row.off_rating, None);
        assert_eq!(row.def_rating, None);
        assert_eq!(row.pace, None);
    }

    #[test]
    fn shooting_pct_basic() {
        assert_eq!(shooting_pct(45, 90), 0.5);
        assert_eq!(shooting_pct(0, 0), 0.0);
        assert_eq!(shooting_pct(0, 10), 0.0);
    }

    #[test]
    fn tied_score_is_not_a_win() {
        let mut game = game_500();
        game.visitor_score = 110;
        let row = derive_team_game(&totals(10, 110, 45, 90), &game);
        assert!(!row.win_flag);
        assert_eq!(row.margin, 0);
    }
}
