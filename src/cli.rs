//! Command-line surface. Every subcommand resolves to a [`Task`] before any
//! database or network connection is opened, so bad date arguments fail fast.

use crate::scope::{self, DateRange, Scope, ScopeError};
use chrono::NaiveDate;
use clap::{Args, Parser, Subcommand};

const DEFAULT_SEASONS: &str = "2022,2023,2024,2025";

#[derive(Parser, Debug)]
#[command(name = "hoopsink", version, about = "NBA warehouse ingestion and aggregation")]
pub struct Cli {
    #[command(subcommand)]
    pub command: Command,
}

#[derive(Args, Debug, Default)]
pub struct DateArgs {
    /// First day to cover (YYYY-MM-DD)
    #[arg(long, value_name = "YYYY-MM-DD")]
    pub start_date: Option<NaiveDate>,

    /// Last day to cover, inclusive (YYYY-MM-DD)
    #[arg(long, value_name = "YYYY-MM-DD")]
    pub end_date: Option<NaiveDate>,
}

#[derive(Args, Debug)]
pub struct SeasonArgs {
    /// Seasons to cover, comma-separated start years
    #[arg(long, value_delimiter = ',', default_value = DEFAULT_SEASONS)]
    pub seasons: Vec<i32>,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Refresh the teams dimension
    Teams,
    /// Refresh the players dimension
    Players,
    /// Ingest game headers for a date range
    Games(DateArgs),
    /// Ingest per-player box scores for a date range
    BoxScores(DateArgs),
    /// Ingest per-player advanced stats for a date range
    AdvancedStats(DateArgs),
    /// Ingest season standings
    Standings(SeasonArgs),
    /// Ingest game-level betting odds for a date range
    Odds(DateArgs),
    /// Ingest player prop markets for games in a date range
    Props(DateArgs),
    /// Refresh the injury report snapshot
    Injuries,
    /// Ingest player contracts for every known team
    Contracts(SeasonArgs),
    /// Ingest whole-deal contract summaries for players with contracts
    ContractAggregates,
    /// Recompute team-game aggregates; pass both dates or neither
    Aggregate(DateArgs),
    /// Run the daily pipeline end to end
    Daily(SeasonArgs),
    /// Wipe fact tables and rebuild the warehouse over a date range
    Rebuild {
        /// First day of the rebuild window (YYYY-MM-DD)
        #[arg(long, value_name = "YYYY-MM-DD")]
        start_date: NaiveDate,
        /// Last day of the rebuild window, inclusive (YYYY-MM-DD)
        #[arg(long, value_name = "YYYY-MM-DD")]
        end_date: NaiveDate,
        #[command(flatten)]
        seasons: SeasonArgs,
    },
}

/// A fully resolved unit of work. Date defaults and validation happen in
/// [`Command::into_task`]; past this point every range is concrete.
#[derive(Debug)]
pub enum Task {
    Teams,
    Players,
    Games(DateRange),
    BoxScores(DateRange),
    AdvancedStats(DateRange),
    Standings(Vec<i32>),
    Odds(DateRange),
    Props(DateRange),
    Injuries,
    Contracts(Vec<i32>),
    ContractAggregates,
    Aggregate(Scope),
    Daily(Vec<i32>),
    Rebuild { range: DateRange, seasons: Vec<i32> },
}

impl Command {
    /// Ingest commands default to yesterday when no dates are given; the
    /// aggregate command insists on both dates or neither.
    pub fn into_task(self, today: NaiveDate) -> Result<Task, ScopeError> {
        Ok(match self {
            Command::Teams => Task::Teams,
            Command::Players => Task::Players,
            Command::Games(d) => {
                Task::Games(scope::range_or_yesterday(d.start_date, d.end_date, today)?)
            }
            Command::BoxScores(d) => {
                Task::BoxScores(scope::range_or_yesterday(d.start_date, d.end_date, today)?)
            }
            Command::AdvancedStats(d) => {
                Task::AdvancedStats(scope::range_or_yesterday(d.start_date, d.end_date, today)?)
            }
            Command::Standings(s) => Task::Standings(s.seasons),
            Command::Odds(d) => {
                Task::Odds(scope::range_or_yesterday(d.start_date, d.end_date, today)?)
            }
            Command::Props(d) => {
                Task::Props(scope::range_or_yesterday(d.start_date, d.end_date, today)?)
            }
            Command::Injuries => Task::Injuries,
            Command::Contracts(s) => Task::Contracts(s.seasons),
            Command::ContractAggregates => Task::ContractAggregates,
            Command::Aggregate(d) => {
                Task::Aggregate(Scope::from_flags(d.start_date, d.end_date)?)
            }
            Command::Daily(s) => Task::Daily(s.seasons),
            Command::Rebuild {
                start_date,
                end_date,
                seasons,
            } => Task::Rebuild {
                range: DateRange::new(start_date, end_date)?,
                seasons: seasons.seasons,
            },
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    fn date(s: &str) -> NaiveDate {
        s.parse().unwrap()
    }

    #[test]
    fn cli_definition_is_consistent() {
        Cli::command().debug_assert();
    }

    #[test]
    fn aggregate_rejects_half_open_range() {
        let cmd = Command::Aggregate(DateArgs {
            start_date: Some(date("2024-01-01")),
            end_date: None,
        });
        assert_eq!(
            cmd.into_task(date("2024-02-01")).unwrap_err(),
            ScopeError::HalfOpenRange
        );
    }

    #[test]
    fn aggregate_without_dates_is_full_scope() {
        let cmd = Command::Aggregate(DateArgs::default());
        match cmd.into_task(date("2024-02-01")).unwrap() {
            Task::Aggregate(Scope::Full) => {}
            other => panic!("expected full scope, got {:?}", other),
        }
    }

    #[test]
    fn ingest_without_dates_defaults_to_yesterday() {
        let cmd = Command::BoxScores(DateArgs::default());
        match cmd.into_task(date("2024-02-01")).unwrap() {
            Task::BoxScores(range) => {
                assert_eq!(range.start, date("2024-01-31"));
                assert_eq!(range.end, date("2024-01-31"));
            }
            other => panic!("expected box scores task, got {:?}", other),
        }
    }

    #[test]
    fn rebuild_rejects_inverted_range() {
        let cmd = Command::Rebuild {
            start_date: date("2024-02-01"),
            end_date: date("2024-01-01"),
            seasons: SeasonArgs { seasons: vec![2024] },
        };
        assert!(matches!(
            cmd.into_task(date("2024-03-01")).unwrap_err(),
            ScopeError::EndBeforeStart { .. }
        ));
    }

    #[test]
    fn seasons_parse_from_comma_list() {
        let cli = Cli::try_parse_from(["hoopsink", "standings", "--seasons", "2023,2024"]).unwrap();
        match cli.command {
            Command::Standings(s) => assert_eq!(s.seasons, vec![2023, 2024]),
            other => panic!("unexpected command {:?}", other),
        }
    }
}
