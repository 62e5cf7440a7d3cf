//! Ingestion adapters, one per data domain. Each fetches paginated JSON,
//! decodes it at the boundary, and issues idempotent upserts. Failures for
//! one day (or one game/season unit) are logged and skipped; the adapter
//! keeps going and reports them in its summary.

pub mod advanced;
pub mod box_scores;
pub mod contract_aggregates;
pub mod contracts;
pub mod games;
pub mod injuries;
pub mod odds;
pub mod players;
pub mod props;
pub mod standings;
pub mod teams;

use std::fmt;

#[derive(Debug, Default)]
pub struct IngestSummary {
    pub fetched: usize,
    pub written: usize,
    /// Work units (days, games, seasons) that errored and were skipped.
    pub failed_units: usize,
}

impl IngestSummary {
    pub fn absorb(&mut self, other: IngestSummary) {
        self.fetched += other.fetched;
        self.written += other.written;
        self.failed_units += other.failed_units;
    }
}

impl fmt::Display for IngestSummary {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} fetched, {} written, {} failed units",
            self.fetched, self.written, self.failed_units
        )
    }
}
