use chrono::NaiveDate;
use thiserror::Error;

/// Date-flag validation errors. These are reported before any storage or
/// network access happens.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum ScopeError {
    #[error("--start-date and --end-date must be supplied together or not at all")]
    HalfOpenRange,

    #[error("end date {end} is before start date {start}")]
    EndBeforeStart { start: NaiveDate, end: NaiveDate },
}

/// Inclusive range of game dates.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DateRange {
    pub start: NaiveDate,
    pub end: NaiveDate,
}

impl DateRange {
    pub fn new(start: NaiveDate, end: NaiveDate) -> Result<Self, ScopeError> {
        if end < start {
            return Err(ScopeError::EndBeforeStart { start, end });
        }
        Ok(Self { start, end })
    }

    pub fn single(day: NaiveDate) -> Self {
        Self { start: day, end: day }
    }

    /// Walk every date in the range, inclusive on both ends.
    pub fn days(&self) -> impl Iterator<Item = NaiveDate> + '_ {
        let end = self.end;
        self.start.iter_days().take_while(move |d| *d <= end)
    }
}

impl std::fmt::Display for DateRange {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}..={}", self.start, self.end)
    }
}

/// What an aggregation run is responsible for: every game ever ingested, or
/// the games whose date falls in a closed interval.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Scope {
    Full,
    Range(DateRange),
}

impl Scope {
    /// Strict flag interpretation for the aggregation engine: both flags or
    /// neither. A single flag is a configuration error.
    pub fn from_flags(
        start: Option<NaiveDate>,
        end: Option<NaiveDate>,
    ) -> Result<Self, ScopeError> {
        match (start, end) {
            (None, None) => Ok(Scope::Full),
            (Some(s), Some(e)) => Ok(Scope::Range(DateRange::new(s, e)?)),
            _ => Err(ScopeError::HalfOpenRange),
        }
    }

    /// Bounds as optional SQL parameters; `None` means unbounded.
    pub fn bounds(&self) -> (Option<NaiveDate>, Option<NaiveDate>) {
        match self {
            Scope::Full => (None, None),
            Scope::Range(r) => (Some(r.start), Some(r.end)),
        }
    }
}

impl std::fmt::Display for Scope {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Scope::Full => write!(f, "all games"),
            Scope::Range(r) => write!(f, "games in {r}"),
        }
    }
}

/// Lenient flag interpretation for ingestion adapters: both flags form a
/// range, a single flag means that one day, no flags default to yesterday
/// (the daily-job window).
pub fn range_or_yesterday(
    start: Option<NaiveDate>,
    end: Option<NaiveDate>,
    today: NaiveDate,
) -> Result<DateRange, ScopeError> {
    match (start, end) {
        (Some(s), Some(e)) => DateRange::new(s, e),
        (Some(d), None) | (None, Some(d)) => Ok(DateRange::single(d)),
        (None, None) => Ok(DateRange::single(today.pred_opt().unwrap_or(today))),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn d(s: &str) -> NaiveDate {
        s.parse().unwrap()
    }

    #[test]
    fn scope_requires_both_flags_or_neither() {
        assert_eq!(Scope::from_flags(None, None), Ok(Scope::Full));
        assert_eq!(
            Scope::from_flags(Some(d("2024-01-01")), None),
            Err(ScopeError::HalfOpenRange)
        );
        assert_eq!(
            Scope::from_flags(None, Some(d("2024-01-01"))),
            Err(ScopeError::HalfOpenRange)
        );
    }

    #[test]
    fn scope_rejects_inverted_range() {
        let err = Scope::from_flags(Some(d("2024-02-01")), Some(d("2024-01-01"))).unwrap_err();
        assert_eq!(
            err,
            ScopeError::EndBeforeStart {
                start: d("2024-02-01"),
                end: d("2024-01-01"),
            }
        );
    }

    #[test]
    fn scope_bounds() {
        assert_eq!(Scope::Full.bounds(), (None, None));
        let scope = Scope::from_flags(Some(d("2024-01-01")), Some(d("2024-01-02"))).unwrap();
        assert_eq!(scope.bounds(), (Some(d("2024-01-01")), Some(d("2024-01-02"))));
    }

    #[test]
    fn range_walks_inclusive_days() {
        let range = DateRange::new(d("2024-01-30"), d("2024-02-02")).unwrap();
        let days: Vec<NaiveDate> = range.days().collect();
        assert_eq!(
            days,
            vec![d("2024-01-30"), d("2024-01-31"), d("2024-02-01"), d("2024-02-02")]
        );
    }

    #[test]
    fn single_day_range() {
        let range = DateRange::single(d("2024-01-10"));
        assert_eq!(range.days().count(), 1);
    }

    #[test]
    fn ingest_defaults_to_yesterday() {
        let range = range_or_yesterday(None, None, d("2024-03-15")).unwrap();
        assert_eq!(range, DateRange::single(d("2024-03-14")));

        let range = range_or_yesterday(Some(d("2024-03-01")), None, d("2024-03-15")).unwrap();
        assert_eq!(range, DateRange::single(d("2024-03-01")));

        let range = range_or_yesterday(None, Some(d("2024-03-02")), d("2024-03-15")).unwrap();
        assert_eq!(range, DateRange::single(d("2024-03-02")));
    }
}
