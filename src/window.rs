use chrono::{DateTime, Datelike, Duration, NaiveDate, NaiveTime, Utc};
use serde::Serialize;
use std::fmt;

use crate::error::{DoraError, Result};

const QUERY_DATE_FORMAT: &str = "%Y-%m-%d";

/// Pair of instants bounding the merges and completed stories of a report.
///
/// `start <= end` always holds: the only way to build one is through
/// [`TimeWindow::new`], which rejects inverted bounds.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct TimeWindow {
    start: DateTime<Utc>,
    end: DateTime<Utc>,
}

impl TimeWindow {
    pub fn new(start: DateTime<Utc>, end: DateTime<Utc>) -> Result<Self> {
        if start > end {
            return Err(DoraError::InvalidWindow { start, end });
        }
        Ok(Self { start, end })
    }

    /// The week containing `now - lookback_days`, Monday 00:00:00 through
    /// Sunday 23:59:59.
    pub fn reporting_week(now: DateTime<Utc>, lookback_days: i64) -> Result<Self> {
        let reference = days_before(now, lookback_days)?;
        let start = start_of_week(reference);
        let end = days_after(start, 6)? + end_of_day_offset();
        Self::new(start, end)
    }

    /// Window spanning whole calendar days, `until` included up to 23:59:59.
    pub fn from_dates(since: NaiveDate, until: NaiveDate) -> Result<Self> {
        let start = since.and_time(NaiveTime::MIN).and_utc();
        let end = until.and_time(NaiveTime::MIN).and_utc() + end_of_day_offset();
        Self::new(start, end)
    }

    /// Same end, start moved `days` earlier.
    pub fn extended_back(&self, days: i64) -> Result<Self> {
        Self::new(days_before(self.start, days)?, self.end)
    }

    pub fn start(&self) -> DateTime<Utc> {
        self.start
    }

    pub fn end(&self) -> DateTime<Utc> {
        self.end
    }

    /// Strictly after start and strictly before end. A timestamp equal to
    /// either bound is outside the window.
    pub fn contains(&self, instant: DateTime<Utc>) -> bool {
        instant > self.start && instant < self.end
    }

    /// `completed:YYYY-MM-DD..YYYY-MM-DD` fragment for story searches.
    pub fn completed_range_query(&self) -> String {
        format!(
            "completed:{}..{}",
            self.start.format(QUERY_DATE_FORMAT),
            self.end.format(QUERY_DATE_FORMAT)
        )
    }
}

impl fmt::Display for TimeWindow {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} .. {}",
            self.start.format("%Y-%m-%d %H:%M:%S"),
            self.end.format("%Y-%m-%d %H:%M:%S")
        )
    }
}

fn days_before(instant: DateTime<Utc>, days: i64) -> Result<DateTime<Utc>> {
    Duration::try_days(days)
        .and_then(|delta| instant.checked_sub_signed(delta))
        .ok_or_else(|| DoraError::Config(format!("{days} days before {instant} is out of range")))
}

fn days_after(instant: DateTime<Utc>, days: i64) -> Result<DateTime<Utc>> {
    Duration::try_days(days)
        .and_then(|delta| instant.checked_add_signed(delta))
        .ok_or_else(|| DoraError::Config(format!("{days} days after {instant} is out of range")))
}

fn start_of_week(instant: DateTime<Utc>) -> DateTime<Utc> {
    let midnight = instant.date_naive().and_time(NaiveTime::MIN).and_utc();
    midnight - Duration::days(i64::from(instant.weekday().num_days_from_monday()))
}

fn end_of_day_offset() -> Duration {
    Duration::hours(23) + Duration::minutes(59) + Duration::seconds(59)
}
