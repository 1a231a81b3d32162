//! Query windows.
//!
//! Callers ask for a day, a month, a year or an explicit range; every query
//! runs over the half-open UTC window `[start, end)` derived from that.

use std::fmt;

use chrono::{DateTime, NaiveDate, NaiveTime, Utc};
use serde::{Deserialize, Serialize};

use crate::error::{CalFoldError, CalFoldResult};
use crate::event::CalendarEvent;
use crate::overlap;

/// What the caller asked for. Months and days are 1-based.
///
/// Deserializes from `{year}`, `{year, month}`, `{year, month, day}` or
/// `{startDateUtc, endDateUtc}`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Granularity {
    Day {
        year: i32,
        month: u32,
        day: u32,
    },
    Month {
        year: i32,
        month: u32,
    },
    Year {
        year: i32,
    },
    Range {
        #[serde(rename = "startDateUtc")]
        start: DateTime<Utc>,
        #[serde(rename = "endDateUtc")]
        end: DateTime<Utc>,
    },
}

/// A half-open UTC window `[start, end)`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct QueryWindow {
    pub start: DateTime<Utc>,
    pub end: DateTime<Utc>,
}

impl QueryWindow {
    pub fn for_granularity(granularity: Granularity) -> CalFoldResult<Self> {
        match granularity {
            Granularity::Day { year, month, day } => Self::day(year, month, day),
            Granularity::Month { year, month } => Self::month(year, month),
            Granularity::Year { year } => Self::year(year),
            Granularity::Range { start, end } => Ok(Self::between(start, end)),
        }
    }

    /// `[midnight, next midnight)`
    pub fn day(year: i32, month: u32, day: u32) -> CalFoldResult<Self> {
        let date = date(year, month, day)?;
        let next = date
            .succ_opt()
            .ok_or_else(|| CalFoldError::InvalidDate(format!("no day after {}", date)))?;

        Ok(Self::between(midnight(date), midnight(next)))
    }

    /// `[first of month, first of next month)`
    pub fn month(year: i32, month: u32) -> CalFoldResult<Self> {
        let first = date(year, month, 1)?;
        let next = if month == 12 {
            date(year + 1, 1, 1)?
        } else {
            date(year, month + 1, 1)?
        };

        Ok(Self::between(midnight(first), midnight(next)))
    }

    /// `[Jan 1, Jan 1 of next year)`
    pub fn year(year: i32) -> CalFoldResult<Self> {
        Ok(Self::between(
            midnight(date(year, 1, 1)?),
            midnight(date(year + 1, 1, 1)?),
        ))
    }

    /// An explicit range, used verbatim.
    pub fn between(start: DateTime<Utc>, end: DateTime<Utc>) -> Self {
        QueryWindow { start, end }
    }

    pub fn overlaps(&self, event: &CalendarEvent) -> bool {
        overlap::overlaps(event, self.start, self.end)
    }
}

impl fmt::Display for QueryWindow {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "[{}, {})", self.start.to_rfc3339(), self.end.to_rfc3339())
    }
}

fn date(year: i32, month: u32, day: u32) -> CalFoldResult<NaiveDate> {
    NaiveDate::from_ymd_opt(year, month, day).ok_or_else(|| {
        CalFoldError::InvalidDate(format!("{:04}-{:02}-{:02} is not a calendar date", year, month, day))
    })
}

fn midnight(date: NaiveDate) -> DateTime<Utc> {
    date.and_time(NaiveTime::MIN).and_utc()
}
