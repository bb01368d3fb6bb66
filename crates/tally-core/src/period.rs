//! Budget period calculation
//!
//! Every budget tracks spend over a half-open `[start, end)` window derived
//! from its period kind and a reference instant. All bounds are UTC midnight.

use chrono::{DateTime, Datelike, Duration, NaiveDate, NaiveTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use crate::error::Error;

/// How often a budget resets
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PeriodKind {
    Weekly,
    Monthly,
    Yearly,
}

impl PeriodKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Weekly => "weekly",
            Self::Monthly => "monthly",
            Self::Yearly => "yearly",
        }
    }
}

impl fmt::Display for PeriodKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl FromStr for PeriodKind {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "weekly" => Ok(Self::Weekly),
            "monthly" => Ok(Self::Monthly),
            "yearly" => Ok(Self::Yearly),
            _ => Err(Error::Validation(format!("Unknown period kind: {}", s))),
        }
    }
}

/// A half-open time window `[start, end)`
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Period {
    pub start: DateTime<Utc>,
    pub end: DateTime<Utc>,
}

impl Period {
    pub fn new(start: DateTime<Utc>, end: DateTime<Utc>) -> Self {
        Self { start, end }
    }

    /// The `days` days leading up to (and excluding) `now`
    pub fn lookback(now: DateTime<Utc>, days: u32) -> Self {
        Self {
            start: now - Duration::days(i64::from(days)),
            end: now,
        }
    }

    pub fn contains(&self, instant: DateTime<Utc>) -> bool {
        self.start <= instant && instant < self.end
    }

    pub fn duration(&self) -> Duration {
        self.end - self.start
    }
}

impl fmt::Display for Period {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "[{}, {})",
            self.start.format("%Y-%m-%d"),
            self.end.format("%Y-%m-%d")
        )
    }
}

/// Compute the period of `kind` that contains `reference`
pub fn bounds_for(kind: PeriodKind, reference: DateTime<Utc>) -> Period {
    let date = reference.date_naive();

    let (start, end) = match kind {
        PeriodKind::Weekly => {
            let start = date - Duration::days(i64::from(date.weekday().num_days_from_sunday()));
            (start, start + Duration::days(7))
        }
        PeriodKind::Monthly => {
            let start = first_of_month(date.year(), date.month());
            let end = if date.month() == 12 {
                first_of_month(date.year() + 1, 1)
            } else {
                first_of_month(date.year(), date.month() + 1)
            };
            (start, end)
        }
        PeriodKind::Yearly => (
            first_of_month(date.year(), 1),
            first_of_month(date.year() + 1, 1),
        ),
    };

    Period {
        start: midnight(start),
        end: midnight(end),
    }
}

/// The period of `kind` immediately before `period`
pub fn previous_bounds(kind: PeriodKind, period: &Period) -> Period {
    bounds_for(kind, period.start - Duration::milliseconds(1))
}

/// Start of the calendar month that contains `reference`
pub fn month_start(reference: DateTime<Utc>) -> DateTime<Utc> {
    bounds_for(PeriodKind::Monthly, reference).start
}

fn first_of_month(year: i32, month: u32) -> NaiveDate {
    NaiveDate::from_ymd_opt(year, month, 1).unwrap_or(NaiveDate::MAX)
}

fn midnight(date: NaiveDate) -> DateTime<Utc> {
    date.and_time(NaiveTime::MIN).and_utc()
}
