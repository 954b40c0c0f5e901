//! Aggregation periods over daily time axes.
//!
//! Period boundaries are a policy choice, fixed here as:
//!
//! - **annual**: calendar year (1 Jan – 31 Dec)
//! - **monthly**: calendar month
//! - **seasonal**: DJF, MAM, JJA, SON. A DJF season is labelled with the year
//!   of its December, so `1950-DJF` covers Dec 1950 – Feb 1951 and
//!   January/February of the first data year fall in the partial previous
//!   season.

use std::fmt;
use std::ops::Range;
use std::str::FromStr;

use chrono::{Datelike, NaiveDate};
use serde::{Deserialize, Serialize};

use crate::error::{ClimateError, ClimateResult};

/// Temporal aggregation applied by an index.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Aggregation {
    #[default]
    Annual,
    Monthly,
    Seasonal,
}

impl Aggregation {
    pub fn as_str(&self) -> &'static str {
        match self {
            Aggregation::Annual => "annual",
            Aggregation::Monthly => "monthly",
            Aggregation::Seasonal => "seasonal",
        }
    }

    /// Period containing a date.
    pub fn period_of(self, date: NaiveDate) -> Period {
        match self {
            Aggregation::Annual => Period::Year(date.year()),
            Aggregation::Monthly => Period::Month {
                year: date.year(),
                month: date.month(),
            },
            Aggregation::Seasonal => {
                let (season, year) = Season::of(date);
                Period::Season { year, season }
            }
        }
    }
}

impl FromStr for Aggregation {
    type Err = ClimateError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "annual" | "yearly" => Ok(Aggregation::Annual),
            "monthly" => Ok(Aggregation::Monthly),
            "seasonal" => Ok(Aggregation::Seasonal),
            other => Err(ClimateError::config_invalid(format!(
                "unknown aggregation '{}' (expected annual, monthly or seasonal)",
                other
            ))),
        }
    }
}

impl fmt::Display for Aggregation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Meteorological season, declared in chronological order within a season-year.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum Season {
    Mam,
    Jja,
    Son,
    Djf,
}

impl Season {
    /// Season of a date and the year it is labelled with.
    pub fn of(date: NaiveDate) -> (Season, i32) {
        match date.month() {
            3..=5 => (Season::Mam, date.year()),
            6..=8 => (Season::Jja, date.year()),
            9..=11 => (Season::Son, date.year()),
            12 => (Season::Djf, date.year()),
            _ => (Season::Djf, date.year() - 1),
        }
    }

    pub fn first_month(self) -> u32 {
        match self {
            Season::Mam => 3,
            Season::Jja => 6,
            Season::Son => 9,
            Season::Djf => 12,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Season::Mam => "MAM",
            Season::Jja => "JJA",
            Season::Son => "SON",
            Season::Djf => "DJF",
        }
    }
}

/// One aggregation period.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum Period {
    Year(i32),
    Month { year: i32, month: u32 },
    Season { year: i32, season: Season },
}

impl Period {
    /// First calendar day of the period.
    pub fn first_day(&self) -> NaiveDate {
        match *self {
            Period::Year(year) => ymd(year, 1),
            Period::Month { year, month } => ymd(year, month),
            Period::Season { year, season } => ymd(year, season.first_month()),
        }
    }

    /// Last calendar day of the period.
    pub fn last_day(&self) -> NaiveDate {
        let next = self.next().first_day();
        next.pred_opt().unwrap_or(next)
    }

    /// The period immediately following this one.
    pub fn next(&self) -> Period {
        match *self {
            Period::Year(year) => Period::Year(year + 1),
            Period::Month { year, month: 12 } => Period::Month {
                year: year + 1,
                month: 1,
            },
            Period::Month { year, month } => Period::Month {
                year,
                month: month + 1,
            },
            Period::Season { year, season } => match season {
                Season::Mam => Period::Season {
                    year,
                    season: Season::Jja,
                },
                Season::Jja => Period::Season {
                    year,
                    season: Season::Son,
                },
                Season::Son => Period::Season {
                    year,
                    season: Season::Djf,
                },
                Season::Djf => Period::Season {
                    year: year + 1,
                    season: Season::Mam,
                },
            },
        }
    }

    /// Number of calendar days in the period.
    pub fn len_days(&self) -> i64 {
        (self.last_day() - self.first_day()).num_days() + 1
    }

    /// Human-readable label: `1950`, `1950-03`, `1950-DJF`.
    pub fn label(&self) -> String {
        match *self {
            Period::Year(year) => format!("{}", year),
            Period::Month { year, month } => format!("{}-{:02}", year, month),
            Period::Season { year, season } => format!("{}-{}", year, season.as_str()),
        }
    }
}

impl fmt::Display for Period {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.label())
    }
}

// Day 1 of any month exists for every year chrono can represent.
fn ymd(year: i32, month: u32) -> NaiveDate {
    NaiveDate::from_ymd_opt(year, month, 1).unwrap_or_default()
}

/// Inclusive calendar date range.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct TimeRange {
    pub start: NaiveDate,
    pub end: NaiveDate,
}

impl TimeRange {
    pub fn new(start: NaiveDate, end: NaiveDate) -> ClimateResult<Self> {
        if start > end {
            return Err(ClimateError::config_invalid(format!(
                "time range start {} is after end {}",
                start, end
            )));
        }
        Ok(Self { start, end })
    }

    /// Whole calendar years, `start_year` through `end_year` inclusive.
    pub fn years(start_year: i32, end_year: i32) -> ClimateResult<Self> {
        let start = NaiveDate::from_ymd_opt(start_year, 1, 1)
            .ok_or_else(|| ClimateError::config_invalid(format!("invalid year {}", start_year)))?;
        let end = NaiveDate::from_ymd_opt(end_year, 12, 31)
            .ok_or_else(|| ClimateError::config_invalid(format!("invalid year {}", end_year)))?;
        Self::new(start, end)
    }

    pub fn contains(&self, date: NaiveDate) -> bool {
        date >= self.start && date <= self.end
    }
}

/// Partition of a sorted time axis into consecutive aggregation periods.
///
/// Every period between the first and last requested day is present, even
/// when no time step falls inside it; such periods map to an empty range.
#[derive(Debug, Clone)]
pub struct PeriodIndex {
    aggregation: Aggregation,
    periods: Vec<Period>,
    ranges: Vec<Range<usize>>,
}

impl PeriodIndex {
    /// Build the index for `times`, optionally restricted to `window`.
    pub fn build(aggregation: Aggregation, times: &[NaiveDate], window: Option<TimeRange>) -> Self {
        let bounds = match window {
            Some(w) => Some((w.start, w.end)),
            None => times.first().zip(times.last()).map(|(a, b)| (*a, *b)),
        };

        let mut periods = Vec::new();
        let mut ranges = Vec::new();

        if let Some((start, end)) = bounds {
            let mut period = aggregation.period_of(start);
            while period.first_day() <= end {
                let lo_day = period.first_day().max(start);
                let hi_day = period.last_day().min(end);
                let lo = times.partition_point(|d| *d < lo_day);
                let hi = times.partition_point(|d| *d <= hi_day).max(lo);
                periods.push(period);
                ranges.push(lo..hi);
                period = period.next();
            }
        }

        Self {
            aggregation,
            periods,
            ranges,
        }
    }

    pub fn aggregation(&self) -> Aggregation {
        self.aggregation
    }

    pub fn periods(&self) -> &[Period] {
        &self.periods
    }

    /// Time-index range of each period.
    pub fn ranges(&self) -> &[Range<usize>] {
        &self.ranges
    }

    pub fn len(&self) -> usize {
        self.periods.len()
    }

    pub fn is_empty(&self) -> bool {
        self.periods.is_empty()
    }
}
