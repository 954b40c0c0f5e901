//! CF-convention metadata decoding.
//!
//! Climate model output encodes time as an offset from an epoch
//! (`days since 1950-01-01`) under a named calendar, and precipitation as a
//! mass flux. These helpers turn both into calendar dates and mm/day.

use std::str::FromStr;

use chrono::{Datelike, Duration, NaiveDate};

use crate::error::{NetCdfError, NetCdfResult};

/// CF calendars that map onto real dates.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Calendar {
    /// standard, gregorian, proleptic_gregorian
    Standard,
    /// noleap, 365_day: every year has 365 days, February 29 never occurs
    NoLeap,
}

impl FromStr for Calendar {
    type Err = NetCdfError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "" | "standard" | "gregorian" | "proleptic_gregorian" => Ok(Calendar::Standard),
            "noleap" | "no_leap" | "365_day" => Ok(Calendar::NoLeap),
            other => Err(NetCdfError::UnsupportedCalendar(other.to_string())),
        }
    }
}

const CUMULATIVE_DAYS: [i64; 12] = [0, 31, 59, 90, 120, 151, 181, 212, 243, 273, 304, 334];

impl Calendar {
    /// Add a whole-day offset to an epoch under this calendar.
    pub fn add_days(self, epoch: NaiveDate, days: i64) -> NetCdfResult<NaiveDate> {
        match self {
            Calendar::Standard => epoch
                .checked_add_signed(Duration::days(days))
                .ok_or_else(|| {
                    NetCdfError::InvalidFormat(format!("time offset {} out of range", days))
                }),
            Calendar::NoLeap => noleap_date(noleap_ordinal(epoch)? + days),
        }
    }
}

fn noleap_ordinal(date: NaiveDate) -> NetCdfResult<i64> {
    if date.month() == 2 && date.day() == 29 {
        return Err(NetCdfError::InvalidFormat(format!(
            "{} does not exist in a noleap calendar",
            date
        )));
    }
    Ok(date.year() as i64 * 365 + CUMULATIVE_DAYS[date.month0() as usize] + date.day0() as i64)
}

fn noleap_date(ordinal: i64) -> NetCdfResult<NaiveDate> {
    let year = ordinal.div_euclid(365);
    let day_of_year = ordinal.rem_euclid(365);
    let month0 = CUMULATIVE_DAYS
        .iter()
        .rposition(|&start| start <= day_of_year)
        .unwrap_or(0);
    let day = day_of_year - CUMULATIVE_DAYS[month0] + 1;
    i32::try_from(year)
        .ok()
        .and_then(|y| NaiveDate::from_ymd_opt(y, month0 as u32 + 1, day as u32))
        .ok_or_else(|| NetCdfError::InvalidFormat(format!("noleap ordinal {} out of range", ordinal)))
}

/// Unit of a CF time offset.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TimeStep {
    Days,
    Hours,
}

/// Parsed `<step> since <epoch>` time units.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TimeUnits {
    pub step: TimeStep,
    pub epoch: NaiveDate,
    /// Time of day of the epoch, as a fraction of a day.
    pub epoch_fraction: f64,
}

impl TimeUnits {
    /// Parse strings such as `days since 1950-01-01` or
    /// `hours since 1900-01-01T12:00:00Z`.
    pub fn parse(units: &str) -> NetCdfResult<Self> {
        let lower = units.trim().to_lowercase();
        let (step, reference) = lower
            .split_once(" since ")
            .ok_or_else(|| NetCdfError::InvalidFormat(format!("time units '{}'", units)))?;

        let step = match step.trim() {
            "days" | "day" | "d" => TimeStep::Days,
            "hours" | "hour" | "h" => TimeStep::Hours,
            other => {
                return Err(NetCdfError::InvalidFormat(format!(
                    "unsupported time step '{}'",
                    other
                )))
            }
        };

        let reference = reference.trim();
        let (date_part, time_part) = match reference.split_once(|c| c == 'T' || c == 't' || c == ' ') {
            Some((date, time)) => (date, Some(time)),
            None => (reference, None),
        };

        let epoch = NaiveDate::parse_from_str(date_part, "%Y-%m-%d").map_err(|e| {
            NetCdfError::InvalidFormat(format!("time epoch '{}': {}", date_part, e))
        })?;

        let epoch_fraction = time_part.map(parse_day_fraction).unwrap_or(0.0);

        Ok(Self {
            step,
            epoch,
            epoch_fraction,
        })
    }

    /// Offset in days (including the epoch's time of day) for a raw value.
    pub fn days(&self, value: f64) -> f64 {
        let days = match self.step {
            TimeStep::Days => value,
            TimeStep::Hours => value / 24.0,
        };
        days + self.epoch_fraction
    }
}

fn parse_day_fraction(time: &str) -> f64 {
    let time = time.trim().trim_end_matches(|c| c == 'z' || c == 'Z');
    let mut parts = time.split(':').map(|p| p.trim().parse::<f64>().unwrap_or(0.0));
    let hours = parts.next().unwrap_or(0.0);
    let minutes = parts.next().unwrap_or(0.0);
    (hours + minutes / 60.0) / 24.0
}

/// Decode raw time values to the calendar date each falls on.
pub fn decode_times(values: &[f64], units: &str, calendar: &str) -> NetCdfResult<Vec<NaiveDate>> {
    let units = TimeUnits::parse(units)?;
    let calendar: Calendar = calendar.parse()?;

    values
        .iter()
        .map(|&value| {
            if !value.is_finite() {
                return Err(NetCdfError::InvalidFormat(
                    "non-finite time value".to_string(),
                ));
            }
            let offset = units.days(value).floor() as i64;
            calendar.add_days(units.epoch, offset)
        })
        .collect()
}

/// Factor converting a precipitation variable to mm/day.
pub fn precip_to_mm_per_day(units: &str) -> NetCdfResult<f32> {
    let compact: String = units
        .to_lowercase()
        .chars()
        .filter(|c| !c.is_whitespace())
        .collect();

    match compact.as_str() {
        // 1 kg m-2 of water is 1 mm; 86400 seconds per day
        "kgm-2s-1" | "kgm^-2s^-1" | "kgm**-2s**-1" | "kg/m2/s" | "kg/m^2/s" | "kg/(m2s)" => {
            Ok(86400.0)
        }
        "mm/day" | "mm/d" | "mmd-1" | "mmday-1" | "mm" => Ok(1.0),
        _ => Err(NetCdfError::UnsupportedUnits(units.to_string())),
    }
}
