//! Decoding of CF-convention time coordinates
//!
//! Time values are offsets such as `hours since 1900-01-01 00:00:00.0`.
//! Only Gregorian-compatible calendars are accepted.

use crate::errors::{HazardError, Result};
use chrono::{Datelike, NaiveDate, NaiveDateTime, TimeDelta};

const REFERENCE_FORMATS: &[&str] = &[
    "%Y-%m-%d %H:%M:%S%.f",
    "%Y-%m-%dT%H:%M:%S%.f",
    "%Y-%m-%d %H:%M:%S",
    "%Y-%m-%dT%H:%M:%S",
    "%Y-%m-%d %H:%M",
    "%Y-%m-%dT%H:%M",
];

/// Parsed `"<step> since <reference>"` units
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TimeUnits {
    step_millis: f64,
    reference: NaiveDateTime,
}

impl TimeUnits {
    /// Parse a CF time `units` attribute.
    ///
    /// # Errors
    ///
    /// Returns [`HazardError::TimeDecode`] when the step is not one of
    /// seconds/minutes/hours/days or the reference date is unreadable.
    pub fn parse(units: &str) -> Result<Self> {
        let (step, reference) = units
            .split_once(" since ")
            .ok_or_else(|| decode_error(format!("'{units}' is not of the form '<unit> since <date>'")))?;

        let step_millis = match step.trim().to_lowercase().as_str() {
            "seconds" | "second" | "secs" | "sec" | "s" => 1_000.0,
            "minutes" | "minute" | "mins" | "min" => 60_000.0,
            "hours" | "hour" | "hrs" | "hr" | "h" => 3_600_000.0,
            "days" | "day" | "d" => 86_400_000.0,
            other => return Err(decode_error(format!("unsupported time step '{other}'"))),
        };

        Ok(Self {
            step_millis,
            reference: parse_reference(reference)?,
        })
    }

    #[must_use]
    pub const fn reference(&self) -> NaiveDateTime {
        self.reference
    }

    /// Convert one offset to a timestamp.
    ///
    /// # Errors
    ///
    /// Returns [`HazardError::TimeDecode`] for non-finite or out-of-range offsets.
    pub fn decode(&self, offset: f64) -> Result<NaiveDateTime> {
        if !offset.is_finite() {
            return Err(decode_error(format!("non-finite time value {offset}")));
        }
        #[allow(clippy::cast_possible_truncation)]
        let millis = (offset * self.step_millis).round() as i64;
        TimeDelta::try_milliseconds(millis)
            .and_then(|delta| self.reference.checked_add_signed(delta))
            .ok_or_else(|| decode_error(format!("time value {offset} is out of range")))
    }
}

fn parse_reference(text: &str) -> Result<NaiveDateTime> {
    let cleaned = text
        .trim()
        .trim_end_matches("UTC")
        .trim_end_matches('Z')
        .trim();

    for format in REFERENCE_FORMATS {
        if let Ok(parsed) = NaiveDateTime::parse_from_str(cleaned, format) {
            return Ok(parsed);
        }
    }
    NaiveDate::parse_from_str(cleaned, "%Y-%m-%d")
        .ok()
        .and_then(|date| date.and_hms_opt(0, 0, 0))
        .ok_or_else(|| decode_error(format!("unreadable reference date '{}'", text.trim())))
}

/// Reject calendars that do not follow the Gregorian rules.
///
/// # Errors
///
/// Returns [`HazardError::UnsupportedCalendar`] for e.g. `noleap` or `360_day`.
pub fn check_calendar(calendar: Option<&str>) -> Result<()> {
    match calendar.map(|c| c.trim().to_lowercase()) {
        None => Ok(()),
        Some(c) if matches!(c.as_str(), "standard" | "gregorian" | "proleptic_gregorian") => {
            Ok(())
        }
        Some(c) => Err(HazardError::UnsupportedCalendar { calendar: c }),
    }
}

/// Decode a whole time coordinate.
///
/// # Errors
///
/// Propagates unit, calendar and range errors from [`TimeUnits`].
pub fn decode_times(
    values: &[f64],
    units: &str,
    calendar: Option<&str>,
) -> Result<Vec<NaiveDateTime>> {
    check_calendar(calendar)?;
    let parsed = TimeUnits::parse(units)?;
    values.iter().map(|&v| parsed.decode(v)).collect()
}

/// Calendar year of every timestamp
#[must_use]
pub fn years_of(times: &[NaiveDateTime]) -> Vec<i32> {
    times.iter().map(|t| t.year()).collect()
}

/// Number of days in a Gregorian year
#[must_use]
pub const fn days_in_year(year: i32) -> u32 {
    if (year % 4 == 0 && year % 100 != 0) || year % 400 == 0 {
        366
    } else {
        365
    }
}

fn decode_error(message: String) -> HazardError {
    HazardError::TimeDecode { message }
}
