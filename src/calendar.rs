//! Calendar helpers: timestamp parsing and the time keys used by event matching.

use crate::error::PanelError;
use chrono::{Datelike, Months, NaiveDate, NaiveDateTime, Timelike, Weekday};
use std::str::FromStr;

const TIMESTAMP_FORMATS: &[&str] = &[
    "%Y-%m-%d %H:%M:%S",
    "%Y-%m-%d %H:%M",
    "%Y-%m-%dT%H:%M:%S",
    "%Y/%m/%d %H:%M:%S",
    "%Y/%m/%d %H:%M",
];

const DATE_FORMATS: &[&str] = &["%Y-%m-%d", "%Y/%m/%d", "%Y%m%d"];

/// Parses a wall-clock timestamp. A bare date is read as midnight.
pub fn parse_timestamp(value: &str) -> Result<NaiveDateTime, PanelError> {
    let value = value.trim();
    TIMESTAMP_FORMATS
        .iter()
        .find_map(|format| NaiveDateTime::parse_from_str(value, format).ok())
        .or_else(|| {
            DATE_FORMATS
                .iter()
                .find_map(|format| NaiveDate::parse_from_str(value, format).ok())
                .and_then(|date| date.and_hms_opt(0, 0, 0))
        })
        .ok_or_else(|| PanelError::TimestampParse(value.to_string()))
}

/// Parses a calendar date. A full timestamp is accepted and truncated to its date.
pub fn parse_date(value: &str) -> Result<NaiveDate, PanelError> {
    let value = value.trim();
    DATE_FORMATS
        .iter()
        .find_map(|format| NaiveDate::parse_from_str(value, format).ok())
        .or_else(|| {
            TIMESTAMP_FORMATS
                .iter()
                .find_map(|format| NaiveDateTime::parse_from_str(value, format).ok())
                .map(|ts| ts.date())
        })
        .ok_or_else(|| PanelError::DateParse(value.to_string()))
}

/// ISO day of week, 1 = Monday through 7 = Sunday.
pub fn day_of_week(ts: &NaiveDateTime) -> u8 {
    ts.weekday().number_from_monday() as u8
}

/// Time of day as an `HHMM` integer, e.g. 17:45 -> 1745.
pub fn hour_minute(ts: &NaiveDateTime) -> u32 {
    ts.hour() * 100 + ts.minute()
}

/// Calendar month as a `YYYYMM` integer.
pub fn year_month(ts: &NaiveDateTime) -> u32 {
    ts.year() as u32 * 100 + ts.month()
}

/// Day class used by the recurring congestion table.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DayClass {
    Weekday,
    Saturday,
    Sunday,
}

impl DayClass {
    pub fn of(ts: &NaiveDateTime) -> Self {
        match ts.weekday() {
            Weekday::Sat => DayClass::Saturday,
            Weekday::Sun => DayClass::Sunday,
            _ => DayClass::Weekday,
        }
    }
}

impl FromStr for DayClass {
    type Err = PanelError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "weekday" => Ok(DayClass::Weekday),
            "saturday" => Ok(DayClass::Saturday),
            "sunday" => Ok(DayClass::Sunday),
            _ => Err(PanelError::UnknownDayClass(s.to_string())),
        }
    }
}

/// Every date from `start` through `end`, inclusive. Empty when `end < start`.
pub fn expand_dates(start: NaiveDate, end: NaiveDate) -> impl Iterator<Item = NaiveDate> {
    start.iter_days().take_while(move |day| *day <= end)
}

/// First and last day of every month from `(start_year, start_month)` through
/// `(end_year, end_month)` inclusive.
pub fn month_ranges(
    start_year: i32,
    start_month: u32,
    end_year: i32,
    end_month: u32,
) -> Result<Vec<(NaiveDate, NaiveDate)>, PanelError> {
    let first_of = |year: i32, month: u32| {
        NaiveDate::from_ymd_opt(year, month, 1).ok_or_else(|| {
            PanelError::InvalidConfig(format!("invalid year-month {year}-{month:02}"))
        })
    };
    let mut current = first_of(start_year, start_month)?;
    let last = first_of(end_year, end_month)?;

    let mut ranges = Vec::new();
    while current <= last {
        let next = current
            .checked_add_months(Months::new(1))
            .ok_or_else(|| PanelError::InvalidConfig(format!("month overflow after {current}")))?;
        let month_end = next
            .pred_opt()
            .ok_or_else(|| PanelError::InvalidConfig(format!("no day before {next}")))?;
        ranges.push((current, month_end));
        current = next;
    }
    Ok(ranges)
}
