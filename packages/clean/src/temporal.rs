//! Date-of-stop validation, time-of-stop parsing, and the derived timestamp.

use chrono::{Datelike as _, NaiveDate, NaiveDateTime, NaiveTime};
use traffic_violations_lookup::PipelineConfig;
use traffic_violations_record_models::{RecordSet, Value};

use crate::CleanError;

// Two-digit years come first so `"09/24/13"` is not read as year 13.
const DATE_FORMATS: &[&str] = &[
    "%m/%d/%y", "%m/%d/%Y", "%Y-%m-%d", "%Y/%m/%d", "%m-%d-%Y", "%d-%b-%Y", "%b %d, %Y",
    "%B %d, %Y",
];

const DATETIME_FORMATS: &[&str] = &[
    "%Y-%m-%d %H:%M:%S",
    "%Y-%m-%d %H:%M:%S%.f",
    "%Y-%m-%dT%H:%M:%S",
    "%Y-%m-%dT%H:%M:%S%.f",
    "%m/%d/%Y %H:%M:%S",
    "%m/%d/%Y %H:%M",
    "%m/%d/%Y %I:%M:%S %p",
    "%m/%d/%Y %I:%M %p",
];

const TIME_FORMATS: &[&str] = &[
    "%H:%M:%S",
    "%H:%M",
    "%H:%M:%S%.f",
    "%I:%M:%S %p",
    "%I:%M %p",
    "%I:%M%p",
];

/// Parses a date in any of the common US and ISO layouts. A trailing time
/// of day is accepted and discarded.
#[must_use]
pub fn parse_date(raw: &str) -> Option<NaiveDate> {
    let raw = raw.trim();
    DATE_FORMATS
        .iter()
        .find_map(|fmt| NaiveDate::parse_from_str(raw, fmt).ok())
        .or_else(|| parse_datetime(raw).map(|dt| dt.date()))
}

/// Parses a full date and time of day.
#[must_use]
pub fn parse_datetime(raw: &str) -> Option<NaiveDateTime> {
    let raw = raw.trim();
    DATETIME_FORMATS
        .iter()
        .find_map(|fmt| NaiveDateTime::parse_from_str(raw, fmt).ok())
}

/// Parses a time of day. Dots are read as colons (`"14.05.00"`).
#[must_use]
pub fn parse_time(raw: &str) -> Option<NaiveTime> {
    let raw = raw.trim().replace('.', ":");
    TIME_FORMATS
        .iter()
        .find_map(|fmt| NaiveTime::parse_from_str(&raw, fmt).ok())
}

/// `true` if `date` is not in the future and its year lies in
/// `[min_year, today.year()]`.
#[must_use]
pub fn is_accepted_date(date: NaiveDate, min_year: i32, today: NaiveDate) -> bool {
    date <= today && (min_year..=today.year()).contains(&date.year())
}

fn date_of(value: &Value) -> Option<NaiveDate> {
    match value {
        Value::Date(d) => Some(*d),
        Value::Timestamp(ts) => Some(ts.date()),
        Value::Text(s) => parse_date(s),
        _ => None,
    }
}

fn time_of(value: &Value) -> Option<NaiveTime> {
    match value {
        Value::Time(t) => Some(*t),
        Value::Timestamp(ts) => Some(ts.time()),
        Value::Text(s) => parse_time(s),
        _ => None,
    }
}

/// Replaces the date-of-stop column with validated dates. Unparseable,
/// future, or out-of-window dates become missing.
///
/// # Errors
///
/// Returns [`CleanError::Record`] if the column is absent.
pub fn clean_date_of_stop(
    records: &mut RecordSet,
    config: &PipelineConfig,
    today: NaiveDate,
) -> Result<(), CleanError> {
    let min_year = config.temporal.min_year;
    let mut rejected = 0_usize;
    for value in records.require_mut(&config.columns.date_of_stop)? {
        let date = date_of(value).filter(|d| is_accepted_date(*d, min_year, today));
        if date.is_none() && !value.is_missing() {
            rejected += 1;
        }
        *value = date.map_or(Value::Missing, Value::Date);
    }
    if rejected > 0 {
        log::debug!("Rejected {rejected} dates of stop");
    }
    Ok(())
}

/// Parses the time-of-stop column and derives the timestamp column from the
/// (already validated) date and the time. The timestamp is missing whenever
/// either part is.
///
/// # Errors
///
/// Returns [`CleanError::Record`] if the date or time column is absent.
pub fn clean_time_of_stop(
    records: &mut RecordSet,
    config: &PipelineConfig,
) -> Result<(), CleanError> {
    let columns = &config.columns;
    for value in records.require_mut(&columns.time_of_stop)? {
        *value = time_of(value).map_or(Value::Missing, Value::Time);
    }

    let dates = records.require(&columns.date_of_stop)?;
    let times = records.require(&columns.time_of_stop)?;
    let timestamps: Vec<Value> = dates
        .iter()
        .zip(times)
        .map(|(date, time)| match (date_of(date), time_of(time)) {
            (Some(d), Some(t)) => Value::Timestamp(d.and_time(t)),
            _ => Value::Missing,
        })
        .collect();

    records.set_column(&columns.timestamp, timestamps)?;
    Ok(())
}
