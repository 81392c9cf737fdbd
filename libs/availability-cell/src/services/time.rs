use std::sync::LazyLock;

use chrono::{Datelike, NaiveDate};
use regex::Regex;
use thiserror::Error;

pub const MINUTES_PER_DAY: i32 = 24 * 60;

static TIME_PATTERN: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^\d{2}:\d{2}$").expect("valid time pattern"));
static STORED_TIME_PATTERN: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^\d{2}:\d{2}(:\d{2}(\.\d+)?)?$").expect("valid stored time pattern"));
static DATE_PATTERN: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^\d{4}-\d{2}-\d{2}$").expect("valid date pattern"));

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum TimeError {
    #[error("invalid time '{0}', expected HH:MM")]
    InvalidTime(String),

    #[error("invalid date '{0}', expected YYYY-MM-DD")]
    InvalidDate(String),
}

/// Parses a zero-padded 24-hour `HH:MM` into minutes since midnight.
pub fn time_to_minutes(hhmm: &str) -> Result<i32, TimeError> {
    if !TIME_PATTERN.is_match(hhmm) {
        return Err(TimeError::InvalidTime(hhmm.to_string()));
    }
    hour_minute(hhmm).ok_or_else(|| TimeError::InvalidTime(hhmm.to_string()))
}

/// Like [`time_to_minutes`] but also accepts the `HH:MM:SS` form Postgres `time` columns return,
/// and `24:00` as end of day. Seconds are truncated.
pub fn stored_time_to_minutes(value: &str) -> Result<i32, TimeError> {
    if !STORED_TIME_PATTERN.is_match(value) {
        return Err(TimeError::InvalidTime(value.to_string()));
    }
    if value.starts_with("24:00") && value[5..].chars().all(|c| matches!(c, ':' | '.' | '0')) {
        return Ok(MINUTES_PER_DAY);
    }
    hour_minute(&value[..5]).ok_or_else(|| TimeError::InvalidTime(value.to_string()))
}

fn hour_minute(hhmm: &str) -> Option<i32> {
    let (hours, minutes) = hhmm.split_once(':')?;
    let hours: i32 = hours.parse().ok()?;
    let minutes: i32 = minutes.parse().ok()?;
    if hours > 23 || minutes > 59 {
        return None;
    }
    Some(hours * 60 + minutes)
}

/// Formats minutes since midnight as `HH:MM`, wrapping into a single day.
pub fn minutes_to_time(minutes: i32) -> String {
    let minutes = minutes.rem_euclid(MINUTES_PER_DAY);
    format!("{:02}:{:02}", minutes / 60, minutes % 60)
}

pub fn parse_date(value: &str) -> Result<NaiveDate, TimeError> {
    if !DATE_PATTERN.is_match(value) {
        return Err(TimeError::InvalidDate(value.to_string()));
    }
    NaiveDate::parse_from_str(value, "%Y-%m-%d").map_err(|_| TimeError::InvalidDate(value.to_string()))
}

/// Day of week with 0 = Sunday .. 6 = Saturday.
///
/// Computed from the calendar date alone. No instant or timezone is involved, so DST
/// transitions and UTC boundaries cannot shift the result.
pub fn weekday(date: NaiveDate) -> u8 {
    date.weekday().num_days_from_sunday() as u8
}

pub fn weekday_of(value: &str) -> Result<u8, TimeError> {
    parse_date(value).map(weekday)
}

/// Serde adapter keeping times as minutes in memory and `HH:MM` on the wire.
pub mod hhmm {
    use serde::{de, Deserialize, Deserializer, Serializer};

    use super::{minutes_to_time, stored_time_to_minutes, MINUTES_PER_DAY};

    pub fn serialize<S>(minutes: &i32, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        if *minutes == MINUTES_PER_DAY {
            return serializer.serialize_str("24:00");
        }
        serializer.serialize_str(&minutes_to_time(*minutes))
    }

    pub fn deserialize<'de, D>(deserializer: D) -> Result<i32, D::Error>
    where
        D: Deserializer<'de>,
    {
        let raw = String::deserialize(deserializer)?;
        stored_time_to_minutes(&raw).map_err(de::Error::custom)
    }
}
