//! Time-of-day entries for medication schedules.
//!
//! Times are entered as `HH:mm` (zero-padded, 24-hour) and stored as a single
//! text column joined by `", "`.

use crate::{Error, Result};
use once_cell::sync::Lazy;
use regex::Regex;
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::fmt;
use std::str::FromStr;

/// Separator between times in the stored column
pub const TIMES_SEPARATOR: &str = ", ";

static TIME_PATTERN: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^([01]\d|2[0-3]):([0-5]\d)$").expect("time pattern is valid"));

/// A scheduled time of day, minute precision
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct TimeOfDay {
    hour: u8,
    minute: u8,
}

impl TimeOfDay {
    pub fn hour(&self) -> u8 {
        self.hour
    }

    pub fn minute(&self) -> u8 {
        self.minute
    }
}

impl FromStr for TimeOfDay {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        let trimmed = s.trim();
        let caps = TIME_PATTERN
            .captures(trimmed)
            .ok_or_else(|| Error::InvalidTimeFormat(trimmed.to_string()))?;

        // The pattern guarantees two ASCII digits per group
        let hour = caps[1]
            .parse()
            .map_err(|_| Error::InvalidTimeFormat(trimmed.to_string()))?;
        let minute = caps[2]
            .parse()
            .map_err(|_| Error::InvalidTimeFormat(trimmed.to_string()))?;

        Ok(Self { hour, minute })
    }
}

impl fmt::Display for TimeOfDay {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:02}:{:02}", self.hour, self.minute)
    }
}

impl Serialize for TimeOfDay {
    fn serialize<S: Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

impl<'de> Deserialize<'de> for TimeOfDay {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> std::result::Result<Self, D::Error> {
        let raw = String::deserialize(deserializer)?;
        raw.parse().map_err(serde::de::Error::custom)
    }
}

/// Apply the time input mask to raw keystrokes
///
/// Non-digits are dropped, a colon is inserted after the hour once a third
/// digit arrives, and the result is capped at five characters. The output is
/// not validated; `TimeOfDay::from_str` does that when the entry is added.
pub fn format_time_entry(raw: &str) -> String {
    let digits: String = raw.chars().filter(|c| c.is_ascii_digit()).collect();

    let mut formatted = if digits.len() >= 3 {
        format!("{}:{}", &digits[..2], &digits[2..digits.len().min(4)])
    } else {
        digits
    };

    formatted.truncate(5);
    formatted
}

/// Join times into the stored column format
pub fn encode_times(times: &[TimeOfDay]) -> String {
    times
        .iter()
        .map(|t| t.to_string())
        .collect::<Vec<_>>()
        .join(TIMES_SEPARATOR)
}

/// Split the stored column back into times
///
/// Entries that do not parse are logged and skipped.
pub fn decode_times(stored: &str) -> Vec<TimeOfDay> {
    stored
        .split(TIMES_SEPARATOR)
        .filter(|part| !part.trim().is_empty())
        .filter_map(|part| match part.parse::<TimeOfDay>() {
            Ok(time) => Some(time),
            Err(e) => {
                tracing::warn!("Skipping stored time entry: {}", e);
                None
            }
        })
        .collect()
}
