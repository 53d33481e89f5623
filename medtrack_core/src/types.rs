//! Core domain types for medtrack.
//!
//! - Medications and the validated input used to create or update them
//! - Dose events recorded when a scheduled time is taken
//! - Joined rows used by the history report

use crate::schedule::DateRange;
use crate::time::TimeOfDay;
use chrono::NaiveDate;
use once_cell::sync::Lazy;
use regex::Regex;
use serde::{Deserialize, Serialize};
use std::convert::Infallible;
use std::fmt;
use std::str::FromStr;

static HEX_COLOR: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"^#([0-9A-Fa-f]{3}|[0-9A-Fa-f]{6})$").expect("colour pattern is valid")
});

/// Whether `value` is a `#rgb` or `#rrggbb` colour
pub fn is_hex_color(value: &str) -> bool {
    HEX_COLOR.is_match(value)
}

// ============================================================================
// Medication
// ============================================================================

/// A stored medication
///
/// `period` keeps the stored text. It is parsed on demand with
/// [`crate::schedule::parse_period`] so that a malformed row does not prevent
/// the rest of the list from loading.
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq)]
pub struct Medication {
    pub id: i64,
    pub name: String,
    pub amount: String,
    pub times: Vec<TimeOfDay>,
    pub period: String,
    pub color: String,
}

impl Medication {
    /// Parsed active range of this medication
    pub fn date_range(&self) -> crate::Result<DateRange> {
        crate::schedule::parse_period(&self.period)
    }

    /// Whether `time` is one of the scheduled times
    pub fn is_scheduled_at(&self, time: TimeOfDay) -> bool {
        self.times.contains(&time)
    }
}

/// Longest period a medication may be saved with, about ten years
pub const MAX_PERIOD_DAYS: usize = 3660;

/// Validated medication fields ready to be written
#[derive(Clone, Debug, PartialEq)]
pub struct NewMedication {
    pub name: String,
    pub amount: String,
    pub times: Vec<TimeOfDay>,
    pub period: DateRange,
    pub color: String,
}

impl NewMedication {
    /// Presence and format checks applied before anything is persisted
    pub fn validate(&self) -> crate::Result<()> {
        let mut missing = Vec::new();
        if self.name.trim().is_empty() {
            missing.push("name");
        }
        if self.amount.trim().is_empty() {
            missing.push("amount");
        }
        if self.times.is_empty() {
            missing.push("times");
        }
        if !missing.is_empty() {
            return Err(crate::Error::Validation(format!(
                "please fill all fields (missing: {})",
                missing.join(", ")
            )));
        }

        let days = self.period.len_days();
        if days > MAX_PERIOD_DAYS {
            return Err(crate::Error::Validation(format!(
                "period spans {} days, at most {} days allowed",
                days, MAX_PERIOD_DAYS
            )));
        }

        if !is_hex_color(&self.color) {
            return Err(crate::Error::Validation(format!(
                "'{}' is not a hex colour",
                self.color
            )));
        }
        Ok(())
    }
}

// ============================================================================
// Dose events
// ============================================================================

/// Status tag of a dose event
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum DoseStatus {
    Done,
    Other(String),
}

impl FromStr for DoseStatus {
    type Err = Infallible;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Ok(match s.trim() {
            "done" => Self::Done,
            other => Self::Other(other.to_string()),
        })
    }
}

impl fmt::Display for DoseStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Done => write!(f, "done"),
            Self::Other(s) => write!(f, "{s}"),
        }
    }
}

impl Serialize for DoseStatus {
    fn serialize<S: serde::Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

impl<'de> Deserialize<'de> for DoseStatus {
    fn deserialize<D: serde::Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let raw = String::deserialize(deserializer)?;
        Ok(raw
            .parse::<DoseStatus>()
            .unwrap_or_else(|never: Infallible| match never {}))
    }
}

/// A scheduled time marked as taken on a given day
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq)]
pub struct DoseEvent {
    pub id: i64,
    pub medication_id: i64,
    pub time_taken: TimeOfDay,
    pub date: NaiveDate,
    pub status: DoseStatus,
}

/// Dose event fields ready to be written
#[derive(Clone, Debug, PartialEq)]
pub struct NewDoseEvent {
    pub medication_id: i64,
    pub time_taken: TimeOfDay,
    pub date: NaiveDate,
    pub status: DoseStatus,
}

/// A dose event joined with its medication, as listed in the history report
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq)]
pub struct TakenRow {
    pub name: String,
    pub amount: String,
    pub times: String,
    pub period: String,
    pub time_taken: String,
    pub date: String,
    pub status: String,
}
