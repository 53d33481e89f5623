//! Schedule evaluation over medication periods.
//!
//! A period is stored as `"YYYY-MM-DD to YYYY-MM-DD"`, inclusive on both ends.
//! Everything here is pure: callers pass the reference date in.
//!
//! Malformed or reversed periods never fail an evaluation. A medication with
//! such a period is never active and contributes no calendar markings; the
//! marking map reports it as a [`ScheduleWarning`] instead.

use crate::{DoseEvent, Error, Medication, Result, TimeOfDay};
use chrono::NaiveDate;
use serde::{Serialize, Serializer};
use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;

/// Separator between the two dates of a stored period
pub const PERIOD_SEPARATOR: &str = " to ";

// ============================================================================
// Date ranges
// ============================================================================

/// Inclusive range of calendar days
///
/// `start > end` is representable because stored data is not checked; such a
/// range contains no days.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct DateRange {
    pub start: NaiveDate,
    pub end: NaiveDate,
}

impl DateRange {
    pub fn new(start: NaiveDate, end: NaiveDate) -> Self {
        Self { start, end }
    }

    pub fn is_reversed(&self) -> bool {
        self.start > self.end
    }

    /// Whole-day inclusive membership
    pub fn contains(&self, date: NaiveDate) -> bool {
        self.start <= date && date <= self.end
    }

    /// Number of days in the range (zero when reversed)
    pub fn len_days(&self) -> usize {
        if self.is_reversed() {
            0
        } else {
            (self.end - self.start).num_days() as usize + 1
        }
    }

    /// Every day from start to end inclusive
    pub fn days(&self) -> impl Iterator<Item = NaiveDate> {
        let end = self.end;
        self.start.iter_days().take_while(move |d| *d <= end)
    }
}

impl FromStr for DateRange {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        parse_period(s)
    }
}

impl fmt::Display for DateRange {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{}{}{}",
            self.start.format("%Y-%m-%d"),
            PERIOD_SEPARATOR,
            self.end.format("%Y-%m-%d")
        )
    }
}

/// Parse a stored period into its two dates
///
/// Fails with [`Error::MalformedPeriod`] unless splitting on `" to "` yields
/// exactly two ISO dates. The order of the dates is not checked.
pub fn parse_period(period: &str) -> Result<DateRange> {
    let malformed = || Error::MalformedPeriod(period.to_string());

    let parts: Vec<&str> = period.trim().split(PERIOD_SEPARATOR).collect();
    let [start, end] = parts.as_slice() else {
        return Err(malformed());
    };

    let start = NaiveDate::parse_from_str(start.trim(), "%Y-%m-%d").map_err(|_| malformed())?;
    let end = NaiveDate::parse_from_str(end.trim(), "%Y-%m-%d").map_err(|_| malformed())?;

    Ok(DateRange::new(start, end))
}

// ============================================================================
// Membership
// ============================================================================

/// Whether the medication is prescribed on `date`
pub fn is_active_on(medication: &Medication, date: NaiveDate) -> bool {
    match medication.date_range() {
        Ok(range) => range.contains(date),
        Err(e) => {
            tracing::debug!("Medication {} treated as inactive: {}", medication.id, e);
            false
        }
    }
}

/// Medications active on `date`, in input order
pub fn filter_active_on<'a, I>(medications: I, date: NaiveDate) -> Vec<&'a Medication>
where
    I: IntoIterator<Item = &'a Medication>,
{
    medications
        .into_iter()
        .filter(|med| is_active_on(med, date))
        .collect()
}

// ============================================================================
// Calendar marking
// ============================================================================

/// One coloured dot under a calendar day
#[derive(Clone, Debug, Serialize, PartialEq)]
pub struct Dot {
    #[serde(rename = "key", serialize_with = "as_text")]
    pub medication_id: i64,
    pub color: String,
}

/// Markings of a single calendar day
#[derive(Clone, Debug, Default, Serialize, PartialEq)]
pub struct DayMarking {
    pub dots: Vec<Dot>,
    #[serde(skip_serializing_if = "std::ops::Not::not")]
    pub selected: bool,
}

/// Why a medication contributed no markings
#[derive(Clone, Debug, Serialize, PartialEq)]
#[serde(rename_all = "snake_case")]
pub enum WarningKind {
    MalformedPeriod,
    ReversedPeriod,
}

/// A medication skipped while building the marking map
#[derive(Clone, Debug, Serialize, PartialEq)]
pub struct ScheduleWarning {
    pub medication_id: i64,
    pub period: String,
    pub kind: WarningKind,
}

impl fmt::Display for ScheduleWarning {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let reason = match self.kind {
            WarningKind::MalformedPeriod => "malformed period",
            WarningKind::ReversedPeriod => "period ends before it starts",
        };
        write!(
            f,
            "medication {} skipped: {} '{}'",
            self.medication_id, reason, self.period
        )
    }
}

/// Per-day markings for calendar display
#[derive(Clone, Debug, Default, Serialize)]
pub struct MarkingMap {
    pub days: BTreeMap<NaiveDate, DayMarking>,
    pub warnings: Vec<ScheduleWarning>,
}

impl MarkingMap {
    pub fn get(&self, date: NaiveDate) -> Option<&DayMarking> {
        self.days.get(&date)
    }

    /// Number of dots under `date`
    pub fn dot_count(&self, date: NaiveDate) -> usize {
        self.get(date).map_or(0, |day| day.dots.len())
    }
}

/// Build the multi-dot marking map
///
/// Every day of every medication's period gets one dot for that medication.
/// Dots under a day follow the input order of `medications`. The selected day
/// is flagged without losing its dots and is present even when no medication
/// is active on it.
pub fn build_marking_map(medications: &[Medication], selected: NaiveDate) -> MarkingMap {
    let mut map = MarkingMap::default();

    for med in medications {
        let range = match med.date_range() {
            Ok(range) => range,
            Err(e) => {
                tracing::warn!("Skipping medication {} in calendar: {}", med.id, e);
                map.warnings.push(ScheduleWarning {
                    medication_id: med.id,
                    period: med.period.clone(),
                    kind: WarningKind::MalformedPeriod,
                });
                continue;
            }
        };

        if range.is_reversed() {
            tracing::warn!(
                "Skipping medication {} in calendar: reversed period '{}'",
                med.id,
                med.period
            );
            map.warnings.push(ScheduleWarning {
                medication_id: med.id,
                period: med.period.clone(),
                kind: WarningKind::ReversedPeriod,
            });
            continue;
        }

        for day in range.days() {
            map.days.entry(day).or_default().dots.push(Dot {
                medication_id: med.id,
                color: med.color.clone(),
            });
        }
    }

    map.days.entry(selected).or_default().selected = true;

    tracing::debug!(
        "Built marking map: {} days, {} skipped medications",
        map.days.len(),
        map.warnings.len()
    );
    map
}

fn as_text<S: Serializer>(value: &i64, serializer: S) -> std::result::Result<S::Ok, S::Error> {
    serializer.collect_str(value)
}

// ============================================================================
// Daily checklist
// ============================================================================

/// One scheduled dose of an active medication on a given day
#[derive(Clone, Debug, Serialize, PartialEq)]
pub struct DoseSlot {
    pub medication_id: i64,
    pub name: String,
    pub time: TimeOfDay,
    /// Id of the dose event recording this dose, if taken
    pub taken_by: Option<i64>,
}

impl DoseSlot {
    pub fn is_taken(&self) -> bool {
        self.taken_by.is_some()
    }
}

/// Scheduled doses for `date` and whether each has been taken
///
/// Slots follow medication order, then the medication's time order.
pub fn dose_checklist(
    medications: &[Medication],
    events: &[DoseEvent],
    date: NaiveDate,
) -> Vec<DoseSlot> {
    filter_active_on(medications, date)
        .into_iter()
        .flat_map(|med| {
            med.times.iter().map(move |&time| {
                let taken_by = events
                    .iter()
                    .find(|e| e.medication_id == med.id && e.time_taken == time && e.date == date)
                    .map(|e| e.id);
                DoseSlot {
                    medication_id: med.id,
                    name: med.name.clone(),
                    time,
                    taken_by,
                }
            })
        })
        .collect()
}
