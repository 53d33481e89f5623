//! Two-tap period picker used by the medication form.
//!
//! The first tap starts a range, the second completes it. A further tap starts
//! over. Taps are ordered so a completed range never ends before it starts.

use crate::schedule::DateRange;
use chrono::NaiveDate;
use serde::Serialize;
use std::collections::BTreeMap;

/// Progress of a period selection
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum RangeSelection {
    #[default]
    Empty,
    Started(NaiveDate),
    Complete(DateRange),
}

impl RangeSelection {
    /// Apply a calendar tap
    pub fn tap(self, date: NaiveDate) -> Self {
        match self {
            RangeSelection::Empty | RangeSelection::Complete(_) => RangeSelection::Started(date),
            RangeSelection::Started(start) if date < start => {
                RangeSelection::Complete(DateRange::new(date, start))
            }
            RangeSelection::Started(start) => RangeSelection::Complete(DateRange::new(start, date)),
        }
    }

    /// The completed range, if both ends have been picked
    pub fn range(&self) -> Option<DateRange> {
        match self {
            RangeSelection::Complete(range) => Some(*range),
            _ => None,
        }
    }
}

impl From<DateRange> for RangeSelection {
    fn from(range: DateRange) -> Self {
        RangeSelection::Complete(range)
    }
}

/// Period-style marking of one picked day
#[derive(Clone, Debug, Serialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct PeriodMark {
    pub color: String,
    pub text_color: String,
    pub starting_day: bool,
    pub ending_day: bool,
}

/// Marking for the picker calendar
///
/// A started selection marks its single day as the start. A complete selection
/// marks every day with the ends flagged.
pub fn period_marking(selection: &RangeSelection, color: &str) -> BTreeMap<NaiveDate, PeriodMark> {
    let mark = |starting_day, ending_day| PeriodMark {
        color: color.to_string(),
        text_color: "white".into(),
        starting_day,
        ending_day,
    };

    match selection {
        RangeSelection::Empty => BTreeMap::new(),
        RangeSelection::Started(start) => BTreeMap::from([(*start, mark(true, false))]),
        RangeSelection::Complete(range) => range
            .days()
            .map(|day| (day, mark(day == range.start, day == range.end)))
            .collect(),
    }
}
