//! Screen controllers.
//!
//! Each screen owns its transient state as an explicit enum and talks to a
//! [`crate::store::MedicationRepository`]. Every write is followed by a full
//! re-fetch; state only moves on once both succeed.

pub mod medications;
pub mod today;

pub use medications::{EditorState, MedicationForm, MedicationsScreen};
pub use today::{DayModal, TodayScreen};
