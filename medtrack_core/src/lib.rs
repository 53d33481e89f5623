#![forbid(unsafe_code)]

//! Core domain model and business logic for medtrack.
//!
//! This crate provides:
//! - Domain types (medications, dose events, scheduled times)
//! - Schedule evaluation (active medications, calendar markings)
//! - SQLite persistence
//! - HTML/CSV reports
//! - Screen controllers for the management and day views

pub mod types;
pub mod error;
pub mod config;
pub mod logging;
pub mod time;
pub mod schedule;
pub mod picker;
pub mod store;
pub mod report;
pub mod export;
pub mod screens;

// Re-export commonly used types
pub use error::{Error, Result};
pub use types::*;
pub use config::Config;
pub use time::TimeOfDay;
pub use schedule::{
    build_marking_map, filter_active_on, is_active_on, parse_period, DateRange, MarkingMap,
};
pub use store::{MedicationRepository, SqliteStore};
pub use screens::{MedicationsScreen, TodayScreen};
