//! Error types for the medtrack_core library.

use std::io;

/// Result type alias using our Error type
pub type Result<T> = std::result::Result<T, Error>;

/// Core error type for medtrack_core operations
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// Period string absent or not splittable into two ISO dates
    #[error("Malformed period '{0}': expected 'YYYY-MM-DD to YYYY-MM-DD'")]
    MalformedPeriod(String),

    /// Time entry does not match HH:mm
    #[error("Invalid time '{0}': please enter a valid time in HH:mm format")]
    InvalidTimeFormat(String),

    /// Underlying datastore operation rejected
    #[error("Storage error: {0}")]
    Storage(#[from] rusqlite::Error),

    /// Required form field missing or malformed before save
    #[error("Validation error: {0}")]
    Validation(String),

    /// Record addressed by id does not exist
    #[error("{entity} {id} not found")]
    NotFound { entity: &'static str, id: i64 },

    /// IO error occurred
    #[error("IO error: {0}")]
    Io(#[from] io::Error),

    /// JSON serialization/deserialization error
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// CSV error
    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),

    /// TOML parsing error
    #[error("TOML error: {0}")]
    Toml(#[from] toml::de::Error),

    /// Configuration validation error
    #[error("Configuration error: {0}")]
    Config(String),
}

impl Error {
    /// Errors caused by user input rather than the environment.
    ///
    /// These abort the current action with nothing written.
    pub fn is_user_error(&self) -> bool {
        matches!(
            self,
            Error::MalformedPeriod(_)
                | Error::InvalidTimeFormat(_)
                | Error::Validation(_)
                | Error::NotFound { .. }
        )
    }
}
