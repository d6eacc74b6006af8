//! Core error types for timetable-core.
//!
//! Scheduling failures are local and recoverable: every engine operation
//! returns a [`SchedulingError`] variant the caller can react to, and no
//! failure ever leaves a partially applied change behind.

use std::path::PathBuf;
use thiserror::Error;

use crate::timetable::Weekday;

/// Core error type for timetable-core.
#[derive(Error, Debug)]
pub enum CoreError {
    /// Database-related errors
    #[error("Database error: {0}")]
    Database(#[from] DatabaseError),

    /// Configuration-related errors
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    /// Validation errors
    #[error("Validation error: {0}")]
    Validation(#[from] ValidationError),

    /// Rejected scheduling operations
    #[error("Scheduling error: {0}")]
    Scheduling(#[from] SchedulingError),

    /// Rejected drag gestures
    #[error("Drag error: {0}")]
    Drag(#[from] DragError),

    /// IO errors
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Serialization/deserialization errors
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

/// Outcome of a rejected time conversion or scheduling operation.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum SchedulingError {
    /// Malformed `HH:mm` string
    #[error("Invalid time '{0}': use 24h HH:mm format")]
    Format(String),

    /// Minutes outside a single day
    #[error("Minutes {0} outside of [0, 1440)")]
    Range(i32),

    /// Computed range leaves the configured day window
    #[error("Range {start}-{end} exceeds the day window")]
    OutOfRange { start: String, end: String },

    /// Computed range collides with another block of the same day
    #[error("Range {start}-{end} overlaps an existing block")]
    Overlap { start: String, end: String },

    /// Cross-day move found nowhere to land
    #[error("No free slot of {duration_min} min on {day}")]
    NoFreeSlot { day: Weekday, duration_min: i32 },

    /// Referenced block is not in the day list
    #[error("Block not found: {0}")]
    NotFound(String),

    /// Resulting block is shorter than the configured minimum
    #[error("Block of {duration_min} min is shorter than the {min_duration_min} min minimum")]
    TooShort {
        duration_min: i32,
        min_duration_min: i32,
    },

    /// Blocks must reference a matter
    #[error("Matter id must not be empty")]
    MissingMatter,

    /// Scheduler configuration violates its invariants
    #[error("Invalid scheduler configuration: {0}")]
    InvalidConfig(String),
}

/// Rejected drag gesture transitions.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum DragError {
    /// A gesture is already active or still committing
    #[error("Another gesture is in progress")]
    Busy,

    /// No gesture to move, drop or cancel
    #[error("No gesture in progress")]
    NotDragging,

    /// The engine rejected the dropped gesture
    #[error(transparent)]
    Scheduling(#[from] SchedulingError),
}

/// Database-specific errors.
#[derive(Error, Debug)]
pub enum DatabaseError {
    /// Failed to open database connection
    #[error("Failed to open database at {path}: {source}")]
    OpenFailed {
        path: PathBuf,
        #[source]
        source: rusqlite::Error,
    },

    /// Query execution failed
    #[error("Query failed: {0}")]
    QueryFailed(String),

    /// Migration failed
    #[error("Database migration failed: {0}")]
    MigrationFailed(String),

    /// Database is locked
    #[error("Database is locked")]
    Locked,
}

/// Configuration-specific errors.
#[derive(Error, Debug)]
pub enum ConfigError {
    /// Failed to load configuration
    #[error("Failed to load configuration from {path}: {message}")]
    LoadFailed { path: PathBuf, message: String },

    /// Failed to save configuration
    #[error("Failed to save configuration to {path}: {message}")]
    SaveFailed { path: PathBuf, message: String },

    /// Invalid configuration value
    #[error("Invalid configuration value for '{key}': {message}")]
    InvalidValue { key: String, message: String },

    /// Unknown dot-path key
    #[error("Unknown configuration key: {0}")]
    UnknownKey(String),

    /// Home or data directory could not be prepared
    #[error("Data directory unavailable: {0}")]
    DataDir(String),
}

/// Structural validation errors raised by the store.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ValidationError {
    /// Block whose start is not before its end
    #[error("Block {id} has start >= end ({start} >= {end})")]
    InvalidRange {
        id: String,
        start: String,
        end: String,
    },

    /// Two blocks of one day overlap
    #[error("Blocks {first} and {second} overlap")]
    Overlap { first: String, second: String },

    /// Same id used twice within one day
    #[error("Duplicate block id {0}")]
    DuplicateId(String),

    /// Required text field is empty
    #[error("Field '{0}' must not be empty")]
    Empty(&'static str),

    /// Referenced record does not exist
    #[error("{entity} not found: {id}")]
    NotFound { entity: &'static str, id: String },

    /// Invalid value
    #[error("Invalid value for '{field}': {message}")]
    InvalidValue { field: String, message: String },
}

impl From<rusqlite::Error> for DatabaseError {
    fn from(err: rusqlite::Error) -> Self {
        match &err {
            rusqlite::Error::SqliteFailure(err, _msg) => {
                if err.code == rusqlite::ErrorCode::DatabaseLocked
                    || err.code == rusqlite::ErrorCode::DatabaseBusy
                {
                    DatabaseError::Locked
                } else {
                    DatabaseError::QueryFailed(err.to_string())
                }
            }
            _ => DatabaseError::QueryFailed(err.to_string()),
        }
    }
}

impl From<rusqlite::Error> for CoreError {
    fn from(err: rusqlite::Error) -> Self {
        CoreError::Database(err.into())
    }
}

/// Result type alias for CoreError
pub type Result<T, E = CoreError> = std::result::Result<T, E>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn scheduling_errors_convert_into_core_error() {
        let err: CoreError = SchedulingError::MissingMatter.into();
        assert!(matches!(err, CoreError::Scheduling(SchedulingError::MissingMatter)));
        assert!(err.to_string().contains("Matter id"));
    }

    #[test]
    fn no_free_slot_names_the_day() {
        let err = SchedulingError::NoFreeSlot {
            day: Weekday::Tue,
            duration_min: 60,
        };
        assert_eq!(err.to_string(), "No free slot of 60 min on tue");
    }

    #[test]
    fn drag_errors_keep_the_scheduling_message() {
        let err: DragError = SchedulingError::NotFound("b1".into()).into();
        assert_eq!(err.to_string(), "Block not found: b1");
        let core: CoreError = err.into();
        assert!(matches!(core, CoreError::Drag(DragError::Scheduling(_))));
    }

    #[test]
    fn sqlite_errors_map_to_query_failed() {
        let err: DatabaseError = rusqlite::Error::QueryReturnedNoRows.into();
        assert!(matches!(err, DatabaseError::QueryFailed(_)));
    }
}
