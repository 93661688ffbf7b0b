//! Error types for the alarm engine.

use std::path::PathBuf;

use thiserror::Error;
use uuid::Uuid;

/// Top level error for every fallible operation in the crate.
#[derive(Error, Debug)]
pub enum ClockError {
    /// Reading or writing the key-value backend failed
    #[error("Storage error: {0}")]
    Storage(#[from] StorageError),

    /// Loading or saving the configuration failed
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    /// An alarm definition broke one of its invariants
    #[error("Validation error: {0}")]
    Validation(#[from] ValidationError),

    #[error("No alarm with id {0}")]
    AlarmNotFound(Uuid),

    /// Dismiss or snooze was requested while nothing is ringing
    #[error("No alarm is ringing")]
    NotRinging,

    #[error("Alarm {id} already used all {limit} snoozes")]
    SnoozeLimitExceeded { id: Uuid, limit: u8 },

    #[error("Weather lookup failed: {0}")]
    Weather(String),

    #[error("Speech synthesis failed: {0}")]
    Speech(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

#[derive(Error, Debug)]
pub enum StorageError {
    #[error("Failed to read key '{key}' from {path}: {source}")]
    ReadFailed {
        key: String,
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Failed to write key '{key}' to {path}: {source}")]
    WriteFailed {
        key: String,
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Failed to serialize alarms: {0}")]
    Serialize(#[from] toml::ser::Error),

    /// Keys end up as file names, so separators are refused
    #[error("Invalid storage key '{0}'")]
    InvalidKey(String),
}

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("Couldn't resolve the {0} directory")]
    NoProjectDirs(&'static str),

    #[error("Failed to load configuration from {path}: {message}")]
    LoadFailed { path: PathBuf, message: String },

    #[error("Failed to save configuration to {path}: {message}")]
    SaveFailed { path: PathBuf, message: String },
}

#[derive(Error, Debug, PartialEq, Eq)]
pub enum ValidationError {
    #[error("An alarm needs between 1 and 3 tasks, got {0}")]
    TaskCount(usize),

    #[error("Task '{0}' is listed more than once")]
    DuplicateTask(String),

    #[error("Snooze limit must be between 0 and 3, got {0}")]
    SnoozeLimit(u8),

    #[error("Snooze duration must be one of 3, 5, 10 or 15 minutes, got {0}")]
    SnoozeDuration(u32),

    #[error("Snooze count {count} exceeds limit {limit}")]
    SnoozeCount { count: u8, limit: u8 },

    #[error("Weekday index {0} is out of range (0 = Sunday .. 6 = Saturday)")]
    Weekday(u8),

    #[error("Invalid time '{0}', expected HH:MM")]
    Time(String),

    #[error("Unknown task '{0}'")]
    TaskKind(String),

    #[error("Unknown difficulty '{0}'")]
    Difficulty(String),
}

/// Result type alias for [`ClockError`]
pub type Result<T, E = ClockError> = std::result::Result<T, E>;
