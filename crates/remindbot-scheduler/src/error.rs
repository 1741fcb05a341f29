use chrono::{DateTime, Utc};
use thiserror::Error;

/// Errors raised by the occurrence generator.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ScheduleError {
    /// A one-shot reminder resolved to an instant that has already elapsed.
    #[error("time is in the past: {at}")]
    PastTime { at: DateTime<Utc> },

    /// The recurrence rule can never produce an occurrence.
    #[error("invalid recurrence: {0}")]
    InvalidRule(String),
}

/// Errors from the reminder store.
#[derive(Debug, Error)]
pub enum StoreError {
    /// Underlying SQLite / rusqlite error.
    #[error("Database error: {0}")]
    Database(#[from] rusqlite::Error),

    /// A JSON column could not be encoded.
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// Another thread panicked while holding the connection.
    #[error("store lock poisoned")]
    LockPoisoned,
}

/// The delivery collaborator could not post a due reminder.
#[derive(Debug, Clone, Error)]
#[error("delivery failed: {0}")]
pub struct DeliveryError(pub String);

pub type Result<T> = std::result::Result<T, StoreError>;
