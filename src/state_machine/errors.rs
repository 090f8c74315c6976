use thiserror::Error;

/// Errors raised by the transition engine
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum StateMachineError {
    /// No edge is registered for the `(from, event)` pair. Always a logic or
    /// configuration bug in the caller, never a transient condition.
    #[error("No transition from {from:?} on event {event}")]
    NoTransition { from: Option<String>, event: String },

    #[error("Duplicate transition registered from {from:?} on event {event}")]
    DuplicateTransition { from: Option<String>, event: String },
}

/// Error returned by a transition listener
#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[error("Listener '{listener}' failed: {reason}")]
pub struct ListenerError {
    pub listener: String,
    pub reason: String,
}

impl ListenerError {
    pub fn new(listener: impl Into<String>, reason: impl Into<String>) -> Self {
        Self {
            listener: listener.into(),
            reason: reason.into(),
        }
    }
}

/// Specific error type for persistence operations
#[derive(Error, Debug)]
pub enum PersistenceError {
    #[error("HA record not found for {resource_type} {resource_id}")]
    RecordNotFound {
        resource_id: i64,
        resource_type: String,
    },

    #[error("HA record already exists for {resource_type} {resource_id}")]
    DuplicateRecord {
        resource_id: i64,
        resource_type: String,
    },

    #[error("Invalid record data: {field}")]
    InvalidRecordData { field: String },

    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

/// Result type alias for state machine operations
pub type StateMachineResult<T> = Result<T, StateMachineError>;
pub type ListenerResult<T> = Result<T, ListenerError>;
pub type PersistenceResult<T> = Result<T, PersistenceError>;

pub fn no_transition(from: Option<impl ToString>, event: impl ToString) -> StateMachineError {
    StateMachineError::NoTransition {
        from: from.map(|s| s.to_string()),
        event: event.to_string(),
    }
}

pub fn duplicate_transition(from: Option<impl ToString>, event: impl ToString) -> StateMachineError {
    StateMachineError::DuplicateTransition {
        from: from.map(|s| s.to_string()),
        event: event.to_string(),
    }
}
