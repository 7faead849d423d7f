//! Error handling for CHARISM
//!
//! This module defines the main error type returned by every registration,
//! approval and event lifecycle operation, plus the eligibility reasons
//! reported when a join is refused.

use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::error;

use crate::models::{ApprovalState, EventStatus};

/// Main error type for CHARISM operations
#[derive(Error, Debug)]
pub enum CharismError {
    #[error("Event not found: {event_id}")]
    EventNotFound { event_id: i64 },

    #[error("Attendance entry not found: event {event_id}, participant {participant_id}")]
    EntryNotFound { event_id: i64, participant_id: i64 },

    #[error("Participant {participant_id} is already registered for event {event_id}")]
    AlreadyRegistered { event_id: i64, participant_id: i64 },

    #[error("Not eligible: {0}")]
    NotEligible(Ineligibility),

    #[error("Cannot withdraw: registration is already {state}")]
    CannotWithdraw { state: ApprovalState },

    #[error("Entry is not pending (currently {state})")]
    NotPending { state: ApprovalState },

    #[error("Entry is not approved (currently {state})")]
    NotApproved { state: ApprovalState },

    #[error("Unauthorized: {0}")]
    Unauthorized(String),

    #[error("Store unavailable: {0}")]
    StoreUnavailable(String),

    #[error("Invariant violation: {0}")]
    InvariantViolation(String),

    #[error("Invalid state transition: {from} -> {to}")]
    InvalidStateTransition { from: EventStatus, to: EventStatus },

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Invalid input: {0}")]
    InvalidInput(String),

    #[error("Database error: {0}")]
    Database(sqlx::Error),

    #[error("Database migration error: {0}")]
    Migration(#[from] sqlx::migrate::MigrateError),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("Notification error: {0}")]
    Notification(String),

    #[error("HTTP request error: {0}")]
    Http(#[from] reqwest::Error),
}

/// Reason a join request was refused by the eligibility guard
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Ineligibility {
    /// Event is not published or does not accept self-registration
    EventNotOpen,
    /// Current time is outside the registration window
    RegistrationClosed,
    /// Participant already holds a live entry
    AlreadyRegistered,
    /// Every seat is taken
    EventFull,
}

impl std::fmt::Display for Ineligibility {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Ineligibility::EventNotOpen => write!(f, "event not open"),
            Ineligibility::RegistrationClosed => write!(f, "registration window closed"),
            Ineligibility::AlreadyRegistered => write!(f, "already registered"),
            Ineligibility::EventFull => write!(f, "event full"),
        }
    }
}

impl From<sqlx::Error> for CharismError {
    fn from(err: sqlx::Error) -> Self {
        match err {
            sqlx::Error::PoolTimedOut | sqlx::Error::PoolClosed | sqlx::Error::WorkerCrashed => {
                CharismError::StoreUnavailable(err.to_string())
            }
            sqlx::Error::Io(_) | sqlx::Error::Tls(_) => CharismError::StoreUnavailable(err.to_string()),
            other => CharismError::Database(other),
        }
    }
}

/// Result type alias for CHARISM operations
pub type Result<T> = std::result::Result<T, CharismError>;

impl CharismError {
    /// Check if the caller may retry the same request later
    pub fn is_retryable(&self) -> bool {
        matches!(self, CharismError::StoreUnavailable(_) | CharismError::Http(_))
    }

    /// Get error severity level
    pub fn severity(&self) -> ErrorSeverity {
        match self {
            CharismError::InvariantViolation(_) => ErrorSeverity::Critical,
            CharismError::Database(_) => ErrorSeverity::Critical,
            CharismError::Migration(_) => ErrorSeverity::Critical,
            CharismError::Config(_) => ErrorSeverity::Critical,
            CharismError::StoreUnavailable(_) => ErrorSeverity::Error,
            CharismError::Serialization(_) => ErrorSeverity::Error,
            CharismError::Unauthorized(_) => ErrorSeverity::Warning,
            CharismError::Notification(_) | CharismError::Http(_) => ErrorSeverity::Warning,
            _ => ErrorSeverity::Info,
        }
    }

    /// Convert an internal error into what the caller is allowed to see.
    ///
    /// An invariant violation never leaves the core as-is: it is logged and
    /// reported as a full event.
    pub fn into_client_visible(self) -> Self {
        match self {
            CharismError::InvariantViolation(details) => {
                error!(details = %details, "Roster invariant violated");
                CharismError::NotEligible(Ineligibility::EventFull)
            }
            other => other,
        }
    }
}

/// Error severity levels
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorSeverity {
    Info,
    Warning,
    Error,
    Critical,
}

impl std::fmt::Display for ErrorSeverity {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ErrorSeverity::Info => write!(f, "INFO"),
            ErrorSeverity::Warning => write!(f, "WARN"),
            ErrorSeverity::Error => write!(f, "ERROR"),
            ErrorSeverity::Critical => write!(f, "CRITICAL"),
        }
    }
}
