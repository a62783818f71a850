//! Error handling for the sign-up engine
//!
//! This module defines the error taxonomy returned by every engine operation.
//! Callers branch on the variant instead of inspecting messages.

use thiserror::Error;

/// SQLSTATE codes the engine treats as transient concurrency conflicts.
const SERIALIZATION_FAILURE: &str = "40001";
const DEADLOCK_DETECTED: &str = "40P01";
const LOCK_NOT_AVAILABLE: &str = "55P03";
const UNIQUE_VIOLATION: &str = "23505";

/// Name of the partial unique index guarding one active sign-up per (user, event).
pub const ACTIVE_SIGN_UP_INDEX: &str = "event_sign_ups_one_active_per_user";

/// Main error type for the sign-up engine
#[derive(Error, Debug)]
pub enum SignupError {
    #[error("User {user_id} already has an active sign-up for event {event_id}")]
    AlreadySignedUp { user_id: i64, event_id: i64 },

    #[error("Event not found: {event_id}")]
    EventNotFound { event_id: i64 },

    #[error("Slot not found: {slot_id}")]
    SlotNotFound { slot_id: i64 },

    #[error("No active sign-up for user {user_id} on event {event_id}")]
    SignUpNotFound { user_id: i64, event_id: i64 },

    #[error("Permission denied: {0}")]
    PermissionDenied(String),

    #[error("Sign-up is closed for event {event_id}")]
    SignUpClosed { event_id: i64 },

    #[error("Invalid input: {0}")]
    InvalidInput(String),

    /// Serialization or lock conflict inside a unit of work. Retried by the engine.
    #[error("Concurrency conflict: {0}")]
    ConcurrencyConflict(String),

    #[error("Operation timed out after {timeout_ms} ms")]
    Timeout { timeout_ms: u64 },

    #[error("Internal error: {0}")]
    Internal(String),

    #[error("Database error: {0}")]
    Database(sqlx::Error),

    #[error("Database migration error: {0}")]
    Migration(#[from] sqlx::migrate::MigrateError),

    #[error("Configuration error: {0}")]
    Config(String),
}

/// Result type alias for engine operations
pub type Result<T> = std::result::Result<T, SignupError>;

impl From<sqlx::Error> for SignupError {
    fn from(error: sqlx::Error) -> Self {
        if let sqlx::Error::Database(db_error) = &error {
            match db_error.code().as_deref() {
                Some(SERIALIZATION_FAILURE) | Some(DEADLOCK_DETECTED) | Some(LOCK_NOT_AVAILABLE) => {
                    return SignupError::ConcurrencyConflict(db_error.message().to_string());
                }
                _ => {}
            }
        }
        SignupError::Database(error)
    }
}

impl From<config::ConfigError> for SignupError {
    fn from(error: config::ConfigError) -> Self {
        SignupError::Config(error.to_string())
    }
}

/// Returns true when `error` is a unique violation on the active sign-up index.
pub fn is_active_sign_up_violation(error: &sqlx::Error) -> bool {
    match error {
        sqlx::Error::Database(db_error) => {
            db_error.code().as_deref() == Some(UNIQUE_VIOLATION)
                && db_error.constraint() == Some(ACTIVE_SIGN_UP_INDEX)
        }
        _ => false,
    }
}

impl SignupError {
    /// Whether the engine may transparently retry the unit of work
    pub fn is_retryable(&self) -> bool {
        matches!(self, SignupError::ConcurrencyConflict(_))
    }

    /// Business-rule failures are surfaced verbatim to the end user
    pub fn is_business_rule(&self) -> bool {
        matches!(
            self,
            SignupError::AlreadySignedUp { .. }
                | SignupError::EventNotFound { .. }
                | SignupError::SlotNotFound { .. }
                | SignupError::SignUpNotFound { .. }
                | SignupError::PermissionDenied(_)
                | SignupError::SignUpClosed { .. }
                | SignupError::InvalidInput(_)
        )
    }

    /// Message safe to show an end user. Internal kinds collapse to a generic text.
    pub fn public_message(&self) -> String {
        if self.is_business_rule() {
            self.to_string()
        } else {
            "Internal server error".to_string()
        }
    }

    /// Get error severity level
    pub fn severity(&self) -> ErrorSeverity {
        match self {
            SignupError::Database(_) => ErrorSeverity::Critical,
            SignupError::Migration(_) => ErrorSeverity::Critical,
            SignupError::Config(_) => ErrorSeverity::Critical,
            SignupError::Internal(_) => ErrorSeverity::Critical,
            SignupError::PermissionDenied(_) => ErrorSeverity::Warning,
            SignupError::ConcurrencyConflict(_) => ErrorSeverity::Warning,
            SignupError::Timeout { .. } => ErrorSeverity::Error,
            _ => ErrorSeverity::Info,
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
