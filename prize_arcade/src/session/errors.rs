//! Session error types.

use super::models::SessionId;
use crate::ledger::LedgerError;
use thiserror::Error;

/// Session errors
#[derive(Debug, Error)]
pub enum SessionError {
    /// Database error
    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),

    /// Session not found
    #[error("Session not found: {0}")]
    NotFound(SessionId),

    /// Player balance below the entry fee; no mutation occurred
    #[error("Insufficient funds: available {available}, required {required}")]
    InsufficientFunds { available: i64, required: i64 },

    /// Capacity reached; no mutation occurred
    #[error("Session {0} is full")]
    SessionFull(SessionId),

    /// Session no longer Open (completed or cancelled)
    #[error("Session {0} is closed")]
    SessionClosed(SessionId),

    /// Rejected before any state change
    #[error("Invalid session config: {0}")]
    InvalidConfig(String),

    /// Ledger failure other than insufficient funds
    #[error(transparent)]
    Ledger(LedgerError),
}

impl From<LedgerError> for SessionError {
    fn from(err: LedgerError) -> Self {
        match err {
            LedgerError::InsufficientFunds {
                available,
                required,
            } => SessionError::InsufficientFunds {
                available,
                required,
            },
            LedgerError::Database(e) => SessionError::Database(e),
            other => SessionError::Ledger(other),
        }
    }
}

impl SessionError {
    /// Get a client-safe error message that doesn't leak internals.
    pub fn client_message(&self) -> String {
        match self {
            SessionError::Database(_) => "Internal server error".to_string(),
            SessionError::Ledger(e) => e.client_message(),
            _ => self.to_string(),
        }
    }

    /// Whether the underlying failure is a retryable transaction abort.
    pub fn is_serialization_failure(&self) -> bool {
        match self {
            SessionError::Database(e) => crate::db::is_serialization_failure(e),
            SessionError::Ledger(e) => e.is_serialization_failure(),
            _ => false,
        }
    }
}

/// Result type for session operations
pub type SessionResult<T> = Result<T, SessionError>;
