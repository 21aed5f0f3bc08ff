//! Redemption error types.

use thiserror::Error;

/// Redemption errors
#[derive(Debug, Error)]
pub enum RedemptionError {
    /// Database error
    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),

    /// Unknown code
    #[error("Redemption code not found")]
    NotFound,

    /// Code already consumed; no mutation occurred
    #[error("Redemption code already redeemed")]
    AlreadyRedeemed,

    /// A code was already issued for this session
    #[error("Code already issued for session {0}")]
    CodeAlreadyIssued(i64),

    /// Invalid amount
    #[error("Invalid amount: {0}")]
    InvalidAmount(i64),
}

impl RedemptionError {
    /// Get a client-safe error message that doesn't leak internals.
    pub fn client_message(&self) -> String {
        match self {
            RedemptionError::Database(_) => "Internal server error".to_string(),
            _ => self.to_string(),
        }
    }

    /// Whether the underlying failure is a retryable transaction abort.
    pub fn is_serialization_failure(&self) -> bool {
        match self {
            RedemptionError::Database(e) => crate::db::is_serialization_failure(e),
            _ => false,
        }
    }
}

/// Result type for redemption operations
pub type RedemptionResult<T> = Result<T, RedemptionError>;
