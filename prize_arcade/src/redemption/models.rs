//! Redemption code data model and token generation.

use chrono::{DateTime, Utc};
use rand::Rng;
use rand::distr::Alphanumeric;
use serde::{Deserialize, Serialize};
use sqlx::Row;
use sqlx::postgres::PgRow;

/// Length of generated redemption codes.
pub const CODE_LENGTH: usize = 20;

/// A single-use prize token bound to one completed session and its winner.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RedemptionCode {
    pub code: String,
    pub session_id: i64,
    pub user_id: i64,
    /// Fixed at issuance; never mutated afterwards.
    pub amount: i64,
    pub redeemed: bool,
    pub redeemed_by: Option<String>,
    pub redeemed_at: Option<DateTime<Utc>>,
    pub issued_at: DateTime<Utc>,
}

impl RedemptionCode {
    /// Map a `redemption_codes` row.
    pub fn from_row(row: &PgRow) -> Self {
        Self {
            code: row.get("code"),
            session_id: row.get("session_id"),
            user_id: row.get("user_id"),
            amount: row.get("amount"),
            redeemed: row.get("redeemed"),
            redeemed_by: row.get("redeemed_by"),
            redeemed_at: row
                .get::<Option<chrono::NaiveDateTime>, _>("redeemed_at")
                .map(|dt| dt.and_utc()),
            issued_at: row.get::<chrono::NaiveDateTime, _>("issued_at").and_utc(),
        }
    }
}

/// Generate an opaque alphanumeric token. ~119 bits of entropy at the
/// default length, so collisions are a non-concern at any realistic volume.
pub fn generate_code() -> String {
    rand::rng()
        .sample_iter(&Alphanumeric)
        .take(CODE_LENGTH)
        .map(char::from)
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_generated_code_shape() {
        let code = generate_code();
        assert_eq!(code.len(), CODE_LENGTH);
        assert!(code.chars().all(|c| c.is_ascii_alphanumeric()));
    }

    #[test]
    fn test_generated_codes_differ() {
        assert_ne!(generate_code(), generate_code());
    }
}
