//! Redemption manager: issue once, redeem once.

use super::{
    errors::{RedemptionError, RedemptionResult},
    models::{RedemptionCode, generate_code},
};
use crate::db;
use crate::notify::{SessionEvent, SessionNotifier};
use sqlx::{PgPool, Postgres, Row, Transaction};
use std::sync::Arc;

/// Redemption manager
#[derive(Clone)]
pub struct RedemptionManager {
    pool: Arc<PgPool>,
    notifier: SessionNotifier,
}

impl RedemptionManager {
    /// Create a new redemption manager.
    pub fn new(pool: Arc<PgPool>, notifier: SessionNotifier) -> Self {
        Self { pool, notifier }
    }

    /// Issue a code for a session winner as a standalone transaction.
    ///
    /// Settlement calls [`Self::issue_tx`] instead so issuance commits
    /// together with the completion transition.
    pub async fn issue(
        &self,
        session_id: i64,
        user_id: i64,
        amount: i64,
    ) -> RedemptionResult<String> {
        let mut tx = self.pool.begin().await?;
        let code = self.issue_tx(&mut tx, session_id, user_id, amount).await?;
        tx.commit().await?;
        Ok(code)
    }

    /// Issue a code inside a caller-owned transaction.
    ///
    /// The caller's completion guard already enforces at-most-once
    /// issuance; the per-session check here (plus the unique constraint on
    /// `session_id`) defensively rejects a second issue anyway.
    ///
    /// # Errors
    ///
    /// * `RedemptionError::CodeAlreadyIssued` - Session already has a code
    /// * `RedemptionError::InvalidAmount` - Negative amount
    pub async fn issue_tx(
        &self,
        tx: &mut Transaction<'_, Postgres>,
        session_id: i64,
        user_id: i64,
        amount: i64,
    ) -> RedemptionResult<String> {
        if amount < 0 {
            return Err(RedemptionError::InvalidAmount(amount));
        }

        let existing = sqlx::query("SELECT code FROM redemption_codes WHERE session_id = $1")
            .bind(session_id)
            .fetch_optional(&mut **tx)
            .await?;
        if existing.is_some() {
            return Err(RedemptionError::CodeAlreadyIssued(session_id));
        }

        let code = generate_code();
        sqlx::query(
            "INSERT INTO redemption_codes (code, session_id, user_id, amount)
             VALUES ($1, $2, $3, $4)",
        )
        .bind(&code)
        .bind(session_id)
        .bind(user_id)
        .bind(amount)
        .execute(&mut **tx)
        .await?;

        log::info!("issued redemption code for session {session_id} (amount {amount})");
        Ok(code)
    }

    /// Redeem a code on behalf of a merchant. Atomically flips the
    /// redeemed flag false→true and returns the amount to honor; a second
    /// call with the same code fails with `AlreadyRedeemed` and performs
    /// no mutation.
    ///
    /// # Errors
    ///
    /// * `RedemptionError::NotFound` - Unknown code
    /// * `RedemptionError::AlreadyRedeemed` - Code already consumed
    pub async fn redeem(&self, code: &str, merchant_id: &str) -> RedemptionResult<i64> {
        let mut attempts = 0;
        loop {
            match self.redeem_once(code, merchant_id).await {
                Err(ref e) if attempts + 1 < db::MAX_TX_ATTEMPTS && e.is_serialization_failure() => {
                    attempts += 1;
                    log::warn!("redeem aborted, retrying (attempt {attempts})");
                }
                result => return result,
            }
        }
    }

    async fn redeem_once(&self, code: &str, merchant_id: &str) -> RedemptionResult<i64> {
        let mut tx = self.pool.begin().await?;

        // Guarded update: the redeemed check and the flip are one statement,
        // so two racing merchants cannot both succeed.
        let redeemed = sqlx::query(
            "UPDATE redemption_codes
             SET redeemed = TRUE, redeemed_by = $1, redeemed_at = NOW()
             WHERE code = $2 AND redeemed = FALSE
             RETURNING session_id, amount",
        )
        .bind(merchant_id)
        .bind(code)
        .fetch_optional(&mut *tx)
        .await?;

        let (session_id, amount): (i64, i64) = match redeemed {
            Some(row) => (row.get("session_id"), row.get("amount")),
            None => {
                let check = sqlx::query("SELECT redeemed FROM redemption_codes WHERE code = $1")
                    .bind(code)
                    .fetch_optional(&mut *tx)
                    .await?;
                return match check {
                    None => Err(RedemptionError::NotFound),
                    Some(_) => Err(RedemptionError::AlreadyRedeemed),
                };
            }
        };

        tx.commit().await?;

        log::info!("code for session {session_id} redeemed by merchant {merchant_id}");
        self.notifier.publish(SessionEvent::CodeRedeemed {
            session_id,
            merchant_id: merchant_id.to_string(),
            amount,
        });

        Ok(amount)
    }

    /// Look up a code (dashboards, support tooling).
    pub async fn get_code(&self, code: &str) -> RedemptionResult<RedemptionCode> {
        let row = sqlx::query(
            "SELECT code, session_id, user_id, amount, redeemed, redeemed_by, redeemed_at, issued_at
             FROM redemption_codes
             WHERE code = $1",
        )
        .bind(code)
        .fetch_optional(self.pool.as_ref())
        .await?
        .ok_or(RedemptionError::NotFound)?;

        Ok(RedemptionCode::from_row(&row))
    }

    /// Look up the code issued for a session, if any.
    pub async fn get_code_for_session(
        &self,
        session_id: i64,
    ) -> RedemptionResult<Option<RedemptionCode>> {
        let row = sqlx::query(
            "SELECT code, session_id, user_id, amount, redeemed, redeemed_by, redeemed_at, issued_at
             FROM redemption_codes
             WHERE session_id = $1",
        )
        .bind(session_id)
        .fetch_optional(self.pool.as_ref())
        .await?;

        Ok(row.as_ref().map(RedemptionCode::from_row))
    }
}
