//! Settlement engine: accepts score submissions and settles full sessions.

use super::models::{ScoredEntry, SubmissionResult, select_winner};
use crate::db;
use crate::ledger::{EntryType, LedgerError, LedgerManager};
use crate::notify::{SessionEvent, SessionNotifier};
use crate::redemption::{RedemptionError, RedemptionManager};
use crate::session::{EntryId, SessionId, SessionStatus};
use sqlx::{PgPool, Postgres, Row, Transaction};
use std::sync::Arc;
use thiserror::Error;

/// Settlement errors
#[derive(Debug, Error)]
pub enum SettlementError {
    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),

    #[error("Entry not found: {0}")]
    EntryNotFound(EntryId),

    #[error("Entry {0} already has a recorded score")]
    AlreadyScored(EntryId),

    #[error("Session {0} is closed")]
    SessionClosed(SessionId),

    #[error("Invalid score: {0}")]
    InvalidScore(i64),

    #[error(transparent)]
    Ledger(LedgerError),

    #[error(transparent)]
    Redemption(RedemptionError),
}

impl From<LedgerError> for SettlementError {
    fn from(err: LedgerError) -> Self {
        match err {
            LedgerError::Database(e) => SettlementError::Database(e),
            other => SettlementError::Ledger(other),
        }
    }
}

impl From<RedemptionError> for SettlementError {
    fn from(err: RedemptionError) -> Self {
        match err {
            RedemptionError::Database(e) => SettlementError::Database(e),
            other => SettlementError::Redemption(other),
        }
    }
}

impl SettlementError {
    /// Get a client-safe error message that doesn't leak internals.
    pub fn client_message(&self) -> String {
        match self {
            SettlementError::Database(_) => "Internal server error".to_string(),
            SettlementError::Ledger(e) => e.client_message(),
            SettlementError::Redemption(e) => e.client_message(),
            _ => self.to_string(),
        }
    }

    /// Whether the underlying failure is a retryable transaction abort.
    pub fn is_serialization_failure(&self) -> bool {
        match self {
            SettlementError::Database(e) => db::is_serialization_failure(e),
            SettlementError::Ledger(e) => e.is_serialization_failure(),
            _ => false,
        }
    }
}

pub type SettlementResult<T> = Result<T, SettlementError>;

/// Settlement engine
#[derive(Clone)]
pub struct SettlementEngine {
    pool: Arc<PgPool>,
    ledger: LedgerManager,
    redemptions: RedemptionManager,
    notifier: SessionNotifier,
}

impl SettlementEngine {
    /// Create a new settlement engine.
    pub fn new(
        pool: Arc<PgPool>,
        ledger: LedgerManager,
        redemptions: RedemptionManager,
        notifier: SessionNotifier,
    ) -> Self {
        Self {
            pool,
            ledger,
            redemptions,
            notifier,
        }
    }

    /// Record a score for an entry and, when this submission is the one
    /// that fills the session, settle it: select the winner, credit the
    /// prize pool, and issue the redemption code — all in the same
    /// transaction as the Open→Completed transition.
    ///
    /// An entry may be scored exactly once. Submissions against an already
    /// settled session are benign and return the recorded outcome.
    ///
    /// # Errors
    ///
    /// * `SettlementError::EntryNotFound` - No such entry
    /// * `SettlementError::AlreadyScored` - Entry already has a score
    /// * `SettlementError::SessionClosed` - Session was cancelled
    /// * `SettlementError::InvalidScore` - Negative score
    pub async fn submit_score(
        &self,
        entry_id: EntryId,
        score: i64,
    ) -> SettlementResult<SubmissionResult> {
        if score < 0 {
            return Err(SettlementError::InvalidScore(score));
        }

        let mut attempts = 0;
        loop {
            match self.submit_once(entry_id, score).await {
                Err(ref e) if attempts + 1 < db::MAX_TX_ATTEMPTS && e.is_serialization_failure() => {
                    attempts += 1;
                    log::warn!(
                        "submission for entry {entry_id} aborted, retrying (attempt {attempts})"
                    );
                }
                result => return result,
            }
        }
    }

    async fn submit_once(
        &self,
        entry_id: EntryId,
        score: i64,
    ) -> SettlementResult<SubmissionResult> {
        let mut tx = self.pool.begin().await?;

        let entry = sqlx::query("SELECT session_id, score FROM session_entries WHERE id = $1")
            .bind(entry_id)
            .fetch_optional(&mut *tx)
            .await?
            .ok_or(SettlementError::EntryNotFound(entry_id))?;
        let session_id: SessionId = entry.get("session_id");

        // The session row lock is the serialization point for everything
        // below: scoring, the count re-read, and the completion transition.
        let session = sqlx::query(
            "SELECT capacity, prize_pool, min_score, status, winner_entry_id, winning_score
             FROM game_sessions
             WHERE id = $1
             FOR UPDATE",
        )
        .bind(session_id)
        .fetch_one(&mut *tx)
        .await?;

        let capacity: i32 = session.get("capacity");
        let prize_pool: i64 = session.get("prize_pool");
        let min_score: i64 = session.get("min_score");
        let status = SessionStatus::parse(&session.get::<String, _>("status"));

        match status {
            SessionStatus::Cancelled => return Err(SettlementError::SessionClosed(session_id)),
            SessionStatus::Completed => {
                // Lost race or client retry: report the recorded outcome.
                let result = self
                    .observed_outcome(
                        &mut tx,
                        entry_id,
                        session_id,
                        capacity,
                        min_score,
                        session.get("winner_entry_id"),
                        session.get("winning_score"),
                    )
                    .await?;
                tx.commit().await?;
                return Ok(result);
            }
            SessionStatus::Open => {}
        }

        // Score the entry exactly once.
        let qualified = score >= min_score;
        let scored = sqlx::query(
            "UPDATE session_entries
             SET score = $1, qualified = $2, submitted_at = NOW()
             WHERE id = $3 AND score IS NULL
             RETURNING id",
        )
        .bind(score)
        .bind(qualified)
        .bind(entry_id)
        .fetch_optional(&mut *tx)
        .await?;

        if scored.is_none() {
            return Err(SettlementError::AlreadyScored(entry_id));
        }

        // Re-read the scored-entry count under the same lock the
        // completion check uses.
        let scored_entries = self.scored_count(&mut tx, session_id).await?;

        if scored_entries < capacity {
            tx.commit().await?;
            self.notifier.publish(SessionEvent::ScoreSubmitted {
                session_id,
                entry_id,
                qualified,
                scored_entries,
                capacity,
            });
            return Ok(SubmissionResult {
                entry_id,
                session_id,
                qualified,
                session_completed: false,
                winner_entry_id: None,
                winner_user_id: None,
                winning_score: None,
                scored_entries,
                capacity,
            });
        }

        // This submission fills the session: settle exactly once.
        let rows = sqlx::query(
            "SELECT id, user_id, score, qualified, submitted_at
             FROM session_entries
             WHERE session_id = $1 AND score IS NOT NULL",
        )
        .bind(session_id)
        .fetch_all(&mut *tx)
        .await?;

        let entries: Vec<ScoredEntry> = rows
            .iter()
            .map(|row| ScoredEntry {
                entry_id: row.get("id"),
                user_id: row.get("user_id"),
                score: row.get("score"),
                qualified: row.get("qualified"),
                submitted_at: row
                    .get::<chrono::NaiveDateTime, _>("submitted_at")
                    .and_utc(),
            })
            .collect();
        let winner = select_winner(&entries).cloned();

        // Compare-and-swap on status: only one submission may cross the
        // finish line. Under the row lock this cannot be contended, but the
        // guard keeps the transition safe against any non-locking writer.
        let transition = sqlx::query(
            "UPDATE game_sessions
             SET status = 'completed', winner_entry_id = $1, winning_score = $2,
                 completed_at = NOW()
             WHERE id = $3 AND status = 'open'",
        )
        .bind(winner.as_ref().map(|w| w.entry_id))
        .bind(winner.as_ref().map(|w| w.score))
        .bind(session_id)
        .execute(&mut *tx)
        .await?;

        if transition.rows_affected() == 0 {
            return Err(SettlementError::SessionClosed(session_id));
        }

        if let Some(winner) = &winner {
            if prize_pool > 0 {
                // Deterministic key: a retried settlement cannot pay twice.
                self.ledger
                    .credit_tx(
                        &mut tx,
                        winner.user_id,
                        prize_pool,
                        Some(session_id),
                        EntryType::Prize,
                        format!("prize_{session_id}"),
                        Some(format!("Prize pool for session {session_id}")),
                    )
                    .await?;
            }
            self.redemptions
                .issue_tx(&mut tx, session_id, winner.user_id, prize_pool)
                .await?;
        }

        tx.commit().await?;

        log::info!(
            "session {session_id} completed: winner {:?}, prize pool {prize_pool}",
            winner.as_ref().map(|w| w.entry_id)
        );
        self.notifier.publish(SessionEvent::ScoreSubmitted {
            session_id,
            entry_id,
            qualified,
            scored_entries,
            capacity,
        });
        self.notifier.publish(SessionEvent::SessionCompleted {
            session_id,
            winner_user_id: winner.as_ref().map(|w| w.user_id),
            winning_score: winner.as_ref().map(|w| w.score),
            prize_pool,
        });

        Ok(SubmissionResult {
            entry_id,
            session_id,
            qualified,
            session_completed: true,
            winner_entry_id: winner.as_ref().map(|w| w.entry_id),
            winner_user_id: winner.as_ref().map(|w| w.user_id),
            winning_score: winner.as_ref().map(|w| w.score),
            scored_entries,
            capacity,
        })
    }

    /// Build the result a caller sees when the session settled before (or
    /// while) their submission arrived.
    #[allow(clippy::too_many_arguments)]
    async fn observed_outcome(
        &self,
        tx: &mut Transaction<'_, Postgres>,
        entry_id: EntryId,
        session_id: SessionId,
        capacity: i32,
        min_score: i64,
        winner_entry_id: Option<EntryId>,
        winning_score: Option<i64>,
    ) -> SettlementResult<SubmissionResult> {
        let winner_user_id = match winner_entry_id {
            Some(winner_entry) => {
                let row = sqlx::query("SELECT user_id FROM session_entries WHERE id = $1")
                    .bind(winner_entry)
                    .fetch_optional(&mut **tx)
                    .await?;
                row.map(|r| r.get::<i64, _>("user_id"))
            }
            None => None,
        };

        let own_score = sqlx::query("SELECT score FROM session_entries WHERE id = $1")
            .bind(entry_id)
            .fetch_optional(&mut **tx)
            .await?
            .and_then(|row| row.get::<Option<i64>, _>("score"));

        let scored_entries = self.scored_count(tx, session_id).await?;

        Ok(SubmissionResult {
            entry_id,
            session_id,
            qualified: own_score.map(|s| s >= min_score).unwrap_or(false),
            session_completed: true,
            winner_entry_id,
            winner_user_id,
            winning_score,
            scored_entries,
            capacity,
        })
    }

    async fn scored_count(
        &self,
        tx: &mut Transaction<'_, Postgres>,
        session_id: SessionId,
    ) -> SettlementResult<i32> {
        let count: i64 = sqlx::query_scalar(
            "SELECT COUNT(*) FROM session_entries WHERE session_id = $1 AND score IS NOT NULL",
        )
        .bind(session_id)
        .fetch_one(&mut **tx)
        .await?;
        Ok(count as i32)
    }
}
