//! Session lifecycle manager.

use super::{
    errors::{SessionError, SessionResult},
    models::{EntryId, GameSession, SessionConfig, SessionEntry, SessionId, SessionStatus},
};
use crate::db::{self, PgSessionRepository, SessionRepository};
use crate::ledger::{EntryType, LedgerManager};
use crate::notify::{SessionEvent, SessionNotifier};
use sqlx::{PgPool, Row};
use std::sync::Arc;
use uuid::Uuid;

/// Session lifecycle manager
#[derive(Clone)]
pub struct SessionManager {
    pool: Arc<PgPool>,
    ledger: LedgerManager,
    repo: PgSessionRepository,
    notifier: SessionNotifier,
}

impl SessionManager {
    /// Create a new session manager.
    pub fn new(pool: Arc<PgPool>, ledger: LedgerManager, notifier: SessionNotifier) -> Self {
        let repo = PgSessionRepository::new(pool.as_ref().clone());
        Self {
            pool,
            ledger,
            repo,
            notifier,
        }
    }

    /// Create a new session, Open with zero entries.
    pub async fn create_session(&self, config: SessionConfig) -> SessionResult<GameSession> {
        config.validate().map_err(SessionError::InvalidConfig)?;

        let row = sqlx::query(
            r#"
            INSERT INTO game_sessions (game_kind, entry_fee, capacity, min_score)
            VALUES ($1, $2, $3, $4)
            RETURNING id, game_kind, entry_fee, capacity, entry_count, prize_pool, min_score,
                      status, winner_entry_id, winning_score, created_at, completed_at
            "#,
        )
        .bind(config.game_kind.trim())
        .bind(config.entry_fee)
        .bind(config.capacity)
        .bind(config.min_score)
        .fetch_one(self.pool.as_ref())
        .await?;

        let session = GameSession::from_row(&row);
        log::info!(
            "created session {} ({}, fee {}, capacity {})",
            session.id,
            session.game_kind,
            session.entry_fee,
            session.capacity
        );

        self.notifier.publish(SessionEvent::SessionCreated {
            session_id: session.id,
            game_kind: session.game_kind.clone(),
            entry_fee: session.entry_fee,
            capacity: session.capacity,
        });

        Ok(session)
    }

    /// Join a session: debit the entry fee, insert an entry with no score
    /// yet, and grow the participant count and prize pool — all in one
    /// transaction. Either everything commits or nothing does.
    ///
    /// Re-entry is allowed: a user who pays again gets an independent entry.
    ///
    /// # Errors
    ///
    /// * `SessionError::NotFound` - No such session
    /// * `SessionError::SessionClosed` - Session already completed/cancelled
    /// * `SessionError::SessionFull` - Capacity reached
    /// * `SessionError::InsufficientFunds` - Balance below the entry fee
    pub async fn join(&self, session_id: SessionId, user_id: i64) -> SessionResult<EntryId> {
        let mut attempts = 0;
        loop {
            match self.join_once(session_id, user_id).await {
                Err(ref e) if attempts + 1 < db::MAX_TX_ATTEMPTS && e.is_serialization_failure() => {
                    attempts += 1;
                    log::warn!("join of session {session_id} aborted, retrying (attempt {attempts})");
                }
                result => return result,
            }
        }
    }

    async fn join_once(&self, session_id: SessionId, user_id: i64) -> SessionResult<EntryId> {
        let mut tx = self.pool.begin().await?;

        // Guarded increment: also takes the session row lock, serializing
        // concurrent joins so entry_count can never exceed capacity.
        let updated = sqlx::query(
            "UPDATE game_sessions
             SET entry_count = entry_count + 1, prize_pool = prize_pool + entry_fee
             WHERE id = $1 AND status = 'open' AND entry_count < capacity
             RETURNING entry_fee, entry_count, capacity",
        )
        .bind(session_id)
        .fetch_optional(&mut *tx)
        .await?;

        let (entry_fee, entry_count, capacity): (i64, i32, i32) = match updated {
            Some(row) => (
                row.get("entry_fee"),
                row.get("entry_count"),
                row.get("capacity"),
            ),
            None => {
                // Guard failed: figure out which precondition broke.
                let check = sqlx::query("SELECT status FROM game_sessions WHERE id = $1")
                    .bind(session_id)
                    .fetch_optional(&mut *tx)
                    .await?;

                return match check {
                    None => Err(SessionError::NotFound(session_id)),
                    Some(row) => {
                        let status = SessionStatus::parse(&row.get::<String, _>("status"));
                        if status.is_open() {
                            Err(SessionError::SessionFull(session_id))
                        } else {
                            Err(SessionError::SessionClosed(session_id))
                        }
                    }
                };
            }
        };

        if entry_fee > 0 {
            let key = format!("join_{}_{}", session_id, Uuid::new_v4());
            self.ledger
                .debit_tx(
                    &mut tx,
                    user_id,
                    entry_fee,
                    Some(session_id),
                    EntryType::EntryFee,
                    key,
                    Some(format!("Entry fee for session {session_id}")),
                )
                .await?;
        }

        let entry_row = sqlx::query(
            "INSERT INTO session_entries (session_id, user_id) VALUES ($1, $2) RETURNING id",
        )
        .bind(session_id)
        .bind(user_id)
        .fetch_one(&mut *tx)
        .await?;
        let entry_id: EntryId = entry_row.get("id");

        tx.commit().await?;

        log::info!(
            "user {user_id} joined session {session_id} as entry {entry_id} ({entry_count}/{capacity})"
        );
        self.notifier.publish(SessionEvent::ParticipantJoined {
            session_id,
            entry_id,
            user_id,
            entry_count,
            capacity,
        });

        Ok(entry_id)
    }

    /// Cancel an Open session and refund every collected entry fee, exactly
    /// once per entry. Idempotent: cancelling a session that is already
    /// terminal is a no-op.
    pub async fn cancel(&self, session_id: SessionId) -> SessionResult<()> {
        let mut attempts = 0;
        loop {
            match self.cancel_once(session_id).await {
                Err(ref e) if attempts + 1 < db::MAX_TX_ATTEMPTS && e.is_serialization_failure() => {
                    attempts += 1;
                    log::warn!(
                        "cancel of session {session_id} aborted, retrying (attempt {attempts})"
                    );
                }
                result => return result,
            }
        }
    }

    async fn cancel_once(&self, session_id: SessionId) -> SessionResult<()> {
        let mut tx = self.pool.begin().await?;

        // Compare-and-swap on status; a second cancel (or a raced
        // completion) falls through to the no-op path.
        let cancelled = sqlx::query(
            "UPDATE game_sessions
             SET status = 'cancelled'
             WHERE id = $1 AND status = 'open'
             RETURNING entry_fee",
        )
        .bind(session_id)
        .fetch_optional(&mut *tx)
        .await?;

        let entry_fee: i64 = match cancelled {
            Some(row) => row.get("entry_fee"),
            None => {
                let exists = sqlx::query("SELECT id FROM game_sessions WHERE id = $1")
                    .bind(session_id)
                    .fetch_optional(&mut *tx)
                    .await?;
                return match exists {
                    None => Err(SessionError::NotFound(session_id)),
                    Some(_) => Ok(()),
                };
            }
        };

        let entries =
            sqlx::query("SELECT id, user_id FROM session_entries WHERE session_id = $1 ORDER BY id")
                .bind(session_id)
                .fetch_all(&mut *tx)
                .await?;
        let refunded = entries.len();

        if entry_fee > 0 {
            for entry in &entries {
                let entry_id: i64 = entry.get("id");
                let entry_user: i64 = entry.get("user_id");
                // Deterministic key: a retried cancel can never refund twice.
                let key = format!("refund_{session_id}_{entry_id}");
                self.ledger
                    .credit_tx(
                        &mut tx,
                        entry_user,
                        entry_fee,
                        Some(session_id),
                        EntryType::Refund,
                        key,
                        Some(format!("Refund for cancelled session {session_id}")),
                    )
                    .await?;
            }
        }

        tx.commit().await?;

        log::info!("cancelled session {session_id}, refunded {refunded} entries");
        self.notifier.publish(SessionEvent::SessionCancelled {
            session_id,
            refunded_entries: refunded,
        });

        Ok(())
    }

    /// Get a session by id.
    pub async fn get_session(&self, session_id: SessionId) -> SessionResult<GameSession> {
        self.repo.get_session(session_id).await
    }

    /// List sessions, optionally filtered by status, newest first.
    pub async fn list_sessions(
        &self,
        status: Option<SessionStatus>,
    ) -> SessionResult<Vec<GameSession>> {
        self.repo.list_sessions(status).await
    }

    /// List a session's entries in join order.
    pub async fn list_entries(&self, session_id: SessionId) -> SessionResult<Vec<SessionEntry>> {
        self.repo.list_entries(session_id).await
    }
}
