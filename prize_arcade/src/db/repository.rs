//! Read-model repository traits for testability and dependency injection.
//!
//! Mutations go through the managers and their explicit transactions; the
//! repository covers the read side (dashboards, leaderboards) behind a
//! trait so server handlers can be exercised against an in-memory mock.

use async_trait::async_trait;
use sqlx::PgPool;

use crate::session::{GameSession, SessionEntry, SessionError, SessionId, SessionResult, SessionStatus};

/// Trait for session read operations
#[async_trait]
pub trait SessionRepository: Send + Sync {
    /// Get a session by id
    async fn get_session(&self, session_id: SessionId) -> SessionResult<GameSession>;

    /// List sessions, optionally filtered by status, newest first
    async fn list_sessions(&self, status: Option<SessionStatus>)
    -> SessionResult<Vec<GameSession>>;

    /// List a session's entries in join order
    async fn list_entries(&self, session_id: SessionId) -> SessionResult<Vec<SessionEntry>>;
}

/// Default PostgreSQL implementation of `SessionRepository`
#[derive(Clone)]
pub struct PgSessionRepository {
    pool: PgPool,
}

impl PgSessionRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

const SESSION_COLUMNS: &str = "id, game_kind, entry_fee, capacity, entry_count, prize_pool, \
                               min_score, status, winner_entry_id, winning_score, created_at, \
                               completed_at";

#[async_trait]
impl SessionRepository for PgSessionRepository {
    async fn get_session(&self, session_id: SessionId) -> SessionResult<GameSession> {
        let row = sqlx::query(&format!(
            "SELECT {SESSION_COLUMNS} FROM game_sessions WHERE id = $1"
        ))
        .bind(session_id)
        .fetch_optional(&self.pool)
        .await?
        .ok_or(SessionError::NotFound(session_id))?;

        Ok(GameSession::from_row(&row))
    }

    async fn list_sessions(
        &self,
        status: Option<SessionStatus>,
    ) -> SessionResult<Vec<GameSession>> {
        let rows = if let Some(status) = status {
            sqlx::query(&format!(
                "SELECT {SESSION_COLUMNS} FROM game_sessions
                 WHERE status = $1
                 ORDER BY created_at DESC"
            ))
            .bind(status.to_string())
            .fetch_all(&self.pool)
            .await?
        } else {
            sqlx::query(&format!(
                "SELECT {SESSION_COLUMNS} FROM game_sessions ORDER BY created_at DESC"
            ))
            .fetch_all(&self.pool)
            .await?
        };

        Ok(rows.iter().map(GameSession::from_row).collect())
    }

    async fn list_entries(&self, session_id: SessionId) -> SessionResult<Vec<SessionEntry>> {
        let rows = sqlx::query(
            "SELECT id, session_id, user_id, score, qualified, joined_at, submitted_at
             FROM session_entries
             WHERE session_id = $1
             ORDER BY joined_at, id",
        )
        .bind(session_id)
        .fetch_all(&self.pool)
        .await?;

        Ok(rows.iter().map(SessionEntry::from_row).collect())
    }
}

/// In-memory implementation for testing
#[cfg(test)]
pub mod mock {
    use super::*;
    use std::collections::HashMap;
    use std::sync::Mutex;

    #[derive(Default)]
    pub struct MockSessionRepository {
        sessions: Mutex<HashMap<SessionId, GameSession>>,
        entries: Mutex<HashMap<SessionId, Vec<SessionEntry>>>,
    }

    impl MockSessionRepository {
        pub fn new() -> Self {
            Self::default()
        }

        pub fn with_session(self, session: GameSession) -> Self {
            self.sessions.lock().unwrap().insert(session.id, session);
            self
        }

        pub fn with_entry(self, entry: SessionEntry) -> Self {
            self.entries
                .lock()
                .unwrap()
                .entry(entry.session_id)
                .or_default()
                .push(entry);
            self
        }
    }

    #[async_trait]
    impl SessionRepository for MockSessionRepository {
        async fn get_session(&self, session_id: SessionId) -> SessionResult<GameSession> {
            self.sessions
                .lock()
                .unwrap()
                .get(&session_id)
                .cloned()
                .ok_or(SessionError::NotFound(session_id))
        }

        async fn list_sessions(
            &self,
            status: Option<SessionStatus>,
        ) -> SessionResult<Vec<GameSession>> {
            let sessions = self.sessions.lock().unwrap();
            let mut out: Vec<GameSession> = sessions
                .values()
                .filter(|s| status.is_none_or(|wanted| s.status == wanted))
                .cloned()
                .collect();
            out.sort_by(|a, b| b.created_at.cmp(&a.created_at));
            Ok(out)
        }

        async fn list_entries(&self, session_id: SessionId) -> SessionResult<Vec<SessionEntry>> {
            Ok(self
                .entries
                .lock()
                .unwrap()
                .get(&session_id)
                .cloned()
                .unwrap_or_default())
        }
    }

    #[cfg(test)]
    mod tests {
        use super::*;
        use chrono::Utc;

        fn session(id: SessionId, status: SessionStatus) -> GameSession {
            GameSession {
                id,
                game_kind: "brick_breaker".to_string(),
                entry_fee: 100,
                capacity: 3,
                entry_count: 0,
                prize_pool: 0,
                min_score: 5,
                status,
                winner_entry_id: None,
                winning_score: None,
                created_at: Utc::now(),
                completed_at: None,
            }
        }

        #[tokio::test]
        async fn test_mock_get_session() {
            let repo = MockSessionRepository::new().with_session(session(1, SessionStatus::Open));

            let found = repo.get_session(1).await.unwrap();
            assert_eq!(found.id, 1);

            let missing = repo.get_session(99).await;
            assert!(matches!(missing, Err(SessionError::NotFound(99))));
        }

        #[tokio::test]
        async fn test_mock_list_sessions_filters_by_status() {
            let repo = MockSessionRepository::new()
                .with_session(session(1, SessionStatus::Open))
                .with_session(session(2, SessionStatus::Completed))
                .with_session(session(3, SessionStatus::Open));

            let open = repo
                .list_sessions(Some(SessionStatus::Open))
                .await
                .unwrap();
            assert_eq!(open.len(), 2);
            assert!(open.iter().all(|s| s.status == SessionStatus::Open));

            let all = repo.list_sessions(None).await.unwrap();
            assert_eq!(all.len(), 3);
        }

        #[tokio::test]
        async fn test_mock_list_entries_empty_for_unknown_session() {
            let repo = MockSessionRepository::new();
            let entries = repo.list_entries(42).await.unwrap();
            assert!(entries.is_empty());
        }
    }
}
