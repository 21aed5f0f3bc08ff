//! Session data models.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::Row;
use sqlx::postgres::PgRow;

/// Session ID type
pub type SessionId = i64;

/// Entry ID type
pub type EntryId = i64;

/// Session status
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SessionStatus {
    /// Accepting entries and score submissions
    Open,
    /// Settled: winner recorded (or none qualified), prize pool frozen
    Completed,
    /// Cancelled: all entry fees refunded
    Cancelled,
}

impl std::fmt::Display for SessionStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            SessionStatus::Open => write!(f, "open"),
            SessionStatus::Completed => write!(f, "completed"),
            SessionStatus::Cancelled => write!(f, "cancelled"),
        }
    }
}

impl SessionStatus {
    pub fn parse(s: &str) -> Self {
        match s {
            "completed" => SessionStatus::Completed,
            "cancelled" => SessionStatus::Cancelled,
            _ => SessionStatus::Open,
        }
    }

    /// Whether the session still accepts joins and submissions.
    pub fn is_open(&self) -> bool {
        matches!(self, SessionStatus::Open)
    }
}

/// Parameters for creating a session.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SessionConfig {
    /// Which mini-game this session plays
    pub game_kind: String,
    /// Fee debited from each joining player, in minor units
    pub entry_fee: i64,
    /// Maximum number of entries; the session settles when this many are scored
    pub capacity: i32,
    /// Minimum score an entry needs to qualify for the prize
    pub min_score: i64,
}

impl SessionConfig {
    /// Validate the configuration before any state is created.
    pub fn validate(&self) -> Result<(), String> {
        if self.game_kind.trim().is_empty() {
            return Err("game_kind must not be empty".to_string());
        }
        if self.entry_fee < 0 {
            return Err(format!("entry_fee must be >= 0, got {}", self.entry_fee));
        }
        if self.capacity < 1 {
            return Err(format!("capacity must be >= 1, got {}", self.capacity));
        }
        if self.min_score < 0 {
            return Err(format!("min_score must be >= 0, got {}", self.min_score));
        }
        Ok(())
    }
}

/// A playable contest instance.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GameSession {
    pub id: SessionId,
    pub game_kind: String,
    pub entry_fee: i64,
    pub capacity: i32,
    pub entry_count: i32,
    /// `entry_fee * entry_count` while Open; frozen at settlement.
    pub prize_pool: i64,
    pub min_score: i64,
    pub status: SessionStatus,
    pub winner_entry_id: Option<EntryId>,
    pub winning_score: Option<i64>,
    pub created_at: DateTime<Utc>,
    pub completed_at: Option<DateTime<Utc>>,
}

impl GameSession {
    pub fn is_full(&self) -> bool {
        self.entry_count >= self.capacity
    }

    pub fn seats_left(&self) -> i32 {
        (self.capacity - self.entry_count).max(0)
    }

    /// Map a `game_sessions` row.
    pub fn from_row(row: &PgRow) -> Self {
        Self {
            id: row.get("id"),
            game_kind: row.get("game_kind"),
            entry_fee: row.get("entry_fee"),
            capacity: row.get("capacity"),
            entry_count: row.get("entry_count"),
            prize_pool: row.get("prize_pool"),
            min_score: row.get("min_score"),
            status: SessionStatus::parse(&row.get::<String, _>("status")),
            winner_entry_id: row.get("winner_entry_id"),
            winning_score: row.get("winning_score"),
            created_at: row.get::<chrono::NaiveDateTime, _>("created_at").and_utc(),
            completed_at: row
                .get::<Option<chrono::NaiveDateTime>, _>("completed_at")
                .map(|dt| dt.and_utc()),
        }
    }
}

/// One paid attempt by a user within a session. Immutable once scored.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SessionEntry {
    pub id: EntryId,
    pub session_id: SessionId,
    pub user_id: i64,
    pub score: Option<i64>,
    pub qualified: bool,
    pub joined_at: DateTime<Utc>,
    pub submitted_at: Option<DateTime<Utc>>,
}

impl SessionEntry {
    pub fn is_scored(&self) -> bool {
        self.score.is_some()
    }

    /// Map a `session_entries` row.
    pub fn from_row(row: &PgRow) -> Self {
        Self {
            id: row.get("id"),
            session_id: row.get("session_id"),
            user_id: row.get("user_id"),
            score: row.get("score"),
            qualified: row.get("qualified"),
            joined_at: row.get::<chrono::NaiveDateTime, _>("joined_at").and_utc(),
            submitted_at: row
                .get::<Option<chrono::NaiveDateTime>, _>("submitted_at")
                .map(|dt| dt.and_utc()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn config() -> SessionConfig {
        SessionConfig {
            game_kind: "brick_breaker".to_string(),
            entry_fee: 100,
            capacity: 3,
            min_score: 5,
        }
    }

    #[test]
    fn test_valid_config() {
        assert!(config().validate().is_ok());
    }

    #[test]
    fn test_free_session_is_valid() {
        let mut c = config();
        c.entry_fee = 0;
        assert!(c.validate().is_ok());
    }

    #[test]
    fn test_empty_game_kind_rejected() {
        let mut c = config();
        c.game_kind = "  ".to_string();
        assert!(c.validate().is_err());
    }

    #[test]
    fn test_zero_capacity_rejected() {
        let mut c = config();
        c.capacity = 0;
        assert!(c.validate().is_err());
    }

    #[test]
    fn test_negative_fee_rejected() {
        let mut c = config();
        c.entry_fee = -1;
        assert!(c.validate().is_err());
    }

    #[test]
    fn test_status_round_trip() {
        for status in [
            SessionStatus::Open,
            SessionStatus::Completed,
            SessionStatus::Cancelled,
        ] {
            assert_eq!(SessionStatus::parse(&status.to_string()), status);
        }
    }

    #[test]
    fn test_only_open_accepts_play() {
        assert!(SessionStatus::Open.is_open());
        assert!(!SessionStatus::Completed.is_open());
        assert!(!SessionStatus::Cancelled.is_open());
    }
}
