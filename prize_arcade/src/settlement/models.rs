//! Settlement data models and winner selection.

use crate::session::{EntryId, SessionId};
use chrono::{DateTime, Utc};
use serde::Serialize;

/// Outcome of a score submission, reflecting the session's final state
/// whether this call performed the completion or merely observed it.
#[derive(Debug, Clone, Serialize)]
pub struct SubmissionResult {
    pub entry_id: EntryId,
    pub session_id: SessionId,
    /// Whether the submitted score met the session's minimum
    pub qualified: bool,
    /// Whether the session is settled after this submission
    pub session_completed: bool,
    pub winner_entry_id: Option<EntryId>,
    pub winner_user_id: Option<i64>,
    pub winning_score: Option<i64>,
    /// Entries with a recorded score
    pub scored_entries: i32,
    pub capacity: i32,
}

/// A scored entry as seen by winner selection.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ScoredEntry {
    pub entry_id: EntryId,
    pub user_id: i64,
    pub score: i64,
    pub qualified: bool,
    pub submitted_at: DateTime<Utc>,
}

/// Select the winner among a session's scored entries: the qualified entry
/// with the strictly highest score; ties go to the earliest submission, and
/// identical timestamps fall back to the lower entry id so the result is
/// deterministic. Returns `None` when no entry qualifies.
pub fn select_winner(entries: &[ScoredEntry]) -> Option<&ScoredEntry> {
    entries.iter().filter(|e| e.qualified).min_by(|a, b| {
        b.score
            .cmp(&a.score)
            .then_with(|| a.submitted_at.cmp(&b.submitted_at))
            .then_with(|| a.entry_id.cmp(&b.entry_id))
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn entry(entry_id: EntryId, score: i64, qualified: bool, at_secs: i64) -> ScoredEntry {
        ScoredEntry {
            entry_id,
            user_id: entry_id * 10,
            score,
            qualified,
            submitted_at: Utc.timestamp_opt(1_700_000_000 + at_secs, 0).unwrap(),
        }
    }

    #[test]
    fn test_highest_qualified_score_wins() {
        let entries = vec![
            entry(1, 3, false, 0),
            entry(2, 7, true, 1),
            entry(3, 6, true, 2),
        ];
        let winner = select_winner(&entries).expect("a winner");
        assert_eq!(winner.entry_id, 2);
        assert_eq!(winner.score, 7);
    }

    #[test]
    fn test_tie_broken_by_earliest_submission() {
        let entries = vec![entry(1, 9, true, 5), entry(2, 9, true, 3)];
        let winner = select_winner(&entries).expect("a winner");
        assert_eq!(winner.entry_id, 2, "first to reach the score wins");
    }

    #[test]
    fn test_equal_timestamps_fall_back_to_entry_id() {
        let entries = vec![entry(8, 9, true, 4), entry(2, 9, true, 4)];
        let winner = select_winner(&entries).expect("a winner");
        assert_eq!(winner.entry_id, 2);
    }

    #[test]
    fn test_unqualified_high_score_loses() {
        let entries = vec![entry(1, 100, false, 0), entry(2, 6, true, 1)];
        let winner = select_winner(&entries).expect("a winner");
        assert_eq!(winner.entry_id, 2);
    }

    #[test]
    fn test_no_qualifier_means_no_winner() {
        let entries = vec![entry(1, 2, false, 0), entry(2, 4, false, 1)];
        assert!(select_winner(&entries).is_none());
    }

    #[test]
    fn test_empty_entries() {
        assert!(select_winner(&[]).is_none());
    }
}
