//! Property tests for winner selection.

use chrono::{TimeZone, Utc};
use prize_arcade::settlement::{ScoredEntry, select_winner};
use proptest::prelude::*;

fn arb_entries() -> impl Strategy<Value = Vec<ScoredEntry>> {
    prop::collection::vec((0i64..1000, any::<bool>(), 0i64..100_000), 0..64).prop_map(|raw| {
        raw.into_iter()
            .enumerate()
            .map(|(i, (score, qualified, offset_secs))| ScoredEntry {
                entry_id: i as i64 + 1,
                user_id: (i as i64 + 1) * 100,
                score,
                qualified,
                submitted_at: Utc
                    .timestamp_opt(1_700_000_000 + offset_secs, 0)
                    .unwrap(),
            })
            .collect()
    })
}

proptest! {
    #[test]
    fn winner_is_qualified_and_undominated(entries in arb_entries()) {
        if let Some(winner) = select_winner(&entries) {
            prop_assert!(winner.qualified);
            for entry in entries.iter().filter(|e| e.qualified) {
                // No qualified entry strictly beats the winner.
                prop_assert!(entry.score <= winner.score);
                if entry.score == winner.score && entry.entry_id != winner.entry_id {
                    // Ties go to the earliest submission, then lowest id.
                    prop_assert!(
                        entry.submitted_at > winner.submitted_at
                            || (entry.submitted_at == winner.submitted_at
                                && entry.entry_id > winner.entry_id)
                    );
                }
            }
        } else {
            prop_assert!(entries.iter().all(|e| !e.qualified));
        }
    }

    #[test]
    fn selection_is_order_independent(entries in arb_entries()) {
        let forward = select_winner(&entries).map(|w| w.entry_id);
        let mut reversed = entries.clone();
        reversed.reverse();
        let backward = select_winner(&reversed).map(|w| w.entry_id);
        prop_assert_eq!(forward, backward);
    }

    #[test]
    fn no_qualifier_means_no_winner(
        entries in arb_entries().prop_map(|mut es| {
            for e in &mut es { e.qualified = false; }
            es
        })
    ) {
        prop_assert!(select_winner(&entries).is_none());
    }
}
