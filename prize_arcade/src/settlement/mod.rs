//! Score settlement: submission, completion detection, prize distribution.
//!
//! The completion race is the most safety-critical part of the system: two
//! entries submitting their final score at nearly the same instant must not
//! both distribute the prize. [`SettlementEngine`] serializes submissions
//! per session behind the session row lock and guards the Open→Completed
//! transition with a compare-and-swap on status, so winner selection, the
//! prize credit, and code issuance run exactly once and commit atomically
//! with the transition.

pub mod engine;
pub mod models;

pub use engine::{SettlementEngine, SettlementError, SettlementResult};
pub use models::{ScoredEntry, SubmissionResult, select_winner};
