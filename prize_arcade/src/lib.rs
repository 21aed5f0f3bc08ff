//! # Prize Arcade
//!
//! The session lifecycle and settlement engine behind a paid skill-game
//! arcade: players pay an entry fee to join a session, submit one score per
//! entry, and compete for the pooled fees. The final qualifying submission
//! settles the session, credits the winner, and issues a single-use
//! redemption code a partner merchant can honor exactly once.
//!
//! All money movement runs through a double-entry ledger and every
//! multi-step operation commits as one PostgreSQL transaction, so a failed
//! join never half-debits a wallet and two racing finishers can never both
//! distribute the prize.
//!
//! ## Core Modules
//!
//! - [`ledger`]: user balances with atomic credit/debit and causal entries
//! - [`session`]: session creation, fee-collecting joins, idempotent cancel
//! - [`settlement`]: score submission, completion detection, winner payout
//! - [`redemption`]: single-use prize codes, issued once, redeemed once
//! - [`db`]: connection pool, configuration, and the read-model repository
//! - [`notify`]: broadcast fan-out of session events to connected clients
//!
//! ## Example
//!
//! ```no_run
//! use prize_arcade::db::{Database, DatabaseConfig};
//! use prize_arcade::ledger::LedgerManager;
//! use prize_arcade::notify::SessionNotifier;
//! use prize_arcade::session::{SessionConfig, SessionManager};
//! use std::sync::Arc;
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let db = Database::new(&DatabaseConfig::from_env()).await?;
//!     let pool = Arc::new(db.pool().clone());
//!
//!     let ledger = LedgerManager::new(pool.clone());
//!     let notifier = SessionNotifier::default();
//!     let sessions = SessionManager::new(pool, ledger, notifier);
//!
//!     let session = sessions
//!         .create_session(SessionConfig {
//!             game_kind: "brick_breaker".to_string(),
//!             entry_fee: 100,
//!             capacity: 3,
//!             min_score: 5,
//!         })
//!         .await?;
//!     println!("session {} open for entries", session.id);
//!     Ok(())
//! }
//! ```

/// Connection pooling, configuration, and the read-model repository.
pub mod db;

/// User balances: atomic credit/debit with double-entry causal records.
pub mod ledger;

/// Broadcast fan-out of session state changes.
pub mod notify;

/// Single-use prize redemption codes.
pub mod redemption;

/// Session lifecycle: create, join, cancel.
pub mod session;

/// Score settlement: submission, completion, winner selection, payout.
pub mod settlement;

pub use db::{Database, DatabaseConfig};
pub use ledger::LedgerManager;
pub use notify::{SessionEvent, SessionNotifier};
pub use redemption::RedemptionManager;
pub use session::{GameSession, SessionConfig, SessionManager, SessionStatus};
pub use settlement::{SettlementEngine, SubmissionResult};
