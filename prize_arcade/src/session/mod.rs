//! Session lifecycle: creation, fee-collecting joins, idempotent cancel.
//!
//! A session is created Open with zero entries. [`SessionManager::join`]
//! collects the entry fee, inserts the entry, and bumps the participant
//! count and prize pool as one transaction — a failed debit leaves no
//! entry behind and vice versa. [`SessionManager::cancel`] transitions
//! Open→Cancelled and refunds every collected fee exactly once.
//!
//! Status transitions are one-way: Open→Completed (owned by
//! [`crate::settlement`]) or Open→Cancelled. Completed and Cancelled are
//! terminal.

pub mod errors;
pub mod lifecycle;
pub mod models;

pub use errors::{SessionError, SessionResult};
pub use lifecycle::SessionManager;
pub use models::{EntryId, GameSession, SessionConfig, SessionEntry, SessionId, SessionStatus};
