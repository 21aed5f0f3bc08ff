//! Ledger module: the subsystem of record for user balances.
//!
//! Every balance mutation is paired with a causal `ledger_entries` row
//! (entry fee, prize, refund, deposit) carrying the balance after the
//! mutation and an idempotency key, so there are no freestanding balance
//! writes and replayed requests cannot double-apply.
//!
//! Debit and credit are exposed both as standalone operations and as
//! `*_tx` variants that run inside a caller-owned transaction. The `*_tx`
//! forms are what [`crate::session`] and [`crate::settlement`] use to fold
//! fee collection and prize distribution into their own atomic units.

pub mod errors;
pub mod manager;
pub mod models;

pub use errors::{LedgerError, LedgerResult};
pub use manager::LedgerManager;
pub use models::{EntryDirection, EntryType, LedgerAccount, LedgerEntry};
