//! Prize redemption codes.
//!
//! A completed session with a winner yields exactly one opaque code, bound
//! to that session and winner, for the frozen prize amount. A merchant
//! presents the code once: the redeemed flag flips false→true atomically
//! and any replay fails. Codes are not merchant-scoped — any merchant may
//! honor a valid code.

pub mod errors;
pub mod models;
pub mod service;

pub use errors::{RedemptionError, RedemptionResult};
pub use models::{CODE_LENGTH, RedemptionCode, generate_code};
pub use service::RedemptionManager;
