//! Ledger data models.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Ledger account model: one row per user, balance in minor units.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LedgerAccount {
    pub user_id: i64,
    pub balance: i64,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Causal record for a single balance mutation.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LedgerEntry {
    pub id: i64,
    pub user_id: i64,
    pub session_id: Option<i64>,
    pub amount: i64,
    pub balance_after: i64,
    pub direction: EntryDirection,
    pub entry_type: EntryType,
    pub idempotency_key: String,
    pub description: Option<String>,
    pub created_at: DateTime<Utc>,
}

/// Entry direction
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum EntryDirection {
    Debit,
    Credit,
}

impl std::fmt::Display for EntryDirection {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            EntryDirection::Debit => write!(f, "debit"),
            EntryDirection::Credit => write!(f, "credit"),
        }
    }
}

impl EntryDirection {
    pub fn parse(s: &str) -> Self {
        match s {
            "debit" => EntryDirection::Debit,
            _ => EntryDirection::Credit,
        }
    }
}

/// What caused a ledger mutation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EntryType {
    /// Fee collected when a player joins a session
    EntryFee,
    /// Prize pool credited to a session winner
    Prize,
    /// Entry fee returned by a session cancellation
    Refund,
    /// External funds settled by the payment on-ramp
    Deposit,
    /// Manual correction
    Adjustment,
}

impl std::fmt::Display for EntryType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            EntryType::EntryFee => write!(f, "entry_fee"),
            EntryType::Prize => write!(f, "prize"),
            EntryType::Refund => write!(f, "refund"),
            EntryType::Deposit => write!(f, "deposit"),
            EntryType::Adjustment => write!(f, "adjustment"),
        }
    }
}

impl EntryType {
    pub fn parse(s: &str) -> Self {
        match s {
            "entry_fee" => EntryType::EntryFee,
            "prize" => EntryType::Prize,
            "refund" => EntryType::Refund,
            "deposit" => EntryType::Deposit,
            _ => EntryType::Adjustment,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_entry_direction_round_trip() {
        for direction in [EntryDirection::Debit, EntryDirection::Credit] {
            assert_eq!(EntryDirection::parse(&direction.to_string()), direction);
        }
    }

    #[test]
    fn test_entry_type_round_trip() {
        for entry_type in [
            EntryType::EntryFee,
            EntryType::Prize,
            EntryType::Refund,
            EntryType::Deposit,
            EntryType::Adjustment,
        ] {
            assert_eq!(EntryType::parse(&entry_type.to_string()), entry_type);
        }
    }

    #[test]
    fn test_unknown_entry_type_maps_to_adjustment() {
        assert_eq!(EntryType::parse("mystery"), EntryType::Adjustment);
    }
}
