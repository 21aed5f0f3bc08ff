//! Ledger manager: atomic balance mutations with causal records.

use super::{
    errors::{LedgerError, LedgerResult},
    models::{EntryDirection, EntryType, LedgerAccount, LedgerEntry},
};
use sqlx::{PgPool, Postgres, Row, Transaction};
use std::sync::Arc;

/// Ledger manager
#[derive(Clone)]
pub struct LedgerManager {
    pool: Arc<PgPool>,
}

impl LedgerManager {
    /// Create a new ledger manager backed by the shared pool.
    pub fn new(pool: Arc<PgPool>) -> Self {
        Self { pool }
    }

    /// Get the ledger account for a user
    ///
    /// # Errors
    ///
    /// * `LedgerError::AccountNotFound` - No account row exists
    pub async fn get_account(&self, user_id: i64) -> LedgerResult<LedgerAccount> {
        let row = sqlx::query(
            r#"
            SELECT user_id, balance, created_at, updated_at
            FROM ledger_accounts
            WHERE user_id = $1
            "#,
        )
        .bind(user_id)
        .fetch_optional(self.pool.as_ref())
        .await?
        .ok_or(LedgerError::AccountNotFound(user_id))?;

        Ok(LedgerAccount {
            user_id: row.get("user_id"),
            balance: row.get("balance"),
            created_at: row.get::<chrono::NaiveDateTime, _>("created_at").and_utc(),
            updated_at: row.get::<chrono::NaiveDateTime, _>("updated_at").and_utc(),
        })
    }

    /// Ensure an account row exists for a user, creating it with a zero
    /// balance if missing. Safe to call repeatedly.
    pub async fn open_account(&self, user_id: i64) -> LedgerResult<LedgerAccount> {
        sqlx::query(
            "INSERT INTO ledger_accounts (user_id, balance)
             VALUES ($1, 0)
             ON CONFLICT (user_id) DO NOTHING",
        )
        .bind(user_id)
        .execute(self.pool.as_ref())
        .await?;

        self.get_account(user_id).await
    }

    /// Debit a user account, failing if the balance would go negative.
    ///
    /// Runs as its own transaction. For debits that must commit together
    /// with other state (fee collection inside a join), use [`Self::debit_tx`].
    pub async fn debit(
        &self,
        user_id: i64,
        amount: i64,
        session_id: Option<i64>,
        entry_type: EntryType,
        idempotency_key: String,
        description: Option<String>,
    ) -> LedgerResult<i64> {
        let mut tx = self.pool.begin().await?;
        let balance = self
            .debit_tx(
                &mut tx,
                user_id,
                amount,
                session_id,
                entry_type,
                idempotency_key,
                description,
            )
            .await?;
        tx.commit().await?;
        Ok(balance)
    }

    /// Credit a user account.
    ///
    /// Runs as its own transaction. For credits that must commit together
    /// with other state (prize distribution), use [`Self::credit_tx`].
    pub async fn credit(
        &self,
        user_id: i64,
        amount: i64,
        session_id: Option<i64>,
        entry_type: EntryType,
        idempotency_key: String,
        description: Option<String>,
    ) -> LedgerResult<i64> {
        let mut tx = self.pool.begin().await?;
        let balance = self
            .credit_tx(
                &mut tx,
                user_id,
                amount,
                session_id,
                entry_type,
                idempotency_key,
                description,
            )
            .await?;
        tx.commit().await?;
        Ok(balance)
    }

    /// Debit inside a caller-owned transaction.
    ///
    /// The balance check and decrement are a single guarded `UPDATE`, so a
    /// concurrent debit can never push the balance negative. Returns the new
    /// balance.
    ///
    /// # Errors
    ///
    /// * `LedgerError::InsufficientFunds` - Balance below `amount`
    /// * `LedgerError::AccountNotFound` - No account row
    /// * `LedgerError::DuplicateTransaction` - Idempotency key already used
    #[allow(clippy::too_many_arguments)]
    pub async fn debit_tx(
        &self,
        tx: &mut Transaction<'_, Postgres>,
        user_id: i64,
        amount: i64,
        session_id: Option<i64>,
        entry_type: EntryType,
        idempotency_key: String,
        description: Option<String>,
    ) -> LedgerResult<i64> {
        if amount <= 0 {
            return Err(LedgerError::InvalidAmount(amount));
        }

        self.check_duplicate(tx, &idempotency_key).await?;

        // Atomic balance check + decrement in a single statement.
        let result = sqlx::query(
            "UPDATE ledger_accounts
             SET balance = balance - $1, updated_at = NOW()
             WHERE user_id = $2 AND balance >= $1
             RETURNING balance",
        )
        .bind(amount)
        .bind(user_id)
        .fetch_optional(&mut **tx)
        .await?;

        let new_balance: i64 = match result {
            Some(row) => row.get("balance"),
            None => {
                // Either the account doesn't exist or the balance is too low.
                let check = sqlx::query("SELECT balance FROM ledger_accounts WHERE user_id = $1")
                    .bind(user_id)
                    .fetch_optional(&mut **tx)
                    .await?;

                return match check {
                    Some(row) => Err(LedgerError::InsufficientFunds {
                        available: row.get("balance"),
                        required: amount,
                    }),
                    None => Err(LedgerError::AccountNotFound(user_id)),
                };
            }
        };

        self.create_entry(
            tx,
            user_id,
            session_id,
            -amount,
            new_balance,
            EntryDirection::Debit,
            entry_type,
            idempotency_key,
            description,
        )
        .await?;

        Ok(new_balance)
    }

    /// Credit inside a caller-owned transaction. Returns the new balance.
    ///
    /// # Errors
    ///
    /// * `LedgerError::AccountNotFound` - No account row
    /// * `LedgerError::BalanceOverflow` - Credit would overflow i64
    /// * `LedgerError::DuplicateTransaction` - Idempotency key already used
    #[allow(clippy::too_many_arguments)]
    pub async fn credit_tx(
        &self,
        tx: &mut Transaction<'_, Postgres>,
        user_id: i64,
        amount: i64,
        session_id: Option<i64>,
        entry_type: EntryType,
        idempotency_key: String,
        description: Option<String>,
    ) -> LedgerResult<i64> {
        if amount <= 0 {
            return Err(LedgerError::InvalidAmount(amount));
        }

        self.check_duplicate(tx, &idempotency_key).await?;

        // Row lock so the overflow check and the write see the same balance.
        let row = sqlx::query("SELECT balance FROM ledger_accounts WHERE user_id = $1 FOR UPDATE")
            .bind(user_id)
            .fetch_optional(&mut **tx)
            .await?
            .ok_or(LedgerError::AccountNotFound(user_id))?;

        let current: i64 = row.get("balance");
        let new_balance = current
            .checked_add(amount)
            .ok_or(LedgerError::BalanceOverflow)?;

        sqlx::query(
            "UPDATE ledger_accounts
             SET balance = $1, updated_at = NOW()
             WHERE user_id = $2",
        )
        .bind(new_balance)
        .bind(user_id)
        .execute(&mut **tx)
        .await?;

        self.create_entry(
            tx,
            user_id,
            session_id,
            amount,
            new_balance,
            EntryDirection::Credit,
            entry_type,
            idempotency_key,
            description,
        )
        .await?;

        Ok(new_balance)
    }

    /// Get recent ledger entries for a user, newest first.
    pub async fn get_entries(&self, user_id: i64, limit: i64) -> LedgerResult<Vec<LedgerEntry>> {
        let rows = sqlx::query(
            r#"
            SELECT id, user_id, session_id, amount, balance_after, direction, entry_type,
                   idempotency_key, description, created_at
            FROM ledger_entries
            WHERE user_id = $1
            ORDER BY created_at DESC
            LIMIT $2
            "#,
        )
        .bind(user_id)
        .bind(limit)
        .fetch_all(self.pool.as_ref())
        .await?;

        let entries = rows
            .into_iter()
            .map(|row| LedgerEntry {
                id: row.get("id"),
                user_id: row.get("user_id"),
                session_id: row.get("session_id"),
                amount: row.get("amount"),
                balance_after: row.get("balance_after"),
                direction: EntryDirection::parse(&row.get::<String, _>("direction")),
                entry_type: EntryType::parse(&row.get::<String, _>("entry_type")),
                idempotency_key: row.get("idempotency_key"),
                description: row.get("description"),
                created_at: row.get::<chrono::NaiveDateTime, _>("created_at").and_utc(),
            })
            .collect();

        Ok(entries)
    }

    async fn check_duplicate(
        &self,
        tx: &mut Transaction<'_, Postgres>,
        idempotency_key: &str,
    ) -> LedgerResult<()> {
        let existing = sqlx::query("SELECT id FROM ledger_entries WHERE idempotency_key = $1")
            .bind(idempotency_key)
            .fetch_optional(&mut **tx)
            .await?;

        if existing.is_some() {
            return Err(LedgerError::DuplicateTransaction(
                idempotency_key.to_string(),
            ));
        }

        Ok(())
    }

    /// Insert the causal record paired with a balance mutation.
    #[allow(clippy::too_many_arguments)]
    async fn create_entry(
        &self,
        tx: &mut Transaction<'_, Postgres>,
        user_id: i64,
        session_id: Option<i64>,
        amount: i64,
        balance_after: i64,
        direction: EntryDirection,
        entry_type: EntryType,
        idempotency_key: String,
        description: Option<String>,
    ) -> LedgerResult<i64> {
        let row = sqlx::query(
            r#"
            INSERT INTO ledger_entries
                (user_id, session_id, amount, balance_after, direction, entry_type, idempotency_key, description)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8)
            RETURNING id
            "#,
        )
        .bind(user_id)
        .bind(session_id)
        .bind(amount)
        .bind(balance_after)
        .bind(direction.to_string())
        .bind(entry_type.to_string())
        .bind(idempotency_key)
        .bind(description)
        .fetch_one(&mut **tx)
        .await?;

        Ok(row.get("id"))
    }
}
