//! Wallet-transactions ledger access
//!
//! The ledger is append-only. Reversal flips a row's status; nothing here
//! deletes or rewrites amounts.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::PgPool;
use uuid::Uuid;

use mazadpay_clearing::{WalletEntry, WalletLedger};
use mazadpay_types::ClearanceResult;

use crate::error::DbError;
use crate::models::DbWalletEntry;

pub struct PgWalletLedger {
    pool: PgPool,
}

impl PgWalletLedger {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl WalletLedger for PgWalletLedger {
    async fn entries_for_transaction(
        &self,
        transaction_id: Uuid,
    ) -> ClearanceResult<Vec<WalletEntry>> {
        let rows = sqlx::query_as::<_, DbWalletEntry>(
            "SELECT * FROM wallet_entries WHERE transaction_id = $1 ORDER BY created_at",
        )
        .bind(transaction_id)
        .fetch_all(&self.pool)
        .await
        .map_err(DbError::from)?;
        rows.into_iter()
            .map(|row| Ok(WalletEntry::try_from(row).map_err(DbError::from)?))
            .collect()
    }

    async fn mark_reversed(&self, entry_id: Uuid, _now: DateTime<Utc>) -> ClearanceResult<()> {
        let result = sqlx::query(
            r#"
            UPDATE wallet_entries
            SET status = 'reversed', available_at = NULL
            WHERE id = $1 AND status <> 'reversed'
            "#,
        )
        .bind(entry_id)
        .execute(&self.pool)
        .await
        .map_err(DbError::from)?;

        if result.rows_affected() == 0 {
            return Err(DbError::NotFound(format!("wallet entry {}", entry_id)).into());
        }
        Ok(())
    }

    async fn append(&self, entry: WalletEntry) -> ClearanceResult<WalletEntry> {
        let row = sqlx::query_as::<_, DbWalletEntry>(
            r#"
            INSERT INTO wallet_entries (
                id, seller_id, transaction_id, entry_type, amount,
                description, status, hold_until, available_at, created_at
            )
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10)
            RETURNING *
            "#,
        )
        .bind(entry.id)
        .bind(entry.seller_id)
        .bind(entry.transaction_id)
        .bind(entry.entry_type.as_str())
        .bind(entry.amount)
        .bind(&entry.description)
        .bind(entry.status.as_str())
        .bind(entry.hold_until)
        .bind(entry.available_at)
        .bind(entry.created_at)
        .fetch_one(&self.pool)
        .await
        .map_err(DbError::from)?;
        Ok(WalletEntry::try_from(row).map_err(DbError::from)?)
    }
}
