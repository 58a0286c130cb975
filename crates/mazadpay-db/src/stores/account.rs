//! Account directory access

use async_trait::async_trait;
use sqlx::PgPool;
use uuid::Uuid;

use mazadpay_clearing::{Account, AccountDirectory};
use mazadpay_types::ClearanceResult;

use crate::error::DbError;
use crate::models::DbAccount;

pub struct PgAccountDirectory {
    pool: PgPool,
}

impl PgAccountDirectory {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl AccountDirectory for PgAccountDirectory {
    async fn find(&self, user_id: Uuid) -> ClearanceResult<Option<Account>> {
        let row = sqlx::query_as::<_, DbAccount>(
            "SELECT id, display_name, phone, is_active, is_admin FROM accounts WHERE id = $1",
        )
        .bind(user_id)
        .fetch_optional(&self.pool)
        .await
        .map_err(DbError::from)?;
        Ok(row.map(Account::from))
    }

    async fn suspend(&self, user_id: Uuid) -> ClearanceResult<()> {
        let result = sqlx::query("UPDATE accounts SET is_active = FALSE WHERE id = $1")
            .bind(user_id)
            .execute(&self.pool)
            .await
            .map_err(DbError::from)?;

        if result.rows_affected() == 0 {
            return Err(DbError::NotFound(format!("account {}", user_id)).into());
        }
        Ok(())
    }

    async fn admins(&self) -> ClearanceResult<Vec<Account>> {
        let rows = sqlx::query_as::<_, DbAccount>(
            "SELECT id, display_name, phone, is_active, is_admin FROM accounts WHERE is_admin = TRUE ORDER BY id",
        )
        .fetch_all(&self.pool)
        .await
        .map_err(DbError::from)?;
        Ok(rows.into_iter().map(Account::from).collect())
    }
}
