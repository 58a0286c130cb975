//! Payout permission store
//!
//! Every transition is a conditional UPDATE guarded on the expected prior
//! status. Zero rows affected means the guard missed - the caller re-reads
//! and classifies; nothing here writes unconditionally.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::PgPool;
use uuid::Uuid;

use mazadpay_clearing::{
    BlockCommand, PayoutPermission, PermissionStore, SellerPayoutGroup,
    UnlockDisposition,
};
use mazadpay_types::{ClearanceResult, PermissionStatus};

use crate::error::DbError;
use crate::models::{DbPayoutGroup, DbPayoutPermission};

pub struct PgPermissionStore {
    pool: PgPool,
}

impl PgPermissionStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

fn into_domain(row: DbPayoutPermission) -> ClearanceResult<PayoutPermission> {
    Ok(PayoutPermission::try_from(row).map_err(DbError::from)?)
}

fn into_domain_opt(
    row: Option<DbPayoutPermission>,
) -> ClearanceResult<Option<PayoutPermission>> {
    row.map(into_domain).transpose()
}

fn into_domain_vec(rows: Vec<DbPayoutPermission>) -> ClearanceResult<Vec<PayoutPermission>> {
    rows.into_iter().map(into_domain).collect()
}

#[async_trait]
impl PermissionStore for PgPermissionStore {
    async fn insert_if_absent(
        &self,
        permission: PayoutPermission,
    ) -> ClearanceResult<(PayoutPermission, bool)> {
        let inserted = sqlx::query_as::<_, DbPayoutPermission>(
            r#"
            INSERT INTO payout_permissions (
                id, transaction_id, listing_id, seller_id, buyer_id,
                payout_amount, original_amount, platform_commission, currency,
                return_policy_days, delivered_at, grace_period_expires_at,
                permission_status, is_cleared, debt_amount, notes,
                created_at, updated_at
            )
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12, $13, $14, $15, $16, $17, $18)
            ON CONFLICT (transaction_id) DO NOTHING
            RETURNING *
            "#,
        )
        .bind(permission.id)
        .bind(permission.transaction_id)
        .bind(permission.listing_id)
        .bind(permission.seller_id)
        .bind(permission.buyer_id)
        .bind(permission.payout_amount)
        .bind(permission.original_amount)
        .bind(permission.platform_commission)
        .bind(&permission.currency)
        .bind(permission.return_policy_days)
        .bind(permission.delivered_at)
        .bind(permission.grace_period_expires_at)
        .bind(permission.status.as_str())
        .bind(permission.is_cleared)
        .bind(permission.debt_amount)
        .bind(&permission.notes)
        .bind(permission.created_at)
        .bind(permission.updated_at)
        .fetch_optional(&self.pool)
        .await
        .map_err(DbError::from)?;

        if let Some(row) = inserted {
            return Ok((into_domain(row)?, true));
        }

        // Conflict: a permission for this transaction already exists.
        let existing = self
            .find_by_transaction(permission.transaction_id)
            .await?
            .ok_or_else(|| {
                DbError::NotFound(format!(
                    "permission for transaction {}",
                    permission.transaction_id
                ))
            })?;
        Ok((existing, false))
    }

    async fn find_by_transaction(
        &self,
        transaction_id: Uuid,
    ) -> ClearanceResult<Option<PayoutPermission>> {
        let row = sqlx::query_as::<_, DbPayoutPermission>(
            "SELECT * FROM payout_permissions WHERE transaction_id = $1",
        )
        .bind(transaction_id)
        .fetch_optional(&self.pool)
        .await
        .map_err(DbError::from)?;
        into_domain_opt(row)
    }

    async fn find_by_id(
        &self,
        permission_id: Uuid,
    ) -> ClearanceResult<Option<PayoutPermission>> {
        let row = sqlx::query_as::<_, DbPayoutPermission>(
            "SELECT * FROM payout_permissions WHERE id = $1",
        )
        .bind(permission_id)
        .fetch_optional(&self.pool)
        .await
        .map_err(DbError::from)?;
        into_domain_opt(row)
    }

    async fn lock(
        &self,
        transaction_id: Uuid,
        return_request_id: Uuid,
        reason: &str,
        now: DateTime<Utc>,
        note: &str,
    ) -> ClearanceResult<Option<PayoutPermission>> {
        let row = sqlx::query_as::<_, DbPayoutPermission>(
            r#"
            UPDATE payout_permissions
            SET permission_status = 'locked',
                is_cleared = FALSE,
                locked_at = $3,
                locked_reason = $4,
                locked_by_return_request_id = $2,
                notes = CASE WHEN notes = '' THEN $5 ELSE notes || E'\n' || $5 END,
                updated_at = $3
            WHERE transaction_id = $1
              AND permission_status IN ('withheld', 'cleared')
            RETURNING *
            "#,
        )
        .bind(transaction_id)
        .bind(return_request_id)
        .bind(now)
        .bind(reason)
        .bind(note)
        .fetch_optional(&self.pool)
        .await
        .map_err(DbError::from)?;
        into_domain_opt(row)
    }

    async fn unlock(
        &self,
        transaction_id: Uuid,
        return_request_id: Uuid,
        disposition: UnlockDisposition,
        now: DateTime<Utc>,
        note: &str,
    ) -> ClearanceResult<Option<PayoutPermission>> {
        let cleared = disposition == UnlockDisposition::Cleared;
        let new_status = if cleared {
            PermissionStatus::Cleared
        } else {
            PermissionStatus::Withheld
        };
        let row = sqlx::query_as::<_, DbPayoutPermission>(
            r#"
            UPDATE payout_permissions
            SET permission_status = $3,
                is_cleared = $4,
                cleared_at = CASE WHEN $4 THEN COALESCE(cleared_at, $5) ELSE NULL END,
                cleared_by = CASE WHEN $4 THEN COALESCE(cleared_by, 'system') ELSE NULL END,
                locked_at = NULL,
                locked_reason = NULL,
                locked_by_return_request_id = NULL,
                notes = CASE WHEN notes = '' THEN $6 ELSE notes || E'\n' || $6 END,
                updated_at = $5
            WHERE transaction_id = $1
              AND permission_status = 'locked'
              AND locked_by_return_request_id = $2
            RETURNING *
            "#,
        )
        .bind(transaction_id)
        .bind(return_request_id)
        .bind(new_status.as_str())
        .bind(cleared)
        .bind(now)
        .bind(note)
        .fetch_optional(&self.pool)
        .await
        .map_err(DbError::from)?;
        into_domain_opt(row)
    }

    async fn block(
        &self,
        transaction_id: Uuid,
        command: BlockCommand,
        now: DateTime<Utc>,
        note: &str,
    ) -> ClearanceResult<Option<PayoutPermission>> {
        let row = sqlx::query_as::<_, DbPayoutPermission>(
            r#"
            UPDATE payout_permissions
            SET permission_status = 'blocked',
                is_cleared = FALSE,
                blocked_at = $2,
                blocked_reason = $3,
                blocked_by = $4,
                debt_amount = $5,
                debt_due_date = $6,
                debt_status = $7,
                payout_amount = CASE WHEN $8 THEN 0 ELSE payout_amount END,
                notes = CASE WHEN notes = '' THEN $9 ELSE notes || E'\n' || $9 END,
                updated_at = $2
            WHERE transaction_id = $1
              AND permission_status IN ('withheld', 'locked', 'cleared')
            RETURNING *
            "#,
        )
        .bind(transaction_id)
        .bind(now)
        .bind(&command.reason)
        .bind(&command.blocked_by)
        .bind(command.debt_amount)
        .bind(command.debt_due_date)
        .bind(command.debt_status.as_str())
        .bind(command.zero_payout)
        .bind(note)
        .fetch_optional(&self.pool)
        .await
        .map_err(DbError::from)?;
        into_domain_opt(row)
    }

    async fn reverse(
        &self,
        permission_id: Uuid,
        admin_id: Uuid,
        reason: &str,
        debt_due_date: DateTime<Utc>,
        now: DateTime<Utc>,
        note: &str,
    ) -> ClearanceResult<Option<PayoutPermission>> {
        let row = sqlx::query_as::<_, DbPayoutPermission>(
            r#"
            UPDATE payout_permissions
            SET permission_status = 'blocked',
                is_cleared = FALSE,
                blocked_at = $4,
                blocked_reason = $3,
                blocked_by = $2,
                debt_amount = payout_amount,
                debt_due_date = $5,
                debt_status = 'pending',
                notes = CASE WHEN notes = '' THEN $6 ELSE notes || E'\n' || $6 END,
                updated_at = $4
            WHERE id = $1
              AND permission_status IN ('cleared', 'withheld')
            RETURNING *
            "#,
        )
        .bind(permission_id)
        .bind(admin_id.to_string())
        .bind(reason)
        .bind(now)
        .bind(debt_due_date)
        .bind(note)
        .fetch_optional(&self.pool)
        .await
        .map_err(DbError::from)?;
        into_domain_opt(row)
    }

    async fn mark_paid(
        &self,
        transaction_id: Uuid,
        payout_reference: &str,
        paid_by: &str,
        now: DateTime<Utc>,
        note: &str,
    ) -> ClearanceResult<Option<PayoutPermission>> {
        let row = sqlx::query_as::<_, DbPayoutPermission>(
            r#"
            UPDATE payout_permissions
            SET permission_status = 'paid',
                paid_at = $4,
                paid_by = $3,
                payout_reference = $2,
                notes = CASE WHEN notes = '' THEN $5 ELSE notes || E'\n' || $5 END,
                updated_at = $4
            WHERE transaction_id = $1
              AND permission_status = 'cleared'
            RETURNING *
            "#,
        )
        .bind(transaction_id)
        .bind(payout_reference)
        .bind(paid_by)
        .bind(now)
        .bind(note)
        .fetch_optional(&self.pool)
        .await
        .map_err(DbError::from)?;
        into_domain_opt(row)
    }

    async fn sweep_clear_expired(
        &self,
        now: DateTime<Utc>,
        limit: i64,
    ) -> ClearanceResult<u64> {
        let result = sqlx::query(
            r#"
            UPDATE payout_permissions
            SET permission_status = 'cleared',
                is_cleared = TRUE,
                cleared_at = $1,
                cleared_by = 'system',
                updated_at = $1
            WHERE id IN (
                SELECT id FROM payout_permissions
                WHERE permission_status = 'withheld'
                  AND grace_period_expires_at < $1
                ORDER BY grace_period_expires_at
                LIMIT $2
            )
            "#,
        )
        .bind(now)
        .bind(limit)
        .execute(&self.pool)
        .await
        .map_err(DbError::from)?;
        Ok(result.rows_affected())
    }

    async fn overdue_blocked(
        &self,
        cutoff: DateTime<Utc>,
        limit: i64,
    ) -> ClearanceResult<Vec<PayoutPermission>> {
        let rows = sqlx::query_as::<_, DbPayoutPermission>(
            r#"
            SELECT * FROM payout_permissions
            WHERE permission_status = 'blocked'
              AND debt_status IN ('pending', 'escalated')
              AND blocked_at < $1
            ORDER BY blocked_at
            LIMIT $2
            "#,
        )
        .bind(cutoff)
        .bind(limit)
        .fetch_all(&self.pool)
        .await
        .map_err(DbError::from)?;
        into_domain_vec(rows)
    }

    async fn outstanding_blocked(
        &self,
        limit: i64,
    ) -> ClearanceResult<Vec<PayoutPermission>> {
        let rows = sqlx::query_as::<_, DbPayoutPermission>(
            r#"
            SELECT * FROM payout_permissions
            WHERE permission_status = 'blocked'
              AND debt_status IN ('pending', 'escalated')
            ORDER BY blocked_at
            LIMIT $1
            "#,
        )
        .bind(limit)
        .fetch_all(&self.pool)
        .await
        .map_err(DbError::from)?;
        into_domain_vec(rows)
    }

    async fn escalate_seller_debts(
        &self,
        seller_id: Uuid,
        now: DateTime<Utc>,
        note: &str,
    ) -> ClearanceResult<u64> {
        let result = sqlx::query(
            r#"
            UPDATE payout_permissions
            SET debt_status = 'escalated',
                notes = CASE WHEN notes = '' THEN $3 ELSE notes || E'\n' || $3 END,
                updated_at = $2
            WHERE seller_id = $1
              AND permission_status = 'blocked'
              AND debt_status IN ('pending', 'escalated')
            "#,
        )
        .bind(seller_id)
        .bind(now)
        .bind(note)
        .execute(&self.pool)
        .await
        .map_err(DbError::from)?;
        Ok(result.rows_affected())
    }

    async fn cleared_for_partner(
        &self,
        seller_id: Option<Uuid>,
        limit: i64,
    ) -> ClearanceResult<Vec<PayoutPermission>> {
        let rows = sqlx::query_as::<_, DbPayoutPermission>(
            r#"
            SELECT * FROM payout_permissions
            WHERE permission_status = 'cleared'
              AND is_cleared = TRUE
              AND ($1::uuid IS NULL OR seller_id = $1)
            ORDER BY cleared_at
            LIMIT $2
            "#,
        )
        .bind(seller_id)
        .bind(limit)
        .fetch_all(&self.pool)
        .await
        .map_err(DbError::from)?;
        into_domain_vec(rows)
    }

    async fn payout_groups(
        &self,
        seller_id: Option<Uuid>,
    ) -> ClearanceResult<Vec<SellerPayoutGroup>> {
        let rows = sqlx::query_as::<_, DbPayoutGroup>(
            r#"
            SELECT seller_id,
                   COUNT(*) AS cleared_count,
                   COALESCE(SUM(payout_amount), 0)::BIGINT AS total_payout,
                   MIN(cleared_at) AS oldest_cleared_at
            FROM payout_permissions
            WHERE permission_status = 'cleared'
              AND ($1::uuid IS NULL OR seller_id = $1)
            GROUP BY seller_id
            ORDER BY seller_id
            "#,
        )
        .bind(seller_id)
        .fetch_all(&self.pool)
        .await
        .map_err(DbError::from)?;
        Ok(rows.into_iter().map(SellerPayoutGroup::from).collect())
    }

    async fn seller_history(
        &self,
        seller_id: Uuid,
        limit: i64,
    ) -> ClearanceResult<Vec<PayoutPermission>> {
        let rows = sqlx::query_as::<_, DbPayoutPermission>(
            r#"
            SELECT * FROM payout_permissions
            WHERE seller_id = $1
            ORDER BY delivered_at DESC
            LIMIT $2
            "#,
        )
        .bind(seller_id)
        .bind(limit)
        .fetch_all(&self.pool)
        .await
        .map_err(DbError::from)?;
        into_domain_vec(rows)
    }
}
