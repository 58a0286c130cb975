//! Database models - mapped from PostgreSQL tables
//!
//! Statuses live as TEXT in the database and as closed enums in the domain;
//! the conversions here are the only place the two meet.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use uuid::Uuid;

use mazadpay_clearing::{
    Account, PayoutPermission, SellerPayoutGroup, WalletEntry,
};
use mazadpay_types::{DebtStatus, PermissionStatus};

use crate::error::DbError;

#[derive(Debug, Clone, FromRow, Serialize, Deserialize)]
pub struct DbPayoutPermission {
    pub id: Uuid,
    pub transaction_id: Uuid,
    pub listing_id: Uuid,
    pub seller_id: Uuid,
    pub buyer_id: Uuid,
    pub payout_amount: i64,
    pub original_amount: i64,
    pub platform_commission: i64,
    pub currency: String,
    pub return_policy_days: i32,
    pub delivered_at: DateTime<Utc>,
    pub grace_period_expires_at: DateTime<Utc>,
    pub permission_status: String,
    pub is_cleared: bool,
    pub locked_at: Option<DateTime<Utc>>,
    pub locked_reason: Option<String>,
    pub locked_by_return_request_id: Option<Uuid>,
    pub blocked_at: Option<DateTime<Utc>>,
    pub blocked_reason: Option<String>,
    pub blocked_by: Option<String>,
    pub debt_amount: i64,
    pub debt_due_date: Option<DateTime<Utc>>,
    pub debt_status: Option<String>,
    pub cleared_at: Option<DateTime<Utc>>,
    pub cleared_by: Option<String>,
    pub paid_at: Option<DateTime<Utc>>,
    pub paid_by: Option<String>,
    pub payout_reference: Option<String>,
    pub notes: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl TryFrom<DbPayoutPermission> for PayoutPermission {
    type Error = DbError;

    fn try_from(row: DbPayoutPermission) -> Result<Self, Self::Error> {
        let status: PermissionStatus = row
            .permission_status
            .parse()
            .map_err(DbError::Serialization)?;
        let debt_status: Option<DebtStatus> = row
            .debt_status
            .as_deref()
            .map(|s| s.parse().map_err(DbError::Serialization))
            .transpose()?;

        Ok(PayoutPermission {
            id: row.id,
            transaction_id: row.transaction_id,
            listing_id: row.listing_id,
            seller_id: row.seller_id,
            buyer_id: row.buyer_id,
            payout_amount: row.payout_amount,
            original_amount: row.original_amount,
            platform_commission: row.platform_commission,
            currency: row.currency,
            return_policy_days: row.return_policy_days,
            delivered_at: row.delivered_at,
            grace_period_expires_at: row.grace_period_expires_at,
            status,
            is_cleared: row.is_cleared,
            locked_at: row.locked_at,
            locked_reason: row.locked_reason,
            locked_by_return_request_id: row.locked_by_return_request_id,
            blocked_at: row.blocked_at,
            blocked_reason: row.blocked_reason,
            blocked_by: row.blocked_by,
            debt_amount: row.debt_amount,
            debt_due_date: row.debt_due_date,
            debt_status,
            cleared_at: row.cleared_at,
            cleared_by: row.cleared_by,
            paid_at: row.paid_at,
            paid_by: row.paid_by,
            payout_reference: row.payout_reference,
            notes: row.notes,
            created_at: row.created_at,
            updated_at: row.updated_at,
        })
    }
}

#[derive(Debug, Clone, FromRow, Serialize, Deserialize)]
pub struct DbWalletEntry {
    pub id: Uuid,
    pub seller_id: Uuid,
    pub transaction_id: Uuid,
    pub entry_type: String,
    pub amount: i64,
    pub description: String,
    pub status: String,
    pub hold_until: Option<DateTime<Utc>>,
    pub available_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
}

impl TryFrom<DbWalletEntry> for WalletEntry {
    type Error = DbError;

    fn try_from(row: DbWalletEntry) -> Result<Self, Self::Error> {
        Ok(WalletEntry {
            id: row.id,
            seller_id: row.seller_id,
            transaction_id: row.transaction_id,
            entry_type: row.entry_type.parse().map_err(DbError::Serialization)?,
            amount: row.amount,
            description: row.description,
            status: row.status.parse().map_err(DbError::Serialization)?,
            hold_until: row.hold_until,
            available_at: row.available_at,
            created_at: row.created_at,
        })
    }
}

#[derive(Debug, Clone, FromRow, Serialize, Deserialize)]
pub struct DbAccount {
    pub id: Uuid,
    pub display_name: String,
    pub phone: Option<String>,
    pub is_active: bool,
    pub is_admin: bool,
}

impl From<DbAccount> for Account {
    fn from(row: DbAccount) -> Self {
        Account {
            id: row.id,
            display_name: row.display_name,
            phone: row.phone,
            is_active: row.is_active,
            is_admin: row.is_admin,
        }
    }
}

#[derive(Debug, Clone, FromRow)]
pub struct DbPayoutGroup {
    pub seller_id: Uuid,
    pub cleared_count: i64,
    pub total_payout: i64,
    pub oldest_cleared_at: Option<DateTime<Utc>>,
}

impl From<DbPayoutGroup> for SellerPayoutGroup {
    fn from(row: DbPayoutGroup) -> Self {
        SellerPayoutGroup {
            seller_id: row.seller_id,
            cleared_count: row.cleared_count,
            total_payout: row.total_payout,
            oldest_cleared_at: row.oldest_cleared_at,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn row() -> DbPayoutPermission {
        DbPayoutPermission {
            id: Uuid::new_v4(),
            transaction_id: Uuid::new_v4(),
            listing_id: Uuid::new_v4(),
            seller_id: Uuid::new_v4(),
            buyer_id: Uuid::new_v4(),
            payout_amount: 100,
            original_amount: 100,
            platform_commission: 0,
            currency: "IQD".to_string(),
            return_policy_days: 3,
            delivered_at: Utc::now(),
            grace_period_expires_at: Utc::now(),
            permission_status: "withheld".to_string(),
            is_cleared: false,
            locked_at: None,
            locked_reason: None,
            locked_by_return_request_id: None,
            blocked_at: None,
            blocked_reason: None,
            blocked_by: None,
            debt_amount: 0,
            debt_due_date: None,
            debt_status: None,
            cleared_at: None,
            cleared_by: None,
            paid_at: None,
            paid_by: None,
            payout_reference: None,
            notes: String::new(),
            created_at: Utc::now(),
            updated_at: Utc::now(),
        }
    }

    #[test]
    fn status_strings_map_to_enums() {
        let permission: PayoutPermission = row().try_into().unwrap();
        assert_eq!(permission.status, PermissionStatus::Withheld);
        assert_eq!(permission.debt_status, None);

        let mut blocked = row();
        blocked.permission_status = "blocked".to_string();
        blocked.debt_status = Some("pending".to_string());
        let permission: PayoutPermission = blocked.try_into().unwrap();
        assert_eq!(permission.status, PermissionStatus::Blocked);
        assert_eq!(permission.debt_status, Some(DebtStatus::Pending));
    }

    #[test]
    fn unknown_status_is_a_serialization_error() {
        let mut bad = row();
        bad.permission_status = "released".to_string();
        let result: Result<PayoutPermission, _> = bad.try_into();
        assert!(matches!(result, Err(DbError::Serialization(_))));
    }
}
