//! Storage ports for the clearance engine
//!
//! Every mutating method that implements a transition is a GUARDED update:
//! the backing store must only touch a row whose current status matches the
//! expected prior state, and must report a guard miss by returning `None`
//! (zero rows affected) rather than writing unconditionally. The engine
//! re-reads and classifies the miss.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use uuid::Uuid;

use mazadpay_types::ClearanceResult;

use crate::model::{
    Account, NewNotification, PayoutPermission, SellerPayoutGroup, WalletEntry,
};

/// Where an unlocked permission lands, decided by the engine against "now".
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UnlockDisposition {
    /// Grace period expired during the dispute; clear immediately.
    Cleared,
    /// Grace period still running; back to withheld.
    Withheld,
}

/// Parameters of a block transition (refund or buyer refusal).
#[derive(Debug, Clone)]
pub struct BlockCommand {
    pub blocked_by: String,
    pub reason: String,
    pub debt_amount: i64,
    pub debt_due_date: Option<DateTime<Utc>>,
    pub debt_status: mazadpay_types::DebtStatus,
    /// Zero-on-refusal: force `payout_amount` to zero.
    pub zero_payout: bool,
}

/// Durable store of payout permission records.
#[async_trait]
pub trait PermissionStore: Send + Sync {
    /// Insert unless a permission already exists for the transaction.
    /// Returns the stored record and whether it was newly created.
    async fn insert_if_absent(
        &self,
        permission: PayoutPermission,
    ) -> ClearanceResult<(PayoutPermission, bool)>;

    async fn find_by_transaction(
        &self,
        transaction_id: Uuid,
    ) -> ClearanceResult<Option<PayoutPermission>>;

    async fn find_by_id(&self, permission_id: Uuid)
        -> ClearanceResult<Option<PayoutPermission>>;

    /// withheld | cleared -> locked, guarded.
    async fn lock(
        &self,
        transaction_id: Uuid,
        return_request_id: Uuid,
        reason: &str,
        now: DateTime<Utc>,
        note: &str,
    ) -> ClearanceResult<Option<PayoutPermission>>;

    /// locked -> cleared | withheld, guarded on the owning return request.
    async fn unlock(
        &self,
        transaction_id: Uuid,
        return_request_id: Uuid,
        disposition: UnlockDisposition,
        now: DateTime<Utc>,
        note: &str,
    ) -> ClearanceResult<Option<PayoutPermission>>;

    /// Any non-terminal, non-blocked state -> blocked, guarded.
    async fn block(
        &self,
        transaction_id: Uuid,
        command: BlockCommand,
        now: DateTime<Utc>,
        note: &str,
    ) -> ClearanceResult<Option<PayoutPermission>>;

    /// cleared | withheld -> blocked by permission id, debt = payout amount.
    async fn reverse(
        &self,
        permission_id: Uuid,
        admin_id: Uuid,
        reason: &str,
        debt_due_date: DateTime<Utc>,
        now: DateTime<Utc>,
        note: &str,
    ) -> ClearanceResult<Option<PayoutPermission>>;

    /// cleared -> paid, guarded; `paid_at`/`payout_reference` are write-once.
    async fn mark_paid(
        &self,
        transaction_id: Uuid,
        payout_reference: &str,
        paid_by: &str,
        now: DateTime<Utc>,
        note: &str,
    ) -> ClearanceResult<Option<PayoutPermission>>;

    /// Batch withheld -> cleared where the grace period has expired, capped
    /// at `limit` rows. Returns the number of rows transitioned.
    async fn sweep_clear_expired(
        &self,
        now: DateTime<Utc>,
        limit: i64,
    ) -> ClearanceResult<u64>;

    /// Blocked records with unresolved debt whose `blocked_at` predates
    /// `cutoff`, for the daily suspension sweep.
    async fn overdue_blocked(
        &self,
        cutoff: DateTime<Utc>,
        limit: i64,
    ) -> ClearanceResult<Vec<PayoutPermission>>;

    /// All blocked records with unresolved debt, for the high-debt alert.
    async fn outstanding_blocked(&self, limit: i64)
        -> ClearanceResult<Vec<PayoutPermission>>;

    /// Escalate every unresolved blocked debt of one seller. Returns the
    /// number of rows escalated.
    async fn escalate_seller_debts(
        &self,
        seller_id: Uuid,
        now: DateTime<Utc>,
        note: &str,
    ) -> ClearanceResult<u64>;

    /// Cleared records, oldest clearance first (partners disburse FIFO).
    async fn cleared_for_partner(
        &self,
        seller_id: Option<Uuid>,
        limit: i64,
    ) -> ClearanceResult<Vec<PayoutPermission>>;

    /// Cleared records grouped by seller with running totals.
    async fn payout_groups(
        &self,
        seller_id: Option<Uuid>,
    ) -> ClearanceResult<Vec<SellerPayoutGroup>>;

    /// Full history for one seller, newest delivery first.
    async fn seller_history(
        &self,
        seller_id: Uuid,
        limit: i64,
    ) -> ClearanceResult<Vec<PayoutPermission>>;
}

/// Append-only wallet-transactions ledger owned by the wallet collaborator.
#[async_trait]
pub trait WalletLedger: Send + Sync {
    async fn entries_for_transaction(
        &self,
        transaction_id: Uuid,
    ) -> ClearanceResult<Vec<WalletEntry>>;

    /// Flip one entry to reversed; the row itself is never deleted.
    async fn mark_reversed(&self, entry_id: Uuid, now: DateTime<Utc>) -> ClearanceResult<()>;

    async fn append(&self, entry: WalletEntry) -> ClearanceResult<WalletEntry>;
}

/// Projection of the user-account collaborator.
#[async_trait]
pub trait AccountDirectory: Send + Sync {
    async fn find(&self, user_id: Uuid) -> ClearanceResult<Option<Account>>;

    /// Flip the account's `is_active` flag off.
    async fn suspend(&self, user_id: Uuid) -> ClearanceResult<()>;

    async fn admins(&self) -> ClearanceResult<Vec<Account>>;
}

/// In-app notification sink. Dispatch is best-effort: callers log failures
/// and never roll back a committed transition because of one.
#[async_trait]
pub trait Notifier: Send + Sync {
    async fn notify(&self, notification: NewNotification) -> ClearanceResult<()>;
}
