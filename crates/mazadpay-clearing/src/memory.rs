//! In-process implementation of the storage ports
//!
//! Backs the test suites. Transition semantics mirror the
//! PostgreSQL implementation in `mazadpay-db`: every mutating method checks
//! the guard and returns `None` on a miss instead of writing blindly.

use std::collections::HashMap;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use parking_lot::RwLock;
use uuid::Uuid;

use mazadpay_types::{ClearanceError, ClearanceResult, DebtStatus, PermissionStatus};

use crate::model::{
    append_note, Account, NewNotification, PayoutPermission, SellerPayoutGroup,
    WalletEntry, WalletEntryStatus,
};
use crate::store::{
    AccountDirectory, BlockCommand, Notifier, PermissionStore, UnlockDisposition,
    WalletLedger,
};

/// In-memory store implementing all four engine ports.
#[derive(Default)]
pub struct MemoryStore {
    /// Keyed by transaction id - exactly one permission per transaction.
    permissions: RwLock<HashMap<Uuid, PayoutPermission>>,
    wallet: RwLock<Vec<WalletEntry>>,
    accounts: RwLock<HashMap<Uuid, Account>>,
    notifications: RwLock<Vec<NewNotification>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn seed_account(&self, account: Account) {
        self.accounts.write().insert(account.id, account);
    }

    pub fn seed_wallet_entry(&self, entry: WalletEntry) {
        self.wallet.write().push(entry);
    }

    pub fn wallet_entries(&self) -> Vec<WalletEntry> {
        self.wallet.read().clone()
    }

    pub fn notifications(&self) -> Vec<NewNotification> {
        self.notifications.read().clone()
    }
}

#[async_trait]
impl PermissionStore for MemoryStore {
    async fn insert_if_absent(
        &self,
        permission: PayoutPermission,
    ) -> ClearanceResult<(PayoutPermission, bool)> {
        let mut permissions = self.permissions.write();
        if let Some(existing) = permissions.get(&permission.transaction_id) {
            return Ok((existing.clone(), false));
        }
        permissions.insert(permission.transaction_id, permission.clone());
        Ok((permission, true))
    }

    async fn find_by_transaction(
        &self,
        transaction_id: Uuid,
    ) -> ClearanceResult<Option<PayoutPermission>> {
        Ok(self.permissions.read().get(&transaction_id).cloned())
    }

    async fn find_by_id(
        &self,
        permission_id: Uuid,
    ) -> ClearanceResult<Option<PayoutPermission>> {
        Ok(self
            .permissions
            .read()
            .values()
            .find(|p| p.id == permission_id)
            .cloned())
    }

    async fn lock(
        &self,
        transaction_id: Uuid,
        return_request_id: Uuid,
        reason: &str,
        now: DateTime<Utc>,
        note: &str,
    ) -> ClearanceResult<Option<PayoutPermission>> {
        let mut permissions = self.permissions.write();
        let Some(p) = permissions.get_mut(&transaction_id) else {
            return Ok(None);
        };
        if !p.status.can_lock() {
            return Ok(None);
        }
        p.status = PermissionStatus::Locked;
        p.is_cleared = false;
        p.locked_at = Some(now);
        p.locked_reason = Some(reason.to_string());
        p.locked_by_return_request_id = Some(return_request_id);
        p.notes = append_note(&p.notes, note);
        p.updated_at = now;
        Ok(Some(p.clone()))
    }

    async fn unlock(
        &self,
        transaction_id: Uuid,
        return_request_id: Uuid,
        disposition: UnlockDisposition,
        now: DateTime<Utc>,
        note: &str,
    ) -> ClearanceResult<Option<PayoutPermission>> {
        let mut permissions = self.permissions.write();
        let Some(p) = permissions.get_mut(&transaction_id) else {
            return Ok(None);
        };
        if p.status != PermissionStatus::Locked
            || p.locked_by_return_request_id != Some(return_request_id)
        {
            return Ok(None);
        }
        p.locked_at = None;
        p.locked_reason = None;
        p.locked_by_return_request_id = None;
        match disposition {
            UnlockDisposition::Cleared => {
                p.status = PermissionStatus::Cleared;
                p.is_cleared = true;
                // cleared_at is write-once; a record that cleared before the
                // lock keeps its original timestamp.
                if p.cleared_at.is_none() {
                    p.cleared_at = Some(now);
                    p.cleared_by = Some("system".to_string());
                }
            }
            UnlockDisposition::Withheld => {
                p.status = PermissionStatus::Withheld;
                p.is_cleared = false;
                p.cleared_at = None;
                p.cleared_by = None;
            }
        }
        p.notes = append_note(&p.notes, note);
        p.updated_at = now;
        Ok(Some(p.clone()))
    }

    async fn block(
        &self,
        transaction_id: Uuid,
        command: BlockCommand,
        now: DateTime<Utc>,
        note: &str,
    ) -> ClearanceResult<Option<PayoutPermission>> {
        let mut permissions = self.permissions.write();
        let Some(p) = permissions.get_mut(&transaction_id) else {
            return Ok(None);
        };
        if !p.status.can_block() {
            return Ok(None);
        }
        p.status = PermissionStatus::Blocked;
        p.is_cleared = false;
        p.blocked_at = Some(now);
        p.blocked_reason = Some(command.reason);
        p.blocked_by = Some(command.blocked_by);
        p.debt_amount = command.debt_amount;
        p.debt_due_date = command.debt_due_date;
        p.debt_status = Some(command.debt_status);
        if command.zero_payout {
            p.payout_amount = 0;
        }
        p.notes = append_note(&p.notes, note);
        p.updated_at = now;
        Ok(Some(p.clone()))
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
        let mut permissions = self.permissions.write();
        let Some(p) = permissions.values_mut().find(|p| p.id == permission_id) else {
            return Ok(None);
        };
        if !p.status.can_reverse() {
            return Ok(None);
        }
        p.status = PermissionStatus::Blocked;
        p.is_cleared = false;
        p.blocked_at = Some(now);
        p.blocked_reason = Some(reason.to_string());
        p.blocked_by = Some(admin_id.to_string());
        p.debt_amount = p.payout_amount;
        p.debt_due_date = Some(debt_due_date);
        p.debt_status = Some(DebtStatus::Pending);
        p.notes = append_note(&p.notes, note);
        p.updated_at = now;
        Ok(Some(p.clone()))
    }

    async fn mark_paid(
        &self,
        transaction_id: Uuid,
        payout_reference: &str,
        paid_by: &str,
        now: DateTime<Utc>,
        note: &str,
    ) -> ClearanceResult<Option<PayoutPermission>> {
        let mut permissions = self.permissions.write();
        let Some(p) = permissions.get_mut(&transaction_id) else {
            return Ok(None);
        };
        if !p.status.can_mark_paid() {
            return Ok(None);
        }
        p.status = PermissionStatus::Paid;
        p.paid_at = Some(now);
        p.paid_by = Some(paid_by.to_string());
        p.payout_reference = Some(payout_reference.to_string());
        p.notes = append_note(&p.notes, note);
        p.updated_at = now;
        Ok(Some(p.clone()))
    }

    async fn sweep_clear_expired(
        &self,
        now: DateTime<Utc>,
        limit: i64,
    ) -> ClearanceResult<u64> {
        let mut permissions = self.permissions.write();
        let mut cleared = 0u64;
        for p in permissions.values_mut() {
            if cleared as i64 >= limit {
                break;
            }
            if p.status.can_sweep_clear() && p.grace_period_expires_at < now {
                p.status = PermissionStatus::Cleared;
                p.is_cleared = true;
                p.cleared_at = Some(now);
                p.cleared_by = Some("system".to_string());
                p.updated_at = now;
                cleared += 1;
            }
        }
        Ok(cleared)
    }

    async fn overdue_blocked(
        &self,
        cutoff: DateTime<Utc>,
        limit: i64,
    ) -> ClearanceResult<Vec<PayoutPermission>> {
        let permissions = self.permissions.read();
        let mut overdue: Vec<PayoutPermission> = permissions
            .values()
            .filter(|p| {
                p.status == PermissionStatus::Blocked
                    && p.debt_status.map_or(false, |d| d.is_outstanding())
                    && p.blocked_at.map_or(false, |at| at < cutoff)
            })
            .cloned()
            .collect();
        overdue.sort_by_key(|p| p.blocked_at);
        overdue.truncate(limit as usize);
        Ok(overdue)
    }

    async fn outstanding_blocked(
        &self,
        limit: i64,
    ) -> ClearanceResult<Vec<PayoutPermission>> {
        let permissions = self.permissions.read();
        let mut blocked: Vec<PayoutPermission> = permissions
            .values()
            .filter(|p| {
                p.status == PermissionStatus::Blocked
                    && p.debt_status.map_or(false, |d| d.is_outstanding())
            })
            .cloned()
            .collect();
        blocked.sort_by_key(|p| p.blocked_at);
        blocked.truncate(limit as usize);
        Ok(blocked)
    }

    async fn escalate_seller_debts(
        &self,
        seller_id: Uuid,
        now: DateTime<Utc>,
        note: &str,
    ) -> ClearanceResult<u64> {
        let mut permissions = self.permissions.write();
        let mut escalated = 0u64;
        for p in permissions.values_mut() {
            if p.seller_id == seller_id
                && p.status == PermissionStatus::Blocked
                && p.debt_status.map_or(false, |d| d.is_outstanding())
            {
                p.debt_status = Some(DebtStatus::Escalated);
                p.notes = append_note(&p.notes, note);
                p.updated_at = now;
                escalated += 1;
            }
        }
        Ok(escalated)
    }

    async fn cleared_for_partner(
        &self,
        seller_id: Option<Uuid>,
        limit: i64,
    ) -> ClearanceResult<Vec<PayoutPermission>> {
        let permissions = self.permissions.read();
        let mut cleared: Vec<PayoutPermission> = permissions
            .values()
            .filter(|p| p.status == PermissionStatus::Cleared && p.is_cleared)
            .filter(|p| seller_id.map_or(true, |id| p.seller_id == id))
            .cloned()
            .collect();
        cleared.sort_by_key(|p| p.cleared_at);
        cleared.truncate(limit as usize);
        Ok(cleared)
    }

    async fn payout_groups(
        &self,
        seller_id: Option<Uuid>,
    ) -> ClearanceResult<Vec<SellerPayoutGroup>> {
        let permissions = self.permissions.read();
        let mut groups: HashMap<Uuid, SellerPayoutGroup> = HashMap::new();
        for p in permissions
            .values()
            .filter(|p| p.status == PermissionStatus::Cleared)
            .filter(|p| seller_id.map_or(true, |id| p.seller_id == id))
        {
            let group = groups.entry(p.seller_id).or_insert(SellerPayoutGroup {
                seller_id: p.seller_id,
                cleared_count: 0,
                total_payout: 0,
                oldest_cleared_at: None,
            });
            group.cleared_count += 1;
            group.total_payout += p.payout_amount;
            group.oldest_cleared_at = match (group.oldest_cleared_at, p.cleared_at) {
                (Some(a), Some(b)) => Some(a.min(b)),
                (a, b) => a.or(b),
            };
        }
        let mut groups: Vec<SellerPayoutGroup> = groups.into_values().collect();
        groups.sort_by_key(|g| g.seller_id);
        Ok(groups)
    }

    async fn seller_history(
        &self,
        seller_id: Uuid,
        limit: i64,
    ) -> ClearanceResult<Vec<PayoutPermission>> {
        let permissions = self.permissions.read();
        let mut history: Vec<PayoutPermission> = permissions
            .values()
            .filter(|p| p.seller_id == seller_id)
            .cloned()
            .collect();
        history.sort_by(|a, b| b.delivered_at.cmp(&a.delivered_at));
        history.truncate(limit as usize);
        Ok(history)
    }
}

#[async_trait]
impl WalletLedger for MemoryStore {
    async fn entries_for_transaction(
        &self,
        transaction_id: Uuid,
    ) -> ClearanceResult<Vec<WalletEntry>> {
        Ok(self
            .wallet
            .read()
            .iter()
            .filter(|e| e.transaction_id == transaction_id)
            .cloned()
            .collect())
    }

    async fn mark_reversed(&self, entry_id: Uuid, _now: DateTime<Utc>) -> ClearanceResult<()> {
        let mut wallet = self.wallet.write();
        let entry = wallet
            .iter_mut()
            .find(|e| e.id == entry_id)
            .ok_or_else(|| ClearanceError::NotFound(format!("wallet entry {}", entry_id)))?;
        entry.status = WalletEntryStatus::Reversed;
        Ok(())
    }

    async fn append(&self, entry: WalletEntry) -> ClearanceResult<WalletEntry> {
        self.wallet.write().push(entry.clone());
        Ok(entry)
    }
}

#[async_trait]
impl AccountDirectory for MemoryStore {
    async fn find(&self, user_id: Uuid) -> ClearanceResult<Option<Account>> {
        Ok(self.accounts.read().get(&user_id).cloned())
    }

    async fn suspend(&self, user_id: Uuid) -> ClearanceResult<()> {
        let mut accounts = self.accounts.write();
        let account = accounts
            .get_mut(&user_id)
            .ok_or_else(|| ClearanceError::NotFound(format!("account {}", user_id)))?;
        account.is_active = false;
        Ok(())
    }

    async fn admins(&self) -> ClearanceResult<Vec<Account>> {
        let mut admins: Vec<Account> = self
            .accounts
            .read()
            .values()
            .filter(|a| a.is_admin)
            .cloned()
            .collect();
        admins.sort_by_key(|a| a.id);
        Ok(admins)
    }
}

#[async_trait]
impl Notifier for MemoryStore {
    async fn notify(&self, notification: NewNotification) -> ClearanceResult<()> {
        self.notifications.write().push(notification);
        Ok(())
    }
}
