//! The payout clearance engine
//!
//! All transitions run as guarded updates against the store; a guard miss is
//! re-read and classified instead of silently ignored. Wallet reversal and
//! notification dispatch happen after the transition commits and never roll
//! it back.

use std::sync::Arc;

use chrono::{DateTime, Duration, Utc};
use tracing::{debug, info, warn};
use uuid::Uuid;

use mazadpay_types::{
    clearance_days, ClearanceError, ClearanceResult, DebtStatus, PermissionStatus,
    DEFAULT_CURRENCY, MIN_GRACE_DAYS, REFUND_DEBT_DUE_DAYS, REVERSAL_DEBT_DUE_DAYS,
    SWEEP_BATCH_LIMIT,
};

use crate::model::{
    note_line, AdminPaidOutcome, DeliveredSale, NewNotification, PayoutPermission,
    ReturnOutcome, SellerPayoutGroup, SellerSummary, WalletEntry, WalletEntryStatus,
    WalletEntryType,
};
use crate::store::{
    AccountDirectory, BlockCommand, Notifier, PermissionStore, UnlockDisposition,
    WalletLedger,
};

/// The clearance engine. One instance per process; cheap to share via `Arc`.
pub struct ClearanceEngine {
    store: Arc<dyn PermissionStore>,
    wallet: Arc<dyn WalletLedger>,
    accounts: Arc<dyn AccountDirectory>,
    notifier: Arc<dyn Notifier>,
    /// Non-blocking gates so overlapping sweep runs skip instead of stacking.
    pub(crate) grace_gate: tokio::sync::Mutex<()>,
    pub(crate) debt_gate: tokio::sync::Mutex<()>,
}

impl ClearanceEngine {
    pub fn new(
        store: Arc<dyn PermissionStore>,
        wallet: Arc<dyn WalletLedger>,
        accounts: Arc<dyn AccountDirectory>,
        notifier: Arc<dyn Notifier>,
    ) -> Self {
        Self {
            store,
            wallet,
            accounts,
            notifier,
            grace_gate: tokio::sync::Mutex::new(()),
            debt_gate: tokio::sync::Mutex::new(()),
        }
    }

    pub(crate) fn accounts(&self) -> &dyn AccountDirectory {
        self.accounts.as_ref()
    }

    pub(crate) fn store(&self) -> &dyn PermissionStore {
        self.store.as_ref()
    }

    // ========================================================================
    // Transitions
    // ========================================================================

    /// Create the payout permission when a sale is delivered.
    ///
    /// Idempotent: a duplicate delivery event for a transaction that already
    /// has a permission is a logged no-op returning the existing record.
    pub async fn on_delivery(
        &self,
        sale: &DeliveredSale,
        now: DateTime<Utc>,
    ) -> ClearanceResult<PayoutPermission> {
        let window = clearance_days(sale.return_policy_days);
        let mut permission = PayoutPermission::from_delivery(sale, now);
        permission.notes = note_line(
            now,
            &format!(
                "Permission created on delivery. Clearance window: {} days (max of {} day return policy or {} day minimum)",
                window, sale.return_policy_days, MIN_GRACE_DAYS
            ),
        );

        let (stored, created) = self.store.insert_if_absent(permission).await?;
        if created {
            info!(
                transaction_id = %sale.transaction_id,
                seller_id = %sale.seller_id,
                payout_amount = stored.payout_amount,
                expires = %stored.grace_period_expires_at,
                "payout permission created"
            );
        } else {
            debug!(
                transaction_id = %sale.transaction_id,
                "duplicate delivery event ignored, permission exists"
            );
        }
        Ok(stored)
    }

    /// Lock the payout while a return request is open.
    pub async fn on_return_filed(
        &self,
        transaction_id: Uuid,
        return_request_id: Uuid,
        now: DateTime<Utc>,
    ) -> ClearanceResult<PayoutPermission> {
        let note = format!("Locked: return request {} filed by buyer", return_request_id);
        match self
            .store
            .lock(
                transaction_id,
                return_request_id,
                "Return request filed by buyer",
                now,
                &note_line(now, &note),
            )
            .await?
        {
            Some(permission) => {
                info!(
                    %transaction_id,
                    %return_request_id,
                    "payout permission locked for return"
                );
                Ok(permission)
            }
            None => Err(self
                .classify_miss(transaction_id, "on_return_filed", |s| s.can_lock())
                .await),
        }
    }

    /// Resolve the return request that holds the lock.
    ///
    /// A rejection unlocks; the grace window is re-evaluated against `now`
    /// because a long dispute can outlast it. A processed refund blocks with
    /// a debt.
    pub async fn on_return_resolved(
        &self,
        transaction_id: Uuid,
        return_request_id: Uuid,
        outcome: ReturnOutcome,
        now: DateTime<Utc>,
    ) -> ClearanceResult<PayoutPermission> {
        match outcome {
            ReturnOutcome::Refunded {
                admin_id,
                reason,
                refund_amount,
            } => {
                self.block_for_refund(transaction_id, admin_id, &reason, refund_amount, now)
                    .await
            }
            ReturnOutcome::RejectedBySeller { reason } => {
                let permission = self
                    .store
                    .find_by_transaction(transaction_id)
                    .await?
                    .ok_or_else(|| ClearanceError::not_found_transaction(transaction_id))?;

                let expired = now >= permission.grace_period_expires_at;
                let disposition = if expired {
                    UnlockDisposition::Cleared
                } else {
                    UnlockDisposition::Withheld
                };
                let note = format!(
                    "Unlocked: {}. Grace period {}",
                    reason,
                    if expired { "expired, cleared" } else { "still running, withheld" }
                );

                match self
                    .store
                    .unlock(
                        transaction_id,
                        return_request_id,
                        disposition,
                        now,
                        &note_line(now, &note),
                    )
                    .await?
                {
                    Some(permission) => {
                        info!(
                            %transaction_id,
                            status = %permission.status,
                            grace_expired = expired,
                            "payout permission unlocked"
                        );
                        Ok(permission)
                    }
                    None => Err(self.classify_unlock_miss(transaction_id, return_request_id).await),
                }
            }
        }
    }

    /// Block the payout permanently after an admin-processed refund.
    ///
    /// Creates a receivable: the seller owes the platform the refunded amount,
    /// due in 30 days. Any settlement previously written to the wallet ledger
    /// is reversed.
    pub async fn block_for_refund(
        &self,
        transaction_id: Uuid,
        admin_id: Uuid,
        reason: &str,
        refund_amount: i64,
        now: DateTime<Utc>,
    ) -> ClearanceResult<PayoutPermission> {
        let due = now + Duration::days(REFUND_DEBT_DUE_DAYS);
        let command = BlockCommand {
            blocked_by: admin_id.to_string(),
            reason: reason.to_string(),
            debt_amount: refund_amount,
            debt_due_date: Some(due),
            debt_status: DebtStatus::Pending,
            zero_payout: false,
        };
        let note = format!(
            "Blocked by admin {}: {}. Debt {} {} due {}",
            admin_id, reason, refund_amount, DEFAULT_CURRENCY, due
        );

        match self
            .store
            .block(transaction_id, command, now, &note_line(now, &note))
            .await?
        {
            Some(permission) => {
                info!(
                    %transaction_id,
                    seller_id = %permission.seller_id,
                    debt = refund_amount,
                    "payout permission blocked for refund"
                );
                self.reverse_settlement(
                    transaction_id,
                    WalletEntryType::ReturnReversal,
                    &format!("Refund reversal: {}", reason),
                    now,
                )
                .await;
                self.dispatch(NewNotification {
                    user_id: permission.seller_id,
                    kind: "payout_blocked".to_string(),
                    title: "Payout blocked".to_string(),
                    body: format!(
                        "A refund of {} {} was processed for one of your sales; the amount is now owed back to the platform.",
                        refund_amount, DEFAULT_CURRENCY
                    ),
                    link_url: Some("/seller-dashboard?tab=wallet".to_string()),
                    related_id: Some(transaction_id),
                })
                .await;
                Ok(permission)
            }
            None => Err(self
                .classify_miss(transaction_id, "block_for_refund", |s| s.can_block())
                .await),
        }
    }

    /// Zero-on-refusal guard: a buyer's refusal to accept delivery cancels
    /// the sale with no payout and no debt. Never flows through the debt
    /// path, and any pending earnings in the wallet ledger are reversed so
    /// no positive pending balance survives.
    pub async fn block_for_buyer_refusal(
        &self,
        transaction_id: Uuid,
        reason: &str,
        now: DateTime<Utc>,
    ) -> ClearanceResult<PayoutPermission> {
        let command = BlockCommand {
            blocked_by: "system".to_string(),
            reason: format!("Buyer refused delivery: {}", reason),
            debt_amount: 0,
            debt_due_date: None,
            debt_status: DebtStatus::Resolved,
            zero_payout: true,
        };
        let note = format!(
            "Zero-on-refusal block: {}. Payout 0, commission 0, debt 0.",
            reason
        );

        match self
            .store
            .block(transaction_id, command, now, &note_line(now, &note))
            .await?
        {
            Some(permission) => {
                info!(
                    %transaction_id,
                    seller_id = %permission.seller_id,
                    "payout permission blocked, buyer refused delivery"
                );
                self.reverse_settlement(
                    transaction_id,
                    WalletEntryType::ReturnReversal,
                    &format!("Delivery refused by buyer: {}", reason),
                    now,
                )
                .await;
                self.dispatch(NewNotification {
                    user_id: permission.seller_id,
                    kind: "sale_cancelled".to_string(),
                    title: "Sale cancelled".to_string(),
                    body: "The buyer refused delivery; the sale was cancelled with no payout and no debt.".to_string(),
                    link_url: Some("/seller-dashboard?tab=orders".to_string()),
                    related_id: Some(transaction_id),
                })
                .await;
                Ok(permission)
            }
            None => Err(self
                .classify_miss(transaction_id, "block_for_buyer_refusal", |s| s.can_block())
                .await),
        }
    }

    /// Batch-clear withheld permissions whose grace period has expired.
    ///
    /// Idempotent and bounded; an overlapping in-process run skips and
    /// returns 0. Returns the number of records transitioned.
    pub async fn sweep_expired_grace_periods(&self, now: DateTime<Utc>) -> ClearanceResult<u64> {
        let _guard = match self.grace_gate.try_lock() {
            Ok(guard) => guard,
            Err(_) => {
                warn!("grace period sweep already running, skipping");
                return Ok(0);
            }
        };

        let cleared = self.store.sweep_clear_expired(now, SWEEP_BATCH_LIMIT).await?;
        if cleared > 0 {
            info!(cleared, "expired grace periods swept to cleared");
        } else {
            debug!("no expired grace periods to clear");
        }
        Ok(cleared)
    }

    /// Confirm disbursement. Valid only from `cleared`; anything else fails
    /// loudly so double-payout attempts surface instead of hiding.
    pub async fn mark_paid(
        &self,
        transaction_id: Uuid,
        payout_reference: &str,
        paid_by: &str,
        now: DateTime<Utc>,
    ) -> ClearanceResult<PayoutPermission> {
        let note = format!("Paid: reference {} confirmed by {}", payout_reference, paid_by);
        match self
            .store
            .mark_paid(
                transaction_id,
                payout_reference,
                paid_by,
                now,
                &note_line(now, &note),
            )
            .await?
        {
            Some(permission) => {
                info!(
                    %transaction_id,
                    payout_reference,
                    paid_by,
                    "payout confirmed"
                );
                Ok(permission)
            }
            None => Err(self
                .classify_miss(transaction_id, "mark_paid", |s| s.can_mark_paid())
                .await),
        }
    }

    /// Manual admin override of a cleared or withheld payout.
    ///
    /// The full payout amount becomes a debt with a 5-day due date, shorter
    /// than the refund path's 30: a reversal overrides an already-favorable
    /// state. Available wallet balance is netted out with an offsetting
    /// entry; the original entries are marked reversed, never deleted.
    pub async fn admin_reverse(
        &self,
        permission_id: Uuid,
        admin_id: Uuid,
        reason: &str,
        now: DateTime<Utc>,
    ) -> ClearanceResult<PayoutPermission> {
        let due = now + Duration::days(REVERSAL_DEBT_DUE_DAYS);
        let note = format!(
            "Reversed by admin {}: {}. Full payout owed back, due {}",
            admin_id, reason, due
        );

        match self
            .store
            .reverse(permission_id, admin_id, reason, due, now, &note_line(now, &note))
            .await?
        {
            Some(permission) => {
                info!(
                    %permission_id,
                    transaction_id = %permission.transaction_id,
                    debt = permission.debt_amount,
                    "payout permission reversed by admin"
                );
                self.reverse_settlement(
                    permission.transaction_id,
                    WalletEntryType::AdminReversal,
                    &format!("Admin reversal: {}", reason),
                    now,
                )
                .await;
                self.dispatch(NewNotification {
                    user_id: permission.seller_id,
                    kind: "payout_reversed".to_string(),
                    title: "Payout reversed".to_string(),
                    body: format!(
                        "A payout of {} {} was reversed by an administrator: {}",
                        permission.debt_amount, DEFAULT_CURRENCY, reason
                    ),
                    link_url: Some("/seller-dashboard?tab=wallet".to_string()),
                    related_id: Some(permission.transaction_id),
                })
                .await;
                Ok(permission)
            }
            None => match self.store.find_by_id(permission_id).await {
                Ok(None) => Err(ClearanceError::not_found_permission(permission_id)),
                Ok(Some(p)) if p.status.can_reverse() => Err(ClearanceError::ConcurrentModification {
                    transaction_id: p.transaction_id,
                }),
                Ok(Some(p)) => Err(ClearanceError::InvalidTransition {
                    from: p.status,
                    operation: "admin_reverse",
                }),
                Err(err) => Err(err),
            },
        }
    }

    /// Bulk reconciliation: mark a batch of cleared permissions paid.
    /// Per-item outcomes; one failure never aborts the rest of the batch.
    pub async fn admin_mark_paid(
        &self,
        permission_ids: &[Uuid],
        admin_id: Uuid,
        method: &str,
        reference: Option<&str>,
        now: DateTime<Utc>,
    ) -> ClearanceResult<Vec<AdminPaidOutcome>> {
        let mut outcomes = Vec::with_capacity(permission_ids.len());
        for &permission_id in permission_ids {
            let outcome = match self.store.find_by_id(permission_id).await {
                Ok(Some(permission)) => {
                    let payout_reference = reference
                        .map(str::to_string)
                        .unwrap_or_else(|| format!("{}:{}", method, permission.id));
                    match self
                        .mark_paid(
                            permission.transaction_id,
                            &payout_reference,
                            &admin_id.to_string(),
                            now,
                        )
                        .await
                    {
                        Ok(_) => AdminPaidOutcome {
                            permission_id,
                            paid: true,
                            error: None,
                        },
                        Err(err) => AdminPaidOutcome {
                            permission_id,
                            paid: false,
                            error: Some(err.to_string()),
                        },
                    }
                }
                Ok(None) => AdminPaidOutcome {
                    permission_id,
                    paid: false,
                    error: Some(format!("permission {} not found", permission_id)),
                },
                Err(err) => AdminPaidOutcome {
                    permission_id,
                    paid: false,
                    error: Some(err.to_string()),
                },
            };
            if let Some(error) = &outcome.error {
                warn!(%permission_id, error = %error, "admin mark-paid item failed");
            }
            outcomes.push(outcome);
        }
        Ok(outcomes)
    }

    // ========================================================================
    // Read views
    // ========================================================================

    /// Cleared payouts for the delivery partner, oldest clearance first.
    pub async fn cleared_payouts_for_partner(
        &self,
        seller_id: Option<Uuid>,
        limit: i64,
    ) -> ClearanceResult<Vec<PayoutPermission>> {
        let limit = limit.clamp(1, SWEEP_BATCH_LIMIT);
        self.store.cleared_for_partner(seller_id, limit).await
    }

    /// Single-record status lookup for the partner API.
    pub async fn payout_status(
        &self,
        transaction_id: Uuid,
    ) -> ClearanceResult<PayoutPermission> {
        self.store
            .find_by_transaction(transaction_id)
            .await?
            .ok_or_else(|| ClearanceError::not_found_transaction(transaction_id))
    }

    /// Lookup by permission id for the admin surface.
    pub async fn permission(&self, permission_id: Uuid) -> ClearanceResult<PayoutPermission> {
        self.store
            .find_by_id(permission_id)
            .await?
            .ok_or_else(|| ClearanceError::not_found_permission(permission_id))
    }

    /// Cleared payouts grouped by seller for admin reconciliation.
    pub async fn admin_payout_groups(
        &self,
        seller_id: Option<Uuid>,
    ) -> ClearanceResult<Vec<SellerPayoutGroup>> {
        self.store.payout_groups(seller_id).await
    }

    /// Full history for the seller dashboard, newest delivery first.
    pub async fn seller_payout_history(
        &self,
        seller_id: Uuid,
        limit: i64,
    ) -> ClearanceResult<Vec<PayoutPermission>> {
        let limit = limit.clamp(1, SWEEP_BATCH_LIMIT);
        self.store.seller_history(seller_id, limit).await
    }

    /// Per-seller clearance summary for the partner API.
    pub async fn seller_summary(&self, seller_id: Uuid) -> ClearanceResult<SellerSummary> {
        let seller = self
            .accounts
            .find(seller_id)
            .await?
            .ok_or_else(|| ClearanceError::NotFound(format!("seller {}", seller_id)))?;

        let permissions = self
            .store
            .seller_history(seller_id, SWEEP_BATCH_LIMIT)
            .await?;

        let count = |status: PermissionStatus| {
            permissions.iter().filter(|p| p.status == status).count()
        };
        let total_cleared_amount = permissions
            .iter()
            .filter(|p| p.status == PermissionStatus::Cleared)
            .map(|p| p.payout_amount)
            .sum();
        let total_debt = permissions.iter().map(|p| p.outstanding_debt()).sum();

        Ok(SellerSummary {
            total_permissions: permissions.len(),
            withheld: count(PermissionStatus::Withheld),
            locked: count(PermissionStatus::Locked),
            cleared: count(PermissionStatus::Cleared),
            blocked: count(PermissionStatus::Blocked),
            paid: count(PermissionStatus::Paid),
            total_cleared_amount,
            total_debt,
            seller,
            permissions,
        })
    }

    // ========================================================================
    // Internals
    // ========================================================================

    /// Re-read after a guard miss and decide what actually happened.
    async fn classify_miss(
        &self,
        transaction_id: Uuid,
        operation: &'static str,
        allowed: impl Fn(PermissionStatus) -> bool,
    ) -> ClearanceError {
        match self.store.find_by_transaction(transaction_id).await {
            Ok(None) => ClearanceError::not_found_transaction(transaction_id),
            Ok(Some(p)) if allowed(p.status) => {
                // The guard would match now, so another transition raced us
                // in between and has since moved the record back.
                ClearanceError::ConcurrentModification { transaction_id }
            }
            Ok(Some(p)) => ClearanceError::InvalidTransition {
                from: p.status,
                operation,
            },
            Err(err) => err,
        }
    }

    async fn classify_unlock_miss(
        &self,
        transaction_id: Uuid,
        return_request_id: Uuid,
    ) -> ClearanceError {
        match self.store.find_by_transaction(transaction_id).await {
            Ok(None) => ClearanceError::not_found_transaction(transaction_id),
            Ok(Some(p))
                if p.status == PermissionStatus::Locked
                    && p.locked_by_return_request_id != Some(return_request_id) =>
            {
                ClearanceError::InvalidTransition {
                    from: p.status,
                    operation: "unlock by non-owning return request",
                }
            }
            Ok(Some(p)) if p.status.can_unlock() => {
                ClearanceError::ConcurrentModification { transaction_id }
            }
            Ok(Some(p)) => ClearanceError::InvalidTransition {
                from: p.status,
                operation: "on_return_resolved",
            },
            Err(err) => err,
        }
    }

    /// Reverse the transaction's wallet entries: unpaid entries flip to
    /// reversed, already-paid entries get an offsetting negative entry.
    /// Best-effort; a settlement may legitimately not exist yet.
    async fn reverse_settlement(
        &self,
        transaction_id: Uuid,
        entry_type: WalletEntryType,
        description: &str,
        now: DateTime<Utc>,
    ) {
        let entries = match self.wallet.entries_for_transaction(transaction_id).await {
            Ok(entries) => entries,
            Err(err) => {
                warn!(%transaction_id, error = %err, "failed to load wallet entries for reversal");
                return;
            }
        };

        for entry in entries {
            // Reversal entries and already-reversed rows stay untouched so a
            // repeated block does not double-negate.
            if entry.status == WalletEntryStatus::Reversed
                || matches!(
                    entry.entry_type,
                    WalletEntryType::ReturnReversal | WalletEntryType::AdminReversal
                )
            {
                continue;
            }

            let result = if entry.status == WalletEntryStatus::Paid {
                self.wallet
                    .append(WalletEntry::offsetting(
                        &entry,
                        entry_type,
                        description.to_string(),
                        now,
                    ))
                    .await
                    .map(|_| ())
            } else {
                self.wallet.mark_reversed(entry.id, now).await
            };

            if let Err(err) = result {
                warn!(
                    %transaction_id,
                    entry_id = %entry.id,
                    error = %err,
                    "wallet reversal failed"
                );
            }
        }
    }

    /// Fire-and-forget notification dispatch.
    pub(crate) async fn dispatch(&self, notification: NewNotification) {
        let user_id = notification.user_id;
        if let Err(err) = self.notifier.notify(notification).await {
            warn!(%user_id, error = %err, "notification dispatch failed");
        }
    }
}
