//! Clearance engine scenarios against the in-memory store

use std::sync::Arc;

use chrono::{DateTime, Duration, TimeZone, Utc};
use uuid::Uuid;

use mazadpay_clearing::{
    Account, AccountDirectory, ClearanceEngine, DeliveredSale, MemoryStore, ReturnOutcome,
    WalletEntry, WalletEntryStatus, WalletEntryType,
};
use mazadpay_types::{ClearanceError, DebtStatus, PermissionStatus, HIGH_DEBT_THRESHOLD};

fn setup() -> (Arc<MemoryStore>, ClearanceEngine) {
    let store = Arc::new(MemoryStore::new());
    let engine = ClearanceEngine::new(
        store.clone(),
        store.clone(),
        store.clone(),
        store.clone(),
    );
    (store, engine)
}

fn sale(delivered_at: DateTime<Utc>, return_policy_days: i32) -> DeliveredSale {
    DeliveredSale {
        transaction_id: Uuid::new_v4(),
        listing_id: Uuid::new_v4(),
        seller_id: Uuid::new_v4(),
        buyer_id: Uuid::new_v4(),
        amount: 250_000,
        platform_commission: 0,
        return_policy_days,
        delivered_at,
    }
}

fn active_seller(id: Uuid) -> Account {
    Account {
        id,
        display_name: "Test Seller".to_string(),
        phone: Some("07901234567".to_string()),
        is_active: true,
        is_admin: false,
    }
}

fn admin(id: Uuid) -> Account {
    Account {
        id,
        display_name: "Admin".to_string(),
        phone: None,
        is_active: true,
        is_admin: true,
    }
}

fn pending_earning(sale: &DeliveredSale, now: DateTime<Utc>) -> WalletEntry {
    WalletEntry {
        id: Uuid::new_v4(),
        seller_id: sale.seller_id,
        transaction_id: sale.transaction_id,
        entry_type: WalletEntryType::SaleEarning,
        amount: sale.amount,
        description: "Sale earning".to_string(),
        status: WalletEntryStatus::Pending,
        hold_until: Some(now + Duration::days(2)),
        available_at: None,
        created_at: now,
    }
}

fn jan(day: u32) -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2026, 1, day, 0, 0, 0).unwrap()
}

// ============================================================================
// End-to-end lifecycle
// ============================================================================

#[tokio::test]
async fn delivered_sale_clears_after_grace_and_pays_once() {
    let (_, engine) = setup();
    let sale = sale(jan(1), 3);

    let permission = engine.on_delivery(&sale, jan(1)).await.unwrap();
    assert_eq!(permission.status, PermissionStatus::Withheld);
    assert_eq!(permission.grace_period_expires_at, jan(4));

    // Grace still running on Jan 3: nothing to sweep.
    assert_eq!(engine.sweep_expired_grace_periods(jan(3)).await.unwrap(), 0);
    let status = engine.payout_status(sale.transaction_id).await.unwrap();
    assert_eq!(status.status, PermissionStatus::Withheld);

    // Expired by Jan 5: exactly one record clears.
    assert_eq!(engine.sweep_expired_grace_periods(jan(5)).await.unwrap(), 1);
    let status = engine.payout_status(sale.transaction_id).await.unwrap();
    assert_eq!(status.status, PermissionStatus::Cleared);
    assert_eq!(status.cleared_by.as_deref(), Some("system"));
    assert!(status.is_cleared);

    // Partner confirms the disbursement.
    let paid = engine
        .mark_paid(sale.transaction_id, "BANK-123", "delivery_partner", jan(6))
        .await
        .unwrap();
    assert_eq!(paid.status, PermissionStatus::Paid);
    assert_eq!(paid.payout_reference.as_deref(), Some("BANK-123"));
    assert_eq!(paid.paid_at, Some(jan(6)));

    // A second confirmation fails loudly and overwrites nothing.
    let err = engine
        .mark_paid(sale.transaction_id, "BANK-999", "delivery_partner", jan(7))
        .await
        .unwrap_err();
    assert!(matches!(err, ClearanceError::InvalidTransition { .. }));

    let status = engine.payout_status(sale.transaction_id).await.unwrap();
    assert_eq!(status.payout_reference.as_deref(), Some("BANK-123"));
    assert_eq!(status.paid_at, Some(jan(6)));
}

#[tokio::test]
async fn duplicate_delivery_event_is_a_noop() {
    let (_, engine) = setup();
    let sale = sale(jan(1), 7);

    let first = engine.on_delivery(&sale, jan(1)).await.unwrap();
    let second = engine.on_delivery(&sale, jan(2)).await.unwrap();

    assert_eq!(first.id, second.id);
    assert_eq!(second.created_at, jan(1));
}

#[tokio::test]
async fn sweep_is_idempotent() {
    let (_, engine) = setup();
    engine.on_delivery(&sale(jan(1), 2), jan(1)).await.unwrap();
    engine.on_delivery(&sale(jan(1), 3), jan(1)).await.unwrap();
    engine.on_delivery(&sale(jan(1), 14), jan(1)).await.unwrap();

    // Two of three have expired by Jan 6.
    assert_eq!(engine.sweep_expired_grace_periods(jan(6)).await.unwrap(), 2);
    // Immediate second run finds nothing left.
    assert_eq!(engine.sweep_expired_grace_periods(jan(6)).await.unwrap(), 0);
}

// ============================================================================
// Returns and disputes
// ============================================================================

#[tokio::test]
async fn return_filed_locks_withheld_permission() {
    let (_, engine) = setup();
    let sale = sale(jan(1), 7);
    engine.on_delivery(&sale, jan(1)).await.unwrap();

    let return_request_id = Uuid::new_v4();
    let locked = engine
        .on_return_filed(sale.transaction_id, return_request_id, jan(2))
        .await
        .unwrap();
    assert_eq!(locked.status, PermissionStatus::Locked);
    assert_eq!(locked.locked_by_return_request_id, Some(return_request_id));
    assert_eq!(locked.locked_at, Some(jan(2)));
}

#[tokio::test]
async fn return_filed_after_clearance_still_locks() {
    let (_, engine) = setup();
    let sale = sale(jan(1), 2);
    engine.on_delivery(&sale, jan(1)).await.unwrap();
    engine.sweep_expired_grace_periods(jan(4)).await.unwrap();

    let locked = engine
        .on_return_filed(sale.transaction_id, Uuid::new_v4(), jan(5))
        .await
        .unwrap();
    assert_eq!(locked.status, PermissionStatus::Locked);
    assert!(!locked.is_cleared);
}

#[tokio::test]
async fn return_filed_without_permission_surfaces_not_found() {
    let (_, engine) = setup();
    let err = engine
        .on_return_filed(Uuid::new_v4(), Uuid::new_v4(), jan(1))
        .await
        .unwrap_err();
    assert!(matches!(err, ClearanceError::NotFound(_)));
}

#[tokio::test]
async fn unlock_reevaluates_grace_against_now() {
    let (_, engine) = setup();
    // Grace runs Jan 1 -> Jan 3; the dispute outlasts it.
    let sale = sale(jan(1), 2);
    engine.on_delivery(&sale, jan(1)).await.unwrap();

    let return_request_id = Uuid::new_v4();
    engine
        .on_return_filed(sale.transaction_id, return_request_id, jan(2))
        .await
        .unwrap();

    let unlocked = engine
        .on_return_resolved(
            sale.transaction_id,
            return_request_id,
            ReturnOutcome::RejectedBySeller {
                reason: "Seller rejected the return".to_string(),
            },
            jan(5),
        )
        .await
        .unwrap();

    assert_eq!(unlocked.status, PermissionStatus::Cleared);
    assert_eq!(unlocked.cleared_by.as_deref(), Some("system"));
    assert_eq!(unlocked.cleared_at, Some(jan(5)));
    assert_eq!(unlocked.locked_by_return_request_id, None);
}

#[tokio::test]
async fn unlock_before_expiry_returns_to_withheld() {
    let (_, engine) = setup();
    let sale = sale(jan(1), 14);
    engine.on_delivery(&sale, jan(1)).await.unwrap();

    let return_request_id = Uuid::new_v4();
    engine
        .on_return_filed(sale.transaction_id, return_request_id, jan(2))
        .await
        .unwrap();

    let unlocked = engine
        .on_return_resolved(
            sale.transaction_id,
            return_request_id,
            ReturnOutcome::RejectedBySeller {
                reason: "Rejected".to_string(),
            },
            jan(3),
        )
        .await
        .unwrap();

    assert_eq!(unlocked.status, PermissionStatus::Withheld);
    assert!(!unlocked.is_cleared);
    assert_eq!(unlocked.cleared_at, None);
}

#[tokio::test]
async fn only_owning_return_request_unlocks() {
    let (_, engine) = setup();
    let sale = sale(jan(1), 7);
    engine.on_delivery(&sale, jan(1)).await.unwrap();

    let owner = Uuid::new_v4();
    engine
        .on_return_filed(sale.transaction_id, owner, jan(2))
        .await
        .unwrap();

    let err = engine
        .on_return_resolved(
            sale.transaction_id,
            Uuid::new_v4(),
            ReturnOutcome::RejectedBySeller {
                reason: "Rejected".to_string(),
            },
            jan(3),
        )
        .await
        .unwrap_err();
    assert!(matches!(err, ClearanceError::InvalidTransition { .. }));

    let status = engine.payout_status(sale.transaction_id).await.unwrap();
    assert_eq!(status.status, PermissionStatus::Locked);
}

// ============================================================================
// Blocking: refunds, refusals, reversals
// ============================================================================

#[tokio::test]
async fn refund_blocks_with_thirty_day_debt_and_reverses_settlement() {
    let (store, engine) = setup();
    let sale = sale(jan(1), 7);
    engine.on_delivery(&sale, jan(1)).await.unwrap();
    store.seed_wallet_entry(pending_earning(&sale, jan(1)));

    let return_request_id = Uuid::new_v4();
    engine
        .on_return_filed(sale.transaction_id, return_request_id, jan(2))
        .await
        .unwrap();

    let admin_id = Uuid::new_v4();
    let blocked = engine
        .on_return_resolved(
            sale.transaction_id,
            return_request_id,
            ReturnOutcome::Refunded {
                admin_id,
                reason: "Item not as described".to_string(),
                refund_amount: sale.amount,
            },
            jan(3),
        )
        .await
        .unwrap();

    assert_eq!(blocked.status, PermissionStatus::Blocked);
    assert_eq!(blocked.debt_amount, sale.amount);
    assert_eq!(blocked.debt_status, Some(DebtStatus::Pending));
    assert_eq!(blocked.debt_due_date, Some(jan(3) + Duration::days(30)));
    assert_eq!(blocked.blocked_by.as_deref(), Some(admin_id.to_string().as_str()));

    // The pending earning was reversed, not deleted.
    let entries = store.wallet_entries();
    assert_eq!(entries.len(), 1);
    assert_eq!(entries[0].status, WalletEntryStatus::Reversed);

    // The seller was told, best-effort.
    let notes: Vec<_> = store
        .notifications()
        .into_iter()
        .filter(|n| n.kind == "payout_blocked")
        .collect();
    assert_eq!(notes.len(), 1);
    assert_eq!(notes[0].user_id, sale.seller_id);
}

#[tokio::test]
async fn buyer_refusal_zeroes_everything() {
    let (store, engine) = setup();
    let mut sale = sale(jan(1), 7);
    sale.platform_commission = 20_000;
    engine.on_delivery(&sale, jan(1)).await.unwrap();
    store.seed_wallet_entry(pending_earning(&sale, jan(1)));

    let blocked = engine
        .block_for_buyer_refusal(sale.transaction_id, "Refused at the door", jan(2))
        .await
        .unwrap();

    assert_eq!(blocked.status, PermissionStatus::Blocked);
    assert_eq!(blocked.payout_amount, 0);
    assert_eq!(blocked.debt_amount, 0);
    assert_eq!(blocked.debt_status, Some(DebtStatus::Resolved));
    assert_eq!(blocked.blocked_by.as_deref(), Some("system"));
    // Resolved debt makes the record terminal.
    assert!(blocked.is_terminal());

    // No positive pending balance survives the refusal.
    let pending_total: i64 = store
        .wallet_entries()
        .iter()
        .filter(|e| e.status == WalletEntryStatus::Pending)
        .map(|e| e.amount)
        .sum();
    assert_eq!(pending_total, 0);
}

#[tokio::test]
async fn refusal_never_creates_debt_regardless_of_amount() {
    let (_, engine) = setup();
    let mut big = sale(jan(1), 7);
    big.amount = 9_000_000;
    engine.on_delivery(&big, jan(1)).await.unwrap();

    let blocked = engine
        .block_for_buyer_refusal(big.transaction_id, "Refused", jan(2))
        .await
        .unwrap();
    assert_eq!(blocked.payout_amount, 0);
    assert_eq!(blocked.debt_amount, 0);
    assert_eq!(blocked.debt_status, Some(DebtStatus::Resolved));
}

#[tokio::test]
async fn blocking_an_already_blocked_record_fails() {
    let (_, engine) = setup();
    let sale = sale(jan(1), 7);
    engine.on_delivery(&sale, jan(1)).await.unwrap();
    engine
        .block_for_buyer_refusal(sale.transaction_id, "Refused", jan(2))
        .await
        .unwrap();

    let err = engine
        .block_for_refund(sale.transaction_id, Uuid::new_v4(), "Refund", 1000, jan(3))
        .await
        .unwrap_err();
    assert!(matches!(
        err,
        ClearanceError::InvalidTransition {
            from: PermissionStatus::Blocked,
            ..
        }
    ));
}

#[tokio::test]
async fn mark_paid_from_withheld_fails_loudly() {
    let (_, engine) = setup();
    let sale = sale(jan(1), 7);
    engine.on_delivery(&sale, jan(1)).await.unwrap();

    let err = engine
        .mark_paid(sale.transaction_id, "REF", "partner", jan(2))
        .await
        .unwrap_err();
    assert!(matches!(
        err,
        ClearanceError::InvalidTransition {
            from: PermissionStatus::Withheld,
            operation: "mark_paid",
        }
    ));
}

#[tokio::test]
async fn admin_reverse_creates_five_day_debt_and_offsets_wallet() {
    let (store, engine) = setup();
    let sale = sale(jan(1), 2);
    let permission = engine.on_delivery(&sale, jan(1)).await.unwrap();
    engine.sweep_expired_grace_periods(jan(4)).await.unwrap();

    // Earnings already paid out to the seller's wallet.
    let mut paid_entry = pending_earning(&sale, jan(1));
    paid_entry.status = WalletEntryStatus::Paid;
    store.seed_wallet_entry(paid_entry);

    let admin_id = Uuid::new_v4();
    let reversed = engine
        .admin_reverse(permission.id, admin_id, "Fraud investigation", jan(5))
        .await
        .unwrap();

    assert_eq!(reversed.status, PermissionStatus::Blocked);
    assert_eq!(reversed.debt_amount, permission.payout_amount);
    assert_eq!(reversed.debt_status, Some(DebtStatus::Pending));
    // Reversal debt is due in 5 days, not the refund path's 30.
    assert_eq!(reversed.debt_due_date, Some(jan(5) + Duration::days(5)));

    // Paid balance is netted out by an offsetting entry; the original row
    // survives for audit.
    let entries = store.wallet_entries();
    assert_eq!(entries.len(), 2);
    assert_eq!(entries[0].status, WalletEntryStatus::Paid);
    assert_eq!(entries[1].entry_type, WalletEntryType::AdminReversal);
    assert_eq!(entries[1].amount, -sale.amount);
    let net: i64 = entries
        .iter()
        .filter(|e| e.status != WalletEntryStatus::Reversed)
        .map(|e| e.amount)
        .sum();
    assert_eq!(net, 0);
}

#[tokio::test]
async fn admin_reverse_rejects_paid_records() {
    let (_, engine) = setup();
    let sale = sale(jan(1), 2);
    let permission = engine.on_delivery(&sale, jan(1)).await.unwrap();
    engine.sweep_expired_grace_periods(jan(4)).await.unwrap();
    engine
        .mark_paid(sale.transaction_id, "REF", "partner", jan(5))
        .await
        .unwrap();

    let err = engine
        .admin_reverse(permission.id, Uuid::new_v4(), "Too late", jan(6))
        .await
        .unwrap_err();
    assert!(matches!(
        err,
        ClearanceError::InvalidTransition {
            from: PermissionStatus::Paid,
            ..
        }
    ));
}

// ============================================================================
// Debt enforcement
// ============================================================================

#[tokio::test]
async fn six_day_old_debt_suspends_but_four_day_old_does_not() {
    let (store, engine) = setup();
    let now = jan(20);
    let admin_account = admin(Uuid::new_v4());
    store.seed_account(admin_account.clone());

    // Seller A: blocked 6 days ago.
    let sale_a = sale(jan(1), 2);
    store.seed_account(active_seller(sale_a.seller_id));
    engine.on_delivery(&sale_a, jan(1)).await.unwrap();
    engine
        .block_for_refund(sale_a.transaction_id, Uuid::new_v4(), "Refund", 80_000, now - Duration::days(6))
        .await
        .unwrap();

    // Seller B: blocked 4 days ago.
    let sale_b = sale(jan(1), 2);
    store.seed_account(active_seller(sale_b.seller_id));
    engine.on_delivery(&sale_b, jan(1)).await.unwrap();
    engine
        .block_for_refund(sale_b.transaction_id, Uuid::new_v4(), "Refund", 50_000, now - Duration::days(4))
        .await
        .unwrap();

    let suspended = engine.enforce_debt_suspensions(now).await.unwrap();
    assert_eq!(suspended, 1);

    let seller_a = store.find(sale_a.seller_id).await.unwrap().unwrap();
    assert!(!seller_a.is_active);
    let seller_b = store.find(sale_b.seller_id).await.unwrap().unwrap();
    assert!(seller_b.is_active);

    // A's debt escalated; B's untouched.
    let a = engine.payout_status(sale_a.transaction_id).await.unwrap();
    assert_eq!(a.debt_status, Some(DebtStatus::Escalated));
    let b = engine.payout_status(sale_b.transaction_id).await.unwrap();
    assert_eq!(b.debt_status, Some(DebtStatus::Pending));

    let suspension_notes: Vec<_> = store
        .notifications()
        .into_iter()
        .filter(|n| n.kind == "admin_debt_suspension")
        .collect();
    assert_eq!(suspension_notes.len(), 1);
    assert_eq!(suspension_notes[0].user_id, admin_account.id);
}

#[tokio::test]
async fn already_suspended_sellers_are_not_renotified() {
    let (store, engine) = setup();
    let now = jan(20);
    store.seed_account(admin(Uuid::new_v4()));

    let sale = sale(jan(1), 2);
    store.seed_account(active_seller(sale.seller_id));
    engine.on_delivery(&sale, jan(1)).await.unwrap();
    engine
        .block_for_refund(sale.transaction_id, Uuid::new_v4(), "Refund", 80_000, now - Duration::days(6))
        .await
        .unwrap();

    assert_eq!(engine.enforce_debt_suspensions(now).await.unwrap(), 1);
    let first_run = store
        .notifications()
        .iter()
        .filter(|n| n.kind == "admin_debt_suspension")
        .count();

    assert_eq!(engine.enforce_debt_suspensions(now).await.unwrap(), 0);
    let second_run = store
        .notifications()
        .iter()
        .filter(|n| n.kind == "admin_debt_suspension")
        .count();
    assert_eq!(first_run, second_run);
}

#[tokio::test]
async fn high_debt_alert_respects_threshold() {
    let (store, engine) = setup();
    let now = jan(10);
    let admin_account = admin(Uuid::new_v4());
    store.seed_account(admin_account.clone());

    // Over the threshold.
    let heavy = sale(jan(1), 2);
    store.seed_account(active_seller(heavy.seller_id));
    engine.on_delivery(&heavy, jan(1)).await.unwrap();
    engine
        .block_for_refund(heavy.transaction_id, Uuid::new_v4(), "Refund", 150_000, jan(2))
        .await
        .unwrap();

    // Under the threshold.
    let light = sale(jan(1), 2);
    store.seed_account(active_seller(light.seller_id));
    engine.on_delivery(&light, jan(1)).await.unwrap();
    engine
        .block_for_refund(light.transaction_id, Uuid::new_v4(), "Refund", 50_000, jan(2))
        .await
        .unwrap();

    let alerts = engine.high_debt_alert(now, HIGH_DEBT_THRESHOLD).await.unwrap();
    assert_eq!(alerts, 1);

    let alert_notes: Vec<_> = store
        .notifications()
        .into_iter()
        .filter(|n| n.kind == "admin_high_debt_alert")
        .collect();
    assert_eq!(alert_notes.len(), 1);
    assert_eq!(alert_notes[0].related_id, Some(heavy.seller_id));

    // Observational only: nothing was suspended or escalated.
    let seller = store.find(heavy.seller_id).await.unwrap().unwrap();
    assert!(seller.is_active);
    let record = engine.payout_status(heavy.transaction_id).await.unwrap();
    assert_eq!(record.debt_status, Some(DebtStatus::Pending));
}

// ============================================================================
// Read views and bulk admin operations
// ============================================================================

#[tokio::test]
async fn partner_manifest_is_fifo_by_clearance() {
    let (_, engine) = setup();

    let first = sale(jan(1), 2);
    let second = sale(jan(3), 2);
    engine.on_delivery(&first, jan(1)).await.unwrap();
    engine.on_delivery(&second, jan(3)).await.unwrap();

    // First clears on Jan 4, second on Jan 6.
    engine.sweep_expired_grace_periods(jan(4)).await.unwrap();
    engine.sweep_expired_grace_periods(jan(6)).await.unwrap();

    let manifest = engine.cleared_payouts_for_partner(None, 100).await.unwrap();
    assert_eq!(manifest.len(), 2);
    assert_eq!(manifest[0].transaction_id, first.transaction_id);
    assert_eq!(manifest[1].transaction_id, second.transaction_id);

    let filtered = engine
        .cleared_payouts_for_partner(Some(first.seller_id), 100)
        .await
        .unwrap();
    assert_eq!(filtered.len(), 1);
    assert_eq!(filtered[0].seller_id, first.seller_id);
}

#[tokio::test]
async fn payout_groups_total_per_seller() {
    let (_, engine) = setup();
    let seller_id = Uuid::new_v4();

    for day in [1, 2] {
        let mut s = sale(jan(day), 2);
        s.seller_id = seller_id;
        engine.on_delivery(&s, jan(day)).await.unwrap();
    }
    engine.sweep_expired_grace_periods(jan(10)).await.unwrap();

    let groups = engine.admin_payout_groups(None).await.unwrap();
    assert_eq!(groups.len(), 1);
    assert_eq!(groups[0].seller_id, seller_id);
    assert_eq!(groups[0].cleared_count, 2);
    assert_eq!(groups[0].total_payout, 500_000);
    assert!(groups[0].oldest_cleared_at.is_some());
}

#[tokio::test]
async fn bulk_admin_mark_paid_isolates_failures() {
    let (_, engine) = setup();

    let cleared = sale(jan(1), 2);
    let withheld = sale(jan(1), 30);
    let cleared_permission = engine.on_delivery(&cleared, jan(1)).await.unwrap();
    let withheld_permission = engine.on_delivery(&withheld, jan(1)).await.unwrap();
    engine.sweep_expired_grace_periods(jan(4)).await.unwrap();

    let unknown = Uuid::new_v4();
    let outcomes = engine
        .admin_mark_paid(
            &[cleared_permission.id, withheld_permission.id, unknown],
            Uuid::new_v4(),
            "bank_transfer",
            None,
            jan(5),
        )
        .await
        .unwrap();

    assert_eq!(outcomes.len(), 3);
    assert!(outcomes[0].paid);
    assert!(!outcomes[1].paid);
    assert!(outcomes[1].error.as_deref().unwrap().contains("invalid transition"));
    assert!(!outcomes[2].paid);
    assert!(outcomes[2].error.as_deref().unwrap().contains("not found"));

    let paid = engine.payout_status(cleared.transaction_id).await.unwrap();
    assert_eq!(paid.status, PermissionStatus::Paid);
    assert!(paid.payout_reference.as_deref().unwrap().starts_with("bank_transfer:"));
}

#[tokio::test]
async fn seller_summary_counts_by_status() {
    let (store, engine) = setup();
    let seller_id = Uuid::new_v4();
    store.seed_account(active_seller(seller_id));

    let mut withheld = sale(jan(1), 30);
    withheld.seller_id = seller_id;
    let mut cleared = sale(jan(1), 2);
    cleared.seller_id = seller_id;
    let mut blocked = sale(jan(2), 2);
    blocked.seller_id = seller_id;

    engine.on_delivery(&withheld, jan(1)).await.unwrap();
    engine.on_delivery(&cleared, jan(1)).await.unwrap();
    engine.on_delivery(&blocked, jan(2)).await.unwrap();

    engine.sweep_expired_grace_periods(jan(4)).await.unwrap();
    engine
        .block_for_refund(blocked.transaction_id, Uuid::new_v4(), "Refund", 70_000, jan(5))
        .await
        .unwrap();

    let summary = engine.seller_summary(seller_id).await.unwrap();
    assert_eq!(summary.total_permissions, 3);
    assert_eq!(summary.withheld, 1);
    assert_eq!(summary.cleared, 1);
    assert_eq!(summary.blocked, 1);
    assert_eq!(summary.total_cleared_amount, 250_000);
    assert_eq!(summary.total_debt, 70_000);

    let err = engine.seller_summary(Uuid::new_v4()).await.unwrap_err();
    assert!(matches!(err, ClearanceError::NotFound(_)));
}

#[tokio::test]
async fn notes_accumulate_across_transitions() {
    let (_, engine) = setup();
    let sale = sale(jan(1), 2);
    engine.on_delivery(&sale, jan(1)).await.unwrap();

    let rid = Uuid::new_v4();
    engine.on_return_filed(sale.transaction_id, rid, jan(2)).await.unwrap();
    engine
        .on_return_resolved(
            sale.transaction_id,
            rid,
            ReturnOutcome::RejectedBySeller { reason: "Rejected".to_string() },
            jan(5),
        )
        .await
        .unwrap();
    engine
        .mark_paid(sale.transaction_id, "REF-1", "partner", jan(6))
        .await
        .unwrap();

    let record = engine.payout_status(sale.transaction_id).await.unwrap();
    let lines: Vec<&str> = record.notes.lines().collect();
    assert_eq!(lines.len(), 4);
    assert!(lines[0].contains("created on delivery"));
    assert!(lines[1].contains("Locked"));
    assert!(lines[2].contains("Unlocked"));
    assert!(lines[3].contains("Paid"));
}
