//! Domain model for the clearance ledger

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use mazadpay_types::{
    grace_period_expires_at, DebtStatus, PermissionStatus, DEFAULT_CURRENCY,
};

/// One payout permission per delivered sale transaction.
///
/// Created exactly once at delivery confirmation, mutated only through the
/// engine's transition operations, never deleted - this is the permanent
/// settlement record. `notes` is an append-only audit trail.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PayoutPermission {
    pub id: Uuid,
    /// Owning sale; exactly one permission per transaction.
    pub transaction_id: Uuid,
    pub listing_id: Uuid,
    pub seller_id: Uuid,
    pub buyer_id: Uuid,
    /// Amount due to the seller in minor units.
    /// `original_amount - platform_commission` unless forced to zero.
    pub payout_amount: i64,
    pub original_amount: i64,
    pub platform_commission: i64,
    pub currency: String,
    /// Snapshot from the listing at creation time; later listing edits must
    /// not retroactively change an existing permission.
    pub return_policy_days: i32,
    pub delivered_at: DateTime<Utc>,
    pub grace_period_expires_at: DateTime<Utc>,
    pub status: PermissionStatus,
    /// Fast-filter mirror of `status == cleared | paid`.
    pub is_cleared: bool,
    pub locked_at: Option<DateTime<Utc>>,
    pub locked_reason: Option<String>,
    pub locked_by_return_request_id: Option<Uuid>,
    pub blocked_at: Option<DateTime<Utc>>,
    pub blocked_reason: Option<String>,
    pub blocked_by: Option<String>,
    pub debt_amount: i64,
    pub debt_due_date: Option<DateTime<Utc>>,
    pub debt_status: Option<DebtStatus>,
    pub cleared_at: Option<DateTime<Utc>>,
    pub cleared_by: Option<String>,
    pub paid_at: Option<DateTime<Utc>>,
    pub paid_by: Option<String>,
    pub payout_reference: Option<String>,
    /// Append-only human-readable log of every transition.
    pub notes: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl PayoutPermission {
    /// Build the initial withheld record for a delivered sale.
    pub fn from_delivery(sale: &DeliveredSale, now: DateTime<Utc>) -> Self {
        Self {
            id: Uuid::new_v4(),
            transaction_id: sale.transaction_id,
            listing_id: sale.listing_id,
            seller_id: sale.seller_id,
            buyer_id: sale.buyer_id,
            payout_amount: sale.amount - sale.platform_commission,
            original_amount: sale.amount,
            platform_commission: sale.platform_commission,
            currency: DEFAULT_CURRENCY.to_string(),
            return_policy_days: sale.return_policy_days,
            delivered_at: sale.delivered_at,
            grace_period_expires_at: grace_period_expires_at(
                sale.delivered_at,
                sale.return_policy_days,
            ),
            status: PermissionStatus::Withheld,
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
            created_at: now,
            updated_at: now,
        }
    }

    /// Terminal records never transition again.
    pub fn is_terminal(&self) -> bool {
        match self.status {
            PermissionStatus::Paid => true,
            PermissionStatus::Blocked => self.debt_status == Some(DebtStatus::Resolved),
            _ => false,
        }
    }

    /// Debt still owed by the seller for this record, zero unless blocked
    /// with an unresolved debt.
    pub fn outstanding_debt(&self) -> i64 {
        if self.status == PermissionStatus::Blocked
            && self.debt_status.map_or(false, |d| d.is_outstanding())
        {
            self.debt_amount
        } else {
            0
        }
    }
}

/// Facts about a delivered sale, supplied by the order-lifecycle collaborator.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DeliveredSale {
    pub transaction_id: Uuid,
    pub listing_id: Uuid,
    pub seller_id: Uuid,
    pub buyer_id: Uuid,
    /// Gross sale amount in minor units.
    pub amount: i64,
    pub platform_commission: i64,
    /// Return policy snapshot from the listing.
    pub return_policy_days: i32,
    pub delivered_at: DateTime<Utc>,
}

/// How a return request was resolved.
#[derive(Debug, Clone)]
pub enum ReturnOutcome {
    /// Seller rejected the return; the payout unlocks.
    RejectedBySeller { reason: String },
    /// Refund approved and processed; the payout blocks with a debt.
    Refunded {
        admin_id: Uuid,
        reason: String,
        refund_amount: i64,
    },
}

/// Append an already-stamped line to an audit trail. Existing content is
/// never rewritten.
pub fn append_note(notes: &str, line: &str) -> String {
    if notes.is_empty() {
        line.to_string()
    } else {
        format!("{}\n{}", notes, line)
    }
}

/// Format a single timestamped audit line.
pub fn note_line(now: DateTime<Utc>, line: &str) -> String {
    format!("[{}] {}", now.to_rfc3339(), line)
}

// ============================================================================
// Wallet ledger
// ============================================================================

/// Type of a wallet ledger entry.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum WalletEntryType {
    SaleEarning,
    CommissionFee,
    ShippingDeduction,
    ReturnReversal,
    AdminReversal,
}

impl WalletEntryType {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::SaleEarning => "sale_earning",
            Self::CommissionFee => "commission_fee",
            Self::ShippingDeduction => "shipping_deduction",
            Self::ReturnReversal => "return_reversal",
            Self::AdminReversal => "admin_reversal",
        }
    }
}

impl std::str::FromStr for WalletEntryType {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "sale_earning" => Ok(Self::SaleEarning),
            "commission_fee" => Ok(Self::CommissionFee),
            "shipping_deduction" => Ok(Self::ShippingDeduction),
            "return_reversal" => Ok(Self::ReturnReversal),
            "admin_reversal" => Ok(Self::AdminReversal),
            other => Err(format!("unknown wallet entry type: {}", other)),
        }
    }
}

/// Settlement state of a wallet ledger entry.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum WalletEntryStatus {
    /// Inside the hold window, not yet spendable.
    Pending,
    /// Spendable balance.
    Available,
    /// Disbursed in a payout.
    Paid,
    /// Cancelled before disbursement; kept for audit, excluded from balance.
    Reversed,
}

impl WalletEntryStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Pending => "pending",
            Self::Available => "available",
            Self::Paid => "paid",
            Self::Reversed => "reversed",
        }
    }
}

impl std::str::FromStr for WalletEntryStatus {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "pending" => Ok(Self::Pending),
            "available" => Ok(Self::Available),
            "paid" => Ok(Self::Paid),
            "reversed" => Ok(Self::Reversed),
            other => Err(format!("unknown wallet entry status: {}", other)),
        }
    }
}

/// One row of the append-only wallet-transactions ledger.
///
/// The engine does not own this ledger's schema; it only appends offsetting
/// entries and flips `status` when reversing a blocked balance.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WalletEntry {
    pub id: Uuid,
    pub seller_id: Uuid,
    pub transaction_id: Uuid,
    pub entry_type: WalletEntryType,
    /// Signed amount in minor units; deductions are negative.
    pub amount: i64,
    pub description: String,
    pub status: WalletEntryStatus,
    pub hold_until: Option<DateTime<Utc>>,
    pub available_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
}

impl WalletEntry {
    /// Offsetting entry that nets out an already-paid amount.
    pub fn offsetting(
        original: &WalletEntry,
        entry_type: WalletEntryType,
        description: String,
        now: DateTime<Utc>,
    ) -> Self {
        Self {
            id: Uuid::new_v4(),
            seller_id: original.seller_id,
            transaction_id: original.transaction_id,
            entry_type,
            amount: -original.amount,
            description,
            status: WalletEntryStatus::Available,
            hold_until: None,
            available_at: Some(now),
            created_at: now,
        }
    }
}

// ============================================================================
// Collaborator projections
// ============================================================================

/// Minimal projection of a user account from the account collaborator.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Account {
    pub id: Uuid,
    pub display_name: String,
    pub phone: Option<String>,
    pub is_active: bool,
    pub is_admin: bool,
}

/// In-app notification, dispatched fire-and-forget after a transition commits.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NewNotification {
    pub user_id: Uuid,
    pub kind: String,
    pub title: String,
    pub body: String,
    pub link_url: Option<String>,
    pub related_id: Option<Uuid>,
}

// ============================================================================
// Read views
// ============================================================================

/// Cleared payouts grouped by seller for admin reconciliation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SellerPayoutGroup {
    pub seller_id: Uuid,
    pub cleared_count: i64,
    pub total_payout: i64,
    pub oldest_cleared_at: Option<DateTime<Utc>>,
}

/// Per-seller clearance summary for the partner API.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SellerSummary {
    pub seller: Account,
    pub total_permissions: usize,
    pub withheld: usize,
    pub locked: usize,
    pub cleared: usize,
    pub blocked: usize,
    pub paid: usize,
    pub total_cleared_amount: i64,
    pub total_debt: i64,
    pub permissions: Vec<PayoutPermission>,
}

/// Per-item outcome of a bulk admin mark-as-paid.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AdminPaidOutcome {
    pub permission_id: Uuid,
    pub paid: bool,
    pub error: Option<String>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn sale() -> DeliveredSale {
        DeliveredSale {
            transaction_id: Uuid::new_v4(),
            listing_id: Uuid::new_v4(),
            seller_id: Uuid::new_v4(),
            buyer_id: Uuid::new_v4(),
            amount: 250_000,
            platform_commission: 20_000,
            return_policy_days: 7,
            delivered_at: Utc.with_ymd_and_hms(2026, 1, 1, 0, 0, 0).unwrap(),
        }
    }

    #[test]
    fn delivery_computes_net_payout_and_grace() {
        let now = Utc::now();
        let sale = sale();
        let permission = PayoutPermission::from_delivery(&sale, now);

        assert_eq!(permission.status, PermissionStatus::Withheld);
        assert_eq!(permission.payout_amount, 230_000);
        assert_eq!(
            permission.grace_period_expires_at,
            Utc.with_ymd_and_hms(2026, 1, 8, 0, 0, 0).unwrap()
        );
        assert!(!permission.is_cleared);
    }

    #[test]
    fn blocked_with_resolved_debt_is_terminal() {
        let mut permission = PayoutPermission::from_delivery(&sale(), Utc::now());
        permission.status = PermissionStatus::Blocked;
        permission.debt_status = Some(DebtStatus::Pending);
        assert!(!permission.is_terminal());

        permission.debt_status = Some(DebtStatus::Resolved);
        assert!(permission.is_terminal());
    }

    #[test]
    fn outstanding_debt_only_while_blocked_and_unresolved() {
        let mut permission = PayoutPermission::from_delivery(&sale(), Utc::now());
        permission.debt_amount = 50_000;
        assert_eq!(permission.outstanding_debt(), 0);

        permission.status = PermissionStatus::Blocked;
        permission.debt_status = Some(DebtStatus::Pending);
        assert_eq!(permission.outstanding_debt(), 50_000);

        permission.debt_status = Some(DebtStatus::Resolved);
        assert_eq!(permission.outstanding_debt(), 0);
    }

    #[test]
    fn notes_are_append_only() {
        let now = Utc.with_ymd_and_hms(2026, 3, 1, 12, 0, 0).unwrap();
        let notes = append_note("", &note_line(now, "created"));
        let notes = append_note(&notes, &note_line(now, "locked"));
        let lines: Vec<&str> = notes.lines().collect();
        assert_eq!(lines.len(), 2);
        assert!(lines[0].contains("created"));
        assert!(lines[1].contains("locked"));
        assert!(lines[0].starts_with("[2026-03-01T12:00:00"));
    }

    #[test]
    fn offsetting_entry_negates_amount() {
        let now = Utc::now();
        let entry = WalletEntry {
            id: Uuid::new_v4(),
            seller_id: Uuid::new_v4(),
            transaction_id: Uuid::new_v4(),
            entry_type: WalletEntryType::SaleEarning,
            amount: 100_000,
            description: "sale".to_string(),
            status: WalletEntryStatus::Paid,
            hold_until: None,
            available_at: None,
            created_at: now,
        };
        let offset = WalletEntry::offsetting(
            &entry,
            WalletEntryType::ReturnReversal,
            "refund".to_string(),
            now,
        );
        assert_eq!(offset.amount, -100_000);
        assert_eq!(offset.status, WalletEntryStatus::Available);
        assert_eq!(offset.transaction_id, entry.transaction_id);
    }
}
