//! Request and response DTOs
//!
//! Wire format is camelCase to match the marketplace's existing consumers.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;
use uuid::Uuid;

use mazadpay_clearing::{PayoutPermission, SellerPayoutGroup, SellerSummary};

/// Slim projection of a payout permission for API responses.
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct PermissionView {
    pub transaction_id: Uuid,
    pub permission_status: String,
    pub is_cleared: bool,
    pub payout_amount: i64,
    pub original_amount: i64,
    pub platform_commission: i64,
    pub currency: String,
    pub return_policy_days: i32,
    pub delivered_at: DateTime<Utc>,
    pub grace_period_expires_at: DateTime<Utc>,
    pub cleared_at: Option<DateTime<Utc>>,
    pub blocked_reason: Option<String>,
    pub debt_amount: i64,
    pub debt_status: Option<String>,
    pub paid_at: Option<DateTime<Utc>>,
    pub payout_reference: Option<String>,
}

impl From<&PayoutPermission> for PermissionView {
    fn from(p: &PayoutPermission) -> Self {
        Self {
            transaction_id: p.transaction_id,
            permission_status: p.status.to_string(),
            is_cleared: p.is_cleared,
            payout_amount: p.payout_amount,
            original_amount: p.original_amount,
            platform_commission: p.platform_commission,
            currency: p.currency.clone(),
            return_policy_days: p.return_policy_days,
            delivered_at: p.delivered_at,
            grace_period_expires_at: p.grace_period_expires_at,
            cleared_at: p.cleared_at,
            blocked_reason: p.blocked_reason.clone(),
            debt_amount: p.debt_amount,
            debt_status: p.debt_status.map(|d| d.to_string()),
            paid_at: p.paid_at,
            payout_reference: p.payout_reference.clone(),
        }
    }
}

// ============================================================================
// Partner API
// ============================================================================

#[derive(Debug, Clone, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct ManifestQuery {
    pub seller_id: Option<Uuid>,
    pub limit: Option<i64>,
}

/// One row of the payout manifest, enriched with seller details.
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct ManifestItem {
    pub transaction_id: Uuid,
    pub seller_id: Uuid,
    pub seller_name: String,
    pub seller_phone: Option<String>,
    pub payout_amount: i64,
    pub original_amount: i64,
    pub platform_commission: i64,
    pub currency: String,
    pub return_policy_days: i32,
    pub delivered_at: DateTime<Utc>,
    pub grace_period_expires_at: DateTime<Utc>,
    pub cleared_at: Option<DateTime<Utc>>,
    pub notes: String,
}

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct ManifestResponse {
    pub success: bool,
    pub count: usize,
    pub payouts: Vec<ManifestItem>,
    pub timestamp: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct PayoutStatusResponse {
    pub success: bool,
    #[serde(flatten)]
    pub permission: PermissionView,
}

#[derive(Debug, Clone, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct ConfirmPayoutRequest {
    pub transaction_id: Uuid,
    pub payout_reference: String,
    pub confirmed_by: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct ConfirmPayoutResponse {
    pub success: bool,
    pub message: String,
    pub transaction_id: Uuid,
    pub payout_reference: String,
}

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct SellerSummaryResponse {
    pub success: bool,
    pub seller: SellerInfo,
    pub summary: SummaryCounts,
    pub permissions: Vec<PermissionView>,
}

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct SellerInfo {
    pub id: Uuid,
    pub display_name: String,
    pub phone: Option<String>,
    pub is_active: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct SummaryCounts {
    pub total_permissions: usize,
    pub withheld: usize,
    pub locked: usize,
    pub cleared: usize,
    pub blocked: usize,
    pub paid: usize,
    pub total_cleared_amount: i64,
    pub total_debt: i64,
}

impl From<SellerSummary> for SellerSummaryResponse {
    fn from(summary: SellerSummary) -> Self {
        Self {
            success: true,
            seller: SellerInfo {
                id: summary.seller.id,
                display_name: summary.seller.display_name,
                phone: summary.seller.phone,
                is_active: summary.seller.is_active,
            },
            summary: SummaryCounts {
                total_permissions: summary.total_permissions,
                withheld: summary.withheld,
                locked: summary.locked,
                cleared: summary.cleared,
                blocked: summary.blocked,
                paid: summary.paid,
                total_cleared_amount: summary.total_cleared_amount,
                total_debt: summary.total_debt,
            },
            permissions: summary.permissions.iter().map(PermissionView::from).collect(),
        }
    }
}

// ============================================================================
// Admin API
// ============================================================================

#[derive(Debug, Clone, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct PayoutGroupsQuery {
    pub seller_id: Option<Uuid>,
}

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct PayoutGroupView {
    pub seller_id: Uuid,
    pub cleared_count: i64,
    pub total_payout: i64,
    pub oldest_cleared_at: Option<DateTime<Utc>>,
}

impl From<SellerPayoutGroup> for PayoutGroupView {
    fn from(g: SellerPayoutGroup) -> Self {
        Self {
            seller_id: g.seller_id,
            cleared_count: g.cleared_count,
            total_payout: g.total_payout,
            oldest_cleared_at: g.oldest_cleared_at,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct PayoutGroupsResponse {
    pub success: bool,
    pub groups: Vec<PayoutGroupView>,
}

#[derive(Debug, Clone, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct AdminMarkPaidRequest {
    pub admin_id: Uuid,
    pub permission_ids: Vec<Uuid>,
    /// Disbursement method, e.g. `bank_transfer` or `cash`.
    pub method: String,
    pub reference: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct AdminMarkPaidItem {
    pub permission_id: Uuid,
    pub paid: bool,
    pub error: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct AdminMarkPaidResponse {
    pub success: bool,
    pub paid_count: usize,
    pub results: Vec<AdminMarkPaidItem>,
}

#[derive(Debug, Clone, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct ReverseRequest {
    pub admin_id: Uuid,
    pub reason: String,
}

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct ReverseResponse {
    pub success: bool,
    #[serde(flatten)]
    pub permission: PermissionView,
}

// ============================================================================
// Seller API
// ============================================================================

#[derive(Debug, Clone, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct HistoryQuery {
    pub limit: Option<i64>,
}

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct HistoryResponse {
    pub success: bool,
    pub count: usize,
    pub permissions: Vec<PermissionView>,
}
