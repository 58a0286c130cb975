//! Delivery partner handlers
//!
//! The partner queries which payouts are safe to disburse and confirms each
//! disbursement back. All routes sit behind the partner API key.

use axum::{
    extract::{Path, Query, State},
    Json,
};
use chrono::Utc;
use std::sync::Arc;
use tracing::{info, warn};
use uuid::Uuid;

use mazadpay_clearing::AccountDirectory;

use crate::dto::{
    ConfirmPayoutRequest, ConfirmPayoutResponse, ManifestItem, ManifestQuery,
    ManifestResponse, PayoutStatusResponse, PermissionView, SellerSummaryResponse,
};
use crate::error::{ApiError, ApiResult};
use crate::state::AppState;

const MANIFEST_LIMIT: i64 = 1000;

/// Payout manifest: all orders cleared for payout, oldest first.
#[utoipa::path(
    get,
    path = "/api/v1/logistics/payout-manifest",
    tag = "Partner",
    params(
        ("sellerId" = Option<Uuid>, Query, description = "Filter by seller"),
        ("limit" = Option<i64>, Query, description = "Maximum rows, capped at 1000")
    ),
    security(("partner_api_key" = [])),
    responses(
        (status = 200, description = "Cleared payouts", body = ManifestResponse),
        (status = 401, description = "Invalid API key")
    )
)]
pub async fn payout_manifest(
    State(state): State<Arc<AppState>>,
    Query(query): Query<ManifestQuery>,
) -> ApiResult<Json<ManifestResponse>> {
    let limit = query.limit.unwrap_or(MANIFEST_LIMIT).min(MANIFEST_LIMIT);
    let cleared = state
        .engine
        .cleared_payouts_for_partner(query.seller_id, limit)
        .await?;

    info!(count = cleared.len(), "payout manifest requested");

    let mut payouts = Vec::with_capacity(cleared.len());
    for permission in &cleared {
        // Enrichment is best-effort; a missing seller row must not hide the
        // payout from the manifest.
        let seller = match state.accounts.find(permission.seller_id).await {
            Ok(seller) => seller,
            Err(err) => {
                warn!(
                    seller_id = %permission.seller_id,
                    error = %err,
                    "failed to enrich manifest row"
                );
                None
            }
        };
        let (seller_name, seller_phone) = seller
            .map(|s| (s.display_name, s.phone))
            .unwrap_or_else(|| ("Unknown".to_string(), None));

        payouts.push(ManifestItem {
            transaction_id: permission.transaction_id,
            seller_id: permission.seller_id,
            seller_name,
            seller_phone,
            payout_amount: permission.payout_amount,
            original_amount: permission.original_amount,
            platform_commission: permission.platform_commission,
            currency: permission.currency.clone(),
            return_policy_days: permission.return_policy_days,
            delivered_at: permission.delivered_at,
            grace_period_expires_at: permission.grace_period_expires_at,
            cleared_at: permission.cleared_at,
            notes: permission.notes.clone(),
        });
    }

    Ok(Json(ManifestResponse {
        success: true,
        count: payouts.len(),
        payouts,
        timestamp: Utc::now(),
    }))
}

/// Payout status for a single transaction.
#[utoipa::path(
    get,
    path = "/api/v1/logistics/payout-status/{transaction_id}",
    tag = "Partner",
    params(("transaction_id" = Uuid, Path, description = "Sale transaction")),
    security(("partner_api_key" = [])),
    responses(
        (status = 200, description = "Permission status", body = PayoutStatusResponse),
        (status = 404, description = "No permission for this transaction")
    )
)]
pub async fn payout_status(
    State(state): State<Arc<AppState>>,
    Path(transaction_id): Path<Uuid>,
) -> ApiResult<Json<PayoutStatusResponse>> {
    let permission = state.engine.payout_status(transaction_id).await?;
    Ok(Json(PayoutStatusResponse {
        success: true,
        permission: PermissionView::from(&permission),
    }))
}

/// Confirm a payout the partner has disbursed to the seller.
#[utoipa::path(
    post,
    path = "/api/v1/logistics/confirm-payout",
    tag = "Partner",
    request_body = ConfirmPayoutRequest,
    security(("partner_api_key" = [])),
    responses(
        (status = 200, description = "Payout confirmed", body = ConfirmPayoutResponse),
        (status = 404, description = "No permission for this transaction"),
        (status = 409, description = "Not cleared, or already paid")
    )
)]
pub async fn confirm_payout(
    State(state): State<Arc<AppState>>,
    Json(request): Json<ConfirmPayoutRequest>,
) -> ApiResult<Json<ConfirmPayoutResponse>> {
    if request.payout_reference.trim().is_empty() {
        return Err(ApiError::BadRequest(
            "payoutReference must not be empty".to_string(),
        ));
    }
    let confirmed_by = request
        .confirmed_by
        .as_deref()
        .unwrap_or("delivery_partner");

    state
        .engine
        .mark_paid(
            request.transaction_id,
            &request.payout_reference,
            confirmed_by,
            Utc::now(),
        )
        .await?;

    info!(
        transaction_id = %request.transaction_id,
        payout_reference = %request.payout_reference,
        "payout confirmed by partner"
    );

    Ok(Json(ConfirmPayoutResponse {
        success: true,
        message: "Payout confirmed successfully".to_string(),
        transaction_id: request.transaction_id,
        payout_reference: request.payout_reference,
    }))
}

/// Full clearance summary for one seller.
#[utoipa::path(
    get,
    path = "/api/v1/logistics/seller-summary/{seller_id}",
    tag = "Partner",
    params(("seller_id" = Uuid, Path, description = "Seller account")),
    security(("partner_api_key" = [])),
    responses(
        (status = 200, description = "Seller summary", body = SellerSummaryResponse),
        (status = 404, description = "Seller not found")
    )
)]
pub async fn seller_summary(
    State(state): State<Arc<AppState>>,
    Path(seller_id): Path<Uuid>,
) -> ApiResult<Json<SellerSummaryResponse>> {
    let summary = state.engine.seller_summary(seller_id).await?;
    Ok(Json(SellerSummaryResponse::from(summary)))
}
