//! Admin reconciliation handlers

use axum::{
    extract::{Path, Query, State},
    Json,
};
use chrono::Utc;
use std::sync::Arc;
use tracing::info;
use uuid::Uuid;

use crate::dto::{
    AdminMarkPaidItem, AdminMarkPaidRequest, AdminMarkPaidResponse, PayoutGroupView,
    PayoutGroupsQuery, PayoutGroupsResponse, PermissionView, ReverseRequest,
    ReverseResponse,
};
use crate::error::{ApiError, ApiResult};
use crate::state::AppState;

/// Cleared payouts grouped by seller, for reconciliation before bulk payout.
#[utoipa::path(
    get,
    path = "/api/v1/admin/payout-groups",
    tag = "Admin",
    params(("sellerId" = Option<Uuid>, Query, description = "Filter by seller")),
    security(("admin_api_key" = [])),
    responses(
        (status = 200, description = "Groups with running totals", body = PayoutGroupsResponse),
        (status = 401, description = "Invalid admin key")
    )
)]
pub async fn payout_groups(
    State(state): State<Arc<AppState>>,
    Query(query): Query<PayoutGroupsQuery>,
) -> ApiResult<Json<PayoutGroupsResponse>> {
    let groups = state.engine.admin_payout_groups(query.seller_id).await?;
    Ok(Json(PayoutGroupsResponse {
        success: true,
        groups: groups.into_iter().map(PayoutGroupView::from).collect(),
    }))
}

/// Bulk-mark cleared permissions as paid. Per-item outcomes; one failing
/// record never aborts the rest.
#[utoipa::path(
    post,
    path = "/api/v1/admin/payouts/mark-paid",
    tag = "Admin",
    request_body = AdminMarkPaidRequest,
    security(("admin_api_key" = [])),
    responses(
        (status = 200, description = "Per-item results", body = AdminMarkPaidResponse),
        (status = 400, description = "Empty batch")
    )
)]
pub async fn mark_paid(
    State(state): State<Arc<AppState>>,
    Json(request): Json<AdminMarkPaidRequest>,
) -> ApiResult<Json<AdminMarkPaidResponse>> {
    if request.permission_ids.is_empty() {
        return Err(ApiError::BadRequest(
            "permissionIds must not be empty".to_string(),
        ));
    }

    let outcomes = state
        .engine
        .admin_mark_paid(
            &request.permission_ids,
            request.admin_id,
            &request.method,
            request.reference.as_deref(),
            Utc::now(),
        )
        .await?;

    let results: Vec<AdminMarkPaidItem> = outcomes
        .into_iter()
        .map(|o| AdminMarkPaidItem {
            permission_id: o.permission_id,
            paid: o.paid,
            error: o.error,
        })
        .collect();
    let paid_count = results.iter().filter(|r| r.paid).count();

    info!(
        admin_id = %request.admin_id,
        requested = results.len(),
        paid = paid_count,
        "admin bulk mark-paid"
    );

    Ok(Json(AdminMarkPaidResponse {
        success: true,
        paid_count,
        results,
    }))
}

/// Reverse a cleared or withheld permission: the full payout becomes a debt
/// with a 5-day due date.
#[utoipa::path(
    post,
    path = "/api/v1/admin/permissions/{permission_id}/reverse",
    tag = "Admin",
    params(("permission_id" = Uuid, Path, description = "Permission record")),
    request_body = ReverseRequest,
    security(("admin_api_key" = [])),
    responses(
        (status = 200, description = "Reversed", body = ReverseResponse),
        (status = 404, description = "Permission not found"),
        (status = 409, description = "Not reversible from the current state")
    )
)]
pub async fn reverse(
    State(state): State<Arc<AppState>>,
    Path(permission_id): Path<Uuid>,
    Json(request): Json<ReverseRequest>,
) -> ApiResult<Json<ReverseResponse>> {
    if request.reason.trim().is_empty() {
        return Err(ApiError::BadRequest("reason must not be empty".to_string()));
    }

    let permission = state
        .engine
        .admin_reverse(permission_id, request.admin_id, &request.reason, Utc::now())
        .await?;

    info!(
        %permission_id,
        admin_id = %request.admin_id,
        debt = permission.debt_amount,
        "permission reversed by admin"
    );

    Ok(Json(ReverseResponse {
        success: true,
        permission: PermissionView::from(&permission),
    }))
}
