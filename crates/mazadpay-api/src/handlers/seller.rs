//! Seller dashboard handlers

use axum::{
    extract::{Path, Query, State},
    Json,
};
use std::sync::Arc;
use uuid::Uuid;

use crate::dto::{HistoryQuery, HistoryResponse, PermissionView};
use crate::error::ApiResult;
use crate::state::AppState;

const DEFAULT_HISTORY_LIMIT: i64 = 50;

/// Payout history for the seller dashboard, newest delivery first.
#[utoipa::path(
    get,
    path = "/api/v1/sellers/{seller_id}/payout-history",
    tag = "Seller",
    params(
        ("seller_id" = Uuid, Path, description = "Seller account"),
        ("limit" = Option<i64>, Query, description = "Maximum rows, default 50")
    ),
    responses(
        (status = 200, description = "Payout history", body = HistoryResponse)
    )
)]
pub async fn payout_history(
    State(state): State<Arc<AppState>>,
    Path(seller_id): Path<Uuid>,
    Query(query): Query<HistoryQuery>,
) -> ApiResult<Json<HistoryResponse>> {
    let limit = query.limit.unwrap_or(DEFAULT_HISTORY_LIMIT);
    let permissions = state.engine.seller_payout_history(seller_id, limit).await?;

    Ok(Json(HistoryResponse {
        success: true,
        count: permissions.len(),
        permissions: permissions.iter().map(PermissionView::from).collect(),
    }))
}
