//! API Routes

use axum::{
    middleware::from_fn_with_state,
    routing::{get, post},
    Router,
};
use std::sync::Arc;

use crate::handlers;
use crate::middleware::{require_admin_key, require_partner_key};
use crate::state::AppState;

/// Create API v1 routes
pub fn api_v1_routes(state: Arc<AppState>) -> Router<Arc<AppState>> {
    Router::new()
        .route("/ping", get(handlers::health::ping))
        .route("/health", get(handlers::health::health))
        .nest("/logistics", partner_routes(state.clone()))
        .nest("/admin", admin_routes(state))
        .nest("/sellers", seller_routes())
}

/// Delivery partner routes (static API key)
fn partner_routes(state: Arc<AppState>) -> Router<Arc<AppState>> {
    Router::new()
        .route("/payout-manifest", get(handlers::partner::payout_manifest))
        .route(
            "/payout-status/:transaction_id",
            get(handlers::partner::payout_status),
        )
        .route("/confirm-payout", post(handlers::partner::confirm_payout))
        .route(
            "/seller-summary/:seller_id",
            get(handlers::partner::seller_summary),
        )
        .layer(from_fn_with_state(state, require_partner_key))
}

/// Admin reconciliation routes (separate admin key)
fn admin_routes(state: Arc<AppState>) -> Router<Arc<AppState>> {
    Router::new()
        .route("/payout-groups", get(handlers::admin::payout_groups))
        .route("/payouts/mark-paid", post(handlers::admin::mark_paid))
        .route(
            "/permissions/:permission_id/reverse",
            post(handlers::admin::reverse),
        )
        .layer(from_fn_with_state(state, require_admin_key))
}

/// Seller dashboard routes
fn seller_routes() -> Router<Arc<AppState>> {
    Router::new().route(
        "/:seller_id/payout-history",
        get(handlers::seller::payout_history),
    )
}

/// Create Swagger UI routes
pub fn swagger_routes() -> Router<Arc<AppState>> {
    use crate::openapi::ApiDoc;
    use utoipa::OpenApi;
    use utoipa_swagger_ui::SwaggerUi;

    Router::new().merge(
        SwaggerUi::new("/swagger-ui").url("/api-docs/openapi.json", ApiDoc::openapi()),
    )
}
