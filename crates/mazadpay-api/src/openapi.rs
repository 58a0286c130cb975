//! OpenAPI documentation

use utoipa::openapi::security::{ApiKey, ApiKeyValue, SecurityScheme};
use utoipa::{Modify, OpenApi};

use crate::dto;
use crate::error::ErrorResponse;
use crate::handlers;

#[derive(OpenApi)]
#[openapi(
    info(
        title = "MazadPay Clearance API",
        description = "Payout clearance ledger: partner manifest, payout confirmation, and admin reconciliation"
    ),
    paths(
        handlers::health::ping,
        handlers::health::health,
        handlers::partner::payout_manifest,
        handlers::partner::payout_status,
        handlers::partner::confirm_payout,
        handlers::partner::seller_summary,
        handlers::admin::payout_groups,
        handlers::admin::mark_paid,
        handlers::admin::reverse,
        handlers::seller::payout_history,
    ),
    components(schemas(
        ErrorResponse,
        dto::PermissionView,
        dto::ManifestItem,
        dto::ManifestResponse,
        dto::PayoutStatusResponse,
        dto::ConfirmPayoutRequest,
        dto::ConfirmPayoutResponse,
        dto::SellerSummaryResponse,
        dto::SellerInfo,
        dto::SummaryCounts,
        dto::PayoutGroupView,
        dto::PayoutGroupsResponse,
        dto::AdminMarkPaidRequest,
        dto::AdminMarkPaidItem,
        dto::AdminMarkPaidResponse,
        dto::ReverseRequest,
        dto::ReverseResponse,
        dto::HistoryResponse,
    )),
    modifiers(&SecurityAddon),
    tags(
        (name = "Health", description = "Liveness and health"),
        (name = "Partner", description = "Delivery partner payout endpoints"),
        (name = "Admin", description = "Admin reconciliation"),
        (name = "Seller", description = "Seller dashboard"),
    )
)]
pub struct ApiDoc;

struct SecurityAddon;

impl Modify for SecurityAddon {
    fn modify(&self, openapi: &mut utoipa::openapi::OpenApi) {
        if let Some(components) = openapi.components.as_mut() {
            components.add_security_scheme(
                "partner_api_key",
                SecurityScheme::ApiKey(ApiKey::Header(ApiKeyValue::new("X-API-KEY"))),
            );
            components.add_security_scheme(
                "admin_api_key",
                SecurityScheme::ApiKey(ApiKey::Header(ApiKeyValue::new("X-ADMIN-KEY"))),
            );
        }
    }
}
