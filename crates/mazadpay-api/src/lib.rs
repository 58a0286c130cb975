//! MazadPay API
//!
//! REST surface for the payout clearance ledger:
//!
//! - **Partner** (`/api/v1/logistics`): payout manifest, per-transaction
//!   status, payout confirmation, seller summary. Static `X-API-KEY`.
//! - **Admin** (`/api/v1/admin`): payout groups, bulk mark-paid, manual
//!   reversal. Separate `X-ADMIN-KEY`.
//! - **Seller** (`/api/v1/sellers`): payout history for the dashboard.
//!
//! OpenAPI documentation is served at `/swagger-ui`.

pub mod dto;
pub mod error;
pub mod handlers;
pub mod middleware;
pub mod openapi;
pub mod routes;
pub mod state;

use axum::Router;
use std::sync::Arc;
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;

pub use error::{ApiError, ApiResult, ErrorResponse};
pub use state::{ApiConfig, AppState};

/// Build the application router.
pub fn create_router(state: Arc<AppState>) -> Router {
    let enable_cors = state.config.enable_cors;

    let mut router = Router::new()
        .nest("/api/v1", routes::api_v1_routes(state.clone()))
        .merge(routes::swagger_routes())
        .layer(TraceLayer::new_for_http());

    if enable_cors {
        router = router.layer(CorsLayer::permissive());
    }

    router.with_state(state)
}
