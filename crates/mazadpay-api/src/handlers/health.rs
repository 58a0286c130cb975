//! Health endpoints

use axum::Json;
use serde_json::{json, Value};

/// Liveness probe
#[utoipa::path(
    get,
    path = "/api/v1/ping",
    tag = "Health",
    responses((status = 200, description = "Service is up"))
)]
pub async fn ping() -> Json<Value> {
    Json(json!({}))
}

/// Service health and version
#[utoipa::path(
    get,
    path = "/api/v1/health",
    tag = "Health",
    responses((status = 200, description = "Health status"))
)]
pub async fn health() -> Json<Value> {
    Json(json!({
        "status": "ok",
        "service": "mazadpay-clearance",
        "version": env!("CARGO_PKG_VERSION"),
    }))
}
