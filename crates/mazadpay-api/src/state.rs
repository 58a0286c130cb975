//! Application state shared across handlers

use std::sync::Arc;

use mazadpay_clearing::{AccountDirectory, ClearanceEngine};

/// API configuration
#[derive(Debug, Clone, Default)]
pub struct ApiConfig {
    /// Static key the delivery partner sends in `X-API-KEY`.
    pub partner_api_key: Option<String>,
    /// Static key for the admin reconciliation endpoints (`X-ADMIN-KEY`).
    pub admin_api_key: Option<String>,
    /// Enable permissive CORS (development only).
    pub enable_cors: bool,
}

/// Shared application state
#[derive(Clone)]
pub struct AppState {
    /// The clearance engine
    pub engine: Arc<ClearanceEngine>,
    /// Account lookups for response enrichment
    pub accounts: Arc<dyn AccountDirectory>,
    /// API configuration
    pub config: ApiConfig,
}

impl AppState {
    pub fn new(
        engine: Arc<ClearanceEngine>,
        accounts: Arc<dyn AccountDirectory>,
        config: ApiConfig,
    ) -> Self {
        Self {
            engine,
            accounts,
            config,
        }
    }
}
