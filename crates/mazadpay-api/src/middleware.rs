//! API middleware
//!
//! Static-key authentication for the delivery partner and admin surfaces.
//! The partner sends `X-API-KEY`; admins send `X-ADMIN-KEY`. A missing
//! server-side key is a deployment error and reported as such, never as an
//! open door.

use axum::{
    extract::{Request, State},
    http::HeaderMap,
    middleware::Next,
    response::Response,
};
use std::sync::Arc;
use tracing::{error, warn};

use crate::error::ApiError;
use crate::state::AppState;

pub const PARTNER_KEY_HEADER: &str = "x-api-key";
pub const ADMIN_KEY_HEADER: &str = "x-admin-key";

fn verify_key(
    headers: &HeaderMap,
    header_name: &'static str,
    expected: Option<&str>,
) -> Result<(), ApiError> {
    let expected = match expected {
        Some(key) if !key.is_empty() => key,
        _ => {
            error!(header = header_name, "API key authentication not configured");
            return Err(ApiError::AuthNotConfigured);
        }
    };

    let presented = headers
        .get(header_name)
        .and_then(|value| value.to_str().ok());

    match presented {
        Some(key) if key == expected => Ok(()),
        _ => {
            warn!(header = header_name, "invalid or missing API key attempt");
            Err(ApiError::InvalidApiKey)
        }
    }
}

/// Require the delivery-partner API key.
pub async fn require_partner_key(
    State(state): State<Arc<AppState>>,
    req: Request,
    next: Next,
) -> Result<Response, ApiError> {
    verify_key(
        req.headers(),
        PARTNER_KEY_HEADER,
        state.config.partner_api_key.as_deref(),
    )?;
    Ok(next.run(req).await)
}

/// Require the admin API key.
pub async fn require_admin_key(
    State(state): State<Arc<AppState>>,
    req: Request,
    next: Next,
) -> Result<Response, ApiError> {
    verify_key(
        req.headers(),
        ADMIN_KEY_HEADER,
        state.config.admin_api_key.as_deref(),
    )?;
    Ok(next.run(req).await)
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::http::HeaderValue;

    #[test]
    fn missing_server_key_is_a_configuration_error() {
        let headers = HeaderMap::new();
        let err = verify_key(&headers, PARTNER_KEY_HEADER, None).unwrap_err();
        assert!(matches!(err, ApiError::AuthNotConfigured));

        let err = verify_key(&headers, PARTNER_KEY_HEADER, Some("")).unwrap_err();
        assert!(matches!(err, ApiError::AuthNotConfigured));
    }

    #[test]
    fn wrong_or_missing_key_is_unauthorized() {
        let mut headers = HeaderMap::new();
        let err = verify_key(&headers, PARTNER_KEY_HEADER, Some("secret")).unwrap_err();
        assert!(matches!(err, ApiError::InvalidApiKey));

        headers.insert(PARTNER_KEY_HEADER, HeaderValue::from_static("wrong"));
        let err = verify_key(&headers, PARTNER_KEY_HEADER, Some("secret")).unwrap_err();
        assert!(matches!(err, ApiError::InvalidApiKey));
    }

    #[test]
    fn matching_key_passes() {
        let mut headers = HeaderMap::new();
        headers.insert(PARTNER_KEY_HEADER, HeaderValue::from_static("secret"));
        assert!(verify_key(&headers, PARTNER_KEY_HEADER, Some("secret")).is_ok());
    }
}
