//! API error handling

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde::{Deserialize, Serialize};
use thiserror::Error;
use utoipa::ToSchema;

use mazadpay_types::ClearanceError;

/// API result type
pub type ApiResult<T> = Result<T, ApiError>;

/// API errors with stable numeric codes
#[derive(Debug, Error)]
pub enum ApiError {
    #[error("Invalid API key")]
    InvalidApiKey,

    #[error("Unauthorized")]
    Unauthorized,

    #[error("API key authentication not configured")]
    AuthNotConfigured,

    #[error("Bad request: {0}")]
    BadRequest(String),

    #[error("Resource not found: {0}")]
    NotFound(String),

    #[error("Conflict: {0}")]
    Conflict(String),

    #[error("Invalid transition: {0}")]
    InvalidTransition(String),

    #[error("Internal server error")]
    Internal,
}

impl ApiError {
    pub fn error_code(&self) -> i32 {
        match self {
            Self::InvalidApiKey => -1002,
            Self::Unauthorized => -1010,
            Self::AuthNotConfigured => -5001,
            Self::BadRequest(_) => -1100,
            Self::NotFound(_) => -4000,
            Self::Conflict(_) => -4010,
            Self::InvalidTransition(_) => -4021,
            Self::Internal => -5000,
        }
    }

    pub fn status_code(&self) -> StatusCode {
        match self {
            Self::InvalidApiKey | Self::Unauthorized => StatusCode::UNAUTHORIZED,
            Self::BadRequest(_) => StatusCode::BAD_REQUEST,
            Self::NotFound(_) => StatusCode::NOT_FOUND,
            Self::Conflict(_) | Self::InvalidTransition(_) => StatusCode::CONFLICT,
            Self::AuthNotConfigured | Self::Internal => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

/// API error response
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct ErrorResponse {
    /// Stable numeric error code
    pub code: i32,
    /// Human-readable error message
    pub msg: String,
}

impl From<&ApiError> for ErrorResponse {
    fn from(err: &ApiError) -> Self {
        Self {
            code: err.error_code(),
            msg: err.to_string(),
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.status_code();
        let body = ErrorResponse::from(&self);
        (status, Json(body)).into_response()
    }
}

impl From<ClearanceError> for ApiError {
    fn from(err: ClearanceError) -> Self {
        match err {
            ClearanceError::NotFound(msg) => Self::NotFound(msg),
            ClearanceError::InvalidTransition { .. } => Self::InvalidTransition(err.to_string()),
            ClearanceError::ConcurrentModification { .. } => Self::Conflict(err.to_string()),
            ClearanceError::Storage(msg) => {
                tracing::error!(error = %msg, "storage error");
                Self::Internal
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_status_codes() {
        assert_eq!(ApiError::InvalidApiKey.status_code(), StatusCode::UNAUTHORIZED);
        assert_eq!(
            ApiError::NotFound("x".to_string()).status_code(),
            StatusCode::NOT_FOUND
        );
        assert_eq!(
            ApiError::InvalidTransition("x".to_string()).status_code(),
            StatusCode::CONFLICT
        );
        assert_eq!(
            ApiError::AuthNotConfigured.status_code(),
            StatusCode::INTERNAL_SERVER_ERROR
        );
    }

    #[test]
    fn test_clearance_error_mapping() {
        let err: ApiError = ClearanceError::NotFound("permission x".to_string()).into();
        assert!(matches!(err, ApiError::NotFound(_)));

        let err: ApiError = ClearanceError::ConcurrentModification {
            transaction_id: uuid::Uuid::nil(),
        }
        .into();
        assert!(matches!(err, ApiError::Conflict(_)));
    }
}
