//! Clearance error taxonomy
//!
//! Write operations never swallow a missing record, and an illegal transition
//! fails loudly instead of silently no-opping. A conditional update that
//! matched zero rows because another transition won the race is reported as
//! `ConcurrentModification` so the caller can decide between retry and
//! already-handled.

use thiserror::Error;
use uuid::Uuid;

use crate::status::PermissionStatus;

/// Errors from clearance operations
#[derive(Debug, Error)]
pub enum ClearanceError {
    #[error("not found: {0}")]
    NotFound(String),

    #[error("invalid transition: {operation} not allowed from {from}")]
    InvalidTransition {
        from: PermissionStatus,
        operation: &'static str,
    },

    #[error("concurrent modification on transaction {transaction_id}")]
    ConcurrentModification { transaction_id: Uuid },

    #[error("storage error: {0}")]
    Storage(String),
}

impl ClearanceError {
    pub fn not_found_transaction(transaction_id: Uuid) -> Self {
        Self::NotFound(format!("permission for transaction {}", transaction_id))
    }

    pub fn not_found_permission(permission_id: Uuid) -> Self {
        Self::NotFound(format!("permission {}", permission_id))
    }
}

/// Result type for clearance operations
pub type ClearanceResult<T> = Result<T, ClearanceError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn error_messages_carry_context() {
        let id = Uuid::nil();
        let err = ClearanceError::not_found_transaction(id);
        assert!(err.to_string().contains(&id.to_string()));

        let err = ClearanceError::InvalidTransition {
            from: PermissionStatus::Withheld,
            operation: "mark_paid",
        };
        assert!(err.to_string().contains("withheld"));
        assert!(err.to_string().contains("mark_paid"));
    }
}
