//! Grace period computation
//!
//! The clearance window after delivery is the LONGER of the listing's return
//! policy or the platform minimum. Not additive: a 7-day return policy means
//! the seller is paid in 7 days, not 9.

use chrono::{DateTime, Duration, Utc};

use crate::policy::MIN_GRACE_DAYS;

/// Effective clearance window in days for a listing's return policy.
pub fn clearance_days(return_policy_days: i32) -> i64 {
    (return_policy_days as i64).max(MIN_GRACE_DAYS)
}

/// When the grace period for a delivery expires.
pub fn grace_period_expires_at(
    delivered_at: DateTime<Utc>,
    return_policy_days: i32,
) -> DateTime<Utc> {
    delivered_at + Duration::days(clearance_days(return_policy_days))
}
