//! Platform policy constants
//!
//! These are the commercial policy knobs of the clearance ledger. They are
//! compile-time constants rather than configuration: changing one is a
//! business decision that should show up in review, not in an ops dashboard.

/// Minimum grace period in days. The effective window is the LONGER of the
/// listing's return policy or this minimum, never the sum.
pub const MIN_GRACE_DAYS: i64 = 2;

/// Days a seller has to settle a debt created by a processed refund.
pub const REFUND_DEBT_DUE_DAYS: i64 = 30;

/// Days a seller has to settle a debt created by a manual admin reversal.
/// Deliberately shorter than the refund window: a reversal overrides an
/// already-favorable state.
pub const REVERSAL_DEBT_DUE_DAYS: i64 = 5;

/// A seller with blocked payouts older than this many days is suspended.
pub const DEBT_SUSPENSION_AFTER_DAYS: i64 = 5;

/// Outstanding debt above this many minor units triggers an admin alert.
pub const HIGH_DEBT_THRESHOLD: i64 = 100_000;

/// Upper bound on rows touched by a single sweep run.
pub const SWEEP_BATCH_LIMIT: i64 = 1000;

/// Currency recorded on permissions; amounts are integer minor units.
pub const DEFAULT_CURRENCY: &str = "IQD";
