//! MazadPay Types - Canonical domain types for the payout clearance ledger
//!
//! This crate contains the foundational types for the clearance subsystem with
//! zero dependencies on other mazadpay crates:
//!
//! - Closed status enums (`PermissionStatus`, `DebtStatus`) so illegal states
//!   are unrepresentable and transitions are exhaustively checked
//! - Platform policy constants (grace minimum, debt due windows, thresholds)
//! - The grace-period formula (longer of return policy or platform minimum)
//! - The clearance error taxonomy
//!
//! # Architectural Invariants
//!
//! 1. Amounts are integer minor currency units - never floating point
//! 2. Every transition is guarded on the expected prior status
//! 3. `paid` and debt-resolved `blocked` are terminal - no transition leaves them
//! 4. The grace window is `max(return_policy_days, MIN_GRACE_DAYS)`, not the sum

pub mod error;
pub mod grace;
pub mod policy;
pub mod status;

pub use error::*;
pub use grace::*;
pub use policy::*;
pub use status::*;

/// Version of the mazadpay types schema
pub const TYPES_VERSION: &str = "0.1.0";
