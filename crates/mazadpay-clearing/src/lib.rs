//! MazadPay Clearing - Payout clearance engine
//!
//! Tracks, per delivered sale, whether the seller's proceeds are safe to
//! release, and automates the transitions driven by time, disputes, and
//! administrative action.
//!
//! # State Machine
//!
//! ```text
//! withheld -> { locked, cleared }
//! locked   -> { withheld, cleared, blocked }
//! cleared  -> { paid, blocked }
//! blocked  -> terminal once debt resolves
//! paid     -> terminal
//! ```
//!
//! # Architecture
//!
//! The engine talks to storage through four ports ([`PermissionStore`],
//! [`WalletLedger`], [`AccountDirectory`], [`Notifier`]). Every transition is
//! a single guarded update against the expected prior status; a guard miss is
//! re-read and classified as not-found, invalid-transition, or lost-race
//! instead of being silently ignored. Notification dispatch happens after the
//! transition commits and is best-effort.
//!
//! [`MemoryStore`] implements all four ports in-process and backs the test
//! suites; the `mazadpay-db` crate provides the PostgreSQL implementations.

pub mod engine;
pub mod memory;
pub mod model;
pub mod store;
pub mod sweep;

pub use engine::ClearanceEngine;
pub use memory::MemoryStore;
pub use model::*;
pub use store::*;

pub use mazadpay_types::{
    ClearanceError, ClearanceResult, DebtStatus, PermissionStatus,
};
