//! Status enums for the clearance state machine
//!
//! The permission lifecycle:
//!
//! ```text
//! withheld -> { locked, cleared }
//! locked   -> { withheld, cleared, blocked }
//! cleared  -> { paid, blocked }
//! blocked  -> terminal once debt is resolved
//! paid     -> terminal
//! ```

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// State of a payout permission
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PermissionStatus {
    /// Funds withheld while the grace period runs
    Withheld,
    /// A return request is open against the sale
    Locked,
    /// Safe to disburse to the seller
    Cleared,
    /// Payout blocked (refund, refusal, or admin reversal)
    Blocked,
    /// Disbursed to the seller
    Paid,
}

impl PermissionStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Withheld => "withheld",
            Self::Locked => "locked",
            Self::Cleared => "cleared",
            Self::Blocked => "blocked",
            Self::Paid => "paid",
        }
    }

    /// Check if this status never transitions again regardless of record data.
    ///
    /// `blocked` is terminal only once its debt is resolved, which is
    /// record-level data and decided where the record is at hand.
    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::Paid)
    }

    /// A return request may be filed while withheld or already cleared
    /// (the dispute window can outlast clearance).
    pub fn can_lock(&self) -> bool {
        matches!(self, Self::Withheld | Self::Cleared)
    }

    /// Only withheld records are swept into cleared by grace expiry.
    pub fn can_sweep_clear(&self) -> bool {
        matches!(self, Self::Withheld)
    }

    /// Payout confirmation is valid only from cleared.
    pub fn can_mark_paid(&self) -> bool {
        matches!(self, Self::Cleared)
    }

    /// Manual reversal overrides an already-favorable state.
    pub fn can_reverse(&self) -> bool {
        matches!(self, Self::Cleared | Self::Withheld)
    }

    /// Blocking (refund or refusal) is valid from any non-terminal state.
    pub fn can_block(&self) -> bool {
        !matches!(self, Self::Paid | Self::Blocked)
    }

    /// Unlock applies only to a locked record.
    pub fn can_unlock(&self) -> bool {
        matches!(self, Self::Locked)
    }
}

impl fmt::Display for PermissionStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for PermissionStatus {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "withheld" => Ok(Self::Withheld),
            "locked" => Ok(Self::Locked),
            "cleared" => Ok(Self::Cleared),
            "blocked" => Ok(Self::Blocked),
            "paid" => Ok(Self::Paid),
            other => Err(format!("unknown permission status: {}", other)),
        }
    }
}

/// State of a seller debt created by blocking a payout
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DebtStatus {
    /// Debt owed, within the due window
    Pending,
    /// Past due, seller account suspended
    Escalated,
    /// Settled or never a debt (buyer refusal)
    Resolved,
}

impl DebtStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Pending => "pending",
            Self::Escalated => "escalated",
            Self::Resolved => "resolved",
        }
    }

    pub fn is_outstanding(&self) -> bool {
        !matches!(self, Self::Resolved)
    }
}

impl fmt::Display for DebtStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for DebtStatus {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "pending" => Ok(Self::Pending),
            "escalated" => Ok(Self::Escalated),
            "resolved" => Ok(Self::Resolved),
            other => Err(format!("unknown debt status: {}", other)),
        }
    }
}
