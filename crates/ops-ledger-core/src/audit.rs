//! Audit entries for ledger-affecting operator actions.
//!
//! Every successful mutation appends exactly one entry. Entries are
//! immutable once written; the store offers no update or delete path.
//! Balances on the entry are in the tenant-facing currency (available
//! credits), never raw counters.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::{EntryId, TenantId};

/// An immutable record of one ledger-affecting operator action.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AuditEntry {
    /// Unique entry ID (ULID for time-ordering).
    pub id: EntryId,

    /// Opaque operator identity, recorded verbatim from the session layer.
    pub actor: String,

    /// The tenant whose balance was affected.
    pub tenant_id: TenantId,

    /// Tenant display name at the time of the action (for audit search).
    pub tenant_name: String,

    /// The operation classification.
    pub operation: OperationType,

    /// The requested amount (always positive).
    pub amount: i64,

    /// Available credits before the operation.
    pub previous_balance: i64,

    /// Available credits after the operation.
    pub new_balance: i64,

    /// Free-text reason supplied by the operator.
    pub reason: String,

    /// Payment-tracking status for additions billed out-of-band.
    pub payment_status: PaymentStatus,

    /// When the corresponding payment landed, if tracked.
    pub payment_date: Option<DateTime<Utc>>,

    /// When the entry was created.
    pub created_at: DateTime<Utc>,
}

impl AuditEntry {
    /// Record a completed operation.
    ///
    /// `previous_balance` and `new_balance` are the derived available
    /// credits around the mutation, so the trail speaks in the currency the
    /// tenant sees.
    #[must_use]
    #[allow(clippy::too_many_arguments)]
    pub fn record(
        actor: String,
        tenant_id: TenantId,
        tenant_name: String,
        operation: OperationType,
        amount: i64,
        previous_balance: i64,
        new_balance: i64,
        reason: String,
    ) -> Self {
        Self {
            id: EntryId::generate(),
            actor,
            tenant_id,
            tenant_name,
            operation,
            amount,
            previous_balance,
            new_balance,
            reason,
            payment_status: PaymentStatus::NotApplicable,
            payment_date: None,
            created_at: Utc::now(),
        }
    }

    /// Attach payment-tracking metadata.
    #[must_use]
    pub fn with_payment(mut self, status: PaymentStatus, date: Option<DateTime<Utc>>) -> Self {
        self.payment_status = status;
        self.payment_date = date;
        self
    }

    /// Whether this entry matches a case-insensitive substring search over
    /// tenant name and actor identity.
    #[must_use]
    pub fn matches_text(&self, needle: &str) -> bool {
        let needle = needle.to_lowercase();
        self.tenant_name.to_lowercase().contains(&needle)
            || self.actor.to_lowercase().contains(&needle)
    }
}

/// Classification of an audit entry.
///
/// Only `CreditAddition` and `Refund` are exercised by the operator-facing
/// mutation path; `CreditDeduction` and `Adjustment` exist for other callers
/// that classify their own entries.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum OperationType {
    /// Operator raised `base_credit`.
    CreditAddition,

    /// Operator gave back incorrectly charged consumption
    /// (`credits_used` decreased, clamped at zero).
    Refund,

    /// Credits removed outside the usage stream.
    CreditDeduction,

    /// Manual correction.
    Adjustment,
}

impl OperationType {
    /// Whether the operator-facing mutation path accepts this type.
    #[must_use]
    pub const fn is_mutating(self) -> bool {
        matches!(self, Self::CreditAddition | Self::Refund)
    }

    /// Wire-format name (`snake_case`, as serialized).
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::CreditAddition => "credit_addition",
            Self::Refund => "refund",
            Self::CreditDeduction => "credit_deduction",
            Self::Adjustment => "adjustment",
        }
    }
}

impl std::fmt::Display for OperationType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Payment-tracking status for credit additions billed out-of-band.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PaymentStatus {
    /// Invoice raised, payment awaited.
    Pending,

    /// Payment received.
    Received,

    /// No payment attached to this entry.
    NotApplicable,
}

impl Default for PaymentStatus {
    fn default() -> Self {
        Self::NotApplicable
    }
}
