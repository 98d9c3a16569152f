//! Tenant credit accounts.
//!
//! A tenant's balance is never stored. The account carries the two raw
//! counters and the tenant-facing balance is derived on every read.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::TenantId;

/// A tenant's credit account.
///
/// `base_credit` is the operator-adjustable ceiling; it only moves through
/// credit additions. `credits_used` is the cumulative consumption counter;
/// it is incremented by the usage stream and decremented only by refunds,
/// and never goes below zero.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TenantAccount {
    /// The tenant ID (from the tenant directory).
    pub tenant_id: TenantId,

    /// Display name, recorded on audit entries and matched by audit search.
    pub name: String,

    /// Operator-adjustable credit ceiling.
    pub base_credit: i64,

    /// Cumulative consumption counter.
    pub credits_used: i64,

    /// When the account was provisioned.
    pub created_at: DateTime<Utc>,

    /// When the counters last changed.
    pub updated_at: DateTime<Utc>,
}

impl TenantAccount {
    /// Create a new account with the given starting ceiling.
    #[must_use]
    pub fn new(tenant_id: TenantId, name: String, base_credit: i64) -> Self {
        let now = Utc::now();
        Self {
            tenant_id,
            name,
            base_credit,
            credits_used: 0,
            created_at: now,
            updated_at: now,
        }
    }

    /// The tenant-facing balance: `base_credit - credits_used`.
    ///
    /// Always derived, never persisted.
    #[must_use]
    pub const fn available_credits(&self) -> i64 {
        self.base_credit - self.credits_used
    }

    /// Snapshot the raw counters for a conditional update.
    #[must_use]
    pub const fn counters(&self) -> CounterSnapshot {
        CounterSnapshot {
            base_credit: self.base_credit,
            credits_used: self.credits_used,
        }
    }
}

/// A point-in-time copy of the two raw counters.
///
/// Used both as the `expected` side of the store's compare-and-set and as
/// the input to the pure mutation rules.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct CounterSnapshot {
    /// Operator-adjustable ceiling.
    pub base_credit: i64,

    /// Cumulative consumption.
    pub credits_used: i64,
}

impl CounterSnapshot {
    /// The derived balance for this snapshot.
    #[must_use]
    pub const fn available(&self) -> i64 {
        self.base_credit - self.credits_used
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn available_is_derived_from_counters() {
        let mut account = TenantAccount::new(TenantId::generate(), "acme".into(), 1000);
        assert_eq!(account.available_credits(), 1000);

        account.credits_used = 400;
        assert_eq!(account.available_credits(), 600);

        account.base_credit = 1500;
        assert_eq!(account.available_credits(), 1100);
    }

    #[test]
    fn counters_snapshot_matches_account() {
        let mut account = TenantAccount::new(TenantId::generate(), "acme".into(), 1000);
        account.credits_used = 250;

        let snap = account.counters();
        assert_eq!(snap.base_credit, 1000);
        assert_eq!(snap.credits_used, 250);
        assert_eq!(snap.available(), account.available_credits());
    }
}
