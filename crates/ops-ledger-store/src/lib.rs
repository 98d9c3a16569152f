//! `RocksDB` storage layer for the ops credit ledger.
//!
//! This crate persists tenant accounts, the append-only audit ledger, and
//! the usage-event stream using `RocksDB` with column families for ordered
//! indexing.
//!
//! # Architecture
//!
//! - `tenants`: tenant accounts keyed by `tenant_id`
//! - `audit`: audit entries keyed by `entry_id` (ULID, chronological)
//! - `audit_by_tenant`: index keyed by `tenant_id || entry_id`
//! - `usage_events`: events keyed by `tenant_id || event_id`, so a prefix
//!   scan yields one tenant's stream in creation order
//!
//! The only write path to the two raw counters is
//! [`Store::update_counters`], a compare-and-set: callers pass the counter
//! snapshot they computed from and the write is refused with
//! [`StoreError::CounterConflict`] if the stored counters have moved. The
//! usage ingest path ([`Store::record_usage`]) increments `credits_used`
//! under the same serialization, so an operator refund racing a usage
//! increment can never lose either side's effect.

#![forbid(unsafe_code)]
#![warn(missing_docs)]
#![warn(clippy::all)]
#![warn(clippy::pedantic)]

pub mod error;
pub mod keys;
pub mod rocks;
pub mod schema;

pub use error::{Result, StoreError};
pub use rocks::RocksStore;

use chrono::{DateTime, Utc};
use ops_ledger_core::{AuditEntry, CounterSnapshot, OperationType, TenantAccount, TenantId, UsageEvent};

/// Filters for audit ledger search.
///
/// All filters are conjunctive; an unset field matches everything.
#[derive(Debug, Clone, Default)]
pub struct AuditFilter {
    /// Case-insensitive substring match over tenant name or actor identity.
    pub text: Option<String>,

    /// Exact operation type.
    pub operation: Option<OperationType>,

    /// Inclusive lower bound on `created_at`.
    pub start: Option<DateTime<Utc>>,

    /// Inclusive upper bound on `created_at`.
    pub end: Option<DateTime<Utc>>,
}

impl AuditFilter {
    /// Whether an entry passes every set filter.
    #[must_use]
    pub fn matches(&self, entry: &AuditEntry) -> bool {
        if let Some(text) = &self.text {
            if !entry.matches_text(text) {
                return false;
            }
        }
        if let Some(operation) = self.operation {
            if entry.operation != operation {
                return false;
            }
        }
        if let Some(start) = self.start {
            if entry.created_at < start {
                return false;
            }
        }
        if let Some(end) = self.end {
            if entry.created_at > end {
                return false;
            }
        }
        true
    }
}

/// The storage trait defining all database operations.
///
/// Abstracts the storage layer so handlers and the mutation engine stay
/// independent of the `RocksDB` implementation.
pub trait Store: Send + Sync {
    // =========================================================================
    // Tenant Account Operations
    // =========================================================================

    /// Insert or overwrite a tenant account (provisioning only).
    ///
    /// # Errors
    ///
    /// Returns an error if the database operation fails.
    fn put_tenant(&self, account: &TenantAccount) -> Result<()>;

    /// Get a tenant account by ID.
    ///
    /// # Errors
    ///
    /// Returns an error if the database operation fails.
    fn get_tenant(&self, tenant_id: &TenantId) -> Result<Option<TenantAccount>>;

    /// Conditionally replace the raw counters.
    ///
    /// The write only happens if the stored counters still equal
    /// `expected`; otherwise the caller raced another update and must
    /// re-read before retrying. Returns the account after the write.
    ///
    /// # Errors
    ///
    /// - `StoreError::NotFound` if the tenant doesn't exist.
    /// - `StoreError::CounterConflict` if the stored counters moved.
    fn update_counters(
        &self,
        tenant_id: &TenantId,
        expected: CounterSnapshot,
        new: CounterSnapshot,
    ) -> Result<TenantAccount>;

    // =========================================================================
    // Audit Ledger Operations (append-only)
    // =========================================================================

    /// Append an audit entry. There is no update or delete path.
    ///
    /// # Errors
    ///
    /// Returns an error if the database operation fails. Failures here must
    /// be surfaced by the caller; the account update they follow is never
    /// rolled back.
    fn append_audit(&self, entry: &AuditEntry) -> Result<()>;

    /// Search the audit ledger, newest first.
    ///
    /// Returns the requested page and the total number of matching entries.
    ///
    /// # Errors
    ///
    /// Returns an error if the database operation fails.
    fn query_audit(
        &self,
        filter: &AuditFilter,
        page: u64,
        page_size: u64,
    ) -> Result<(Vec<AuditEntry>, u64)>;

    /// List one tenant's audit history, newest first.
    ///
    /// # Errors
    ///
    /// Returns an error if the database operation fails.
    fn list_audit_by_tenant(
        &self,
        tenant_id: &TenantId,
        page: u64,
        page_size: u64,
    ) -> Result<(Vec<AuditEntry>, u64)>;

    // =========================================================================
    // Usage Event Operations
    // =========================================================================

    /// Record a usage event: append it and increment the tenant's
    /// `credits_used` by the event delta in one atomic step.
    ///
    /// This is the consumption system's write path; the ledger never writes
    /// events anywhere else. Returns the tenant's new available balance.
    ///
    /// # Errors
    ///
    /// - `StoreError::NotFound` if the tenant doesn't exist.
    /// - `StoreError::CounterOverflow` if the delta would overflow the
    ///   consumption counter; nothing is written.
    fn record_usage(&self, event: &UsageEvent) -> Result<i64>;

    /// List a tenant's usage events, newest first, ULID tiebreak.
    ///
    /// # Errors
    ///
    /// Returns an error if the database operation fails.
    fn list_usage_events(
        &self,
        tenant_id: &TenantId,
        page: u64,
        page_size: u64,
    ) -> Result<Vec<UsageEvent>>;

    /// Total number of usage events for a tenant.
    ///
    /// # Errors
    ///
    /// Returns an error if the database operation fails.
    fn count_usage_events(&self, tenant_id: &TenantId) -> Result<u64>;

    /// Sum the deltas of the `skip` newest events for a tenant.
    ///
    /// This is the `skipped_sum` aggregation the balance reconstruction
    /// anchors on: the combined effect of every event strictly newer than
    /// the requested page.
    ///
    /// # Errors
    ///
    /// Returns an error if the database operation fails.
    fn sum_deltas(&self, tenant_id: &TenantId, skip: u64) -> Result<i64>;
}
