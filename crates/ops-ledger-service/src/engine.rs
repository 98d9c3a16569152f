//! The credit mutation engine.
//!
//! One mutation is: read the counters, apply the pure operation rule,
//! conditionally write the new counters, then append one audit entry.
//!
//! Ordering is account update first, audit append second. The audit trail
//! records what happened; it never gates whether it happens. If the append
//! fails after the counters moved, the mutation is still a success for
//! balance purposes and the caller sees `audit_recorded = false` - a
//! degraded success to be reconciled out-of-band, never rolled back and
//! never blindly retried.

use chrono::{DateTime, Utc};

use ops_ledger_core::{
    mutation, AuditEntry, EntryId, OperationType, PaymentStatus, TenantAccount, TenantId,
};
use ops_ledger_store::{Store, StoreError};

use crate::error::ApiError;

/// A mutation request, validated and ready to apply.
#[derive(Debug, Clone)]
pub struct MutationRequest {
    /// The tenant whose balance to mutate.
    pub tenant_id: TenantId,

    /// `credit_addition` or `refund`.
    pub operation: OperationType,

    /// Requested amount (must be positive).
    pub amount: i64,

    /// Free-text reason for the audit trail.
    pub reason: String,

    /// Opaque operator identity from the session layer.
    pub actor: String,

    /// Payment-tracking metadata for the audit entry.
    pub payment_status: Option<PaymentStatus>,

    /// Payment date, if tracked.
    pub payment_date: Option<DateTime<Utc>>,
}

/// The result of a successful (possibly degraded) mutation.
#[derive(Debug, Clone)]
pub struct MutationReceipt {
    /// The account after the mutation.
    pub tenant: TenantAccount,

    /// Available credits before the operation.
    pub previous_balance: i64,

    /// Available credits after the operation.
    pub new_balance: i64,

    /// How much of the requested amount took effect (refunds clamp).
    pub amount_applied: i64,

    /// The appended audit entry's ID, if the append succeeded.
    pub entry_id: Option<EntryId>,

    /// False when the counters moved but the audit append failed.
    pub audit_recorded: bool,
}

/// Apply a mutation with bounded retry on counter conflicts.
///
/// Each retry re-reads the account and recomputes from fresh counters;
/// the same delta is never blindly resubmitted against a stale snapshot.
///
/// # Errors
///
/// - [`ApiError::InvalidAmount`] / [`ApiError::UnsupportedOperation`] -
///   rejected before any write.
/// - [`ApiError::TenantNotFound`] - no such account.
/// - [`ApiError::ConcurrentUpdateConflict`] - retries exhausted.
pub fn mutate(
    store: &dyn Store,
    max_retries: u32,
    request: &MutationRequest,
) -> Result<MutationReceipt, ApiError> {
    for attempt in 0..=max_retries {
        let account = store
            .get_tenant(&request.tenant_id)?
            .ok_or_else(|| ApiError::TenantNotFound(request.tenant_id.to_string()))?;

        let outcome = mutation::apply(account.counters(), request.operation, request.amount)?;

        match store.update_counters(&request.tenant_id, account.counters(), outcome.counters) {
            Ok(updated) => {
                return Ok(finish(store, request, &updated, &outcome));
            }
            Err(StoreError::CounterConflict { .. }) => {
                tracing::debug!(
                    tenant_id = %request.tenant_id,
                    attempt = attempt + 1,
                    "Counter update lost a race, re-reading"
                );
            }
            Err(e) => return Err(e.into()),
        }
    }

    Err(ApiError::ConcurrentUpdateConflict(format!(
        "mutation for tenant {} kept losing counter races after {} attempts",
        request.tenant_id,
        max_retries + 1
    )))
}

/// Append the audit entry for an applied mutation.
///
/// The counters are already written; failures here only degrade the result.
fn finish(
    store: &dyn Store,
    request: &MutationRequest,
    tenant: &TenantAccount,
    outcome: &mutation::MutationOutcome,
) -> MutationReceipt {
    let mut entry = AuditEntry::record(
        request.actor.clone(),
        request.tenant_id,
        tenant.name.clone(),
        request.operation,
        request.amount,
        outcome.previous_balance,
        outcome.new_balance,
        request.reason.clone(),
    );
    if let Some(status) = request.payment_status {
        entry = entry.with_payment(status, request.payment_date);
    }

    let (entry_id, audit_recorded) = match store.append_audit(&entry) {
        Ok(()) => (Some(entry.id), true),
        Err(e) => {
            tracing::warn!(
                tenant_id = %request.tenant_id,
                actor = %request.actor,
                operation = %request.operation,
                amount = %request.amount,
                error = %e,
                "Audit append failed after the balance changed; bookkeeping incomplete"
            );
            (None, false)
        }
    };

    tracing::info!(
        tenant_id = %request.tenant_id,
        actor = %request.actor,
        operation = %request.operation,
        amount = %request.amount,
        previous_balance = %outcome.previous_balance,
        new_balance = %outcome.new_balance,
        audit_recorded = %audit_recorded,
        "Credit mutation applied"
    );

    MutationReceipt {
        tenant: tenant.clone(),
        previous_balance: outcome.previous_balance,
        new_balance: outcome.new_balance,
        amount_applied: outcome.amount_applied,
        entry_id,
        audit_recorded,
    }
}
