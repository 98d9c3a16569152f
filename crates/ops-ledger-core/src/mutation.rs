//! Pure mutation rules for the two operator-facing operations.
//!
//! The rules are asymmetric at the raw-counter level even though they look
//! symmetric at the balance level: an addition raises `base_credit`, a
//! refund lowers `credits_used`. That asymmetry is policy. Refunds are
//! clamped so `credits_used` never goes below zero, which means a refund
//! can never inflate the available balance beyond what was actually
//! consumed.
//!
//! Keeping the rules here as a pure function of the counter snapshot lets
//! the engine, the store, and the tests all agree on the arithmetic without
//! a live datastore.

use crate::{CounterSnapshot, LedgerError, OperationType, Result};

/// The outcome of applying an operation to a counter snapshot.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MutationOutcome {
    /// The counters after the operation.
    pub counters: CounterSnapshot,

    /// Available credits before the operation.
    pub previous_balance: i64,

    /// Available credits after the operation.
    pub new_balance: i64,

    /// How much of the requested amount took effect.
    ///
    /// Equal to the requested amount for additions; may be smaller for
    /// refunds when the clamp fires.
    pub amount_applied: i64,
}

/// Apply an operation to a counter snapshot.
///
/// # Errors
///
/// - [`LedgerError::InvalidAmount`] if `amount <= 0`, or if an addition
///   would overflow the `base_credit` counter.
/// - [`LedgerError::UnsupportedOperation`] for the audit-only
///   classifications (`credit_deduction`, `adjustment`).
pub fn apply(
    counters: CounterSnapshot,
    operation: OperationType,
    amount: i64,
) -> Result<MutationOutcome> {
    if amount <= 0 {
        return Err(LedgerError::InvalidAmount { amount });
    }

    let previous_balance = counters.available();

    let new_counters = match operation {
        OperationType::CreditAddition => CounterSnapshot {
            base_credit: counters
                .base_credit
                .checked_add(amount)
                .ok_or(LedgerError::InvalidAmount { amount })?,
            credits_used: counters.credits_used,
        },
        OperationType::Refund => CounterSnapshot {
            base_credit: counters.base_credit,
            // Never drive consumption negative.
            credits_used: (counters.credits_used - amount).max(0),
        },
        OperationType::CreditDeduction | OperationType::Adjustment => {
            return Err(LedgerError::UnsupportedOperation {
                operation: operation.as_str().to_string(),
            });
        }
    };

    let new_balance = new_counters.available();

    Ok(MutationOutcome {
        counters: new_counters,
        previous_balance,
        new_balance,
        amount_applied: new_balance - previous_balance,
    })
}
