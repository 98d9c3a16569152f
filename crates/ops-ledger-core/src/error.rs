//! Error types for ledger operations.

/// Result type for ledger operations.
pub type Result<T> = std::result::Result<T, LedgerError>;

/// Errors produced by the pure ledger algorithms.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum LedgerError {
    /// Mutation amount was zero or negative. Rejected before any write.
    #[error("invalid amount: {amount} (must be positive)")]
    InvalidAmount {
        /// The rejected amount.
        amount: i64,
    },

    /// The operation type is an audit-only classification and cannot be
    /// applied as a mutation.
    #[error("unsupported operation: {operation} (only credit_addition and refund mutate balances)")]
    UnsupportedOperation {
        /// The rejected operation type, in wire form.
        operation: String,
    },

    /// The before/after continuity invariant failed verification.
    ///
    /// Treated as a data-integrity alarm, never silently corrected.
    #[error("reconstruction inconsistent: {detail}")]
    ReconstructionInconsistent {
        /// What broke.
        detail: String,
    },
}
