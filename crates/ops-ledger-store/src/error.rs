//! Error types for ledger storage.

/// Result type for storage operations.
pub type Result<T> = std::result::Result<T, StoreError>;

/// Errors that can occur in storage operations.
#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    /// Database operation failed.
    #[error("database error: {0}")]
    Database(String),

    /// Serialization/deserialization failed.
    #[error("serialization error: {0}")]
    Serialization(String),

    /// Record not found.
    #[error("{entity} not found: {id}")]
    NotFound {
        /// What kind of record was looked up.
        entity: &'static str,
        /// The identifier that missed.
        id: String,
    },

    /// A conditional counter update lost a race: the stored counters no
    /// longer match the snapshot the caller computed from.
    #[error("counter conflict for tenant {tenant_id}: counters moved since read")]
    CounterConflict {
        /// The tenant whose counters moved.
        tenant_id: String,
    },

    /// A usage delta would overflow the tenant's consumption counter.
    #[error("counter overflow for tenant {tenant_id}: usage delta exceeds counter range")]
    CounterOverflow {
        /// The tenant whose counter would overflow.
        tenant_id: String,
    },
}
