//! Database schema definitions and column families.

/// Column family names for the `RocksDB` database.
pub mod cf {
    /// Tenant accounts, keyed by `tenant_id`.
    pub const TENANTS: &str = "tenants";

    /// Audit entries, keyed by `entry_id` (ULID, chronological).
    pub const AUDIT: &str = "audit";

    /// Index: audit entries by tenant, keyed by `tenant_id || entry_id`.
    /// Value is empty (index only).
    pub const AUDIT_BY_TENANT: &str = "audit_by_tenant";

    /// Usage events, keyed by `tenant_id || event_id` so a prefix scan
    /// yields one tenant's stream in creation order.
    pub const USAGE_EVENTS: &str = "usage_events";
}

/// Returns all column family names for database initialization.
#[must_use]
pub fn all_column_families() -> Vec<&'static str> {
    vec![cf::TENANTS, cf::AUDIT, cf::AUDIT_BY_TENANT, cf::USAGE_EVENTS]
}
