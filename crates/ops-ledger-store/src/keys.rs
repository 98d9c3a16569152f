//! Key encoding utilities for `RocksDB`.
//!
//! Composite keys put the tenant UUID first so one tenant's records are a
//! contiguous range, and the ULID second so the range is in creation order.

use ops_ledger_core::{EntryId, EventId, TenantId};

/// Create a tenant key from a tenant ID.
#[must_use]
pub fn tenant_key(tenant_id: &TenantId) -> Vec<u8> {
    tenant_id.as_bytes().to_vec()
}

/// Create an audit entry key from an entry ID.
#[must_use]
pub fn audit_key(entry_id: &EntryId) -> Vec<u8> {
    entry_id.to_bytes().to_vec()
}

/// Create a tenant-audit index key.
///
/// Format: `tenant_id (16 bytes) || entry_id (16 bytes)`.
#[must_use]
pub fn tenant_audit_key(tenant_id: &TenantId, entry_id: &EntryId) -> Vec<u8> {
    let mut key = Vec::with_capacity(32);
    key.extend_from_slice(tenant_id.as_bytes());
    key.extend_from_slice(&entry_id.to_bytes());
    key
}

/// Create a usage event key.
///
/// Format: `tenant_id (16 bytes) || event_id (16 bytes)`. Since ULIDs are
/// time-ordered, a prefix scan returns the tenant's events oldest first.
#[must_use]
pub fn usage_event_key(tenant_id: &TenantId, event_id: &EventId) -> Vec<u8> {
    let mut key = Vec::with_capacity(32);
    key.extend_from_slice(tenant_id.as_bytes());
    key.extend_from_slice(&event_id.to_bytes());
    key
}

/// Prefix covering all of one tenant's records in a composite-keyed family.
#[must_use]
pub fn tenant_prefix(tenant_id: &TenantId) -> Vec<u8> {
    tenant_id.as_bytes().to_vec()
}

/// Extract the entry ID from a tenant-audit index key.
///
/// # Panics
///
/// Panics if the key is not at least 32 bytes.
#[must_use]
pub fn extract_entry_id(key: &[u8]) -> EntryId {
    let mut bytes = [0u8; 16];
    bytes.copy_from_slice(&key[16..32]);
    EntryId::from_bytes(bytes)
}
