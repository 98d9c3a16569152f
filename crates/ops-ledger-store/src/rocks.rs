//! `RocksDB` storage implementation.

use std::path::Path;
use std::sync::{Arc, Mutex};

use rocksdb::{
    BoundColumnFamily, ColumnFamilyDescriptor, DBWithThreadMode, Direction, IteratorMode, Options,
    WriteBatch,
};

use ops_ledger_core::{
    AuditEntry, CounterSnapshot, EntryId, TenantAccount, TenantId, UsageEvent,
};

use crate::error::{Result, StoreError};
use crate::keys;
use crate::schema::{all_column_families, cf};
use crate::{AuditFilter, Store};

/// RocksDB-backed storage implementation.
///
/// Counter writes are serialized behind an internal mutex: `RocksDB` has no
/// server-side conditional write, so the compare step of
/// [`Store::update_counters`] and the read-modify-write of
/// [`Store::record_usage`] both run under the lock. That makes the
/// compare-and-set genuinely atomic within the process that owns the
/// database, which is the deployment model here (one service, one store).
pub struct RocksStore {
    db: Arc<DBWithThreadMode<rocksdb::MultiThreaded>>,
    counter_lock: Mutex<()>,
}

impl RocksStore {
    /// Open or create a `RocksDB` database at the given path.
    ///
    /// # Errors
    ///
    /// Returns an error if the database cannot be opened or created.
    pub fn open<P: AsRef<Path>>(path: P) -> Result<Self> {
        let mut opts = Options::default();
        opts.create_if_missing(true);
        opts.create_missing_column_families(true);

        let cf_descriptors: Vec<_> = all_column_families()
            .into_iter()
            .map(|name| ColumnFamilyDescriptor::new(name, Options::default()))
            .collect();

        let path = path.as_ref();
        tracing::debug!(path = %path.display(), "Opening RocksDB database");

        let db = DBWithThreadMode::open_cf_descriptors(&opts, path, cf_descriptors)
            .map_err(|e| StoreError::Database(e.to_string()))?;

        Ok(Self {
            db: Arc::new(db),
            counter_lock: Mutex::new(()),
        })
    }

    /// Get a column family handle.
    fn cf(&self, name: &str) -> Result<Arc<BoundColumnFamily<'_>>> {
        self.db
            .cf_handle(name)
            .ok_or_else(|| StoreError::Database(format!("column family not found: {name}")))
    }

    /// Serialize a value using CBOR.
    fn serialize<T: serde::Serialize>(value: &T) -> Result<Vec<u8>> {
        let mut buf = Vec::new();
        ciborium::into_writer(value, &mut buf)
            .map_err(|e| StoreError::Serialization(e.to_string()))?;
        Ok(buf)
    }

    /// Deserialize a value from CBOR.
    fn deserialize<T: serde::de::DeserializeOwned>(data: &[u8]) -> Result<T> {
        ciborium::from_reader(data).map_err(|e| StoreError::Serialization(e.to_string()))
    }

    fn get_audit(&self, entry_id: &EntryId) -> Result<Option<AuditEntry>> {
        let cf = self.cf(cf::AUDIT)?;
        self.db
            .get_cf(&cf, keys::audit_key(entry_id))
            .map_err(|e| StoreError::Database(e.to_string()))?
            .map(|data| Self::deserialize(&data))
            .transpose()
    }

    /// Collect the raw values of one tenant's usage events, oldest first.
    fn usage_values(&self, tenant_id: &TenantId) -> Result<Vec<Vec<u8>>> {
        let cf = self.cf(cf::USAGE_EVENTS)?;
        let prefix = keys::tenant_prefix(tenant_id);

        let iter = self
            .db
            .iterator_cf(&cf, IteratorMode::From(&prefix, Direction::Forward));

        let mut values = Vec::new();
        for item in iter {
            let (key, value) = item.map_err(|e| StoreError::Database(e.to_string()))?;
            if !key.starts_with(&prefix) {
                break;
            }
            values.push(value.to_vec());
        }
        Ok(values)
    }

    fn hold_counter_lock(&self) -> Result<std::sync::MutexGuard<'_, ()>> {
        self.counter_lock
            .lock()
            .map_err(|_| StoreError::Database("counter lock poisoned".into()))
    }
}

fn page_bounds(page: u64, page_size: u64) -> (usize, usize) {
    let start = page.saturating_sub(1).saturating_mul(page_size);
    let start = usize::try_from(start).unwrap_or(usize::MAX);
    let size = usize::try_from(page_size).unwrap_or(usize::MAX);
    (start, size)
}

impl Store for RocksStore {
    // =========================================================================
    // Tenant Account Operations
    // =========================================================================

    fn put_tenant(&self, account: &TenantAccount) -> Result<()> {
        let cf = self.cf(cf::TENANTS)?;
        let key = keys::tenant_key(&account.tenant_id);
        let value = Self::serialize(account)?;

        self.db
            .put_cf(&cf, key, value)
            .map_err(|e| StoreError::Database(e.to_string()))?;

        Ok(())
    }

    fn get_tenant(&self, tenant_id: &TenantId) -> Result<Option<TenantAccount>> {
        let cf = self.cf(cf::TENANTS)?;
        self.db
            .get_cf(&cf, keys::tenant_key(tenant_id))
            .map_err(|e| StoreError::Database(e.to_string()))?
            .map(|data| Self::deserialize(&data))
            .transpose()
    }

    fn update_counters(
        &self,
        tenant_id: &TenantId,
        expected: CounterSnapshot,
        new: CounterSnapshot,
    ) -> Result<TenantAccount> {
        // Compare and write must be indivisible.
        let _guard = self.hold_counter_lock()?;

        let mut account = self
            .get_tenant(tenant_id)?
            .ok_or_else(|| StoreError::NotFound {
                entity: "tenant",
                id: tenant_id.to_string(),
            })?;

        if account.counters() != expected {
            return Err(StoreError::CounterConflict {
                tenant_id: tenant_id.to_string(),
            });
        }

        account.base_credit = new.base_credit;
        account.credits_used = new.credits_used;
        account.updated_at = chrono::Utc::now();

        let cf = self.cf(cf::TENANTS)?;
        let value = Self::serialize(&account)?;
        self.db
            .put_cf(&cf, keys::tenant_key(tenant_id), value)
            .map_err(|e| StoreError::Database(e.to_string()))?;

        Ok(account)
    }

    // =========================================================================
    // Audit Ledger Operations
    // =========================================================================

    fn append_audit(&self, entry: &AuditEntry) -> Result<()> {
        let cf_audit = self.cf(cf::AUDIT)?;
        let cf_by_tenant = self.cf(cf::AUDIT_BY_TENANT)?;

        let audit_key = keys::audit_key(&entry.id);
        let index_key = keys::tenant_audit_key(&entry.tenant_id, &entry.id);
        let value = Self::serialize(entry)?;

        let mut batch = WriteBatch::default();
        batch.put_cf(&cf_audit, &audit_key, &value);
        batch.put_cf(&cf_by_tenant, &index_key, []); // Index entry (empty value)

        self.db
            .write(batch)
            .map_err(|e| StoreError::Database(e.to_string()))?;

        Ok(())
    }

    fn query_audit(
        &self,
        filter: &AuditFilter,
        page: u64,
        page_size: u64,
    ) -> Result<(Vec<AuditEntry>, u64)> {
        let cf = self.cf(cf::AUDIT)?;
        let (start, size) = page_bounds(page, page_size);

        // ULID keys are chronological, so reverse iteration is newest first.
        let iter = self.db.iterator_cf(&cf, IteratorMode::End);

        let mut entries = Vec::new();
        let mut matched: usize = 0;
        for item in iter {
            let (_, value) = item.map_err(|e| StoreError::Database(e.to_string()))?;
            let entry: AuditEntry = Self::deserialize(&value)?;
            if !filter.matches(&entry) {
                continue;
            }
            if matched >= start && entries.len() < size {
                entries.push(entry);
            }
            matched += 1;
        }

        Ok((entries, matched as u64))
    }

    fn list_audit_by_tenant(
        &self,
        tenant_id: &TenantId,
        page: u64,
        page_size: u64,
    ) -> Result<(Vec<AuditEntry>, u64)> {
        let cf = self.cf(cf::AUDIT_BY_TENANT)?;
        let prefix = keys::tenant_prefix(tenant_id);
        let (start, size) = page_bounds(page, page_size);

        let iter = self
            .db
            .iterator_cf(&cf, IteratorMode::From(&prefix, Direction::Forward));

        let mut all_keys: Vec<Vec<u8>> = Vec::new();
        for item in iter {
            let (key, _) = item.map_err(|e| StoreError::Database(e.to_string()))?;
            if !key.starts_with(&prefix) {
                break;
            }
            all_keys.push(key.to_vec());
        }

        let total = all_keys.len() as u64;

        // Reverse to get newest first.
        all_keys.reverse();

        let mut entries = Vec::new();
        for key in all_keys.iter().skip(start).take(size) {
            let entry_id = keys::extract_entry_id(key);
            if let Some(entry) = self.get_audit(&entry_id)? {
                entries.push(entry);
            }
        }

        Ok((entries, total))
    }

    // =========================================================================
    // Usage Event Operations
    // =========================================================================

    fn record_usage(&self, event: &UsageEvent) -> Result<i64> {
        // The counter increment must not race a conditional update.
        let _guard = self.hold_counter_lock()?;

        let mut account = self
            .get_tenant(&event.tenant_id)?
            .ok_or_else(|| StoreError::NotFound {
                entity: "tenant",
                id: event.tenant_id.to_string(),
            })?;

        account.credits_used = account
            .credits_used
            .checked_add(event.credits_used)
            .ok_or_else(|| StoreError::CounterOverflow {
                tenant_id: event.tenant_id.to_string(),
            })?;
        account.updated_at = chrono::Utc::now();

        let cf_tenants = self.cf(cf::TENANTS)?;
        let cf_usage = self.cf(cf::USAGE_EVENTS)?;

        let tenant_value = Self::serialize(&account)?;
        let event_value = Self::serialize(event)?;

        let mut batch = WriteBatch::default();
        batch.put_cf(&cf_tenants, keys::tenant_key(&event.tenant_id), &tenant_value);
        batch.put_cf(
            &cf_usage,
            keys::usage_event_key(&event.tenant_id, &event.event_id),
            &event_value,
        );

        self.db
            .write(batch)
            .map_err(|e| StoreError::Database(e.to_string()))?;

        Ok(account.available_credits())
    }

    fn list_usage_events(
        &self,
        tenant_id: &TenantId,
        page: u64,
        page_size: u64,
    ) -> Result<Vec<UsageEvent>> {
        let (start, size) = page_bounds(page, page_size);

        let mut values = self.usage_values(tenant_id)?;
        values.reverse(); // newest first

        values
            .iter()
            .skip(start)
            .take(size)
            .map(|data| Self::deserialize(data))
            .collect()
    }

    fn count_usage_events(&self, tenant_id: &TenantId) -> Result<u64> {
        Ok(self.usage_values(tenant_id)?.len() as u64)
    }

    fn sum_deltas(&self, tenant_id: &TenantId, skip: u64) -> Result<i64> {
        let take = usize::try_from(skip).unwrap_or(usize::MAX);

        let mut values = self.usage_values(tenant_id)?;
        values.reverse(); // newest first

        let mut sum = 0i64;
        for data in values.iter().take(take) {
            let event: UsageEvent = Self::deserialize(data)?;
            sum += event.credits_used;
        }
        Ok(sum)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use ops_ledger_core::OperationType;
    use tempfile::TempDir;

    fn create_test_store() -> (RocksStore, TempDir) {
        let dir = TempDir::new().unwrap();
        let store = RocksStore::open(dir.path()).unwrap();
        (store, dir)
    }

    fn provision(store: &RocksStore, name: &str, base_credit: i64) -> TenantAccount {
        let account = TenantAccount::new(TenantId::generate(), name.into(), base_credit);
        store.put_tenant(&account).unwrap();
        account
    }

    fn event(tenant_id: TenantId, delta: i64) -> UsageEvent {
        UsageEvent::new(tenant_id, delta, "/v2/lookup".into(), "POST".into())
    }

    fn entry(tenant: &TenantAccount, operation: OperationType, amount: i64) -> AuditEntry {
        AuditEntry::record(
            "ops@example.com".into(),
            tenant.tenant_id,
            tenant.name.clone(),
            operation,
            amount,
            0,
            amount,
            "test".into(),
        )
    }

    #[test]
    fn tenant_roundtrip() {
        let (store, _dir) = create_test_store();
        let account = provision(&store, "acme", 1000);

        let loaded = store.get_tenant(&account.tenant_id).unwrap().unwrap();
        assert_eq!(loaded.name, "acme");
        assert_eq!(loaded.base_credit, 1000);
        assert_eq!(loaded.credits_used, 0);

        assert!(store.get_tenant(&TenantId::generate()).unwrap().is_none());
    }

    #[test]
    fn update_counters_applies_when_snapshot_matches() {
        let (store, _dir) = create_test_store();
        let account = provision(&store, "acme", 1000);

        let updated = store
            .update_counters(
                &account.tenant_id,
                account.counters(),
                CounterSnapshot {
                    base_credit: 1500,
                    credits_used: 0,
                },
            )
            .unwrap();

        assert_eq!(updated.base_credit, 1500);
        assert_eq!(updated.available_credits(), 1500);
    }

    #[test]
    fn update_counters_rejects_stale_snapshot() {
        let (store, _dir) = create_test_store();
        let account = provision(&store, "acme", 1000);
        let stale = account.counters();

        // Someone else moves the counters first.
        store
            .update_counters(
                &account.tenant_id,
                stale,
                CounterSnapshot {
                    base_credit: 1200,
                    credits_used: 0,
                },
            )
            .unwrap();

        let result = store.update_counters(
            &account.tenant_id,
            stale,
            CounterSnapshot {
                base_credit: 1500,
                credits_used: 0,
            },
        );
        assert!(matches!(result, Err(StoreError::CounterConflict { .. })));

        // The first write survived untouched.
        let loaded = store.get_tenant(&account.tenant_id).unwrap().unwrap();
        assert_eq!(loaded.base_credit, 1200);
    }

    #[test]
    fn update_counters_missing_tenant() {
        let (store, _dir) = create_test_store();
        let snap = CounterSnapshot {
            base_credit: 0,
            credits_used: 0,
        };
        let result = store.update_counters(&TenantId::generate(), snap, snap);
        assert!(matches!(result, Err(StoreError::NotFound { .. })));
    }

    #[test]
    fn record_usage_increments_consumption() {
        let (store, _dir) = create_test_store();
        let account = provision(&store, "acme", 1000);

        let balance = store.record_usage(&event(account.tenant_id, 10)).unwrap();
        assert_eq!(balance, 990);

        let balance = store.record_usage(&event(account.tenant_id, 5)).unwrap();
        assert_eq!(balance, 985);

        let loaded = store.get_tenant(&account.tenant_id).unwrap().unwrap();
        assert_eq!(loaded.credits_used, 15);
        assert_eq!(store.count_usage_events(&account.tenant_id).unwrap(), 2);
    }

    #[test]
    fn record_usage_rejects_counter_overflow() {
        let (store, _dir) = create_test_store();
        let account = provision(&store, "acme", 1000);

        store
            .record_usage(&event(account.tenant_id, i64::MAX))
            .unwrap();

        let result = store.record_usage(&event(account.tenant_id, 1));
        assert!(matches!(result, Err(StoreError::CounterOverflow { .. })));

        // The failed ingest wrote nothing.
        let loaded = store.get_tenant(&account.tenant_id).unwrap().unwrap();
        assert_eq!(loaded.credits_used, i64::MAX);
        assert_eq!(store.count_usage_events(&account.tenant_id).unwrap(), 1);
    }

    #[test]
    fn usage_events_list_newest_first() {
        let (store, _dir) = create_test_store();
        let account = provision(&store, "acme", 1000);

        for delta in [10, 5, 20] {
            store.record_usage(&event(account.tenant_id, delta)).unwrap();
            std::thread::sleep(std::time::Duration::from_millis(2)); // distinct ULIDs
        }

        let events = store.list_usage_events(&account.tenant_id, 1, 10).unwrap();
        let deltas: Vec<i64> = events.iter().map(|e| e.credits_used).collect();
        assert_eq!(deltas, vec![20, 5, 10]);

        // Pagination cuts without reordering.
        let page1 = store.list_usage_events(&account.tenant_id, 1, 2).unwrap();
        let page2 = store.list_usage_events(&account.tenant_id, 2, 2).unwrap();
        assert_eq!(page1.len(), 2);
        assert_eq!(page2.len(), 1);
        assert_eq!(page1[0].credits_used, 20);
        assert_eq!(page2[0].credits_used, 10);
    }

    #[test]
    fn usage_events_isolated_per_tenant() {
        let (store, _dir) = create_test_store();
        let acme = provision(&store, "acme", 1000);
        let globex = provision(&store, "globex", 1000);

        store.record_usage(&event(acme.tenant_id, 10)).unwrap();
        store.record_usage(&event(globex.tenant_id, 99)).unwrap();

        let events = store.list_usage_events(&acme.tenant_id, 1, 10).unwrap();
        assert_eq!(events.len(), 1);
        assert_eq!(events[0].credits_used, 10);
    }

    #[test]
    fn sum_deltas_covers_newest_n_events() {
        let (store, _dir) = create_test_store();
        let account = provision(&store, "acme", 1000);

        for delta in [1, 2, 4, 8] {
            store.record_usage(&event(account.tenant_id, delta)).unwrap();
            std::thread::sleep(std::time::Duration::from_millis(2));
        }

        // Newest first the stream is [8, 4, 2, 1].
        assert_eq!(store.sum_deltas(&account.tenant_id, 0).unwrap(), 0);
        assert_eq!(store.sum_deltas(&account.tenant_id, 1).unwrap(), 8);
        assert_eq!(store.sum_deltas(&account.tenant_id, 3).unwrap(), 14);
        assert_eq!(store.sum_deltas(&account.tenant_id, 10).unwrap(), 15);
    }

    #[test]
    fn audit_query_newest_first_with_total() {
        let (store, _dir) = create_test_store();
        let acme = provision(&store, "Acme Corp", 1000);

        for amount in [100, 200, 300] {
            store
                .append_audit(&entry(&acme, OperationType::CreditAddition, amount))
                .unwrap();
            std::thread::sleep(std::time::Duration::from_millis(2));
        }

        let (entries, total) = store.query_audit(&AuditFilter::default(), 1, 2).unwrap();
        assert_eq!(total, 3);
        assert_eq!(entries.len(), 2);
        assert_eq!(entries[0].amount, 300);
        assert_eq!(entries[1].amount, 200);

        let (page2, _) = store.query_audit(&AuditFilter::default(), 2, 2).unwrap();
        assert_eq!(page2.len(), 1);
        assert_eq!(page2[0].amount, 100);
    }

    #[test]
    fn audit_query_filters_compose() {
        let (store, _dir) = create_test_store();
        let acme = provision(&store, "Acme Corp", 1000);
        let globex = provision(&store, "Globex", 1000);

        store
            .append_audit(&entry(&acme, OperationType::CreditAddition, 100))
            .unwrap();
        store
            .append_audit(&entry(&acme, OperationType::Refund, 50))
            .unwrap();
        store
            .append_audit(&entry(&globex, OperationType::CreditAddition, 70))
            .unwrap();

        // Text search matches tenant name, case-insensitively.
        let filter = AuditFilter {
            text: Some("acme".into()),
            ..AuditFilter::default()
        };
        let (entries, total) = store.query_audit(&filter, 1, 10).unwrap();
        assert_eq!(total, 2);
        assert!(entries.iter().all(|e| e.tenant_name == "Acme Corp"));

        // Text search also matches actor identity.
        let filter = AuditFilter {
            text: Some("OPS@EXAMPLE".into()),
            ..AuditFilter::default()
        };
        let (_, total) = store.query_audit(&filter, 1, 10).unwrap();
        assert_eq!(total, 3);

        // Operation filter composes with text.
        let filter = AuditFilter {
            text: Some("acme".into()),
            operation: Some(OperationType::Refund),
            ..AuditFilter::default()
        };
        let (entries, total) = store.query_audit(&filter, 1, 10).unwrap();
        assert_eq!(total, 1);
        assert_eq!(entries[0].amount, 50);
    }

    #[test]
    fn audit_query_date_range_is_inclusive() {
        let (store, _dir) = create_test_store();
        let acme = provision(&store, "acme", 1000);
        let e = entry(&acme, OperationType::CreditAddition, 100);
        store.append_audit(&e).unwrap();

        let filter = AuditFilter {
            start: Some(e.created_at),
            end: Some(e.created_at),
            ..AuditFilter::default()
        };
        let (_, total) = store.query_audit(&filter, 1, 10).unwrap();
        assert_eq!(total, 1);

        let filter = AuditFilter {
            start: Some(e.created_at + chrono::Duration::seconds(1)),
            ..AuditFilter::default()
        };
        let (_, total) = store.query_audit(&filter, 1, 10).unwrap();
        assert_eq!(total, 0);
    }

    #[test]
    fn tenant_audit_history_paginates() {
        let (store, _dir) = create_test_store();
        let acme = provision(&store, "acme", 1000);
        let globex = provision(&store, "globex", 1000);

        for amount in [1, 2, 3] {
            store
                .append_audit(&entry(&acme, OperationType::CreditAddition, amount))
                .unwrap();
            std::thread::sleep(std::time::Duration::from_millis(2));
        }
        store
            .append_audit(&entry(&globex, OperationType::CreditAddition, 9))
            .unwrap();

        let (entries, total) = store.list_audit_by_tenant(&acme.tenant_id, 1, 2).unwrap();
        assert_eq!(total, 3);
        assert_eq!(entries.len(), 2);
        assert_eq!(entries[0].amount, 3); // newest first

        let (page2, _) = store.list_audit_by_tenant(&acme.tenant_id, 2, 2).unwrap();
        assert_eq!(page2.len(), 1);
        assert_eq!(page2[0].amount, 1);
    }
}
