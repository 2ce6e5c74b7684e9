//! Persisted demand records.

use std::sync::Arc;

use parking_lot::Mutex;
use tracing::debug;
use uuid::Uuid;

use auth_service_lib::infra::{read_json, write_json, KeyValueStore};
use common::{AppResult, OptionExt};
use domain::DemandRecord;

#[cfg(any(test, feature = "test-utils"))]
use mockall::automock;

/// Demand repository trait for dependency injection.
#[cfg_attr(any(test, feature = "test-utils"), automock)]
pub trait DemandRepository: Send + Sync {
    /// Every stored record, oldest first
    fn list(&self) -> AppResult<Vec<DemandRecord>>;

    fn find_by_id(&self, id: Uuid) -> AppResult<Option<DemandRecord>>;

    /// Append a record
    fn insert(&self, record: DemandRecord) -> AppResult<DemandRecord>;

    /// Remove a record, returning it
    fn delete(&self, id: Uuid) -> AppResult<DemandRecord>;

    /// Remove every record, returning how many there were
    fn clear(&self) -> AppResult<usize>;
}

/// Concrete implementation of DemandRepository over a key/value store.
pub struct DemandStore {
    kv: Arc<dyn KeyValueStore>,
    key: String,
    write_lock: Mutex<()>,
}

impl DemandStore {
    pub fn new(kv: Arc<dyn KeyValueStore>, key: impl Into<String>) -> Self {
        Self {
            kv,
            key: key.into(),
            write_lock: Mutex::new(()),
        }
    }

    fn load(&self) -> AppResult<Vec<DemandRecord>> {
        Ok(read_json(self.kv.as_ref(), &self.key)?.unwrap_or_default())
    }

    fn save(&self, records: &[DemandRecord]) -> AppResult<()> {
        write_json(self.kv.as_ref(), &self.key, records)?;
        debug!(count = records.len(), "demand records saved");
        Ok(())
    }
}

impl DemandRepository for DemandStore {
    fn list(&self) -> AppResult<Vec<DemandRecord>> {
        self.load()
    }

    fn find_by_id(&self, id: Uuid) -> AppResult<Option<DemandRecord>> {
        Ok(self.load()?.into_iter().find(|r| r.id == id))
    }

    fn insert(&self, record: DemandRecord) -> AppResult<DemandRecord> {
        let _guard = self.write_lock.lock();
        let mut records = self.load()?;
        records.push(record.clone());
        self.save(&records)?;
        Ok(record)
    }

    fn delete(&self, id: Uuid) -> AppResult<DemandRecord> {
        let _guard = self.write_lock.lock();
        let mut records = self.load()?;

        let index = records
            .iter()
            .position(|r| r.id == id)
            .ok_or_not_found("Demand record")?;
        let removed = records.remove(index);
        self.save(&records)?;

        Ok(removed)
    }

    fn clear(&self) -> AppResult<usize> {
        let _guard = self.write_lock.lock();
        let count = self.load()?.len();
        self.kv.remove(&self.key)?;
        Ok(count)
    }
}
