//! In-memory record store with the same semantics as the file-backed one.
//! Used by unit tests and embedders that do not want files on disk.

use async_trait::async_trait;
use parking_lot::RwLock;

use super::{check_unique, Record, RecordStore, StoreResult};

#[derive(Default)]
pub struct MemoryStore<T> {
    rows: RwLock<Vec<T>>,
}

impl<T: Record> MemoryStore<T> {
    pub fn new() -> Self {
        Self { rows: RwLock::new(Vec::new()) }
    }

    pub fn with_records(rows: Vec<T>) -> Self {
        Self { rows: RwLock::new(rows) }
    }
}

#[async_trait]
impl<T: Record> RecordStore<T> for MemoryStore<T> {
    async fn list_all(&self) -> StoreResult<Vec<T>> {
        Ok(self.rows.read().clone())
    }

    async fn get_by_id(&self, id: &str) -> StoreResult<Option<T>> {
        Ok(self.rows.read().iter().find(|r| r.id() == id).cloned())
    }

    async fn append(&self, record: T) -> StoreResult<()> {
        let mut rows = self.rows.write();
        check_unique(&rows, &record, false)?;
        rows.push(record);
        Ok(())
    }

    async fn update_by_id(&self, record: T) -> StoreResult<()> {
        let mut rows = self.rows.write();
        check_unique(&rows, &record, true)?;
        if let Some(slot) = rows.iter_mut().find(|r| r.id() == record.id()) {
            *slot = record;
        }
        Ok(())
    }
}
