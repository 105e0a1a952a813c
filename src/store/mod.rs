//! Record store contracts.
//!
//! One store instance per entity kind (users, sessions, role catalog).
//! Stores follow a read-all / mutate-one / write-all discipline with no
//! cross-operation locking: concurrent updates to different records are
//! safe, but two updates racing on the same record are last-writer-wins
//! and an interleaved change can be lost. Accepted for a single-operator,
//! non-clustered deployment; callers needing stronger guarantees must
//! serialize access externally.

mod jsonl;
mod memory;

pub use jsonl::JsonlStore;
pub use memory::MemoryStore;

use async_trait::async_trait;
use serde::de::DeserializeOwned;
use serde::Serialize;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("record not found: {id}")]
    RecordNotFound { id: String },
    #[error("duplicate record: {key}")]
    DuplicateRecord { key: String },
    #[error("store io: {0}")]
    Io(#[from] std::io::Error),
    #[error("store encoding: {0}")]
    Encoding(#[from] serde_json::Error),
}

pub type StoreResult<T> = Result<T, StoreError>;

/// A storable record with a stable string id and an optional secondary
/// unique key (users use their normalized email).
pub trait Record: Clone + Send + Sync + Serialize + DeserializeOwned + 'static {
    fn id(&self) -> &str;

    fn unique_key(&self) -> Option<String> {
        None
    }
}

#[async_trait]
pub trait RecordStore<T: Record>: Send + Sync {
    async fn list_all(&self) -> StoreResult<Vec<T>>;

    async fn get_by_id(&self, id: &str) -> StoreResult<Option<T>>;

    /// Insert a new record. Fails with [`StoreError::DuplicateRecord`] when
    /// the id or the secondary unique key is already taken.
    async fn append(&self, record: T) -> StoreResult<()>;

    /// Replace an existing record wholesale. Fails with
    /// [`StoreError::RecordNotFound`] when no record with that id exists.
    async fn update_by_id(&self, record: T) -> StoreResult<()>;
}

/// Uniqueness checks shared by the store implementations: `existing` is the
/// current snapshot, `record` the incoming one, `updating` whether an id
/// match is expected rather than a conflict.
pub(crate) fn check_unique<T: Record>(
    existing: &[T],
    record: &T,
    updating: bool,
) -> StoreResult<()> {
    let mut id_seen = false;
    for row in existing {
        if row.id() == record.id() {
            if !updating {
                return Err(StoreError::DuplicateRecord { key: record.id().to_string() });
            }
            id_seen = true;
            continue;
        }
        if let (Some(theirs), Some(ours)) = (row.unique_key(), record.unique_key()) {
            if theirs == ours {
                return Err(StoreError::DuplicateRecord { key: ours });
            }
        }
    }
    if updating && !id_seen {
        return Err(StoreError::RecordNotFound { id: record.id().to_string() });
    }
    Ok(())
}
