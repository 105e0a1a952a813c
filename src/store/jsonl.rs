//! Append-only JSON-lines record store.
//!
//! Every append or update writes one full-record line at the end of the
//! file; `list_all` replays the file with last-record-wins per id. The
//! file is never rewritten in place, so a crash mid-write loses at most
//! the trailing line. Compaction is out of scope.

use std::collections::HashMap;
use std::marker::PhantomData;
use std::path::{Path, PathBuf};

use async_trait::async_trait;
use tokio::fs::OpenOptions;
use tokio::io::AsyncWriteExt;

use super::{check_unique, Record, RecordStore, StoreError, StoreResult};

pub struct JsonlStore<T> {
    path: PathBuf,
    _marker: PhantomData<fn() -> T>,
}

impl<T: Record> JsonlStore<T> {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into(), _marker: PhantomData }
    }

    /// Conventional location: `<dir>/<name>.jsonl`.
    pub fn in_dir(dir: &Path, name: &str) -> Self {
        Self::new(dir.join(format!("{name}.jsonl")))
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    async fn replay(&self) -> StoreResult<Vec<T>> {
        let raw = match tokio::fs::read_to_string(&self.path).await {
            Ok(s) => s,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(Vec::new()),
            Err(e) => return Err(e.into()),
        };
        // Last line for an id wins, first-seen order preserved.
        let mut rows: Vec<T> = Vec::new();
        let mut index: HashMap<String, usize> = HashMap::new();
        for line in raw.lines() {
            let line = line.trim();
            if line.is_empty() {
                continue;
            }
            let record: T = serde_json::from_str(line)?;
            match index.get(record.id()) {
                Some(&i) => rows[i] = record,
                None => {
                    index.insert(record.id().to_string(), rows.len());
                    rows.push(record);
                }
            }
        }
        Ok(rows)
    }

    async fn append_line(&self, record: &T) -> StoreResult<()> {
        if let Some(dir) = self.path.parent() {
            tokio::fs::create_dir_all(dir).await?;
        }
        let mut line = serde_json::to_string(record)?;
        line.push('\n');
        let mut f = OpenOptions::new().create(true).append(true).open(&self.path).await?;
        f.write_all(line.as_bytes()).await?;
        f.flush().await?;
        Ok(())
    }
}

#[async_trait]
impl<T: Record> RecordStore<T> for JsonlStore<T> {
    async fn list_all(&self) -> StoreResult<Vec<T>> {
        self.replay().await
    }

    async fn get_by_id(&self, id: &str) -> StoreResult<Option<T>> {
        Ok(self.replay().await?.into_iter().find(|r| r.id() == id))
    }

    async fn append(&self, record: T) -> StoreResult<()> {
        let existing = self.replay().await?;
        check_unique(&existing, &record, false)?;
        self.append_line(&record).await
    }

    async fn update_by_id(&self, record: T) -> StoreResult<()> {
        let existing = self.replay().await?;
        check_unique(&existing, &record, true)?;
        self.append_line(&record).await
    }
}
