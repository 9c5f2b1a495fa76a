use async_trait::async_trait;
use chrono::{DateTime, SubsecRound, Utc};
use std::collections::HashMap;
use std::sync::{Mutex, MutexGuard};

use super::DatasetStore;
use crate::domain::dataset::{Dataset, NewDataset};
use crate::domain::error::{AppError, Result};
use crate::infrastructure::storage::BlobStore;

#[derive(Default)]
struct MemoryState {
    next_id: i64,
    records: Vec<Dataset>,
    blobs: HashMap<String, Vec<u8>>,
}

/// In-process backend with the same ordering and cleanup rules as the
/// SQLite store. Nothing survives a restart.
#[derive(Default)]
pub struct MemoryDatasetStore {
    state: Mutex<MemoryState>,
    /// Pinned clock for deterministic tests; `None` uses the wall clock.
    fixed_now: Option<DateTime<Utc>>,
}

impl MemoryDatasetStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Every upload gets the same timestamp, so ordering falls to ids.
    pub fn with_fixed_clock(now: DateTime<Utc>) -> Self {
        Self {
            state: Mutex::new(MemoryState::default()),
            fixed_now: Some(now),
        }
    }

    /// Insert a blob with no record, as a crash between the two steps would.
    pub fn insert_orphan_blob(&self, key: &str, bytes: &[u8]) -> Result<()> {
        self.lock()?.blobs.insert(key.to_string(), bytes.to_vec());
        Ok(())
    }

    /// Remove only the blob, leaving its record behind.
    pub fn drop_blob(&self, key: &str) -> Result<bool> {
        Ok(self.lock()?.blobs.remove(key).is_some())
    }

    pub fn blob_count(&self) -> Result<usize> {
        Ok(self.lock()?.blobs.len())
    }

    fn lock(&self) -> Result<MutexGuard<'_, MemoryState>> {
        self.state
            .lock()
            .map_err(|_| AppError::Internal("Memory dataset store lock poisoned".to_string()))
    }

    fn now(&self) -> DateTime<Utc> {
        self.fixed_now.unwrap_or_else(|| Utc::now().trunc_subsecs(6))
    }
}

#[async_trait]
impl DatasetStore for MemoryDatasetStore {
    async fn create(&self, upload: NewDataset) -> Result<Dataset> {
        let now = self.now();
        let mut state = self.lock()?;

        let key = BlobStore::new_key();
        let size_bytes = upload.bytes.len() as i64;
        state.blobs.insert(key.clone(), upload.bytes);

        let latest = state.records.iter().map(|d| d.uploaded_at).max();
        state.next_id += 1;
        let dataset = Dataset {
            id: state.next_id,
            file: key,
            original_name: upload.original_name,
            size_bytes,
            uploaded_at: latest.map_or(now, |latest| latest.max(now)),
        };
        state.records.push(dataset.clone());
        Ok(dataset)
    }

    async fn get(&self, id: i64) -> Result<Dataset> {
        self.lock()?
            .records
            .iter()
            .find(|d| d.id == id)
            .cloned()
            .ok_or_else(|| AppError::NotFound(format!("Dataset {} does not exist", id)))
    }

    async fn list_ordered_by_recency_desc(&self) -> Result<Vec<Dataset>> {
        let mut records = self.lock()?.records.clone();
        records.sort_by(|a, b| {
            b.uploaded_at
                .cmp(&a.uploaded_at)
                .then_with(|| b.id.cmp(&a.id))
        });
        Ok(records)
    }

    async fn delete(&self, dataset: &Dataset) -> Result<()> {
        let mut state = self.lock()?;
        state.records.retain(|d| d.id != dataset.id);
        state.blobs.remove(&dataset.file);
        Ok(())
    }

    async fn read_blob(&self, dataset: &Dataset) -> Result<Vec<u8>> {
        self.lock()?
            .blobs
            .get(&dataset.file)
            .cloned()
            .ok_or_else(|| AppError::Storage(format!("Blob {} is missing", dataset.file)))
    }

    async fn blob_exists(&self, dataset: &Dataset) -> Result<bool> {
        Ok(self.lock()?.blobs.contains_key(&dataset.file))
    }

    async fn reconcile_orphans(&self) -> Result<usize> {
        let mut state = self.lock()?;
        let MemoryState { records, blobs, .. } = &mut *state;
        let before = blobs.len();
        blobs.retain(|key, _| records.iter().any(|d| &d.file == key));
        Ok(before - blobs.len())
    }
}
