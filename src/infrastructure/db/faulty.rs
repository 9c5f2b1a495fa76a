use async_trait::async_trait;
use std::sync::atomic::{AtomicBool, Ordering};

use super::{DatasetStore, MemoryDatasetStore};
use crate::domain::dataset::{Dataset, NewDataset};
use crate::domain::error::{AppError, Result};

/// Memory store whose delete and list calls can be switched to fail.
#[derive(Default)]
pub struct FaultyStore {
    pub inner: MemoryDatasetStore,
    fail_delete: AtomicBool,
    fail_list: AtomicBool,
}

impl FaultyStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn fail_delete(&self, on: bool) {
        self.fail_delete.store(on, Ordering::SeqCst);
    }

    pub fn fail_list(&self, on: bool) {
        self.fail_list.store(on, Ordering::SeqCst);
    }
}

#[async_trait]
impl DatasetStore for FaultyStore {
    async fn create(&self, upload: NewDataset) -> Result<Dataset> {
        self.inner.create(upload).await
    }

    async fn get(&self, id: i64) -> Result<Dataset> {
        self.inner.get(id).await
    }

    async fn list_ordered_by_recency_desc(&self) -> Result<Vec<Dataset>> {
        if self.fail_list.load(Ordering::SeqCst) {
            return Err(AppError::Database("database is locked".to_string()));
        }
        self.inner.list_ordered_by_recency_desc().await
    }

    async fn delete(&self, dataset: &Dataset) -> Result<()> {
        if self.fail_delete.load(Ordering::SeqCst) {
            return Err(AppError::Storage(format!("Failed to remove blob {}", dataset.file)));
        }
        self.inner.delete(dataset).await
    }

    async fn read_blob(&self, dataset: &Dataset) -> Result<Vec<u8>> {
        self.inner.read_blob(dataset).await
    }

    async fn blob_exists(&self, dataset: &Dataset) -> Result<bool> {
        self.inner.blob_exists(dataset).await
    }

    async fn reconcile_orphans(&self) -> Result<usize> {
        self.inner.reconcile_orphans().await
    }
}
