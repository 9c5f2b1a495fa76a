#[cfg(test)]
pub(crate) mod faulty;
pub mod memory;
pub mod sqlite;

use async_trait::async_trait;

use crate::domain::dataset::{Dataset, NewDataset};
use crate::domain::error::Result;

pub use memory::MemoryDatasetStore;
pub use sqlite::SqliteDatasetStore;

/// Persistence for uploaded datasets: a metadata record plus the CSV blob
/// it points to.
///
/// Implementations keep both halves in step. `create` writes the blob before
/// the record and `delete` removes the record before the blob, so a crash in
/// between can only leave an orphan blob, which `reconcile_orphans` sweeps.
#[async_trait]
pub trait DatasetStore: Send + Sync {
    async fn create(&self, upload: NewDataset) -> Result<Dataset>;

    /// `NotFound` when no record has this id.
    async fn get(&self, id: i64) -> Result<Dataset>;

    /// Newest first; equal timestamps are ordered by descending id.
    async fn list_ordered_by_recency_desc(&self) -> Result<Vec<Dataset>>;

    /// Removes the record, then the blob. Either being absent already is not an error.
    async fn delete(&self, dataset: &Dataset) -> Result<()>;

    async fn read_blob(&self, dataset: &Dataset) -> Result<Vec<u8>>;

    async fn blob_exists(&self, dataset: &Dataset) -> Result<bool>;

    /// Deletes blobs no record refers to. Returns how many were removed.
    async fn reconcile_orphans(&self) -> Result<usize>;
}
