//! Bounded upload history.
//!
//! After every create the store is trimmed back to the `limit` most recent
//! datasets. Eviction is cleanup, not part of the upload: failures are
//! logged and the upload still succeeds.

use std::sync::Arc;
use tokio::sync::{Mutex, MutexGuard};
use tracing::{info, warn};

use crate::domain::dataset::Dataset;
use crate::domain::error::{AppError, Result};
use crate::infrastructure::db::DatasetStore;

pub const DEFAULT_RETENTION_LIMIT: usize = 5;

/// Outcome of one enforcement pass.
#[derive(Debug, Default, Clone, PartialEq)]
pub struct EvictionReport {
    pub evicted: Vec<i64>,
    pub failed: Vec<i64>,
}

impl EvictionReport {
    pub fn is_noop(&self) -> bool {
        self.evicted.is_empty() && self.failed.is_empty()
    }
}

pub struct RetentionPolicy {
    store: Arc<dyn DatasetStore>,
    limit: usize,
    /// Serializes create + enforce per store; list-then-delete is not atomic.
    write_lock: Mutex<()>,
}

impl RetentionPolicy {
    pub fn new(store: Arc<dyn DatasetStore>, limit: usize) -> Result<Self> {
        if limit == 0 {
            return Err(AppError::Config(
                "Retention limit must keep at least one dataset".to_string(),
            ));
        }
        Ok(Self {
            store,
            limit,
            write_lock: Mutex::new(()),
        })
    }

    pub fn limit(&self) -> usize {
        self.limit
    }

    /// Hold this across a create and the following `enforce_limit_locked`.
    pub async fn lock(&self) -> MutexGuard<'_, ()> {
        self.write_lock.lock().await
    }

    pub async fn enforce_limit(&self) -> Result<EvictionReport> {
        let guard = self.lock().await;
        self.enforce_limit_locked(&guard).await
    }

    /// Deletes every dataset past position `limit` in recency order, under
    /// the guard returned by [`RetentionPolicy::lock`].
    ///
    /// Only listing the store can fail the pass; individual deletions are
    /// best-effort and reported in `failed`.
    pub async fn enforce_limit_locked(
        &self,
        _guard: &MutexGuard<'_, ()>,
    ) -> Result<EvictionReport> {
        let datasets = self.store.list_ordered_by_recency_desc().await?;
        let mut report = EvictionReport::default();

        for dataset in datasets.iter().skip(self.limit) {
            match self.evict(dataset).await {
                Ok(()) => report.evicted.push(dataset.id),
                Err(e) => {
                    warn!(id = dataset.id, error = %e, "Failed to evict dataset");
                    report.failed.push(dataset.id);
                }
            }
        }

        if !report.evicted.is_empty() {
            info!(
                evicted = ?report.evicted,
                limit = self.limit,
                "Evicted datasets beyond retention limit"
            );
        }
        Ok(report)
    }

    async fn evict(&self, dataset: &Dataset) -> Result<()> {
        self.store.delete(dataset).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::dataset::NewDataset;
    use crate::infrastructure::db::faulty::FaultyStore;
    use crate::infrastructure::db::MemoryDatasetStore;
    use chrono::{TimeZone, Utc};

    async fn upload(store: &Arc<MemoryDatasetStore>, policy: &RetentionPolicy, name: &str) -> Dataset {
        let guard = policy.lock().await;
        let ds = store
            .create(NewDataset::new(name, name.as_bytes().to_vec()))
            .await
            .unwrap();
        policy.enforce_limit_locked(&guard).await.unwrap();
        ds
    }

    fn setup(limit: usize) -> (Arc<MemoryDatasetStore>, RetentionPolicy) {
        let store = Arc::new(MemoryDatasetStore::new());
        let policy = RetentionPolicy::new(store.clone(), limit).unwrap();
        (store, policy)
    }

    #[tokio::test]
    async fn sixth_upload_evicts_the_oldest() {
        let (store, policy) = setup(DEFAULT_RETENTION_LIMIT);

        let mut created = Vec::new();
        for i in 0..6 {
            created.push(upload(&store, &policy, &format!("{i}.csv")).await);
        }

        let remaining = store.list_ordered_by_recency_desc().await.unwrap();
        assert_eq!(remaining.len(), 5);
        assert!(remaining.iter().all(|d| d.id != created[0].id));
        assert_eq!(remaining[0].id, created[5].id);
        assert!(!store.blob_exists(&created[0]).await.unwrap());
        assert_eq!(store.blob_count().unwrap(), 5);
    }

    #[tokio::test]
    async fn history_never_exceeds_limit() {
        let (store, policy) = setup(3);
        for i in 0..10 {
            let newest = upload(&store, &policy, &format!("{i}.csv")).await;
            let listed = store.list_ordered_by_recency_desc().await.unwrap();
            assert!(listed.len() <= 3);
            assert_eq!(listed[0].id, newest.id, "just-created dataset must survive");
        }
    }

    #[tokio::test]
    async fn enforcing_twice_is_idempotent() {
        let (store, policy) = setup(2);
        for i in 0..4 {
            store
                .create(NewDataset::new(&format!("{i}.csv"), vec![]))
                .await
                .unwrap();
        }

        let first = policy.enforce_limit().await.unwrap();
        assert_eq!(first.evicted.len(), 2);
        let after_first = store.list_ordered_by_recency_desc().await.unwrap();

        let second = policy.enforce_limit().await.unwrap();
        assert!(second.is_noop());
        assert_eq!(store.list_ordered_by_recency_desc().await.unwrap(), after_first);
    }

    #[tokio::test]
    async fn equal_timestamps_evict_lowest_ids() {
        let at = Utc.with_ymd_and_hms(2026, 3, 1, 8, 30, 0).unwrap();
        let store = Arc::new(MemoryDatasetStore::with_fixed_clock(at));
        let policy = RetentionPolicy::new(store.clone(), 2).unwrap();

        let mut ids = Vec::new();
        for i in 0..4 {
            ids.push(upload(&store, &policy, &format!("{i}.csv")).await.id);
        }

        let remaining: Vec<_> = store
            .list_ordered_by_recency_desc()
            .await
            .unwrap()
            .iter()
            .map(|d| d.id)
            .collect();
        assert_eq!(remaining, vec![ids[3], ids[2]]);
    }

    #[tokio::test]
    async fn missing_blob_does_not_fail_enforcement() {
        let (store, policy) = setup(1);
        let old = store.create(NewDataset::new("old.csv", vec![1])).await.unwrap();
        store.create(NewDataset::new("new.csv", vec![2])).await.unwrap();

        // blob vanished out from under the record
        assert!(store.drop_blob(&old.file).unwrap());
        let report = policy.enforce_limit().await.unwrap();
        assert_eq!(report.evicted, vec![old.id]);
        assert!(report.failed.is_empty());
        assert_eq!(store.list_ordered_by_recency_desc().await.unwrap().len(), 1);
    }

    #[tokio::test]
    async fn failed_deletes_are_reported_not_raised() {
        let store = Arc::new(FaultyStore::new());
        let policy = RetentionPolicy::new(store.clone(), 2).unwrap();
        let mut created = Vec::new();
        for i in 0..4 {
            created.push(store.create(NewDataset::new(&format!("{i}.csv"), vec![])).await.unwrap());
        }

        store.fail_delete(true);
        let report = policy.enforce_limit().await.unwrap();
        assert!(report.evicted.is_empty());
        assert_eq!(report.failed, vec![created[1].id, created[0].id]);
        assert_eq!(store.list_ordered_by_recency_desc().await.unwrap().len(), 4);

        store.fail_delete(false);
        let report = policy.enforce_limit().await.unwrap();
        assert_eq!(report.evicted, vec![created[1].id, created[0].id]);
        assert!(report.failed.is_empty());
    }

    #[tokio::test]
    async fn listing_failure_fails_the_pass() {
        let store = Arc::new(FaultyStore::new());
        let policy = RetentionPolicy::new(store.clone(), 1).unwrap();
        store.fail_list(true);
        assert!(matches!(policy.enforce_limit().await, Err(AppError::Database(_))));
    }

    #[test]
    fn zero_limit_is_rejected() {
        let store: Arc<dyn DatasetStore> = Arc::new(MemoryDatasetStore::new());
        assert!(matches!(RetentionPolicy::new(store, 0), Err(AppError::Config(_))));
    }

    #[tokio::test]
    async fn concurrent_uploads_respect_limit() {
        let (store, policy) = setup(5);
        let policy = Arc::new(policy);

        let mut handles = Vec::new();
        for i in 0..20 {
            let store = store.clone();
            let policy = policy.clone();
            handles.push(tokio::spawn(async move {
                upload(&store, &policy, &format!("{i}.csv")).await;
            }));
        }
        for handle in handles {
            handle.await.unwrap();
        }

        assert_eq!(store.list_ordered_by_recency_desc().await.unwrap().len(), 5);
        assert_eq!(store.blob_count().unwrap(), 5);
    }
}
