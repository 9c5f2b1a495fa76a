use std::sync::Arc;
use tracing::{info, warn};

use super::retention::RetentionPolicy;
use super::stats_engine::StatsEngine;
use crate::domain::dataset::{Dataset, NewDataset};
use crate::domain::error::{AppError, Result};
use crate::domain::stats::StatsResult;
use crate::infrastructure::csv::EquipmentCsvParser;
use crate::infrastructure::db::DatasetStore;
use crate::infrastructure::report::{report_file_name, ReportRenderer};

/// A rendered report ready to hand to the caller.
#[derive(Debug, Clone)]
pub struct RenderedReport {
    pub file_name: String,
    pub bytes: Vec<u8>,
}

/// Upload, history, stats and report operations over one dataset store.
pub struct DatasetService {
    store: Arc<dyn DatasetStore>,
    retention: RetentionPolicy,
    parser: EquipmentCsvParser,
    stats_engine: StatsEngine,
    renderer: ReportRenderer,
    max_upload_bytes: usize,
}

impl DatasetService {
    pub fn new(
        store: Arc<dyn DatasetStore>,
        retention_limit: usize,
        max_upload_bytes: usize,
    ) -> Result<Self> {
        Ok(Self {
            retention: RetentionPolicy::new(store.clone(), retention_limit)?,
            store,
            parser: EquipmentCsvParser::new(),
            stats_engine: StatsEngine::new(),
            renderer: ReportRenderer::new(),
            max_upload_bytes,
        })
    }

    pub fn max_upload_bytes(&self) -> usize {
        self.max_upload_bytes
    }

    pub fn retention_limit(&self) -> usize {
        self.retention.limit()
    }

    /// Store the upload, then trim history. The file is not parsed here;
    /// a malformed CSV is only reported when its stats are requested.
    pub async fn upload(&self, upload: NewDataset) -> Result<Dataset> {
        if upload.bytes.len() > self.max_upload_bytes {
            return Err(AppError::Validation(format!(
                "File is too large ({} bytes, limit {} bytes)",
                upload.bytes.len(),
                self.max_upload_bytes
            )));
        }

        let guard = self.retention.lock().await;
        let dataset = self.store.create(upload).await?;
        info!(
            id = dataset.id,
            original_name = %dataset.original_name,
            size = dataset.size_bytes,
            "Dataset uploaded"
        );

        if let Err(e) = self.retention.enforce_limit_locked(&guard).await {
            warn!(id = dataset.id, error = %e, "Retention enforcement failed after upload");
        }

        Ok(dataset)
    }

    pub async fn list(&self) -> Result<Vec<Dataset>> {
        self.store.list_ordered_by_recency_desc().await
    }

    pub async fn get(&self, id: i64) -> Result<Dataset> {
        self.store.get(id).await
    }

    pub async fn delete(&self, id: i64) -> Result<()> {
        let _guard = self.retention.lock().await;
        let dataset = self.store.get(id).await?;
        self.store.delete(&dataset).await?;
        info!(id, "Dataset deleted");
        Ok(())
    }

    pub async fn stats(&self, id: i64) -> Result<StatsResult> {
        let dataset = self.store.get(id).await?;
        let bytes = self.store.read_blob(&dataset).await?;
        let table = self.parser.parse(&bytes)?;
        Ok(self.stats_engine.compute(table))
    }

    pub async fn report(&self, id: i64) -> Result<RenderedReport> {
        let stats = self.stats(id).await?;
        let bytes = self.renderer.render(id, &stats)?;
        Ok(RenderedReport {
            file_name: report_file_name(id),
            bytes,
        })
    }

    /// Startup sweep for blobs left behind by an interrupted create or delete.
    pub async fn reconcile(&self) -> Result<usize> {
        let _guard = self.retention.lock().await;
        let removed = self.store.reconcile_orphans().await?;
        if removed > 0 {
            info!(removed, "Reconciled orphan blobs");
        }
        Ok(removed)
    }
}
