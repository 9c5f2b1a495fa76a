use async_trait::async_trait;
use chrono::{DateTime, SecondsFormat, Utc};
use sqlx::sqlite::{
    SqliteConnectOptions, SqliteJournalMode, SqlitePool, SqlitePoolOptions, SqliteSynchronous,
};
use std::collections::HashSet;
use std::path::Path;
use std::str::FromStr;
use std::time::Duration;
use tracing::{debug, info, warn};

use super::DatasetStore;
use crate::domain::dataset::{Dataset, NewDataset};
use crate::domain::error::{AppError, Result};
use crate::infrastructure::storage::BlobStore;

const DATASETS_SCHEMA: &str = include_str!("../../../resources/schema.sql");

/// Dataset metadata in SQLite, blobs in a directory.
#[derive(Clone)]
pub struct SqliteDatasetStore {
    pool: SqlitePool,
    blobs: BlobStore,
}

impl SqliteDatasetStore {
    pub async fn connect(db_path: &Path, blobs: BlobStore) -> Result<Self> {
        let db_url = db_path_to_url(db_path)?;
        let options = SqliteConnectOptions::from_str(&db_url)
            .map_err(|e| AppError::Database(format!("Failed to parse datasets DB URL: {e}")))?
            .create_if_missing(true)
            .journal_mode(SqliteJournalMode::Wal)
            .synchronous(SqliteSynchronous::Normal)
            .busy_timeout(Duration::from_secs(5));

        let pool = SqlitePoolOptions::new()
            .max_connections(4)
            .acquire_timeout(Duration::from_secs(5))
            .connect_with(options)
            .await
            .map_err(|e| AppError::Database(format!("Failed to connect datasets DB: {e}")))?;

        apply_schema(&pool).await?;
        info!(db = %db_path.display(), blobs = %blobs.root().display(), "Dataset store ready");

        Ok(Self { pool, blobs })
    }

    pub fn blobs(&self) -> &BlobStore {
        &self.blobs
    }
}

#[async_trait]
impl DatasetStore for SqliteDatasetStore {
    async fn create(&self, upload: NewDataset) -> Result<Dataset> {
        let key = BlobStore::new_key();
        self.blobs.write(&key, &upload.bytes).await?;

        // Clamp to the newest existing timestamp so uploaded_at never goes
        // backwards, even if the wall clock does.
        let now = format_timestamp(Utc::now());
        let inserted = sqlx::query_as::<_, DatasetEntity>(
            "INSERT INTO datasets (file_name, original_name, size_bytes, uploaded_at) \
             VALUES (?, ?, ?, MAX(?, COALESCE((SELECT MAX(uploaded_at) FROM datasets), ''))) \
             RETURNING id, file_name, original_name, size_bytes, uploaded_at",
        )
        .bind(&key)
        .bind(&upload.original_name)
        .bind(upload.bytes.len() as i64)
        .bind(&now)
        .fetch_one(&self.pool)
        .await;

        let entity = match inserted {
            Ok(entity) => entity,
            Err(e) => {
                if let Err(cleanup) = self.blobs.remove(&key).await {
                    warn!(key = %key, error = %cleanup, "Failed to remove blob of rejected dataset");
                }
                return Err(AppError::Database(format!("Failed to insert dataset: {e}")));
            }
        };

        let dataset = Dataset::from(entity);
        debug!(id = dataset.id, file = %dataset.file, "Dataset created");
        Ok(dataset)
    }

    async fn get(&self, id: i64) -> Result<Dataset> {
        let row = sqlx::query_as::<_, DatasetEntity>(
            "SELECT id, file_name, original_name, size_bytes, uploaded_at FROM datasets WHERE id = ?",
        )
        .bind(id)
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| AppError::Database(format!("Failed to fetch dataset: {e}")))?;

        match row {
            Some(entity) => Ok(Dataset::from(entity)),
            None => Err(AppError::NotFound(format!("Dataset {} does not exist", id))),
        }
    }

    async fn list_ordered_by_recency_desc(&self) -> Result<Vec<Dataset>> {
        let rows = sqlx::query_as::<_, DatasetEntity>(
            "SELECT id, file_name, original_name, size_bytes, uploaded_at FROM datasets \
             ORDER BY uploaded_at DESC, id DESC",
        )
        .fetch_all(&self.pool)
        .await
        .map_err(|e| AppError::Database(format!("Failed to list datasets: {e}")))?;

        Ok(rows.into_iter().map(Dataset::from).collect())
    }

    async fn delete(&self, dataset: &Dataset) -> Result<()> {
        let result = sqlx::query("DELETE FROM datasets WHERE id = ?")
            .bind(dataset.id)
            .execute(&self.pool)
            .await
            .map_err(|e| AppError::Database(format!("Failed to delete dataset: {e}")))?;

        let removed_blob = self.blobs.remove(&dataset.file).await?;
        debug!(
            id = dataset.id,
            record = result.rows_affected(),
            blob = removed_blob,
            "Dataset deleted"
        );
        Ok(())
    }

    async fn read_blob(&self, dataset: &Dataset) -> Result<Vec<u8>> {
        self.blobs.read(&dataset.file).await
    }

    async fn blob_exists(&self, dataset: &Dataset) -> Result<bool> {
        self.blobs.exists(&dataset.file).await
    }

    async fn reconcile_orphans(&self) -> Result<usize> {
        let referenced: HashSet<String> = sqlx::query_scalar::<_, String>("SELECT file_name FROM datasets")
            .fetch_all(&self.pool)
            .await
            .map_err(|e| AppError::Database(format!("Failed to list dataset files: {e}")))?
            .into_iter()
            .collect();

        let mut removed = 0;
        for key in self.blobs.list_keys().await? {
            if referenced.contains(&key) {
                continue;
            }
            if self.blobs.remove(&key).await? {
                removed += 1;
                info!(key = %key, temp = BlobStore::is_temp_key(&key), "Removed orphan blob");
            }
        }
        Ok(removed)
    }
}

async fn apply_schema(pool: &SqlitePool) -> Result<()> {
    for statement in DATASETS_SCHEMA.split(';') {
        let stmt = statement.trim();
        if stmt.is_empty() {
            continue;
        }
        sqlx::query(stmt)
            .execute(pool)
            .await
            .map_err(|e| AppError::Database(format!("Failed to apply datasets schema: {e}")))?;
    }
    Ok(())
}

fn db_path_to_url(db_path: &Path) -> Result<String> {
    let db_path_str = db_path
        .to_str()
        .ok_or_else(|| AppError::Database("Datasets DB path is not valid UTF-8".to_string()))?;

    Ok(format!("sqlite://{}", db_path_str.replace('\\', "/")))
}

/// Fixed-width UTC so text order equals time order.
fn format_timestamp(at: DateTime<Utc>) -> String {
    at.to_rfc3339_opts(SecondsFormat::Micros, true)
}

/// `uploaded_at` is stored as RFC 3339 text and decoded by sqlx's chrono support.
#[derive(sqlx::FromRow)]
struct DatasetEntity {
    id: i64,
    file_name: String,
    original_name: String,
    size_bytes: i64,
    uploaded_at: DateTime<Utc>,
}

impl From<DatasetEntity> for Dataset {
    fn from(entity: DatasetEntity) -> Self {
        Self {
            id: entity.id,
            file: entity.file_name,
            original_name: entity.original_name,
            size_bytes: entity.size_bytes,
            uploaded_at: entity.uploaded_at,
        }
    }
}
