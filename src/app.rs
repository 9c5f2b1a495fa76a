use std::sync::Arc;

use tracing::info;
use tracing_subscriber::EnvFilter;

use crate::application::DatasetService;
use crate::domain::error::{AppError, Result};
use crate::infrastructure::config::AppConfig;
use crate::infrastructure::db::SqliteDatasetStore;
use crate::infrastructure::storage::BlobStore;
use crate::interfaces::http::start_server;

/// Open the stores, clean up after any interrupted write and serve the API
/// until shutdown.
pub async fn run() -> Result<()> {
    let config = AppConfig::load()?;

    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(config.log_filter()));
    let _ = tracing_subscriber::fmt().with_env_filter(filter).try_init();

    let blobs = BlobStore::open(config.storage.blob_dir()).await?;
    let store = SqliteDatasetStore::connect(&config.storage.database_path(), blobs).await?;
    info!(
        retention_limit = config.retention.limit,
        max_upload_bytes = config.upload.max_bytes,
        auth = config.auth.is_some(),
        "Configuration loaded"
    );

    let service = Arc::new(DatasetService::new(
        Arc::new(store),
        config.retention.limit,
        config.upload.max_bytes,
    )?);
    service.reconcile().await?;

    let server = start_server(&config, service)
        .map_err(|e| AppError::Internal(format!("Failed to start HTTP server: {}", e)))?;
    server
        .await
        .map_err(|e| AppError::Internal(format!("HTTP server stopped with error: {}", e)))?;

    info!("Server shut down");
    Ok(())
}
