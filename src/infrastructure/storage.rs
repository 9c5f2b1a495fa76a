use std::path::{Path, PathBuf};
use tokio::fs;
use tokio::io::AsyncWriteExt;
use tracing::debug;
use uuid::Uuid;

use crate::domain::error::{AppError, Result};

const BLOB_EXTENSION: &str = "csv";
const TEMP_MARKER: &str = ".tmp-";

/// Directory of uploaded CSV files, one file per dataset.
#[derive(Debug, Clone)]
pub struct BlobStore {
    root: PathBuf,
}

impl BlobStore {
    pub async fn open(root: impl Into<PathBuf>) -> Result<Self> {
        let root = root.into();
        ensure_dir(&root).await?;
        Ok(Self { root })
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Fresh, collision-free key for a new upload.
    pub fn new_key() -> String {
        format!("{}.{}", Uuid::new_v4(), BLOB_EXTENSION)
    }

    /// Write via a temp file and rename so a crash never leaves a
    /// half-written blob under a real key.
    pub async fn write(&self, key: &str, bytes: &[u8]) -> Result<()> {
        let path = self.path_for(key)?;
        let tmp_path = self
            .root
            .join(format!("{}{}{}", key, TEMP_MARKER, Uuid::new_v4()));

        {
            let mut file = fs::File::create(&tmp_path).await.map_err(|e| {
                AppError::Storage(format!("Failed to create temp file {}: {e}", tmp_path.display()))
            })?;
            file.write_all(bytes).await.map_err(|e| {
                AppError::Storage(format!("Failed to write temp file {}: {e}", tmp_path.display()))
            })?;
            file.sync_all().await.ok();
        }

        if let Err(e) = fs::rename(&tmp_path, &path).await {
            let _ = fs::remove_file(&tmp_path).await;
            return Err(AppError::Storage(format!(
                "Failed to move blob into place {}: {e}",
                path.display()
            )));
        }

        debug!(key, size = bytes.len(), "Blob written");
        Ok(())
    }

    pub async fn read(&self, key: &str) -> Result<Vec<u8>> {
        let path = self.path_for(key)?;
        fs::read(&path)
            .await
            .map_err(|e| AppError::Storage(format!("Failed to read blob {}: {e}", path.display())))
    }

    /// Remove a blob. Returns `false` when it was already gone.
    pub async fn remove(&self, key: &str) -> Result<bool> {
        let path = self.path_for(key)?;
        match fs::remove_file(&path).await {
            Ok(()) => Ok(true),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(false),
            Err(e) => Err(AppError::Storage(format!(
                "Failed to remove blob {}: {e}",
                path.display()
            ))),
        }
    }

    pub async fn exists(&self, key: &str) -> Result<bool> {
        let path = self.path_for(key)?;
        Ok(fs::try_exists(&path).await?)
    }

    /// Every file name in the blob directory, temp files included.
    pub async fn list_keys(&self) -> Result<Vec<String>> {
        let mut keys = Vec::new();
        let mut entries = fs::read_dir(&self.root).await?;
        while let Some(entry) = entries.next_entry().await? {
            if !entry.file_type().await?.is_file() {
                continue;
            }
            if let Some(name) = entry.file_name().to_str() {
                keys.push(name.to_string());
            }
        }
        keys.sort();
        Ok(keys)
    }

    pub fn is_temp_key(key: &str) -> bool {
        key.contains(TEMP_MARKER)
    }

    fn path_for(&self, key: &str) -> Result<PathBuf> {
        let valid = !key.is_empty()
            && key != "."
            && key != ".."
            && !key.contains(['/', '\\'])
            && Path::new(key).file_name().is_some();
        if !valid {
            return Err(AppError::Storage(format!("Invalid blob key: {key}")));
        }
        Ok(self.root.join(key))
    }
}

pub async fn ensure_dir(path: &Path) -> Result<()> {
    fs::create_dir_all(path).await.map_err(|e| {
        AppError::Storage(format!("Failed to create dir {}: {e}", path.display()))
    })
}
