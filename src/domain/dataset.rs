use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Multipart field that carries the CSV on upload.
pub const UPLOAD_FIELD: &str = "file";

/// Metadata for one retained upload. The CSV itself lives in the blob
/// store under `file`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Dataset {
    pub id: i64,
    /// Blob key of the stored CSV.
    pub file: String,
    pub original_name: String,
    pub size_bytes: i64,
    pub uploaded_at: DateTime<Utc>,
}

/// An upload that has not been stored yet.
#[derive(Debug, Clone)]
pub struct NewDataset {
    pub original_name: String,
    pub bytes: Vec<u8>,
}

impl NewDataset {
    pub fn new(original_name: &str, bytes: Vec<u8>) -> Self {
        Self {
            original_name: sanitize_file_name(original_name),
            bytes,
        }
    }
}

/// Keep only the final path segment of a client-supplied file name.
fn sanitize_file_name(name: &str) -> String {
    let base = name
        .rsplit(&['/', '\\'][..])
        .next()
        .unwrap_or_default()
        .trim();

    if base.is_empty() || base == "." || base == ".." {
        "upload.csv".to_string()
    } else {
        base.to_string()
    }
}
