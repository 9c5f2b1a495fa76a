use serde::{Deserialize, Serialize};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum AppError {
    /// Required columns are missing from the CSV header.
    #[error("Missing required columns: {}", .0.join(", "))]
    Schema(Vec<String>),

    #[error("Parse error: {0}")]
    Parse(String),

    #[error("Validation error: {0}")]
    Validation(String),

    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Authentication credentials were not provided or are invalid")]
    Unauthorized,

    #[error("Storage error: {0}")]
    Storage(String),

    #[error("Database error: {0}")]
    Database(String),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Internal error: {0}")]
    Internal(String),
}

impl AppError {
    /// Whether the caller can fix the request and retry.
    pub fn is_user_error(&self) -> bool {
        matches!(
            self,
            AppError::Schema(_)
                | AppError::Parse(_)
                | AppError::Validation(_)
                | AppError::NotFound(_)
                | AppError::Unauthorized
        )
    }

    /// Message that is safe to put on the wire. Server-side failures are
    /// collapsed into a generic message so paths and SQL never leak.
    pub fn public_message(&self) -> String {
        if self.is_user_error() {
            self.to_string()
        } else {
            "Internal server error".to_string()
        }
    }
}

impl From<std::io::Error> for AppError {
    fn from(err: std::io::Error) -> Self {
        AppError::Storage(err.to_string())
    }
}

impl From<sqlx::Error> for AppError {
    fn from(err: sqlx::Error) -> Self {
        AppError::Database(err.to_string())
    }
}

/// Wire shape for every error response.
#[derive(Debug, Serialize, Deserialize)]
pub struct ErrorBody {
    pub error: String,
}

pub type Result<T> = std::result::Result<T, AppError>;
