use figment::providers::{Env, Format, Serialized, Toml};
use figment::Figment;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use validator::Validate;

use crate::application::DEFAULT_RETENTION_LIMIT;
use crate::domain::error::{AppError, Result};

pub const ENV_PREFIX: &str = "EQUIVIEW_";
pub const CONFIG_PATH_ENV: &str = "EQUIVIEW_CONFIG";
pub const DEFAULT_CONFIG_FILE: &str = "equiview.toml";

#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
pub struct ServerConfig {
    pub host: String,
    #[validate(range(min = 1))]
    pub port: u16,
    /// Allow any origin; the web dashboard is usually served from another port.
    pub cors_permissive: bool,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: "127.0.0.1".to_string(),
            port: 8000,
            cors_permissive: true,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StorageConfig {
    pub data_dir: PathBuf,
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            data_dir: PathBuf::from("./data"),
        }
    }
}

impl StorageConfig {
    pub fn database_path(&self) -> PathBuf {
        self.data_dir.join("equiview.db")
    }

    pub fn blob_dir(&self) -> PathBuf {
        self.data_dir.join("datasets")
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
pub struct RetentionConfig {
    #[validate(range(min = 1))]
    pub limit: usize,
}

impl Default for RetentionConfig {
    fn default() -> Self {
        Self {
            limit: DEFAULT_RETENTION_LIMIT,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
pub struct UploadConfig {
    #[validate(range(min = 1))]
    pub max_bytes: usize,
}

impl Default for UploadConfig {
    fn default() -> Self {
        Self {
            max_bytes: 10 * 1024 * 1024,
        }
    }
}

/// HTTP Basic credentials every dataset route must present.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Validate)]
pub struct AuthConfig {
    #[validate(length(min = 1))]
    pub username: String,
    pub password: String,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, Validate)]
pub struct AppConfig {
    #[validate(nested)]
    pub server: ServerConfig,
    pub storage: StorageConfig,
    #[validate(nested)]
    pub retention: RetentionConfig,
    #[validate(nested)]
    pub upload: UploadConfig,
    #[validate(nested)]
    pub auth: Option<AuthConfig>,
    pub log_filter: Option<String>,
}

impl AppConfig {
    /// Defaults, then the TOML file (`EQUIVIEW_CONFIG` or `equiview.toml`),
    /// then `EQUIVIEW_*` environment variables (`__` separates sections).
    pub fn load() -> Result<Self> {
        dotenvy::dotenv().ok();
        let path = std::env::var(CONFIG_PATH_ENV).unwrap_or_else(|_| DEFAULT_CONFIG_FILE.to_string());
        Self::from_figment(Self::figment(Path::new(&path)))
    }

    pub fn figment(config_file: &Path) -> Figment {
        Figment::from(Serialized::defaults(AppConfig::default()))
            .merge(Toml::file(config_file))
            .merge(Env::prefixed(ENV_PREFIX).split("__"))
    }

    pub fn from_figment(figment: Figment) -> Result<Self> {
        let config: AppConfig = figment
            .extract()
            .map_err(|e| AppError::Config(format!("Failed to load configuration: {e}")))?;
        config
            .validate()
            .map_err(|e| AppError::Config(format!("Invalid configuration: {e}")))?;
        Ok(config)
    }

    pub fn bind_address(&self) -> (String, u16) {
        (self.server.host.clone(), self.server.port)
    }

    pub fn log_filter(&self) -> &str {
        self.log_filter.as_deref().unwrap_or("info")
    }
}
