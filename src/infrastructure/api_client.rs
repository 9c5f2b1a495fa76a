use reqwest::multipart::{Form, Part};
use reqwest::{RequestBuilder, Response, StatusCode};
use serde::de::DeserializeOwned;
use std::time::Duration;
use tracing::debug;
use url::Url;

use crate::domain::dataset::{Dataset, UPLOAD_FIELD};
use crate::domain::error::{AppError, ErrorBody, Result};
use crate::domain::stats::StatsResult;

const DEFAULT_TIMEOUT: Duration = Duration::from_secs(30);

#[derive(Debug, Clone)]
pub struct ClientConfig {
    pub base_url: Url,
    pub credentials: Option<(String, String)>,
    pub timeout: Duration,
}

impl ClientConfig {
    pub fn new(base_url: &str) -> Result<Self> {
        // Without the trailing slash `join` would replace the last path segment.
        let normalized = if base_url.ends_with('/') {
            base_url.to_string()
        } else {
            format!("{}/", base_url)
        };
        let base_url = Url::parse(&normalized)
            .map_err(|e| AppError::Config(format!("Invalid base URL '{}': {}", base_url, e)))?;
        Ok(Self {
            base_url,
            credentials: None,
            timeout: DEFAULT_TIMEOUT,
        })
    }

    pub fn with_credentials(mut self, username: &str, password: &str) -> Self {
        self.credentials = Some((username.to_string(), password.to_string()));
        self
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }
}

/// Typed client for the dataset API, as used by the dashboards.
pub struct DatasetApiClient {
    client: reqwest::Client,
    config: ClientConfig,
}

impl DatasetApiClient {
    pub fn new(config: ClientConfig) -> Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(config.timeout)
            .build()
            .map_err(|e| AppError::Internal(format!("Failed to build HTTP client: {}", e)))?;
        Ok(Self { client, config })
    }

    /// Succeeds when the server accepts the configured credentials.
    pub async fn verify_credentials(&self) -> Result<()> {
        let response = self.send(self.request(reqwest::Method::GET, "api/datasets")?).await?;
        check(response).await.map(|_| ())
    }

    pub async fn list_datasets(&self) -> Result<Vec<Dataset>> {
        let response = self.send(self.request(reqwest::Method::GET, "api/datasets")?).await?;
        json(check(response).await?).await
    }

    pub async fn upload(&self, file_name: &str, bytes: Vec<u8>) -> Result<Dataset> {
        let part = Part::bytes(bytes)
            .file_name(file_name.to_string())
            .mime_str("text/csv")
            .map_err(|e| AppError::Internal(format!("Invalid upload part: {}", e)))?;
        let form = Form::new().part(UPLOAD_FIELD, part);

        let request = self.request(reqwest::Method::POST, "api/datasets")?.multipart(form);
        let response = self.send(request).await?;
        json(check(response).await?).await
    }

    pub async fn get_dataset(&self, id: i64) -> Result<Dataset> {
        let path = format!("api/datasets/{}", id);
        let response = self.send(self.request(reqwest::Method::GET, &path)?).await?;
        json(check(response).await?).await
    }

    pub async fn delete_dataset(&self, id: i64) -> Result<()> {
        let path = format!("api/datasets/{}", id);
        let response = self.send(self.request(reqwest::Method::DELETE, &path)?).await?;
        check(response).await.map(|_| ())
    }

    pub async fn stats(&self, id: i64) -> Result<StatsResult> {
        let path = format!("api/datasets/{}/stats", id);
        let response = self.send(self.request(reqwest::Method::GET, &path)?).await?;
        json(check(response).await?).await
    }

    pub async fn report(&self, id: i64) -> Result<Vec<u8>> {
        let path = format!("api/datasets/{}/report", id);
        let response = self.send(self.request(reqwest::Method::GET, &path)?).await?;
        let bytes = check(response)
            .await?
            .bytes()
            .await
            .map_err(|e| AppError::Internal(format!("Failed to read report: {}", e)))?;
        Ok(bytes.to_vec())
    }

    fn request(&self, method: reqwest::Method, path: &str) -> Result<RequestBuilder> {
        let url = self
            .config
            .base_url
            .join(path)
            .map_err(|e| AppError::Internal(format!("Invalid request path '{}': {}", path, e)))?;
        debug!(%method, %url, "API request");

        let mut request = self.client.request(method, url);
        if let Some((username, password)) = &self.config.credentials {
            request = request.basic_auth(username, Some(password));
        }
        Ok(request)
    }

    async fn send(&self, request: RequestBuilder) -> Result<Response> {
        request
            .send()
            .await
            .map_err(|e| AppError::Internal(format!("Request failed: {}", e)))
    }
}

/// Map a non-2xx response onto the error it was raised from server-side.
async fn check(response: Response) -> Result<Response> {
    let status = response.status();
    if status.is_success() {
        return Ok(response);
    }

    let text = response.text().await.unwrap_or_default();
    let message = serde_json::from_str::<ErrorBody>(&text)
        .map(|body| body.error)
        .unwrap_or_else(|_| format!("API error ({}): {}", status, text));

    Err(match status {
        StatusCode::BAD_REQUEST => AppError::Validation(message),
        StatusCode::UNAUTHORIZED => AppError::Unauthorized,
        StatusCode::NOT_FOUND => AppError::NotFound(message),
        _ => AppError::Internal(message),
    })
}

async fn json<T: DeserializeOwned>(response: Response) -> Result<T> {
    response
        .json()
        .await
        .map_err(|e| AppError::Internal(format!("Failed to parse JSON: {}", e)))
}
