//! Generation service client.
//!
//! `TextTo3dApi` is the seam used by polling and sessions; `MeshyClient` is
//! the HTTP implementation.

use crate::credential::ApiKey;
use crate::error::GenerationError;
use crate::task::{GenerationRequest, TaskCreated, TaskSnapshot};
use async_trait::async_trait;
use photomesh_core::TaskId;
use rootcause::prelude::Report;
use serde::de::DeserializeOwned;
use std::time::Duration;
use tracing::{debug, info, instrument};

/// Trait for text-to-3D services.
#[async_trait]
pub trait TextTo3dApi: Send + Sync {
    /// Submits a request and returns the new task's handle.
    ///
    /// # Errors
    ///
    /// Returns an error if the submission is rejected or cannot be sent.
    async fn create_task(
        &self,
        request: &GenerationRequest,
    ) -> Result<TaskId, Report<GenerationError>>;

    /// Fetches the current state of a task.
    ///
    /// # Errors
    ///
    /// Returns an error if the fetch fails.
    async fn get_task(&self, task_id: &TaskId) -> Result<TaskSnapshot, Report<GenerationError>>;

    /// Fetches a model asset.
    ///
    /// # Errors
    ///
    /// Returns an error if the asset cannot be fetched.
    async fn download(&self, url: &str) -> Result<Vec<u8>, Report<GenerationError>>;
}

/// Configuration for [`MeshyClient`].
#[derive(Debug, Clone)]
pub struct MeshyConfig {
    pub api_key: ApiKey,
    /// Service root, without the `/openapi` path.
    pub base_url: String,
    pub request_timeout: Duration,
}

impl MeshyConfig {
    pub const DEFAULT_BASE_URL: &'static str = "https://api.meshy.ai";

    #[must_use]
    pub fn new(api_key: ApiKey) -> Self {
        Self {
            api_key,
            base_url: Self::DEFAULT_BASE_URL.to_string(),
            request_timeout: Duration::from_secs(60),
        }
    }

    #[must_use]
    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into();
        self
    }

    #[must_use]
    pub fn with_request_timeout(mut self, timeout: Duration) -> Self {
        self.request_timeout = timeout;
        self
    }
}

/// Client for the Meshy text-to-3D API.
#[derive(Debug, Clone)]
pub struct MeshyClient {
    http: reqwest::Client,
    api_key: ApiKey,
    tasks_url: String,
}

impl MeshyClient {
    /// Creates a client.
    ///
    /// # Errors
    ///
    /// Returns `InvalidConfig` if the API key is blank or the HTTP client
    /// cannot be built.
    pub fn new(config: MeshyConfig) -> Result<Self, Report<GenerationError>> {
        if config.api_key.is_empty() {
            return Err(GenerationError::InvalidConfig {
                reason: "API key is empty".to_string(),
            }
            .into());
        }
        let http = reqwest::Client::builder()
            .timeout(config.request_timeout)
            .build()
            .map_err(|e| GenerationError::InvalidConfig {
                reason: format!("failed to create HTTP client: {e}"),
            })?;

        Ok(Self {
            http,
            api_key: config.api_key,
            tasks_url: format!(
                "{}/openapi/v2/text-to-3d",
                config.base_url.trim_end_matches('/')
            ),
        })
    }

    /// Endpoint for submissions; task URLs are `{tasks_url}/{id}`.
    #[must_use]
    pub fn tasks_url(&self) -> &str {
        &self.tasks_url
    }
}

#[async_trait]
impl TextTo3dApi for MeshyClient {
    #[instrument(skip_all, fields(mode = request.mode()))]
    async fn create_task(
        &self,
        request: &GenerationRequest,
    ) -> Result<TaskId, Report<GenerationError>> {
        let url = &self.tasks_url;
        let response = self
            .http
            .post(url)
            .bearer_auth(self.api_key.expose())
            .json(request)
            .send()
            .await
            .map_err(|e| request_failed(url, &e))?;
        let created: TaskCreated = parse_json(url, ensure_success(url, response).await?).await?;
        info!(task_id = %created.result, "task created");
        Ok(created.result)
    }

    #[instrument(skip(self))]
    async fn get_task(&self, task_id: &TaskId) -> Result<TaskSnapshot, Report<GenerationError>> {
        let url = format!("{}/{}", self.tasks_url, task_id);
        let response = self
            .http
            .get(&url)
            .bearer_auth(self.api_key.expose())
            .send()
            .await
            .map_err(|e| request_failed(&url, &e))?;
        let snapshot: TaskSnapshot =
            parse_json(&url, ensure_success(&url, response).await?).await?;
        debug!(status = %snapshot.status, progress = snapshot.progress, "task fetched");
        Ok(snapshot)
    }

    #[instrument(skip_all)]
    async fn download(&self, url: &str) -> Result<Vec<u8>, Report<GenerationError>> {
        // Asset URLs are pre-signed; they must not receive the API key.
        let response = self
            .http
            .get(url)
            .send()
            .await
            .map_err(|e| request_failed(url, &e))?;
        let bytes = ensure_success(url, response)
            .await?
            .bytes()
            .await
            .map_err(|e| request_failed(url, &e))?;
        debug!(bytes = bytes.len(), "asset downloaded");
        Ok(bytes.to_vec())
    }
}

fn request_failed(endpoint: &str, error: &reqwest::Error) -> GenerationError {
    GenerationError::RequestFailed {
        endpoint: endpoint.to_string(),
        reason: error.to_string(),
    }
}

async fn ensure_success(
    endpoint: &str,
    response: reqwest::Response,
) -> Result<reqwest::Response, Report<GenerationError>> {
    let status = response.status();
    if status.is_success() {
        return Ok(response);
    }
    let body = response
        .text()
        .await
        .unwrap_or_else(|e| format!("<unreadable body: {e}>"));
    Err(GenerationError::UnexpectedStatus {
        endpoint: endpoint.to_string(),
        status: status.as_u16(),
        body,
    }
    .into())
}

async fn parse_json<T: DeserializeOwned>(
    endpoint: &str,
    response: reqwest::Response,
) -> Result<T, Report<GenerationError>> {
    response.json::<T>().await.map_err(|e| {
        GenerationError::ResponseParseFailed {
            endpoint: endpoint.to_string(),
            reason: e.to_string(),
        }
        .into()
    })
}
